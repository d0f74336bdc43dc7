mod common;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use securecloud_gateway::app::spawn_housekeeping;
use securecloud_gateway::lifecycle::{self, DrainOutcome, Lifecycle, Phase, ServeError, Server};

fn slow_router(delay: Duration) -> Router {
    Router::new().route(
        "/slow",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "done"
        }),
    )
}

async fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = lifecycle::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn test_drain_lets_in_flight_requests_finish() {
    let lifecycle = Lifecycle::new();
    let (listener, addr) = local_listener().await;
    let (stop, stopped) = oneshot::channel::<()>();

    let server = Server::new(lifecycle.clone(), Duration::from_secs(5));
    let serving = tokio::spawn(async move {
        server
            .serve(listener, slow_router(Duration::from_millis(300)), async move {
                let _ = stopped.await;
            })
            .await
    });
    lifecycle.reached(Phase::Accepting).await;

    let in_flight = tokio::spawn(reqwest::Client::new().get(format!("http://{addr}/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send(()).unwrap();

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");

    let outcome = serving.await.unwrap();
    assert_eq!(outcome, DrainOutcome::Completed);
    assert_eq!(lifecycle.phase(), Phase::Stopped);

    // The listener is gone once the drain completes.
    assert!(reqwest::get(format!("http://{addr}/slow")).await.is_err());
}

#[tokio::test]
async fn test_drain_deadline_abandons_stuck_requests() {
    let lifecycle = Lifecycle::new();
    let (listener, addr) = local_listener().await;
    let (stop, stopped) = oneshot::channel::<()>();

    let server = Server::new(lifecycle.clone(), Duration::from_millis(200));
    let serving = tokio::spawn(async move {
        server
            .serve(listener, slow_router(Duration::from_secs(30)), async move {
                let _ = stopped.await;
            })
            .await
    });
    lifecycle.reached(Phase::Accepting).await;

    let stuck = tokio::spawn(reqwest::Client::new().get(format!("http://{addr}/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    stop.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve should return after the drain deadline")
        .unwrap();

    assert_eq!(outcome, DrainOutcome::DeadlineElapsed);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(lifecycle.phase(), Phase::Stopped);

    // The abandoned connection is closed, not left running in the background.
    let abandoned = tokio::time::timeout(Duration::from_secs(1), stuck)
        .await
        .expect("stuck client should see its connection close")
        .unwrap();
    assert!(abandoned.is_err());
    assert!(started.elapsed() < Duration::from_millis(200) + Duration::from_secs(1));
}

#[tokio::test]
async fn test_idle_keep_alive_connection_does_not_hold_the_drain() {
    let lifecycle = Lifecycle::new();
    let (listener, addr) = local_listener().await;
    let (stop, stopped) = oneshot::channel::<()>();

    let server = Server::new(lifecycle.clone(), Duration::from_secs(5));
    let serving = tokio::spawn(async move {
        server
            .serve(listener, slow_router(Duration::ZERO), async move {
                let _ = stopped.await;
            })
            .await
    });
    lifecycle.reached(Phase::Accepting).await;

    // The client keeps its pooled connection open after the response.
    let client = reqwest::Client::new();
    let response = client.get(format!("http://{addr}/slow")).send().await.unwrap();
    assert_eq!(response.text().await.unwrap(), "done");

    let started = Instant::now();
    stop.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(2), serving)
        .await
        .expect("idle connections should close on drain")
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Completed);
    assert!(started.elapsed() < Duration::from_secs(1));
    drop(client);
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let (_taken, addr) = local_listener().await;

    let err = lifecycle::bind(addr).await.unwrap_err();
    assert!(matches!(err, ServeError::Bind { addr: failed, .. } if failed == addr));
}

#[tokio::test]
async fn test_housekeeping_stops_with_the_server() {
    let app = common::TestApp::new();
    let task = spawn_housekeeping(app.state.clone(), Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(30)).await;
    app.state.lifecycle.advance(Phase::Stopped);

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("housekeeping should exit once stopped")
        .unwrap();
}
