//! The admission chain: an ordered list of interceptors run around every request.
//!
//! Each stage's `before` either lets the request continue or terminates it with a
//! response. Stages that were entered (including the one that terminated) get their
//! `after` hook on the way out, in reverse order, so short-circuited responses still
//! carry correlation ids and CORS headers and are logged.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use super::context::{ContextSettings, RequestContext};
use crate::error::AppError;

pub enum Flow {
    Continue,
    Terminate(Response),
}

impl Flow {
    pub fn reject(error: AppError) -> Self {
        Flow::Terminate(error.into_response())
    }
}

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn before(&self, ctx: &mut RequestContext, parts: &mut Parts) -> Flow;

    fn after(&self, _ctx: &RequestContext, _response: &mut Response) {}
}

#[derive(Clone)]
pub struct Chain {
    stages: Arc<[Arc<dyn Interceptor>]>,
    settings: ContextSettings,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stage_names())
            .field("settings", &self.settings)
            .finish()
    }
}

pub struct ChainBuilder {
    stages: Vec<Arc<dyn Interceptor>>,
    settings: ContextSettings,
}

impl ChainBuilder {
    pub fn stage(mut self, stage: impl Interceptor + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Chain {
        Chain {
            stages: self.stages.into(),
            settings: self.settings,
        }
    }
}

impl Chain {
    pub fn builder(settings: ContextSettings) -> ChainBuilder {
        ChainBuilder {
            stages: Vec::new(),
            settings,
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, req: Request, next: Next) -> Response {
        let (mut parts, body) = req.into_parts();
        let mut ctx = RequestContext::new(&parts, self.settings);

        let mut entered = 0;
        let mut terminal = None;
        for stage in self.stages.iter() {
            entered += 1;
            if let Flow::Terminate(response) = stage.before(&mut ctx, &mut parts) {
                ctx.rejected_by = Some(stage.name());
                terminal = Some(response);
                break;
            }
        }

        let mut response = match terminal {
            Some(response) => response,
            None => {
                parts.extensions.insert(ctx.clone());
                next.run(Request::from_parts(parts, body)).await
            }
        };

        for stage in self.stages[..entered].iter().rev() {
            stage.after(&ctx, &mut response);
        }

        response
    }
}

async fn admission(State(chain): State<Chain>, req: Request, next: Next) -> Response {
    chain.run(req, next).await
}

/// Wrap every route of `router` (fallbacks included) in the chain.
pub fn apply(router: Router, chain: Chain) -> Router {
    router.layer(middleware::from_fn_with_state(chain, admission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get};
    use parking_lot::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Recorder {
        name: &'static str,
        terminate: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Interceptor for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn before(&self, _ctx: &mut RequestContext, _parts: &mut Parts) -> Flow {
            self.log.lock().push(format!("before:{}", self.name));
            if self.terminate {
                Flow::reject(AppError::Forbidden)
            } else {
                Flow::Continue
            }
        }

        fn after(&self, ctx: &RequestContext, _response: &mut Response) {
            self.log.lock().push(format!(
                "after:{}:{}",
                self.name,
                ctx.rejected_by.unwrap_or("-")
            ));
        }
    }

    fn chain(log: &Arc<Mutex<Vec<String>>>, terminate_at: Option<&'static str>) -> Chain {
        let mut builder = Chain::builder(ContextSettings {
            request_deadline: Duration::from_secs(5),
            trust_proxy_headers: false,
        });
        for name in ["a", "b", "c"] {
            builder = builder.stage(Recorder {
                name,
                terminate: terminate_at == Some(name),
                log: Arc::clone(log),
            });
        }
        builder.build()
    }

    fn router(log: &Arc<Mutex<Vec<String>>>, terminate_at: Option<&'static str>) -> Router {
        let handler_log = Arc::clone(log);
        let router = Router::new().route(
            "/",
            get(move || {
                let log = Arc::clone(&handler_log);
                async move {
                    log.lock().push("handler".to_string());
                    "ok"
                }
            }),
        );
        apply(router, chain(log, terminate_at))
    }

    #[tokio::test]
    async fn test_chain_runs_stages_in_order_and_hooks_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let response = router(&log, None)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock(),
            vec![
                "before:a", "before:b", "before:c", "handler", "after:c:-", "after:b:-",
                "after:a:-"
            ]
        );
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_terminate() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let response = router(&log, Some("b"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            *log.lock(),
            vec!["before:a", "before:b", "after:b:b", "after:a:b"]
        );
    }

    #[tokio::test]
    async fn test_handler_sees_context() {
        let router = Router::new().route(
            "/",
            get(|axum::Extension(ctx): axum::Extension<RequestContext>| async move {
                ctx.path
            }),
        );
        let chain = Chain::builder(ContextSettings {
            request_deadline: Duration::from_secs(5),
            trust_proxy_headers: false,
        })
        .build();

        let response = apply(router, chain)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
