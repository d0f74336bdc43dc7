use axum::{
    Json,
    extract::{State, ws::WebSocketUpgrade},
    response::{Html, IntoResponse, Response},
};
use async_graphql::{
    Data,
    http::{ALL_WEBSOCKET_PROTOCOLS, GraphiQLSource},
};
use async_graphql_axum::{GraphQLProtocol, GraphQLWebSocket};
use tracing::info;

use crate::api::v1::extractors::{ApiJson, Authenticated, Ctx};
use crate::graphql::{GraphQLRequestBody, dispatch};
use crate::lifecycle::Phase;
use crate::state::AppState;

pub async fn graphiql() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint("/graphql")
            .subscription_endpoint("/graphql/ws")
            .finish(),
    )
}

/// Always 200; failures travel in the GraphQL `errors` array.
pub async fn graphql(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(body): ApiJson<GraphQLRequestBody>,
) -> Json<async_graphql::Response> {
    Json(dispatch(&state.schema, &ctx, body).await)
}

/// GraphQL over WebSocket (`graphql-transport-ws` and the legacy `graphql-ws`).
///
/// The bearer credential is checked at upgrade time; the principal then rides along
/// as schema data for every operation on the socket. The socket is dropped when the
/// server starts draining.
pub async fn subscriptions(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Authenticated(principal): Authenticated,
    protocol: GraphQLProtocol,
    upgrade: WebSocketUpgrade,
) -> Response {
    let request_id = ctx.request_id;
    upgrade
        .protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |socket| async move {
            let subject = principal.subject_id;
            let mut data = Data::default();
            data.insert(principal);

            state.metrics.ws_opened();
            info!(%request_id, %subject, "graphql websocket opened");

            let session = GraphQLWebSocket::new(socket, state.schema.clone(), protocol)
                .with_data(data)
                .serve();
            tokio::select! {
                _ = session => {}
                _ = state.lifecycle.reached(Phase::Draining) => {}
            }

            state.metrics.ws_closed();
            info!(%request_id, %subject, "graphql websocket closed");
        })
}
