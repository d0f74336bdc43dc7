use async_graphql::{ErrorExtensionValues, Request, Response, ServerError, Variables, parser};
use serde::Deserialize;
use tracing::debug;

use super::errors::codes;
use super::schema::GatewaySchema;
use crate::middleware::RequestContext;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequestBody {
    pub query: String,
    #[serde(default)]
    pub variables: Option<serde_json::Value>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

fn with_code(mut error: ServerError, code: &'static str) -> ServerError {
    let mut extensions = error.extensions.take().unwrap_or_default();
    extensions.set("code", code);
    error.extensions = Some(extensions);
    error
}

fn has_code(error: &ServerError) -> bool {
    error
        .extensions
        .as_ref()
        .is_some_and(|ext: &ErrorExtensionValues| ext.get("code").is_some())
}

/// Parse, validate and execute one operation on behalf of `ctx`.
///
/// Syntax and validation failures come back in `errors` like any other GraphQL
/// error; the HTTP layer always answers 200.
pub async fn dispatch(
    schema: &GatewaySchema,
    ctx: &RequestContext,
    body: GraphQLRequestBody,
) -> Response {
    if let Err(e) = parser::parse_query(&body.query) {
        debug!(request_id = %ctx.request_id, error = %e, "graphql syntax error");
        return Response::from_errors(vec![with_code(ServerError::from(e), codes::SYNTAX)]);
    }

    let mut request = Request::new(body.query).data(ctx.clone());
    if let Some(principal) = ctx.principal.clone() {
        request = request.data(principal);
    }
    if let Some(operation_name) = body.operation_name {
        request = request.operation_name(operation_name);
    }
    if let Some(variables) = body.variables.filter(|v| !v.is_null()) {
        request = request.variables(Variables::from_json(variables));
    }

    let mut response = schema.execute(request).await;

    // Errors without a code were raised by async-graphql itself: document validation
    // (no path) or argument coercion while executing (with a path).
    response.errors = response
        .errors
        .into_iter()
        .map(|error| {
            if has_code(&error) {
                error
            } else if error.path.is_empty() {
                with_code(error, codes::VALIDATION)
            } else {
                with_code(error, codes::BAD_USER_INPUT)
            }
        })
        .collect();

    response
}
