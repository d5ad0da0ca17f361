use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the classroom poll backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::poll::list_polls,
        crate::routes::poll::latest_poll,
        crate::routes::poll::get_poll,
        crate::routes::poll::create_poll,
        crate::routes::poll::end_active_poll,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::poll::PollSnapshot,
            crate::dto::poll::OptionSnapshot,
            crate::dto::poll::CreatePollRequest,
            crate::dto::sse::Handshake,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "polls", description = "Poll history and lifecycle"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "realtime", description = "WebSocket session for teachers and students"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_poll_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/polls",
            "/api/polls/latest",
            "/api/polls/{id}",
            "/api/polls/active/end",
            "/ws",
        ] {
            assert!(paths.iter().any(|path| *path == expected), "missing {expected}");
        }
    }
}
