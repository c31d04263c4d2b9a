use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one request. Available to handlers through request
/// extensions and echoed back on the response so narration failures can be
/// matched to server logs from the client side.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Tag every request with a fresh id before it reaches the handlers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    tracing::trace!(request_id = %id.0, "Tagging request");
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;

    // A hyphenated UUID is plain ASCII and always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_response_carries_a_parseable_request_id() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("missing request id header");
        assert!(header.to_str().unwrap().parse::<Uuid>().is_ok());
    }

    #[tokio::test]
    async fn test_each_request_gets_a_distinct_id() {
        let first = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let second = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_ne!(
            first.headers().get(REQUEST_ID_HEADER),
            second.headers().get(REQUEST_ID_HEADER)
        );
    }
}
