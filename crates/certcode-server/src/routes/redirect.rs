//! Plain-HTTP listener that sends every request to HTTPS.

use axum::Router;
use axum::extract::State;
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::ApiError;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Router answering every request with `301` to the same host, path and
/// query on `https_port`.
pub fn redirect_router(https_port: u16) -> Router {
    Router::new().fallback(redirect).with_state(https_port)
}

async fn redirect(State(https_port): State<u16>, headers: HeaderMap, uri: Uri) -> Response {
    let Some(host) = headers.get(HOST).and_then(|h| h.to_str().ok()) else {
        return ApiError::BadRequest("Missing host").into_response();
    };
    let location = https_location(host, &uri, https_port);
    debug!(%uri, %location, "Redirecting to HTTPS");
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
}

fn https_location(host: &str, uri: &Uri, https_port: u16) -> String {
    let host = strip_port(host);
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    if https_port == DEFAULT_HTTPS_PORT {
        format!("https://{host}{path}")
    } else {
        format!("https://{host}:{https_port}{path}")
    }
}

/// Drop a trailing `:port` from a `Host` header value, keeping IPv6
/// literals such as `[::1]` intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn strip_port_handles_names_and_addresses() {
        assert_eq!(strip_port("example.org"), "example.org");
        assert_eq!(strip_port("example.org:80"), "example.org");
        assert_eq!(strip_port("10.0.0.1:8080"), "10.0.0.1");
        assert_eq!(strip_port("[::1]:80"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }

    #[test]
    fn location_keeps_path_and_query() {
        let uri: Uri = "/valide?code=ABC".parse().unwrap();
        assert_eq!(
            https_location("example.org:80", &uri, 443),
            "https://example.org/valide?code=ABC"
        );
        assert_eq!(
            https_location("example.org", &uri, 8443),
            "https://example.org:8443/valide?code=ABC"
        );
    }

    #[tokio::test]
    async fn every_request_is_moved_permanently() {
        let response = redirect_router(443)
            .oneshot(
                Request::builder()
                    .uri("/img/ABC.png")
                    .header("host", "zertifikat.example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "https://zertifikat.example.org/img/ABC.png"
        );
    }

    #[tokio::test]
    async fn missing_host_is_bad_request() {
        let response = redirect_router(443)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
