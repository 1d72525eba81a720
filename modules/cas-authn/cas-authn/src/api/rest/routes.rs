use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::domain::ProxyTicketCorrelator;

/// Path the receptor is usually mounted on; `proxy.callback_url` must point at it.
pub const DEFAULT_CALLBACK_PATH: &str = "/cas/proxy-callback";

/// Mount the receptor endpoint at `path` on `router`.
///
/// ```ignore
/// let router = register_routes(Router::new(), DEFAULT_CALLBACK_PATH, correlator);
/// ```
#[must_use]
pub fn register_routes(
    router: Router,
    path: &str,
    correlator: Arc<ProxyTicketCorrelator>,
) -> Router {
    let receptor = Router::new()
        .route(path, get(handlers::receive_proxy_granting_ticket))
        .layer(Extension(correlator));
    router.merge(receptor)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn app(correlator: &Arc<ProxyTicketCorrelator>) -> Router {
        register_routes(Router::new(), DEFAULT_CALLBACK_PATH, Arc::clone(correlator))
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn callback_stores_ticket_and_acknowledges() {
        let correlator = Arc::new(ProxyTicketCorrelator::new(Duration::from_secs(60)));

        let (status, body) = call(
            app(&correlator),
            "/cas/proxy-callback?pgtIou=PGTIOU-1&pgtId=PGT-789",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(correlator.resolve("PGTIOU-1").await.as_deref(), Some("PGT-789"));
    }

    #[tokio::test]
    async fn probe_without_parameters_is_acknowledged() {
        let correlator = Arc::new(ProxyTicketCorrelator::new(Duration::from_secs(60)));

        for uri in [
            "/cas/proxy-callback",
            "/cas/proxy-callback?pgtIou=PGTIOU-1",
            "/cas/proxy-callback?pgtIou=&pgtId=PGT-1",
        ] {
            let (status, _) = call(app(&correlator), uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
        assert!(correlator.resolve("PGTIOU-1").await.is_none());
    }

    #[tokio::test]
    async fn other_paths_are_not_served() {
        let correlator = Arc::new(ProxyTicketCorrelator::new(Duration::from_secs(60)));
        let (status, _) = call(app(&correlator), "/elsewhere?pgtIou=a&pgtId=b").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
