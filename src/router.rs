//! See [`router`].

use axum::{
    http::{header::CONTENT_TYPE, Method, StatusCode},
    routing::any,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{deploy, AppState, PlainErrorResponse};

/// The paths the deploy endpoint is served on. The second matches where Netlify Functions are
/// served, so frontends written against a Netlify Function work unchanged.
const DEPLOY_PATHS: [&str; 2] = ["/api/deploy", "/.netlify/functions/deploy"];

/// Builds the router for all incoming requests.
///
/// The deploy endpoint accepts every method so it can reject the wrong ones itself, after checking
/// the server's configuration.
pub(crate) fn router(state: AppState) -> Router {
    let mut router = DEPLOY_PATHS
        .into_iter()
        .fold(Router::new(), |router, path| {
            router.route(path, any(deploy::handler))
        })
        .fallback(|| async { PlainErrorResponse::from(StatusCode::NOT_FOUND) })
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = &state.config.cors_allow_origin {
        let allow_origin = if origin == "*" {
            AllowOrigin::any()
        } else {
            AllowOrigin::exact(origin.clone())
        };

        router = router.layer(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods([Method::POST])
                .allow_headers([CONTENT_TYPE]),
        );
    }

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::{
            header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN},
            HeaderValue,
        },
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    /// Builds an [`AppState`] without a Netlify token, which is enough for routing.
    fn state(cors_allow_origin: Option<&'static str>) -> AppState {
        let config = Config {
            address: "127.0.0.1:0".into(),
            auth_token: None,
            api_origin: "http://127.0.0.1:9".into(),
            max_body_bytes: 1024,
            delete_orphaned_sites: false,
            require_zip_signature: false,
            cors_allow_origin: cors_allow_origin.map(HeaderValue::from_static),
        };

        AppState::new(config).expect("state should initialize")
    }

    #[tokio::test]
    async fn unknown_paths_not_found() -> anyhow::Result<()> {
        let response = router(state(None))
            .oneshot(Request::builder().uri("/api/sites").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"404 Not Found");

        Ok(())
    }

    #[tokio::test]
    async fn deploy_served_on_both_paths() -> anyhow::Result<()> {
        for path in DEPLOY_PATHS {
            let response = router(state(None))
                .oneshot(Request::builder().uri(path).body(Body::empty())?)
                .await?;

            // Without a token, the deploy endpoint responds with a configuration error.
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }

        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight() -> anyhow::Result<()> {
        let preflight = || {
            Request::builder()
                .method(Method::OPTIONS)
                .uri(DEPLOY_PATHS[0])
                .header(ORIGIN, "https://example.com")
                .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
        };

        let response = router(state(Some("https://example.com")))
            .oneshot(preflight()?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://example.com"))
        );

        let response = router(state(None)).oneshot(preflight()?).await?;

        assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN), None);

        Ok(())
    }
}
