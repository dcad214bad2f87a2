//! HTTP routing.

mod error;
pub mod handlers;
pub mod redirect;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use certcode_core::CodeGenerator;

use crate::auth::{Credentials, require_api_key, require_basic_auth};
use crate::render::CertificateRenderer;
use crate::storage::CertificateDatabase;

pub use error::ApiError;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: CertificateDatabase,
    pub codes: Arc<CodeGenerator>,
    pub renderer: Arc<CertificateRenderer>,
    pub credentials: Arc<Credentials>,
    /// Base for URLs handed out in responses, e.g. `https://example.org`.
    pub public_url: String,
}

impl AppState {
    fn base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    /// Front-end link that pre-fills `code`.
    pub fn code_url(&self, code: &str) -> String {
        format!("{}/?code={code}", self.base())
    }

    /// Public link to a rendered artifact.
    pub fn artifact_url(&self, file_name: &str) -> String {
        format!("{}/img/{file_name}", self.base())
    }
}

/// Static file locations and optional gates.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Front-end files served for every unmatched path.
    pub app_dir: PathBuf,
    /// Rendered artifacts, served under `/img`.
    pub certificates_dir: PathBuf,
    /// Require `X-API-Key` on the public endpoints.
    pub require_api_key: bool,
}

pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    let admin = Router::new()
        .route("/erstelle", get(handlers::create_certificate_codes))
        .route(
            "/loesche",
            get(handlers::delete_certificate_code).delete(handlers::delete_certificate_code),
        )
        .route("/statistik", get(handlers::statistics))
        .route_layer(from_fn_with_state(
            Arc::clone(&state.credentials),
            require_basic_auth,
        ));

    let mut public = Router::new()
        .route("/valide", get(handlers::validate_code))
        .route("/generiere", post(handlers::generate_certificate))
        .route("/erneuere", post(handlers::rerender_certificate))
        .route(
            "/entferne",
            get(handlers::delete_certificate).delete(handlers::delete_certificate),
        );
    if options.require_api_key {
        public = public.route_layer(from_fn_with_state(
            Arc::clone(&state.credentials),
            require_api_key,
        ));
    }

    Router::new()
        .merge(admin)
        .merge(public)
        .nest_service("/img", ServeDir::new(&options.certificates_dir))
        .fallback_service(ServeDir::new(&options.app_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::render::RendererConfig;

    async fn state(public_url: &str) -> AppState {
        let db = CertificateDatabase::open_in_memory().await.unwrap();
        let renderer = CertificateRenderer::new(
            db.clone(),
            RendererConfig {
                output_dir: PathBuf::from("."),
                template_dir: PathBuf::from("."),
                pdftoppm: PathBuf::from("pdftoppm"),
                timeout: Duration::from_secs(1),
            },
        );
        AppState {
            db,
            codes: Arc::new(CodeGenerator::new()),
            renderer: Arc::new(renderer),
            credentials: Arc::new(Credentials::new("a", "b", [])),
            public_url: public_url.into(),
        }
    }

    #[tokio::test]
    async fn urls_ignore_trailing_slash() {
        for base in ["https://example.org", "https://example.org/"] {
            let state = state(base).await;
            assert_eq!(state.code_url("ABC"), "https://example.org/?code=ABC");
            assert_eq!(
                state.artifact_url("ABC.pdf"),
                "https://example.org/img/ABC.pdf"
            );
        }
    }
}
