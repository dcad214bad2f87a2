//! Certificate artifact rendering.
//!
//! A redeemed certificate is drawn onto the template as `<code>.pdf` and
//! then rasterized to `<code>.png`, both inside the output directory that
//! is served under `/img`. The renderer reads certificate rows but never
//! writes them.

pub mod pdf;
pub mod png;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::storage::{CertificateDatabase, DatabaseError};

pub use pdf::Template;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Certificate lookup failed: {0}")]
    Lookup(#[from] DatabaseError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF file {} does not exist", .0.display())]
    MissingPdf(PathBuf),

    #[error("PNG conversion exited with {status}: {stderr}")]
    Conversion { status: String, stderr: String },

    #[error("Rendering did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Render task failed: {0}")]
    Task(String),
}

pub fn pdf_file_name(code: &str) -> String {
    format!("{code}.pdf")
}

pub fn png_file_name(code: &str) -> String {
    format!("{code}.png")
}

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Where `<code>.pdf` and `<code>.png` are written.
    pub output_dir: PathBuf,
    /// Directory holding the background image and font.
    pub template_dir: PathBuf,
    /// `pdftoppm` executable.
    pub pdftoppm: PathBuf,
    /// Upper bound for one [`CertificateRenderer::render`] call.
    pub timeout: Duration,
}

/// File names of the produced artifacts, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    pub pdf: String,
    pub png: String,
}

pub struct CertificateRenderer {
    db: CertificateDatabase,
    config: RendererConfig,
}

impl std::fmt::Debug for CertificateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CertificateRenderer {
    pub const fn new(db: CertificateDatabase, config: RendererConfig) -> Self {
        Self { db, config }
    }

    /// Produce the PDF and PNG for a redeemed code, bounded by the
    /// configured timeout.
    ///
    /// On failure the artifacts of `code` are removed from the output
    /// directory.
    #[instrument(skip(self), fields(timeout = ?self.config.timeout))]
    pub async fn render(&self, code: &str) -> Result<Artifacts, RenderError> {
        let work = async {
            let pdf = self.render_pdf(code).await?;
            let png = self.render_png(code).await?;
            Ok::<_, RenderError>(Artifacts { pdf, png })
        };
        let result = tokio::time::timeout(self.config.timeout, work)
            .await
            .unwrap_or(Err(RenderError::Timeout(self.config.timeout)));

        if result.is_err() {
            self.remove_artifacts(code).await;
        }
        result
    }

    /// Draw `<code>.pdf` for a redeemed code and return its file name.
    ///
    /// The document is built off the runtime and only written once it is
    /// complete; if this future is dropped first, nothing reaches the disk.
    pub async fn render_pdf(&self, code: &str) -> Result<String, RenderError> {
        let certificate = self.db.find_entry(code, true).await?;
        let template = Template::in_dir(&self.config.template_dir);

        let bytes =
            tokio::task::spawn_blocking(move || pdf::render_certificate(&certificate, &template))
                .await
                .map_err(|e| RenderError::Task(e.to_string()))??;

        let file_name = pdf_file_name(code);
        tokio::fs::write(self.config.output_dir.join(&file_name), bytes).await?;
        info!(code, file = %file_name, "Certificate PDF written");
        Ok(file_name)
    }

    /// Rasterize the previously written PDF and return the PNG file name.
    pub async fn render_png(&self, code: &str) -> Result<String, RenderError> {
        png::convert(&self.config.pdftoppm, &self.config.output_dir, code).await
    }

    /// Delete the artifacts of a revoked code so they are no longer served.
    ///
    /// Missing files are fine; other failures are logged.
    pub async fn remove_artifacts(&self, code: &str) {
        for name in [pdf_file_name(code), png_file_name(code)] {
            let path = self.config.output_dir.join(&name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(code, file = %name, "Artifact removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(code, file = %name, error = %e, "Failed to remove artifact"),
            }
        }
    }
}
