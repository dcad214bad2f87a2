//! PDF to PNG rasterization through `pdftoppm`.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use super::{RenderError, pdf_file_name, png_file_name};

/// Rasterize `<code>.pdf` inside `dir` into `<code>.png`.
///
/// Runs `pdftoppm -singlefile -png <code>.pdf <code>` with `dir` as working
/// directory. The child is killed if the returned future is dropped, so an
/// outer timeout does not leak processes.
pub async fn convert(pdftoppm: &Path, dir: &Path, code: &str) -> Result<String, RenderError> {
    let pdf_name = pdf_file_name(code);
    let pdf_path = dir.join(&pdf_name);
    if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
        return Err(RenderError::MissingPdf(pdf_path));
    }

    debug!(code, converter = %pdftoppm.display(), "Converting PDF to PNG");
    let output = Command::new(pdftoppm)
        .arg("-singlefile")
        .arg("-png")
        .arg(&pdf_name)
        .arg(code)
        .current_dir(dir)
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RenderError::Conversion {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!(code, "PDF converted to PNG");
    Ok(png_file_name(code))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_pdf_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = convert(Path::new("pdftoppm"), dir.path(), "CODE")
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingPdf(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_converter_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("CODE.pdf"), b"%PDF-1.3").unwrap();

        let err = convert(Path::new("false"), dir.path(), "CODE")
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Conversion { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn converter_runs_in_output_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("CODE.pdf"), b"%PDF-1.3").unwrap();

        // The third argument is the PDF, the last one the output stem.
        let script = crate::render::testing::fake_converter(
            dir.path(),
            "[ -f \"$3\" ] || exit 2\ntouch \"$4.png\"",
        );

        let png = convert(&script, dir.path(), "CODE").await.unwrap();
        assert_eq!(png, "CODE.png");
        assert!(dir.path().join("CODE.png").exists());
    }
}
