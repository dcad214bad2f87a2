//! certcode Server
//!
//! HTTPS service issuing and redeeming certificate codes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tracing::{info, warn};

use certcode_core::CodeGenerator;
use certcode_core::tracing_init::{LogFormat, init_tracing};

use certcode_server::auth::Credentials;
use certcode_server::config::ServerConfig;
use certcode_server::render::CertificateRenderer;
use certcode_server::routes::redirect::redirect_router;
use certcode_server::routes::{AppState, build_router};
use certcode_server::storage::CertificateDatabase;
use certcode_server::tls::TlsMode;

#[derive(Parser, Debug)]
#[command(name = "certcode-server")]
#[command(
    version,
    about = "certcode server - issues, redeems and revokes certificate codes"
)]
struct Args {
    /// Output directory for rendered certificates, served under /img.
    #[arg(
        long = "certificates",
        env = "CERTCODE_CERTIFICATES_DIR",
        default_value = "/data/austromagnum/cert"
    )]
    certificates_dir: PathBuf,

    /// Directory holding the certificate background and font.
    #[arg(
        long = "template",
        env = "CERTCODE_TEMPLATE_DIR",
        default_value = "/data/austromagnum/template"
    )]
    template_dir: PathBuf,

    /// Front-end static files.
    #[arg(long = "app", env = "CERTCODE_APP_DIR", default_value = "../frontend/")]
    app_dir: PathBuf,

    /// INI file with [auth] credentials and [api_keys].
    #[arg(
        long = "cred",
        env = "CERTCODE_CREDENTIALS",
        default_value = "../tests/config.ini"
    )]
    credentials: PathBuf,

    /// Path to TLS certificate file (PEM).
    #[arg(long, env = "CERTCODE_TLS_CERT", requires = "key")]
    cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM).
    #[arg(long, env = "CERTCODE_TLS_KEY", requires = "cert")]
    key: Option<PathBuf>,

    /// Path to SQLite database file.
    #[arg(
        long,
        env = "CERTCODE_DATABASE",
        default_value = "/data/austromagnum/certificates.db"
    )]
    database: PathBuf,

    /// HTTPS port.
    #[arg(long, env = "CERTCODE_HTTPS_PORT", default_value_t = 443)]
    https_port: u16,

    /// HTTP port; redirects to HTTPS when TLS is enabled.
    #[arg(long, env = "CERTCODE_HTTP_PORT", default_value_t = 80)]
    http_port: u16,

    /// Base URL used in links returned to clients.
    #[arg(
        long,
        env = "CERTCODE_PUBLIC_URL",
        default_value = "https://zertifikat.austromagnum.at"
    )]
    public_url: String,

    /// pdftoppm executable used for PNG conversion.
    #[arg(long, env = "CERTCODE_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: PathBuf,

    /// Rendering timeout in seconds.
    #[arg(long, default_value_t = 30)]
    render_timeout: u64,

    /// Require an X-API-Key header on public endpoints.
    #[arg(long, env = "CERTCODE_REQUIRE_API_KEY")]
    require_api_key: bool,

    /// Orphan purge interval in seconds (0 disables the periodic purge).
    #[arg(long, default_value_t = 3600)]
    purge_interval: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        Ok(ServerConfig {
            tls: TlsMode::from_paths(self.cert, self.key)?,
            certificates_dir: self.certificates_dir,
            template_dir: self.template_dir,
            app_dir: self.app_dir,
            credentials_path: self.credentials,
            database_path: self.database,
            https_port: self.https_port,
            http_port: self.http_port,
            public_url: self.public_url,
            pdftoppm: self.pdftoppm,
            render_timeout: Duration::from_secs(self.render_timeout),
            require_api_key: self.require_api_key,
            purge_interval: Duration::from_secs(self.purge_interval),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(
        "certcode_server=info,tower_http=info",
        LogFormat::from_json_flag(args.log_json),
    )?;
    let config = args.into_config()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting certcode-server");

    let credentials = Credentials::load(&config.credentials_path).with_context(|| {
        format!(
            "Failed to load credentials from {}",
            config.credentials_path.display()
        )
    })?;
    info!(api_keys = credentials.api_key_count(), "Credentials loaded");

    tokio::fs::create_dir_all(&config.certificates_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create certificates directory {}",
                config.certificates_dir.display()
            )
        })?;

    info!(path = %config.database_path.display(), "Opening certificate database");
    let db = CertificateDatabase::open(&config.database_path)
        .await
        .context("Failed to open certificate database")?;

    let stats = db.statistics().await?;
    info!(
        total = stats.total,
        unused = stats.unused,
        unused_by_type = ?stats.unused_by_type,
        "Certificate code statistics"
    );

    spawn_purge(db.clone(), config.purge_interval).await;

    let state = AppState {
        renderer: Arc::new(CertificateRenderer::new(
            db.clone(),
            config.renderer_config(),
        )),
        db,
        codes: Arc::new(CodeGenerator::new()),
        credentials: Arc::new(credentials),
        public_url: config.public_url.clone(),
    };
    let app = build_router(state, &config.router_options());

    tokio::select! {
        result = serve(app, &config) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Purge orphaned rows now, then every `interval` in the background.
async fn spawn_purge(db: CertificateDatabase, interval: Duration) {
    match db.purge_orphans().await {
        Ok(removed) => info!(removed, "Startup orphan purge completed"),
        Err(e) => warn!(error = %e, "Startup orphan purge failed"),
    }

    if interval.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip first immediate tick
        loop {
            ticker.tick().await;
            match db.purge_orphans().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Background orphan purge completed");
                }
                Err(e) => {
                    warn!(error = %e, "Background orphan purge failed");
                }
                _ => {}
            }
        }
    });
}

/// Serve the application over HTTPS with an HTTP redirect listener, or in
/// plaintext on the HTTP port when TLS is disabled.
async fn serve(app: Router, config: &ServerConfig) -> anyhow::Result<()> {
    let Some(tls) = config.tls.to_rustls_config().await? else {
        let addr = config.http_addr();
        warn!(%addr, "TLS disabled, serving plaintext");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        axum::serve(listener, app).await?;
        return Ok(());
    };

    let https_addr = config.https_addr();
    let http_addr = config.http_addr();
    let redirect = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind {http_addr}"))?;
    info!(%https_addr, %http_addr, "Server starting with TLS");

    tokio::try_join!(
        async {
            axum_server::bind_rustls(https_addr, tls)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")
        },
        async {
            axum::serve(redirect, redirect_router(config.https_port))
                .await
                .context("HTTP redirect server failed")
        },
    )?;
    Ok(())
}
