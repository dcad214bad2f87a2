//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::render::RendererConfig;
use crate::routes::RouterOptions;
use crate::tls::TlsMode;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Rendered artifacts; also served under `/img`.
    pub certificates_dir: PathBuf,
    /// Background image and font for rendering.
    pub template_dir: PathBuf,
    /// Front-end static files.
    pub app_dir: PathBuf,
    /// INI file with admin credentials and API keys.
    pub credentials_path: PathBuf,
    pub database_path: PathBuf,
    pub tls: TlsMode,
    pub https_port: u16,
    pub http_port: u16,
    pub public_url: String,
    pub pdftoppm: PathBuf,
    pub render_timeout: Duration,
    pub require_api_key: bool,
    /// Zero disables the periodic purge.
    pub purge_interval: Duration,
}

impl ServerConfig {
    pub const fn https_addr(&self) -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.https_port)
    }

    pub const fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.http_port)
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            output_dir: self.certificates_dir.clone(),
            template_dir: self.template_dir.clone(),
            pdftoppm: self.pdftoppm.clone(),
            timeout: self.render_timeout,
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            app_dir: self.app_dir.clone(),
            certificates_dir: self.certificates_dir.clone(),
            require_api_key: self.require_api_key,
        }
    }
}
