//! Target configuration
//!
//! Which server a conformance run talks to, and how: host, port, request
//! path, whether to use TLS and an optional read timeout. Values can be set
//! through the builder or picked up from `H2CHECK_*` environment variables.

use crate::http::h2::HeaderField;
use crate::http::tls::TlsConfig;
use crate::http::{self, FdSessionOps, SessionOps};
use std::time::Duration;
use tracing::debug;

pub const ENV_HOST: &str = "H2CHECK_HOST";
pub const ENV_PORT: &str = "H2CHECK_PORT";
pub const ENV_PATH: &str = "H2CHECK_PATH";
pub const ENV_TLS: &str = "H2CHECK_TLS";
pub const ENV_INSECURE: &str = "H2CHECK_INSECURE";
pub const ENV_TIMEOUT_MS: &str = "H2CHECK_TIMEOUT_MS";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Empty host")]
    EmptyHost,
}

/// Server under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub tls: bool,
    /// Skip certificate verification (TLS only)
    pub insecure: bool,
    pub timeout: Option<Duration>,
}

impl TargetConfig {
    pub fn builder() -> TargetConfigBuilder {
        TargetConfigBuilder::new()
    }

    /// Read the `H2CHECK_*` environment variables; unset ones keep their defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`TargetConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = TargetConfigBuilder::new();

        if let Some(host) = lookup(ENV_HOST) {
            builder = builder.host(host);
        }
        if let Some(tls) = lookup(ENV_TLS) {
            builder = builder.tls(parse_bool(ENV_TLS, &tls)?);
        }
        if let Some(insecure) = lookup(ENV_INSECURE) {
            builder = builder.insecure(parse_bool(ENV_INSECURE, &insecure)?);
        }
        if let Some(port) = lookup(ENV_PORT) {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| invalid(ENV_PORT, &port, e.to_string()))?;
            builder = builder.port(port);
        }
        if let Some(path) = lookup(ENV_PATH) {
            builder = builder.path(path);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            let ms = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(ENV_TIMEOUT_MS, &timeout, e.to_string()))?;
            builder = builder.timeout(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// `host:port` for socket address resolution
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    fn default_port(&self) -> u16 {
        if self.tls {
            443
        } else {
            80
        }
    }

    /// Value for `:authority`; the port is left out when it is the scheme's default
    pub fn authority(&self) -> String {
        if self.port == self.default_port() {
            self.host.clone()
        } else {
            self.addr()
        }
    }

    /// Pseudo-headers of a plain GET for the configured path
    pub fn common_headers(&self) -> Vec<HeaderField> {
        vec![
            HeaderField::new(":method", "GET"),
            HeaderField::new(":scheme", self.scheme()),
            HeaderField::new(":path", self.path.as_str()),
            HeaderField::new(":authority", self.authority()),
        ]
    }

    /// Open a transport to the target, negotiating `h2` over TLS if enabled
    pub fn connect(&self) -> http::Result<Box<dyn SessionOps + Send>> {
        debug!("connecting to {}://{}", self.scheme(), self.addr());
        let tcp = FdSessionOps::connect(self.addr(), self.timeout)?;

        if !self.tls {
            return Ok(Box::new(tcp));
        }

        let tls = TlsConfig::client()
            .servername(self.host.as_str())
            .verify_peer(!self.insecure)
            .build()?;
        let session = tls.connect(tcp.into_stream())?;
        Ok(Box::new(session))
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            host: "127.0.0.1".to_string(),
            port: 80,
            path: "/".to_string(),
            tls: false,
            insecure: false,
            timeout: None,
        }
    }
}

/// Builder for [`TargetConfig`]
///
/// Leaving the port unset picks 80 or 443 depending on TLS.
#[derive(Debug, Clone, Default)]
pub struct TargetConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    tls: bool,
    insecure: bool,
    timeout: Option<Duration>,
}

impl TargetConfigBuilder {
    pub fn new() -> Self {
        TargetConfigBuilder::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<TargetConfig, ConfigError> {
        let defaults = TargetConfig::default();

        let host = self.host.unwrap_or(defaults.host);
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let path = match self.path {
            Some(path) if path.is_empty() => "/".to_string(),
            Some(path) => path,
            None => defaults.path,
        };

        let port = self.port.unwrap_or(if self.tls { 443 } else { 80 });

        Ok(TargetConfig {
            host,
            port,
            path,
            tls: self.tls,
            insecure: self.insecure,
            timeout: self.timeout,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(name, value, "expected a boolean".to_string())),
    }
}

fn invalid(name: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    }
}
