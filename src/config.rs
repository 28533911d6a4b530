use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub lifecycle: LifecycleConfig,
    pub server: ServerConfig,
    pub healthz: EndpointConfig,
    pub metricz: EndpointConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Budget for the whole shutdown sweep, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Serve at all; a disabled server idles until closed
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[serde(default = "default_server_request_timeout_secs")]
    pub request_timeout_secs: u64,

    pub cors: Option<CorsConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default)]
    pub allow_credentials: bool,

    #[serde(default)]
    pub allowed_headers: Vec<String>,
}

/// Settings for the health and metrics listeners
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EndpointConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,

    #[serde(default = "default_endpoint_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl LifecycleConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl EndpointConfig {
    pub fn healthz() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_healthz_port(),
            request_timeout_secs: default_endpoint_request_timeout_secs(),
        }
    }

    pub fn metricz() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_metricz_port(),
            request_timeout_secs: default_endpoint_request_timeout_secs(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_server_port(),
            request_timeout_secs: default_server_request_timeout_secs(),
            cors: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("nextservice.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "lifecycle.shutdown_timeout_secs",
                default_shutdown_timeout_secs() as i64,
            )?
            .set_default("server.enabled", default_enabled())?
            .set_default("server.host", default_host())?
            .set_default("server.port", default_server_port())?
            .set_default(
                "server.request_timeout_secs",
                default_server_request_timeout_secs() as i64,
            )?
            .set_default("healthz.enabled", default_enabled())?
            .set_default("healthz.host", default_host())?
            .set_default("healthz.port", default_healthz_port())?
            .set_default(
                "healthz.request_timeout_secs",
                default_endpoint_request_timeout_secs() as i64,
            )?
            .set_default("metricz.enabled", default_enabled())?
            .set_default("metricz.host", default_host())?
            .set_default("metricz.port", default_metricz_port())?
            .set_default(
                "metricz.request_timeout_secs",
                default_endpoint_request_timeout_secs() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // NEXTSERVICE_SERVER__PORT=9000 overrides server.port
            .add_source(
                Environment::with_prefix("NEXTSERVICE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ServiceConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Shutdown timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Server request timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(cors) = &self.server.cors {
            if cors.allow_credentials && cors.allowed_origins.iter().any(|o| o == "*") {
                return Err(ConfigError::Message(
                    "CORS credentials cannot be combined with a wildcard origin".to_string(),
                ));
            }
        }

        for (name, endpoint) in [("healthz", &self.healthz), ("metricz", &self.metricz)] {
            if endpoint.request_timeout_secs == 0 {
                return Err(ConfigError::Message(format!(
                    "{} request timeout must be greater than 0",
                    name
                )));
            }
        }

        let enabled_ports = [
            (self.server.enabled, self.server.port),
            (self.healthz.enabled, self.healthz.port),
            (self.metricz.enabled, self.metricz.port),
        ];
        let mut ports: Vec<u16> = enabled_ports
            .iter()
            .filter(|(enabled, port)| *enabled && *port != 0)
            .map(|(_, port)| *port)
            .collect();
        ports.sort_unstable();
        if ports.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Message(
                "Enabled listeners must use distinct ports".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleConfig {
                shutdown_timeout_secs: default_shutdown_timeout_secs(),
            },
            server: ServerConfig::default(),
            healthz: EndpointConfig::healthz(),
            metricz: EndpointConfig::metricz(),
        }
    }
}

// Default value functions
fn default_shutdown_timeout_secs() -> u64 {
    10
}
fn default_enabled() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8080
}
fn default_server_request_timeout_secs() -> u64 {
    30
}
fn default_healthz_port() -> u16 {
    60005
}
fn default_metricz_port() -> u16 {
    60004
}
fn default_endpoint_request_timeout_secs() -> u64 {
    5
}
