use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "GRAPHCLASS";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Architecture and location of the pretrained classifier.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub weights_path: PathBuf,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
    /// Load weights during startup instead of on the first prediction.
    pub preload: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_nodes: usize,
    pub max_edges: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            max_edges: 1_000_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub max_history: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub limits: LimitsConfig,
    pub metrics: MetricsConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// `config/default` then `config/{RUN_MODE}`, overlaid by `GRAPHCLASS__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment());

        builder.build()?.try_deserialize()
    }

    /// Load a single explicit file, still overlaid by the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = with_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .add_source(environment());

        builder.build()?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let limits = LimitsConfig::default();
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000i64)?
        .set_default("server.max_body_bytes", 16i64 * 1024 * 1024)?
        .set_default("model.input_dim", 1i64)?
        .set_default("model.hidden_dim", 64i64)?
        .set_default("model.output_dim", 3i64)?
        .set_default("model.preload", true)?
        .set_default("limits.max_nodes", limits.max_nodes as i64)?
        .set_default("limits.max_edges", limits.max_edges as i64)?
        .set_default("metrics.max_history", 1024i64)?
        .set_default("log.format", "pretty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_fills_defaults() {
        let file = write_config(
            r#"
[model]
weights_path = "model/model.rkyv"
"#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model.weights_path, PathBuf::from("model/model.rkyv"));
        assert_eq!(config.model.input_dim, 1);
        assert_eq!(config.model.hidden_dim, 64);
        assert_eq!(config.model.output_dim, 3);
        assert!(config.model.preload);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(config.limits.max_nodes, 100_000);
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_from_overrides() {
        let file = write_config(
            r#"
[server]
host = "127.0.0.1"
port = 9100

[model]
weights_path = "/srv/weights.rkyv"
hidden_dim = 32
preload = false

[limits]
max_nodes = 10
max_edges = 20

[log]
format = "json"
"#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9100");
        assert_eq!(config.model.hidden_dim, 32);
        assert!(!config.model.preload);
        assert_eq!(config.limits.max_nodes, 10);
        assert_eq!(config.limits.max_edges, 20);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_weights_path_is_an_error() {
        let file = write_config("[server]\nport = 8080\n");
        assert!(AppConfig::load_from(file.path()).is_err());
    }
}
