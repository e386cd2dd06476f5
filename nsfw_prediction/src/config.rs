use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub server: ServerConfig,
    pub model: ModelConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn deserialize_response_mode<'de, D>(deserializer: D) -> Result<ResponseMode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

pub trait Validatable {
    fn get_path(&self) -> PathBuf;

    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_path()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(
        default = "default_response_mode",
        deserialize_with = "deserialize_response_mode"
    )]
    pub response_mode: ResponseMode,
}

fn default_response_mode() -> ResponseMode {
    ResponseMode::Classify
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub onnx_file: String,
    pub model_dir: PathBuf,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
}

// ONNX sessions are not shared between threads, one is enough to serialize inference.
fn default_model_instances() -> usize {
    1
}

impl Validatable for ModelConfig {
    fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }
}

/// What `POST /predict` answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// JSON `{class, confidence, category}` for every image.
    Classify,
    /// Echo safe images back as a download, reject NSFW ones with 403.
    Gate,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Classify => "classify",
            ResponseMode::Gate => "gate",
        }
    }
}

impl TryFrom<String> for ResponseMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "classify" => Ok(Self::Classify),
            "gate" => Ok(Self::Gate),
            other => Err(format!(
                "{} is not a supported response mode. Use either `classify` or `gate`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config = config.try_deserialize::<Config>()?;
    if let Err(e) = config.model.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    const BASE: &str = r#"
log_level: info
server:
  host: 0.0.0.0
  port: 8080
model:
  model_dir: ./models
  onnx_file: nsfw_mobilenet.onnx
"#;

    fn load(yaml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Config>()
    }

    #[test]
    fn test_defaults() {
        let config = load(BASE).unwrap();

        assert_eq!(config.server.get_address(), "0.0.0.0:8080");
        assert_eq!(config.server.response_mode, ResponseMode::Classify);
        assert_eq!(config.model.num_instances, 1);
        assert_eq!(
            config.model.get_path(),
            PathBuf::from("./models/nsfw_mobilenet.onnx")
        );
    }

    #[test]
    fn test_gate_mode() {
        let yaml = BASE.replace("  port: 8080", "  port: 8080\n  response_mode: Gate");
        let config = load(&yaml).unwrap();

        assert_eq!(config.server.response_mode, ResponseMode::Gate);
    }

    #[test]
    fn test_unknown_response_mode() {
        let yaml = BASE.replace("  port: 8080", "  port: 8080\n  response_mode: redact");

        assert!(load(&yaml).is_err());
    }

    #[test]
    fn test_unknown_log_level() {
        let yaml = BASE.replace("log_level: info", "log_level: trace");

        assert!(load(&yaml).is_err());
    }

    #[test]
    fn test_missing_model_file() {
        let config = load(BASE).unwrap();

        let err = config.model.validate().unwrap_err();
        assert!(err.contains("nsfw_mobilenet.onnx"));
    }
}
