use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{ConfigError, ETLError};

/// Configuração principal do rowpipe
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ETLConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Configuração do pipeline
///
/// `pool_size` é com sinal para que valores negativos vindos de arquivo ou
/// ambiente sejam rejeitados como erro de configuração, e não truncados.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pool_size: i64,
    pub skip_header: bool,
    /// Flush a cada N registros escritos; 0 = só ao final da drenagem
    pub flush_every: usize,
    pub delimiter: String,
    pub flexible: bool,
}

/// Configuração de observabilidade
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Formato de log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get() as i64,
            skip_header: false,
            flush_every: 1,
            delimiter: ",".to_string(),
            flexible: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl PipelineConfig {
    /// Valida e converte o tamanho do pool
    pub fn worker_count(&self) -> Result<usize, ConfigError> {
        if self.pool_size <= 0 {
            return Err(ConfigError::invalid("pool_size", self.pool_size));
        }
        Ok(self.pool_size as usize)
    }

    /// Delimitador como byte ASCII
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::invalid("delimiter", &self.delimiter)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.worker_count()?;
        self.delimiter_byte()?;
        Ok(())
    }
}

impl ETLConfig {
    /// Cria um novo builder para configuração
    pub fn builder() -> ETLConfigBuilder {
        ETLConfigBuilder::default()
    }

    /// Carrega configuração do ambiente (variáveis `ROWPIPE_*`)
    pub fn from_env() -> Result<Self, ETLError> {
        let mut builder = Self::builder();

        if let Some(size) = env_value::<i64>("ROWPIPE_POOL_SIZE")? {
            builder = builder.pool_size(size);
        }

        if let Some(skip) = env_value::<bool>("ROWPIPE_SKIP_HEADER")? {
            builder = builder.skip_header(skip);
        }

        if let Some(every) = env_value::<usize>("ROWPIPE_FLUSH_EVERY")? {
            builder = builder.flush_every(every);
        }

        if let Ok(level) = std::env::var("ROWPIPE_LOG_LEVEL") {
            builder = builder.log_level(level);
        }

        builder.build()
    }

    /// Carrega configuração de arquivo
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ETLError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Carrega configuração de string TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, ETLError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Valida a configuração
    pub fn validate(&self) -> Result<(), ETLError> {
        self.pipeline.validate()?;

        let level = self.observability.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ETLError::Config(ConfigError::invalid(
                "log_level",
                &self.observability.log_level,
            )));
        }

        Ok(())
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ETLError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ETLError::Config(ConfigError::invalid(key, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder para configuração
#[derive(Default)]
pub struct ETLConfigBuilder {
    config: ETLConfig,
}

impl ETLConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_size(mut self, size: i64) -> Self {
        self.config.pipeline.pool_size = size;
        self
    }

    pub fn skip_header(mut self, skip: bool) -> Self {
        self.config.pipeline.skip_header = skip;
        self
    }

    pub fn flush_every(mut self, every: usize) -> Self {
        self.config.pipeline.flush_every = every;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.config.pipeline.delimiter = delimiter.into();
        self
    }

    pub fn flexible(mut self, flexible: bool) -> Self {
        self.config.pipeline.flexible = flexible;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.observability.log_level = level.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.observability.log_format = format;
        self
    }

    pub fn build(self) -> Result<ETLConfig, ETLError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
