use thiserror::Error;

/// Tipo Result principal da biblioteca
pub type Result<T> = std::result::Result<T, ETLError>;

/// Erro principal da biblioteca rowpipe
#[derive(Error, Debug)]
pub enum ETLError {
    #[error("Erro de extração: {0}")]
    Extract(#[from] DecodeError),

    #[error("Erro de transformação: {0}")]
    Transform(#[from] TransformError),

    #[error("Erro de escrita: {0}")]
    Load(#[from] WriteError),

    #[error("Erro de configuração: {0}")]
    Config(#[from] ConfigError),

    #[error("Pool de workers já foi fechado")]
    PoolClosed,

    #[error("Erro de pipeline: {0}")]
    Pipeline(String),

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erro genérico: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Registro de entrada que não pôde ser decodificado
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("registro {record}: {reason}")]
pub struct DecodeError {
    pub record: usize,
    pub reason: String,
}

impl DecodeError {
    pub fn new(record: usize, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
        }
    }
}

/// Falha sinalizada pela função de transformação para um único registro
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transformação falhou: {0}")]
    Failed(String),

    #[error("transformação entrou em pânico: {0}")]
    Panicked(String),
}

impl TransformError {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        TransformError::Failed(reason.to_string())
    }
}

/// Registro que o destino não conseguiu serializar ou descarregar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("registro {record}: {reason}")]
pub struct WriteError {
    pub record: usize,
    pub reason: String,
}

impl WriteError {
    pub fn new(record: usize, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
        }
    }

    /// Falha no flush final, sem registro associado
    pub fn flush(reason: impl Into<String>) -> Self {
        Self::new(0, reason)
    }
}

/// Erros relacionados à configuração
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Valor inválido para {param}: {value}")]
    InvalidValue { param: String, value: String },

    #[error("Parâmetro obrigatório ausente: {0}")]
    MissingValue(String),

    #[error("Erro de parsing de configuração: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn invalid(param: &str, value: impl std::fmt::Display) -> Self {
        ConfigError::InvalidValue {
            param: param.to_string(),
            value: value.to_string(),
        }
    }
}

impl ETLError {
    /// Verifica se o erro afeta apenas um registro (pular e continuar)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ETLError::Extract(_) | ETLError::Transform(_) | ETLError::Load(_)
        )
    }

    /// Retorna o código de erro
    pub fn error_code(&self) -> &'static str {
        match self {
            ETLError::Extract(_) => "DECODE_ERROR",
            ETLError::Transform(_) => "TRANSFORM_ERROR",
            ETLError::Load(_) => "WRITE_ERROR",
            ETLError::Config(_) => "CONFIG_ERROR",
            ETLError::PoolClosed => "POOL_CLOSED",
            ETLError::Pipeline(_) => "PIPELINE_ERROR",
            ETLError::Io(_) => "IO_ERROR",
            ETLError::Serialization(_) => "SERIALIZATION_ERROR",
            ETLError::Generic(_) => "GENERIC_ERROR",
        }
    }

    /// Código de saída do processo: só falhas de configuração são distintas
    pub fn exit_code(&self) -> i32 {
        match self {
            ETLError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl From<config::ConfigError> for ETLError {
    fn from(err: config::ConfigError) -> Self {
        ETLError::Config(ConfigError::ParseError(err.to_string()))
    }
}

impl From<csv::Error> for ETLError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io_err) => {
                ETLError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()))
            }
            _ => {
                let record = err
                    .position()
                    .map(|pos| pos.record() as usize + 1)
                    .unwrap_or(0);
                ETLError::Extract(DecodeError::new(record, err.to_string()))
            }
        }
    }
}
