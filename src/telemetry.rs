//! Inicialização do `tracing`

use crate::config::{LogFormat, ObservabilityConfig};
use crate::error::{ETLError, Result};
use tracing_subscriber::EnvFilter;

/// Instala o subscriber global conforme a configuração de observabilidade.
///
/// `RUST_LOG`, quando presente, tem precedência sobre `log_level`. Os logs
/// vão para stderr para não misturar com a saída de dados. Chamar de novo
/// depois que um subscriber já foi instalado não tem efeito.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|err| ETLError::Pipeline(format!("filtro de log inválido: {}", err)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Subscriber de tracing já instalado");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = ObservabilityConfig::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}
