use async_trait::async_trait;
use crate::error::{DecodeError, Result, WriteError};
use crate::types::{Outcome, PipelineEvent, Task};

/// Fonte de registros em streaming
///
/// Cada registro entregue deve ser uma cópia independente: o decodificador
/// pode reutilizar seu buffer interno entre leituras.
pub trait RecordSource: Send {
    type Record: Send + 'static;

    /// Próximo registro, ou `None` no fim do stream.
    ///
    /// Um `Err` descreve um registro que não pôde ser decodificado; a leitura
    /// continua na chamada seguinte.
    fn next_record(&mut self) -> Option<std::result::Result<Task<Self::Record>, DecodeError>>;

    /// Descarta o primeiro registro (cabeçalho) sem contá-lo
    fn discard_header(&mut self) -> std::result::Result<(), DecodeError>;
}

/// Função de transformação aplicada por registro
///
/// Deve ser pura: várias chamadas podem executar em paralelo.
pub trait RowTransform<I, O>: Send + Sync + 'static {
    fn apply(&self, record: I) -> Outcome<O>;
}

/// Destino de registros transformados
pub trait RecordSink: Send + 'static {
    type Record: Send + 'static;
    type Output: Send + 'static;

    /// Serializa um registro. `seq` é usado apenas para relatório.
    fn write_record(&mut self, seq: usize, record: &Self::Record) -> std::result::Result<(), WriteError>;

    /// Descarrega o que estiver em buffer
    fn flush(&mut self) -> std::result::Result<(), WriteError>;

    /// Flush final; devolve o destino subjacente
    fn finish(self) -> std::result::Result<Self::Output, WriteError>;
}

/// Trait para emissão de eventos do pipeline
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emite um evento do pipeline
    async fn emit(&self, event: PipelineEvent) -> Result<()>;
}
