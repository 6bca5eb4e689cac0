//! # rowpipe - Transformação concorrente de linhas
//!
//! Lê registros de uma fonte em streaming (CSV ou JSON Lines), aplica uma
//! função de transformação em um pool de workers de tamanho fixo e escreve
//! os resultados num destino, com memória limitada independente do tamanho
//! da entrada.
//!
//! ## Exemplo Rápido
//!
//! ```rust,no_run
//! use rowpipe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // CSV -> soma das colunas -> CSV, com 4 workers
//!     let run = Pipeline::builder()
//!         .source(CsvSource::from_path("numeros.csv")?)
//!         .transform(AppendSumTransform)
//!         .sink(CsvSink::create("somas.csv")?)
//!         .pool_size(4)
//!         .skip_header(true)
//!         .build()?
//!         .run()
//!         .await?;
//!
//!     println!("{} linhas escritas", run.result.rows_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Arquitetura
//!
//! ### Fontes
//! Decodificam a entrada um registro por vez (`RecordSource`).
//!
//! ### Transformação
//! Uma função pura por registro (`RowTransform`) que emite, descarta ou
//! falha. O pool aplica em paralelo; a ordem de saída não é garantida.
//!
//! ### Destinos
//! Serializam cada registro emitido (`RecordSink`). Um único dreno escreve,
//! então o destino não precisa ser thread-safe.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod extract;
pub mod transform;
pub mod load;
pub mod pipeline;
pub mod events;
pub mod telemetry;

// Re-exports para facilitar o uso
pub use config::{ETLConfig, PipelineConfig};
pub use error::{ETLError, Result};
pub use types::{Outcome, PipelineEvent, PipelineResult, PipelineState, Row, Payload};
pub use traits::*;
pub use pipeline::{Pipeline, PipelineRun};
pub use events::{LoggingEventEmitter, InMemoryEventEmitter};

/// Prelude com imports mais comuns
pub mod prelude {
    pub use crate::config::{ETLConfig, LogFormat, ObservabilityConfig, PipelineConfig};
    pub use crate::error::{ETLError, Result, TransformError};
    pub use crate::types::{Outcome, Payload, PipelineEvent, PipelineResult, PipelineState, Row, SkipStage};
    pub use crate::traits::{EventEmitter, RecordSink, RecordSource, RowTransform};
    pub use crate::pipeline::{
        jsonl_to_csv, process_csv, process_csv_file, process_csv_file_sequential, process_csv_sequential,
        Pipeline, PipelineRun,
    };
    pub use crate::events::{LoggingEventEmitter, InMemoryEventEmitter};
    pub use crate::telemetry::init_tracing;

    // Fontes
    pub use crate::extract::{CsvSource, JsonLinesSource};

    // Transformações
    pub use crate::transform::{
        AppendSumTransform, FilterMapTransform, JsonFieldsTransform, MapTransform, OutcomeTransform,
        PassthroughTransform, TryMapTransform, WorkerPool,
    };

    // Destinos
    pub use crate::load::{CsvSink, JsonLinesSink, MemorySink};
}

/// Informações sobre a versão da biblioteca
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Informações sobre a biblioteca
pub fn about() -> &'static str {
    env!("CARGO_PKG_DESCRIPTION")
}
