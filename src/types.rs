use crate::error::TransformError;
use std::time::SystemTime;

/// Uma linha de dados delimitados: campos em ordem
pub type Row = Vec<String>;

/// Um registro de entrada delimitada por linhas, sem o terminador
pub type Payload = Vec<u8>;

/// Registro em trânsito pelo pool de workers
///
/// `seq` é o número do registro (começando em 1) atribuído pela fonte e
/// usado em todo relatório de descarte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task<T> {
    pub seq: usize,
    pub record: T,
}

impl<T> Task<T> {
    pub fn new(seq: usize, record: T) -> Self {
        Self { seq, record }
    }
}

/// Saída da transformação para um registro
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Registro a ser escrito
    Emit(T),
    /// Nenhuma saída para esta entrada, sem erro
    Drop,
    /// Falha da transformação; o registro é descartado
    Fail(TransformError),
}

impl<T> Outcome<T> {
    pub fn is_drop(&self) -> bool {
        matches!(self, Outcome::Drop)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Emit(record) => Outcome::Emit(f(record)),
            Outcome::Drop => Outcome::Drop,
            Outcome::Fail(err) => Outcome::Fail(err),
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(record) => Outcome::Emit(record),
            None => Outcome::Drop,
        }
    }
}

/// O que atravessa o canal de saída do pool. Descartes (`Outcome::Drop`)
/// nunca chegam aqui.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult<T> {
    Emitted { seq: usize, record: T },
    Failed { seq: usize, error: TransformError },
}

impl<T> TaskResult<T> {
    pub fn seq(&self) -> usize {
        match self {
            TaskResult::Emitted { seq, .. } | TaskResult::Failed { seq, .. } => *seq,
        }
    }

    pub fn into_record(self) -> Option<T> {
        match self {
            TaskResult::Emitted { record, .. } => Some(record),
            TaskResult::Failed { .. } => None,
        }
    }
}

/// Estado do pool de workers. Transições apenas para frente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl PoolState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Open,
            1 => PoolState::Closing,
            _ => PoolState::Closed,
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolState::Open => write!(f, "Aberto"),
            PoolState::Closing => write!(f, "Fechando"),
            PoolState::Closed => write!(f, "Fechado"),
        }
    }
}

/// Quantidade máxima de mensagens de erro guardadas em `PipelineResult`
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Resultado de uma execução de pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    /// Registros decodificados com sucesso pela fonte
    pub rows_read: usize,
    pub rows_submitted: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub decode_failures: usize,
    pub transform_failures: usize,
    pub write_failures: usize,
    pub execution_time_ms: u64,
    pub errors: Vec<String>,
}

impl PipelineResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total de registros descartados por erro em qualquer estágio
    pub fn rows_failed(&self) -> usize {
        self.decode_failures + self.transform_failures + self.write_failures
    }

    pub fn success_rate(&self) -> f64 {
        let attempted = self.rows_read + self.decode_failures;
        if attempted == 0 {
            0.0
        } else {
            self.rows_written as f64 / attempted as f64
        }
    }

    pub fn has_errors(&self) -> bool {
        self.rows_failed() > 0
    }

    pub(crate) fn record_error(&mut self, message: String) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(message);
        }
    }
}

/// Estados do pipeline para rastreamento de execução
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Reading,
    Draining,
    Completed,
    Failed(String),
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Ocioso"),
            PipelineState::Reading => write!(f, "Lendo"),
            PipelineState::Draining => write!(f, "Drenando"),
            PipelineState::Completed => write!(f, "Concluído"),
            PipelineState::Failed(error) => write!(f, "Falhou: {}", error),
        }
    }
}

/// Estágio em que um registro foi descartado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipStage {
    Decode,
    Transform,
    Write,
}

impl std::fmt::Display for SkipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipStage::Decode => write!(f, "decode"),
            SkipStage::Transform => write!(f, "transform"),
            SkipStage::Write => write!(f, "write"),
        }
    }
}

/// Eventos do pipeline para monitoramento externo
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Pipeline iniciado
    Started {
        pipeline_id: String,
        pool_size: usize,
        timestamp: SystemTime,
    },
    /// Estado alterado
    StateChanged {
        pipeline_id: String,
        old_state: PipelineState,
        new_state: PipelineState,
        timestamp: SystemTime,
    },
    /// Registro descartado sem interromper o pipeline
    RecordSkipped {
        pipeline_id: String,
        stage: SkipStage,
        record: usize,
        reason: String,
        timestamp: SystemTime,
    },
    /// Pipeline concluído
    Completed {
        pipeline_id: String,
        result: PipelineResult,
        timestamp: SystemTime,
    },
}
