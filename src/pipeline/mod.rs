pub mod presets;

use crate::config::PipelineConfig;
use crate::error::{ETLError, Result, WriteError};
use crate::events::LoggingEventEmitter;
use crate::traits::{EventEmitter, RecordSink, RecordSource, RowTransform};
use crate::transform::common::apply_guarded;
use crate::transform::pool::{ResultStream, WorkerPool};
use crate::types::{Outcome, PipelineEvent, PipelineResult, PipelineState, SkipStage, Task, TaskResult};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub use self::presets::{
    jsonl_to_csv, process_csv, process_csv_file, process_csv_file_sequential, process_csv_sequential,
};

/// Resultado de uma execução: contadores e o destino devolvido por `finish`
#[derive(Debug)]
pub struct PipelineRun<Out> {
    pub result: PipelineResult,
    pub output: Out,
}

/// Estado, identificação e eventos de um pipeline, compartilhados entre a
/// tarefa que lê a fonte e a que drena os resultados.
struct RunContext {
    pipeline_id: String,
    state: Mutex<PipelineState>,
    emitter: Arc<dyn EventEmitter>,
}

impl RunContext {
    fn current_state(&self) -> PipelineState {
        self.state.lock().map(|state| state.clone()).unwrap_or_default()
    }

    // falha de observabilidade não interrompe a execução
    async fn emit(&self, event: PipelineEvent) {
        if let Err(err) = self.emitter.emit(event).await {
            warn!(pipeline_id = %self.pipeline_id, error = %err, "Falha ao emitir evento");
        }
    }

    async fn set_state(&self, new_state: PipelineState) {
        let old_state = match self.state.lock() {
            Ok(mut state) => std::mem::replace(&mut *state, new_state.clone()),
            Err(_) => return,
        };

        self.emit(PipelineEvent::StateChanged {
            pipeline_id: self.pipeline_id.clone(),
            old_state,
            new_state,
            timestamp: SystemTime::now(),
        })
        .await;
    }

    /// Reporta um registro descartado: log, contador de erros e evento
    async fn skip(&self, result: &mut PipelineResult, stage: SkipStage, record: usize, reason: String) {
        warn!(
            pipeline_id = %self.pipeline_id,
            stage = %stage,
            record = record,
            reason = %reason,
            "Registro descartado"
        );
        result.record_error(format!("{} registro {}: {}", stage, record, reason));

        self.emit(PipelineEvent::RecordSkipped {
            pipeline_id: self.pipeline_id.clone(),
            stage,
            record,
            reason,
            timestamp: SystemTime::now(),
        })
        .await;
    }

    async fn complete<Out>(&self, outcome: Result<PipelineRun<Out>>) -> Result<PipelineRun<Out>> {
        match outcome {
            Ok(run) => {
                self.set_state(PipelineState::Completed).await;
                self.emit(PipelineEvent::Completed {
                    pipeline_id: self.pipeline_id.clone(),
                    result: run.result.clone(),
                    timestamp: SystemTime::now(),
                })
                .await;
                info!(
                    "Pipeline executado - {} registros lidos, {} escritos em {}ms",
                    run.result.rows_read, run.result.rows_written, run.result.execution_time_ms
                );
                Ok(run)
            }
            Err(err) => {
                self.set_state(PipelineState::Failed(err.to_string())).await;
                Err(err)
            }
        }
    }
}

/// Pipeline fonte -> transformação -> destino
///
/// `run` aplica a transformação em um pool de workers e escreve na ordem de
/// conclusão; `run_sequential` aplica na própria tarefa e preserva a ordem
/// de entrada. Em ambos, erros por registro são contados e reportados sem
/// interromper a execução.
pub struct Pipeline<S, T, K> {
    source: S,
    transform: T,
    sink: K,
    config: PipelineConfig,
    context: Arc<RunContext>,
}

impl Pipeline<(), (), ()> {
    /// Cria um novo builder de pipeline
    pub fn builder() -> PipelineBuilder<(), (), ()> {
        PipelineBuilder::new()
    }

    /// Cria um builder com configuração personalizada
    pub fn with_config(config: PipelineConfig) -> PipelineBuilder<(), (), ()> {
        PipelineBuilder::with_config(config)
    }
}

impl<S, T, K> Pipeline<S, T, K>
where
    S: RecordSource,
    K: RecordSink,
    T: RowTransform<S::Record, K::Record>,
{
    /// Retorna o ID do pipeline
    pub fn pipeline_id(&self) -> &str {
        &self.context.pipeline_id
    }

    /// Retorna o estado atual do pipeline
    pub fn current_state(&self) -> PipelineState {
        self.context.current_state()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executa o pipeline com o pool de workers.
    ///
    /// O dreno do destino começa antes da leitura. A fonte é lida até o fim
    /// nesta tarefa, o pool é fechado uma única vez e só então o resultado é
    /// devolvido, depois do flush final.
    pub async fn run(self) -> Result<PipelineRun<K::Output>> {
        let context = Arc::clone(&self.context);
        let outcome = self.run_parallel().await;
        context.complete(outcome).await
    }

    /// Executa sem pool, na ordem da entrada
    pub async fn run_sequential(self) -> Result<PipelineRun<K::Output>> {
        let context = Arc::clone(&self.context);
        let outcome = self.run_inline().await;
        context.complete(outcome).await
    }

    async fn run_parallel(self) -> Result<PipelineRun<K::Output>> {
        let start_time = Instant::now();
        let Pipeline { mut source, transform, sink, config, context } = self;

        let pool_size = config.worker_count()?;
        let mut pool = WorkerPool::new(transform, pool_size)?;
        let drain = tokio::spawn(drain_results(pool.results()?, sink, Arc::clone(&context)));

        context
            .emit(PipelineEvent::Started {
                pipeline_id: context.pipeline_id.clone(),
                pool_size,
                timestamp: SystemTime::now(),
            })
            .await;
        context.set_state(PipelineState::Reading).await;

        let mut result = PipelineResult::new();
        if config.skip_header {
            if let Err(err) = source.discard_header() {
                result.decode_failures += 1;
                context.skip(&mut result, SkipStage::Decode, err.record, err.reason).await;
            }
        }

        let mut submit_error = None;
        while let Some(item) = source.next_record() {
            match item {
                Ok(task) => {
                    result.rows_read += 1;
                    if let Err(err) = pool.submit_task(task).await {
                        submit_error = Some(err);
                        break;
                    }
                    result.rows_submitted += 1;
                }
                Err(err) => {
                    result.decode_failures += 1;
                    context.skip(&mut result, SkipStage::Decode, err.record, err.reason).await;
                }
            }
        }

        context.set_state(PipelineState::Draining).await;
        let closed = pool.close().await;

        let (drained, output) = drain
            .await
            .map_err(|err| ETLError::Pipeline(format!("tarefa de escrita abortou: {}", err)))?;

        if let Some(err) = submit_error {
            return Err(err);
        }
        closed?;
        let output = output?;

        merge_drained(&mut result, drained);
        result.rows_dropped = result
            .rows_submitted
            .saturating_sub(result.rows_written + result.transform_failures + result.write_failures);
        result.execution_time_ms = start_time.elapsed().as_millis() as u64;

        Ok(PipelineRun { result, output })
    }

    async fn run_inline(self) -> Result<PipelineRun<K::Output>> {
        let start_time = Instant::now();
        let Pipeline { mut source, transform, mut sink, config, context } = self;

        context
            .emit(PipelineEvent::Started {
                pipeline_id: context.pipeline_id.clone(),
                pool_size: 1,
                timestamp: SystemTime::now(),
            })
            .await;
        context.set_state(PipelineState::Reading).await;

        let mut result = PipelineResult::new();
        if config.skip_header {
            if let Err(err) = source.discard_header() {
                result.decode_failures += 1;
                context.skip(&mut result, SkipStage::Decode, err.record, err.reason).await;
            }
        }

        while let Some(item) = source.next_record() {
            let Task { seq, record } = match item {
                Ok(task) => task,
                Err(err) => {
                    result.decode_failures += 1;
                    context.skip(&mut result, SkipStage::Decode, err.record, err.reason).await;
                    continue;
                }
            };
            result.rows_read += 1;
            result.rows_submitted += 1;

            match apply_guarded(&transform, record) {
                Outcome::Emit(record) => match sink.write_record(seq, &record) {
                    Ok(()) => result.rows_written += 1,
                    Err(err) => {
                        result.write_failures += 1;
                        context.skip(&mut result, SkipStage::Write, err.record, err.reason).await;
                    }
                },
                Outcome::Drop => result.rows_dropped += 1,
                Outcome::Fail(err) => {
                    result.transform_failures += 1;
                    context.skip(&mut result, SkipStage::Transform, seq, err.to_string()).await;
                }
            }
        }

        context.set_state(PipelineState::Draining).await;
        sink.flush()?;
        let output = sink.finish()?;
        result.execution_time_ms = start_time.elapsed().as_millis() as u64;

        Ok(PipelineRun { result, output })
    }
}

/// Consome o stream de resultados até o fechamento do pool, escrevendo cada
/// registro emitido no destino. É o único dono do destino durante a execução.
async fn drain_results<K: RecordSink>(
    mut results: ResultStream<K::Record>,
    mut sink: K,
    context: Arc<RunContext>,
) -> (PipelineResult, std::result::Result<K::Output, WriteError>) {
    let mut drained = PipelineResult::new();

    while let Some(item) = results.recv().await {
        match item {
            TaskResult::Emitted { seq, record } => match sink.write_record(seq, &record) {
                Ok(()) => drained.rows_written += 1,
                Err(err) => {
                    drained.write_failures += 1;
                    context.skip(&mut drained, SkipStage::Write, err.record, err.reason).await;
                }
            },
            TaskResult::Failed { seq, error } => {
                drained.transform_failures += 1;
                context.skip(&mut drained, SkipStage::Transform, seq, error.to_string()).await;
            }
        }
    }

    let output = sink.flush().and_then(|()| sink.finish());
    (drained, output)
}

fn merge_drained(result: &mut PipelineResult, drained: PipelineResult) {
    result.rows_written += drained.rows_written;
    result.transform_failures += drained.transform_failures;
    result.write_failures += drained.write_failures;
    for error in drained.errors {
        result.record_error(error);
    }
}

/// Builder para criação de pipelines
pub struct PipelineBuilder<S, T, K> {
    source: S,
    transform: T,
    sink: K,
    config: PipelineConfig,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl PipelineBuilder<(), (), ()> {
    /// Cria um novo builder
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Cria um builder com configuração personalizada
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            source: (),
            transform: (),
            sink: (),
            config,
            event_emitter: None,
        }
    }
}

impl<S, T, K> PipelineBuilder<S, T, K> {
    /// Define a fonte
    pub fn source<NewS: RecordSource>(self, source: NewS) -> PipelineBuilder<NewS, T, K> {
        PipelineBuilder {
            source,
            transform: self.transform,
            sink: self.sink,
            config: self.config,
            event_emitter: self.event_emitter,
        }
    }

    /// Define a transformação
    pub fn transform<NewT>(self, transform: NewT) -> PipelineBuilder<S, NewT, K> {
        PipelineBuilder {
            source: self.source,
            transform,
            sink: self.sink,
            config: self.config,
            event_emitter: self.event_emitter,
        }
    }

    /// Define o destino
    pub fn sink<NewK: RecordSink>(self, sink: NewK) -> PipelineBuilder<S, T, NewK> {
        PipelineBuilder {
            source: self.source,
            transform: self.transform,
            sink,
            config: self.config,
            event_emitter: self.event_emitter,
        }
    }

    /// Define a configuração
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Define o número de workers; valores <= 0 falham em `build`
    pub fn pool_size(mut self, size: i64) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Descarta o primeiro registro da fonte
    pub fn skip_header(mut self, skip: bool) -> Self {
        self.config.skip_header = skip;
        self
    }

    /// Define o event emitter
    pub fn event_emitter<E: EventEmitter + 'static>(mut self, emitter: E) -> Self {
        self.event_emitter = Some(Arc::new(emitter));
        self
    }
}

impl<S, T, K> PipelineBuilder<S, T, K>
where
    S: RecordSource,
    K: RecordSink,
    T: RowTransform<S::Record, K::Record>,
{
    /// Constrói o pipeline, validando a configuração
    pub fn build(self) -> Result<Pipeline<S, T, K>> {
        self.config.validate()?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();

        Ok(Pipeline {
            source: self.source,
            transform: self.transform,
            sink: self.sink,
            config: self.config,
            context: Arc::new(RunContext {
                pipeline_id: format!("pipeline-{}-{}", std::process::id(), millis),
                state: Mutex::new(PipelineState::default()),
                emitter: self
                    .event_emitter
                    .unwrap_or_else(|| Arc::new(LoggingEventEmitter::default())),
            }),
        })
    }
}

impl Default for PipelineBuilder<(), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}
