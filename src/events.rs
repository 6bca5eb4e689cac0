//! Sistema de eventos para observabilidade do pipeline

use async_trait::async_trait;
use crate::error::Result;
use crate::traits::EventEmitter;
use crate::types::{PipelineEvent, SkipStage};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Implementação simples de EventEmitter que logga eventos
#[derive(Debug, Clone, Default)]
pub struct LoggingEventEmitter;

impl LoggingEventEmitter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventEmitter for LoggingEventEmitter {
    async fn emit(&self, event: PipelineEvent) -> Result<()> {
        match event {
            PipelineEvent::Started { pipeline_id, pool_size, timestamp } => {
                info!(
                    pipeline_id = %pipeline_id,
                    pool_size = pool_size,
                    timestamp = ?timestamp,
                    "Pipeline iniciado"
                );
            }
            PipelineEvent::StateChanged {
                pipeline_id,
                old_state,
                new_state,
                timestamp,
            } => {
                info!(
                    pipeline_id = %pipeline_id,
                    old_state = %old_state,
                    new_state = %new_state,
                    timestamp = ?timestamp,
                    "Estado do pipeline alterado"
                );
            }
            // o pipeline já reporta cada descarte com warn!
            PipelineEvent::RecordSkipped {
                pipeline_id,
                stage,
                record,
                reason,
                timestamp,
            } => {
                debug!(
                    pipeline_id = %pipeline_id,
                    stage = %stage,
                    record = record,
                    reason = %reason,
                    timestamp = ?timestamp,
                    "Registro descartado"
                );
            }
            PipelineEvent::Completed { pipeline_id, result, timestamp } => {
                info!(
                    pipeline_id = %pipeline_id,
                    rows_read = result.rows_read,
                    rows_written = result.rows_written,
                    rows_dropped = result.rows_dropped,
                    rows_failed = result.rows_failed(),
                    execution_time_ms = result.execution_time_ms,
                    success_rate = result.success_rate(),
                    timestamp = ?timestamp,
                    "Pipeline concluído"
                );
            }
        }

        Ok(())
    }
}

/// EventEmitter que armazena eventos em memória para testes
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventEmitter {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl InMemoryEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retorna todos os eventos capturados
    pub fn get_events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Retorna os descartes capturados como (estágio, registro)
    pub fn skips(&self) -> Vec<(SkipStage, usize)> {
        self.get_events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::RecordSkipped { stage, record, .. } => Some((stage, record)),
                _ => None,
            })
            .collect()
    }

    /// Limpa todos os eventos armazenados
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    /// Retorna o número de eventos capturados
    pub fn event_count(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventEmitter for InMemoryEventEmitter {
    async fn emit(&self, event: PipelineEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| crate::error::ETLError::Pipeline("mutex de eventos envenenado".to_string()))?
            .push(event);
        Ok(())
    }
}
