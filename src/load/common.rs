//! # Common Utilities
//!
//! Utilitários compartilhados pelos destinos.

use std::io::Write;
use tracing::warn;
use crate::error::WriteError;

/// Política de flush dos destinos baseados em `Write`
///
/// `every == 1` descarrega após cada registro, `every == 0` só no final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    every: usize,
    pending: usize,
}

impl FlushPolicy {
    pub fn every(every: usize) -> Self {
        Self { every, pending: 0 }
    }

    pub fn at_end() -> Self {
        Self::every(0)
    }

    /// Registra uma escrita; retorna true quando é hora de descarregar
    pub fn record_write(&mut self) -> bool {
        self.pending += 1;
        if self.every > 0 && self.pending >= self.every {
            self.pending = 0;
            true
        } else {
            false
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::every(1)
    }
}

/// Writer por registro dos destinos baseados em `Write`
///
/// Cada registro é serializado inteiro em `scratch` e só então entregue ao
/// writer com um único `write_all`. Um registro que falha é descartado junto
/// com o `scratch`; nenhum byte dele fica pendente para o registro seguinte.
///
/// Uma falha de flush não é do registro, que já foi entregue: ela fica
/// guardada e é devolvida pelo próximo `flush`/`finish`.
pub struct RecordWriter<W: Write> {
    inner: W,
    scratch: Vec<u8>,
    flush: FlushPolicy,
    deferred_flush: Option<String>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::with_capacity(256),
            flush: FlushPolicy::default(),
            deferred_flush: None,
        }
    }

    pub fn set_flush_policy(&mut self, flush: FlushPolicy) {
        self.flush = flush;
    }

    /// Buffer vazio para serializar o próximo registro
    pub fn scratch(&mut self) -> &mut Vec<u8> {
        self.scratch.clear();
        &mut self.scratch
    }

    /// Tira o buffer de serialização (vazio); devolva com `restore_scratch`
    pub fn take_scratch(&mut self) -> Vec<u8> {
        let mut buffer = std::mem::take(&mut self.scratch);
        buffer.clear();
        buffer
    }

    pub fn restore_scratch(&mut self, buffer: Vec<u8>) {
        self.scratch = buffer;
    }

    /// Entrega o registro serializado em `scratch`
    pub fn commit(&mut self, seq: usize) -> Result<(), WriteError> {
        let written = self.inner.write_all(&self.scratch);
        self.scratch.clear();
        written.map_err(|err| WriteError::new(seq, err.to_string()))?;

        if self.flush.record_write() {
            if let Err(err) = self.inner.flush() {
                warn!(record = seq, error = %err, "Falha no flush do destino");
                self.deferred_flush.get_or_insert(err.to_string());
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        if let Some(reason) = self.deferred_flush.take() {
            return Err(WriteError::flush(reason));
        }
        self.inner.flush().map_err(|err| WriteError::flush(err.to_string()))
    }

    pub fn finish(mut self) -> Result<W, WriteError> {
        self.flush()?;
        Ok(self.inner)
    }
}
