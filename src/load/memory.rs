//! # Memory Sink
//!
//! Destino que acumula registros em memória.
//! Especialmente útil para testes e para inspecionar a saída após a execução.

use std::sync::{Arc, Mutex, MutexGuard};
use crate::error::WriteError;
use crate::traits::RecordSink;

/// Destino que acumula registros em memória
///
/// Os registros ficam num `Arc<Mutex<Vec<T>>>`; clones do destino
/// compartilham o mesmo armazenamento, então um clone guardado antes de
/// entregar o destino ao pipeline continua enxergando o que foi escrito.
///
/// # Exemplos
///
/// ```rust
/// use rowpipe::load::MemorySink;
/// use rowpipe::traits::RecordSink;
///
/// let sink = MemorySink::<String>::new();
/// let handle = sink.clone();
///
/// let mut sink = sink;
/// sink.write_record(1, &"a".to_string()).unwrap();
/// let collected = sink.finish().unwrap();
///
/// assert_eq!(collected, vec!["a".to_string()]);
/// assert_eq!(handle.len(), 1);
/// ```
#[derive(Debug)]
pub struct MemorySink<T> {
    data: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for MemorySink<T> {
    fn clone(&self) -> Self {
        Self { data: Arc::clone(&self.data) }
    }
}

impl<T> MemorySink<T> {
    pub fn new() -> Self {
        Self { data: Arc::new(Mutex::new(Vec::new())) }
    }

    // um writer que entrou em pânico não invalida o que já foi coletado
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Número de registros armazenados
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Limpa todos os registros armazenados
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Acesso aos dados sem clonagem
    ///
    /// # Atenção
    ///
    /// A closure roda com o lock adquirido; deve ser rápida.
    pub fn with_data<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[T]) -> R,
    {
        let data = self.lock();
        f(&data)
    }
}

impl<T: Clone> MemorySink<T> {
    /// Cópia dos registros armazenados, na ordem de escrita
    pub fn get_data(&self) -> Vec<T> {
        self.lock().clone()
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> RecordSink for MemorySink<T> {
    type Record = T;
    type Output = Vec<T>;

    fn write_record(&mut self, _seq: usize, record: &T) -> Result<(), WriteError> {
        self.lock().push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    fn finish(self) -> Result<Vec<T>, WriteError> {
        Ok(self.get_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_basic() {
        let mut sink = MemorySink::new();
        sink.write_record(1, &vec!["a".to_string()]).unwrap();
        sink.write_record(2, &vec!["b".to_string()]).unwrap();

        assert_eq!(sink.len(), 2);
        assert!(!sink.is_empty());
        assert_eq!(sink.finish().unwrap(), vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn test_clones_share_storage() {
        let sink = MemorySink::new();
        let handle = sink.clone();

        let mut sink = sink;
        sink.write_record(1, &42i64).unwrap();

        assert_eq!(handle.get_data(), vec![42]);
        handle.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_with_data() {
        let mut sink = MemorySink::new();
        for i in 1..=4i64 {
            sink.write_record(i as usize, &i).unwrap();
        }
        let sum: i64 = sink.with_data(|data| data.iter().sum());
        assert_eq!(sum, 10);
    }
}
