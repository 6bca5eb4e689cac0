//! # CSV Sink
//!
//! Destino que serializa `Row`s como CSV, na ordem em que chegam.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use crate::error::{Result, WriteError};
use crate::load::common::{FlushPolicy, RecordWriter};
use crate::traits::RecordSink;
use crate::types::Row;

/// Destino CSV
///
/// Aceita linhas com qualquer número de campos. Cada linha é codificada por
/// completo antes de chegar ao writer: uma falha ao escrever um registro é
/// devolvida para aquele registro, nada dele aparece na saída e o destino
/// continua utilizável.
///
/// # Exemplos
///
/// ```rust
/// use rowpipe::load::CsvSink;
/// use rowpipe::traits::RecordSink;
///
/// let mut sink = CsvSink::new(Vec::new());
/// sink.write_record(1, &vec!["a".to_string(), "b,c".to_string()]).unwrap();
/// let bytes = sink.finish().unwrap();
/// assert_eq!(bytes, b"a,\"b,c\"\n");
/// ```
pub struct CsvSink<W: Write> {
    encoder: csv::WriterBuilder,
    out: RecordWriter<W>,
}

impl<W: Write> CsvSink<W> {
    /// Cria um destino com vírgula e flush após cada registro
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, b',')
    }

    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        let mut encoder = csv::WriterBuilder::new();
        encoder.delimiter(delimiter).flexible(true).buffer_capacity(1024);
        Self {
            encoder,
            out: RecordWriter::new(writer),
        }
    }

    /// Flush a cada `every` registros; 0 = só no final
    pub fn with_flush_every(mut self, every: usize) -> Self {
        self.out.set_flush_policy(FlushPolicy::every(every));
        self
    }

    // codifica a linha no buffer de serialização do `RecordWriter`
    fn encode(&mut self, record: &Row) -> std::result::Result<(), csv::Error> {
        let mut line = self.encoder.from_writer(self.out.take_scratch());
        line.write_record(record)?;
        let buffer = line
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        self.out.restore_scratch(buffer);
        Ok(())
    }
}

impl CsvSink<File> {
    /// Cria (ou trunca) o arquivo de saída
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send + 'static> RecordSink for CsvSink<W> {
    type Record = Row;
    type Output = W;

    fn write_record(&mut self, seq: usize, record: &Row) -> std::result::Result<(), WriteError> {
        self.encode(record)
            .map_err(|err| WriteError::new(seq, err.to_string()))?;
        self.out.commit(seq)
    }

    fn flush(&mut self) -> std::result::Result<(), WriteError> {
        self.out.flush()
    }

    fn finish(self) -> std::result::Result<W, WriteError> {
        self.out.finish()
    }
}
