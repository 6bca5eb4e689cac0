//! # JSON Lines Sink
//!
//! Escreve cada payload seguido de `\n`.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use crate::error::{Result, WriteError};
use crate::load::common::{FlushPolicy, RecordWriter};
use crate::traits::RecordSink;
use crate::types::Payload;

/// Destino JSONL
///
/// Não valida o conteúdo; o payload é escrito como veio da transformação.
/// Payload e terminador seguem num único `write_all`, então um registro que
/// falha não deixa meia linha na saída.
pub struct JsonLinesSink<W: Write> {
    out: RecordWriter<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: RecordWriter::new(writer),
        }
    }

    /// Flush a cada `every` registros; 0 = só no final
    pub fn with_flush_every(mut self, every: usize) -> Self {
        self.out.set_flush_policy(FlushPolicy::every(every));
        self
    }
}

impl JsonLinesSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send + 'static> RecordSink for JsonLinesSink<W> {
    type Record = Payload;
    type Output = W;

    fn write_record(&mut self, seq: usize, record: &Payload) -> std::result::Result<(), WriteError> {
        let line = self.out.scratch();
        line.extend_from_slice(record);
        line.push(b'\n');
        self.out.commit(seq)
    }

    fn flush(&mut self) -> std::result::Result<(), WriteError> {
        self.out.flush()
    }

    fn finish(self) -> std::result::Result<W, WriteError> {
        self.out.finish()
    }
}
