//! # JSON Lines Source
//!
//! Fonte de registros delimitados por linha. Cada linha é entregue como um
//! payload opaco (`Vec<u8>`); a interpretação fica com a transformação.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use crate::error::{DecodeError, Result};
use crate::traits::RecordSource;
use crate::types::{Payload, Task};

/// Fonte JSONL em streaming
///
/// O número de sequência de cada registro é o número da linha no arquivo,
/// contando linhas em branco (que são ignoradas).
pub struct JsonLinesSource<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    line: usize,
    validate_json: bool,
    finished: bool,
}

impl<R: Read> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(4096),
            line: 0,
            validate_json: false,
            finished: false,
        }
    }

    /// Rejeita na leitura as linhas que não são JSON válido
    pub fn with_validate_json(mut self, validate: bool) -> Self {
        self.validate_json = validate;
        self
    }

    /// Lê a próxima linha não vazia para `self.buffer`.
    fn read_line(&mut self) -> Option<std::result::Result<(), DecodeError>> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
                        self.buffer.pop();
                    }
                    if self.buffer.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(Ok(()));
                }
                Err(err) => {
                    self.line += 1;
                    self.finished = true;
                    return Some(Err(DecodeError::new(self.line, err.to_string())));
                }
            }
        }
    }
}

impl JsonLinesSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Send> RecordSource for JsonLinesSource<R> {
    type Record = Payload;

    fn next_record(&mut self) -> Option<std::result::Result<Task<Payload>, DecodeError>> {
        if self.finished {
            return None;
        }

        if let Err(err) = self.read_line()? {
            return Some(Err(err));
        }

        if self.validate_json {
            if let Err(err) = serde_json::from_slice::<serde::de::IgnoredAny>(&self.buffer) {
                return Some(Err(DecodeError::new(self.line, err.to_string())));
            }
        }

        Some(Ok(Task::new(self.line, self.buffer.clone())))
    }

    fn discard_header(&mut self) -> std::result::Result<(), DecodeError> {
        if self.finished {
            return Ok(());
        }
        self.read_line().unwrap_or(Ok(()))
    }
}
