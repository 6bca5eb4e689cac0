use std::fs::File;
use std::io::Read;
use std::path::Path;
use csv::StringRecord;
use crate::error::{DecodeError, Result};
use crate::traits::RecordSource;
use crate::types::{Row, Task};

/// Fonte de linhas CSV em streaming
///
/// Lê com um único `StringRecord` reutilizado e copia os campos para uma
/// `Row` própria antes de entregar, já que o buffer é sobrescrito a cada
/// leitura. Linhas em branco são ignoradas.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
    buffer: StringRecord,
    position: usize,
    finished: bool,
}

/// Builder para `CsvSource`
#[derive(Debug, Clone)]
pub struct CsvSourceBuilder {
    delimiter: u8,
    quote_char: Option<u8>,
    flexible: bool,
    trim: bool,
}

impl Default for CsvSourceBuilder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_char: Some(b'"'),
            flexible: false,
            trim: false,
        }
    }
}

impl CsvSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define o delimitador
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Define o caractere de aspas
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = Some(quote_char);
        self
    }

    /// Remove aspas
    pub fn without_quotes(mut self) -> Self {
        self.quote_char = None;
        self
    }

    /// Aceita linhas com número de campos diferente da primeira
    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    /// Remove espaços ao redor dos campos
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn from_reader<R: Read>(self, reader: R) -> CsvSource<R> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .quoting(self.quote_char.is_some())
            .quote(self.quote_char.unwrap_or(b'"'))
            .flexible(self.flexible)
            .trim(if self.trim { csv::Trim::All } else { csv::Trim::None })
            .from_reader(reader);

        CsvSource {
            reader,
            buffer: StringRecord::new(),
            position: 0,
            finished: false,
        }
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvSource<File>> {
        let file = File::open(path.as_ref())?;
        Ok(self.from_reader(file))
    }
}

impl<R: Read> CsvSource<R> {
    /// Cria uma fonte com as opções padrão (vírgula, aspas duplas, estrita)
    pub fn new(reader: R) -> Self {
        CsvSourceBuilder::default().from_reader(reader)
    }

    /// Número de registros lidos até agora, incluindo os inválidos
    pub fn position(&self) -> usize {
        self.position
    }
}

impl CsvSource<()> {
    /// Cria um builder; o tipo do leitor é fixado em `from_reader`/`from_path`
    pub fn builder() -> CsvSourceBuilder {
        CsvSourceBuilder::new()
    }
}

impl CsvSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        CsvSourceBuilder::default().from_path(path)
    }
}

impl<R: Read + Send> RecordSource for CsvSource<R> {
    type Record = Row;

    fn next_record(&mut self) -> Option<std::result::Result<Task<Row>, DecodeError>> {
        if self.finished {
            return None;
        }

        match self.reader.read_record(&mut self.buffer) {
            Ok(false) => {
                self.finished = true;
                None
            }
            Ok(true) => {
                self.position += 1;
                let row: Row = self.buffer.iter().map(str::to_string).collect();
                Some(Ok(Task::new(self.position, row)))
            }
            Err(err) => {
                self.position += 1;
                // erro de I/O não deixa o leitor num ponto confiável
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    self.finished = true;
                }
                Some(Err(DecodeError::new(self.position, err.to_string())))
            }
        }
    }

    fn discard_header(&mut self) -> std::result::Result<(), DecodeError> {
        match self.reader.read_record(&mut self.buffer) {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.finished = true;
                Ok(())
            }
            Err(err) => {
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    self.finished = true;
                }
                Err(DecodeError::new(0, format!("cabeçalho: {}", err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn collect<R: Read + Send>(mut source: CsvSource<R>) -> Vec<std::result::Result<Task<Row>, DecodeError>> {
        std::iter::from_fn(|| source.next_record()).collect()
    }

    #[test]
    fn test_reads_rows_and_skips_blank_lines() {
        let input = "\na,b,c\n100,32,-3\n\n10,3,4\n";
        let items = collect(CsvSource::new(Cursor::new(input)));

        assert_eq!(items.len(), 3);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.record, vec!["a", "b", "c"]);
        assert_eq!(items[2].as_ref().unwrap().record, vec!["10", "3", "4"]);
    }

    #[test]
    fn test_discard_header_is_not_counted() {
        let mut source = CsvSource::new(Cursor::new("a,b\n1,2\n"));
        source.discard_header().unwrap();
        let task = source.next_record().unwrap().unwrap();
        assert_eq!(task.seq, 1);
        assert_eq!(task.record, vec!["1", "2"]);
        assert!(source.next_record().is_none());
    }

    #[test]
    fn test_uneven_row_is_reported_and_reading_continues() {
        let input = "1,2,3\n4,5\n6,7,8\n";
        let items = collect(CsvSource::new(Cursor::new(input)));

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().record, 2);
        assert_eq!(items[2].as_ref().unwrap().record, vec!["6", "7", "8"]);
    }

    #[test]
    fn test_flexible_accepts_uneven_rows() {
        let source = CsvSource::builder()
            .with_flexible(true)
            .from_reader(Cursor::new("1,2,3\n4,5\n"));
        assert!(collect(source).iter().all(|item| item.is_ok()));
    }

    #[test]
    fn test_quoted_fields_and_custom_delimiter() {
        let source = CsvSource::builder()
            .with_delimiter(b';')
            .from_reader(Cursor::new("\"Raymond R.; Rob B.\";2016\n"));
        let items = collect(source);
        assert_eq!(items[0].as_ref().unwrap().record, vec!["Raymond R.; Rob B.", "2016"]);
    }

    #[test]
    fn test_builder_without_reader_type() {
        let builder = CsvSource::builder().with_trim(true);
        let items = collect(builder.from_reader(Cursor::new(" a , b \n")));
        assert_eq!(items[0].as_ref().unwrap().record, vec!["a", "b"]);

        let items = collect(CsvSourceBuilder::new().without_quotes().from_reader(Cursor::new("\"x\",y\n")));
        assert_eq!(items[0].as_ref().unwrap().record, vec!["\"x\"", "y"]);
    }

    #[test]
    fn test_from_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "name,age").unwrap();
        writeln!(temp_file, "Alice,30").unwrap();

        let items = collect(CsvSource::from_path(temp_file.path()).unwrap());
        assert_eq!(items.len(), 2);
        assert!(CsvSource::from_path("/nao/existe.csv").is_err());
    }
}
