pub mod csv;
pub mod jsonl;

pub use self::csv::{CsvSource, CsvSourceBuilder};
pub use self::jsonl::JsonLinesSource;
