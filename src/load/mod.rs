pub mod common;
pub mod csv;
pub mod jsonl;
pub mod memory;

pub use self::common::FlushPolicy;
pub use self::csv::CsvSink;
pub use self::jsonl::JsonLinesSink;
pub use self::memory::MemorySink;
