//! # Presets
//!
//! Atalhos para os fluxos mais comuns: CSV -> CSV e JSONL -> CSV.

use std::io::{Read, Write};
use std::path::Path;
use crate::error::Result;
use crate::extract::{CsvSource, JsonLinesSource};
use crate::load::CsvSink;
use crate::pipeline::{Pipeline, PipelineRun};
use crate::traits::RowTransform;
use crate::types::{Payload, PipelineResult, Row};

/// CSV -> CSV com `pool_size` workers. A ordem de saída não é garantida.
///
/// # Exemplos
///
/// ```rust
/// use rowpipe::prelude::*;
/// use std::io::Cursor;
///
/// # tokio_test::block_on(async {
/// let run = process_csv(
///     Cursor::new("a,b\n1,2\n"),
///     Vec::new(),
///     AppendSumTransform,
///     true,
///     2,
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(run.output, b"1,2,3\n");
/// assert_eq!(run.result.rows_written, 1);
/// # });
/// ```
pub async fn process_csv<R, W, T>(
    reader: R,
    writer: W,
    transform: T,
    skip_header: bool,
    pool_size: i64,
) -> Result<PipelineRun<W>>
where
    R: Read + Send,
    W: Write + Send + 'static,
    T: RowTransform<Row, Row>,
{
    Pipeline::builder()
        .source(CsvSource::new(reader))
        .transform(transform)
        .sink(CsvSink::new(writer))
        .pool_size(pool_size)
        .skip_header(skip_header)
        .build()?
        .run()
        .await
}

/// CSV -> CSV sem pool, preservando a ordem da entrada
pub async fn process_csv_sequential<R, W, T>(
    reader: R,
    writer: W,
    transform: T,
    skip_header: bool,
) -> Result<PipelineRun<W>>
where
    R: Read + Send,
    W: Write + Send + 'static,
    T: RowTransform<Row, Row>,
{
    Pipeline::builder()
        .source(CsvSource::new(reader))
        .transform(transform)
        .sink(CsvSink::new(writer))
        .skip_header(skip_header)
        .build()?
        .run_sequential()
        .await
}

/// Versão de `process_csv` sobre arquivos. O arquivo de saída é criado ou
/// truncado; falha ao abrir qualquer um dos dois aborta antes de ler.
pub async fn process_csv_file<P, Q, T>(
    input: P,
    output: Q,
    transform: T,
    skip_header: bool,
    pool_size: i64,
) -> Result<PipelineResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    T: RowTransform<Row, Row>,
{
    let source = CsvSource::from_path(input)?;
    let sink = CsvSink::create(output)?;

    let run = Pipeline::builder()
        .source(source)
        .transform(transform)
        .sink(sink)
        .pool_size(pool_size)
        .skip_header(skip_header)
        .build()?
        .run()
        .await?;
    Ok(run.result)
}

pub async fn process_csv_file_sequential<P, Q, T>(
    input: P,
    output: Q,
    transform: T,
    skip_header: bool,
) -> Result<PipelineResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    T: RowTransform<Row, Row>,
{
    let source = CsvSource::from_path(input)?;
    let sink = CsvSink::create(output)?;

    let run = Pipeline::builder()
        .source(source)
        .transform(transform)
        .sink(sink)
        .skip_header(skip_header)
        .build()?
        .run_sequential()
        .await?;
    Ok(run.result)
}

/// JSONL -> CSV: cada linha é entregue crua à transformação, que decide
/// quais campos viram colunas (ver `JsonFieldsTransform`).
pub async fn jsonl_to_csv<R, W, T>(
    reader: R,
    writer: W,
    transform: T,
    pool_size: i64,
) -> Result<PipelineRun<W>>
where
    R: Read + Send,
    W: Write + Send + 'static,
    T: RowTransform<Payload, Row>,
{
    Pipeline::builder()
        .source(JsonLinesSource::new(reader))
        .transform(transform)
        .sink(CsvSink::new(writer))
        .pool_size(pool_size)
        .build()?
        .run()
        .await
}
