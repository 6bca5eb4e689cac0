//! rowpipe CLI
//!
//! `rowpipe csv` aplica uma operação por linha a um CSV; `rowpipe jsonl2csv`
//! extrai campos de um arquivo JSON Lines para CSV.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rowpipe::prelude::*;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    let input = Arg::new("input")
        .long("input")
        .short('i')
        .required(true)
        .value_parser(value_parser!(PathBuf));
    let output = Arg::new("output")
        .long("output")
        .short('o')
        .required(true)
        .value_parser(value_parser!(PathBuf));
    let workers = Arg::new("workers")
        .long("workers")
        .short('w')
        .help("Número de workers (padrão: número de CPUs)")
        .allow_negative_numbers(true)
        .value_parser(value_parser!(i64));

    Command::new("rowpipe")
        .version(rowpipe::version())
        .about("Transformação concorrente de linhas CSV e JSON Lines")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Arquivo de configuração (TOML, YAML ou JSON)")
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("csv")
                .about("CSV -> CSV aplicando uma operação por linha")
                .arg(input.clone())
                .arg(output.clone())
                .arg(workers.clone())
                .arg(Arg::new("skip-header").long("skip-header").action(ArgAction::SetTrue))
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .help("Processa sem pool, preservando a ordem da entrada")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("op")
                        .long("op")
                        .value_parser(["passthrough", "sum"])
                        .default_value("passthrough"),
                ),
        )
        .subcommand(
            Command::new("jsonl2csv")
                .about("JSON Lines -> CSV com os campos escolhidos")
                .arg(input)
                .arg(output)
                .arg(workers)
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .required(true)
                        .value_delimiter(',')
                        .action(ArgAction::Append),
                ),
        )
}

/// Arquivo de `--config` ou variáveis `ROWPIPE_*`, sobrescritos pelos flags
fn load_config(matches: &ArgMatches, command: &ArgMatches) -> Result<ETLConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ETLConfig::from_file(path)?,
        None => ETLConfig::from_env()?,
    };

    if let Some(workers) = command.get_one::<i64>("workers") {
        config.pipeline.pool_size = *workers;
    }
    if command.try_get_one::<bool>("skip-header").ok().flatten() == Some(&true) {
        config.pipeline.skip_header = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run_csv<T>(config: &PipelineConfig, command: &ArgMatches, transform: T) -> Result<PipelineResult>
where
    T: RowTransform<Row, Row>,
{
    let delimiter = config.delimiter_byte()?;
    let source = CsvSource::builder()
        .with_delimiter(delimiter)
        .with_flexible(config.flexible)
        .from_path(required_path(command, "input")?)?;
    let sink = CsvSink::with_delimiter(File::create(required_path(command, "output")?)?, delimiter)
        .with_flush_every(config.flush_every);

    let pipeline = Pipeline::with_config(config.clone())
        .source(source)
        .transform(transform)
        .sink(sink)
        .build()?;

    let run = if command.get_flag("sequential") {
        pipeline.run_sequential().await?
    } else {
        pipeline.run().await?
    };
    Ok(run.result)
}

/// JSON Lines não tem cabeçalho: `skip_header` vindo de arquivo ou ambiente
/// não pode descartar o primeiro registro
fn jsonl_pipeline_config(config: &PipelineConfig) -> PipelineConfig {
    PipelineConfig {
        skip_header: false,
        ..config.clone()
    }
}

async fn run_jsonl2csv(config: &PipelineConfig, command: &ArgMatches) -> Result<PipelineResult> {
    let fields: Vec<String> = command
        .get_many::<String>("fields")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let source = JsonLinesSource::from_path(required_path(command, "input")?)?;
    let sink = CsvSink::with_delimiter(File::create(required_path(command, "output")?)?, config.delimiter_byte()?)
        .with_flush_every(config.flush_every);

    let run = Pipeline::with_config(jsonl_pipeline_config(config))
        .source(source)
        .transform(JsonFieldsTransform::new(fields))
        .sink(sink)
        .build()?
        .run()
        .await?;
    Ok(run.result)
}

fn required_path<'a>(command: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    command
        .get_one::<PathBuf>(name)
        .ok_or_else(|| ETLError::Config(rowpipe::error::ConfigError::MissingValue(name.to_string())))
}

async fn execute(matches: &ArgMatches) -> Result<PipelineResult> {
    let (name, command) = matches
        .subcommand()
        .ok_or_else(|| ETLError::Pipeline("nenhum subcomando informado".to_string()))?;

    let config = load_config(matches, command)?;
    init_tracing(&config.observability)?;

    match name {
        "csv" => match command.get_one::<String>("op").map(String::as_str) {
            Some("sum") => run_csv(&config.pipeline, command, AppendSumTransform).await,
            _ => run_csv(&config.pipeline, command, PassthroughTransform).await,
        },
        "jsonl2csv" => run_jsonl2csv(&config.pipeline, command).await,
        other => Err(ETLError::Pipeline(format!("subcomando desconhecido: {}", other))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();

    match execute(&matches).await {
        Ok(result) => {
            eprintln!(
                "rowpipe: {} lidas, {} escritas, {} descartadas, {} com erro em {}ms",
                result.rows_read,
                result.rows_written,
                result.rows_dropped,
                result.rows_failed(),
                result.execution_time_ms
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("rowpipe: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
