use rowpipe::prelude::*;
use rowpipe::types::TaskResult;
use std::collections::HashSet;
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;

fn output_lines(bytes: Vec<u8>) -> HashSet<String> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn set(lines: &[&str]) -> HashSet<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_append_sum_with_header_skip() {
    let input = "a,b,c\n100,32,-3\n10,3,4\n25,10,1\n";

    let run = process_csv(Cursor::new(input), Vec::new(), AppendSumTransform, true, 4)
        .await
        .unwrap();

    assert_eq!(
        output_lines(run.output),
        set(&["100,32,-3,129", "10,3,4,17", "25,10,1,36"])
    );
    assert_eq!(run.result.rows_read, 3);
    assert_eq!(run.result.rows_written, 3);
    assert!(!run.result.has_errors());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_jsonl_with_malformed_line_completes() {
    let input = concat!(
        "{\"title\":\"Akka in Action\",\"year\":2016}\n",
        "{\"title\":\"Rust in Action\",\n",
        "{\"title\":\"Zero To Production\",\"year\":2022}\n",
        "{\"title\":\"Programming Rust\",\"year\":2021}\n",
    );
    let emitter = InMemoryEventEmitter::new();

    let run = Pipeline::builder()
        .source(JsonLinesSource::new(Cursor::new(input)))
        .transform(JsonFieldsTransform::new(["title", "year"]))
        .sink(CsvSink::new(Vec::new()))
        .pool_size(3)
        .event_emitter(emitter.clone())
        .build()
        .unwrap();

    let run = tokio::time::timeout(Duration::from_secs(5), run.run())
        .await
        .expect("pipeline travou")
        .unwrap();

    assert_eq!(run.result.rows_written, 3);
    assert_eq!(
        output_lines(run.output),
        set(&[
            "Akka in Action,2016",
            "Zero To Production,2022",
            "Programming Rust,2021"
        ])
    );
    assert_eq!(emitter.skips(), vec![(SkipStage::Transform, 2)]);
}

#[tokio::test]
async fn test_jsonl_validation_reports_decode_skip() {
    let input = "{\"a\":1}\n{\"a\":\n{\"a\":3}\n{\"a\":4}\n";
    let emitter = InMemoryEventEmitter::new();

    let run = Pipeline::builder()
        .source(JsonLinesSource::new(Cursor::new(input)).with_validate_json(true))
        .transform(JsonFieldsTransform::new(["a"]))
        .sink(MemorySink::new())
        .pool_size(2)
        .event_emitter(emitter.clone())
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(run.output.len(), 3);
    assert_eq!(run.result.decode_failures, 1);
    assert_eq!(emitter.skips(), vec![(SkipStage::Decode, 2)]);
}

#[tokio::test]
async fn test_invalid_pool_size_is_config_error() {
    for pool_size in [0, -3] {
        let err = process_csv(Cursor::new("1,2\n"), Vec::new(), PassthroughTransform, false, pool_size)
            .await
            .unwrap_err();
        assert!(matches!(err, ETLError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    let err = WorkerPool::<Row, Row>::new(PassthroughTransform, 0).unwrap_err();
    assert!(matches!(err, ETLError::Config(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_record_produces_one_result() {
    let n = 1_000;
    let input: String = (0..n).map(|i| format!("{},{}\n", i, i + 1)).collect();

    let run = process_csv(Cursor::new(input), Vec::new(), AppendSumTransform, false, 8)
        .await
        .unwrap();

    let lines = output_lines(run.output);
    assert_eq!(lines.len(), n);
    assert!(lines.contains("999,1000,1999"));
    assert_eq!(run.result.rows_written, n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_undecodable_record_is_skipped() {
    let mut input: String = (0..50).map(|i| format!("{},{}\n", i, i)).collect();
    input.push_str("1,2,3\n");
    input.extend((50..100).map(|i| format!("{},{}\n", i, i)));
    let emitter = InMemoryEventEmitter::new();

    let run = Pipeline::builder()
        .source(CsvSource::new(Cursor::new(input)))
        .transform(PassthroughTransform)
        .sink(MemorySink::new())
        .pool_size(4)
        .event_emitter(emitter.clone())
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(run.output.len(), 100);
    assert_eq!(run.result.decode_failures, 1);
    assert_eq!(emitter.skips(), vec![(SkipStage::Decode, 51)]);
}

#[tokio::test]
async fn test_submit_after_close_fails_immediately() {
    let mut pool = WorkerPool::new(PassthroughTransform, 2).unwrap();
    let mut results = pool.results().unwrap();

    pool.submit(vec!["x".to_string()]).await.unwrap();
    let drain = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(result) = results.recv().await {
            seen.push(result);
        }
        seen
    });
    pool.close().await.unwrap();

    let attempt = tokio::time::timeout(Duration::from_secs(1), pool.submit(vec!["y".to_string()])).await;
    assert!(matches!(attempt, Ok(Err(ETLError::PoolClosed))));

    let seen: Vec<TaskResult<Row>> = drain.await.unwrap();
    assert_eq!(seen.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_size_does_not_change_output_set() {
    let input: String = (0..300).map(|i| format!("{},{},{}\n", i, -i, i * 3)).collect();

    let single = process_csv(Cursor::new(input.clone()), Vec::new(), AppendSumTransform, false, 1)
        .await
        .unwrap();
    let many = process_csv(Cursor::new(input.clone()), Vec::new(), AppendSumTransform, false, 7)
        .await
        .unwrap();
    let ordered = process_csv_sequential(Cursor::new(input), Vec::new(), AppendSumTransform, false)
        .await
        .unwrap();

    let single = output_lines(single.output);
    assert_eq!(single.len(), 300);
    assert_eq!(single, output_lines(many.output));
    assert_eq!(single, output_lines(ordered.output));
}

#[tokio::test]
async fn test_file_wrappers() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("numeros.csv");
    let output = dir.path().join("somas.csv");
    std::fs::write(&input, "a,b\n1,2\nx,1\n3,4\n").unwrap();

    let result = process_csv_file(&input, &output, AppendSumTransform, true, 2)
        .await
        .unwrap();

    assert_eq!(result.rows_read, 3);
    assert_eq!(result.rows_written, 2);
    assert_eq!(result.transform_failures, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        output_lines(std::fs::read(&output).unwrap()),
        set(&["1,2,3", "3,4,7"])
    );

    let result = process_csv_file_sequential(&input, &output, AppendSumTransform, true)
        .await
        .unwrap();
    assert_eq!(result.rows_written, 2);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "1,2,3\n3,4,7\n");
}
