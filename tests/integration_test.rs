use futures::stream::{self, BoxStream, StreamExt};
use futures::future::{self, BoxFuture, FutureExt};
use render_parity::error::{AppError, AppResult, ConversionError};
use render_parity::infrastructure::{CorpusSource, JsonCorpusStore, ResultSink, StatusRecord};
use render_parity::models::{CorpusEntry, ItemStatus, NormalizationOptions, RunOutcome, RunState};
use render_parity::services::{ArtifactStore, Canonicalizer, Comparator, DualRenderer};
use render_parity::{run_batch, BatchOptions, ItemFlow};
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ========== 测试替身 ==========

/// 旧格式渲染器：`text` 包进 `<p><b>`，`corrupt` 直接报错
fn legacy(document: &JsonValue) -> anyhow::Result<String> {
    match document["text"].as_str() {
        Some("corrupt") => anyhow::bail!("legacy renderer rejected document"),
        Some(text) => Ok(format!("<p class=\"legacy\"><b>{text}</b></p>")),
        None => Ok(String::new()),
    }
}

/// 转换器：`bad` 转换失败
fn convert(document: &JsonValue) -> Result<JsonValue, ConversionError> {
    match document["text"].as_str() {
        Some("bad") => Err(ConversionError::new("unsupported card: bad")),
        Some(text) => Ok(json!({ "root": { "children": [{ "text": text }] } })),
        None => Err(ConversionError::new("empty document")),
    }
}

/// 新格式渲染器：`drift` 输出不同内容
fn render_new(document: &JsonValue) -> anyhow::Result<String> {
    match document["root"]["children"][0]["text"].as_str() {
        Some("drift") => Ok("<p>\n  <strong>drifted</strong>\n</p>".to_string()),
        Some(text) => Ok(format!("<p>\n  <strong>{text}</strong>\n</p>")),
        None => Ok(String::new()),
    }
}

fn entry(id: &str, text: Option<&str>) -> CorpusEntry {
    CorpusEntry::new(id, text.map(|t| json!({ "text": t }).to_string()))
}

fn flow(results: &Path) -> ItemFlow {
    let options = NormalizationOptions {
        ignore_classes: true,
        ..Default::default()
    };
    ItemFlow::new(
        DualRenderer::new(legacy, convert, render_new),
        Comparator::new(Canonicalizer::new(options), ArtifactStore::new(results)),
    )
}

/// 读到第 `fail_at` 个条目时报存储不可达
struct FlakyCorpus {
    entries: Vec<CorpusEntry>,
    fail_at: usize,
}

impl CorpusSource for FlakyCorpus {
    fn fetch_all(&self) -> BoxStream<'_, AppResult<CorpusEntry>> {
        let fail_at = self.fail_at;
        stream::iter(self.entries.iter().cloned().enumerate())
            .map(move |(i, entry)| {
                if i + 1 == fail_at {
                    Err(AppError::store_unreachable(
                        "corpus",
                        std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
                    ))
                } else {
                    Ok(entry)
                }
            })
            .boxed()
    }

    fn fetch_random_order(&self) -> BoxStream<'_, AppResult<CorpusEntry>> {
        self.fetch_all()
    }
}

/// 记录回写内容；可选地在第 N 次回写后设置取消标志，或从第 N 次开始报错
#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(String, ItemStatus, bool)>>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
    unreachable_from: Option<usize>,
    flaky_from: Option<usize>,
}

impl RecordingSink {
    fn ids(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|(id, _, _)| id.clone()).collect()
    }

    fn record(&self, id: &str, record: StatusRecord<'_>) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        let count = records.len() + 1;

        if self.unreachable_from.is_some_and(|n| count >= n) {
            return Err(AppError::store_unreachable(
                "status store",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            ));
        }
        if self.flaky_from.is_some_and(|n| count >= n) {
            return Err(AppError::store_write_failed(
                "status store",
                std::io::Error::new(std::io::ErrorKind::Other, "timeout"),
            ));
        }

        records.push((id.to_string(), record.status, record.legacy_html.is_some()));
        if let Some((n, cancel)) = &self.cancel_after {
            if count == *n {
                cancel.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

impl ResultSink for RecordingSink {
    fn update_status<'a>(
        &'a self,
        id: &'a str,
        record: StatusRecord<'a>,
    ) -> BoxFuture<'a, AppResult<()>> {
        future::ready(self.record(id, record)).boxed()
    }
}

// ========== 测试 ==========

#[tokio::test]
async fn test_batch_isolation_when_third_conversion_fails() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("1", Some("one")),
        entry("2", Some("two")),
        entry("3", Some("bad")),
        entry("4", Some("four")),
        entry("5", Some("five")),
    ]);
    let sink = RecordingSink::default();
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.state, RunState::Complete);
    assert_eq!(outcome.summary.total, 5);
    assert_eq!(outcome.summary.conversion_errors, 1);
    assert_eq!(outcome.summary.matched, 4);
    assert_eq!(outcome.summary.success_rate(), Some(0.8));
    // 第 3 个失败后 4、5 仍被处理，且顺序与语料一致
    assert_eq!(sink.ids(), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(sink.records.lock().unwrap()[2].1, ItemStatus::ConversionError);
}

#[tokio::test]
async fn test_items_without_document_are_skipped() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("a", Some("x")),
        entry("b", None),
        CorpusEntry::new("c", Some("null".to_string())),
    ]);
    let sink = RecordingSink::default();
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.summary.skipped, 2);
    assert_eq!(outcome.summary.matched, 1);
    // 跳过的条目不参与成功率
    assert_eq!(outcome.summary.success_rate(), Some(1.0));

    let records = sink.records.lock().unwrap();
    assert_eq!(records[1].1, ItemStatus::Skipped);
    assert!(!records[1].2, "skipped items have no rendered html");
}

#[tokio::test]
async fn test_equivalent_render_leaves_no_artifacts() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![entry("same", Some("hello world"))]);
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: None,
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.summary.matched, 1);
    assert!(!results.path().join("same").exists());
}

#[tokio::test]
async fn test_mismatch_writes_exactly_four_artifacts() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![entry("drifting", Some("drift"))]);
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: None,
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.summary.mismatched, 1);
    assert_eq!(outcome.summary.success_rate(), Some(0.0));

    let dir = results.path().join("drifting");
    let mut files: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files, vec!["lexical.html", "lexical.json", "mobiledoc.html", "mobiledoc.json"]);

    // 产物是规范化后的 HTML
    let legacy_html = std::fs::read_to_string(dir.join("mobiledoc.html")).unwrap();
    assert_eq!(legacy_html, "<p><strong>drift</strong></p>");
    let converted: JsonValue =
        serde_json::from_str(&std::fs::read_to_string(dir.join("lexical.json")).unwrap()).unwrap();
    assert_eq!(converted["root"]["children"][0]["text"], "drift");
}

async fn run_without_sink(corpus: &JsonCorpusStore, results: &Path) -> RunOutcome {
    let cancel = AtomicBool::new(false);
    run_batch(
        corpus,
        &flow(results),
        BatchOptions {
            random_order: false,
            sink: None,
            cancel: &cancel,
        },
    )
    .await
}

#[tokio::test]
async fn test_rerun_removes_artifacts_of_items_no_longer_mismatched() {
    let results = tempfile::tempdir().unwrap();
    let dir = results.path().join("p1");
    let drifting = JsonCorpusStore::from_entries(vec![entry("p1", Some("drift"))]);

    for later in [entry("p1", Some("fixed")), entry("p1", Some("bad")), entry("p1", None)] {
        let outcome = run_without_sink(&drifting, results.path()).await;
        assert_eq!(outcome.summary.mismatched, 1);
        assert!(dir.is_dir());

        let outcome = run_without_sink(&JsonCorpusStore::from_entries(vec![later]), results.path()).await;
        assert_eq!(outcome.summary.mismatched, 0);
        assert!(!dir.exists());
    }
}

#[tokio::test]
async fn test_similar_ids_keep_separate_artifacts() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        CorpusEntry::new("a/b", Some(json!({ "text": "drift" }).to_string())),
        CorpusEntry::new("a?b", Some(json!({ "text": "drift" }).to_string())),
    ]);

    let outcome = run_without_sink(&corpus, results.path()).await;

    assert_eq!(outcome.summary.mismatched, 2);
    let store = ArtifactStore::new(results.path());
    let first = store.item_dir("a/b");
    let second = store.item_dir("a?b");
    assert_ne!(first, second);
    assert_eq!(std::fs::read_dir(&first).unwrap().count(), 4);
    assert_eq!(std::fs::read_dir(&second).unwrap().count(), 4);
    assert_eq!(std::fs::read_dir(results.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn test_artifact_write_failure_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    std::fs::write(&results, "a regular file").unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("1", Some("drift")),
        entry("2", Some("two")),
        entry("3", Some("drift")),
    ]);
    let sink = RecordingSink::default();
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(&results),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.state, RunState::Complete);
    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.summary.mismatched, 2);
    assert_eq!(outcome.summary.matched, 1);
    assert_eq!(sink.ids(), vec!["1", "2", "3"]);
    assert!(results.is_file());
}

#[tokio::test]
async fn test_legacy_render_failure_aborts_with_partial_summary() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("1", Some("one")),
        entry("2", Some("corrupt")),
        entry("3", Some("three")),
    ]);
    let sink = RecordingSink::default();
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert!(matches!(outcome.state, RunState::Aborted { .. }));
    assert_eq!(outcome.summary.total, 1);
    assert_eq!(outcome.summary.matched, 1);
    assert_eq!(sink.ids(), vec!["1"]);
}

#[tokio::test]
async fn test_corpus_failure_aborts() {
    let results = tempfile::tempdir().unwrap();
    let corpus = FlakyCorpus {
        entries: vec![entry("1", Some("one")), entry("2", Some("two")), entry("3", Some("three"))],
        fail_at: 2,
    };
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: None,
            cancel: &cancel,
        },
    )
    .await;

    match outcome.state {
        RunState::Aborted { reason } => assert!(reason.contains("connection reset")),
        state => panic!("unexpected state: {state:?}"),
    }
    assert_eq!(outcome.summary.total, 1);
}

#[tokio::test]
async fn test_cancellation_between_items() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(
        (1..=5).map(|i| entry(&i.to_string(), Some("same"))).collect(),
    );
    let cancel = Arc::new(AtomicBool::new(false));
    let sink = RecordingSink {
        cancel_after: Some((2, cancel.clone())),
        ..Default::default()
    };

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.state, RunState::Cancelled);
    assert_eq!(outcome.summary.total, 2);
    assert_eq!(outcome.summary.matched, 2);
    assert_eq!(sink.ids(), vec!["1", "2"]);
}

#[tokio::test]
async fn test_unreachable_sink_aborts() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("1", Some("one")),
        entry("2", Some("two")),
        entry("3", Some("three")),
    ]);
    let sink = RecordingSink {
        unreachable_from: Some(2),
        ..Default::default()
    };
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert!(matches!(outcome.state, RunState::Aborted { .. }));
    // 第 2 个条目已处理完，只是回写失败
    assert_eq!(outcome.summary.total, 2);
    assert_eq!(sink.ids(), vec!["1"]);
}

#[tokio::test]
async fn test_sink_write_failures_are_not_fatal() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(vec![
        entry("1", Some("one")),
        entry("2", Some("two")),
        entry("3", Some("three")),
    ]);
    let sink = RecordingSink {
        flaky_from: Some(2),
        ..Default::default()
    };
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: false,
            sink: Some(&sink),
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.state, RunState::Complete);
    assert_eq!(outcome.summary.total, 3);
}

#[test]
fn test_random_order_processes_every_item() {
    let results = tempfile::tempdir().unwrap();
    let corpus = JsonCorpusStore::from_entries(
        (1..=10).map(|i| entry(&i.to_string(), Some("same"))).collect(),
    );
    let sink = RecordingSink::default();
    let cancel = AtomicBool::new(false);

    let outcome = tokio_test::block_on(run_batch(
        &corpus,
        &flow(results.path()),
        BatchOptions {
            random_order: true,
            sink: Some(&sink),
            cancel: &cancel,
        },
    ));

    assert_eq!(outcome.summary.total, 10);
    let mut ids = sink.ids();
    ids.sort_by_key(|id| id.parse::<u32>().unwrap());
    assert_eq!(ids, (1..=10).map(|i| i.to_string()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_corpus_loaded_from_export_file() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export.json");
    std::fs::write(
        &export,
        json!({
            "db": [{
                "data": {
                    "posts": [
                        { "id": "1", "uuid": "u-1", "mobiledoc": json!({ "text": "one" }).to_string() },
                        { "id": "2", "uuid": "u-2", "mobiledoc": null },
                        { "id": "3", "uuid": "u-3", "mobiledoc": json!({ "text": "drift" }).to_string() }
                    ]
                }
            }]
        })
        .to_string(),
    )
    .unwrap();

    let corpus = JsonCorpusStore::open(&export).await.unwrap();
    let results = dir.path().join("results");
    let cancel = AtomicBool::new(false);

    let outcome = run_batch(
        &corpus,
        &flow(&results),
        BatchOptions {
            random_order: false,
            sink: None,
            cancel: &cancel,
        },
    )
    .await;

    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.summary.matched, 1);
    assert_eq!(outcome.summary.skipped, 1);
    assert_eq!(outcome.summary.mismatched, 1);
    assert!(results.join("u-3").is_dir());
}
