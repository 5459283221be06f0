//! Batch-level behaviour with deterministic renderer and gateway doubles.
//!
//! No pdfium library or network access is needed: every document path maps
//! to a scripted render result and model reply.

use async_trait::async_trait;
use edgequake_authors::{
    present_columns, to_csv_string, AuthorExtractor, BatchInput, BatchProgressCallback,
    BatchRunner, FileOutcome, GatewayError, ModelGateway, PageRenderer, RenderError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Renders every path to PNG bytes equal to the path itself, unless scripted to fail.
#[derive(Default)]
struct ScriptedRenderer {
    failures: HashMap<PathBuf, RenderError>,
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render_first_page(&self, path: &Path) -> Result<Vec<u8>, RenderError> {
        match self.failures.get(path) {
            Some(e) => Err(e.clone()),
            None => Ok(path.to_string_lossy().into_owned().into_bytes()),
        }
    }
}

/// Replies keyed by the "image" bytes, which the renderer set to the path.
#[derive(Default)]
struct ScriptedGateway {
    replies: HashMap<String, Result<String, GatewayError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn reply(mut self, path: &str, reply: Result<&str, GatewayError>) -> Self {
        self.replies
            .insert(path.to_string(), reply.map(str::to_string));
        self
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn infer(&self, image_png: &[u8], instructions: &str) -> Result<String, GatewayError> {
        assert!(instructions.contains("Co-First Author"), "prompt not sent");
        let key = String::from_utf8_lossy(image_png).into_owned();
        self.calls.lock().unwrap().push(key.clone());
        self.replies
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok("{\"authors\": []}".to_string()))
    }
}

fn runner(renderer: ScriptedRenderer, gateway: Arc<ScriptedGateway>) -> BatchRunner {
    BatchRunner::new(AuthorExtractor::new(Arc::new(renderer), gateway))
}

const TWO_AUTHORS: &str = r#"```json
{"authors": [
  {"name": "Ashish Vaswani", "role": "Co-First Author", "is_corresponding": false,
   "affiliation": "Google Brain", "email": "avaswani@google.com"},
  {"name": "Noam Shazeer", "role": "Co-First Author", "is_corresponding": true,
   "affiliation": "Google Brain"}
]}
```"#;

const ONE_AUTHOR: &str = r#"{"authors": [{"name": "Grace Hopper", "role": "First Author"}]}"#;

// ── Properties ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_middle_file_yields_one_error_row_in_place() {
    let gateway = Arc::new(
        ScriptedGateway::default()
            .reply("1.pdf", Ok(TWO_AUTHORS))
            .reply("2.pdf", Err(GatewayError::Timeout { secs: 60 }))
            .reply("3.pdf", Ok(ONE_AUTHOR)),
    );
    let batch = runner(ScriptedRenderer::default(), Arc::clone(&gateway))
        .run(["1.pdf", "2.pdf", "3.pdf"].map(BatchInput::from_path))
        .await;

    assert_eq!(batch.records.len(), 4);
    let files: Vec<_> = batch.records.iter().map(|r| r.source_file.as_str()).collect();
    assert_eq!(files, ["1.pdf", "1.pdf", "2.pdf", "3.pdf"]);

    let err = &batch.records[2];
    assert_eq!(err.name, "ERROR");
    assert!(err.role.contains("timed out"), "role: {}", err.role);
    assert_eq!(err.is_corresponding, None);
    assert_eq!(err.affiliation, None);
    assert_eq!(err.email, None);

    assert_eq!(batch.records[0].name, "Ashish Vaswani");
    assert_eq!(batch.records[1].is_corresponding, Some(true));
    assert_eq!(batch.records[3].name, "Grace Hopper");

    assert_eq!(batch.stats.total_files, 3);
    assert_eq!(batch.stats.processed_files, 3);
    assert_eq!(batch.stats.failed_files, 1);
    assert_eq!(batch.stats.total_records, 4);
    assert!(!batch.stats.cancelled);

    // Sequential, in input order.
    assert_eq!(*gateway.calls.lock().unwrap(), ["1.pdf", "2.pdf", "3.pdf"]);
}

#[tokio::test]
async fn zero_page_document_does_not_stop_the_batch() {
    let mut renderer = ScriptedRenderer::default();
    renderer.failures.insert(
        PathBuf::from("empty.pdf"),
        RenderError::NoPages {
            path: PathBuf::from("empty.pdf"),
        },
    );
    let gateway = Arc::new(ScriptedGateway::default().reply("ok.pdf", Ok(ONE_AUTHOR)));

    let batch = runner(renderer, Arc::clone(&gateway))
        .run(["empty.pdf", "ok.pdf"].map(BatchInput::from_path))
        .await;

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[0].name, "ERROR");
    assert!(batch.records[0].role.contains("no pages"));
    assert_eq!(batch.records[1].name, "Grace Hopper");
    // The renderer failure short-circuits before the model is called.
    assert_eq!(*gateway.calls.lock().unwrap(), ["ok.pdf"]);
}

#[tokio::test]
async fn malformed_reply_is_an_error_row_and_missing_key_is_zero_authors() {
    let gateway = Arc::new(
        ScriptedGateway::default()
            .reply("prose.pdf", Ok("The authors are listed at the top of the page."))
            .reply("nokey.pdf", Ok("```json\n{\"title\": \"Untitled\"}\n```"))
            .reply("null.pdf", Ok(r#"{"authors": null}"#))
            .reply("empty.pdf", Ok("")),
    );
    let batch = runner(ScriptedRenderer::default(), gateway)
        .run(["prose.pdf", "nokey.pdf", "null.pdf", "empty.pdf"].map(BatchInput::from_path))
        .await;

    // prose → 1 error row, nokey → 0 rows, null authors → 1 error row,
    // empty content → 1 error row
    assert_eq!(batch.records.len(), 3);
    assert_eq!(batch.records[0].source_file, "prose.pdf");
    assert!(batch.records[0].role.contains("not valid JSON"));
    assert_eq!(batch.records[1].source_file, "null.pdf");
    assert_eq!(batch.records[1].name, "ERROR");
    assert!(batch.records[1].role.contains("got null"), "role: {}", batch.records[1].role);
    assert_eq!(batch.records[2].source_file, "empty.pdf");
    assert_eq!(batch.stats.failed_files, 3);
}

#[tokio::test]
async fn failure_count_comes_from_outcomes_not_row_contents() {
    let gateway = Arc::new(ScriptedGateway::default().reply(
        "odd.pdf",
        Ok(r#"{"authors": [{"name": "ERROR", "role": "Co-Author"}]}"#),
    ));
    let batch = runner(ScriptedRenderer::default(), gateway)
        .run([BatchInput::from_path("odd.pdf")])
        .await;

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].role, "Co-Author");
    assert_eq!(batch.stats.failed_files, 0);
    // The row-level check cannot tell this author from an error row.
    assert!(batch.records[0].is_error());
}

#[tokio::test]
async fn outcome_keeps_typed_error() {
    let gateway = Arc::new(ScriptedGateway::default().reply(
        "a.pdf",
        Err(GatewayError::Auth {
            status: 401,
            detail: "bad key".into(),
        }),
    ));
    let extractor = AuthorExtractor::new(Arc::new(ScriptedRenderer::default()), gateway);
    let outcome = extractor.extract_outcome(Path::new("a.pdf"), "a.pdf").await;

    match outcome {
        FileOutcome::Failed { error, .. } => {
            assert!(matches!(
                error,
                edgequake_authors::FileError::Gateway(GatewayError::Auth { status: 401, .. })
            ));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn export_drops_affiliation_when_never_present() {
    let gateway = Arc::new(ScriptedGateway::default().reply(
        "a.pdf",
        Ok(r#"{"authors": [
            {"name": "A", "role": "First Author", "is_corresponding": true, "email": "a@x.org"},
            {"name": "B", "role": "Co-Author", "is_corresponding": false}
        ]}"#),
    ));
    let batch = runner(ScriptedRenderer::default(), gateway)
        .run([BatchInput::from_path("a.pdf")])
        .await;

    assert_eq!(
        present_columns(&batch.records),
        ["source_file", "name", "role", "is_corresponding", "email"]
    );
    let csv = to_csv_string(&batch.records).unwrap();
    assert_eq!(
        csv,
        "source_file,name,role,is_corresponding,email\n\
         a.pdf,A,First Author,true,a@x.org\n\
         a.pdf,B,Co-Author,false,\n"
    );
}

#[tokio::test]
async fn progress_reports_fraction_after_each_file() {
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl BatchProgressCallback for Recorder {
        fn on_batch_start(&self, total_files: usize) {
            self.events.lock().unwrap().push(format!("start {total_files}"));
        }
        fn on_file_complete(&self, index: usize, _total: usize, record_count: usize) {
            self.events.lock().unwrap().push(format!("ok {index} {record_count}"));
        }
        fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
            self.events.lock().unwrap().push(format!("err {index}"));
        }
        fn on_progress(&self, fraction: f64) {
            self.events.lock().unwrap().push(format!("{fraction:.2}"));
        }
        fn on_batch_complete(&self, processed: usize, failed: usize) {
            self.events.lock().unwrap().push(format!("done {processed} {failed}"));
        }
    }

    let gateway = Arc::new(
        ScriptedGateway::default()
            .reply("a.pdf", Ok(TWO_AUTHORS))
            .reply("b.pdf", Err(GatewayError::Http("connection reset".into()))),
    );
    let recorder = Arc::new(Recorder::default());
    let batch = runner(ScriptedRenderer::default(), gateway)
        .with_progress(recorder.clone())
        .run(["a.pdf", "b.pdf"].map(BatchInput::from_path))
        .await;

    assert_eq!(batch.records.len(), 3);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        ["start 2", "ok 1 2", "0.50", "err 2", "1.00", "done 2 1"]
    );
}

#[tokio::test]
async fn cancel_flag_is_checked_between_files() {
    struct CancelAfterFirst(Arc<AtomicBool>);

    impl BatchProgressCallback for CancelAfterFirst {
        fn on_file_complete(&self, _index: usize, _total: usize, _n: usize) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let flag = Arc::new(AtomicBool::new(false));
    let gateway = Arc::new(ScriptedGateway::default().reply("a.pdf", Ok(ONE_AUTHOR)));
    let batch = runner(ScriptedRenderer::default(), Arc::clone(&gateway))
        .with_progress(Arc::new(CancelAfterFirst(Arc::clone(&flag))))
        .with_cancel_flag(flag)
        .run(["a.pdf", "b.pdf", "c.pdf"].map(BatchInput::from_path))
        .await;

    assert!(batch.stats.cancelled);
    assert_eq!(batch.stats.processed_files, 1);
    assert_eq!(batch.records.len(), 1);
    assert_eq!(*gateway.calls.lock().unwrap(), ["a.pdf"]);
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let batch = runner(ScriptedRenderer::default(), Arc::new(ScriptedGateway::default()))
        .run(Vec::<BatchInput>::new())
        .await;
    assert!(batch.is_empty());
    assert_eq!(batch.stats.total_files, 0);
    assert_eq!(to_csv_string(&batch.records).unwrap(), "source_file,name,role\n");
}
