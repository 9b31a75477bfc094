//! End-to-end tests for TaskExecutor against a scripted tool capability.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docmcp_tasks::{
    TaskConfig, TaskExecutor, TaskRecord, TaskStatus, TaskStore, ToolCapability, ToolFault,
    MSG_ACCESS_DENIED, MSG_CANCELLED, MSG_COMPLETED, MSG_FAILED, MSG_FILE_NOT_FOUND,
    MSG_INVALID_ARGUMENT, MSG_NOT_SUPPORTED, MSG_PROCESSING,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// How the scripted tool behaves, picked from the `behavior` argument.
#[derive(Default)]
struct ScriptedTools {
    calls: Mutex<Vec<(String, Option<String>)>>,
    started: Notify,
}

#[async_trait]
impl ToolCapability for ScriptedTools {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: Value,
        output_path: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFault> {
        self.calls
            .lock()
            .push((tool_name.to_string(), output_path.clone()));
        self.started.notify_one();

        let path = arguments["path"].as_str().unwrap_or("input.docx").to_string();
        match arguments["behavior"].as_str().unwrap_or("ok") {
            "ok" => Ok(json!({
                "output": output_path.unwrap_or_else(|| path.replace(".docx", ".pdf")),
            })),
            "not_found" => Err(ToolFault::NotFound(path)),
            "denied" => Err(ToolFault::AccessDenied(path)),
            "invalid" => Err(ToolFault::InvalidArgument("pages".to_string())),
            "unsupported" => Err(ToolFault::NotSupported("encrypted input".to_string())),
            "other" => Err(ToolFault::Other("renderer crashed".to_string())),
            "panic" => panic!("renderer blew up"),
            "cooperative" => {
                cancel.cancelled().await;
                Err(ToolFault::Cancelled)
            }
            // Ignores its token; only the executor can stop it.
            "stuck" => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!("too late"))
            }
            other => Err(ToolFault::Other(format!("unknown behavior {other}"))),
        }
    }
}

struct Harness {
    store: Arc<TaskStore>,
    tools: Arc<ScriptedTools>,
    executor: Arc<TaskExecutor>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(TaskStore::new(TaskConfig::default()));
        let tools = Arc::new(ScriptedTools::default());
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&store),
            Arc::clone(&tools) as Arc<dyn ToolCapability>,
        ));
        Self {
            store,
            tools,
            executor,
        }
    }

    fn submit(&self, tool_name: &str, arguments: Value) -> TaskRecord {
        self.store
            .create_task(tool_name, &arguments, None, Some("client-1"))
            .unwrap()
    }

    async fn run(&self, tool_name: &str, arguments: Value) -> TaskRecord {
        let record = self.submit(tool_name, arguments);
        self.executor.execute(&record.task_id).await;
        self.store.get_task(&record.task_id, None).unwrap()
    }
}

#[tokio::test]
async fn convert_to_pdf_completes_with_result() {
    let harness = Harness::new();
    let done = harness
        .run("convert_to_pdf", json!({"path": "report.docx"}))
        .await;

    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.status_message.as_deref(), Some(MSG_COMPLETED));
    assert_eq!(done.result, Some(json!({"output": "report.pdf"})));
    assert_eq!(done.error_message, None);
    assert!(done.last_updated_at >= done.created_at);
}

#[tokio::test]
async fn output_path_override_reaches_the_tool() {
    let harness = Harness::new();
    let done = harness
        .run(
            "convert_document",
            json!({"path": "a.docx", "outputPath": "/tmp/out.odt"}),
        )
        .await;

    assert_eq!(done.result, Some(json!({"output": "/tmp/out.odt"})));
    assert_eq!(
        harness.tools.calls.lock().clone(),
        vec![(
            "convert_document".to_string(),
            Some("/tmp/out.odt".to_string())
        )]
    );
}

#[tokio::test]
async fn tool_outside_allow_list_fails_as_not_supported() {
    let harness = Harness::new();
    assert!(!TaskExecutor::supports_async("add_watermark"));

    let failed = harness.run("add_watermark", json!({})).await;
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.status_message.as_deref(), Some(MSG_NOT_SUPPORTED));
    assert!(failed.error_message.is_some());
    assert_eq!(failed.result, None);
    assert!(harness.tools.calls.lock().is_empty());
}

#[rstest::rstest]
#[case("not_found", MSG_FILE_NOT_FOUND)]
#[case("denied", MSG_ACCESS_DENIED)]
#[case("invalid", MSG_INVALID_ARGUMENT)]
#[case("unsupported", MSG_NOT_SUPPORTED)]
#[case("other", MSG_FAILED)]
#[case("panic", MSG_FAILED)]
#[tokio::test]
async fn tool_faults_map_to_failed(#[case] behavior: &str, #[case] message: &str) {
    let harness = Harness::new();
    let failed = harness
        .run("convert_to_pdf", json!({"path": "x.docx", "behavior": behavior}))
        .await;

    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.status_message.as_deref(), Some(message));
    assert!(failed.error_message.is_some());
    assert_eq!(failed.result, None);
}

#[tokio::test]
async fn fault_detail_is_kept_as_error_message() {
    let harness = Harness::new();
    let failed = harness
        .run(
            "convert_to_pdf",
            json!({"path": "missing.docx", "behavior": "not_found"}),
        )
        .await;
    assert_eq!(
        failed.error_message.as_deref(),
        Some("file not found: missing.docx")
    );
}

#[tokio::test]
async fn cancel_before_start_never_calls_the_tool() {
    let harness = Harness::new();
    let record = harness.submit("convert_to_pdf", json!({"path": "a.docx"}));
    assert!(harness.store.cancel_task(&record.task_id, Some("client-1")));

    harness.executor.execute(&record.task_id).await;

    let cancelled = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.status_message.as_deref(), Some(MSG_CANCELLED));
    assert_eq!(cancelled.result, None);
    assert_eq!(cancelled.error_message, None);
    assert!(harness.tools.calls.lock().is_empty());
}

#[tokio::test]
async fn cooperative_tool_stops_on_cancel() {
    let harness = Harness::new();
    let record = harness.submit(
        "convert_to_pdf",
        json!({"path": "a.docx", "behavior": "cooperative"}),
    );
    let handle = harness.executor.spawn(record.task_id.clone());

    harness.tools.started.notified().await;
    let running = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(running.status, TaskStatus::Working);
    assert_eq!(running.status_message.as_deref(), Some(MSG_PROCESSING));

    assert!(harness.store.cancel_task(&record.task_id, None));
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let cancelled = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.result, None);
    assert_eq!(cancelled.error_message, None);
}

#[tokio::test]
async fn stuck_tool_is_abandoned_on_cancel() {
    let harness = Harness::new();
    let record = harness.submit(
        "convert_document",
        json!({"path": "a.docx", "behavior": "stuck"}),
    );
    let handle = harness.executor.spawn(record.task_id.clone());

    harness.tools.started.notified().await;
    harness.store.cancel_task(&record.task_id, None);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("executor should not wait for a tool that ignores cancellation")
        .unwrap();

    let cancelled = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.result, None);
}

#[tokio::test]
async fn unknown_task_id_is_a_no_op() {
    let harness = Harness::new();
    harness.executor.execute("no-such-task").await;
    assert!(harness.store.is_empty());
    assert!(harness.tools.calls.lock().is_empty());
}

#[tokio::test]
async fn finished_task_is_not_rerun() {
    let harness = Harness::new();
    let done = harness
        .run("convert_to_pdf", json!({"path": "a.docx"}))
        .await;
    harness.executor.execute(&done.task_id).await;

    assert_eq!(harness.tools.calls.lock().len(), 1);
    let again = harness.store.get_task(&done.task_id, None).unwrap();
    assert_eq!(again.status, TaskStatus::Completed);
    assert_eq!(again.result, done.result);
}

#[tokio::test]
async fn concurrent_runs_call_the_tool_once() {
    let harness = Harness::new();
    let record = harness.submit("convert_to_pdf", json!({"path": "a.docx"}));

    tokio::join!(
        harness.executor.execute(&record.task_id),
        harness.executor.execute(&record.task_id),
    );

    assert_eq!(harness.tools.calls.lock().len(), 1);
    let done = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
}

#[tokio::test]
async fn task_claimed_elsewhere_never_reaches_the_tool() {
    let harness = Harness::new();
    let record = harness.submit("convert_to_pdf", json!({"path": "a.docx"}));
    assert!(harness.store.start_task(&record.task_id).is_some());

    harness.executor.execute(&record.task_id).await;

    assert!(harness.tools.calls.lock().is_empty());
    let claimed = harness.store.get_task(&record.task_id, None).unwrap();
    assert_eq!(claimed.status, TaskStatus::Working);
    assert_eq!(claimed.status_message.as_deref(), Some(MSG_PROCESSING));
}

#[tokio::test]
async fn finished_task_frees_its_concurrency_slot() {
    let store = Arc::new(TaskStore::new(TaskConfig {
        max_concurrent_tasks: 1,
        ..TaskConfig::default()
    }));
    let executor = Arc::new(TaskExecutor::new(
        Arc::clone(&store),
        Arc::new(ScriptedTools::default()),
    ));

    let first = store
        .create_task("convert_to_pdf", &json!({}), None, Some("a"))
        .unwrap();
    assert!(store
        .create_task("convert_to_pdf", &json!({}), None, Some("a"))
        .is_err());

    executor.spawn(first.task_id).await.unwrap();
    assert!(store
        .create_task("convert_to_pdf", &json!({}), None, Some("a"))
        .is_ok());
}
