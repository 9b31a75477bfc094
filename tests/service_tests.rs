//! End-to-end tests for TaskService.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docmcp::tasks::{TaskConfig, TaskError, TaskStatus, ToolCapability, ToolFault};
use docmcp::{Error, TaskService};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Converts instantly unless asked to wait for cancellation.
struct FakeConverter;

#[async_trait]
impl ToolCapability for FakeConverter {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: Value,
        output_path: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFault> {
        if arguments["wait"].as_bool().unwrap_or(false) {
            cancel.cancelled().await;
            return Err(ToolFault::Cancelled);
        }
        match arguments["path"].as_str() {
            Some(path) if path.starts_with("missing") => Err(ToolFault::NotFound(path.to_string())),
            Some(path) => Ok(json!({
                "tool": tool_name,
                "output": output_path.unwrap_or_else(|| format!("{path}.pdf")),
            })),
            None => Err(ToolFault::InvalidArgument("path is required".to_string())),
        }
    }
}

fn service(config: TaskConfig) -> TaskService {
    TaskService::new(config, Arc::new(FakeConverter)).unwrap()
}

async fn wait_until_terminal(service: &TaskService, task_id: &str) -> TaskStatus {
    for _ in 0..200 {
        let status = service.status(task_id, None).unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} did not finish");
}

#[tokio::test]
async fn submit_runs_to_completion() {
    let service = service(TaskConfig::default());
    let submitted = service
        .submit("convert_to_pdf", &json!({"path": "report"}), None, Some("s1"))
        .unwrap();
    assert_eq!(submitted.status, TaskStatus::Working);
    assert_eq!(submitted.ttl, TaskConfig::default().default_ttl_ms);
    assert_eq!(submitted.poll_interval, TaskConfig::default().default_poll_interval_ms);

    assert_eq!(
        wait_until_terminal(&service, &submitted.task_id).await,
        TaskStatus::Completed
    );
    let done = service.status(&submitted.task_id, Some("s1")).unwrap();
    assert_eq!(
        done.result,
        Some(json!({"tool": "convert_to_pdf", "output": "report.pdf"}))
    );
    assert_eq!(done.error, None);
}

#[tokio::test]
async fn failures_surface_through_status() {
    let service = service(TaskConfig::default());
    let task = service
        .submit("convert_document", &json!({"path": "missing.docx"}), None, None)
        .unwrap();

    assert_eq!(
        wait_until_terminal(&service, &task.task_id).await,
        TaskStatus::Failed
    );
    let failed = service.status(&task.task_id, None).unwrap();
    assert_eq!(failed.status_message.as_deref(), Some("File not found"));
    assert!(failed.error.is_some());
    assert_eq!(failed.result, None);
}

#[tokio::test]
async fn submit_rejects_tools_outside_allow_list() {
    let service = service(TaskConfig::default());
    let err = service
        .submit("add_watermark", &json!({}), None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Task(TaskError::UnsupportedTool { ref tool_name }) if tool_name == "add_watermark"
    ));
    assert_eq!(err.error_code(), -32602);
    assert!(service.list(None).is_empty());
}

#[tokio::test]
async fn submit_rejected_when_disabled() {
    let service = service(TaskConfig {
        enabled: false,
        ..TaskConfig::default()
    });
    let err = service
        .submit("convert_to_pdf", &json!({"path": "a"}), None, None)
        .unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::Disabled)));
}

#[tokio::test]
async fn admission_limit_is_reported() {
    let service = service(TaskConfig {
        max_concurrent_tasks: 1,
        ..TaskConfig::default()
    });
    let waiting = service
        .submit("convert_to_pdf", &json!({"path": "a", "wait": true}), None, Some("s1"))
        .unwrap();

    let err = service
        .submit("convert_to_pdf", &json!({"path": "b"}), None, Some("s1"))
        .unwrap_err();
    assert!(err.to_string().contains("max concurrent tasks reached"));
    assert_eq!(err.error_code(), -32603);

    service.cancel(&waiting.task_id, Some("s1")).unwrap();
    assert!(service
        .submit("convert_to_pdf", &json!({"path": "b"}), None, Some("s1"))
        .is_ok());
}

#[tokio::test]
async fn cancel_running_task() {
    let service = service(TaskConfig::default());
    let task = service
        .submit("convert_to_pdf", &json!({"path": "a", "wait": true}), None, Some("s1"))
        .unwrap();

    let cancelled = service.cancel(&task.task_id, Some("s1")).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.result, None);
    assert_eq!(cancelled.error, None);

    // The executor must not overwrite the cancelled state.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = service.status(&task.task_id, None).unwrap();
    assert_eq!(status.status, TaskStatus::Cancelled);
    assert_eq!(status.status_message.as_deref(), Some("Task was cancelled"));
}

#[tokio::test]
async fn cancel_finished_task_is_invalid_operation() {
    let service = service(TaskConfig::default());
    let task = service
        .submit("convert_to_pdf", &json!({"path": "a"}), None, None)
        .unwrap();
    wait_until_terminal(&service, &task.task_id).await;

    let err = service.cancel(&task.task_id, None).unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
    assert_eq!(
        service.status(&task.task_id, None).unwrap().status,
        TaskStatus::Completed
    );
}

#[tokio::test]
async fn other_owners_see_nothing() {
    let service = service(TaskConfig::default());
    let task = service
        .submit("convert_to_pdf", &json!({"path": "a", "wait": true}), None, Some("owner-b"))
        .unwrap();

    assert!(matches!(
        service.status(&task.task_id, Some("owner-a")),
        Err(Error::TaskNotFound { .. })
    ));
    assert!(matches!(
        service.cancel(&task.task_id, Some("owner-a")),
        Err(Error::TaskNotFound { .. })
    ));
    assert!(service.list(Some("owner-a")).is_empty());
    assert_eq!(service.list(Some("owner-b")).len(), 1);

    service.cancel(&task.task_id, Some("owner-b")).unwrap();
}

#[tokio::test]
async fn list_is_newest_first() {
    let service = service(TaskConfig::default());
    let first = service
        .submit("convert_to_pdf", &json!({"path": "a"}), None, None)
        .unwrap();
    let second = service
        .submit("convert_document", &json!({"path": "b"}), None, None)
        .unwrap();

    let ids: Vec<String> = service.list(None).into_iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![second.task_id, first.task_id]);
}

#[test]
fn invalid_config_is_rejected() {
    for max in [0, 101] {
        let err = TaskService::new(
            TaskConfig {
                max_concurrent_tasks: max,
                ..TaskConfig::default()
            },
            Arc::new(FakeConverter),
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_concurrent_tasks"));
    }
    assert!(TaskService::new(
        TaskConfig {
            max_concurrent_tasks: 5,
            ..TaskConfig::default()
        },
        Arc::new(FakeConverter),
    )
    .is_ok());
}

#[tokio::test]
async fn cleanup_starts_once_and_stops_on_shutdown() {
    let service = service(TaskConfig::default());
    assert!(service.start_cleanup());
    assert!(!service.start_cleanup());

    tokio::time::timeout(Duration::from_secs(5), service.shutdown())
        .await
        .unwrap();
    assert!(!service.start_cleanup());
}
