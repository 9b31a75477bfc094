//! Async tool allow-list and the status messages written by the task subsystem.

/// Tools that may run as background tasks.
///
/// Adding a tool here also requires a matching [`AsyncTool`](crate::AsyncTool)
/// variant so the executor knows how to dispatch it.
pub const ASYNC_TOOLS: &[&str] = &["convert_to_pdf", "convert_document"];

/// Argument key carrying the output-path override for a conversion.
pub const OUTPUT_PATH_ARGUMENT: &str = "outputPath";

/// Status message of a freshly created task.
pub const MSG_CREATED: &str = "Task created, waiting to start";

/// Status message once the executor has picked the task up.
pub const MSG_PROCESSING: &str = "Processing...";

/// Status message of a successfully completed task.
pub const MSG_COMPLETED: &str = "Task completed successfully";

/// Status message of a cancelled task.
pub const MSG_CANCELLED: &str = "Task was cancelled";

/// Status message when the tool could not find an input file.
pub const MSG_FILE_NOT_FOUND: &str = "File not found";

/// Status message when the tool was denied access to a path.
pub const MSG_ACCESS_DENIED: &str = "Access denied";

/// Status message when the tool rejected its arguments.
pub const MSG_INVALID_ARGUMENT: &str = "Invalid argument";

/// Status message when the tool cannot run as a background task.
pub const MSG_NOT_SUPPORTED: &str = "Not supported";

/// Status message for any other failure.
pub const MSG_FAILED: &str = "Task failed";
