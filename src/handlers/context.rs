//! Execution context passed to operation handlers.

use std::path::{Path, PathBuf};

/// The document an operation works on, plus where it came from and where
/// it should be written.
///
/// `D` is the document model of one tool family (a word-processing
/// document, a spreadsheet, ...). Handlers that change the document call
/// [`mark_modified`](Self::mark_modified) so the caller knows to save it.
///
/// # Examples
///
/// ```
/// use docmcp::handlers::OperationContext;
///
/// let mut ctx = OperationContext::new(String::from("hello"))
///     .with_document_id("doc-1")
///     .with_source_path("in.txt");
///
/// ctx.document_mut().push_str(" world");
/// ctx.mark_modified();
///
/// assert!(ctx.is_modified());
/// assert_eq!(ctx.target_path().unwrap().to_str(), Some("in.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct OperationContext<D> {
    document: D,
    /// Session or cache identifier of the document, if it has one.
    pub document_id: Option<String>,
    /// Path the document was loaded from.
    pub source_path: Option<PathBuf>,
    /// Explicit destination for the result.
    pub output_path: Option<PathBuf>,
    modified: bool,
}

impl<D> OperationContext<D> {
    /// Wraps a loaded document.
    pub fn new(document: D) -> Self {
        Self {
            document,
            document_id: None,
            source_path: None,
            output_path: None,
            modified: false,
        }
    }

    /// Sets the document identifier.
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Sets the source path.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Sets the output path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// The document being operated on.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access to the document. Call
    /// [`mark_modified`](Self::mark_modified) after changing it.
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Records that the document changed and needs saving.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Returns `true` once a handler marked the document modified.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Where a modified document should be saved: the output path if one
    /// was given, otherwise the source path.
    pub fn target_path(&self) -> Option<&Path> {
        self.output_path
            .as_deref()
            .or(self.source_path.as_deref())
    }

    /// Consumes the context and returns the document.
    pub fn into_document(self) -> D {
        self.document
    }
}
