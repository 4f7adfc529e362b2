//! Diagnostics model shared by the lexer, parser and the semantic passes.
//!
//! `DiagnosticSink` is the single-threaded accumulator used while lexing and
//! parsing one file. `Diagnostics` is the analysis-wide list: it is shared by
//! every worker thread, de-duplicates entries and owns the source-file registry
//! used to render `path:line:col` locations.

mod files;

use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use blake3::Hasher;
pub use files::{FileCache, FileId, LineCol, SourceFile};
use serde::Serialize;

use crate::error::Error;

/// Span into a source file (byte offsets).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub file_id: FileId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            file_id: FileId::UNKNOWN,
            start,
            end,
        }
    }

    #[must_use]
    pub fn in_file(file_id: FileId, start: usize, end: usize) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Span) -> Self {
        Self {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

/// Structured identifier for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DiagnosticCode {
    pub code: String,
    pub category: Option<String>,
}

impl DiagnosticCode {
    #[must_use]
    pub fn new(code: impl Into<String>, category: Option<String>) -> Self {
        Self {
            code: code.into(),
            category,
        }
    }
}

/// Highlight for a particular span within the diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    #[must_use]
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// Diagnostic entry with optional labels and notes.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<DiagnosticCode>,
    pub message: String,
    pub primary_label: Option<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Error, message, span)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Warning, message, span)
    }

    #[must_use]
    pub fn note(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Note, message, span)
    }

    #[must_use]
    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    #[must_use]
    pub fn span(&self) -> Option<Span> {
        self.primary_label.as_ref().map(|label| label.span)
    }

    #[must_use]
    fn new(severity: Severity, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            primary_label: span.map(|span| Label::primary(span, String::new())),
            notes: Vec::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .code
            .as_ref()
            .map(|c| c.code.as_str())
            .unwrap_or("UNKNOWN");
        write!(f, "{}[{code}]: {}", self.severity.as_str(), self.message)
    }
}

fn auto_code(namespace: &str, diagnostic: &Diagnostic) -> DiagnosticCode {
    let mut hasher = Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(diagnostic.message.as_bytes());
    if let Some(label) = diagnostic.primary_label.as_ref() {
        hasher.update(&label.span.start.to_le_bytes());
        hasher.update(&label.span.end.to_le_bytes());
    }
    let hash = hasher.finalize();
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&hash.as_bytes()[..4]);
    let suffix = u32::from_le_bytes(prefix) % 100_000;
    let code = format!("{}{:05}", namespace.to_ascii_uppercase(), suffix);
    DiagnosticCode::new(code, Some(namespace.to_string()))
}

/// Collection helper used to accumulate diagnostics while lexing and parsing.
#[derive(Debug)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    namespace: String,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            diagnostics: Vec::new(),
            namespace: namespace.into(),
        }
    }

    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.code.is_none() {
            diagnostic.code = Some(auto_code(&self.namespace, &diagnostic));
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn push_error(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::error(message, span));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new("GEN")
    }
}

/// Serializable view of one diagnostic with its location resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub severity: &'static str,
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub notes: Vec<String>,
}

type DedupKey = (Severity, String, Option<Span>);

#[derive(Default)]
struct Entries {
    list: Vec<Diagnostic>,
    seen: HashSet<DedupKey>,
}

/// Analysis-wide, thread-safe diagnostic list.
#[derive(Default)]
pub struct Diagnostics {
    entries: Mutex<Entries>,
    files: RwLock<FileCache>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("len", &self.len())
            .finish()
    }
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file so spans pointing into it can be rendered.
    pub fn register_file(&self, path: impl Into<PathBuf>, source: Arc<str>) -> FileId {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.add_file(path, source)
    }

    #[must_use]
    pub fn line_col(&self, span: Span) -> Option<LineCol> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.line_col(span.file_id, span.start)
    }

    /// Record a diagnostic under `namespace`. Returns `false` when an identical
    /// entry was already present.
    pub fn emit(&self, namespace: &str, mut diagnostic: Diagnostic) -> bool {
        if diagnostic.code.is_none() {
            diagnostic.code = Some(auto_code(namespace, &diagnostic));
        }
        let key = (
            diagnostic.severity,
            diagnostic.message.clone(),
            diagnostic.span(),
        );
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.seen.insert(key) {
            return false;
        }
        entries.list.push(diagnostic);
        true
    }

    pub fn error(&self, namespace: &str, message: impl Into<String>, span: Option<Span>) {
        self.emit(namespace, Diagnostic::error(message, span));
    }

    pub fn warning(&self, namespace: &str, message: impl Into<String>, span: Option<Span>) {
        self.emit(namespace, Diagnostic::warning(message, span));
    }

    /// Record `diagnostic` and return the abandon signal for the caller to
    /// propagate with `?`.
    #[must_use]
    pub fn bail(&self, namespace: &str, diagnostic: Diagnostic) -> Error {
        self.emit(namespace, diagnostic);
        Error::Bailout
    }

    pub fn extend(&self, namespace: &str, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(namespace, diagnostic);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .iter()
            .any(|d| d.severity.is_error())
    }

    /// Copy of the list in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .clone()
    }

    #[must_use]
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        let list = self.snapshot();
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        list.into_iter()
            .map(|diagnostic| {
                let span = diagnostic.span();
                let file = span
                    .and_then(|span| files.path(span.file_id))
                    .map(|path| path.display().to_string());
                let location = span.and_then(|span| files.line_col(span.file_id, span.start));
                DiagnosticRecord {
                    severity: diagnostic.severity.as_str(),
                    code: diagnostic.code.map(|code| code.code),
                    message: diagnostic.message,
                    file,
                    line: location.map(|loc| loc.line),
                    column: location.map(|loc| loc.column),
                    notes: diagnostic.notes,
                }
            })
            .collect()
    }

    /// Human-readable rendering, one diagnostic per line plus indented notes.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in self.records() {
            match (&record.file, record.line, record.column) {
                (Some(file), Some(line), Some(column)) => {
                    let _ = write!(out, "{file}:{line}:{column}: ");
                }
                (Some(file), _, _) => {
                    let _ = write!(out, "{file}: ");
                }
                _ => {}
            }
            let code = record.code.as_deref().unwrap_or("UNKNOWN");
            let _ = writeln!(out, "{}[{code}]: {}", record.severity, record.message);
            for note in &record.notes {
                let _ = writeln!(out, "  note: {note}");
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }
}
