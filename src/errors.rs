use thiserror::Error;

/// Crate-wide error type.
///
/// Per-token and per-edge resolution failures (definition not found, dep kind
/// not classifiable, IPC callee unresolved) are *not* represented here: the
/// error-policy table in the collector design calls for those to be logged
/// and swallowed at the call site, never bubbled as an `Error`. Only
/// conditions that should abort collection outright, or that are genuinely
/// exceptional plumbing failures, get a variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("tree-sitter language error")]
    TreeSitterLanguage,

    #[error("tree-sitter parse error")]
    TreeSitterParse,

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("lsp protocol error: {0}")]
    LspProtocol(&'static str),

    #[error("process spawn error: {0}")]
    Spawn(&'static str),

    /// `workspace(root)` could not read the root at all. Fatal per the
    /// error-policy table: the filesystem walk failed at the root.
    #[error("bad workspace at {0}: {1}")]
    BadWorkspace(std::path::PathBuf, String),

    /// Workspace discovery completed but found no module at all. Fatal.
    #[error("no module discovered under {0}")]
    NoModuleDiscovered(std::path::PathBuf),

    /// IPC cache could not be parsed into a `Converter`.
    #[error("ipc cache error: {0}")]
    IpcCache(String),

    /// Collection was cancelled via the caller's cancellation context.
    #[error("collection cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sentinel outcomes of `exportSymbol`. These are *expected* filters, not
/// failures: the Exporter matches on them and silently skips the symbol
/// rather than propagating an `Error`. Kept distinct from `Error` so a
/// caller can never accidentally `?`-bubble one past the Exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSentinel {
    /// Symbol resolved to the standard library and `NeedStdSymbol` is false.
    ErrStdSymbol,
    /// Symbol resolved outside the repo and `LoadExternalSymbol` is false.
    ErrExternalSymbol,
}

pub type ExportResult<T> = std::result::Result<T, ExportSentinel>;
