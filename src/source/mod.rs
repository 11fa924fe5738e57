//! Symbol Source (C3): the abstract producer of `DocumentSymbol`s with
//! attached `Text` and `Token` stream. Three concrete variants share one
//! trait so the Collector drives them uniformly (§2, C4).

pub mod ipc;
pub mod lsp;
pub mod treesitter;

pub use ipc::{IpcParser, IpcSymbolSource};
pub use lsp::{LspClient, LspSymbolSource};
pub use treesitter::TreeSitterSource;

use crate::errors::Result;
use crate::location::Location;
use crate::model::Import;
use crate::spec::LanguageSpec;
use crate::types::{SymbolKind, SymbolOrigin, SymbolRole, Token};
use std::path::Path;

/// A symbol as produced by a source, before the Collector has assigned it
/// an arena `SymbolId`. `children` nests further `SymbolNode`s rather than
/// arena ids — the Collector flattens this tree into the arena during
/// Phase A, in source (declaration) order.
#[derive(Debug, Clone)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub text: String,
    pub tokens: Vec<Token>,
    pub role: SymbolRole,
    pub origin: SymbolOrigin,
    pub children: Vec<SymbolNode>,
}

impl SymbolNode {
    pub fn definition(name: impl Into<String>, kind: SymbolKind, location: Location, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
            text: text.into(),
            tokens: Vec::new(),
            role: SymbolRole::Definition,
            origin: SymbolOrigin::Local,
            children: Vec::new(),
        }
    }
}

/// Everything one file contributes: its imports and its top-level symbol
/// forest.
#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    pub imports: Vec<Import>,
    pub roots: Vec<SymbolNode>,
}

/// Uniform producer contract for all three symbol-source variants.
pub trait SymbolSource {
    /// Loads and parses one file, relative to the already-filtered file
    /// list the Collector's Phase A walk produced.
    fn load_file(&mut self, abs_path: &Path, spec: &dyn LanguageSpec) -> Result<FileSymbols>;

    /// `textDocument/definition` equivalent: resolve the definition
    /// location(s) of whatever entity the token at `location` names. Zero
    /// results means "not found" (Phase D logs and drops the edge); more
    /// than one means the caller should warn and use the first.
    fn definition(&mut self, location: &Location) -> Result<Vec<Location>>;
}
