//! LSP-driven Symbol Source (§4.3.1). `LspClient` is the external
//! collaborator contract from §6: the client is expected to already be
//! initialized and connected to a running language server — the JSON-RPC
//! transport and handshake are explicitly out of scope (§1).
//!
//! For each candidate file: request `textDocument/documentSymbol`, then for
//! each symbol request `textDocument/semanticTokens/range` and slice the
//! file text by the symbol's range. Go-to-definition is resolved lazily per
//! token via `textDocument/definition`.

use super::{FileSymbols, SymbolNode, SymbolSource};
use crate::errors::Result;
use crate::location::{LineIndex, Location};
use crate::model::Import;
use crate::spec::LanguageSpec;
use crate::types::{SymbolKind, SymbolRole, Token};
use indexmap::IndexMap;
use lsp_types::{Position, Url};
use std::path::Path;

/// One `documentSymbol` result, already translated into this crate's
/// `Location`/`SymbolKind` types by the concrete client implementation.
#[derive(Debug, Clone)]
pub struct LspSymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub children: Vec<LspSymbolInfo>,
}

/// Required operations of an already-connected LSP client (§6). Each
/// returns results in LSP units (UTF-16); no operation here owns the
/// JSON-RPC channel itself.
pub trait LspClient: Send {
    fn document_symbols(&mut self, uri: &Url) -> Result<Vec<LspSymbolInfo>>;
    fn semantic_tokens(&mut self, location: &Location) -> Result<Vec<Token>>;
    fn definition(&mut self, uri: &Url, pos: Position) -> Result<Vec<Location>>;
    fn locate(&mut self, location: &Location) -> Result<String>;
    fn get_file(&mut self, uri: &Url) -> Result<String>;
    fn line_counts(&mut self, uri: &Url) -> Result<usize>;
    fn line(&mut self, uri: &Url, idx: usize) -> Result<String>;
}

pub struct LspSymbolSource<C: LspClient> {
    client: C,
    file_cache: IndexMap<Url, (String, LineIndex)>,
}

impl<C: LspClient> LspSymbolSource<C> {
    pub fn new(client: C) -> Self {
        Self { client, file_cache: IndexMap::new() }
    }

    fn ensure_cached(&mut self, uri: &Url) -> Result<()> {
        if !self.file_cache.contains_key(uri) {
            let text = self.client.get_file(uri)?;
            let idx = LineIndex::new(&text);
            self.file_cache.insert(uri.clone(), (text, idx));
        }
        Ok(())
    }

    fn slice(&self, uri: &Url, location: &Location) -> String {
        match self.file_cache.get(uri) {
            Some((text, idx)) => {
                let start = idx.byte_at_position(text, location.range.start);
                let end = idx.byte_at_position(text, location.range.end);
                text.get(start..end).unwrap_or_default().to_string()
            }
            None => String::new(),
        }
    }

    fn convert(&mut self, info: LspSymbolInfo, uri: &Url) -> Result<SymbolNode> {
        let text = self.slice(uri, &info.location);
        let tokens = self.client.semantic_tokens(&info.location)?;
        let mut children = Vec::with_capacity(info.children.len());
        for child in info.children {
            children.push(self.convert(child, uri)?);
        }
        Ok(SymbolNode {
            name: info.name,
            kind: info.kind,
            location: info.location,
            text,
            tokens,
            role: SymbolRole::Definition,
            origin: crate::types::SymbolOrigin::Local,
            children,
        })
    }
}

impl<C: LspClient> SymbolSource for LspSymbolSource<C> {
    fn load_file(&mut self, abs_path: &Path, spec: &dyn LanguageSpec) -> Result<FileSymbols> {
        let uri = Url::from_file_path(abs_path)
            .map_err(|_| crate::errors::Error::InvalidState("non-absolute file path"))?;
        self.ensure_cached(&uri)?;
        let imports = {
            let (text, _) = self.file_cache.get(&uri).expect("cached above");
            spec.file_imports(text)
        };

        let infos = self.client.document_symbols(&uri)?;
        let mut roots = Vec::with_capacity(infos.len());
        for info in infos {
            roots.push(self.convert(info, &uri)?);
        }
        Ok(FileSymbols { imports, roots })
    }

    fn definition(&mut self, location: &Location) -> Result<Vec<Location>> {
        self.client.definition(&location.uri, location.range.start)
    }
}
