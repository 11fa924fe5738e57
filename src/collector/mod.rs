//! Collector (C4): drives a `SymbolSource`, builds the four internal
//! tables (`syms`, `funcs`, `vars`, `deps`), resolves go-to-definition per
//! entity token, and loads external symbols on demand.
//!
//! The core executes on a single cooperative task per repository (§5):
//! no table here is shared across concurrent collections. Parallelism, if
//! any, belongs to a supervisor one layer up that runs independent
//! `Collector` instances per package/repository.

pub mod dependency;
pub mod ipc;

use crate::config::CollectOption;
use crate::errors::Result;
use crate::location::Location;
use crate::model::Import;
use crate::spec::{self, LanguageSpec};
use crate::source::SymbolSource;
use crate::types::{
    Dependency, DocumentSymbol, FunctionInfo, SymbolId, SymbolKind, SymbolOrigin, SymbolRole, VarInfo,
};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata gathered for one scanned file during Phase A.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub imports: Vec<Import>,
    pub top_level: Vec<SymbolId>,
}

pub struct Collector {
    pub(crate) spec: Box<dyn LanguageSpec>,
    pub(crate) opt: CollectOption,
    pub(crate) root: PathBuf,

    pub(crate) arena: Vec<DocumentSymbol>,
    pub(crate) files: IndexMap<PathBuf, FileRecord>,
    pub(crate) syms: IndexMap<Location, SymbolId>,
    pub(crate) funcs: IndexMap<SymbolId, FunctionInfo>,
    pub(crate) vars: IndexMap<SymbolId, VarInfo>,
    pub(crate) deps: IndexMap<SymbolId, Vec<Dependency>>,
}

impl Collector {
    pub fn new(root: impl Into<PathBuf>, opt: CollectOption) -> Self {
        let spec = spec::for_language(opt.language);
        Self {
            spec,
            opt,
            root: root.into(),
            arena: Vec::new(),
            files: IndexMap::new(),
            syms: IndexMap::new(),
            funcs: IndexMap::new(),
            vars: IndexMap::new(),
            deps: IndexMap::new(),
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &DocumentSymbol {
        &self.arena[id as usize]
    }

    /// Content-derived key for `id`, stable across repeated collections of
    /// the same source and independent of arena layout. Not used as an
    /// internal map key anywhere — the arena `SymbolId` stays primary — but
    /// exposed for callers that cache collection results across runs.
    pub fn stable_key(&self, id: SymbolId) -> String {
        let sym = &self.arena[id as usize];
        let mut h = Sha256::new();
        h.update(sym.location.uri.as_str().as_bytes());
        h.update(sym.name.as_bytes());
        h.update(sym.location.range.start.line.to_le_bytes());
        h.update(sym.location.range.start.character.to_le_bytes());
        h.update(sym.location.range.end.line.to_le_bytes());
        h.update(sym.location.range.end.character.to_le_bytes());
        format!("{:x}", h.finalize())
    }

    pub fn language_spec(&self) -> &dyn LanguageSpec {
        self.spec.as_ref()
    }

    pub fn option(&self) -> &CollectOption {
        &self.opt
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs Phases A-D over every file the active `SymbolSource` reports.
    /// `source` is intentionally passed in rather than owned, since the
    /// same source implementation may straddle several collections (e.g.
    /// a long-lived LSP client shared by a monorepo driver).
    pub fn collect(&mut self, source: &mut dyn SymbolSource) -> Result<()> {
        let workspace = self.spec.workspace(&self.root)?;
        debug!(modules = workspace.len(), "workspace discovered");

        self.phase_a_scan(source)?;
        self.phase_b_filter_locals();
        self.phase_c_process(source);
        self.phase_d_dependencies(source);
        Ok(())
    }

    /// Phase A — file scan. Walk the root; skip per `should_skip`;
    /// otherwise parse imports and request top-level symbols from the
    /// active Symbol Source, flattening the returned tree into the arena.
    fn phase_a_scan(&mut self, source: &mut dyn SymbolSource) -> Result<()> {
        let files = crate::util::fs_scan::scan_project_files(&self.root, self.spec.as_ref(), &self.opt);
        for abs_path in files {
            let file_symbols = match source.load_file(&abs_path, self.spec.as_ref()) {
                Ok(fs) => fs,
                Err(e) => {
                    warn!(file = %abs_path.display(), error = %e, "failed to load file, skipping");
                    continue;
                }
            };
            let top_level = self.insert_tree(file_symbols.roots);
            self.files.insert(abs_path, FileRecord { imports: file_symbols.imports, top_level });
        }
        Ok(())
    }

    /// Recursively flattens a `SymbolNode` forest into the arena,
    /// registering `Local` symbols into `syms` (I1: a location collision
    /// is logged and the later entry dropped rather than silently
    /// overwriting the earlier one).
    fn insert_tree(&mut self, nodes: Vec<crate::source::SymbolNode>) -> Vec<SymbolId> {
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let children = self.insert_tree(node.children);
            let id = self.arena.len() as SymbolId;
            self.arena.push(DocumentSymbol {
                name: node.name,
                kind: node.kind,
                location: node.location.clone(),
                text: node.text,
                tokens: node.tokens,
                children,
                role: node.role,
                origin: node.origin,
            });
            if self.arena[id as usize].origin == SymbolOrigin::Local {
                if let Some(existing) = self.syms.get(&node.location) {
                    warn!(location = ?node.location, existing = existing, "duplicate symbol location, keeping first (I1)");
                } else {
                    self.syms.insert(node.location, id);
                }
            }
            ids.push(id);
        }
        ids
    }

    /// Phase B — filter locals (I2). Rather than removing *any* symbol
    /// contained in another (which would also strip legitimate
    /// entity-in-entity nesting such as a class's methods or a struct's
    /// nested struct), only function-body locals are removed: a
    /// Variable/Constant symbol whose location is strictly contained
    /// within a Function/Method symbol's location. See DESIGN.md, Open
    /// Question resolution for scenario 2 (`class C: def m(self): ...`
    /// exporting both `C` and `C.m` despite the nesting).
    fn phase_b_filter_locals(&mut self) {
        let callable_ranges: Vec<Location> = self
            .syms
            .iter()
            .filter(|(_, &id)| self.arena[id as usize].kind.is_callable())
            .map(|(loc, _)| loc.clone())
            .collect();

        let to_remove: Vec<Location> = self
            .syms
            .iter()
            .filter(|(loc, &id)| {
                let sym = &self.arena[id as usize];
                matches!(sym.kind, SymbolKind::Variable | SymbolKind::Constant)
                    && callable_ranges.iter().any(|c| c != *loc && c.includes(loc))
            })
            .map(|(loc, _)| loc.clone())
            .collect();

        for loc in to_remove {
            self.syms.shift_remove(&loc);
        }
    }

    /// Phase C — process. For every root symbol, run `processSymbol`
    /// (§4.3.4): container symbols (impl blocks / classes, for languages
    /// with impl blocks) first attach receiver/interface/impl-head to
    /// their contained methods; then every callable symbol gets its own
    /// signature decomposed; then every var/const symbol gets its type
    /// resolved.
    fn phase_c_process(&mut self, source: &mut dyn SymbolSource) {
        if self.spec.has_impl_symbol() {
            let containers: Vec<SymbolId> = self
                .syms
                .values()
                .copied()
                .filter(|&id| {
                    let k = self.arena[id as usize].kind;
                    matches!(k, SymbolKind::Object) || k.is_type_like()
                })
                .collect();
            for id in containers {
                self.collect_impl(source, id);
            }
        }

        let callables: Vec<SymbolId> = self
            .syms
            .values()
            .copied()
            .filter(|&id| self.arena[id as usize].kind.is_callable())
            .collect();
        for id in callables {
            self.collect_function(source, id);
        }

        let vars: Vec<SymbolId> = self
            .syms
            .values()
            .copied()
            .filter(|&id| matches!(self.arena[id as usize].kind, SymbolKind::Variable | SymbolKind::Constant))
            .collect();
        for id in vars {
            self.collect_var(source, id);
        }
    }

    /// `collectImpl(s)`: resolve receiver/interface tokens on the container
    /// symbol, compute `implHead`, then attach a partial `FunctionInfo` to
    /// every method whose location is included in `s`'s location.
    fn collect_impl(&mut self, source: &mut dyn SymbolSource, container: SymbolId) {
        let decomp = self.spec.impl_symbol(&self.arena[container as usize]);
        let container_loc = self.arena[container as usize].location.clone();
        let container_start_text = self.arena[container as usize].text.clone();

        let receiver = decomp
            .receiver_idx
            .and_then(|i| self.token_at(container, i))
            .and_then(|tok| self.get_symbol_by_token(source, &tok));
        let interface = decomp
            .interface_idx
            .and_then(|i| self.token_at(container, i))
            .and_then(|tok| self.get_symbol_by_token(source, &tok));
        let impl_head = decomp.first_method_idx.and_then(|i| self.token_at(container, i)).map(|first_method_tok| {
            let offset_in_container = self.byte_offset_within(&container_loc, &first_method_tok.location);
            crate::location::chunk_head(&container_start_text, 0, offset_in_container).to_string()
        });

        let methods: Vec<SymbolId> = self
            .syms
            .values()
            .copied()
            .filter(|&m| m != container && self.arena[m as usize].kind.is_callable() && container_loc.includes(&self.arena[m as usize].location))
            .collect();

        for m in methods {
            let entry = self.funcs.entry(m).or_default();
            entry.receiver = receiver;
            entry.interface = interface;
            entry.impl_head = impl_head.clone();
        }
    }

    /// `functionSymbol(s)` + signature computation, merged into any
    /// existing `funcs[s]` entry rather than overwriting receiver/
    /// interface/impl-head already attached by `collect_impl`.
    fn collect_function(&mut self, source: &mut dyn SymbolSource, s: SymbolId) {
        let decomp = self.spec.function_symbol(&self.arena[s as usize]);
        let sym_text = self.arena[s as usize].text.clone();

        let mut type_params = crate::types::OrderedDeps::default();
        for idx in &decomp.type_param_idx {
            if let Some(tok) = self.token_at(s, *idx) {
                if let Some(target) = self.get_symbol_by_token(source, &tok) {
                    type_params.insert(*idx, Dependency { location: tok.location.clone(), target });
                }
            }
        }
        let mut inputs = crate::types::OrderedDeps::default();
        for idx in &decomp.input_idx {
            if let Some(tok) = self.token_at(s, *idx) {
                if let Some(target) = self.get_symbol_by_token(source, &tok) {
                    inputs.insert(*idx, Dependency { location: tok.location.clone(), target });
                }
            }
        }
        let mut outputs = crate::types::OrderedDeps::default();
        for idx in &decomp.output_idx {
            if let Some(tok) = self.token_at(s, *idx) {
                if let Some(target) = self.get_symbol_by_token(source, &tok) {
                    outputs.insert(*idx, Dependency { location: tok.location.clone(), target });
                }
            }
        }

        let last_param_idx = decomp.input_idx.iter().chain(decomp.type_param_idx.iter()).max().copied();
        let signature = match last_param_idx.and_then(|i| self.token_at(s, i)) {
            Some(tok) => {
                let sym_loc = self.arena[s as usize].location.clone();
                let end_offset = self.byte_offset_within(&sym_loc, &tok.location) + tok.text.len();
                crate::location::chunk_head(&sym_text, 0, end_offset).to_string()
            }
            None => sym_text.lines().next().unwrap_or_default().to_string(),
        };

        let has_container = self.funcs.get(&s).map(|f| f.receiver.is_some()).unwrap_or(false);
        let entry = self.funcs.entry(s).or_default();
        if entry.receiver.is_none() {
            entry.receiver = decomp.receiver_idx.and_then(|i| self.token_at(s, i)).and_then(|t| self.get_symbol_by_token(source, &t));
        }
        if has_container {
            entry.is_static = decomp.receiver_idx.is_none();
        }
        entry.type_params = type_params;
        entry.inputs = inputs;
        entry.outputs = outputs;
        entry.signature = signature;
    }

    /// For a var/const symbol, find the first entity token after its
    /// declare-token and resolve it as the variable's type.
    fn collect_var(&mut self, source: &mut dyn SymbolSource, s: SymbolId) {
        let declare_idx = self.spec.declare_token_of_symbol(&self.arena[s as usize]).unwrap_or(0);
        let sym = &self.arena[s as usize];
        let type_token = sym.tokens[declare_idx.min(sym.tokens.len())..]
            .iter()
            .find(|t| self.spec.is_entity_token(t) && matches!(t.kind, crate::types::TokenKind::TypeIdentifier))
            .cloned();
        let type_dep = type_token.and_then(|tok| {
            self.get_symbol_by_token(source, &tok).map(|target| Dependency { location: tok.location, target })
        });
        self.vars.insert(s, VarInfo { type_dep });
    }

    fn token_at(&self, s: SymbolId, idx: usize) -> Option<crate::types::Token> {
        self.arena[s as usize].tokens.get(idx).cloned()
    }

    /// Byte offset of `inner` relative to `outer`'s start, computed purely
    /// from line/character arithmetic against `outer`'s own text (used to
    /// slice `signature`/`impl_head` without re-reading the file).
    fn byte_offset_within(&self, outer: &Location, inner: &Location) -> usize {
        if outer.uri != inner.uri {
            return 0;
        }
        let outer_text = self.text_for(outer);
        let idx = crate::location::LineIndex::new(&outer_text);
        let outer_start_line = outer.range.start.line;
        let rel_line = inner.range.start.line.saturating_sub(outer_start_line);
        let rel_pos = lsp_types::Position { line: rel_line, character: inner.range.start.character };
        idx.byte_at_position(&outer_text, rel_pos)
    }

    fn text_for(&self, loc: &Location) -> String {
        self.syms
            .get(loc)
            .map(|&id| self.arena[id as usize].text.clone())
            .unwrap_or_default()
    }

    pub fn into_parts(
        self,
    ) -> (
        Box<dyn LanguageSpec>,
        CollectOption,
        PathBuf,
        Vec<DocumentSymbol>,
        IndexMap<PathBuf, FileRecord>,
        IndexMap<Location, SymbolId>,
        IndexMap<SymbolId, FunctionInfo>,
        IndexMap<SymbolId, VarInfo>,
        IndexMap<SymbolId, Vec<Dependency>>,
    ) {
        (self.spec, self.opt, self.root, self.arena, self.files, self.syms, self.funcs, self.vars, self.deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Language;
    use crate::source::TreeSitterSource;
    use std::io::Write;

    #[test]
    fn collects_rust_trait_impl_scenario() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("src/lib.rs")).unwrap();
        writeln!(
            f,
            "trait Animal {{ fn speak(&self); }}\n\nstruct Dog;\n\nimpl Animal for Dog {{ fn speak(&self) {{ }} }}"
        )
        .unwrap();

        let opt = CollectOption::new(Language::Rust);
        let mut collector = Collector::new(dir.path(), opt);
        let mut source = TreeSitterSource::new(Language::Rust);
        collector.collect(&mut source).unwrap();

        let has_dog = collector.syms.values().any(|&id| collector.arena[id as usize].name == "Dog");
        let has_animal = collector.syms.values().any(|&id| collector.arena[id as usize].name == "Animal");
        assert!(has_dog);
        assert!(has_animal);
    }

    #[test]
    fn stable_key_is_deterministic_and_distinguishes_symbols() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("src/lib.rs")).unwrap();
        writeln!(f, "pub fn a() {{}}\npub fn b() {{}}").unwrap();

        let mut collector = Collector::new(dir.path(), CollectOption::new(Language::Rust));
        let mut source = TreeSitterSource::new(Language::Rust);
        collector.collect(&mut source).unwrap();

        let a = *collector.syms.values().find(|&&id| collector.arena[id as usize].name == "a").unwrap();
        let b = *collector.syms.values().find(|&&id| collector.arena[id as usize].name == "b").unwrap();

        assert_eq!(collector.stable_key(a), collector.stable_key(a));
        assert_ne!(collector.stable_key(a), collector.stable_key(b));
    }
}
