//! Phase D — dependency collection, plus the shared `getSymbolByToken` /
//! `getSymbolByLocation` resolution machinery processSymbol (Phase C) also
//! relies on.

use super::Collector;
use crate::location::Location;
use crate::source::SymbolSource;
use crate::types::{DepClass, Dependency, SymbolId, SymbolKind, SymbolOrigin, Token, TokenKind};
use std::collections::HashSet;
use tracing::warn;

impl Collector {
    /// For each entity symbol, iterate its tokens in order and resolve
    /// outgoing references, classifying and deduplicating per I5.
    pub(crate) fn phase_d_dependencies(&mut self, source: &mut dyn SymbolSource) {
        let entities: Vec<SymbolId> = self.syms.values().copied().collect();
        for s in entities {
            self.collect_dependencies_for(source, s);
        }
    }

    fn collect_dependencies_for(&mut self, source: &mut dyn SymbolSource, s: SymbolId) {
        if !self.arena[s as usize].is_entity() {
            return;
        }
        let own_indices = self.own_signature_token_indices(s);
        let tokens = self.arena[s as usize].tokens.clone();

        for (i, tok) in tokens.iter().enumerate() {
            if !self.spec.is_entity_token(tok) {
                continue;
            }
            if own_indices.contains(&i) {
                continue;
            }
            let Some(target) = self.get_symbol_by_token(source, tok) else {
                continue; // definition not found: report token, skip edge
            };
            self.record_dependency(s, target, tok.location.clone());
        }
    }

    /// Shared dependency-recording helper used by Phase D's token walk and
    /// by the IPC collection phase's direct FQCN wiring (`collector::ipc`):
    /// classifies `target`'s kind and appends `(location, target)` to
    /// `deps[from]` unless an edge of the same class already points at
    /// `target` (I5). Returns `false` when the kind isn't classifiable (dep
    /// dropped) or the edge was already present.
    pub(crate) fn record_dependency(&mut self, from: SymbolId, target: SymbolId, location: Location) -> bool {
        let Some(class) = DepClass::classify(self.arena[target as usize].kind) else {
            return false; // dep kind not classifiable: log + drop
        };
        let existing = self.deps.entry(from).or_default();
        let already_present = existing
            .iter()
            .any(|d| d.target == target && DepClass::classify(self.arena[d.target as usize].kind) == Some(class));
        if already_present {
            return false; // I5: already have this (class, target) pair for this caller
        }
        existing.push(Dependency { location, target });
        true
    }

    /// Token indices already accounted for by `s`'s own signature
    /// (receiver, inputs, outputs, type-params for callables; the type
    /// token for var/const), so Phase D does not double-count them as
    /// outgoing dependency edges.
    fn own_signature_token_indices(&self, s: SymbolId) -> HashSet<usize> {
        let mut set = HashSet::new();
        if let Some(info) = self.funcs.get(&s) {
            set.extend(info.type_params.order.iter().copied());
            set.extend(info.inputs.order.iter().copied());
            set.extend(info.outputs.order.iter().copied());
        }
        let sym = &self.arena[s as usize];
        if matches!(sym.kind, SymbolKind::Variable | SymbolKind::Constant) {
            if let Some(declare_idx) = self.spec.declare_token_of_symbol(sym) {
                let found = sym.tokens[declare_idx..]
                    .iter()
                    .position(|t| self.spec.is_entity_token(t) && matches!(t.kind, TokenKind::TypeIdentifier));
                if let Some(pos) = found {
                    set.insert(declare_idx + pos);
                }
            }
        }
        // The symbol's own name, at its first (declaring) occurrence, is not
        // a reference to anything — without this, `struct Dog` would walk
        // `Dog`'s own entity token, resolve it back to itself by name, and
        // record a self-referencing Types dependency. Later occurrences
        // (e.g. a recursive `next: Option<Box<Dog>>` field) are left alone.
        if !sym.name.is_empty() {
            if let Some(own_idx) = sym.tokens.iter().position(|t| t.text == sym.name && self.spec.is_entity_token(t)) {
                set.insert(own_idx);
            }
        }
        set
    }

    /// `getSymbolByToken(t)`: request `definition(t.location)`. Zero
    /// results -> report and skip (`None`); more than one -> warn and use
    /// the first.
    pub(crate) fn get_symbol_by_token(&mut self, source: &mut dyn SymbolSource, tok: &Token) -> Option<SymbolId> {
        let locs = match source.definition(&tok.location) {
            Ok(locs) => locs,
            Err(e) => {
                warn!(token = %tok.text, error = %e, "definition request failed");
                Vec::new()
            }
        };

        if locs.is_empty() {
            // Tree-sitter sources with no attached LSP resolve by name
            // within their own index instead (§4.3.2: "through name-based
            // lookup within the Tree-sitter index").
            if let Some(loc) = self.resolve_by_name_fallback(source, &tok.text) {
                return self.get_symbol_by_location(source, &loc, 0, tok);
            }
            warn!(token = %tok.text, location = ?tok.location, "definition not found, dropping edge");
            return None;
        }
        if locs.len() > 1 {
            warn!(token = %tok.text, count = locs.len(), "definition resolved to multiple locations, using first");
        }
        let def_loc = locs[0].clone();
        self.get_symbol_by_location(source, &def_loc, 0, tok)
    }

    /// Placeholder name-based fallback hook for sources (like
    /// `TreeSitterSource`) that index symbols by name when no LSP is
    /// attached. The generic `SymbolSource` trait has no such method since
    /// it is source-specific; callers that want it downcast. Returning
    /// `None` here simply means "no fallback available", matching the
    /// "definition not found" policy.
    fn resolve_by_name_fallback(&self, _source: &dyn SymbolSource, name: &str) -> Option<Location> {
        self.syms
            .iter()
            .find(|(_, &id)| self.arena[id as usize].name == name)
            .map(|(loc, _)| loc.clone())
    }

    /// `getSymbolByLocation(defLoc, depth, fromToken)`.
    pub(crate) fn get_symbol_by_location(
        &mut self,
        source: &mut dyn SymbolSource,
        def_loc: &Location,
        depth: u32,
        from_token: &Token,
    ) -> Option<SymbolId> {
        if let Some(id) = self.most_specific_containing(def_loc) {
            return Some(id);
        }

        const MAX_EXTERNAL_DEPTH: u32 = 4;
        if self.opt.load_external_symbol
            && depth < MAX_EXTERNAL_DEPTH
            && self.is_outside_repo(def_loc)
            && !self.spec.is_std_token(from_token)
        {
            if let Some(id) = self.load_external_symbol(source, def_loc, depth) {
                return Some(id);
            }
        }

        Some(self.synthesize_unknown(def_loc, from_token))
    }

    /// Returns the smallest `syms` entry (by containment) that includes
    /// `def_loc`, or the exact match if `def_loc` equals a `syms` key.
    /// Ties where neither candidate contains the other are structural
    /// breakage and are logged rather than silently picked.
    fn most_specific_containing(&self, def_loc: &Location) -> Option<SymbolId> {
        let mut best: Option<(&Location, SymbolId)> = None;
        for (loc, &id) in &self.syms {
            if loc == def_loc || loc.includes(def_loc) {
                best = Some(match best {
                    None => (loc, id),
                    Some((b_loc, b_id)) => {
                        if b_loc.includes(loc) && loc != b_loc {
                            (loc, id)
                        } else if loc.includes(b_loc) && loc != b_loc {
                            (b_loc, b_id)
                        } else {
                            if loc != b_loc {
                                warn!(a = ?loc, b = ?b_loc, "ambiguous containment tie resolving definition");
                            }
                            (b_loc, b_id)
                        }
                    }
                });
            }
        }
        best.map(|(_, id)| id)
    }

    fn is_outside_repo(&self, loc: &Location) -> bool {
        match loc.uri.to_file_path() {
            Ok(path) => !path.starts_with(&self.root),
            Err(_) => true,
        }
    }

    /// Fetches document-symbols of the external file, inserts them into
    /// the arena with `SymbolOrigin::ExternalLoaded`, recursively processes
    /// those whose kind needs it, then returns the best match.
    fn load_external_symbol(&mut self, source: &mut dyn SymbolSource, def_loc: &Location, depth: u32) -> Option<SymbolId> {
        let path = def_loc.uri.to_file_path().ok()?;
        let file_symbols = source.load_file(&path, self.spec.as_ref()).ok()?;
        let mut roots = file_symbols.roots;
        mark_origin(&mut roots, SymbolOrigin::ExternalLoaded);
        let ids = self.insert_tree(roots);

        for id in &ids {
            let kind = self.arena[*id as usize].kind;
            let needs_processing = matches!(kind, SymbolKind::Object) || kind.is_callable();
            if needs_processing && self.spec.has_impl_symbol() && kind == SymbolKind::Object {
                self.collect_impl(source, *id);
            }
        }

        self.most_specific_containing(def_loc).or_else(|| {
            let _ = depth;
            None
        })
    }

    /// Synthesizes a placeholder `Unknown` symbol at `def_loc`: either the
    /// raw source range (when the file can be read) or an empty stand-in.
    /// Never inserted into `syms` (P1-b). Per the Exporter's "refName"
    /// fallback (§4.4.3 step 2), the placeholder's `name` is seeded from
    /// the referencing token's own text rather than left empty, so the
    /// Exporter never needs a second code path for this case.
    fn synthesize_unknown(&mut self, def_loc: &Location, from_token: &Token) -> SymbolId {
        let text = def_loc
            .uri
            .to_file_path()
            .ok()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .map(|content| {
                let idx = crate::location::LineIndex::new(&content);
                let start = idx.byte_at_position(&content, def_loc.range.start);
                let end = idx.byte_at_position(&content, def_loc.range.end).max(start);
                content.get(start..end).unwrap_or_default().to_string()
            })
            .unwrap_or_default();

        let id = self.arena.len() as SymbolId;
        self.arena.push(crate::types::DocumentSymbol {
            name: from_token.text.clone(),
            kind: SymbolKind::Unknown,
            location: def_loc.clone(),
            text,
            tokens: Vec::new(),
            children: Vec::new(),
            role: crate::types::SymbolRole::Reference,
            origin: SymbolOrigin::SynthesizedUnknown,
        });
        id
    }
}

fn mark_origin(nodes: &mut [crate::source::SymbolNode], origin: SymbolOrigin) {
    for n in nodes {
        n.origin = origin;
        mark_origin(&mut n.children, origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::config::{CollectOption, Language};
    use crate::source::TreeSitterSource;
    use std::io::Write;

    #[test]
    fn local_shadowing_leaves_global_vars_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"d\"\nversion=\"0.1.0\"\n").unwrap();
        let mut f = std::fs::File::create(dir.path().join("src/lib.rs")).unwrap();
        writeln!(f, "fn outer() {{ let inner = 1; inner + 2; }}").unwrap();

        let opt = CollectOption::new(Language::Rust);
        let mut collector = Collector::new(dir.path(), opt);
        let mut source = TreeSitterSource::new(Language::Rust);
        collector.collect(&mut source).unwrap();

        let outer_id = collector
            .syms
            .values()
            .copied()
            .find(|&id| collector.arena[id as usize].name == "outer")
            .expect("outer function collected");
        let global_vars: Vec<_> = collector
            .deps
            .get(&outer_id)
            .into_iter()
            .flatten()
            .filter(|d| matches!(collector.arena[d.target as usize].kind, SymbolKind::Variable | SymbolKind::Constant))
            .collect();
        assert!(global_vars.is_empty());
    }
}
