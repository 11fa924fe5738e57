//! IPC collection phase (§4.3.3): drives an `IpcSymbolSource` end to end.
//!
//! Unlike the LSP- and tree-sitter-driven sources, which share the uniform
//! `SymbolSource` trait object and go through `Collector::collect`'s
//! Phases A-D, the IPC cache already carries FQCN-to-FQCN relations
//! (extends/implements, field/parameter/return types, resolved method
//! calls) instead of a token stream to walk go-to-definition over. This
//! phase wires those relations straight into `deps`, `funcs`, and `vars`
//! rather than reusing Phase D's token-based resolution. It runs through
//! its own entry point, generic over the concrete `IpcParser`, since
//! `IpcSymbolSource`'s own `load_file`/`definition` are unreachable stubs
//! (see `source/ipc.rs`).

use super::{Collector, FileRecord};
use crate::location::Location;
use crate::source::ipc::{IpcConverter, IpcMethodInfo, IpcParser, IpcSymbolSource};
use crate::types::{Dependency, DocumentSymbol, FunctionInfo, OrderedDeps, SymbolId, SymbolKind, SymbolOrigin, SymbolRole, VarInfo};
use std::collections::HashMap;
use tracing::{debug, warn};

impl Collector {
    /// Fetches the `IpcConverter`, inserts one `DocumentSymbol` per local
    /// class/method/field, then wires extends/implements/field-type/
    /// parameter-type/return-type/call edges directly from the FQCN
    /// relations the cache already resolved. Runs in two passes so
    /// forward references (a class extending one declared later in
    /// iteration order) resolve correctly: pass one creates every local
    /// symbol, pass two wires edges once all ids exist.
    pub fn collect_via_ipc<P: IpcParser>(&mut self, source: &mut IpcSymbolSource<P>) -> crate::errors::Result<()> {
        let converter = source.converter(&self.root, &self.opt)?;
        debug!(classes = converter.local.len(), "ipc cache loaded");

        let mut class_ids: HashMap<String, SymbolId> = HashMap::new();
        let mut method_ids: HashMap<(String, String), SymbolId> = HashMap::new();
        let mut field_ids: HashMap<(String, String), SymbolId> = HashMap::new();

        for class in converter.local.values() {
            let class_id =
                self.insert_ipc_symbol(class.fqcn.clone(), SymbolKind::Class, class.location.clone(), class.fqcn.clone());
            self.register_ipc_file(&class.location);
            class_ids.insert(class.fqcn.clone(), class_id);

            for field in &class.fields {
                let field_id =
                    self.insert_ipc_symbol(field.name.clone(), SymbolKind::Variable, field.location.clone(), field.name.clone());
                field_ids.insert((class.fqcn.clone(), field.name.clone()), field_id);
            }
            for method in &class.methods {
                let method_id =
                    self.insert_ipc_symbol(method.name.clone(), SymbolKind::Method, method.location.clone(), method.name.clone());
                self.funcs.insert(
                    method_id,
                    FunctionInfo { receiver: Some(class_id), signature: reconstruct_signature(method), ..Default::default() },
                );
                method_ids.insert((class.fqcn.clone(), method.name.clone()), method_id);
            }
        }

        let mut stub_ids: HashMap<String, SymbolId> = HashMap::new();
        for class in converter.local.values() {
            let class_id = class_ids[&class.fqcn];

            if let Some(extends) = &class.extends {
                match self.resolve_fqcn(&converter, extends, &class_ids, &mut stub_ids, SymbolKind::Class) {
                    Some(target) => {
                        self.record_dependency(class_id, target, class.location.clone());
                    }
                    None => warn!(class = %class.fqcn, extends = %extends, "ipc extends target unresolvable, dropping edge"),
                }
            }
            for iface in &class.implements {
                match self.resolve_fqcn(&converter, iface, &class_ids, &mut stub_ids, SymbolKind::Interface) {
                    Some(target) => {
                        // §8 scenario 3: the implemented type gains kind=interface.
                        self.arena[target as usize].kind = SymbolKind::Interface;
                        self.record_dependency(class_id, target, class.location.clone());
                    }
                    None => warn!(class = %class.fqcn, iface = %iface, "ipc implements target unresolvable, dropping edge"),
                }
            }

            for field in &class.fields {
                let field_id = field_ids[&(class.fqcn.clone(), field.name.clone())];
                match self.resolve_fqcn(&converter, &field.type_fqcn, &class_ids, &mut stub_ids, SymbolKind::Class) {
                    Some(target) => {
                        self.vars.insert(field_id, VarInfo { type_dep: Some(Dependency { location: field.location.clone(), target }) });
                        self.record_dependency(field_id, target, field.location.clone());
                    }
                    None => {
                        self.vars.insert(field_id, VarInfo { type_dep: None });
                        warn!(field = %field.name, ty = %field.type_fqcn, "ipc field type unresolvable, dropping edge");
                    }
                }
            }

            for method in &class.methods {
                let method_id = method_ids[&(class.fqcn.clone(), method.name.clone())];
                self.wire_ipc_method_signature(&converter, method, method_id, &class_ids, &mut stub_ids);

                for call in &method.calls {
                    let Some((callee_class, callee_method)) = call.rsplit_once('.') else {
                        warn!(call = %call, "malformed ipc call reference, dropping edge");
                        continue;
                    };
                    match self.resolve_method_call(&converter, callee_class, callee_method, &class_ids, &method_ids, &mut stub_ids) {
                        Some(target) => {
                            self.record_dependency(method_id, target, method.location.clone());
                        }
                        None => warn!(call = %call, "ipc callee class unresolvable, dropping edge"),
                    }
                }
            }
        }

        Ok(())
    }

    fn wire_ipc_method_signature(
        &mut self,
        converter: &IpcConverter,
        method: &IpcMethodInfo,
        method_id: SymbolId,
        class_ids: &HashMap<String, SymbolId>,
        stub_ids: &mut HashMap<String, SymbolId>,
    ) {
        let mut inputs = OrderedDeps::default();
        for (idx, (_, ty)) in method.params.iter().enumerate() {
            if let Some(target) = self.resolve_fqcn(converter, ty, class_ids, stub_ids, SymbolKind::Class) {
                inputs.insert(idx, Dependency { location: method.location.clone(), target });
            }
        }
        let mut outputs = OrderedDeps::default();
        if let Some(ret) = &method.return_type {
            if let Some(target) = self.resolve_fqcn(converter, ret, class_ids, stub_ids, SymbolKind::Class) {
                outputs.insert(0, Dependency { location: method.location.clone(), target });
            }
        }
        if let Some(info) = self.funcs.get_mut(&method_id) {
            info.inputs = inputs;
            info.outputs = outputs;
        }
    }

    fn insert_ipc_symbol(&mut self, name: String, kind: SymbolKind, location: Location, text: String) -> SymbolId {
        let id = self.arena.len() as SymbolId;
        self.arena.push(DocumentSymbol {
            name,
            kind,
            location: location.clone(),
            text,
            tokens: Vec::new(),
            children: Vec::new(),
            role: SymbolRole::Definition,
            origin: SymbolOrigin::Local,
        });
        if let Some(&existing) = self.syms.get(&location) {
            warn!(location = ?location, existing, "duplicate ipc symbol location, keeping first (I1)");
        } else {
            self.syms.insert(location, id);
        }
        id
    }

    fn register_ipc_file(&mut self, location: &Location) {
        if let Ok(path) = location.uri.to_file_path() {
            self.files.entry(path).or_insert_with(|| FileRecord { imports: Vec::new(), top_level: Vec::new() });
        }
    }

    /// Resolves `fqcn` against the converter's four buckets. A local FQCN
    /// returns the already-inserted class symbol; `jdk`/`third_party`/
    /// `unknown` FQCNs get a lazily-created, `syms`-exempt stub
    /// (`SymbolOrigin::ExternalStub`) at that class's own cached location,
    /// cached by FQCN so repeated references share one symbol. An FQCN
    /// absent from every bucket resolves to `None` (dropped per "IPC
    /// callee class unresolvable").
    fn resolve_fqcn(
        &mut self,
        converter: &IpcConverter,
        fqcn: &str,
        class_ids: &HashMap<String, SymbolId>,
        stub_ids: &mut HashMap<String, SymbolId>,
        default_kind: SymbolKind,
    ) -> Option<SymbolId> {
        if let Some(&id) = class_ids.get(fqcn) {
            return Some(id);
        }
        if let Some(&id) = stub_ids.get(fqcn) {
            return Some(id);
        }
        let info = converter.lookup(fqcn)?;
        let id = self.arena.len() as SymbolId;
        self.arena.push(DocumentSymbol {
            name: fqcn.to_string(),
            kind: default_kind,
            location: info.location.clone(),
            text: fqcn.to_string(),
            tokens: Vec::new(),
            children: Vec::new(),
            role: SymbolRole::Reference,
            origin: SymbolOrigin::ExternalStub,
        });
        stub_ids.insert(fqcn.to_string(), id);
        Some(id)
    }

    /// Resolves a `"FQCN.method"` call reference (§4.3.3): the owning
    /// class must be known to some bucket or the edge is dropped; the
    /// method resolves to the already-inserted local method symbol when
    /// the owning class is local, or to a lazily-created zero-width stub
    /// at the owning class's location otherwise — the "lightweight
    /// reference symbol" the component design calls for, keyed by
    /// `(class, method)` so repeated calls to the same external method
    /// share one stub.
    fn resolve_method_call(
        &mut self,
        converter: &IpcConverter,
        callee_class: &str,
        callee_method: &str,
        class_ids: &HashMap<String, SymbolId>,
        method_ids: &HashMap<(String, String), SymbolId>,
        stub_ids: &mut HashMap<String, SymbolId>,
    ) -> Option<SymbolId> {
        if let Some(&id) = method_ids.get(&(callee_class.to_string(), callee_method.to_string())) {
            return Some(id);
        }
        let stub_key = format!("{callee_class}.{callee_method}");
        if let Some(&id) = stub_ids.get(&stub_key) {
            return Some(id);
        }
        let class_info = converter.lookup(callee_class)?;
        let id = self.arena.len() as SymbolId;
        self.arena.push(DocumentSymbol {
            name: callee_method.to_string(),
            kind: SymbolKind::Method,
            location: Location::zero_width(class_info.location.uri.clone(), class_info.location.range.start),
            text: callee_method.to_string(),
            tokens: Vec::new(),
            children: Vec::new(),
            role: SymbolRole::Reference,
            origin: SymbolOrigin::ExternalStub,
        });
        self.funcs.insert(id, FunctionInfo { receiver: class_ids.get(callee_class).copied(), ..Default::default() });
        stub_ids.insert(stub_key, id);
        Some(id)
    }
}

/// Reconstructs a method signature to `name(T1, T2, …)` from declared
/// parameter types (§4.3.2's bridging form, reused here since the IPC
/// cache carries the same declared-type strings tree-sitter would parse
/// from a signature). The cache carries no varargs flag, so `...` is
/// never emitted here (tree-sitter sources are the only ones that do).
fn reconstruct_signature(method: &IpcMethodInfo) -> String {
    let params: Vec<String> = method.params.iter().map(|(_, ty)| ty.clone()).collect();
    format!("{}({})", method.name, params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::config::{CollectOption, Language};
    use crate::errors::Result;
    use crate::location::Range;
    use crate::source::ipc::{IpcClassInfo, IpcFieldInfo, IpcSymbolSource};
    use lsp_types::{Position, Url};
    use std::path::Path;

    fn loc(uri: &Url, line: u32) -> Location {
        Location::new(uri.clone(), Range::new(Position { line, character: 0 }, Position { line: line + 1, character: 0 }))
    }

    struct FixtureParser {
        converter: IpcConverter,
    }

    impl IpcParser for FixtureParser {
        fn parse_repository_by_ipc(&mut self, _root: &Path, _opt: &CollectOption) -> Result<IpcConverter> {
            Ok(self.converter.clone())
        }
    }

    /// §8 scenario 3: `class S extends B implements I` via an IPC cache.
    #[test]
    fn java_extends_implements_resolve_through_ipc_cache() {
        let uri = Url::parse("file:///repo/S.java").unwrap();
        let mut converter = IpcConverter::default();
        converter.local.insert(
            "S".into(),
            IpcClassInfo {
                fqcn: "S".into(),
                file: "S.java".into(),
                fields: vec![],
                methods: vec![],
                extends: Some("B".into()),
                implements: vec!["I".into()],
                location: loc(&uri, 0),
            },
        );
        converter.local.insert(
            "B".into(),
            IpcClassInfo {
                fqcn: "B".into(),
                file: "S.java".into(),
                fields: vec![],
                methods: vec![],
                extends: None,
                implements: vec![],
                location: loc(&uri, 10),
            },
        );
        converter.local.insert(
            "I".into(),
            IpcClassInfo {
                fqcn: "I".into(),
                file: "S.java".into(),
                fields: vec![],
                methods: vec![],
                extends: None,
                implements: vec![],
                location: loc(&uri, 20),
            },
        );

        let opt = CollectOption::new(Language::Java);
        let mut collector = Collector::new("/repo", opt);
        let mut source = IpcSymbolSource::new(FixtureParser { converter });
        collector.collect_via_ipc(&mut source).unwrap();

        let s_id = collector.syms.values().copied().find(|&id| collector.arena[id as usize].name == "S").unwrap();
        let i_id = collector.syms.values().copied().find(|&id| collector.arena[id as usize].name == "I").unwrap();
        let b_id = collector.syms.values().copied().find(|&id| collector.arena[id as usize].name == "B").unwrap();

        assert_eq!(collector.arena[i_id as usize].kind, SymbolKind::Interface);
        let s_deps = collector.deps.get(&s_id).cloned().unwrap_or_default();
        let targets: Vec<SymbolId> = s_deps.iter().map(|d| d.target).collect();
        assert!(targets.contains(&i_id));
        assert!(targets.contains(&b_id));
    }

    #[test]
    fn unresolved_field_type_drops_edge_but_keeps_field() {
        let uri = Url::parse("file:///repo/C.java").unwrap();
        let mut converter = IpcConverter::default();
        converter.local.insert(
            "C".into(),
            IpcClassInfo {
                fqcn: "C".into(),
                file: "C.java".into(),
                fields: vec![IpcFieldInfo { name: "x".into(), type_fqcn: "totally.Unknown".into(), location: loc(&uri, 1) }],
                methods: vec![],
                extends: None,
                implements: vec![],
                location: loc(&uri, 0),
            },
        );

        let opt = CollectOption::new(Language::Java);
        let mut collector = Collector::new("/repo", opt);
        let mut source = IpcSymbolSource::new(FixtureParser { converter });
        collector.collect_via_ipc(&mut source).unwrap();

        let x_id = collector.syms.values().copied().find(|&id| collector.arena[id as usize].name == "x").unwrap();
        assert!(collector.vars.get(&x_id).unwrap().type_dep.is_none());
    }
}
