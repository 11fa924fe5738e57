//! IPC-cache-driven Symbol Source (§4.3.3). Consumes a previously computed
//! parser cache instead of parsing source itself; the Collector walks the
//! cache in module -> file -> class order rather than the filesystem-walk
//! order Phase A otherwise uses, so this source exposes a dedicated
//! [`IpcSymbolSource::converter`] entry point in addition to the uniform
//! [`SymbolSource`] trait (whose `load_file`/`definition` methods are
//! unreachable in this mode and return `InvalidState`).
//!
//! A key detail carried over faithfully: external or unresolvable callee
//! methods become lightweight reference symbols at a zero-width range at
//! the callee class's start (`SymbolOrigin::ExternalStub`). These are
//! never inserted into `syms` (the authoritative definition table) but are
//! still linked from `deps` — see `SymbolOrigin` in `types.rs`. This
//! preserves I1 and I3 without special-casing lookups.

use super::{FileSymbols, SymbolSource};
use crate::config::CollectOption;
use crate::errors::{Error, Result};
use crate::location::Location;
use crate::spec::LanguageSpec;
use indexmap::IndexMap;
use std::path::Path;

/// One field of a cached class: `(name, declared type FQCN)`.
#[derive(Debug, Clone)]
pub struct IpcFieldInfo {
    pub name: String,
    pub type_fqcn: String,
    pub location: Location,
}

/// One method of a cached class.
#[derive(Debug, Clone)]
pub struct IpcMethodInfo {
    pub name: String,
    /// `(param name, declared type FQCN)`, in declaration order.
    pub params: Vec<(String, String)>,
    pub return_type: Option<String>,
    /// FQCN.method of each statically resolvable call site, in source order.
    pub calls: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct IpcClassInfo {
    pub fqcn: String,
    pub file: String,
    pub fields: Vec<IpcFieldInfo>,
    pub methods: Vec<IpcMethodInfo>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub location: Location,
}

/// The four FQCN-keyed maps the external IPC parser produces.
#[derive(Debug, Clone, Default)]
pub struct IpcConverter {
    pub local: IndexMap<String, IpcClassInfo>,
    pub jdk: IndexMap<String, IpcClassInfo>,
    pub third_party: IndexMap<String, IpcClassInfo>,
    pub unknown: IndexMap<String, IpcClassInfo>,
}

impl IpcConverter {
    pub fn lookup(&self, fqcn: &str) -> Option<&IpcClassInfo> {
        self.local
            .get(fqcn)
            .or_else(|| self.jdk.get(fqcn))
            .or_else(|| self.third_party.get(fqcn))
            .or_else(|| self.unknown.get(fqcn))
    }

    pub fn is_local(&self, fqcn: &str) -> bool {
        self.local.contains_key(fqcn)
    }
}

/// External out-of-process parser contract (§6): `ParseRepositoryByIpc(root,
/// config) -> Converter`.
pub trait IpcParser {
    fn parse_repository_by_ipc(&mut self, root: &Path, opt: &CollectOption) -> Result<IpcConverter>;
}

pub struct IpcSymbolSource<P: IpcParser> {
    parser: P,
}

impl<P: IpcParser> IpcSymbolSource<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Runs the external parser and hands back the four FQCN-keyed buckets
    /// directly. `Collector::collect_via_ipc` (`collector/ipc.rs`) wires
    /// local classes/methods/fields into the arena and resolves
    /// `extends`/`implements`/field/parameter/return-type/call edges
    /// against it in two passes; this source only runs the parser.
    pub fn converter(&mut self, root: &Path, opt: &CollectOption) -> Result<IpcConverter> {
        self.parser.parse_repository_by_ipc(root, opt)
    }
}

impl<P: IpcParser> SymbolSource for IpcSymbolSource<P> {
    fn load_file(&mut self, _abs_path: &Path, _spec: &dyn LanguageSpec) -> Result<FileSymbols> {
        Err(Error::InvalidState("ipc source is driven via converter(), not per-file load_file"))
    }

    fn definition(&mut self, _location: &Location) -> Result<Vec<Location>> {
        Err(Error::InvalidState("ipc source resolves definitions via its own FQCN index, not by location"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Range;
    use lsp_types::{Position, Url};

    fn loc() -> Location {
        Location::new(
            Url::parse("file:///S.java").unwrap(),
            Range::new(Position { line: 0, character: 0 }, Position { line: 1, character: 0 }),
        )
    }

    #[test]
    fn converter_lookup_falls_through_bucket_priority() {
        let mut conv = IpcConverter::default();
        conv.jdk.insert("java.lang.Object".into(), IpcClassInfo {
            fqcn: "java.lang.Object".into(),
            file: "Object.java".into(),
            fields: vec![],
            methods: vec![],
            extends: None,
            implements: vec![],
            location: loc(),
        });
        assert!(conv.lookup("java.lang.Object").is_some());
        assert!(!conv.is_local("java.lang.Object"));
    }
}
