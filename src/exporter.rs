//! Exporter (C5): walks `syms` and emits the public `Repository` —
//! `modules -> packages -> functions/types/vars/files`.
//!
//! Identity construction, method-name decoration (P6), package assembly,
//! and the `ErrStdSymbol`/`ErrExternalSymbol` sentinel filters (§7) all
//! live here. Cyclic symbol graphs (a function referencing a type that
//! references the function back) are broken the way the Design Notes
//! describe: `visited` is populated with a symbol's `Identity` *before*
//! recursing into anything that symbol depends on, so re-entry during a
//! cycle returns the already-computed identity instead of looping.

use crate::collector::{Collector, FileRecord};
use crate::config::Language;
use crate::errors::{ExportResult, ExportSentinel, Result};
use crate::location::Location;
use crate::model::{
    decorate_method_name, File as ModelFile, Function, Identity, Module, Package, Repository,
    Type, TypeKind, Var,
};
use crate::spec::LanguageSpec;
use crate::types::{DepClass, DocumentSymbol, OrderedDeps, SymbolId, SymbolKind};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Standard-library package-path sentinels each `LanguageSpec::namespace`
/// implementation returns alongside an empty module name (§4.2: "standard
/// library: modName = "" with a conventional sentinel pkg").
const STD_PKG_SENTINELS: &[&str] = &["std", "stdlib", "lib", "jdk"];

pub struct Exporter {
    spec: Box<dyn LanguageSpec>,
    opt: crate::config::CollectOption,
    root: PathBuf,
    arena: Vec<DocumentSymbol>,
    files: IndexMap<PathBuf, FileRecord>,
    syms: IndexMap<Location, SymbolId>,
    funcs: IndexMap<SymbolId, crate::types::FunctionInfo>,
    vars: IndexMap<SymbolId, crate::types::VarInfo>,
    deps: IndexMap<SymbolId, Vec<crate::types::Dependency>>,
    workspace: IndexMap<String, PathBuf>,
    visited: IndexMap<SymbolId, Identity>,
    modules: IndexMap<String, Module>,
}

impl Exporter {
    /// Consumes a `Collector` that has already run `collect`. Re-derives
    /// `workspace()` once up front (cheap: a directory walk for manifests)
    /// so module assignment doesn't need to re-run language detection per
    /// symbol.
    pub fn new(collector: Collector) -> Result<Self> {
        let root = collector.root().to_path_buf();
        let workspace = crate::spec::for_language(collector.option().language).workspace(&root)?;
        let (spec, opt, root, arena, files, syms, funcs, vars, deps) = collector.into_parts();
        Ok(Self {
            spec,
            opt,
            root,
            arena,
            files,
            syms,
            funcs,
            vars,
            deps,
            workspace,
            visited: IndexMap::new(),
            modules: IndexMap::new(),
        })
    }

    /// Runs the full export pass, consuming `self`.
    pub fn export(mut self) -> Repository {
        for (name, dir) in self.workspace.clone() {
            self.modules.entry(name.clone()).or_insert_with(|| Module {
                name: name.clone(),
                directory: dir.display().to_string(),
                language: self.opt.language.as_str().to_string(),
                packages: IndexMap::new(),
                files: IndexMap::new(),
                dependencies: read_dependencies(self.opt.language, &dir),
            });
        }

        let ids: Vec<SymbolId> = self.syms.values().copied().collect();
        for id in ids {
            if let Err(sentinel) = self.export_symbol(id) {
                debug!(?sentinel, symbol = id, "symbol filtered by export policy");
            }
        }

        self.export_files();

        Repository { path: self.root.display().to_string(), modules: self.modules }
    }

    /// `namespace(absPath)` plus the §7 sentinel checks, folded into one
    /// call so every caller gets the same internal/std/external handling.
    /// Returns `(modPath, pkgPath)` for anything the active `CollectOption`
    /// allows through.
    fn classify_path(&self, abs_path: &Path) -> ExportResult<(String, String)> {
        let (ns_mod, pkg) = self.spec.namespace(abs_path);
        if ns_mod.starts_with('@') {
            if !self.opt.load_external_symbol {
                return Err(ExportSentinel::ErrExternalSymbol);
            }
            return Ok((ns_mod, pkg));
        }
        if ns_mod.is_empty() && STD_PKG_SENTINELS.contains(&pkg.as_str()) {
            if !self.opt.need_std_symbol {
                return Err(ExportSentinel::ErrStdSymbol);
            }
            return Ok((String::new(), pkg));
        }
        Ok((self.module_for_path(abs_path), pkg))
    }

    /// Resolves which workspace module `abs_path` belongs to by longest
    /// matching directory prefix (a nested crate's `Cargo.toml` should win
    /// over its workspace root's).
    fn module_for_path(&self, abs_path: &Path) -> String {
        self.workspace
            .iter()
            .filter(|(_, dir)| abs_path.starts_with(dir.as_path()))
            .max_by_key(|(_, dir)| dir.as_os_str().len())
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }

    /// `exportSymbol` (§4.4.3). Memoized by `SymbolId` to guarantee cyclic
    /// exports converge (Design Notes).
    fn export_symbol(&mut self, s: SymbolId) -> ExportResult<Identity> {
        if let Some(identity) = self.visited.get(&s) {
            return Ok(identity.clone());
        }

        let sym = self.arena[s as usize].clone();

        // Synthesized `Unknown` placeholders and IPC callee stubs never
        // belong to a real workspace module; give them a stable, clearly
        // marked identity instead of running them through `namespace`.
        if sym.kind == SymbolKind::Unknown {
            let name = if sym.name.is_empty() { sym.text.lines().next().unwrap_or_default().to_string() } else { sym.name.clone() };
            let identity = Identity::new("", "?unresolved", name);
            self.visited.insert(s, identity.clone());
            return Ok(identity);
        }

        let abs_path = sym.location.uri.to_file_path().unwrap_or_default();
        let (module, pkg) = self.classify_path(&abs_path)?;
        let name = if sym.name.is_empty() {
            sym.text.lines().next().unwrap_or_default().to_string()
        } else {
            sym.name.clone()
        };

        // Insert the undecorated identity before recursing so a cycle
        // reaching back to `s` sees *a* valid identity rather than looping.
        let base_identity = Identity::new(module.clone(), pkg.clone(), name.clone());
        self.visited.insert(s, base_identity.clone());

        let final_identity = if sym.kind.is_callable() {
            self.export_function(s, &module, &pkg, &name, &abs_path)
        } else if sym.kind.is_type_like() {
            self.export_type(s, &module, &pkg, &base_identity, &abs_path);
            base_identity
        } else if matches!(sym.kind, SymbolKind::Variable | SymbolKind::Constant) {
            self.export_var(s, &module, &pkg, &base_identity, &abs_path);
            base_identity
        } else {
            // `Object` (impl/class container) and `EnumMember`: identity
            // only, no standalone package entry.
            base_identity
        };

        self.visited.insert(s, final_identity.clone());
        Ok(final_identity)
    }

    /// Builds and files a `Function`, returning its (possibly
    /// method-decorated) `Identity`. Trait/interface method *declarations*
    /// (no body, parent kind `Interface`) are identified but not filed as
    /// a standalone package entry — they surface through the interface
    /// Type's `Methods` map instead (§4.4.3 step 4).
    fn export_function(&mut self, s: SymbolId, module: &str, pkg: &str, base_name: &str, abs_path: &Path) -> Identity {
        let info = self.funcs.get(&s).cloned().unwrap_or_default();

        let receiver_identity = info.receiver.and_then(|r| self.export_symbol(r).ok());
        let interface_identity = info.interface.and_then(|i| self.export_symbol(i).ok());
        let receiver_name = info.receiver.map(|r| self.arena[r as usize].name.clone());
        let interface_name = info.interface.map(|i| self.arena[i as usize].name.clone());
        let parent_is_interface =
            info.receiver.map(|r| self.arena[r as usize].kind == SymbolKind::Interface).unwrap_or(false);

        let decorated = decorate_method_name(base_name, receiver_name.as_deref(), interface_name.as_deref(), info.is_static);
        let identity = Identity::new(module, pkg, decorated.clone());

        let type_params = self.export_dep_list(&info.type_params);
        let params = self.export_dep_list(&info.inputs);
        let results = self.export_dep_list(&info.outputs);
        let (function_calls, method_calls, types, global_vars) = self.export_edges(s);

        let sym = self.arena[s as usize].clone();
        let function = Function {
            identity: identity.clone(),
            file_line: self.file_line(&sym.location),
            content: self.render_content(&sym, info.impl_head.as_deref()),
            signature: info.signature.clone(),
            exported: self.spec.is_public_symbol(&sym),
            is_method: receiver_identity.is_some(),
            is_interface_method: interface_identity.is_some(),
            receiver: receiver_identity,
            type_params,
            params,
            results,
            function_calls,
            method_calls,
            types,
            global_vars,
        };

        if !parent_is_interface {
            let is_main = self.spec.is_main_function(&sym);
            let package = self.package_mut(module, pkg, abs_path);
            if is_main {
                package.is_main = true;
            }
            package.functions.insert(decorated, function);
        }

        identity
    }

    fn export_type(&mut self, s: SymbolId, module: &str, pkg: &str, identity: &Identity, abs_path: &Path) {
        let sym = self.arena[s as usize].clone();
        let type_kind = match sym.kind {
            SymbolKind::Struct | SymbolKind::Class => TypeKind::Struct,
            SymbolKind::Interface => TypeKind::Interface,
            SymbolKind::Enum => TypeKind::Enum,
            SymbolKind::TypeParameter => TypeKind::TypeParameter,
            _ => TypeKind::Struct,
        };

        let (_, _, types_dep, _) = self.export_edges(s);
        // `type Name = { ... }` alias bodies reference types structurally
        // (the referenced type is part of *this* type's own inline shape)
        // rather than naming a contained/nested struct, so their Types-class
        // dependencies are reported as InlineStruct instead of SubStruct.
        let (sub_struct, inline_struct) =
            if is_inline_object_alias(&sym) { (Vec::new(), types_dep) } else { (types_dep, Vec::new()) };
        let methods = self.methods_for_receiver(s);
        let implements = self.implements_for_receiver(s);
        let exported = self.spec.is_public_symbol(&sym);

        let ty = Type {
            identity: identity.clone(),
            file_line: self.file_line(&sym.location),
            content: self.render_content(&sym, None),
            type_kind,
            exported,
            sub_struct,
            inline_struct,
            implements,
            methods,
        };
        self.package_mut(module, pkg, abs_path).types.insert(identity.name.clone(), ty);
    }

    fn export_var(&mut self, s: SymbolId, module: &str, pkg: &str, identity: &Identity, abs_path: &Path) {
        let sym = self.arena[s as usize].clone();
        let type_dep = self.vars.get(&s).and_then(|v| v.type_dep.clone());
        let type_identity = type_dep.as_ref().and_then(|d| self.export_symbol(d.target).ok());

        let (function_calls, method_calls, types, global_vars) = self.export_edges(s);
        let mut dependencies = Vec::new();
        dependencies.extend(function_calls);
        dependencies.extend(method_calls);
        dependencies.extend(types);
        dependencies.extend(global_vars);

        let exported = self.spec.is_public_symbol(&sym);
        let var = Var {
            identity: identity.clone(),
            file_line: self.file_line(&sym.location),
            content: self.render_content(&sym, None),
            is_exported: exported,
            is_const: sym.kind == SymbolKind::Constant,
            is_pointer: looks_like_pointer(&sym),
            type_dep: type_identity,
            dependencies,
        };
        self.package_mut(module, pkg, abs_path).vars.insert(identity.name.clone(), var);
    }

    /// Recursively exports every resolved dependency in `deps`, in
    /// declaration order, skipping any that the §7 sentinel filters drop
    /// (e.g. an unresolved built-in type with `NeedStdSymbol = false`).
    fn export_dep_list(&mut self, deps: &OrderedDeps) -> Vec<Identity> {
        let targets: Vec<SymbolId> = deps.iter().map(|d| d.target).collect();
        targets.into_iter().filter_map(|t| self.export_symbol(t).ok()).collect()
    }

    /// Classifies and exports `deps[s]` into the four edge buckets
    /// (FunctionCalls, MethodCalls, Types, GlobalVars), in insertion order.
    fn export_edges(&mut self, s: SymbolId) -> (Vec<Identity>, Vec<Identity>, Vec<Identity>, Vec<Identity>) {
        let deps = self.deps.get(&s).cloned().unwrap_or_default();
        let mut function_calls = Vec::new();
        let mut method_calls = Vec::new();
        let mut types = Vec::new();
        let mut global_vars = Vec::new();
        for dep in deps {
            let target_kind = self.arena[dep.target as usize].kind;
            let Some(class) = DepClass::classify(target_kind) else { continue };
            let Ok(identity) = self.export_symbol(dep.target) else { continue };
            match class {
                DepClass::FunctionCalls => function_calls.push(identity),
                DepClass::MethodCalls => method_calls.push(identity),
                DepClass::Types => types.push(identity),
                DepClass::GlobalVars => global_vars.push(identity),
            }
        }
        (function_calls, method_calls, types, global_vars)
    }

    /// `T.Methods` (P3): every collected function whose receiver resolves
    /// to `receiver`, keyed by its *unqualified* (undecorated) name.
    fn methods_for_receiver(&mut self, receiver: SymbolId) -> IndexMap<String, Identity> {
        let method_ids: Vec<(SymbolId, String)> = self
            .funcs
            .iter()
            .filter(|(_, info)| info.receiver == Some(receiver))
            .map(|(&id, _)| (id, self.arena[id as usize].name.clone()))
            .collect();

        let mut out = IndexMap::new();
        for (id, short_name) in method_ids {
            if let Ok(identity) = self.export_symbol(id) {
                out.insert(short_name, identity);
            }
        }
        out
    }

    /// Interfaces a type conforms to, derived from the methods attached to
    /// it: any interface named on one of its methods' `impl Trait for
    /// Type` relation counts as conformance (deduplicated).
    fn implements_for_receiver(&mut self, receiver: SymbolId) -> Vec<Identity> {
        let iface_ids: Vec<SymbolId> = self
            .funcs
            .iter()
            .filter(|(_, info)| info.receiver == Some(receiver))
            .filter_map(|(_, info)| info.interface)
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for iface in iface_ids {
            if seen.insert(iface) {
                if let Ok(identity) = self.export_symbol(iface) {
                    out.push(identity);
                }
            }
        }
        out
    }

    fn package_mut(&mut self, module: &str, pkg: &str, abs_path: &Path) -> &mut Package {
        if !self.modules.contains_key(module) {
            let dir = self.workspace.get(module).cloned().unwrap_or_default();
            self.modules.insert(module.to_string(), Module {
                name: module.to_string(),
                directory: dir.display().to_string(),
                language: self.opt.language.as_str().to_string(),
                packages: IndexMap::new(),
                files: IndexMap::new(),
                dependencies: read_dependencies(self.opt.language, &dir),
            });
        }
        let package = self
            .modules
            .get_mut(module)
            .expect("just inserted above")
            .packages
            .entry(pkg.to_string())
            .or_insert_with(|| Package::new(pkg.to_string()));
        if path_is_test(abs_path) {
            package.is_test = true;
        }
        package
    }

    /// Phase-independent pass that files every scanned file's `Import`
    /// list into its module even when the file contributed zero exported
    /// symbols.
    fn export_files(&mut self) {
        let files: Vec<(PathBuf, FileRecord)> = self.files.iter().map(|(p, r)| (p.clone(), r.clone())).collect();
        for (abs_path, record) in files {
            let Ok((module, pkg)) = self.classify_path(&abs_path) else { continue };
            let repo_rel = pathdiff::diff_paths(&abs_path, &self.root).unwrap_or_else(|| abs_path.clone());
            let rel_str = repo_rel.display().to_string();

            self.package_mut(&module, &pkg, &abs_path);
            let m = self.modules.get_mut(&module).expect("package_mut inserts the module");
            m.files.insert(rel_str.clone(), ModelFile { path: rel_str, package: pkg, imports: record.imports });
        }
    }

    fn file_line(&self, loc: &Location) -> String {
        let path = loc.uri.to_file_path().unwrap_or_default();
        let rel = pathdiff::diff_paths(&path, &self.root).unwrap_or(path);
        format!("{}:{}", rel.display(), loc.range.start.line + 1)
    }

    /// Splices `implHead` + body + closing brace to reconstitute
    /// impl-wrapped content (§4.4.3 step 4), then strips comments if
    /// `NoNeedComment` is set.
    fn render_content(&self, sym: &DocumentSymbol, impl_head: Option<&str>) -> String {
        let mut content = match impl_head {
            Some(head) if !head.is_empty() => format!("{head}{}\n}}", sym.text),
            _ => sym.text.clone(),
        };
        if self.opt.no_need_comment {
            content = strip_comments(self.opt.language, &content);
        }
        content
    }
}

/// True for a TypeScript `type Name = { ... }` alias whose body is an
/// inline object-type literal, as opposed to a union/alias of a named type
/// (`type Name = Other`). Both `class_declaration` and
/// `type_alias_declaration` map to `SymbolKind::Struct` (`source/treesitter.rs`),
/// so this keys on the `type ` keyword text itself rather than `sym.kind`.
fn is_inline_object_alias(sym: &DocumentSymbol) -> bool {
    let text = sym.text.trim_start();
    let rest = text.strip_prefix("export ").unwrap_or(text);
    let Some(after_type) = rest.strip_prefix("type ") else { return false };
    after_type.split_once('=').map(|(_, body)| body.trim_start().starts_with('{')).unwrap_or(false)
}

fn looks_like_pointer(sym: &DocumentSymbol) -> bool {
    let head = sym.text.lines().next().unwrap_or_default();
    head.contains('*') || head.contains("&mut ") || head.contains("Box<")
}

fn path_is_test(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.contains("/tests/")
        || s.contains("/test/")
        || s.ends_with("_test.rs")
        || s.ends_with("Test.java")
        || s.contains("test_")
        || s.ends_with(".test.ts")
        || s.ends_with(".spec.ts")
}

static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static SLASH_LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)//[^\n]*$").unwrap());
static PY_LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)(^|\s)#[^\n]*$"#).unwrap());

/// Best-effort, not syntax-aware: a `#` or `//` inside a string literal is
/// stripped along with a genuine comment. Acceptable for `NoNeedComment`,
/// whose contract is "strip doc-tokens from exported content" rather than
/// "produce source that still parses".
fn strip_comments(language: Language, text: &str) -> String {
    let without_block = BLOCK_COMMENT_RE.replace_all(text, "");
    let line_re = match language {
        Language::Python => &*PY_LINE_COMMENT_RE,
        _ => &*SLASH_LINE_COMMENT_RE,
    };
    line_re.replace_all(&without_block, "").to_string()
}

/// Reads `[dependencies]` name -> version pairs out of a Rust crate's
/// `Cargo.toml`. Other languages have no equivalent manifest convention
/// uniform enough to parse generically, so `Module.dependencies` stays
/// empty for them (see DESIGN.md).
fn read_dependencies(language: Language, dir: &Path) -> IndexMap<String, String> {
    if language != Language::Rust {
        return IndexMap::new();
    }
    let Ok(text) = std::fs::read_to_string(dir.join("Cargo.toml")) else {
        return IndexMap::new();
    };
    let mut out = IndexMap::new();
    let mut in_deps = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_deps = trimmed == "[dependencies]";
            continue;
        }
        if !in_deps || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((name, rest)) = trimmed.split_once('=') {
            out.insert(name.trim().to_string(), extract_version(rest.trim()));
        }
    }
    out
}

fn extract_version(rest: &str) -> String {
    if let Some(stripped) = rest.strip_prefix('"') {
        return stripped.trim_end_matches('"').to_string();
    }
    if let Some(idx) = rest.find("version") {
        let after = &rest[idx + "version".len()..];
        if let Some(q1) = after.find('"') {
            if let Some(q2) = after[q1 + 1..].find('"') {
                return after[q1 + 1..q1 + 1 + q2].to_string();
            }
        }
    }
    "*".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::config::{CollectOption, Language};
    use crate::source::TreeSitterSource;
    use std::io::Write;

    fn export_fixture(src: &str) -> Repository {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("src/lib.rs")).unwrap();
        writeln!(f, "{src}").unwrap();

        let opt = CollectOption::new(Language::Rust);
        let mut collector = Collector::new(dir.path(), opt);
        let mut source = TreeSitterSource::new(Language::Rust);
        collector.collect(&mut source).unwrap();
        Exporter::new(collector).unwrap().export()
    }

    #[test]
    fn rust_trait_method_gets_decorated_identity() {
        let repo = export_fixture(
            "trait Animal { fn speak(&self); }\n\nstruct Dog;\n\nimpl Animal for Dog { fn speak(&self) { } }",
        );
        let demo = repo.modules.get("demo").expect("module discovered");
        let pkg = demo.packages.get("").expect("default package");

        assert!(pkg.types.contains_key("Animal"));
        assert_eq!(pkg.types["Animal"].type_kind, TypeKind::Interface);
        assert!(pkg.types.contains_key("Dog"));

        let speak = pkg.functions.get("Animal<Dog>.speak").expect("decorated method exported");
        assert!(speak.is_method);
        assert_eq!(speak.receiver.as_ref().unwrap().name, "Dog");
    }

    #[test]
    fn typescript_inline_object_alias_feeds_inline_struct() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{\"name\": \"demo\"}").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "class Status {}\n\ntype Server = { s: Status };\n").unwrap();

        let opt = CollectOption::new(Language::TypeScript);
        let mut collector = Collector::new(dir.path(), opt);
        let mut source = TreeSitterSource::new(Language::TypeScript);
        collector.collect(&mut source).unwrap();
        let repo = Exporter::new(collector).unwrap().export();

        let module = repo.modules.values().next().expect("one module discovered");
        let pkg = module.packages.get("").expect("default package");

        let server = pkg.types.get("Server").expect("Server exported");
        assert!(server.sub_struct.is_empty(), "inline alias body must not surface as SubStruct");
        assert_eq!(server.inline_struct.len(), 1);
        assert_eq!(server.inline_struct[0].name, "Status");
    }

    #[test]
    fn python_class_with_inner_helper_splits_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("setup.py"), "").unwrap();
        std::fs::write(dir.path().join("__init__.py"), "def helper():\n    pass\n\nclass C:\n    def m(self):\n        helper()\n").unwrap();

        let opt = CollectOption::new(Language::Python);
        let mut collector = Collector::new(dir.path(), opt);
        let mut source = TreeSitterSource::new(Language::Python);
        collector.collect(&mut source).unwrap();
        let repo = Exporter::new(collector).unwrap().export();

        let module = repo.modules.values().next().expect("one module discovered");
        let pkg = module.packages.get("").expect("default package");
        let m = pkg.functions.get("C.m").expect("C.m exported");
        assert!(m.method_calls.is_empty());
    }

    #[test]
    fn repository_is_stable_across_reexport_of_the_same_json() {
        let repo = export_fixture("fn outer() { let inner = 1; inner + 2; }");
        let json = serde_json::to_string(&repo).unwrap();
        let back: Repository = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }
}
