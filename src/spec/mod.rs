//! LanguageSpec (C2): per-language predicates the Collector delegates to for
//! every decision that depends on a specific language's conventions.
//!
//! `LanguageSpec` is a pure strategy — it never mutates Collector state
//! (§4.2) — realized here as an explicit trait with one implementation per
//! supported language, per the design notes' "do not use inheritance"
//! guidance.

mod cpp;
mod java;
mod python;
mod rust;
mod typescript;

pub use cpp::CppSpec;
pub use java::JavaSpec;
pub use python::PythonSpec;
pub use rust::RustSpec;
pub use typescript::TypeScriptSpec;

use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Result of `implSymbol`: token indices into `sym.tokens`, `None` standing
/// in for the `-1` "absent" sentinel used by the pseudocode original.
#[derive(Debug, Clone, Default)]
pub struct ImplDecomposition {
    pub interface_idx: Option<usize>,
    pub receiver_idx: Option<usize>,
    pub first_method_idx: Option<usize>,
}

/// Result of `functionSymbol`: token indices decomposing a function's
/// signature. `type_param_idx`/`input_idx`/`output_idx` are ordered by
/// source-token index, which equals declaration order (I4).
#[derive(Debug, Clone, Default)]
pub struct FunctionDecomposition {
    pub receiver_idx: Option<usize>,
    pub type_param_idx: Vec<usize>,
    pub input_idx: Vec<usize>,
    pub output_idx: Vec<usize>,
}

pub trait LanguageSpec: Send + Sync {
    fn language(&self) -> Language;

    /// Discovers modules under `root` (Rust crates via `Cargo.toml`, Python
    /// packages via `setup.py`/`pyproject.toml` heuristics, Java via Maven
    /// POMs, C++ returns a single "current" pseudo-module). Fails only when
    /// `root` itself is unreadable.
    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>>;

    /// Classifies an absolute file path: `(modName, pkgPath)`. Internal
    /// paths have both non-empty; standard-library paths return
    /// `modName = ""` with a conventional sentinel package; third-party
    /// paths have a modName containing `@`.
    fn namespace(&self, abs_path: &Path) -> (String, String);

    /// True for generated, build, or non-source files.
    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool;

    /// Parses import/use statements. Pure of side effects.
    fn file_imports(&self, text: &str) -> Vec<Import>;

    /// Classifies a semantic token, used as a fallback when the external
    /// parser returned an `Unknown` symbol at a referenced location.
    fn token_kind(&self, tok: &Token) -> SymbolKind;

    /// True if the token could denote an entity (not a comment, bracket,
    /// operator).
    fn is_entity_token(&self, tok: &Token) -> bool;

    /// True if the token refers to the language's standard library.
    fn is_std_token(&self, tok: &Token) -> bool;

    /// True for functions/methods/types/vars/consts/enum-members; false for
    /// modules, brackets, namespace-only symbols.
    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.kind.is_entity()
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool;

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool;

    /// Token index whose modifier set contains "declaration" — the defining
    /// name token.
    fn declare_token_of_symbol(&self, sym: &DocumentSymbol) -> Option<usize> {
        sym.tokens.iter().position(|t| t.modifiers.declaration)
    }

    /// True for languages with explicit impl blocks (Rust, Python classes,
    /// C++ classes).
    fn has_impl_symbol(&self) -> bool;

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition;

    /// Decomposes a function's signature tokens.
    fn function_symbol(&self, sym: &DocumentSymbol) -> FunctionDecomposition;
}

pub fn for_language(language: Language) -> Box<dyn LanguageSpec> {
    match language {
        Language::Rust => Box::new(RustSpec::default()),
        Language::Python => Box::new(PythonSpec::default()),
        Language::TypeScript => Box::new(TypeScriptSpec::default()),
        Language::C | Language::Cpp => Box::new(CppSpec::default()),
        Language::Java => Box::new(JavaSpec::default()),
    }
}

/// Shared generated/vendor path heuristic, folded in under each language's
/// `should_skip` per the supplemented-features note on `looks_generated`.
pub(super) fn looks_generated_or_vendored(repo_relative: &Path) -> bool {
    let s = repo_relative.to_string_lossy();
    const MARKERS: &[&str] = &[
        "/.git/", "/target/", "/build/", "/dist/", "/node_modules/", "/vendor/",
        "/.venv/", "/__pycache__/", "/.idea/", "/.vscode/",
    ];
    let padded = format!("/{s}");
    if MARKERS.iter().any(|m| padded.contains(m)) {
        return true;
    }
    s.ends_with(".generated.rs")
        || s.ends_with(".pb.go")
        || s.ends_with("_pb2.py")
        || s.contains(".g.dart")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_generated_catches_common_build_dirs() {
        assert!(looks_generated_or_vendored(Path::new("target/debug/build.rs")));
        assert!(looks_generated_or_vendored(Path::new("node_modules/x/index.js")));
        assert!(!looks_generated_or_vendored(Path::new("src/lib.rs")));
    }
}
