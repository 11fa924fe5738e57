//! Python `LanguageSpec`: package discovery via `setup.py`/`pyproject.toml`,
//! `class:` blocks as impl symbols, module-level functions as plain
//! `Function`s (scenario 2 — `class C: def m(self): helper()`).

use super::{looks_generated_or_vendored, FunctionDecomposition, ImplDecomposition, LanguageSpec};
use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token, TokenKind};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct PythonSpec;

impl LanguageSpec for PythonSpec {
    fn language(&self) -> Language {
        Language::Python
    }

    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>> {
        let mut modules = IndexMap::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !matches!(e.file_name().to_str(), Some("__pycache__") | Some(".venv")))
        {
            let entry = entry.map_err(|e| {
                crate::errors::Error::BadWorkspace(root.to_path_buf(), e.to_string())
            })?;
            let name = entry.file_name().to_string_lossy();
            if name == "setup.py" || name == "pyproject.toml" {
                let dir = entry.path().parent().unwrap_or(root);
                let mod_name = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "root".to_string());
                modules.insert(mod_name, dir.to_path_buf());
            }
        }
        if modules.is_empty() {
            // A bare script tree with no packaging manifest is still one
            // module — the root directory itself.
            modules.insert(
                root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "root".into()),
                root.to_path_buf(),
            );
        }
        Ok(modules)
    }

    fn namespace(&self, abs_path: &Path) -> (String, String) {
        let s = abs_path.to_string_lossy();
        if s.contains("/site-packages/") {
            let pkg = abs_path
                .ancestors()
                .find(|p| p.parent().map(|par| par.file_name() == Some(std::ffi::OsStr::new("site-packages"))).unwrap_or(false))
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            return (format!("@{pkg}"), "".to_string());
        }
        if s.contains("/lib/python3") && !s.contains("/site-packages/") {
            return ("".to_string(), "stdlib".to_string());
        }
        ("".to_string(), "".to_string())
    }

    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool {
        if looks_generated_or_vendored(repo_relative) {
            return true;
        }
        if repo_relative.extension().and_then(|e| e.to_str()) != Some("py") {
            return true;
        }
        let s = repo_relative.to_string_lossy();
        if opt.not_need_test && (s.contains("/tests/") || s.starts_with("test_") || s.contains("/test_")) {
            return true;
        }
        opt.is_excluded(&s)
    }

    fn file_imports(&self, text: &str) -> Vec<Import> {
        let import_re = Regex::new(r"(?m)^\s*import\s+([\w.]+)(?:\s+as\s+(\w+))?").unwrap();
        let from_re = Regex::new(r"(?m)^\s*from\s+([\w.]+)\s+import\s+").unwrap();
        let mut out = Vec::new();
        for c in import_re.captures_iter(text) {
            out.push(Import { path: c[1].to_string(), alias: c.get(2).map(|m| m.as_str().to_string()) });
        }
        for c in from_re.captures_iter(text) {
            out.push(Import { path: c[1].to_string(), alias: None });
        }
        out
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.kind {
            TokenKind::TypeIdentifier => SymbolKind::Class,
            _ => SymbolKind::Unknown,
        }
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.kind, TokenKind::Identifier | TokenKind::TypeIdentifier)
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        const BUILTINS: &[&str] = &["len", "print", "range", "str", "int", "list", "dict", "tuple", "set"];
        BUILTINS.contains(&tok.text.as_str())
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        !sym.name.starts_with('_')
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.kind == SymbolKind::Function && sym.name == "main"
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition {
        // `class C(Base1, Base2):` — the first identifier after `class` is
        // the receiver itself (the class being defined); any further
        // identifiers before `:` are base classes, and the first of those
        // is treated as the implemented interface, mirroring the
        // single-inheritance-as-interface reading used by the IPC/Java
        // spec for `extends`/`implements`. tree-sitter-python has no
        // `type_identifier` node kind — class and base names are plain
        // `identifier`s — so this keys on `TokenKind::Identifier`.
        let mut out = ImplDecomposition::default();
        let class_kw = sym.tokens.iter().position(|t| t.text == "class");
        let colon = sym.tokens.iter().position(|t| t.text == ":");
        if let Some(start) = class_kw {
            let idents: Vec<usize> = sym.tokens[start..colon.unwrap_or(sym.tokens.len())]
                .iter()
                .enumerate()
                .filter(|(_, t)| matches!(t.kind, TokenKind::Identifier))
                .map(|(i, _)| start + i)
                .collect();
            out.receiver_idx = idents.first().copied();
            out.interface_idx = idents.get(1).copied();
        }
        out.first_method_idx = sym.tokens.iter().position(|t| t.text == "def");
        out
    }

    fn function_symbol(&self, sym: &DocumentSymbol) -> FunctionDecomposition {
        let mut out = FunctionDecomposition::default();
        let open_paren = sym.tokens.iter().position(|t| t.text == "(");
        let close_paren = sym.tokens.iter().position(|t| t.text == ")");
        if let (Some(open), Some(close)) = (open_paren, close_paren) {
            for (i, t) in sym.tokens[open + 1..close].iter().enumerate() {
                let idx = open + 1 + i;
                if t.text == "self" || t.text == "cls" {
                    out.receiver_idx = Some(idx);
                    continue;
                }
                if matches!(t.kind, TokenKind::Identifier) {
                    out.input_idx.push(idx);
                }
            }
        }
        let arrow = sym.tokens.iter().position(|t| t.text == "->");
        if let Some(a) = arrow {
            let colon = sym.tokens.iter().skip(a).position(|t| t.text == ":").map(|i| a + i).unwrap_or(sym.tokens.len());
            for (i, t) in sym.tokens[a + 1..colon].iter().enumerate() {
                if matches!(t.kind, TokenKind::Identifier) {
                    out.output_idx.push(a + 1 + i);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_name_convention_is_not_public() {
        let spec = PythonSpec::default();
        let make = |name: &str| -> DocumentSymbol {
            use crate::location::{Location, Range};
            use crate::types::{SymbolOrigin, SymbolRole};
            use lsp_types::{Position, Url};
            let uri = Url::parse("file:///a.py").unwrap();
            DocumentSymbol {
                name: name.into(),
                kind: SymbolKind::Function,
                location: Location::new(uri, Range::new(Position { line: 0, character: 0 }, Position { line: 1, character: 0 })),
                text: String::new(),
                tokens: Vec::new(),
                children: Vec::new(),
                role: SymbolRole::Definition,
                origin: SymbolOrigin::Local,
            }
        };
        assert!(spec.is_public_symbol(&make("helper")));
        assert!(!spec.is_public_symbol(&make("_private")));
    }
}
