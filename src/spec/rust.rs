//! Rust `LanguageSpec`: crate-per-module workspace discovery via
//! `Cargo.toml`, `impl`/`impl Trait for Type` decomposition, trait methods
//! exported under the `Interface<Type>.method` decoration (scenario 1).

use super::{looks_generated_or_vendored, FunctionDecomposition, ImplDecomposition, LanguageSpec};
use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token, TokenKind};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};

const STD_CRATES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

#[derive(Default)]
pub struct RustSpec;

impl RustSpec {
    fn crate_name_from_manifest(manifest: &Path) -> Option<String> {
        let text = std::fs::read_to_string(manifest).ok()?;
        let re = Regex::new(r#"(?m)^\s*name\s*=\s*"([^"]+)"\s*$"#).ok()?;
        let mut in_package = false;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed == "[package]" {
                in_package = true;
                continue;
            }
            if trimmed.starts_with('[') {
                in_package = false;
                continue;
            }
            if in_package {
                if let Some(caps) = re.captures(line) {
                    return Some(caps[1].to_string());
                }
            }
        }
        None
    }
}

impl LanguageSpec for RustSpec {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>> {
        let mut modules = IndexMap::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != "target")
        {
            let entry = entry.map_err(|e| {
                crate::errors::Error::BadWorkspace(root.to_path_buf(), e.to_string())
            })?;
            if entry.file_name() == "Cargo.toml" {
                let dir = entry.path().parent().unwrap_or(root).to_path_buf();
                if let Some(name) = Self::crate_name_from_manifest(entry.path()) {
                    modules.insert(name, dir);
                }
            }
        }
        if modules.is_empty() {
            return Err(crate::errors::Error::NoModuleDiscovered(root.to_path_buf()));
        }
        Ok(modules)
    }

    fn namespace(&self, abs_path: &Path) -> (String, String) {
        let s = abs_path.to_string_lossy();
        if s.contains("/.cargo/registry/") {
            let crate_dir = abs_path
                .ancestors()
                .find_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
                .unwrap_or_default();
            return (format!("@{crate_dir}"), "".to_string());
        }
        if s.contains("/rustlib/src/") || s.contains("/lib/rustlib/") {
            return ("".to_string(), "std".to_string());
        }
        ("".to_string(), "".to_string())
    }

    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool {
        if looks_generated_or_vendored(repo_relative) {
            return true;
        }
        let ext_ok = repo_relative.extension().and_then(|e| e.to_str()) == Some("rs");
        if !ext_ok {
            return true;
        }
        let s = repo_relative.to_string_lossy();
        if opt.not_need_test && (s.contains("/tests/") || s.ends_with("_test.rs")) {
            return true;
        }
        opt.is_excluded(&s)
    }

    fn file_imports(&self, text: &str) -> Vec<Import> {
        let re = Regex::new(r"(?m)^\s*use\s+([a-zA-Z0-9_:{}, ]+?)\s*;").unwrap();
        re.captures_iter(text)
            .map(|c| Import { path: c[1].trim().to_string(), alias: None })
            .collect()
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.kind {
            TokenKind::TypeIdentifier => SymbolKind::Struct,
            TokenKind::Identifier => SymbolKind::Unknown,
            _ => SymbolKind::Unknown,
        }
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.kind, TokenKind::Identifier | TokenKind::TypeIdentifier)
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        STD_CRATES.iter().any(|c| tok.text == *c || tok.text.starts_with(&format!("{c}::")))
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.text.trim_start().starts_with("pub ") || sym.text.trim_start().starts_with("pub(")
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.kind == SymbolKind::Function && sym.name == "main"
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition {
        // `impl Trait for Type { ... }` or `impl Type { ... }`. The token
        // stream for an impl-block symbol begins with the `impl` keyword;
        // a `for` keyword token, if present, separates the interface
        // (trait) identifier from the receiver (type) identifier.
        let mut out = ImplDecomposition::default();
        let for_idx = sym.tokens.iter().position(|t| t.text == "for");
        match for_idx {
            Some(idx) => {
                out.interface_idx = sym.tokens[..idx]
                    .iter()
                    .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                    .map(|i| i);
                out.receiver_idx = sym.tokens[idx + 1..]
                    .iter()
                    .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                    .map(|i| idx + 1 + i);
            }
            None => {
                out.receiver_idx = sym
                    .tokens
                    .iter()
                    .position(|t| matches!(t.kind, TokenKind::TypeIdentifier));
            }
        }
        out.first_method_idx = sym.tokens.iter().position(|t| t.text == "fn");
        out
    }

    fn function_symbol(&self, sym: &DocumentSymbol) -> FunctionDecomposition {
        let mut out = FunctionDecomposition::default();
        let open_paren = sym.tokens.iter().position(|t| t.text == "(");
        let close_paren = sym.tokens.iter().position(|t| t.text == ")");
        let arrow = sym.tokens.iter().position(|t| t.text == "->");

        if let (Some(open), Some(close)) = (open_paren, close_paren) {
            let mut is_first = true;
            for (i, t) in sym.tokens[open + 1..close].iter().enumerate() {
                let idx = open + 1 + i;
                if t.text == "self" && is_first {
                    out.receiver_idx = Some(idx);
                }
                if matches!(t.kind, TokenKind::TypeIdentifier) {
                    out.input_idx.push(idx);
                }
                is_first = false;
            }
        }
        if let Some(arrow_idx) = arrow {
            let body_start = sym.tokens.iter().skip(arrow_idx).position(|t| t.text == "{").map(|i| arrow_idx + i);
            let end = body_start.unwrap_or(sym.tokens.len());
            for (i, t) in sym.tokens[arrow_idx + 1..end].iter().enumerate() {
                if matches!(t.kind, TokenKind::TypeIdentifier) {
                    out.output_idx.push(arrow_idx + 1 + i);
                }
            }
        }
        let lt = sym.tokens.iter().position(|t| t.text == "<");
        let gt = sym.tokens.iter().position(|t| t.text == ">");
        if let (Some(l), Some(g)) = (lt, gt) {
            if open_paren.map(|o| l < o).unwrap_or(true) {
                for (i, t) in sym.tokens[l + 1..g].iter().enumerate() {
                    if matches!(t.kind, TokenKind::TypeIdentifier) {
                        out.type_param_idx.push(l + 1 + i);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Location, Range};
    use crate::types::{SymbolOrigin, SymbolRole, TokenModifiers};
    use lsp_types::{Position, Url};

    fn tok(text: &str, kind: TokenKind) -> Token {
        let uri = Url::parse("file:///a.rs").unwrap();
        Token {
            text: text.to_string(),
            kind,
            modifiers: TokenModifiers::default(),
            location: Location::new(uri, Range::new(Position { line: 0, character: 0 }, Position { line: 0, character: 1 })),
        }
    }

    fn dummy_symbol(tokens: Vec<Token>) -> DocumentSymbol {
        let uri = Url::parse("file:///a.rs").unwrap();
        DocumentSymbol {
            name: "x".into(),
            kind: SymbolKind::Method,
            location: Location::new(uri, Range::new(Position { line: 0, character: 0 }, Position { line: 1, character: 0 })),
            text: String::new(),
            tokens,
            children: Vec::new(),
            role: SymbolRole::Definition,
            origin: SymbolOrigin::Local,
        }
    }

    #[test]
    fn impl_symbol_splits_trait_and_receiver_around_for() {
        let spec = RustSpec::default();
        let sym = dummy_symbol(vec![
            tok("impl", TokenKind::Keyword),
            tok("Animal", TokenKind::TypeIdentifier),
            tok("for", TokenKind::Keyword),
            tok("Dog", TokenKind::TypeIdentifier),
            tok("fn", TokenKind::Keyword),
        ]);
        let decomp = spec.impl_symbol(&sym);
        assert_eq!(decomp.interface_idx, Some(1));
        assert_eq!(decomp.receiver_idx, Some(3));
        assert_eq!(decomp.first_method_idx, Some(4));
    }

    #[test]
    fn impl_symbol_without_for_has_receiver_only() {
        let spec = RustSpec::default();
        let sym = dummy_symbol(vec![
            tok("impl", TokenKind::Keyword),
            tok("Dog", TokenKind::TypeIdentifier),
            tok("fn", TokenKind::Keyword),
        ]);
        let decomp = spec.impl_symbol(&sym);
        assert_eq!(decomp.interface_idx, None);
        assert_eq!(decomp.receiver_idx, Some(1));
    }

    #[test]
    fn is_std_token_recognizes_core_crates() {
        let spec = RustSpec::default();
        assert!(spec.is_std_token(&tok("std::fmt::Debug", TokenKind::Identifier)));
        assert!(!spec.is_std_token(&tok("serde::Serialize", TokenKind::Identifier)));
    }
}
