//! C/C++ `LanguageSpec`. C++ has no package manager convention the spec
//! asks us to honor, so `workspace` returns a single "current" pseudo-module
//! rooted at the repo root (§4.2). Scenario 4 (`int f(int x, char* y);`)
//! relies on `is_std_token` recognizing built-in types so they resolve to
//! `Unknown` and get skipped under the default `NeedStdSymbol=false` policy.

use super::{looks_generated_or_vendored, FunctionDecomposition, ImplDecomposition, LanguageSpec};
use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token, TokenKind};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};

const BUILTIN_TYPES: &[&str] = &[
    "int", "char", "bool", "float", "double", "void", "long", "short", "unsigned", "signed", "size_t", "auto",
];

#[derive(Default)]
pub struct CppSpec;

impl LanguageSpec for CppSpec {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>> {
        if !root.exists() {
            return Err(crate::errors::Error::BadWorkspace(root.to_path_buf(), "root does not exist".into()));
        }
        let mut modules = IndexMap::new();
        let name = root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "current".into());
        modules.insert(name, root.to_path_buf());
        Ok(modules)
    }

    fn namespace(&self, abs_path: &Path) -> (String, String) {
        let s = abs_path.to_string_lossy();
        if s.contains("/usr/include/") || s.contains("/usr/lib/gcc/") {
            return ("".to_string(), "std".to_string());
        }
        if s.contains("/third_party/") || s.contains("/external/") {
            let pkg = abs_path
                .ancestors()
                .find(|p| p.parent().map(|par| matches!(par.file_name().and_then(|n| n.to_str()), Some("third_party") | Some("external"))).unwrap_or(false))
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            return (format!("@{pkg}"), "".to_string());
        }
        ("".to_string(), "".to_string())
    }

    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool {
        if looks_generated_or_vendored(repo_relative) {
            return true;
        }
        let ext_ok = matches!(
            repo_relative.extension().and_then(|e| e.to_str()),
            Some("c") | Some("h") | Some("cc") | Some("cpp") | Some("cxx") | Some("hpp") | Some("hh")
        );
        if !ext_ok {
            return true;
        }
        let s = repo_relative.to_string_lossy();
        if opt.not_need_test && (s.contains("_test.") || s.contains("/tests/")) {
            return true;
        }
        opt.is_excluded(&s)
    }

    fn file_imports(&self, text: &str) -> Vec<Import> {
        let re = Regex::new(r#"(?m)^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).unwrap();
        re.captures_iter(text).map(|c| Import { path: c[1].to_string(), alias: None }).collect()
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        if BUILTIN_TYPES.contains(&tok.text.as_str()) {
            SymbolKind::Unknown
        } else {
            match tok.kind {
                TokenKind::TypeIdentifier => SymbolKind::Struct,
                _ => SymbolKind::Unknown,
            }
        }
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.kind, TokenKind::Identifier | TokenKind::TypeIdentifier)
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        BUILTIN_TYPES.contains(&tok.text.as_str()) || tok.text.starts_with("std::")
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        !sym.text.trim_start().starts_with("static ")
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.kind == SymbolKind::Function && sym.name == "main"
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition {
        // `class Foo : public Base { ... };` — the receiver is the class
        // name itself; the first base after `:` is treated as the
        // implemented interface.
        let mut out = ImplDecomposition::default();
        let class_kw = sym.tokens.iter().position(|t| t.text == "class" || t.text == "struct");
        let colon = sym.tokens.iter().position(|t| t.text == ":");
        let brace = sym.tokens.iter().position(|t| t.text == "{");
        if let Some(start) = class_kw {
            out.receiver_idx = sym.tokens[start..]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| start + i);
        }
        if let Some(c) = colon {
            let end = brace.unwrap_or(sym.tokens.len());
            out.interface_idx = sym.tokens[c..end]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| c + i);
        }
        out.first_method_idx = brace;
        out
    }

    fn function_symbol(&self, sym: &DocumentSymbol) -> FunctionDecomposition {
        let mut out = FunctionDecomposition::default();
        let open_paren = sym.tokens.iter().position(|t| t.text == "(");
        let close_paren = sym.tokens.iter().position(|t| t.text == ")");
        if let (Some(open), Some(close)) = (open_paren, close_paren) {
            for (i, t) in sym.tokens[open + 1..close].iter().enumerate() {
                let idx = open + 1 + i;
                if matches!(t.kind, TokenKind::TypeIdentifier) || BUILTIN_TYPES.contains(&t.text.as_str()) {
                    out.input_idx.push(idx);
                }
            }
        }
        if let Some(open) = open_paren {
            for (i, t) in sym.tokens[..open].iter().enumerate() {
                if matches!(t.kind, TokenKind::TypeIdentifier) || BUILTIN_TYPES.contains(&t.text.as_str()) {
                    out.output_idx.push(i);
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
    fn single_pseudo_module_covers_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CppSpec::default();
        let modules = spec.workspace(dir.path()).unwrap();
        assert_eq!(modules.len(), 1);
    }
}
