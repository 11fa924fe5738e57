//! TypeScript `LanguageSpec`: `package.json`-rooted module discovery
//! (monorepo-friendly: every `package.json` below the root is its own
//! module), ESM import parsing, and `class`/`interface` decomposition.
//! Scenario 5 (`type Server = { s: Status }`) relies on `token_kind`
//! classifying a type-alias reference as `Unknown`-but-entity so it still
//! flows into `InlineStruct`.

use super::{looks_generated_or_vendored, FunctionDecomposition, ImplDecomposition, LanguageSpec};
use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token, TokenKind};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct TypeScriptSpec;

impl LanguageSpec for TypeScriptSpec {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>> {
        let mut modules = IndexMap::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules")
        {
            let entry = entry.map_err(|e| {
                crate::errors::Error::BadWorkspace(root.to_path_buf(), e.to_string())
            })?;
            if entry.file_name() == "package.json" {
                let dir = entry.path().parent().unwrap_or(root);
                let name = package_json_name(entry.path())
                    .unwrap_or_else(|| dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
                modules.insert(name, dir.to_path_buf());
            }
        }
        if modules.is_empty() {
            return Err(crate::errors::Error::NoModuleDiscovered(root.to_path_buf()));
        }
        Ok(modules)
    }

    fn namespace(&self, abs_path: &Path) -> (String, String) {
        let s = abs_path.to_string_lossy();
        if s.contains("/node_modules/") {
            let after = s.split("/node_modules/").last().unwrap_or("");
            let pkg = after.split('/').next().unwrap_or("").to_string();
            return (format!("@{pkg}"), "".to_string());
        }
        if s.contains("/typescript/lib/") {
            return ("".to_string(), "lib".to_string());
        }
        ("".to_string(), "".to_string())
    }

    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool {
        if looks_generated_or_vendored(repo_relative) {
            return true;
        }
        let ext_ok = matches!(
            repo_relative.extension().and_then(|e| e.to_str()),
            Some("ts") | Some("tsx")
        );
        if !ext_ok {
            return true;
        }
        let s = repo_relative.to_string_lossy();
        if s.ends_with(".d.ts") {
            return true;
        }
        if opt.not_need_test && (s.contains(".test.") || s.contains(".spec.")) {
            return true;
        }
        opt.is_excluded(&s)
    }

    fn file_imports(&self, text: &str) -> Vec<Import> {
        let re = Regex::new(r#"(?m)^\s*import\s+(?:[\w*{}, ]+\s+from\s+)?['"]([^'"]+)['"]"#).unwrap();
        re.captures_iter(text).map(|c| Import { path: c[1].to_string(), alias: None }).collect()
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.kind {
            TokenKind::TypeIdentifier => SymbolKind::Unknown,
            _ => SymbolKind::Unknown,
        }
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.kind, TokenKind::Identifier | TokenKind::TypeIdentifier)
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        const BUILTINS: &[&str] = &["string", "number", "boolean", "any", "void", "unknown", "Array", "Promise"];
        BUILTINS.contains(&tok.text.as_str())
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.text.trim_start().starts_with("export ")
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.kind == SymbolKind::Function && (sym.name == "main" || sym.name == "bootstrap")
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition {
        // `class Foo extends Base implements IBar { ... }`.
        let mut out = ImplDecomposition::default();
        let class_kw = sym.tokens.iter().position(|t| t.text == "class");
        let implements_kw = sym.tokens.iter().position(|t| t.text == "implements");
        let brace = sym.tokens.iter().position(|t| t.text == "{");
        if let Some(start) = class_kw {
            out.receiver_idx = sym.tokens[start..]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| start + i);
        }
        if let Some(impl_idx) = implements_kw {
            let end = brace.unwrap_or(sym.tokens.len());
            out.interface_idx = sym.tokens[impl_idx..end]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| impl_idx + i);
        }
        out.first_method_idx = brace.and_then(|b| {
            sym.tokens[b..].iter().position(|t| t.text == "(").map(|i| b + i)
        });
        out
    }

    fn function_symbol(&self, sym: &DocumentSymbol) -> FunctionDecomposition {
        let mut out = FunctionDecomposition::default();
        let open_paren = sym.tokens.iter().position(|t| t.text == "(");
        let close_paren = sym.tokens.iter().position(|t| t.text == ")");
        if let (Some(open), Some(close)) = (open_paren, close_paren) {
            for (i, t) in sym.tokens[open + 1..close].iter().enumerate() {
                let idx = open + 1 + i;
                if t.text == "this" {
                    out.receiver_idx = Some(idx);
                    continue;
                }
                if matches!(t.kind, TokenKind::TypeIdentifier) {
                    out.input_idx.push(idx);
                }
            }
        }
        if let Some(close) = close_paren {
            let colon = sym.tokens.iter().skip(close).position(|t| t.text == ":").map(|i| close + i);
            if let Some(c) = colon {
                let body = sym.tokens[c..].iter().position(|t| t.text == "{").map(|i| c + i).unwrap_or(sym.tokens.len());
                for (i, t) in sym.tokens[c + 1..body].iter().enumerate() {
                    if matches!(t.kind, TokenKind::TypeIdentifier) {
                        out.output_idx.push(c + 1 + i);
                    }
                }
            }
        }
        out
    }
}

fn package_json_name(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let re = Regex::new(r#""name"\s*:\s*"([^"]+)""#).ok()?;
    re.captures(&text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_files_are_skipped() {
        let spec = TypeScriptSpec::default();
        let opt = CollectOption::new(Language::TypeScript);
        assert!(spec.should_skip(Path::new("src/types.d.ts"), &opt));
        assert!(!spec.should_skip(Path::new("src/index.ts"), &opt));
    }
}
