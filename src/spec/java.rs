//! Java `LanguageSpec`: Maven-POM-rooted module discovery, package-path
//! derived from `package` declarations, `extends`/`implements` decomposition
//! (scenario 3's IPC-cache counterpart uses the same receiver/interface
//! convention so the two sources agree on shape).

use super::{looks_generated_or_vendored, FunctionDecomposition, ImplDecomposition, LanguageSpec};
use crate::config::{CollectOption, Language};
use crate::errors::Result;
use crate::model::Import;
use crate::types::{DocumentSymbol, SymbolKind, Token, TokenKind};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct JavaSpec;

impl LanguageSpec for JavaSpec {
    fn language(&self) -> Language {
        Language::Java
    }

    fn workspace(&self, root: &Path) -> Result<IndexMap<String, PathBuf>> {
        let mut modules = IndexMap::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !matches!(e.file_name().to_str(), Some("target") | Some(".git")))
        {
            let entry = entry.map_err(|e| {
                crate::errors::Error::BadWorkspace(root.to_path_buf(), e.to_string())
            })?;
            if entry.file_name() == "pom.xml" {
                let dir = entry.path().parent().unwrap_or(root);
                let name = pom_artifact_id(entry.path())
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
        if s.contains("/.m2/repository/") {
            let after = s.split("/.m2/repository/").last().unwrap_or("");
            let pkg = after.split('/').take(2).collect::<Vec<_>>().join(".");
            return (format!("@{pkg}"), "".to_string());
        }
        if s.contains("/jre/lib/") || s.contains("/jmods/java.base/") {
            return ("".to_string(), "jdk".to_string());
        }
        // Internal: derive the package path from `src/main/java/<pkg/.../X.java>`.
        let pkg_path = ["src/main/java/", "src/test/java/"]
            .iter()
            .find_map(|marker| s.split(marker).nth(1))
            .map(|rest| {
                let without_file = rest.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                without_file.replace('/', ".")
            })
            .unwrap_or_default();
        ("".to_string(), pkg_path)
    }

    fn should_skip(&self, repo_relative: &Path, opt: &CollectOption) -> bool {
        if looks_generated_or_vendored(repo_relative) {
            return true;
        }
        if repo_relative.extension().and_then(|e| e.to_str()) != Some("java") {
            return true;
        }
        let s = repo_relative.to_string_lossy();
        if opt.not_need_test && s.contains("src/test/") {
            return true;
        }
        opt.is_excluded(&s)
    }

    fn file_imports(&self, text: &str) -> Vec<Import> {
        let re = Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+\*?)\s*;").unwrap();
        re.captures_iter(text).map(|c| Import { path: c[1].to_string(), alias: None }).collect()
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
        tok.text.starts_with("java.") || tok.text.starts_with("javax.")
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.text.trim_start().starts_with("public ")
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.kind == SymbolKind::Method && sym.name == "main" && sym.text.contains("static")
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol) -> ImplDecomposition {
        // `class S extends B implements I { ... }`.
        let mut out = ImplDecomposition::default();
        let class_kw = sym.tokens.iter().position(|t| t.text == "class" || t.text == "interface");
        let extends_kw = sym.tokens.iter().position(|t| t.text == "extends");
        let implements_kw = sym.tokens.iter().position(|t| t.text == "implements");
        let brace = sym.tokens.iter().position(|t| t.text == "{");
        if let Some(start) = class_kw {
            out.receiver_idx = sym.tokens[start..]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| start + i);
        }
        let interface_start = implements_kw.or(extends_kw);
        if let Some(start) = interface_start {
            let end = brace.unwrap_or(sym.tokens.len());
            out.interface_idx = sym.tokens[start..end]
                .iter()
                .position(|t| matches!(t.kind, TokenKind::TypeIdentifier))
                .map(|i| start + i);
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
                if matches!(t.kind, TokenKind::TypeIdentifier) {
                    out.input_idx.push(open + 1 + i);
                }
            }
        }
        if let Some(open) = open_paren {
            let ret_start = sym.tokens[..open]
                .iter()
                .rposition(|t| matches!(t.kind, TokenKind::Identifier) && t.modifiers.declaration)
                .unwrap_or(0);
            for (i, t) in sym.tokens[..ret_start].iter().enumerate() {
                if matches!(t.kind, TokenKind::TypeIdentifier) {
                    out.output_idx.push(i);
                }
            }
        }
        out
    }
}

fn pom_artifact_id(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let re = Regex::new(r"<artifactId>([^<]+)</artifactId>").ok()?;
    re.captures(&text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_derives_package_path_from_src_main_java_layout() {
        let spec = JavaSpec::default();
        let (modname, pkg) = spec.namespace(Path::new("/repo/src/main/java/com/example/app/Main.java"));
        assert_eq!(modname, "");
        assert_eq!(pkg, "com.example.app");
    }
}
