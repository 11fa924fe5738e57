//! Cross-platform file walker. Generalizes the teacher's hardcoded
//! extension allowlist into a language-agnostic walk that defers every
//! inclusion/exclusion decision to the active `LanguageSpec::should_skip`.

use crate::config::CollectOption;
use crate::spec::LanguageSpec;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks `root`, returning every file the active spec does not skip. File
/// order is the underlying `WalkDir` order (directory-then-name), which is
/// stable but not alphabetically sorted across platforms.
pub fn scan_project_files(root: &Path, spec: &dyn LanguageSpec, opt: &CollectOption) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let p = entry.path();
        let relative = pathdiff::diff_paths(p, root).unwrap_or_else(|| p.to_path_buf());

        if spec.should_skip(&relative, opt) {
            continue;
        }
        out.push(p.to_path_buf());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectOption, Language};
    use crate::spec::RustSpec;

    #[test]
    fn skips_target_directory_for_rust() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("target/debug/build.rs"), "fn x() {}").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn x() {}").unwrap();

        let opt = CollectOption::new(Language::Rust);
        let spec = RustSpec::default();
        let files = scan_project_files(dir.path(), &spec, &opt);

        assert!(files.iter().any(|p| p.ends_with("src/lib.rs")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("/target/")));
    }
}
