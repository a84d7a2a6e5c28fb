use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::registry::AnalyzerRegistry;

/// True when any pattern occurs in the path's display form.
pub fn is_ignored(path: &Path, patterns: &[String]) -> bool {
    let text = path.to_string_lossy();
    patterns
        .iter()
        .any(|p| !p.is_empty() && text.contains(p.as_str()))
}

/// Source files under `root` that some registered analyzer handles, in
/// path order. Honors `.gitignore`; hidden directories are walked too so
/// that virtual environments and build outputs stay visible. Ignore
/// patterns only see the part of a path below `root`.
pub fn collect_sources(
    root: &Path,
    registry: &AnalyzerRegistry,
    ignore: &[String],
) -> Vec<PathBuf> {
    let mut unsupported = 0usize;
    let mut paths: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(false)
        .build()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            if is_ignored(path.strip_prefix(root).unwrap_or(path), ignore) {
                debug!("Ignoring {}", path.display());
                return None;
            }
            if registry.for_path(path).is_none() {
                unsupported += 1;
                return None;
            }
            Some(path.to_path_buf())
        })
        .collect();
    paths.sort();

    if unsupported > 0 {
        info!("Skipped {} files with unsupported extensions", unsupported);
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_python::PythonAnalyzer;
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn test_collects_supported_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("pkg/b.py"), "").unwrap();
        fs::write(root.join("a.py"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("generated/c.py"), "").unwrap();

        let registry =
            AnalyzerRegistry::new().with(Arc::new(PythonAnalyzer::new().unwrap()));
        let paths = collect_sources(root, &registry, &["generated".to_string()]);
        assert_eq!(paths, vec![root.join("a.py"), root.join("pkg/b.py")]);
    }

    #[test]
    fn test_patterns_do_not_match_above_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("generated/app");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.py"), "").unwrap();

        let registry =
            AnalyzerRegistry::new().with(Arc::new(PythonAnalyzer::new().unwrap()));
        let paths = collect_sources(&root, &registry, &["generated".to_string()]);
        assert_eq!(paths, vec![root.join("a.py")]);
    }

    #[test]
    fn test_is_ignored() {
        let patterns = vec!["node_modules".to_string(), String::new()];
        assert!(is_ignored(Path::new("/p/node_modules/x.js"), &patterns));
        assert!(!is_ignored(Path::new("/p/src/x.js"), &patterns));
    }
}
