use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOC_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
}

/// Every document file under `root`, recursively. Entries are visited in file
/// name order so discovery order is reproducible; callers still sort their
/// results explicitly.
pub fn discover(root: &Path) -> Result<Vec<SourceFile>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_document(entry.path()) {
            out.push(SourceFile { path: entry.into_path() });
        }
    }
    tracing::debug!(root = %root.display(), files = out.len(), "discovered sources");
    Ok(out)
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| DOC_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_documents_recursively() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("nested/b.MARKDOWN"), "b").unwrap();
        fs::write(dir.path().join("nested/deeper/c.Md"), "c").unwrap();
        fs::write(dir.path().join("nested/notes.txt"), "x").unwrap();
        fs::create_dir_all(dir.path().join("dir.md")).unwrap();

        let mut names: Vec<String> = discover(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.md", "b.MARKDOWN", "c.Md"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(discover(&dir.path().join("absent")).is_err());
    }
}
