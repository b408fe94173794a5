use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TelaError, TelaResult};

/// The view-loading collaborator: resolves a logical view name to template
/// source. Implementations are host-supplied; `FileViewLoader` covers the
/// common filesystem case.
pub trait ViewLoader {
    fn load(&self, name: &str) -> TelaResult<String>;

    /// The locations consulted, for error reporting.
    fn search_paths(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Resolves view names against an ordered list of search directories,
/// returning the first match. A name without an extension also matches
/// `name.*` within its directory.
#[derive(Debug, Clone, Default)]
pub struct FileViewLoader {
    dirs: Vec<PathBuf>,
}

impl FileViewLoader {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        FileViewLoader {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            if let Some(found) = find_with_extension(&candidate) {
                return Some(found);
            }
        }
        None
    }
}

impl ViewLoader for FileViewLoader {
    fn load(&self, name: &str) -> TelaResult<String> {
        let path = self.resolve(name).ok_or_else(|| TelaError::ViewNotFound {
            name: name.to_string(),
            search_paths: self.search_paths(),
        })?;
        load_file(&path).ok_or_else(|| TelaError::FileNotFound {
            path: path.display().to_string(),
            search_paths: self.search_paths(),
        })
    }

    fn search_paths(&self) -> Vec<String> {
        self.dirs.iter().map(|d| d.display().to_string()).collect()
    }
}

/// Extension-less lookup: the first file in the candidate's directory whose
/// name is `<candidate file name>.<anything>`.
fn find_with_extension(candidate: &Path) -> Option<PathBuf> {
    let stem = candidate.file_name()?.to_str()?.to_string();
    let parent = candidate.parent()?;
    let prefix = format!("{}.", stem);
    let mut matches: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Reads a file's contents, stripping a UTF-8 byte-order mark if present.
/// Returns `None` when the file is unreadable, forcing callers to check
/// emptiness explicitly rather than propagating an I/O error blindly.
pub fn load_file(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    Some(strip_bom(content))
}

fn strip_bom(s: String) -> String {
    match s.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => s,
    }
}

/// Raw-file lookup for `<Include file=...>`: the path as given first, then
/// each search directory.
pub(crate) fn read_raw(path: &str, dirs: &[String]) -> Option<String> {
    let direct = Path::new(path);
    if direct.is_file() {
        return load_file(direct);
    }
    for dir in dirs {
        let candidate = Path::new(dir).join(path);
        if candidate.is_file() {
            return load_file(&candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tela-view-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_file_strips_utf8_bom() {
        let dir = scratch_dir("bom");
        let path = dir.join("bom.txt");
        fs::write(&path, "\u{feff}content").unwrap();
        assert_eq!(load_file(&path), Some("content".to_string()));
    }

    #[test]
    fn load_file_returns_none_when_unreadable() {
        assert_eq!(load_file(Path::new("/nonexistent/tela-test")), None);
    }

    #[test]
    fn loader_resolves_extension_less_names() {
        let dir = scratch_dir("ext");
        fs::write(dir.join("header.html"), "<h1>hi</h1>").unwrap();
        let loader = FileViewLoader::new([dir]);
        assert_eq!(loader.load("header").unwrap(), "<h1>hi</h1>");
    }

    #[test]
    fn loader_reports_all_search_paths_on_miss() {
        let loader = FileViewLoader::new(["/a", "/b"]);
        let err = loader.load("missing").unwrap_err();
        match err {
            TelaError::ViewNotFound { name, search_paths } => {
                assert_eq!(name, "missing");
                assert_eq!(search_paths, vec!["/a".to_string(), "/b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
