use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifier for source files used when formatting diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

impl FileId {
    pub const UNKNOWN: Self = FileId(usize::MAX);
}

impl Default for FileId {
    fn default() -> Self {
        FileId::UNKNOWN
    }
}

/// Captured line/column information (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: Arc<str>,
    line_starts: Vec<usize>,
}

impl SourceFile {
    #[must_use]
    pub fn new(id: FileId, path: PathBuf, source: Arc<str>) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    #[must_use]
    pub fn line_col(&self, offset: usize) -> Option<LineCol> {
        if offset > self.source.len() {
            return None;
        }
        let index = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = *self.line_starts.get(index)?;
        Some(LineCol {
            line: index + 1,
            column: offset.saturating_sub(line_start) + 1,
        })
    }

    #[must_use]
    pub fn line(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.saturating_sub(1))?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len());
        self.source.get(start..end)
    }
}

/// Collection of source files used by diagnostics.
#[derive(Clone, Debug, Default)]
pub struct FileCache {
    files: Vec<SourceFile>,
}

impl FileCache {
    pub fn add_file(&mut self, path: impl Into<PathBuf>, source: Arc<str>) -> FileId {
        let id = FileId(self.files.len());
        let file = SourceFile::new(id, path.into(), source);
        self.files.push(file);
        id
    }

    #[must_use]
    pub fn get(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(file_id.0)
    }

    #[must_use]
    pub fn path(&self, file_id: FileId) -> Option<&Path> {
        self.get(file_id).map(|file| file.path.as_path())
    }

    #[must_use]
    pub fn line_col(&self, file_id: FileId, offset: usize) -> Option<LineCol> {
        self.get(file_id).and_then(|file| file.line_col(offset))
    }

    #[must_use]
    pub fn find_id_by_path(&self, path: &Path) -> Option<FileId> {
        self.files
            .iter()
            .find(|file| file.path == path)
            .map(|file| file.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(source.lines().count() + 1);
    starts.push(0);
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + ch.len_utf8());
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_is_one_based() {
        let mut cache = FileCache::default();
        let id = cache.add_file("/src/a.go", Arc::from("package a\n\nvar x int\n"));
        assert_eq!(cache.line_col(id, 0), Some(LineCol { line: 1, column: 1 }));
        assert_eq!(cache.line_col(id, 15), Some(LineCol { line: 3, column: 5 }));
        assert_eq!(cache.line_col(id, 500), None);
        assert_eq!(cache.get(id).and_then(|f| f.line(3)), Some("var x int\n"));
        assert_eq!(cache.find_id_by_path(Path::new("/src/a.go")), Some(id));
    }
}
