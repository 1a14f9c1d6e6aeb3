//! In-memory program model handed to checks as capabilities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Half-open byte range within a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Spans of every occurrence of `needle`, in order
    pub fn find_all(&self, needle: &str) -> Vec<Span> {
        if needle.is_empty() {
            return Vec::new();
        }
        self.text
            .match_indices(needle)
            .map(|(start, matched)| Span::new(start, start + matched.len()))
            .collect()
    }

    /// 1-based line number of a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        let end = offset.min(self.text.len());
        self.text.as_bytes()[..end].iter().filter(|&&byte| byte == b'\n').count() + 1
    }

    pub fn slice(&self, span: Span) -> Option<&str> {
        self.text.get(span.start..span.end)
    }
}

/// The set of files one analysis request covers
#[derive(Debug, Clone, Default)]
pub struct Program {
    files: Vec<Arc<SourceFile>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_file(SourceFile::new(path, text));
        self
    }

    /// Add a file, replacing any file with the same path
    pub fn add_file(&mut self, file: SourceFile) {
        match self.files.iter_mut().find(|existing| existing.path == file.path) {
            Some(existing) => *existing = Arc::new(file),
            None => self.files.push(Arc::new(file)),
        }
    }

    pub fn files(&self) -> &[Arc<SourceFile>] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&Arc<SourceFile>> {
        self.files.iter().find(|file| file.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
