//! Source documents and the directory loader used by ingestion.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::RagError;

pub const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    /// Loader-specific fields (file type, size). Dropped by
    /// [`filter_to_minimal_docs`].
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                extra: Map::new(),
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// A file format the directory loader understands.
pub trait DocumentLoader: Send + Sync {
    fn can_load(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> Result<Document, RagError>;
}

pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn can_load(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    fn load(&self, path: &Path) -> Result<Document, RagError> {
        let text = pdf_extract::extract_text(path)
            .map_err(|e| RagError::Loader(format!("{}: {}", path.display(), e)))?;
        Ok(with_file_metadata(text, path, "pdf"))
    }
}

pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn can_load(&self, path: &Path) -> bool {
        has_extension(path, &["txt", "md", "markdown"])
    }

    fn load(&self, path: &Path) -> Result<Document, RagError> {
        let text = fs::read_to_string(path)
            .map_err(|e| RagError::Loader(format!("{}: {}", path.display(), e)))?;
        Ok(with_file_metadata(text, path, "text"))
    }
}

/// Loads every supported file directly inside a directory.
pub struct DirectoryLoader {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl DirectoryLoader {
    /// PDF only, the format the knowledge base ships in.
    pub fn pdf_only() -> Self {
        Self {
            loaders: vec![Box::new(PdfLoader)],
        }
    }

    pub fn all_formats() -> Self {
        Self {
            loaders: vec![Box::new(PdfLoader), Box::new(TextLoader)],
        }
    }

    /// Files that fail to parse are logged and skipped; an unreadable
    /// directory is an error.
    pub fn load_directory(&self, dir: &Path) -> Result<Vec<Document>, RagError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| RagError::Loader(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let Some(loader) = self.loaders.iter().find(|l| l.can_load(&path)) else {
                continue;
            };
            match loader.load(&path) {
                Ok(doc) => documents.push(doc),
                Err(err) => tracing::warn!("Skipping {}: {}", path.display(), err),
            }
        }

        tracing::info!("Loaded {} documents from {}", documents.len(), dir.display());
        Ok(documents)
    }
}

/// Strips every metadata field except `source`.
pub fn filter_to_minimal_docs(docs: Vec<Document>) -> Vec<Document> {
    let total = docs.len();
    let minimal: Vec<Document> = docs
        .into_iter()
        .map(|doc| {
            let source = if doc.metadata.source.trim().is_empty() {
                UNKNOWN_SOURCE.to_string()
            } else {
                doc.metadata.source
            };
            Document::new(doc.text, source)
        })
        .collect();
    tracing::info!("Filtered {} docs -> {} minimal docs", total, minimal.len());
    minimal
}

fn with_file_metadata(text: String, path: &Path, file_type: &str) -> Document {
    let mut doc = Document::new(text, path.to_string_lossy());
    doc.metadata
        .extra
        .insert("file_type".to_string(), json!(file_type));
    if let Ok(meta) = fs::metadata(path) {
        doc.metadata.extra.insert("size".to_string(), json!(meta.len()));
    }
    doc
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_docs_keep_only_source() {
        let mut doc = Document::new("body", "guide.pdf");
        doc.metadata.extra.insert("page".to_string(), json!(3));
        let blank = Document::new("other", "  ");

        let minimal = filter_to_minimal_docs(vec![doc, blank]);

        assert_eq!(minimal.len(), 2);
        assert!(minimal[0].metadata.extra.is_empty());
        assert_eq!(minimal[0].source(), "guide.pdf");
        assert_eq!(minimal[1].source(), UNKNOWN_SOURCE);
    }

    #[test]
    fn loads_text_files_and_ignores_unknown_formats() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.txt"), "second").expect("write");
        fs::write(dir.path().join("a.md"), "first").expect("write");
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).expect("write");

        let docs = DirectoryLoader::all_formats()
            .load_directory(dir.path())
            .expect("load");

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "first");
        assert_eq!(docs[1].text, "second");
        assert_eq!(docs[0].metadata.extra.get("file_type"), Some(&json!("text")));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = DirectoryLoader::pdf_only().load_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(RagError::Loader(_))));
    }
}
