//! Data types for source documents, chunks, and retrieval results.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The source format of a course document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Pptx,
    Docx,
    Txt,
}

impl FileType {
    /// Every supported format, in the order loaders probe them.
    pub const ALL: [FileType; 4] = [FileType::Pdf, FileType::Pptx, FileType::Docx, FileType::Txt];

    /// Resolve a file type from a path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|ft| ft.as_str() == ext)
    }

    /// The lowercase extension without a leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Pptx => "pptx",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        }
    }

    /// Paged formats keep one chunk per page or slide and bypass splitting.
    pub fn is_paged(self) -> bool {
        matches!(self, FileType::Pdf | FileType::Pptx)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted text of one source unit, as produced by the document loaders.
///
/// Paged formats produce one record per page or slide (`page_number >= 1`);
/// unpaged formats produce a single record with `page_number == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// The decoded text content.
    pub content: String,
    /// File name without directories, e.g. `lecture01.pdf`.
    pub filename: String,
    /// Path the file was loaded from.
    pub filepath: String,
    /// Source format.
    pub filetype: FileType,
    /// 1-based page or slide number, or 0 when not applicable.
    pub page_number: u32,
}

impl DocumentRecord {
    /// Create a record for a paged source unit.
    pub fn page(path: &Path, filetype: FileType, page_number: u32, content: String) -> Self {
        Self {
            content,
            filename: file_name(path),
            filepath: path.display().to_string(),
            filetype,
            page_number,
        }
    }

    /// Create a record for a whole unpaged document.
    pub fn whole(path: &Path, filetype: FileType, content: String) -> Self {
        Self::page(path, filetype, 0, content)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fixed-shape metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub filepath: String,
    pub filetype: FileType,
    pub page_number: u32,
    /// Sequence index within the source unit.
    pub chunk_id: u32,
}

impl ChunkMetadata {
    /// The stable identity key `filename_pagenumber_chunkid`.
    ///
    /// Re-indexing the same file, page and segment index overwrites the
    /// previous entry instead of duplicating it.
    pub fn identity(&self) -> String {
        format!("{}_{}_{}", self.filename, self.page_number, self.chunk_id)
    }

    /// Human-readable citation label, e.g. `bio.pdf (page 3)`.
    pub fn source_label(&self) -> String {
        if self.page_number > 0 {
            format!("{} (page {})", self.filename, self.page_number)
        } else {
            self.filename.clone()
        }
    }
}

/// A bounded unit of source text ready to be embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed, non-empty text.
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk, trimming its content.
    ///
    /// Returns `None` when the content is blank.
    pub fn new(content: impl AsRef<str>, metadata: ChunkMetadata) -> Option<Self> {
        let content = content.as_ref().trim();
        if content.is_empty() {
            return None;
        }
        Some(Self { content: content.to_string(), metadata })
    }

    /// See [`ChunkMetadata::identity`].
    pub fn id(&self) -> String {
        self.metadata.identity()
    }
}

/// A chunk retrieved for a query, paired with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// `1 - distance`; an ordering signal roughly in `[-1, 1]`, not a probability.
    pub score: f32,
    /// 0-based position in the ranked result list.
    pub rank: usize,
}
