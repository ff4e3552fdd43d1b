//! Extraction of course documents into [`DocumentRecord`]s.
//!
//! PDF files and slide decks yield one record per page or slide; Word
//! documents and plain text yield a single record. A file that cannot be
//! read is logged and skipped by [`DocumentLoader::load_all`], so one broken
//! upload never stops an ingestion run. This module is only available when
//! the `loaders` feature is enabled.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{DocumentRecord, FileType};
use crate::error::{RagError, Result};

/// Loads every supported document below a data directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Paths of all supported files below the data directory, in
    /// file-name order.
    pub fn discover(&self) -> Vec<PathBuf> {
        if !self.data_dir.exists() {
            warn!(path = %self.data_dir.display(), "data directory does not exist");
            return Vec::new();
        }

        WalkDir::new(&self.data_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| FileType::from_path(path).is_some())
            .collect()
    }

    /// Load every supported file, skipping the ones that fail.
    pub fn load_all(&self) -> Vec<DocumentRecord> {
        let mut documents = Vec::new();
        for path in self.discover() {
            info!(path = %path.display(), "loading document");
            match load_document(&path) {
                Ok(records) => documents.extend(records),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load document, skipping")
                }
            }
        }
        info!(records = documents.len(), "loaded documents");
        documents
    }
}

/// Extract one file into records.
///
/// Blank pages, slides and documents produce no records.
///
/// # Errors
///
/// Returns [`RagError::Loader`] for unsupported extensions and for files
/// that cannot be read or parsed.
pub fn load_document(path: &Path) -> Result<Vec<DocumentRecord>> {
    let filetype = FileType::from_path(path)
        .ok_or_else(|| loader_error(path, "unsupported file format".to_string()))?;

    let records = match filetype {
        FileType::Pdf => load_pdf(path)?,
        FileType::Pptx => load_pptx(path)?,
        FileType::Docx => whole(path, filetype, load_docx(path)?),
        FileType::Txt => whole(path, filetype, load_txt(path)?),
    };

    debug!(path = %path.display(), %filetype, records = records.len(), "extracted document");
    Ok(records)
}

fn whole(path: &Path, filetype: FileType, content: String) -> Vec<DocumentRecord> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    vec![DocumentRecord::whole(path, filetype, content)]
}

fn loader_error(path: &Path, message: String) -> RagError {
    RagError::Loader { path: path.display().to_string(), message }
}

fn load_pdf(path: &Path) -> Result<Vec<DocumentRecord>> {
    let document =
        lopdf::Document::load(path).map_err(|e| loader_error(path, format!("invalid PDF: {e}")))?;

    let mut records = Vec::new();
    for page_number in document.get_pages().into_keys() {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), page_number, error = %e, "failed to extract page");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        let content = format!("--- Page {page_number} ---\n{text}\n");
        records.push(DocumentRecord::page(path, FileType::Pdf, page_number, content));
    }
    Ok(records)
}

fn load_pptx(path: &Path) -> Result<Vec<DocumentRecord>> {
    let mut archive = open_archive(path)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|number| (number, name.to_string())))
        .collect();
    slides.sort();

    let mut records = Vec::new();
    for (number, name) in slides {
        let xml = read_entry(&mut archive, &name, path)?;
        let paragraphs = xml_paragraphs(&xml, b"a:p", b"a:t")
            .map_err(|e| loader_error(path, format!("{name}: {e}")))?;
        if paragraphs.is_empty() {
            continue;
        }
        let content = format!("--- Slide {number} ---\n{}\n", paragraphs.join("\n"));
        records.push(DocumentRecord::page(path, FileType::Pptx, number, content));
    }
    Ok(records)
}

/// Parse `ppt/slides/slide12.xml` into `12`.
fn slide_number(entry: &str) -> Option<u32> {
    entry.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()
}

fn load_docx(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "word/document.xml", path)?;
    let paragraphs =
        xml_paragraphs(&xml, b"w:p", b"w:t").map_err(|e| loader_error(path, e))?;
    Ok(paragraphs.join("\n"))
}

/// Read a text file as UTF-8, falling back to GBK.
fn load_txt(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| loader_error(path, e.to_string()))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let bytes = e.into_bytes();
            let (text, _, had_errors) = encoding_rs::GBK.decode(&bytes);
            if had_errors {
                return Err(loader_error(path, "text is neither UTF-8 nor GBK".to_string()));
            }
            debug!(path = %path.display(), "decoded text file as GBK");
            Ok(text.into_owned())
        }
    }
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path).map_err(|e| loader_error(path, e.to_string()))?;
    zip::ZipArchive::new(file).map_err(|e| loader_error(path, format!("invalid archive: {e}")))
}

fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str, path: &Path) -> Result<String> {
    let mut entry =
        archive.by_name(name).map_err(|e| loader_error(path, format!("{name}: {e}")))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| loader_error(path, format!("{name}: {e}")))?;
    Ok(xml)
}

/// Collect the text runs of an Office XML part, one string per non-blank
/// paragraph.
fn xml_paragraphs(
    xml: &str,
    paragraph_tag: &[u8],
    text_tag: &[u8],
) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == text_tag => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == text_tag => in_text = false,
            Ok(Event::End(e)) if e.name().as_ref() == paragraph_tag => {
                let paragraph = current.trim();
                if !paragraph.is_empty() {
                    paragraphs.push(paragraph.to_string());
                }
                current.clear();
            }
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("malformed XML at byte {}: {e}", reader.buffer_position()));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_numbers_parse_from_part_names() {
        assert_eq!(slide_number("ppt/slides/slide3.xml"), Some(3));
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide3.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn paragraphs_join_runs_and_unescape() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Stacks &amp; </w:t></w:r><w:r><w:t>queues</w:t></w:r></w:p>
            <w:p><w:r><w:t>   </w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">FIFO order</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let paragraphs = xml_paragraphs(xml, b"w:p", b"w:t").unwrap();
        assert_eq!(paragraphs, ["Stacks & queues", "FIFO order"]);
    }
}
