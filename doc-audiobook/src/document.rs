// Document parsing and text extraction

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Extraction-related errors.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}. Please provide a DOCX or PDF file.")]
    UnsupportedFormat(String),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt DOCX archive: {0}")]
    Docx(String),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Document contains no text")]
    Empty,
}

/// Supported input document types, detected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Detect the kind from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            "" => Err(ExtractionError::UnsupportedFormat("no extension".to_string())),
            other => Err(ExtractionError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Text extracted from an input document
#[derive(Debug)]
pub struct Document {
    /// Detected document type
    pub kind: DocumentKind,
    /// Plain text content
    pub text: String,
}

impl Document {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Word count (approximate)
    pub fn total_words(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Extract the text of a DOCX or PDF file.
pub fn extract_document(path: &Path) -> Result<Document, ExtractionError> {
    let kind = DocumentKind::from_path(path)?;

    let text = match kind {
        DocumentKind::Docx => extract_docx(path)?,
        DocumentKind::Pdf => extract_pdf(path)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    Ok(Document { kind, text })
}

fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("word/document.xml: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_xml_to_text(&xml))
}

/// Matches the WordprocessingML elements that carry text or layout.
fn docx_token_regex() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*[^>/])?>(.*?)</w:t>|<w:t(?:\s[^>]*)?/>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>|</w:p>")
            .expect("docx token pattern is valid")
    })
}

/// Convert the body XML of a DOCX into plain text.
///
/// Text runs are concatenated, tabs and breaks map to `\t` and `\n`, and
/// every paragraph ends with a newline.
fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);

    for caps in docx_token_regex().captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            text.push_str(&decode_xml_entities(run.as_str()));
            continue;
        }

        let token = &caps[0];
        if token.starts_with("<w:tab") {
            text.push('\t');
        } else if token.starts_with("<w:br") || token.starts_with("<w:cr") || token == "</w:p>" {
            text.push('\n');
        }
    }

    text
}

/// Decode the predefined XML entities and numeric character references.
fn decode_xml_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };

        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse().ok().and_then(char::from_u32),
            _ => None,
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;

    // The PDF parser panics on some malformed inputs instead of erroring
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
        .map_err(|_| ExtractionError::Pdf("parser aborted on malformed input".to_string()))?;

    extracted.map_err(|e| ExtractionError::Pdf(e.to_string()))
}
