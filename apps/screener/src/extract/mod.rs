//! Resume text extraction for the two supported document formats.

use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::evaluation::error::EvaluationError;
use crate::evaluation::models::ResumeFile;

/// Converts an uploaded document into plain text.
///
/// Implementations are synchronous and may be CPU-heavy; the orchestrator runs them
/// on the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, file: &ResumeFile) -> Result<String, EvaluationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detects the format from the file extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// Extracts PDFs with `pdf-extract` and Word documents with `docx-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, file: &ResumeFile) -> Result<String, EvaluationError> {
        let format = DocumentFormat::from_file_name(&file.name).ok_or_else(|| {
            EvaluationError::UnsupportedFormat {
                file_name: file.name.clone(),
            }
        })?;

        let text = match format {
            DocumentFormat::Pdf => extract_pdf(&file.content)?,
            DocumentFormat::Docx => extract_docx(&file.content)?,
        };

        if text.trim().is_empty() {
            return Err(EvaluationError::Extraction(
                "no extractable text found in document".to_string(),
            ));
        }
        Ok(text)
    }
}

fn extract_pdf(data: &[u8]) -> Result<String, EvaluationError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(EvaluationError::Extraction(format!(
            "Error reading PDF document: {e}"
        ))),
        Err(_) => Err(EvaluationError::Extraction(
            "Error reading PDF document: parser aborted on malformed input".to_string(),
        )),
    }
}

fn extract_docx(data: &[u8]) -> Result<String, EvaluationError> {
    let docx = docx_rs::read_docx(data)
        .map_err(|e| EvaluationError::Extraction(format!("Error reading Word document: {e}")))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(&p.children)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}
