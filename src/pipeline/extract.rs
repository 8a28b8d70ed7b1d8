//! Text extraction: PDF bytes → concatenated page text via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole parse, so the
//! work runs on the blocking pool. A document pdfium cannot open is not an
//! error here: it yields an empty string, which the caller reports as
//! [`LectureError::NoTextExtracted`]. Only failing to load the pdfium library
//! itself is surfaced directly, because no PDF could ever succeed then.

use crate::error::{LectureError, Stage};
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Extract the text of every page, in page order.
pub async fn extract_text(pdf_bytes: Vec<u8>) -> Result<String, LectureError> {
    tokio::task::spawn_blocking(move || extract_text_blocking(pdf_bytes))
        .await
        .map_err(|e| LectureError::internal(Stage::Extract, format!("Extraction task panicked: {e}")))?
}

fn extract_text_blocking(pdf_bytes: Vec<u8>) -> Result<String, LectureError> {
    let pdfium =
        pdfium_auto::bind_silent().map_err(|e| LectureError::PdfiumBindingFailed(e.to_string()))?;
    Ok(text_from_document(&pdfium, pdf_bytes))
}

/// Concatenate page text; any pdfium failure degrades to `""`.
fn text_from_document(pdfium: &Pdfium, pdf_bytes: Vec<u8>) -> String {
    let document = match pdfium.load_pdf_from_byte_vec(pdf_bytes, None) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Error extracting text from PDF: {:?}", e);
            return String::new();
        }
    };

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(page_text) => {
                let chunk = page_text.all();
                debug!("Page {}: {} chars", idx + 1, chunk.chars().count());
                text.push_str(&chunk);
            }
            Err(e) => {
                warn!("Error extracting text from PDF page {}: {:?}", idx + 1, e);
                return String::new();
            }
        }
    }
    text
}

/// Keep the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
