//! PDF document parser.

use super::{page_count, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;
use tracing::debug;

/// Parser for PDF files.
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        debug!("Parsing PDF: {:?}", path);

        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| IngestError::ParseError {
            path: path.to_path_buf(),
            message: format!("Failed to extract text from PDF: {}", e),
        })?;
        let content = pages.join("\x0C");

        if content.trim().is_empty() {
            return Err(IngestError::ParseError {
                path: path.to_path_buf(),
                message: "PDF contains no extractable text".to_string(),
            });
        }

        let metadata = serde_json::json!({
            "format": "pdf",
            "pages": page_count(&content),
        });

        debug!(
            "Extracted {} characters from {} PDF pages",
            content.len(),
            pages.len()
        );

        Ok(ParsedDocument::new(content).with_metadata(metadata))
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_pdf_parser_extensions() {
        assert!(PdfParser.supports("pdf"));
        assert!(PdfParser.supports("PDF"));
        assert!(!PdfParser.supports("txt"));
    }

    #[test]
    fn test_missing_pdf() {
        let err = PdfParser.parse(Path::new("/nonexistent/rome.pdf")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }

    /// Build a PDF with one Helvetica text line per page. An empty string
    /// gives a blank page.
    fn write_pdf(pages: &[&str]) -> NamedTempFile {
        let n = pages.len();
        let font_id = 3 + 2 * n;
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
        ];
        for (i, text) in pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                font_id,
                4 + 2 * i
            ));
            let stream = if text.is_empty() {
                "BT ET".to_string()
            } else {
                format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text)
            };
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
        }
        let xref_at = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );

        let mut file = NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(&pdf).unwrap();
        file
    }

    #[test]
    fn test_pdf_pages_are_separated() {
        let file = write_pdf(&["Page one about Rome.", "Page two about Carthage."]);
        let doc = PdfParser.parse(file.path()).unwrap();

        assert_eq!(doc.content.matches('\x0C').count(), 1);
        assert_eq!(doc.metadata["pages"], 2);
        assert_eq!(doc.metadata["format"], "pdf");

        let pages: Vec<&str> = doc.content.split('\x0C').collect();
        assert!(pages[0].contains("Rome."));
        assert!(!pages[0].contains("Carthage"));
        assert!(pages[1].contains("Page two about Carthage."));
        assert!(!doc.content.contains("Rome.Page"));
    }

    #[test]
    fn test_blank_pdf_page_keeps_numbering() {
        let file = write_pdf(&["Page one about Rome.", "", "Page three about Egypt."]);
        let doc = PdfParser.parse(file.path()).unwrap();

        assert_eq!(doc.metadata["pages"], 3);
        let pages: Vec<&str> = doc.content.split('\x0C').collect();
        assert!(pages[1].trim().is_empty());
        assert!(pages[2].contains("Egypt."));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let mut file = NamedTempFile::with_suffix(".pdf").unwrap();
        write!(file, "this is not a pdf").unwrap();
        let err = PdfParser.parse(file.path()).unwrap_err();
        assert!(matches!(err, IngestError::ParseError { .. }));
    }
}
