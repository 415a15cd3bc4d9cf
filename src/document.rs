//! Word document assembly for a finished batch.
//!
//! Assembly happens in two steps so the layout can be tested without
//! unpacking a `.docx`:
//!
//! 1. [`assemble`] folds the ordered results into an [`AssembledDocument`],
//!    a flat list of [`Block`]s.
//! 2. [`AssembledDocument::to_docx`] renders those blocks with `docx-rs` into
//!    an in-memory buffer ready for download.
//!
//! Layout: a title, then for each result a bold `From: <filename>` line, one
//! paragraph per line of text (trimmed, blank lines kept), and a separator.

use crate::error::Img2TextError;
use crate::output::ExtractionResult;
use docx_rs::{AlignmentType, Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Document title.
pub const DOCUMENT_TITLE: &str = "Extracted Exam Paper";

/// Download filename offered for the assembled document.
pub const DOCX_FILENAME: &str = "extracted_exam_paper.docx";

/// Media type of a `.docx` file.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const SEPARATOR_CHAR: char = '_';
const SEPARATOR_WIDTH: usize = 50;

/// One paragraph-level element of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Document title, rendered in the `Title` style.
    Title(String),
    /// Bold source line naming the image a section came from.
    Source(String),
    /// One line of extracted text.
    Line(String),
    /// Fixed-width rule between sections.
    Separator,
}

impl Block {
    /// Visible text of the paragraph.
    pub fn text(&self) -> String {
        match self {
            Block::Title(t) | Block::Line(t) => t.clone(),
            Block::Source(filename) => format!("From: {filename}"),
            Block::Separator => separator(),
        }
    }

    fn to_paragraph(&self) -> Paragraph {
        match self {
            Block::Title(t) => Paragraph::new()
                .style("Title")
                .add_run(Run::new().add_text(t.as_str())),
            Block::Source(_) => Paragraph::new()
                .align(AlignmentType::Left)
                .add_run(Run::new().add_text(self.text()).bold()),
            Block::Line(line) if line.is_empty() => Paragraph::new(),
            Block::Line(line) => Paragraph::new().add_run(Run::new().add_text(line.as_str())),
            Block::Separator => Paragraph::new().add_run(Run::new().add_text(separator())),
        }
    }
}

fn separator() -> String {
    std::iter::repeat(SEPARATOR_CHAR)
        .take(SEPARATOR_WIDTH)
        .collect()
}

/// The document as an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub blocks: Vec<Block>,
}

impl AssembledDocument {
    /// Visible text of every paragraph, in order.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.blocks.iter().map(Block::text).collect()
    }

    /// Serialise to `.docx` bytes.
    pub fn to_docx(&self) -> Result<Vec<u8>, Img2TextError> {
        let title_style = Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(56)
            .bold();

        let docx = self
            .blocks
            .iter()
            .fold(Docx::new().add_style(title_style), |docx, block| {
                docx.add_paragraph(block.to_paragraph())
            });

        let mut buf = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buf)
            .map_err(|e| Img2TextError::DocumentBuild(e.to_string()))?;

        let bytes = buf.into_inner();
        debug!(
            "Packed {} paragraphs into {} bytes",
            self.blocks.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Lay out the ordered results. Failed items are rendered like any other,
/// with their error text as the body.
pub fn assemble(results: &[ExtractionResult]) -> AssembledDocument {
    let mut blocks = vec![Block::Title(DOCUMENT_TITLE.to_string())];

    for result in results {
        blocks.push(Block::Source(result.filename.clone()));
        blocks.extend(
            result
                .text
                .split('\n')
                .map(|line| Block::Line(line.trim().to_string())),
        );
        blocks.push(Block::Separator);
    }

    AssembledDocument { blocks }
}

/// Write the document to `path` atomically (temp file + rename).
pub async fn write_document(doc: &AssembledDocument, path: &Path) -> Result<(), Img2TextError> {
    let bytes = doc.to_docx()?;
    let write_err = |source: std::io::Error| Img2TextError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("docx.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
