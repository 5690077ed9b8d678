//! Paginated PDF writer. Renders the chapter list as one flowing page
//! sequence with automatic page breaks, using a TTF font supplied by the
//! caller (the platform's text needs full Unicode coverage, so no builtin
//! PDF font is used).

use crate::model::Chapter;
use genpdf::{elements, fonts, style, Alignment, Document, Element, SimplePageDecorator};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PAGE_MARGIN_MM: i32 = 15;
const TITLE_SIZE: u8 = 16;
const HEADING_SIZE: u8 = 14;
const BODY_SIZE: u8 = 12;

/// Errors from the PDF writer. Fatal for this output only; the EPUB writer
/// is independent.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Cannot write PDF: title is empty.")]
    EmptyTitle,

    #[error("Cannot write PDF: no chapters.")]
    NoChapters,

    #[error("Cannot read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot load font {path}: {source}")]
    FontLoad {
        path: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },

    #[error("Failed to render PDF: {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },
}

/// Write the chapter list to a PDF file.
///
/// Layout follows the source material: a centered bold document title, then
/// per chapter a bold `heading (subheading)` line and each body paragraph as
/// a separately flowed block, with a fixed spacer after every chapter. Page
/// breaks are automatic on overflow.
pub fn write_pdf(
    title: &str,
    chapters: &[Chapter],
    font_path: &Path,
    path: &Path,
) -> Result<(), PdfError> {
    if title.trim().is_empty() {
        return Err(PdfError::EmptyTitle);
    }
    if chapters.is_empty() {
        return Err(PdfError::NoChapters);
    }

    let family = load_font_family(font_path)?;
    let mut doc = Document::new(family);
    doc.set_title(title);
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN_MM);
    doc.set_page_decorator(decorator);

    doc.push(
        elements::Paragraph::new(title)
            .aligned(Alignment::Center)
            .styled(style::Style::new().bold().with_font_size(TITLE_SIZE)),
    );
    doc.push(elements::Break::new(1.5));

    for ch in chapters {
        doc.push(
            elements::Paragraph::new(format!("{} ({})", ch.heading, ch.subheading))
                .styled(style::Style::new().bold().with_font_size(HEADING_SIZE)),
        );
        doc.push(elements::Break::new(0.5));
        for p in &ch.paragraphs {
            doc.push(
                elements::Paragraph::new(p.as_str())
                    .styled(style::Style::new().with_font_size(BODY_SIZE)),
            );
            doc.push(elements::Break::new(0.5));
        }
        // Fixed spacer between chapters.
        doc.push(elements::Break::new(1.5));
    }

    doc.render_to_file(path).map_err(|e| PdfError::Render {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a single TTF and use it for every style slot. The source material
/// ships only a regular face; bold runs are synthesized by the renderer from
/// the same data.
fn load_font_family(font_path: &Path) -> Result<fonts::FontFamily<fonts::FontData>, PdfError> {
    let data = std::fs::read(font_path).map_err(|e| PdfError::FontRead {
        path: font_path.to_path_buf(),
        source: e,
    })?;
    let font = fonts::FontData::new(data, None).map_err(|e| PdfError::FontLoad {
        path: font_path.to_path_buf(),
        source: e,
    })?;
    Ok(fonts::FontFamily {
        regular: font.clone(),
        bold: font.clone(),
        italic: font.clone(),
        bold_italic: font,
    })
}
