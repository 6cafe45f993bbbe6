//! Page-by-page PDF extraction.

use std::fs;
use std::path::Path;

use docref_core::{
    finalize_unit, ContentNode, Document, ExtractOptions, ImageAsset, ImageRefNode, ImageWriter,
    RefType, Result, SourceFormat, TextNode, TextRecognizer, Unit, UnitKind,
};

use crate::poppler::{PageImage, Poppler};

/// Extracts PDFs with poppler and a text recognizer.
pub struct PdfExtractor {
    poppler: Poppler,
    recognizer: Box<dyn TextRecognizer>,
    dpi: u32,
}

impl PdfExtractor {
    pub fn new(poppler: Poppler, recognizer: Box<dyn TextRecognizer>, options: &ExtractOptions) -> Self {
        Self {
            poppler,
            recognizer,
            dpi: options.dpi,
        }
    }

    pub fn extract(&self, path: &Path, writer: &dyn ImageWriter) -> Result<Document> {
        let file_size = fs::metadata(path)?.len();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        let total = self.poppler.page_count(path)?;
        log::debug!("{}: {} pages, text by {}", filename, total, self.recognizer.name());

        let mut document = Document::new(filename, file_size, SourceFormat::Pdf);
        for page in 1..=total {
            log::debug!("page {}/{}", page, total);

            let images = match self.poppler.page_images(path, page) {
                Ok(images) => images,
                Err(e) => {
                    log::warn!("Skipping images of page {}: {}", page, e);
                    Vec::new()
                }
            };
            let png = self.poppler.render_page(path, page, self.dpi)?;
            let text = self.recognizer.recognize(&png, page)?;

            let mut unit = build_page(page, &text, &images, writer);
            finalize_unit(&mut unit, writer.dir());
            document.add_unit(unit);
        }
        Ok(document)
    }
}

/// Assemble a page unit: its text, then one image reference per image.
///
/// Images are written as `page{n:03}_img{k:02}.{ext}`; one that cannot be
/// written is left out.
pub fn build_page(number: usize, text: &str, images: &[PageImage], writer: &dyn ImageWriter) -> Unit {
    let mut unit = Unit::new(UnitKind::Page, number);

    let text = text.trim();
    if !text.is_empty() {
        unit.content.push(ContentNode::Text(TextNode::new(text)));
    }

    for (idx, image) in images.iter().enumerate() {
        let filename = format!("page{:03}_img{:02}.{}", number, idx + 1, image.extension);
        let size = match writer.write_image(&filename, &image.bytes) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("Failed to write image (page{}): {}", number, e);
                continue;
            }
        };
        unit.content
            .push(ContentNode::ImageRef(ImageRefNode::new(filename.clone())));
        unit.images.push(ImageAsset::new(
            number,
            filename,
            size,
            format!("page_{}_figure_{}", number, idx + 1),
            RefType::PagePosition,
        ));
    }
    unit
}
