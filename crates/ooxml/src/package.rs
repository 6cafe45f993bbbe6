//! Zip-backed OOXML package.

use std::io::{Cursor, Read, Seek};

use docref_core::{Error, Result, SourceFormat};
use zip::ZipArchive;

use crate::content_types::{ContentTypes, CONTENT_TYPES_PART};
use crate::rels::{rels_path_for, Relationships};
use crate::xml::XmlElement;

/// An opened OOXML package.
pub struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::Package(format!("Failed to open ZIP: {}", e)))?;
        Ok(Self { archive })
    }

    pub fn has_part(&self, path: &str) -> bool {
        self.archive.file_names().any(|name| name == path)
    }

    /// All part names, in archive order.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read a file from the ZIP archive as bytes.
    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|e| Error::Package(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut content)
            .map_err(|e| Error::Package(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Read a file from the ZIP archive as text.
    pub fn read_string(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Package(format!("'{}' is not valid UTF-8: {}", path, e)))
    }

    pub fn read_xml(&mut self, path: &str) -> Result<XmlElement> {
        let content = self.read_string(path)?;
        XmlElement::parse(&content)
    }

    /// Relationships of `part`; a part without a rels file has none.
    pub fn read_rels(&mut self, part: &str) -> Result<Relationships> {
        let rels_path = rels_path_for(part);
        if !self.has_part(&rels_path) {
            return Ok(Relationships::default());
        }
        Relationships::parse(&self.read_string(&rels_path)?)
    }

    /// Declared content types; a package without them gets extension guesses.
    pub fn content_types(&mut self) -> ContentTypes {
        match self.read_string(CONTENT_TYPES_PART) {
            Ok(xml) => ContentTypes::parse(&xml).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable {}: {}", CONTENT_TYPES_PART, e);
                ContentTypes::default()
            }),
            Err(_) => ContentTypes::default(),
        }
    }
}

/// Most bytes reserved up front for a part; the declared size is untrusted.
const MAX_PREALLOC: usize = 1 << 20;

fn initial_capacity(declared_size: u64) -> usize {
    usize::try_from(declared_size).map_or(MAX_PREALLOC, |size| size.min(MAX_PREALLOC))
}

/// Identify an OOXML package from its main part.
pub fn detect_package(bytes: &[u8]) -> Option<SourceFormat> {
    let package = Package::open(Cursor::new(bytes)).ok()?;
    if package.has_part("ppt/presentation.xml") {
        Some(SourceFormat::Pptx)
    } else if package.has_part("word/document.xml") {
        Some(SourceFormat::Docx)
    } else if package.has_part("xl/workbook.xml") {
        Some(SourceFormat::Xlsx)
    } else {
        None
    }
}
