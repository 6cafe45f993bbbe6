//! `[Content_Types].xml`: the declared media type of each part.

use std::collections::HashMap;

use docref_core::Result;

use crate::xml::XmlElement;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Default (by extension) and override (by part name) content types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let root = XmlElement::parse(xml)?;
        let mut types = Self::default();

        for element in root.elements() {
            let Some(content_type) = element.attr("ContentType") else {
                continue;
            };
            if element.is("Default") {
                if let Some(ext) = element.attr("Extension") {
                    types
                        .defaults
                        .insert(ext.to_ascii_lowercase(), content_type.to_string());
                }
            } else if element.is("Override") {
                if let Some(part) = element.attr("PartName") {
                    types.overrides.insert(
                        part.trim_start_matches('/').to_string(),
                        content_type.to_string(),
                    );
                }
            }
        }

        Ok(types)
    }

    /// Content type of a part (`ppt/media/image1.png`), falling back to a
    /// guess from the extension.
    pub fn content_type(&self, part: &str) -> String {
        if let Some(ct) = self.overrides.get(part.trim_start_matches('/')) {
            return ct.clone();
        }
        let ext = extension(part);
        self.defaults
            .get(&ext)
            .cloned()
            .unwrap_or_else(|| guess_from_extension(&ext).to_string())
    }
}

fn extension(part: &str) -> String {
    part.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Media type for common image extensions.
pub fn guess_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="JPEG" ContentType="image/jpeg"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/ppt/media/image9.bin" ContentType="image/gif"/>
</Types>"#;

    #[test]
    fn test_lookup_order() {
        let types = ContentTypes::parse(TYPES).unwrap();
        assert_eq!(types.content_type("ppt/media/image1.png"), "image/png");
        assert_eq!(types.content_type("ppt/media/image2.jpeg"), "image/jpeg");
        assert_eq!(types.content_type("/ppt/media/image9.bin"), "image/gif");
        assert_eq!(types.content_type("ppt/media/image3.tif"), "image/tiff");
        assert_eq!(
            types.content_type("ppt/media/blob"),
            "application/octet-stream"
        );
    }
}
