//! Paragraph style names from `word/styles.xml`.

use std::collections::HashMap;

use docref_ooxml::XmlElement;

/// Style name used when a document declares no default paragraph style.
pub const NORMAL_STYLE: &str = "Normal";

/// Built-in style names as stored in `styles.xml` and as shown to users.
const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("caption", "Caption"),
    ("footer", "Footer"),
    ("header", "Header"),
    ("heading 1", "Heading 1"),
    ("heading 2", "Heading 2"),
    ("heading 3", "Heading 3"),
    ("heading 4", "Heading 4"),
    ("heading 5", "Heading 5"),
    ("heading 6", "Heading 6"),
    ("heading 7", "Heading 7"),
    ("heading 8", "Heading 8"),
    ("heading 9", "Heading 9"),
    ("normal", "Normal"),
    ("subtitle", "Subtitle"),
    ("title", "Title"),
];

/// Paragraph style id → display name.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    names: HashMap<String, String>,
    default: Option<String>,
}

impl StyleMap {
    pub fn parse(styles: &XmlElement) -> Self {
        let mut map = Self::default();
        for style in styles.children_named("style") {
            if style.attr_local("type") != Some("paragraph") {
                continue;
            }
            let Some(id) = style.attr_local("styleId") else {
                continue;
            };
            let name = style
                .child("name")
                .and_then(|n| n.attr_local("val"))
                .map(display_name)
                .unwrap_or_else(|| id.to_string());

            if style.attr_local("default").is_some_and(|v| v == "1" || v == "true") {
                map.default = Some(name.clone());
            }
            map.names.insert(id.to_string(), name);
        }
        map
    }

    /// Style name of a `w:p`; unstyled paragraphs and unknown ids get the
    /// default paragraph style.
    pub fn paragraph_style(&self, paragraph: &XmlElement) -> String {
        paragraph
            .path(&["pPr", "pStyle"])
            .and_then(|s| s.attr_local("val"))
            .and_then(|id| self.names.get(id))
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or_else(|| NORMAL_STYLE.to_string())
    }
}

fn display_name(name: &str) -> String {
    BUILTIN_NAMES
        .iter()
        .find(|(stored, _)| *stored == name)
        .map(|(_, shown)| shown.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Heading level of a style named `Heading N`; 1 when `N` is unreadable.
pub fn heading_level(style: &str) -> Option<u32> {
    let rest = style.strip_prefix("Heading")?;
    Some(rest.trim().parse().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<w:styles xmlns:w="urn:w">
  <w:style w:type="paragraph" w:default="1" w:styleId="Standard"><w:name w:val="normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="Memo"><w:name w:val="Memo Text"/></w:style>
  <w:style w:type="character" w:styleId="Strong"><w:name w:val="Strong"/></w:style>
</w:styles>"#;

    fn paragraph(style: Option<&str>) -> XmlElement {
        let xml = match style {
            Some(id) => format!(
                r#"<w:p xmlns:w="urn:w"><w:pPr><w:pStyle w:val="{}"/></w:pPr></w:p>"#,
                id
            ),
            None => r#"<w:p xmlns:w="urn:w"/>"#.to_string(),
        };
        XmlElement::parse(&xml).unwrap()
    }

    #[test]
    fn test_style_names_resolved() {
        let styles = StyleMap::parse(&XmlElement::parse(STYLES).unwrap());
        assert_eq!(styles.paragraph_style(&paragraph(Some("Heading2"))), "Heading 2");
        assert_eq!(styles.paragraph_style(&paragraph(Some("Memo"))), "Memo Text");
        assert_eq!(styles.paragraph_style(&paragraph(None)), "Normal");
        assert_eq!(styles.paragraph_style(&paragraph(Some("Strong"))), "Normal");
    }

    #[test]
    fn test_missing_styles_fall_back_to_normal() {
        let styles = StyleMap::default();
        assert_eq!(styles.paragraph_style(&paragraph(Some("Heading1"))), NORMAL_STYLE);
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("Heading3"), Some(3));
        assert_eq!(heading_level("Heading"), Some(1));
        assert_eq!(heading_level("Heading Intro"), Some(1));
        assert_eq!(heading_level("Title"), None);
        assert_eq!(heading_level("heading 1"), None);
    }
}
