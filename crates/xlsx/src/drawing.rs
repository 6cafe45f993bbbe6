//! Pictures of a spreadsheet drawing part and the cells they are anchored to.

use docref_ooxml::XmlElement;

/// A picture placed on a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredPicture {
    /// 0-based `(row, col)` of the anchor's top-left cell; absolute
    /// anchors have none.
    pub from: Option<(u32, u32)>,
    /// Relationship id of the image in the drawing part.
    pub embed: String,
}

/// Pictures of an `xdr:wsDr`, in anchor order. Pictures inside grouped
/// shapes share their group's anchor.
pub fn anchored_pictures(drawing: &XmlElement) -> Vec<AnchoredPicture> {
    let mut pictures = Vec::new();
    for anchor in drawing.elements() {
        if !matches!(
            anchor.name.as_str(),
            "twoCellAnchor" | "oneCellAnchor" | "absoluteAnchor"
        ) {
            continue;
        }
        let from = anchor.child("from").and_then(marker_cell);

        for pic in anchor.find_all("pic") {
            let Some(embed) = pic.find("blip").and_then(|b| b.prefixed_attr("embed")) else {
                continue;
            };
            pictures.push(AnchoredPicture {
                from,
                embed: embed.to_string(),
            });
        }
    }
    pictures
}

fn marker_cell(marker: &XmlElement) -> Option<(u32, u32)> {
    let read = |name: &str| marker.child(name)?.text().trim().parse::<u32>().ok();
    Some((read("row")?, read("col")?))
}
