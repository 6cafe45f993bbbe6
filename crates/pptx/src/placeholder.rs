//! Geometry inherited by placeholders that carry no transform of their own.
//!
//! A slide placeholder takes its position from the layout placeholder with
//! the same `idx`, and layouts in turn from the master placeholder of the
//! same type.

use std::collections::HashMap;

use docref_core::Rect;
use docref_ooxml::XmlElement;

/// The `<p:ph>` identity of a placeholder shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderKey {
    pub idx: u32,
    pub ph_type: String,
}

impl PlaceholderKey {
    /// Read the placeholder marker of `sp`/`pic`, if any.
    pub fn of(shape: &XmlElement) -> Option<Self> {
        let ph = shape
            .elements()
            .find(|e| e.name.starts_with("nv"))?
            .child("nvPr")?
            .child("ph")?;
        Some(Self {
            idx: ph.attr("idx").and_then(|v| v.parse().ok()).unwrap_or(0),
            ph_type: ph.attr("type").unwrap_or("obj").to_string(),
        })
    }

    /// Type used to match master placeholders.
    fn master_type(&self) -> &str {
        match self.ph_type.as_str() {
            "ctrTitle" | "title" => "title",
            "subTitle" | "obj" | "body" => "body",
            other => other,
        }
    }
}

/// Positions of the placeholders of one layout or master.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    by_idx: HashMap<u32, Rect>,
    by_type: HashMap<String, Rect>,
}

impl Placeholders {
    /// Collect placeholders with explicit geometry from a shape tree.
    pub fn collect(tree: &XmlElement) -> Self {
        let mut placeholders = Self::default();
        for shape in tree.elements().filter(|e| e.is("sp") || e.is("pic")) {
            let Some(key) = PlaceholderKey::of(shape) else {
                continue;
            };
            let Some(rect) = shape.path(&["spPr", "xfrm"]).and_then(xfrm_rect) else {
                continue;
            };
            placeholders.by_idx.entry(key.idx).or_insert(rect);
            placeholders
                .by_type
                .entry(key.master_type().to_string())
                .or_insert(rect);
        }
        placeholders
    }
}

/// Layout and master placeholders of a slide.
#[derive(Debug, Clone, Default)]
pub struct Inherited {
    pub layout: Placeholders,
    pub master: Placeholders,
}

impl Inherited {
    pub fn lookup(&self, key: &PlaceholderKey) -> Option<Rect> {
        self.layout
            .by_idx
            .get(&key.idx)
            .or_else(|| self.layout.by_type.get(key.master_type()))
            .or_else(|| self.master.by_type.get(key.master_type()))
            .copied()
    }
}

/// Rectangle of an `a:xfrm`/`p:xfrm` element from its `off` and `ext`.
pub fn xfrm_rect(xfrm: &XmlElement) -> Option<Rect> {
    let off = xfrm.child("off");
    let ext = xfrm.child("ext");
    if off.is_none() && ext.is_none() {
        return None;
    }
    let coord = |element: Option<&XmlElement>, name: &str| {
        element.and_then(|e| e.attr_f64(name)).unwrap_or(0.0)
    };
    Some(Rect::new(
        coord(off, "x"),
        coord(off, "y"),
        coord(ext, "cx"),
        coord(ext, "cy"),
    ))
}
