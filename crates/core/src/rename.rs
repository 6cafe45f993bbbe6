//! Descriptive image filenames derived from inferred references.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::normalize::{sanitize_for_filename, FILENAME_MAX_CHARS};
use crate::types::{asset_path, walk_mut, ContentNode, ImageAsset, UnitKind};

/// Stand-in for a reference that sanitizes to nothing.
pub const PLACEHOLDER: &str = "이미지";

/// Rename every asset of a unit after its reference.
///
/// The base name is `"{ref} 이미지_{label}{unit}"`; names already in `used`
/// get `_2`, `_3`, ... appended. Files are renamed inside `image_dir`; a
/// missing source file is tolerated. An asset whose file cannot be renamed
/// keeps its old name. Returns the old → new filename map.
pub fn rename_assets(
    images: &mut [ImageAsset],
    image_dir: &Path,
    kind: UnitKind,
    used: &mut HashSet<String>,
) -> HashMap<String, String> {
    let mut renames = HashMap::new();

    for image in images.iter_mut() {
        let mut sanitized = sanitize_for_filename(&image.reference, FILENAME_MAX_CHARS);
        if sanitized.is_empty() {
            sanitized = PLACEHOLDER.to_string();
        }
        let base = format!("{} 이미지_{}{}", sanitized, kind.label(), image.unit_id);

        let mut name = base.clone();
        let mut counter = 1;
        while used.contains(&name) {
            counter += 1;
            name = format!("{}_{}", base, counter);
        }
        used.insert(name.clone());

        let new_filename = match Path::new(&image.filename).extension() {
            Some(ext) => format!("{}.{}", name, ext.to_string_lossy()),
            None => name,
        };

        if new_filename != image.filename {
            let from = image_dir.join(&image.filename);
            let to = image_dir.join(&new_filename);
            match fs::rename(&from, &to) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("{} not on disk, renaming record only", from.display());
                }
                Err(e) => {
                    log::warn!(
                        "Failed to rename {} to {}: {}",
                        from.display(),
                        to.display(),
                        e
                    );
                    continue;
                }
            }
        }

        renames.insert(image.filename.clone(), new_filename.clone());
        image.path = asset_path(&new_filename);
        image.filename = new_filename;
    }

    renames
}

/// Point image and image-ref nodes at their renamed files.
pub fn apply_renames(content: &mut [ContentNode], renames: &HashMap<String, String>) {
    if renames.is_empty() {
        return;
    }
    walk_mut(content, &mut |node| {
        let filename = match node {
            ContentNode::Image(n) => &mut n.filename,
            ContentNode::ImageRef(n) => &mut n.filename,
            _ => return,
        };
        if let Some(new) = renames.get(filename.as_str()) {
            *filename = new.clone();
        }
    });
}
