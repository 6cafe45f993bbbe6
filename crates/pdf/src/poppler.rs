//! poppler-utils: page count, embedded images and page rendering.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::time::Duration;

use docref_core::{Error, Result, Tool};

/// An image as written by `pdfimages -all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    /// Extension chosen by pdfimages (`jpg`, `png`, `jp2`, ...).
    pub extension: String,
}

/// The poppler programs used for PDF input.
#[derive(Debug, Clone)]
pub struct Poppler {
    pdfinfo: Tool,
    pdfimages: Tool,
    pdftoppm: Tool,
    timeout: Duration,
}

impl Poppler {
    /// Find all three tools on `PATH`.
    pub fn locate(timeout: Duration) -> Result<Self> {
        Ok(Self {
            pdfinfo: Tool::find("pdfinfo")?,
            pdfimages: Tool::find("pdfimages")?,
            pdftoppm: Tool::find("pdftoppm")?,
            timeout,
        })
    }

    pub fn page_count(&self, pdf: &Path) -> Result<usize> {
        let output = self.pdfinfo.run([pdf.as_os_str()], self.timeout)?;
        parse_page_count(&output.stdout_text())
            .ok_or_else(|| Error::CorruptedFile(format!("no page count for {}", pdf.display())))
    }

    /// Embedded images of one page (1-based), masks excluded, in the order
    /// pdfimages numbers them.
    pub fn page_images(&self, pdf: &Path, page: usize) -> Result<Vec<PageImage>> {
        let page_arg = page.to_string();
        let range = [
            OsStr::new("-f"),
            OsStr::new(&page_arg),
            OsStr::new("-l"),
            OsStr::new(&page_arg),
        ];

        let mut list_args = vec![OsStr::new("-list")];
        list_args.extend(range);
        list_args.push(pdf.as_os_str());
        let listing = self.pdfimages.run(list_args, self.timeout)?;
        let kinds = parse_image_list(&listing.stdout_text());

        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("img");
        let mut extract_args = vec![OsStr::new("-all")];
        extract_args.extend(range);
        extract_args.push(pdf.as_os_str());
        extract_args.push(prefix.as_os_str());
        self.pdfimages.run(extract_args, self.timeout)?;

        let mut numbered = Vec::new();
        for entry in fs::read_dir(dir.path())? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((num, extension)) = parse_image_filename(name) else {
                log::debug!("Ignoring unexpected pdfimages output {}", name);
                continue;
            };
            let is_mask = kinds
                .iter()
                .any(|(n, kind)| *n == num && (kind == "smask" || kind == "mask"));
            if is_mask {
                continue;
            }
            numbered.push((num, path.clone(), extension));
        }
        numbered.sort_by_key(|(num, _, _)| *num);

        let mut images = Vec::with_capacity(numbered.len());
        for (_, path, extension) in numbered {
            match fs::read(&path) {
                Ok(bytes) => images.push(PageImage { bytes, extension }),
                Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
            }
        }
        Ok(images)
    }

    /// Render one page (1-based) as PNG.
    pub fn render_page(&self, pdf: &Path, page: usize, dpi: u32) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("page");
        let page_arg = page.to_string();
        let dpi_arg = dpi.to_string();

        self.pdftoppm.run(
            [
                OsStr::new("-r"),
                OsStr::new(&dpi_arg),
                OsStr::new("-png"),
                OsStr::new("-f"),
                OsStr::new(&page_arg),
                OsStr::new("-l"),
                OsStr::new(&page_arg),
                OsStr::new("-singlefile"),
                pdf.as_os_str(),
                root.as_os_str(),
            ],
            self.timeout,
        )?;

        Ok(fs::read(root.with_extension("png"))?)
    }
}

/// `Pages:` line of pdfinfo output.
pub fn parse_page_count(info: &str) -> Option<usize> {
    info.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|count| count.trim().parse().ok())
    })
}

/// `(num, type)` rows of `pdfimages -list`.
pub fn parse_image_list(listing: &str) -> Vec<(usize, String)> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _page: usize = columns.next()?.parse().ok()?;
            let num: usize = columns.next()?.parse().ok()?;
            let kind = columns.next()?;
            Some((num, kind.to_string()))
        })
        .collect()
}

/// `img-003.jpg` → `(3, "jpg")`.
fn parse_image_filename(name: &str) -> Option<(usize, String)> {
    let (stem, extension) = name.rsplit_once('.')?;
    let num = stem.strip_prefix("img-")?.parse().ok()?;
    Some((num, extension.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        let info = "Title:          Report\nProducer:       x\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(info), Some(12));
        assert_eq!(parse_page_count("Title: nothing"), None);
    }

    #[test]
    fn test_image_list() {
        let listing = "\
page   num  type   width height color comp bpc  enc interp  object ID x-ppi y-ppi size ratio
--------------------------------------------------------------------------------------------
   3     0 image    1024   768  rgb     3   8  jpeg   no        12  0    72    72  120K 5.2%
   3     1 smask    1024   768  gray    1   8  image  no        13  0    72    72 1024B 0.1%
   3     2 image     200   100  rgb     3   8  image  no        14  0    72    72  10K  1.0%
";
        assert_eq!(
            parse_image_list(listing),
            vec![
                (0, "image".to_string()),
                (1, "smask".to_string()),
                (2, "image".to_string()),
            ]
        );
    }

    #[test]
    fn test_image_filename() {
        assert_eq!(parse_image_filename("img-003.JPG"), Some((3, "jpg".into())));
        assert_eq!(parse_image_filename("img-010.png"), Some((10, "png".into())));
        assert_eq!(parse_image_filename("page.png"), None);
        assert_eq!(parse_image_filename("img-003"), None);
    }
}
