//! Conversion of legacy files through a headless LibreOffice.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docref_core::{Error, Result, SourceFormat, Tool};

use crate::sniff::sniff_file;

/// Default macOS install location, not on `PATH`.
const MACOS_SOFFICE: &str = "/Applications/LibreOffice.app/Contents/MacOS/soffice";

/// Base name the source is copied under before conversion. LibreOffice
/// mangles some non-ASCII names, so the real name is never passed to it.
const WORK_STEM: &str = "input";

/// Turns a file into another format.
pub trait Converter {
    /// Convert `src` to `target`, returning the path of the new file.
    fn convert(&self, src: &Path, target: SourceFormat) -> Result<PathBuf>;
}

/// Converter backed by `soffice --headless --convert-to`.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    tool: Tool,
    timeout: Duration,
}

impl SofficeConverter {
    /// Find `soffice` (or `libreoffice`) on `PATH`, then in the macOS
    /// application bundle.
    pub fn locate(timeout: Duration) -> Result<Self> {
        let macos = Path::new(MACOS_SOFFICE);
        let tool = Tool::find_or("soffice", &[macos])
            .or_else(|_| Tool::find("libreoffice"))
            .map_err(|_| Error::MissingTool("soffice (LibreOffice)".to_string()))?;
        Ok(Self::with_tool(tool, timeout))
    }

    pub fn with_tool(tool: Tool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

impl Converter for SofficeConverter {
    fn convert(&self, src: &Path, target: SourceFormat) -> Result<PathBuf> {
        let work = tempfile::tempdir()?;
        let input = work.path().join(work_name(src, target));
        fs::copy(src, &input)?;

        log::debug!("converting {} to {}", src.display(), target);
        let output = self.tool.run_unchecked(
            soffice_args(target, work.path(), &input),
            self.timeout,
        )?;

        // The work copy never carries the target extension, so anything here
        // was written by soffice.
        let converted = work
            .path()
            .join(format!("{}.{}", WORK_STEM, target.extension()));
        if !converted.is_file() {
            let stderr = output.stderr_text();
            return Err(Error::Conversion(format!(
                "{} produced no .{} for {} ({})",
                self.tool.name(),
                target.extension(),
                src.display(),
                if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                }
            )));
        }

        let dest = dest_path(src, target);
        fs::copy(&converted, &dest)?;
        log::info!("converted {} -> {}", src.display(), dest.display());
        Ok(dest)
    }
}

/// Legacy format of `src`: its CFB streams first, then its extension.
fn legacy_format(src: &Path) -> Option<SourceFormat> {
    sniff_file(src)
        .ok()
        .or_else(|| {
            src.extension()
                .and_then(|e| e.to_str())
                .and_then(SourceFormat::from_extension)
        })
        .filter(SourceFormat::is_legacy)
}

/// ASCII name of the work copy, carrying the legacy extension when known
/// and never the target's.
fn work_name(src: &Path, target: SourceFormat) -> String {
    match legacy_format(src).filter(|f| *f != target) {
        Some(format) => format!("{}.{}", WORK_STEM, format.extension()),
        None => WORK_STEM.to_string(),
    }
}

/// `src` with the target extension; `<stem>_converted.<ext>` when that
/// would be `src` itself (a legacy file with a modern extension).
fn dest_path(src: &Path, target: SourceFormat) -> PathBuf {
    let dest = src.with_extension(target.extension());
    if dest != src {
        return dest;
    }
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| WORK_STEM.to_string());
    src.with_file_name(format!("{}_converted.{}", stem, target.extension()))
}

fn soffice_args(target: SourceFormat, outdir: &Path, input: &Path) -> Vec<OsString> {
    vec![
        "--headless".into(),
        "--convert-to".into(),
        target.extension().into(),
        "--outdir".into(),
        outdir.as_os_str().to_os_string(),
        input.as_os_str().to_os_string(),
    ]
}

/// Convert a legacy file to the format its extractor reads.
///
/// HWP goes to DOCX and falls back to PDF when that fails. Returns the new
/// path and the format it is in.
pub fn convert_legacy(
    converter: &dyn Converter,
    src: &Path,
    format: SourceFormat,
) -> Result<(PathBuf, SourceFormat)> {
    let target = format.conversion_target().ok_or_else(|| {
        Error::UnsupportedFormat(format!("{} does not need conversion", format))
    })?;

    match converter.convert(src, target) {
        Ok(path) => Ok((path, target)),
        Err(e) if format == SourceFormat::Hwp => {
            log::warn!("HWP to DOCX failed ({}), trying PDF", e);
            let path = converter.convert(src, SourceFormat::Pdf)?;
            Ok((path, SourceFormat::Pdf))
        }
        Err(e) => Err(e),
    }
}
