//! Local page recognition with the tesseract CLI.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;

use docref_core::{Result, TextRecognizer, Tool};

/// Korean plus English.
pub const DEFAULT_LANGUAGES: &str = "kor+eng";

pub struct TesseractRecognizer {
    tool: Tool,
    languages: String,
    timeout: Duration,
}

impl TesseractRecognizer {
    /// Find `tesseract` on `PATH`.
    pub fn locate(languages: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::with_tool(Tool::find("tesseract")?, languages, timeout))
    }

    pub fn with_tool(tool: Tool, languages: &str, timeout: Duration) -> Self {
        Self {
            tool,
            languages: languages.to_string(),
            timeout,
        }
    }
}

fn tesseract_args(image: &Path, languages: &str) -> Vec<OsString> {
    vec![
        image.as_os_str().to_os_string(),
        "stdout".into(),
        "-l".into(),
        languages.into(),
    ]
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, png: &[u8], page: usize) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join(format!("page{:03}.png", page));
        fs::write(&image, png)?;

        let output = self
            .tool
            .run(tesseract_args(&image, &self.languages), self.timeout)?;
        Ok(output.stdout_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_write_to_stdout() {
        let args = tesseract_args(Path::new("/tmp/page001.png"), DEFAULT_LANGUAGES);
        assert_eq!(
            args,
            vec![
                OsString::from("/tmp/page001.png"),
                OsString::from("stdout"),
                OsString::from("-l"),
                OsString::from("kor+eng"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_surfaces_as_tool_error() {
        let recognizer = TesseractRecognizer::with_tool(
            Tool::at("tesseract", "/bin/false"),
            DEFAULT_LANGUAGES,
            Duration::from_secs(10),
        );
        let err = recognizer.recognize(b"png", 1).unwrap_err();
        assert!(matches!(err, docref_core::Error::ToolFailed { .. }));
    }
}
