//! CLI tool for extracting text, tables and referenced images from documents.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use docref_core::types::{is_cfb, is_zip};
use docref_core::{
    write_markdown, Document, ExtractOptions, FsImageWriter, RetryPolicy, SourceFormat,
    TextRecognizer, IMAGE_DIR,
};
use docref_legacy::{convert_legacy, SofficeConverter};
use docref_pdf::{GeminiRecognizer, PdfExtractor, Poppler, TesseractRecognizer};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TEXTS_FILE: &str = "texts.json";

/// Page text recognizer for PDF input.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Ocr {
    /// Local tesseract
    Tesseract,
    /// Gemini generateContent API
    Gemini,
}

/// Extract text, tables and images (with what each image refers to) from
/// PPT(X), DOC(X), XLS(X), HWP and PDF files.
#[derive(Parser, Debug)]
#[command(name = "docref")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input document
    input: PathBuf,

    /// Output directory (default: <input stem>_extracted next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Text recognizer for PDF pages
    #[arg(long, value_enum, env = "DOCREF_OCR", default_value = "tesseract")]
    ocr: Ocr,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model
    #[arg(long, default_value = docref_pdf::DEFAULT_MODEL)]
    model: String,

    /// Page render resolution for recognition
    #[arg(long, default_value_t = docref_core::options::DEFAULT_DPI)]
    dpi: u32,

    /// Tesseract languages
    #[arg(long, default_value = docref_pdf::DEFAULT_LANGUAGES)]
    lang: String,

    /// Timeout for each external tool, in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Attempts per page when the recognition service is overloaded
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Delete files converted from legacy formats after extraction
    #[arg(long)]
    discard_converted: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .with_dpi(self.dpi)
            .with_tool_timeout(Duration::from_secs(self.timeout))
            .with_retry(RetryPolicy::new(self.max_retries, Duration::from_secs(1)))
            .with_keep_converted(!self.discard_converted)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let input = &args.input;
    if !input.is_file() {
        bail!("File not found: {}", input.display());
    }

    // Unsupported input is rejected before anything is written.
    let format = detect_format(input)?;
    let output_dir = output_dir(input, args.output.as_deref());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    eprintln!("Input:  {}", input.display());
    eprintln!("Output: {}", output_dir.display());
    eprintln!("Format: {}", format);

    let options = args.options();
    let document = process_file(input, format, &args, &options, &output_dir)?;

    let texts_path = output_dir.join(TEXTS_FILE);
    write_document(&texts_path, &document)?;
    let markdown_dir = write_markdown(&output_dir, &document)
        .with_context(|| format!("Failed to write Markdown under {}", output_dir.display()))?;

    let image_count = document.images().count();
    eprintln!("Done: {} unit(s), {} image(s)", document.units.len(), image_count);
    eprintln!("  json:     {}", texts_path.display());
    eprintln!("  markdown: {}", markdown_dir.display());
    eprintln!("  images:   {}", output_dir.join(IMAGE_DIR).display());

    Ok(())
}

/// Extract one document, converting legacy formats first.
fn process_file(
    input: &Path,
    format: SourceFormat,
    args: &Args,
    options: &ExtractOptions,
    output_dir: &Path,
) -> Result<Document> {
    let writer = FsImageWriter::new(output_dir.join(IMAGE_DIR))
        .with_context(|| format!("Failed to create image directory in {}", output_dir.display()))?;

    if !format.is_legacy() {
        return extract(input, format, args, options, &writer);
    }

    let converter = SofficeConverter::locate(options.tool_timeout)
        .context("LibreOffice is required for legacy formats")?;
    let (converted, converted_format) = convert_legacy(&converter, input, format)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    if args.verbose {
        eprintln!("Converted to: {}", converted.display());
    }

    let result = extract(&converted, converted_format, args, options, &writer);

    if !options.keep_converted {
        discard_converted(&converted, input);
    }

    // Report the file the user gave us, not the intermediate.
    let mut document = result?;
    document.metadata.filename = file_name(input);
    document.metadata.format = format;
    Ok(document)
}

/// Remove an intermediate file, refusing anything that is the input itself.
fn discard_converted(converted: &Path, input: &Path) -> bool {
    if same_file(converted, input) {
        log::warn!("Not removing {}: it is the input file", converted.display());
        return false;
    }
    match fs::remove_file(converted) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to remove {}: {}", converted.display(), e);
            false
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn extract(
    path: &Path,
    format: SourceFormat,
    args: &Args,
    options: &ExtractOptions,
    writer: &FsImageWriter,
) -> Result<Document> {
    let document = match format {
        SourceFormat::Pptx => {
            log::debug!("Parsing as PPTX");
            docref_pptx::extract_pptx(path, writer)?
        }
        SourceFormat::Docx => {
            log::debug!("Parsing as DOCX");
            docref_docx::extract_docx(path, writer)?
        }
        SourceFormat::Xlsx => {
            log::debug!("Parsing as XLSX");
            docref_xlsx::extract_xlsx(path, writer)?
        }
        SourceFormat::Pdf => {
            log::debug!("Parsing as PDF with {:?}", args.ocr);
            let poppler = Poppler::locate(options.tool_timeout)
                .context("poppler-utils (pdfinfo, pdfimages, pdftoppm) are required for PDF")?;
            let recognizer = recognizer(args, options)?;
            PdfExtractor::new(poppler, recognizer, options).extract(path, writer)?
        }
        legacy => bail!("{} must be converted before extraction", legacy),
    };
    Ok(document)
}

fn recognizer(args: &Args, options: &ExtractOptions) -> Result<Box<dyn TextRecognizer>> {
    let recognizer: Box<dyn TextRecognizer> = match args.ocr {
        Ocr::Tesseract => Box::new(
            TesseractRecognizer::locate(&args.lang, options.tool_timeout)
                .context("tesseract is required for --ocr tesseract")?,
        ),
        Ocr::Gemini => {
            let Some(api_key) = args.api_key.as_deref().filter(|k| !k.is_empty()) else {
                bail!("--ocr gemini needs an API key (--api-key or GEMINI_API_KEY)");
            };
            Box::new(GeminiRecognizer::new(api_key, &args.model, options.retry)?)
        }
    };
    Ok(recognizer)
}

/// Detect the format from the file's contents, then its extension.
fn detect_format(path: &Path) -> Result<SourceFormat> {
    let mut header = Vec::with_capacity(8);
    File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .take(8)
        .read_to_end(&mut header)
        .with_context(|| "Failed to read file header")?;

    let from_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(SourceFormat::from_extension);

    let sniffed = if is_zip(&header) {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        docref_ooxml::detect_package(&bytes)
    } else if is_cfb(&header) {
        match docref_legacy::sniff_file(path) {
            Ok(format) => Some(format),
            Err(e) => {
                log::debug!("CFB sniffing failed: {}", e);
                None
            }
        }
    } else {
        SourceFormat::from_magic(&header)
    };

    if let (Some(sniffed), Some(ext)) = (sniffed, from_extension) {
        if sniffed != ext {
            log::warn!(
                "{} looks like {} despite its .{} extension",
                path.display(),
                sniffed,
                ext
            );
        }
    }

    sniffed.or(from_extension).ok_or_else(|| {
        anyhow::anyhow!(
            "Unsupported format: {} (supported: {})",
            path.display(),
            SourceFormat::SUPPORTED_EXTENSIONS.join(", ")
        )
    })
}

/// `-o` when given, else `<stem>_extracted` beside the input.
fn output_dir(input: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(dir) = output {
        return dir.to_path_buf();
    }
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let name = format!("{}_extracted", stem);
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Write the document as pretty JSON, keeping non-ASCII text as is.
fn write_document(path: &Path, document: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("Failed to serialize document")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
