//! Telling legacy OLE/CFB containers apart by their streams.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use docref_core::{Error, Result, SourceFormat};

/// Top-level stream (or storage) that identifies each format.
const MARKERS: &[(&str, SourceFormat)] = &[
    ("/PowerPoint Document", SourceFormat::Ppt),
    ("/WordDocument", SourceFormat::Doc),
    ("/Workbook", SourceFormat::Xls),
    ("/Book", SourceFormat::Xls),
    // HWP 5.x keeps its header in a `FileHeader` stream next to `BodyText`.
    ("/FileHeader", SourceFormat::Hwp),
];

/// Identify the format of a CFB container.
pub fn sniff_cfb<R: Read + Seek>(reader: R) -> Result<SourceFormat> {
    let cfb = CompoundFile::open(reader)
        .map_err(|e| Error::CorruptedFile(format!("Failed to open CFB container: {}", e)))?;

    let entries: Vec<String> = cfb
        .walk()
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    log::debug!("CFB entries: {:?}", entries);

    classify(&entries).ok_or_else(|| {
        Error::UnsupportedFormat(
            "CFB container without a PowerPoint, Word, Excel or HWP stream".to_string(),
        )
    })
}

/// Open `path` and identify it as a CFB container.
pub fn sniff_file(path: &Path) -> Result<SourceFormat> {
    let file = File::open(path)?;
    sniff_cfb(BufReader::new(file))
}

fn classify(entries: &[String]) -> Option<SourceFormat> {
    MARKERS
        .iter()
        .find(|(marker, _)| entries.iter().any(|e| e == marker))
        .map(|(_, format)| *format)
}

/// Bytes of a CFB container holding the given (small) streams.
#[cfg(test)]
pub(crate) fn cfb_bytes(streams: &[&str]) -> Vec<u8> {
    use std::io::{Cursor, Write};

    let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    for name in streams {
        let mut stream = cfb.create_stream(name).unwrap();
        stream.write_all(b"\x00\x01\x02\x03").unwrap();
    }
    cfb.flush().unwrap();
    cfb.into_inner().into_inner()
}
