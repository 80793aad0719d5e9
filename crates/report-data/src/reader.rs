//! Streaming access to the gzip-compressed activity log.
//!
//! The archive is decoded incrementally and handed out one line at a time, so
//! memory use does not depend on the size of the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use report_core::error::{RecordError, ReportError, Result};
use tracing::debug;

/// Line source produced by [`open_archive`].
pub type ArchiveReader = BufReader<MultiGzDecoder<File>>;

// ── ArchiveLine ───────────────────────────────────────────────────────────────

/// One raw line from the archive, terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLine {
    /// 1-based line number within the decompressed stream.
    pub number: u64,
    pub bytes: Vec<u8>,
}

impl ArchiveLine {
    /// The line as text, or [`RecordError::InvalidEncoding`] when the bytes
    /// are not UTF-8.
    pub fn text(&self) -> std::result::Result<&str, RecordError> {
        std::str::from_utf8(&self.bytes).map_err(|_| RecordError::InvalidEncoding {
            line_number: self.number,
        })
    }
}

// ── ArchiveLines ──────────────────────────────────────────────────────────────

/// Iterator over the lines of a decompressed stream.
///
/// Yields `Err` once if the underlying reader fails (corrupt archive,
/// truncated stream, I/O error) and stops afterwards.
pub struct ArchiveLines<R> {
    reader: R,
    path: PathBuf,
    line_number: u64,
    failed: bool,
}

impl<R: BufRead> ArchiveLines<R> {
    /// Wrap an already-decoded reader. `path` is only used in error messages.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            line_number: 0,
            failed: false,
        }
    }

    /// Number of lines handed out so far.
    pub fn lines_read(&self) -> u64 {
        self.line_number
    }
}

impl<R: BufRead> Iterator for ArchiveLines<R> {
    type Item = Result<ArchiveLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => None,
            Ok(_) => {
                if bytes.last() == Some(&b'\n') {
                    bytes.pop();
                }
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                self.line_number += 1;
                Some(Ok(ArchiveLine {
                    number: self.line_number,
                    bytes,
                }))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(ReportError::ArchiveRead {
                    path: self.path.clone(),
                    source,
                }))
            }
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Open a gzip archive for line-by-line reading.
///
/// Existence is checked up front so that a missing file is reported as
/// [`ReportError::ArchiveNotFound`] before anything is decoded.
pub fn open_archive(path: &Path) -> Result<ArchiveLines<ArchiveReader>> {
    if !path.is_file() {
        return Err(ReportError::ArchiveNotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| ReportError::ArchiveRead {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Opened archive {}", path.display());

    Ok(ArchiveLines::new(
        BufReader::new(MultiGzDecoder::new(file)),
        path,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_gz(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn collect_text(lines: impl Iterator<Item = Result<ArchiveLine>>) -> Vec<String> {
        lines
            .map(|l| l.unwrap().text().unwrap().to_string())
            .collect()
    }

    // ── open_archive ──────────────────────────────────────────────────────────

    #[test]
    fn test_open_archive_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.txt.gz");
        let err = open_archive(&path).err().unwrap();
        assert!(matches!(err, ReportError::ArchiveNotFound(p) if p == path));
    }

    #[test]
    fn test_open_archive_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = open_archive(dir.path()).err().unwrap();
        assert!(matches!(err, ReportError::ArchiveNotFound(_)));
    }

    #[test]
    fn test_open_archive_reads_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(
            dir.path(),
            "data.txt.gz",
            b"user,0,Leida,Cira,0\nsession,0,0,Safari 29,87,2016-10-23\n",
        );

        let lines = collect_text(open_archive(&path).unwrap());
        assert_eq!(
            lines,
            vec!["user,0,Leida,Cira,0", "session,0,0,Safari 29,87,2016-10-23"]
        );
    }

    #[test]
    fn test_open_archive_without_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(dir.path(), "data.txt.gz", b"a\nb");
        assert_eq!(collect_text(open_archive(&path).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_open_archive_multi_member() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("multi.gz");
        let file = File::create(&path).unwrap();

        let mut first = GzEncoder::new(file, Compression::default());
        first.write_all(b"first\n").unwrap();
        let file = first.finish().unwrap();
        let mut second = GzEncoder::new(file, Compression::default());
        second.write_all(b"second\n").unwrap();
        second.finish().unwrap();

        assert_eq!(
            collect_text(open_archive(&path).unwrap()),
            vec!["first", "second"]
        );
    }

    #[test]
    fn test_corrupt_archive_yields_single_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.gz");
        std::fs::write(&path, b"this is not gzip at all").unwrap();

        let mut lines = open_archive(&path).unwrap();
        let first = lines.next().unwrap();
        assert!(matches!(first, Err(ReportError::ArchiveRead { .. })));
        assert!(lines.next().is_none());
    }

    // ── ArchiveLines ──────────────────────────────────────────────────────────

    #[test]
    fn test_lines_strip_crlf_and_number_from_one() {
        let lines: Vec<ArchiveLine> = ArchiveLines::new(Cursor::new(b"a\r\n\r\nb\n".to_vec()), "mem")
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].bytes, b"a");
        assert!(lines[1].bytes.is_empty());
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn test_invalid_utf8_line_reports_encoding_error() {
        let mut lines = ArchiveLines::new(Cursor::new(b"ok\n\xff\xfe\n".to_vec()), "mem");
        assert_eq!(lines.next().unwrap().unwrap().text().unwrap(), "ok");

        let bad = lines.next().unwrap().unwrap();
        assert_eq!(
            bad.text().unwrap_err(),
            RecordError::InvalidEncoding { line_number: 2 }
        );
        assert_eq!(lines.lines_read(), 2);
    }
}
