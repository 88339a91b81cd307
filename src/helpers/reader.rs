use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// Byte source for the two structured reader strategies.
///
/// The strict strategy parses straight from the file handle; the streamed
/// strategy slurps the file into memory first and parses from the buffer, so
/// a reader that chokes on seeky file access still gets a second chance.
pub(crate) enum SourceReader {
    /// Buffered file handle
    Direct(BufReader<File>),
    /// In-memory byte buffer
    Buffered(Cursor<Vec<u8>>),
}

impl SourceReader {
    /// Opens the file for direct, handle-backed reading.
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> std::io::Result<SourceReader> {
        let file = File::open(path)?;
        Ok(SourceReader::Direct(BufReader::new(file)))
    }

    /// Reads the whole file into memory and serves it from a cursor.
    pub(crate) fn buffered<P: AsRef<Path>>(path: P) -> std::io::Result<SourceReader> {
        let bytes = std::fs::read(path)?;
        Ok(SourceReader::Buffered(Cursor::new(bytes)))
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::Direct(reader) => reader.read(buf),
            SourceReader::Buffered(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::Direct(reader) => reader.seek(pos),
            SourceReader::Buffered(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_fails() {
        assert!(SourceReader::open("no_such_file.xlsx").is_err());
        assert!(SourceReader::buffered("no_such_file.xlsx").is_err());
    }

    #[test]
    fn buffered_reads_whole_content() {
        let mut reader = SourceReader::buffered("Cargo.toml").expect("read Cargo.toml");
        let mut content = String::new();
        reader.read_to_string(&mut content).expect("utf-8 content");
        assert!(content.contains("sheetloader"));
    }
}
