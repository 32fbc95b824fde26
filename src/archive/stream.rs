use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};

/// Independent byte stream over one extracted entry
///
/// Owns its data, so it stays readable after the reader that produced it is
/// closed.
#[derive(Debug)]
pub struct EntryStream {
    name: String,
    inner: Cursor<Vec<u8>>,
}

impl EntryStream {
    pub(crate) fn new(name: String, data: Vec<u8>) -> Self {
        Self {
            name,
            inner: Cursor::new(data),
        }
    }

    /// Entry path this stream was opened for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total entry size in bytes
    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for EntryStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Seek for EntryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
