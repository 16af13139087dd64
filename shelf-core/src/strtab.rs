use crate::{Error, Result};

/// A string table section: NUL-terminated strings addressed by byte offset.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Resolves the string at `offset`.
    ///
    /// A string missing its terminator runs to the end of the table. Bytes that
    /// are not UTF-8 are replaced rather than rejected.
    pub(crate) fn get(&self, offset: u32) -> Result<String> {
        let start = offset as usize;
        if offset == 0 && self.data.is_empty() {
            return Ok(String::new());
        }
        let tail = self
            .data
            .get(start..)
            .filter(|tail| !tail.is_empty())
            .ok_or(Error::BadStringOffset {
                offset,
                table_size: self.data.len() as u64,
            })?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }
}
