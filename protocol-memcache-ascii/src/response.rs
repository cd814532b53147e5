//! Memcache ASCII response types.
//!
//! Response lines understood by the decoder:
//! - `STORED`, `NOT_STORED`, `EXISTS`, `DELETED`, `NOT_FOUND`, `TOUCHED`
//! - `<digits>` - INCR/DECR result
//! - `VALUE <key> <flags> <bytes> [<cas>]\r\n<data>\r\n ... END` - GET/GETS result

use bytes::{BufMut, Bytes};

/// Status replies that carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Stored,
    NotStored,
    Exists,
    Deleted,
    NotFound,
    Touched,
}

impl Status {
    /// Every status, in no particular order.
    pub const ALL: [Status; 6] = [
        Status::Stored,
        Status::NotStored,
        Status::Exists,
        Status::Deleted,
        Status::NotFound,
        Status::Touched,
    ];

    /// The wire keyword for this status, without the line terminator.
    #[inline]
    pub const fn keyword(self) -> &'static [u8] {
        match self {
            Status::Stored => b"STORED",
            Status::NotStored => b"NOT_STORED",
            Status::Exists => b"EXISTS",
            Status::Deleted => b"DELETED",
            Status::NotFound => b"NOT_FOUND",
            Status::Touched => b"TOUCHED",
        }
    }
}

/// A single value from a GET/GETS response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEntry {
    pub key: Bytes,
    /// Client-defined flags stored with the item.
    pub flags: u32,
    pub value: Bytes,
    /// CAS unique token; 0 when the server did not send one.
    pub cas: u64,
}

/// The values of one multi-get, in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResult {
    entries: Vec<GetEntry>,
}

impl GetResult {
    pub fn new() -> Self {
        GetResult::default()
    }

    pub(crate) fn push(&mut self, entry: GetEntry) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GetEntry> {
        self.entries.iter()
    }

    /// Look up the first entry for `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&GetEntry> {
        let key = key.as_ref();
        self.entries.iter().find(|e| e.key.as_ref() == key)
    }

    pub fn into_entries(self) -> Vec<GetEntry> {
        self.entries
    }
}

impl From<Vec<GetEntry>> for GetResult {
    fn from(entries: Vec<GetEntry>) -> Self {
        GetResult { entries }
    }
}

impl IntoIterator for GetResult {
    type Item = GetEntry;
    type IntoIter = std::vec::IntoIter<GetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a GetResult {
    type Item = &'a GetEntry;
    type IntoIter = std::slice::Iter<'a, GetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A decoded Memcache response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A keyword status line.
    Status(Status),
    /// Numeric reply from INCR/DECR.
    Numeric(i64),
    /// Values from GET/GETS, terminated by `END`. Empty on a full miss.
    Values(GetResult),
}

impl Response {
    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Status(status) => Some(*status),
            _ => None,
        }
    }

    #[inline]
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            Response::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_get_result(self) -> Option<GetResult> {
        match self {
            Response::Values(result) => Some(result),
            _ => None,
        }
    }

    /// Returns true if this represents a cache miss.
    #[inline]
    pub fn is_miss(&self) -> bool {
        match self {
            Response::Values(result) => result.is_empty(),
            Response::Status(Status::NotFound) => true,
            _ => false,
        }
    }

    // ========================================================================
    // Encoding (server side, fakes and tests)
    // ========================================================================

    /// Write the wire form of this response to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            Response::Status(status) => {
                buf.put_slice(status.keyword());
                buf.put_slice(b"\r\n");
            }
            Response::Numeric(n) => {
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            Response::Values(result) => {
                for entry in result {
                    encode_value(buf, entry);
                }
                buf.put_slice(b"END\r\n");
            }
        }
    }
}

impl From<Status> for Response {
    fn from(status: Status) -> Self {
        Response::Status(status)
    }
}

/// `VALUE <key> <flags> <bytes> [<cas>]\r\n<data>\r\n`. A zero CAS is omitted,
/// which decodes back to the same entry.
fn encode_value<B: BufMut>(buf: &mut B, entry: &GetEntry) {
    buf.put_slice(b"VALUE ");
    buf.put_slice(&entry.key);
    let header = if entry.cas != 0 {
        format!(" {} {} {}\r\n", entry.flags, entry.value.len(), entry.cas)
    } else {
        format!(" {} {}\r\n", entry.flags, entry.value.len())
    };
    buf.put_slice(header.as_bytes());
    buf.put_slice(&entry.value);
    buf.put_slice(b"\r\n");
}
