//! Value body reader for `VALUE` blocks.
//!
//! After a `VALUE <key> <flags> <bytes> [<cas>]` header the peer sends exactly
//! `<bytes>` raw bytes followed by `\r\n`. The body is opaque: it may contain
//! `\r\n`, `END`, or anything else, so it is copied by length and never
//! scanned for terminators.

use bytes::{Buf, Bytes};

use crate::error::DecodeError;
use crate::line::LineAccumulator;
use crate::response::GetEntry;

/// One `VALUE` block whose body has not been fully received.
#[derive(Debug)]
pub(crate) struct PendingValue {
    key: Bytes,
    flags: u32,
    cas: u64,
    data: Vec<u8>,
    filled: usize,
}

impl PendingValue {
    /// Start reading a body of `size` bytes.
    pub(crate) fn new(key: Bytes, flags: u32, size: usize, cas: u64) -> Self {
        PendingValue {
            key,
            flags,
            cas,
            data: vec![0; size],
            filled: 0,
        }
    }

    /// Copy as much of the body as `buf` holds, then check the blank line
    /// that must follow it.
    ///
    /// Returns `true` once the body and its terminator are complete, `false`
    /// if more input is needed.
    pub(crate) fn read<B: Buf>(
        &mut self,
        buf: &mut B,
        line: &mut LineAccumulator,
        max_line_len: Option<usize>,
    ) -> Result<bool, DecodeError> {
        let wanted = self.data.len() - self.filled;
        let to_copy = wanted.min(buf.remaining());
        if to_copy > 0 {
            buf.copy_to_slice(&mut self.data[self.filled..self.filled + to_copy]);
            self.filled += to_copy;
            crate::metrics::VALUE_BYTES.add(to_copy as u64);
        }
        if self.filled < self.data.len() {
            return Ok(false);
        }

        match line.try_read_line(buf, max_line_len)? {
            None => Ok(false),
            Some([]) => Ok(true),
            Some(trailer) => Err(DecodeError::unexpected_trailer(trailer)),
        }
    }

    /// Bytes of the body received so far.
    pub(crate) fn filled(&self) -> usize {
        self.filled
    }

    pub(crate) fn into_entry(self) -> GetEntry {
        GetEntry {
            key: self.key,
            flags: self.flags,
            value: Bytes::from(self.data),
            cas: self.cas,
        }
    }
}
