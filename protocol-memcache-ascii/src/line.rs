//! CRLF line reassembly across arbitrary chunk boundaries.

use bytes::{Buf, BytesMut};

use crate::error::DecodeError;

/// Default initial capacity of the line buffer. Status and header lines are
/// short; the buffer grows if a peer sends something longer.
const INITIAL_CAPACITY: usize = 128;

/// Accumulates the bytes of one in-progress line.
///
/// A line may arrive split over any number of chunks, including between the
/// `\r` and `\n` of its terminator. The accumulator never consumes the final
/// byte of the input without a lookahead byte, so a trailing `\r` is left in
/// the buffer until its `\n` shows up.
#[derive(Debug)]
pub(crate) struct LineAccumulator {
    line: BytesMut,
    /// Set once a complete line was handed out; the next read starts fresh.
    consumed: bool,
}

impl LineAccumulator {
    pub(crate) fn new() -> Self {
        LineAccumulator {
            line: BytesMut::with_capacity(INITIAL_CAPACITY),
            consumed: false,
        }
    }

    /// Try to complete the current line from `buf`.
    ///
    /// Returns the line without its terminator once `\r\n` is seen, or `None`
    /// if the input ran out first. In the latter case everything scanned so far
    /// is kept and the caller must feed more data.
    pub(crate) fn try_read_line<B: Buf>(
        &mut self,
        buf: &mut B,
        max_line_len: Option<usize>,
    ) -> Result<Option<&[u8]>, DecodeError> {
        if self.consumed {
            self.line.clear();
            self.consumed = false;
        }

        while buf.remaining() > 1 {
            let chunk = buf.chunk();
            // Leave the last byte of the input unread: it may be a `\r` whose
            // `\n` has not arrived yet.
            let limit = chunk.len().min(buf.remaining() - 1);

            match memchr::memchr(b'\r', &chunk[..limit]) {
                Some(pos) => {
                    self.line.extend_from_slice(&chunk[..pos]);
                    buf.advance(pos + 1);
                    // pos < remaining - 1, so the lookahead byte exists.
                    if buf.get_u8() != b'\n' {
                        return Err(DecodeError::malformed_line(&self.line));
                    }
                    check_len(&self.line, max_line_len)?;
                    self.consumed = true;
                    return Ok(Some(&self.line[..]));
                }
                None => {
                    self.line.extend_from_slice(&chunk[..limit]);
                    buf.advance(limit);
                    check_len(&self.line, max_line_len)?;
                }
            }
        }

        Ok(None)
    }

    /// Number of bytes held for the line currently being assembled.
    pub(crate) fn pending_len(&self) -> usize {
        if self.consumed { 0 } else { self.line.len() }
    }

    pub(crate) fn clear(&mut self) {
        self.line.clear();
        self.consumed = false;
    }
}

#[inline]
fn check_len(line: &[u8], max_line_len: Option<usize>) -> Result<(), DecodeError> {
    match max_line_len {
        Some(limit) if line.len() > limit => Err(DecodeError::LineTooLong { limit }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(acc: &mut LineAccumulator, mut data: &[u8]) -> (Option<Vec<u8>>, usize) {
        let line = acc
            .try_read_line(&mut data, None)
            .unwrap()
            .map(|l| l.to_vec());
        (line, data.len())
    }

    #[test]
    fn test_complete_line() {
        let mut acc = LineAccumulator::new();
        let (line, left) = read_all(&mut acc, b"STORED\r\n");
        assert_eq!(line.as_deref(), Some(&b"STORED"[..]));
        assert_eq!(left, 0);
    }

    #[test]
    fn test_stops_after_first_line() {
        let mut acc = LineAccumulator::new();
        let (line, left) = read_all(&mut acc, b"END\r\nSTORED\r\n");
        assert_eq!(line.as_deref(), Some(&b"END"[..]));
        assert_eq!(left, 8);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut acc = LineAccumulator::new();
        assert_eq!(read_all(&mut acc, b"NOT_"), (None, 1));
        // The caller retains the unread byte and prepends it.
        assert_eq!(read_all(&mut acc, b"_FOU"), (None, 1));
        let (line, left) = read_all(&mut acc, b"UND\r\n");
        assert_eq!(line.as_deref(), Some(&b"NOT_FOUND"[..]));
        assert_eq!(left, 0);
    }

    #[test]
    fn test_trailing_cr_left_unread() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"END\r";
        assert!(acc.try_read_line(&mut data, None).unwrap().is_none());
        assert_eq!(data, b"\r");
        assert_eq!(acc.pending_len(), 3);

        let mut data: &[u8] = b"\r\n";
        let line = acc.try_read_line(&mut data, None).unwrap();
        assert_eq!(line, Some(&b"END"[..]));
        assert!(data.is_empty());
    }

    #[test]
    fn test_single_byte_never_consumed() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"X";
        assert!(acc.try_read_line(&mut data, None).unwrap().is_none());
        assert_eq!(data, b"X");
        assert_eq!(acc.pending_len(), 0);
    }

    #[test]
    fn test_resets_after_consumed_line() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"EXISTS\r\nDELETED\r\n";
        assert_eq!(
            acc.try_read_line(&mut data, None).unwrap(),
            Some(&b"EXISTS"[..])
        );
        assert_eq!(
            acc.try_read_line(&mut data, None).unwrap(),
            Some(&b"DELETED"[..])
        );
    }

    #[test]
    fn test_empty_line() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"\r\n";
        assert_eq!(acc.try_read_line(&mut data, None).unwrap(), Some(&b""[..]));
    }

    #[test]
    fn test_cr_without_lf() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"STO\rRED\r\n";
        assert_eq!(
            acc.try_read_line(&mut data, None),
            Err(DecodeError::MalformedLine("STO".to_string()))
        );
    }

    #[test]
    fn test_line_limit() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"0123456789";
        assert_eq!(
            acc.try_read_line(&mut data, Some(4)),
            Err(DecodeError::LineTooLong { limit: 4 })
        );

        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"0123\r\n";
        assert_eq!(
            acc.try_read_line(&mut data, Some(4)).unwrap(),
            Some(&b"0123"[..])
        );
    }

    #[test]
    fn test_non_contiguous_buf() {
        let mut acc = LineAccumulator::new();
        let mut data = (&b"TOUC"[..]).chain(&b"HED\r\nrest"[..]);
        assert_eq!(
            acc.try_read_line(&mut data, None).unwrap(),
            Some(&b"TOUCHED"[..])
        );
        assert_eq!(data.remaining(), 4);
    }

    #[test]
    fn test_clear() {
        let mut acc = LineAccumulator::new();
        let mut data: &[u8] = b"partial";
        assert!(acc.try_read_line(&mut data, None).unwrap().is_none());
        acc.clear();
        assert_eq!(acc.pending_len(), 0);
    }
}
