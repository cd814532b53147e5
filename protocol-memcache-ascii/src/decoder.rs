//! Resumable decoder for Memcache ASCII responses.
//!
//! The decoder is fed raw chunks as they arrive from the connection and emits
//! every response it can fully validate. Partial lines, partial value bodies
//! and an open multi-get are kept in the decoder until the next chunk.
//!
//! # Example
//!
//! ```
//! use protocol_memcache_ascii::{AsciiDecoder, Decode, Response, Status};
//!
//! let mut decoder = AsciiDecoder::new();
//!
//! // A reply split at an arbitrary point.
//! assert!(decoder.feed(b"VALUE mykey 0 5\r\nhel").unwrap().is_empty());
//! let responses = decoder.feed(b"lo\r\nEND\r\nSTORED\r\n").unwrap();
//!
//! let values = responses[0].clone().into_get_result().unwrap();
//! assert_eq!(values.get("mykey").unwrap().value.as_ref(), b"hello");
//! assert_eq!(responses[1], Response::Status(Status::Stored));
//! ```

use bytes::{Buf, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::line::LineAccumulator;
use crate::metrics;
use crate::response::{GetResult, Response, Status};
use crate::value::PendingValue;

/// A resumable decoder fed one chunk of input at a time.
pub trait Decode {
    type Item;
    type Error;

    /// Consume `chunk` and return every item it completes.
    ///
    /// State for anything left incomplete is kept until the next call.
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Self::Item>, Self::Error>;
}

/// Limits applied while decoding.
///
/// The defaults impose no limits. A peer that never terminates a line, or
/// announces a huge value, can then make the decoder buffer without bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum length of a single line, terminator excluded.
    pub max_line_len: Option<usize>,
    /// Maximum size of a value body announced by a `VALUE` header.
    pub max_value_len: Option<usize>,
}

impl DecoderOptions {
    /// Create options with no limits.
    pub const fn new() -> Self {
        Self {
            max_line_len: None,
            max_value_len: None,
        }
    }

    /// Set the maximum line length.
    pub const fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = Some(len);
        self
    }

    /// Set the maximum value length.
    pub const fn max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = Some(len);
        self
    }
}

/// What the decode loop does after handling one line.
enum Step {
    /// Keep draining buffered input.
    Continue,
    /// Hand control back to the caller.
    Stop,
}

/// Multi-get bookkeeping that outlives a single chunk.
#[derive(Debug, Default)]
struct DecoderState {
    /// A `VALUE` header was seen and no `END` has closed the sequence yet.
    multi_get: bool,
    /// Set exactly while a value body is being read.
    pending: Option<PendingValue>,
    /// The multi-get result under construction.
    result: GetResult,
}

impl DecoderState {
    fn finish_value(&mut self) {
        if let Some(value) = self.pending.take() {
            self.result.push(value.into_entry());
            metrics::GET_ENTRIES.increment();
        }
    }

    fn on_line(
        &mut self,
        line: &[u8],
        options: &DecoderOptions,
        out: &mut Vec<Response>,
    ) -> Result<Step, DecodeError> {
        let token_len = memchr::memchr(b' ', line).unwrap_or(line.len());
        if token_len == 0 {
            return Err(DecodeError::malformed_line(line));
        }

        let first = line[0];
        if first.is_ascii_digit() {
            if self.multi_get {
                return Err(DecodeError::malformed_line(line));
            }
            let value = parse_numeric(line)?;
            emit(out, Response::Numeric(value));
            return Ok(Step::Continue);
        }

        // Dispatch on (token length, first byte). No two keywords share both,
        // and each candidate is then compared in full.
        let status = match token_len {
            3 => {
                expect(line, b"END")?;
                self.multi_get = false;
                let result = std::mem::take(&mut self.result);
                tracing::trace!(entries = result.len(), "multi-get complete");
                emit(out, Response::Values(result));
                return Ok(Step::Stop);
            }
            5 => {
                if &line[..token_len] != b"VALUE" {
                    return Err(DecodeError::malformed_line(line));
                }
                let fields = line.get(token_len + 1..).unwrap_or_default();
                let value = parse_value_header(line, fields, options)?;
                self.multi_get = true;
                self.pending = Some(value);
                return Ok(Step::Continue);
            }
            // Only VALUE and END may appear inside a multi-get.
            _ if self.multi_get => return Err(DecodeError::malformed_line(line)),
            6 if first == b'S' => Status::Stored,
            6 => Status::Exists,
            7 if first == b'T' => Status::Touched,
            7 => Status::Deleted,
            9 => Status::NotFound,
            10 => Status::NotStored,
            _ => return Err(DecodeError::malformed_line(line)),
        };

        expect(line, status.keyword())?;
        emit(out, Response::Status(status));
        Ok(Step::Stop)
    }
}

/// Streaming decoder for the responses of one connection.
///
/// One instance belongs to one connection and is driven by whoever reads
/// that connection. After any error the decoder refuses further input with
/// [`DecodeError::Desynchronized`]; drop it together with the connection.
#[derive(Debug)]
pub struct AsciiDecoder {
    options: DecoderOptions,
    line: LineAccumulator,
    state: DecoderState,
    /// Input bytes a decode pass left unread, carried into the next feed.
    unread: BytesMut,
    failed: bool,
}

impl Default for AsciiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AsciiDecoder {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        AsciiDecoder {
            options,
            line: LineAccumulator::new(),
            state: DecoderState::default(),
            unread: BytesMut::new(),
            failed: false,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Returns true between a `VALUE` header and the `END` that closes it.
    #[inline]
    pub fn in_multi_get(&self) -> bool {
        self.state.multi_get
    }

    /// Returns true while a value body (or its trailing blank line) is
    /// still being read.
    #[inline]
    pub fn is_reading_value(&self) -> bool {
        self.state.pending.is_some()
    }

    /// Bytes held for incomplete input: the pending line, the received part
    /// of a pending value body, and any unread lookahead byte.
    pub fn buffered_len(&self) -> usize {
        let value = self.state.pending.as_ref().map_or(0, PendingValue::filled);
        self.line.pending_len() + value + self.unread.len()
    }

    /// Discard all partial state, including a previous failure.
    pub fn reset(&mut self) {
        self.line.clear();
        self.state = DecoderState::default();
        self.unread.clear();
        self.failed = false;
    }

    /// Feed a chunk and append the responses it completes to `out`.
    ///
    /// Responses decoded before an error in the same chunk stay in `out`.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<Response>) -> Result<(), DecodeError> {
        if self.unread.is_empty() {
            let mut buf = chunk;
            let result = self.drain(&mut buf, out);
            self.unread.extend_from_slice(buf);
            result
        } else {
            self.unread.extend_from_slice(chunk);
            let mut buf = std::mem::take(&mut self.unread);
            let result = self.drain(&mut buf, out);
            self.unread = buf;
            result
        }
    }

    /// Run decode passes until no further progress can be made.
    fn drain<B: Buf>(&mut self, buf: &mut B, out: &mut Vec<Response>) -> Result<(), DecodeError> {
        loop {
            let remaining = buf.remaining();
            let produced = out.len();
            self.decode(buf, out)?;
            if !buf.has_remaining() || (buf.remaining() == remaining && out.len() == produced) {
                return Ok(());
            }
        }
    }

    /// Run a single decode pass over a caller-owned buffer.
    ///
    /// The pass stops after a status line or a completed multi-get, when the
    /// input is exhausted, or when more data is needed. Numeric replies do not
    /// stop it. Unconsumed bytes (at most the final byte of an incomplete
    /// line) remain in `buf` and must be presented again on the next call.
    pub fn decode<B: Buf>(&mut self, buf: &mut B, out: &mut Vec<Response>) -> Result<(), DecodeError> {
        if self.failed {
            return Err(DecodeError::Desynchronized);
        }

        let result = self.decode_pass(buf, out);
        if let Err(e) = &result {
            self.failed = true;
            metrics::ERRORS.increment();
            tracing::debug!(error = %e, "memcache response stream desynchronized");
        }
        result
    }

    fn decode_pass<B: Buf>(
        &mut self,
        buf: &mut B,
        out: &mut Vec<Response>,
    ) -> Result<(), DecodeError> {
        let max_line_len = self.options.max_line_len;

        while buf.has_remaining() {
            if let Some(value) = &mut self.state.pending {
                if !value.read(buf, &mut self.line, max_line_len)? {
                    return Ok(());
                }
                self.state.finish_value();
                continue;
            }

            let line = match self.line.try_read_line(buf, max_line_len)? {
                Some(line) => line,
                None => return Ok(()),
            };

            match self.state.on_line(line, &self.options, out)? {
                Step::Continue => {}
                Step::Stop => return Ok(()),
            }
        }

        Ok(())
    }
}

impl Decode for AsciiDecoder {
    type Item = Response;
    type Error = DecodeError;

    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Response>, DecodeError> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out)?;
        Ok(out)
    }
}

#[inline]
fn emit(out: &mut Vec<Response>, response: Response) {
    metrics::RESPONSES.increment();
    out.push(response);
}

/// Require the whole line to equal `keyword`.
#[inline]
fn expect(line: &[u8], keyword: &[u8]) -> Result<(), DecodeError> {
    if line == keyword {
        Ok(())
    } else {
        Err(DecodeError::malformed_line(line))
    }
}

/// Parse `<key> <flags> <bytes> [<cas>]` from the fields after `VALUE `.
fn parse_value_header(
    line: &[u8],
    fields: &[u8],
    options: &DecoderOptions,
) -> Result<PendingValue, DecodeError> {
    let malformed = || DecodeError::malformed_line(line);
    let mut fields = fields.split(|&b| b == b' ');

    let key = fields
        .next()
        .filter(|key| !key.is_empty())
        .ok_or_else(malformed)?;
    let flags = fields
        .next()
        .and_then(parse_digits)
        .and_then(|flags| u32::try_from(flags).ok())
        .ok_or_else(malformed)?;
    let size = fields
        .next()
        .and_then(parse_digits)
        .and_then(|size| u32::try_from(size).ok())
        .ok_or_else(malformed)? as usize;
    let cas = match fields.next() {
        Some(cas) if !cas.is_empty() => parse_digits(cas).ok_or_else(malformed)?,
        _ => 0,
    };

    if let Some(limit) = options.max_value_len {
        if size > limit {
            return Err(DecodeError::ValueTooLarge { size, limit });
        }
    }

    Ok(PendingValue::new(
        Bytes::copy_from_slice(key),
        flags,
        size,
        cas,
    ))
}

/// Parse a non-empty run of ASCII digits, rejecting overflow.
fn parse_digits(field: &[u8]) -> Option<u64> {
    if field.is_empty() {
        return None;
    }
    field.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

/// Parse a numeric reply line as a signed 64-bit integer.
fn parse_numeric(line: &[u8]) -> Result<i64, DecodeError> {
    parse_digits(line)
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| DecodeError::malformed_numeric(line))
}
