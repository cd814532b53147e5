//! Client-side decoder for Memcache ASCII protocol responses.
//!
//! Responses arrive from the network in chunks that ignore protocol framing:
//! a line, its `\r\n` terminator, or a multi-megabyte value body may be split
//! anywhere. [`AsciiDecoder`] keeps whatever is incomplete between calls and
//! emits each response once it is fully received and validated.
//!
//! Correlating responses with outstanding requests, encoding requests and
//! managing connections are left to the caller.
//!
//! # Example
//!
//! ```
//! use protocol_memcache_ascii::{AsciiDecoder, Decode, Response, Status};
//!
//! let mut decoder = AsciiDecoder::new();
//!
//! let mut responses = Vec::new();
//! for chunk in [&b"STO"[..], b"RED\r", b"\n42\r\nEND\r\n"] {
//!     responses.extend(decoder.feed(chunk).unwrap());
//! }
//!
//! assert_eq!(responses[0], Response::Status(Status::Stored));
//! assert_eq!(responses[1], Response::Numeric(42));
//! assert!(responses[2].is_miss());
//! ```
//!
//! # Errors
//!
//! Every [`DecodeError`] means the two peers lost frame alignment. The decoder
//! does not try to resynchronize; the connection should be closed.

mod decoder;
mod error;
mod line;
pub mod metrics;
mod response;
mod value;

pub use decoder::{AsciiDecoder, Decode, DecoderOptions};
pub use error::DecodeError;
pub use response::{GetEntry, GetResult, Response, Status};
