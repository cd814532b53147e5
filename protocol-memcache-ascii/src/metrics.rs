//! Decoder metrics.
//!
//! Process-wide counters shared by every decoder instance. Exposed through
//! whatever metriken exporter the application registers.

use metriken::{Counter, metric};

#[metric(
    name = "memcache_ascii/decoder/responses",
    description = "Responses decoded"
)]
pub static RESPONSES: Counter = Counter::new();

#[metric(
    name = "memcache_ascii/decoder/get_entries",
    description = "VALUE blocks decoded into multi-get results"
)]
pub static GET_ENTRIES: Counter = Counter::new();

#[metric(
    name = "memcache_ascii/decoder/value_bytes",
    description = "Value body bytes received"
)]
pub static VALUE_BYTES: Counter = Counter::new();

#[metric(
    name = "memcache_ascii/decoder/errors",
    description = "Protocol errors that desynchronized a decoder"
)]
pub static ERRORS: Counter = Counter::new();
