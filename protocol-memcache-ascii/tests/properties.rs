//! Property tests: decoding must not depend on how the stream is chunked.

use bytes::Bytes;
use proptest::prelude::*;
use protocol_memcache_ascii::{AsciiDecoder, Decode, GetEntry, GetResult, Response, Status};

fn status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

fn entry() -> impl Strategy<Value = GetEntry> {
    (
        "[a-zA-Z0-9_:.-]{1,32}",
        any::<u32>(),
        // Arbitrary bytes, so bodies regularly contain `\r`, `\n` and spaces.
        prop::collection::vec(any::<u8>(), 0..300),
        prop_oneof![Just(0u64), any::<u64>()],
    )
        .prop_map(|(key, flags, value, cas)| GetEntry {
            key: Bytes::from(key),
            flags,
            value: Bytes::from(value),
            cas,
        })
}

fn response() -> impl Strategy<Value = Response> {
    prop_oneof![
        status().prop_map(Response::Status),
        (0..=i64::MAX).prop_map(Response::Numeric),
        prop::collection::vec(entry(), 0..5).prop_map(|e| Response::Values(GetResult::from(e))),
    ]
}

fn encode_all(responses: &[Response]) -> Vec<u8> {
    let mut buf = Vec::new();
    for response in responses {
        response.encode(&mut buf);
    }
    buf
}

/// Turn arbitrary indices into sorted, distinct cut points within `len`.
fn cut_points(len: usize, cuts: &[prop::sample::Index]) -> Vec<usize> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c.index(len + 1)).collect();
    points.sort_unstable();
    points.dedup();
    points
}

proptest! {
    #[test]
    fn prop_whole_stream_round_trips(responses in prop::collection::vec(response(), 0..16)) {
        let stream = encode_all(&responses);
        let decoded = AsciiDecoder::new().feed(&stream).unwrap();
        prop_assert_eq!(decoded, responses);
    }

    #[test]
    fn prop_chunking_is_invisible(
        responses in prop::collection::vec(response(), 1..16),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..24),
    ) {
        let stream = encode_all(&responses);
        let mut decoder = AsciiDecoder::new();
        let mut decoded = Vec::new();
        let mut start = 0;
        for end in cut_points(stream.len(), &cuts).into_iter().chain([stream.len()]) {
            decoder.feed_into(&stream[start..end], &mut decoded).unwrap();
            start = end;
        }
        prop_assert_eq!(decoded, responses);
        prop_assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn prop_byte_at_a_time(responses in prop::collection::vec(response(), 1..6)) {
        let stream = encode_all(&responses);
        let mut decoder = AsciiDecoder::new();
        let mut decoded = Vec::new();
        for byte in stream.chunks(1) {
            decoder.feed_into(byte, &mut decoded).unwrap();
        }
        prop_assert_eq!(decoded, responses);
    }

    #[test]
    fn prop_trailing_junk_after_body_is_rejected(
        value in prop::collection::vec(any::<u8>(), 0..64),
        junk in "[A-Z]{1,8}",
    ) {
        let mut stream = format!("VALUE k 0 {}\r\n", value.len()).into_bytes();
        stream.extend_from_slice(&value);
        stream.extend_from_slice(junk.as_bytes());
        stream.extend_from_slice(b"\r\nEND\r\n");

        let mut decoded = Vec::new();
        let err = AsciiDecoder::new().feed_into(&stream, &mut decoded).unwrap_err();
        prop_assert_eq!(err.line(), Some(junk.as_str()));
        prop_assert!(decoded.is_empty());
    }
}

#[test]
fn every_keyword_decodes_to_itself() {
    for status in Status::ALL {
        let mut line = status.keyword().to_vec();
        line.extend_from_slice(b"\r\n");
        let decoded = AsciiDecoder::new().feed(&line).unwrap();
        assert_eq!(decoded, vec![Response::Status(status)]);
    }
}
