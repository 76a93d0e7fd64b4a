//! Verify decoding and error classification against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each decode vector gives a status, a raw header block and body, and the
//! header pairs the decoded response must carry in order.

use bytes::Bytes;
use fanout_core::{
    classify, Body, DefaultFactory, Error, ErrorKind, NetworkFailure, ResponseDecoder, TransportErrorCode,
};

fn decoder() -> ResponseDecoder<'static> {
    ResponseDecoder::new(&DefaultFactory, &DefaultFactory)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

#[test]
fn decode_test_vectors() {
    let raw = include_str!("../../test-vectors/decode.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let header_block = case["header_block"].as_str().unwrap();
        let body = case["body"].as_str().unwrap();
        let bytes = Bytes::from(format!("{header_block}{body}"));

        let response = decoder().decode(status, header_block.len(), &bytes).unwrap();
        assert_eq!(response.status, status, "{name}: status");
        assert_eq!(response.body, Body::from(body), "{name}: body");

        let expected: Vec<(String, String)> = case["expected_headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        let actual: Vec<(String, String)> = response
            .headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(actual, expected, "{name}: headers");

        let again = decoder().decode(status, header_block.len(), &bytes).unwrap();
        assert_eq!(again, response, "{name}: decode is repeatable");
    }
}

// ---------------------------------------------------------------------------
// Classify
// ---------------------------------------------------------------------------

fn expected_kind(case: &serde_json::Value) -> ErrorKind {
    match case["kind"].as_str().unwrap() {
        "client" => ErrorKind::Client,
        "network" => ErrorKind::Network(match case["failure"].as_str().unwrap() {
            "timeout" => NetworkFailure::Timeout,
            "resolve" => NetworkFailure::Resolve,
            "connect" => NetworkFailure::Connect,
            "tls" => NetworkFailure::Tls,
            other => panic!("unknown failure: {other}"),
        }),
        other => panic!("unknown kind: {other}"),
    }
}

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let code = TransportErrorCode::from_code(case["code"].as_u64().unwrap() as u32);
        let kind = expected_kind(case);

        assert_eq!(classify(code), kind, "code {code}");
        let err = Error::from_transport(code, "vector");
        assert_eq!(err.kind(), kind, "code {code}: error kind");
        assert_eq!(err.is_timeout(), code == TransportErrorCode::OperationTimedOut, "code {code}");
    }
}
