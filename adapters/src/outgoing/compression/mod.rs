use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

/// Outbound message types that must never be wrapped, regardless of size:
/// dispatch is latency-critical and the receiving worker expects them
/// uncompressed on the wire.
const NEVER_COMPRESS: [&str; 2] = ["paintBatch", "repairOrder"];

const COMPRESSED_TYPE: &str = "__compressed__";
const ENCODING: &str = "gzip+base64";

/// Wraps `message` in the `__compressed__` envelope if it exceeds
/// `threshold_bytes` and its `type` is not exempt. Falls back to the
/// uncompressed message on any encoding failure.
#[must_use]
pub fn maybe_compress(message: Value, threshold_bytes: usize) -> Value {
    let Some(original_type) = message.get("type").and_then(Value::as_str) else {
        return message;
    };
    if NEVER_COMPRESS.contains(&original_type) {
        return message;
    }

    let Ok(serialized) = serde_json::to_vec(&message) else {
        return message;
    };
    if serialized.len() <= threshold_bytes {
        return message;
    }

    let original_type = original_type.to_string();
    let original_length = serialized.len();
    match gzip(&serialized) {
        Ok(compressed) => {
            let payload = BASE64.encode(compressed);
            let compressed_length = payload.len();
            serde_json::json!({
                "type": COMPRESSED_TYPE,
                "encoding": ENCODING,
                "originalType": original_type,
                "originalLength": original_length,
                "compressedLength": compressed_length,
                "payload": payload,
            })
        }
        Err(err) => {
            tracing::warn!(error = %err, "gzip compression failed; sending uncompressed");
            message
        }
    }
}

/// Transparently decodes a `__compressed__` envelope back into the inner
/// object. Passes any other message through unchanged. Malformed envelopes
/// (bad base64, bad gzip, non-JSON payload) degrade to the envelope itself
/// rather than erroring, per the data malformation policy.
#[must_use]
pub fn maybe_decompress(message: Value) -> Value {
    let is_compressed = message.get("type").and_then(Value::as_str) == Some(COMPRESSED_TYPE)
        && message.get("encoding").and_then(Value::as_str) == Some(ENCODING);
    if !is_compressed {
        return message;
    }

    let Some(payload) = message.get("payload").and_then(Value::as_str) else {
        return message;
    };
    let Ok(compressed) = BASE64.decode(payload) else {
        return message;
    };
    let Ok(decompressed) = gunzip(&compressed) else {
        return message;
    };
    serde_json::from_slice(&decompressed).unwrap_or(message)
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payloads_pass_through_uncompressed() {
        let message = serde_json::json!({ "type": "status_update", "status": "idle" });
        let result = maybe_compress(message.clone(), 5 * 1024 * 1024);
        assert_eq!(result, message);
    }

    #[test]
    fn paint_batch_never_compresses_regardless_of_size() {
        let coords: Vec<_> = (0..200_000).map(|i| serde_json::json!({ "x": i, "y": i })).collect();
        let message = serde_json::json!({ "type": "paintBatch", "coords": coords });
        let result = maybe_compress(message.clone(), 0);
        assert_eq!(result, message);
    }

    #[test]
    fn round_trip_is_identity_above_threshold() {
        let message = serde_json::json!({
            "type": "guard_config",
            "config": { "protectionPattern": "spiral" },
            "padding": "x".repeat(100),
        });
        let wrapped = maybe_compress(message.clone(), 10);
        assert_eq!(wrapped.get("type").and_then(Value::as_str), Some(COMPRESSED_TYPE));
        let restored = maybe_decompress(wrapped);
        assert_eq!(restored, message);
    }

    #[test]
    fn decompress_passes_through_plain_messages() {
        let message = serde_json::json!({ "type": "status_update" });
        assert_eq!(maybe_decompress(message.clone()), message);
    }
}
