//! Attribute payload codec
//!
//! A payload is one header byte followed by the body:
//! - `0x01`: bincode-encoded [`Attributes`]
//! - `0x02`: the same bincode body, zlib-compressed
//!
//! Readers accept either form regardless of how the graph is configured,
//! so toggling compression never strands existing rows.

use std::io::{Read, Write};

use bincode::Options;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::value::Attributes;
use crate::{Error, Result};

/// Header byte for an uncompressed payload
pub const PLAIN: u8 = 0x01;
/// Header byte for a zlib-compressed payload
pub const ZLIB: u8 = 0x02;

fn bincode_options() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Serialize an attribute mapping into a payload
pub fn encode(attrs: &Attributes, compress: bool) -> Result<Vec<u8>> {
    let body = bincode_options()
        .serialize(attrs)
        .map_err(|e| Error::Encoding(e.to_string()))?;

    if !compress {
        let mut payload = Vec::with_capacity(body.len() + 1);
        payload.push(PLAIN);
        payload.extend_from_slice(&body);
        return Ok(payload);
    }

    let mut encoder = ZlibEncoder::new(vec![ZLIB], Compression::default());
    encoder.write_all(&body)?;
    Ok(encoder.finish()?)
}

/// Deserialize a payload read from the `attrs` column of `owner`.
///
/// A NULL column (`None`) is the empty mapping.
pub fn decode(owner: &str, payload: Option<&[u8]>) -> Result<Attributes> {
    let Some(payload) = payload else {
        return Ok(Attributes::new());
    };

    let corrupt = |reason: String| Error::CorruptAttributes {
        owner: owner.to_string(),
        reason,
    };

    let (header, body) = payload
        .split_first()
        .ok_or_else(|| corrupt("empty payload".to_string()))?;

    match *header {
        PLAIN => bincode_options()
            .deserialize(body)
            .map_err(|e| corrupt(e.to_string())),
        ZLIB => {
            let mut raw = Vec::new();
            let mut decoder = ZlibDecoder::new(body);
            decoder
                .read_to_end(&mut raw)
                .map_err(|e| corrupt(format!("zlib: {}", e)))?;
            // The decoder stops at the end of the zlib stream
            if decoder.total_in() != body.len() as u64 {
                return Err(corrupt("trailing bytes after zlib stream".to_string()));
            }
            bincode_options()
                .deserialize(&raw)
                .map_err(|e| corrupt(e.to_string()))
        }
        other => Err(corrupt(format!("unknown payload header 0x{:02x}", other))),
    }
}
