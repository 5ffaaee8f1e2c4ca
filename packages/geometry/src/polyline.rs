//! Encoded polyline codec.
//!
//! Implements the standard encoded polyline format shared with external
//! mapping tools: coordinates are fixed-point at 1e-5 degrees, stored as
//! zig-zag signed deltas from the previous point, split into 5-bit chunks
//! (least significant first) with `0x20` as the continuation bit, each
//! offset by 63 into printable ASCII. Latitude precedes longitude in the
//! stream.
//!
//! Decoding is bit-exact: the same input always yields the same `f64`
//! values as any other conforming decoder.
//!
//! See <https://developers.google.com/maps/documentation/utilities/polylinealgorithm>

use geo::Coord;
use thiserror::Error;

/// Fixed-point scale of the encoding.
const PRECISION: f64 = 1e5;

/// Offset added to each 5-bit chunk.
const CHUNK_OFFSET: u8 = 63;

/// Continuation bit inside a chunk.
const CONTINUATION: i64 = 0x20;

/// Chunks past this shift cannot come from a valid coordinate.
const MAX_SHIFT: u32 = 60;

/// Largest latitude magnitude in fixed-point units.
const MAX_LAT: i64 = 90 * 100_000;

/// Largest longitude magnitude in fixed-point units.
const MAX_LNG: i64 = 180 * 100_000;

/// Errors from decoding a malformed polyline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolylineError {
    /// A byte outside the `?`..=`~` alphabet.
    #[error("Invalid polyline character {character:?} at byte {position}")]
    InvalidCharacter {
        /// Byte offset of the bad character.
        position: usize,
        /// The offending character.
        character: char,
    },

    /// The input ended in the middle of a value.
    #[error("Polyline truncated at byte {position}")]
    Truncated {
        /// Length of the input.
        position: usize,
    },

    /// A value had more continuation chunks than fit in 64 bits.
    #[error("Polyline value starting before byte {position} is too long")]
    Overlong {
        /// Byte offset where decoding gave up.
        position: usize,
    },

    /// A point decoded outside the valid latitude or longitude range.
    #[error("Polyline point ending at byte {position} is out of range")]
    OutOfRange {
        /// Byte offset just past the offending value.
        position: usize,
    },
}

/// Decodes an encoded polyline into `(lng, lat)` coordinates.
///
/// # Errors
///
/// Returns [`PolylineError`] if the input contains characters outside the
/// encoding alphabet, ends partway through a value, contains a value too
/// long to be a coordinate delta, or accumulates to a point beyond ±90°
/// latitude or ±180° longitude.
#[allow(clippy::cast_precision_loss)]
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coord<f64>>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut coords = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_delta(bytes, &mut index)?, MAX_LAT, index)?;
        lng = accumulate(lng, next_delta(bytes, &mut index)?, MAX_LNG, index)?;

        coords.push(Coord {
            x: lng as f64 / PRECISION,
            y: lat as f64 / PRECISION,
        });
    }

    Ok(coords)
}

fn accumulate(value: i64, delta: i64, limit: i64, position: usize) -> Result<i64, PolylineError> {
    value
        .checked_add(delta)
        .filter(|v| (-limit..=limit).contains(v))
        .ok_or(PolylineError::OutOfRange { position })
}

/// Reads one zig-zag encoded delta starting at `*index`.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated {
                position: bytes.len(),
            });
        };

        let Some(chunk) = byte
            .checked_sub(CHUNK_OFFSET)
            .filter(|c| *c < 64)
            .map(i64::from)
        else {
            return Err(PolylineError::InvalidCharacter {
                position: *index,
                character: char::from(byte),
            });
        };

        if shift > MAX_SHIFT {
            return Err(PolylineError::Overlong { position: *index });
        }

        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encodes `(lng, lat)` coordinates as a polyline, rounding each value to
/// 1e-5 degrees.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_polyline(coords: &[Coord<f64>]) -> String {
    let mut out = String::with_capacity(coords.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for coord in coords {
        let lat = (coord.y * PRECISION).round() as i64;
        let lng = (coord.x * PRECISION).round() as i64;

        encode_delta(lat - prev_lat, &mut out);
        encode_delta(lng - prev_lng, &mut out);

        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_delta(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };

    while value >= CONTINUATION {
        let chunk = (CONTINUATION | (value & 0x1f)) as u8;
        out.push(char::from(chunk + CHUNK_OFFSET));
        value >>= 5;
    }

    out.push(char::from(value as u8 + CHUNK_OFFSET));
}
