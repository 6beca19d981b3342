//! JSONL encoding and resilient decoding of record payloads.
//!
//! Values are stored as JSON Lines: one serialized record per line, each line
//! terminated by `\n`. Encoding is strict. Decoding is resilient: lines that
//! fail to parse are skipped and reported as [`Warning`]s, so one damaged
//! record does not discard the rest of the payload.
//!
//! # Examples
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use trellis_store::{decode_jsonl_resilient, encode_jsonl};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Record {
//!     id: u32,
//! }
//!
//! let bytes = encode_jsonl([Record { id: 1 }, Record { id: 2 }]).unwrap();
//! let (records, warnings) = decode_jsonl_resilient::<Record>(&bytes);
//! assert_eq!(records, vec![Record { id: 1 }, Record { id: 2 }]);
//! assert!(warnings.is_empty());
//! ```

use crate::Result;
use crate::warning::{Damage, Warning};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes an iterator of values as JSONL bytes.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if any value fails to serialize.
pub fn encode_jsonl<T, I>(values: I) -> Result<Vec<u8>>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut buffer = Vec::new();
    for value in values {
        serde_json::to_writer(&mut buffer, &value)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Decodes JSONL bytes, skipping lines that cannot be parsed.
///
/// Blank lines are ignored without a warning. Lines that are not valid UTF-8
/// are reported as [`Damage::NotUtf8`]; lines that are not valid JSON for `T`
/// as [`Damage::NotARecord`]. Line numbers are 1-based and refer to the
/// physical line in `bytes`.
#[must_use]
pub fn decode_jsonl_resilient<T>(bytes: &[u8]) -> (Vec<T>, Vec<Warning>)
where
    T: DeserializeOwned,
{
    let mut values = Vec::new();
    let mut warnings = Vec::new();

    for (index, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = index + 1;

        let Ok(line) = std::str::from_utf8(raw_line) else {
            warnings.push(Warning::new(line_number, Damage::NotUtf8));
            continue;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(line) {
            Ok(value) => values.push(value),
            Err(e) => warnings.push(Warning::new(line_number, Damage::NotARecord(e.to_string()))),
        }
    }

    (values, warnings)
}
