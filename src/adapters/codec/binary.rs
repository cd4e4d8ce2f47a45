//! Tagged binary format.
//!
//! Every token is a UTF-8 string preceded by its byte length as a 7-bit
//! variable-length integer (the framing .NET's `BinaryWriter.Write(string)` uses).
//! A record is the token sequence `tag`, `{`, `name:value`..., `}`.

use crate::domain::model::{Catalog, Record, RecordBuilder};
use crate::domain::ports::{Codec, DecodeOptions, UnknownTagPolicy};
use crate::utils::error::{Result, StoreError};

const OPEN: &str = "{";
const CLOSE: &str = "}";

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

fn write_token(out: &mut Vec<u8>, token: &str) {
    let mut len = token.len();
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out.extend_from_slice(token.as_bytes());
}

struct TokenReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next token, or `None` once the stream runs out (including mid-token).
    fn next_token(&mut self) -> Result<Option<&'a str>> {
        let data: &'a [u8] = self.data;
        let mut len: usize = 0;
        let mut shift = 0;
        loop {
            let Some(&byte) = data.get(self.pos) else {
                return Ok(None);
            };
            self.pos += 1;
            len |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(StoreError::decode(format!(
                    "bad string length prefix at byte {}",
                    self.pos
                )));
            }
        }

        let Some(bytes) = data.get(self.pos..self.pos.saturating_add(len)) else {
            self.pos = data.len();
            return Ok(None);
        };
        self.pos += len;
        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StoreError::decode(format!("token is not valid UTF-8: {}", e)))
    }
}

fn check_value(tag: &str, field: &str, value: &str) -> Result<()> {
    if value.contains(':') || value.trim() != value {
        return Err(StoreError::encode(format!(
            "{}.{} value '{}' contains ':' or surrounding whitespace",
            tag, field, value
        )));
    }
    Ok(())
}

enum State<'c> {
    ExpectTag,
    ExpectOpen(RecordBuilder<'c>),
    Fields(RecordBuilder<'c>),
    Skipping,
}

impl Codec for BinaryCodec {
    fn encode(&self, records: &[Record], catalog: &Catalog) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for record in records {
            let (shape, fields) = catalog.persisted_fields(record)?;
            write_token(&mut out, &shape.tag);
            write_token(&mut out, OPEN);
            for (field, value) in fields {
                let rendered = value.render();
                check_value(&shape.tag, &field.name, &rendered)?;
                write_token(&mut out, &format!("{}:{}", field.name, rendered));
            }
            write_token(&mut out, CLOSE);
        }
        Ok(out)
    }

    fn decode(&self, data: &[u8], catalog: &Catalog, options: DecodeOptions) -> Result<Vec<Record>> {
        let mut reader = TokenReader::new(data);
        let mut records = Vec::new();
        let mut state = State::ExpectTag;

        while let Some(token) = reader.next_token()? {
            let token = token.trim();
            state = match state {
                State::ExpectTag => match catalog.shape(token) {
                    Some(shape) => State::ExpectOpen(RecordBuilder::new(shape)),
                    None if options.unknown_tags == UnknownTagPolicy::Skip => {
                        tracing::warn!(tag = token, "skipping record with unknown tag");
                        State::Skipping
                    }
                    None => {
                        return Err(StoreError::decode(format!(
                            "unknown record tag '{}'",
                            token
                        )));
                    }
                },
                State::ExpectOpen(builder) => {
                    if token != OPEN {
                        return Err(StoreError::decode(format!(
                            "expected '{{' after {}, found '{}'",
                            builder.shape().tag,
                            token
                        )));
                    }
                    State::Fields(builder)
                }
                State::Fields(builder) if token == CLOSE => {
                    records.push(builder.finish()?);
                    State::ExpectTag
                }
                State::Fields(mut builder) => {
                    let parts: Vec<&str> = token.split(':').map(str::trim).collect();
                    if parts.len() != 2 {
                        return Err(StoreError::decode(format!(
                            "malformed field token \"{}\" in {}",
                            token,
                            builder.shape().tag
                        )));
                    }
                    builder.set_raw(parts[0], parts[1])?;
                    State::Fields(builder)
                }
                State::Skipping if token == CLOSE => State::ExpectTag,
                State::Skipping => State::Skipping,
            };
        }

        // End of stream mid-record ends the stream; the partial record still has
        // to carry every field.
        match state {
            State::ExpectOpen(builder) | State::Fields(builder) => {
                tracing::debug!(tag = %builder.shape().tag, "stream ended inside a record");
                records.push(builder.finish()?);
            }
            State::ExpectTag | State::Skipping => {}
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FieldKind, Shape, Value};

    fn catalog() -> Catalog {
        Catalog::new(vec![Shape::new("inventory::Product")
            .field("Code", FieldKind::Text)
            .field("Quantity", FieldKind::Integer)])
        .unwrap()
    }

    fn record(code: &str, quantity: i64) -> Record {
        Record::new("inventory::Product")
            .with("Code", Value::Text(code.into()))
            .with("Quantity", Value::Integer(quantity))
    }

    #[test]
    fn test_token_framing() {
        let mut out = Vec::new();
        write_token(&mut out, "{");
        assert_eq!(out, vec![1, b'{']);

        let long = "x".repeat(200);
        let mut out = Vec::new();
        write_token(&mut out, &long);
        assert_eq!(&out[..2], &[0xc8, 0x01]);

        let mut reader = TokenReader::new(&out);
        assert_eq!(reader.next_token().unwrap(), Some(long.as_str()));
        assert_eq!(reader.next_token().unwrap(), None);
    }

    #[test]
    fn test_round_trip_two_records() {
        let records = vec![record("P-001", 3), record("P-002", 0)];
        let bytes = BinaryCodec.encode(&records, &catalog()).unwrap();
        let decoded = BinaryCodec
            .decode(&bytes, &catalog(), DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_truncated_token_ends_stream() {
        let records = vec![record("P-001", 3), record("P-002", 4)];
        let mut bytes = BinaryCodec.encode(&records, &catalog()).unwrap();
        // Cut into the last record's closing token.
        bytes.truncate(bytes.len() - 1);
        let decoded = BinaryCodec
            .decode(&bytes, &catalog(), DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_truncated_fields_still_fail() {
        let mut bytes = Vec::new();
        write_token(&mut bytes, "inventory::Product");
        write_token(&mut bytes, "{");
        write_token(&mut bytes, "Code:P-001");
        assert!(matches!(
            BinaryCodec.decode(&bytes, &catalog(), DecodeOptions::default()),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn test_field_without_separator_fails() {
        let mut bytes = Vec::new();
        write_token(&mut bytes, "inventory::Product");
        write_token(&mut bytes, "{");
        write_token(&mut bytes, "Code P-001");
        write_token(&mut bytes, "}");
        assert!(BinaryCodec
            .decode(&bytes, &catalog(), DecodeOptions::default())
            .is_err());
    }

    #[test]
    fn test_overlong_prefix_fails() {
        let bytes = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(BinaryCodec
            .decode(&bytes, &catalog(), DecodeOptions::default())
            .is_err());
    }
}
