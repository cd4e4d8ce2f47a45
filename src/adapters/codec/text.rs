//! Tagged custom text format.
//!
//! ```text
//! inventory::Product
//! {
//! 	Code: P-001
//! 	Price: 10.5
//! };
//! ```

use crate::domain::model::{Catalog, Record, RecordBuilder};
use crate::domain::ports::{Codec, DecodeOptions, UnknownTagPolicy};
use crate::utils::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

fn check_value(tag: &str, field: &str, value: &str) -> Result<()> {
    if value.contains([';', ':', '\n', '\r']) {
        return Err(StoreError::encode(format!(
            "{}.{} value '{}' contains ';', ':' or a line break",
            tag, field, value
        )));
    }
    if value.trim() != value {
        return Err(StoreError::encode(format!(
            "{}.{} value '{}' has surrounding whitespace",
            tag, field, value
        )));
    }
    Ok(())
}

impl Codec for TextCodec {
    fn encode(&self, records: &[Record], catalog: &Catalog) -> Result<Vec<u8>> {
        let mut out = String::new();
        for record in records {
            let (shape, fields) = catalog.persisted_fields(record)?;
            out.push_str(&shape.tag);
            out.push_str("\n{\n");
            for (field, value) in fields {
                let rendered = value.render();
                check_value(&shape.tag, &field.name, &rendered)?;
                out.push('\t');
                out.push_str(&field.name);
                out.push_str(": ");
                out.push_str(&rendered);
                out.push('\n');
            }
            out.push_str("};\n");
        }
        Ok(out.into_bytes())
    }

    fn decode(&self, data: &[u8], catalog: &Catalog, options: DecodeOptions) -> Result<Vec<Record>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| StoreError::decode(format!("file is not valid UTF-8: {}", e)))?;

        let chunks: Vec<&str> = text.split(';').collect();
        let last = chunks.len() - 1;
        let mut records = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let lines: Vec<&str> = chunk
                .split('\n')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if lines.is_empty() {
                continue;
            }
            // The piece after the final ';' is only allowed to be blank.
            if index == last {
                return Err(StoreError::decode(format!(
                    "record '{}' is not terminated by ';'",
                    lines[0]
                )));
            }

            let tag = lines[0];
            let shape = match catalog.shape(tag) {
                Some(shape) => shape,
                None if options.unknown_tags == UnknownTagPolicy::Skip => {
                    tracing::warn!(tag, "skipping record with unknown tag");
                    continue;
                }
                None => {
                    return Err(StoreError::decode(format!("unknown record tag '{}'", tag)));
                }
            };

            if lines.len() < 3 || lines[1] != "{" {
                return Err(StoreError::decode(format!("{} is missing '{{'", tag)));
            }
            if lines[lines.len() - 1] != "}" {
                return Err(StoreError::decode(format!("{} is missing '}}'", tag)));
            }

            let mut builder = RecordBuilder::new(shape);
            for line in &lines[2..lines.len() - 1] {
                let parts: Vec<&str> = line.split(':').map(str::trim).collect();
                if parts.len() != 2 {
                    return Err(StoreError::decode(format!(
                        "malformed field line \"{}\" in {}",
                        line, tag
                    )));
                }
                builder.set_raw(parts[0], parts[1])?;
            }
            records.push(builder.finish()?);
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
            .field("Price", FieldKind::Decimal)
            .field("InStock", FieldKind::Boolean)])
        .unwrap()
    }

    fn widget() -> Record {
        Record::new("inventory::Product")
            .with("Code", Value::Text("P-001".into()))
            .with("Price", Value::Decimal(10.5))
            .with("InStock", Value::Boolean(true))
    }

    #[test]
    fn test_encode_layout() {
        let bytes = TextCodec.encode(&[widget()], &catalog()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "inventory::Product\n{\n\tCode: P-001\n\tPrice: 10.5\n\tInStock: true\n};\n"
        );
    }

    #[test]
    fn test_decode_tolerates_blank_lines_and_dotnet_booleans() {
        let text = "\n\ninventory::Product\n{\n\n\tCode: P-001\r\n\tPrice: 10.5\n\tInStock: True\n};\n\n";
        let records = TextCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .unwrap();
        assert_eq!(records, vec![widget()]);
    }

    #[test]
    fn test_missing_terminator_is_an_error() {
        let text = "inventory::Product\n{\n\tCode: P-001\n\tPrice: 10.5\n\tInStock: true\n}\n";
        let err = TextCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_missing_closing_brace_is_an_error() {
        let text = "inventory::Product\n{\n\tCode: P-001\n\tPrice: 10.5\n\tInStock: true\n;\n";
        assert!(TextCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .is_err());
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let text = "inventory::Product\n{\n\tColour: red\n};\n";
        assert!(TextCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .is_err());
    }

    #[test]
    fn test_values_with_separators_cannot_be_encoded() {
        let record = widget().with("Code", Value::Text("A:B".into()));
        assert!(matches!(
            TextCodec.encode(&[record], &catalog()),
            Err(StoreError::Encode { .. })
        ));

        let record = widget().with("Code", Value::Text(" padded".into()));
        assert!(TextCodec.encode(&[record], &catalog()).is_err());
    }

    #[test]
    fn test_empty_file_is_an_empty_list() {
        let records = TextCodec
            .decode(b"  \n", &catalog(), DecodeOptions::default())
            .unwrap();
        assert!(records.is_empty());
    }
}
