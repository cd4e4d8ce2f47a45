use crate::domain::model::{Catalog, FieldKind, Record, RecordBuilder, Value};
use crate::domain::ports::{Codec, DecodeOptions, UnknownTagPolicy};
use crate::utils::error::{Result, StoreError};
use serde_json::{Map, Number, Value as JsonValue};

/// Member holding the record tag in every JSON object.
pub const TYPE_KEY: &str = "$type";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

fn to_json(tag: &str, field: &str, value: &Value) -> Result<JsonValue> {
    Ok(match value {
        Value::Text(s) | Value::Enum(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Decimal(d) => JsonValue::Number(Number::from_f64(*d).ok_or_else(|| {
            StoreError::encode(format!("{}.{} value {} has no JSON form", tag, field, d))
        })?),
    })
}

fn from_json(kind: &FieldKind, json: &JsonValue) -> std::result::Result<Value, String> {
    match (kind, json) {
        (FieldKind::Text | FieldKind::Enum(_), JsonValue::String(s)) => kind.parse(s),
        (FieldKind::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| format!("{} is not an integer", n)),
        (FieldKind::Decimal, JsonValue::Number(n)) => n
            .as_f64()
            .map(Value::Decimal)
            .ok_or_else(|| format!("{} is not a decimal", n)),
        (FieldKind::Boolean, JsonValue::Bool(b)) => Ok(Value::Boolean(*b)),
        (kind, other) => Err(format!("expected {} but found {}", kind.name(), other)),
    }
}

impl Codec for JsonCodec {
    fn encode(&self, records: &[Record], catalog: &Catalog) -> Result<Vec<u8>> {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let (shape, fields) = catalog.persisted_fields(record)?;
            let mut object = Map::new();
            object.insert(TYPE_KEY.to_string(), JsonValue::String(shape.tag.clone()));
            for (field, value) in fields {
                object.insert(field.name.clone(), to_json(&shape.tag, &field.name, value)?);
            }
            items.push(JsonValue::Object(object));
        }

        serde_json::to_vec_pretty(&JsonValue::Array(items))
            .map_err(|e| StoreError::encode(e.to_string()))
    }

    fn decode(&self, data: &[u8], catalog: &Catalog, options: DecodeOptions) -> Result<Vec<Record>> {
        let document: JsonValue = serde_json::from_slice(data)
            .map_err(|e| StoreError::decode(format!("invalid JSON: {}", e)))?;
        let JsonValue::Array(items) = document else {
            return Err(StoreError::decode("top-level JSON value must be an array"));
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let JsonValue::Object(object) = item else {
                return Err(StoreError::decode(format!("item {} is not an object", index)));
            };

            let shape = match object.get(TYPE_KEY) {
                Some(JsonValue::String(tag)) => match catalog.shape(tag) {
                    Some(shape) => shape,
                    None if options.unknown_tags == UnknownTagPolicy::Skip => {
                        tracing::warn!(tag = %tag, "skipping record with unknown tag");
                        continue;
                    }
                    None => {
                        return Err(StoreError::decode(format!("unknown record tag '{}'", tag)));
                    }
                },
                Some(other) => {
                    return Err(StoreError::decode(format!(
                        "item {} has a non-string {}: {}",
                        index, TYPE_KEY, other
                    )));
                }
                None => catalog.single().ok_or_else(|| {
                    StoreError::decode(format!(
                        "item {} has no {} and the catalog holds several shapes",
                        index, TYPE_KEY
                    ))
                })?,
            };

            let mut builder = RecordBuilder::new(shape);
            for (name, json) in object.iter().filter(|(k, _)| k.as_str() != TYPE_KEY) {
                if let Some(field) = builder.resolve(name)? {
                    let value = from_json(&field.kind, json).map_err(|reason| {
                        StoreError::decode(format!("{}.{}: {}", shape.tag, name, reason))
                    })?;
                    builder.set(name, value)?;
                }
            }
            records.push(builder.finish()?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Shape;

    fn catalog() -> Catalog {
        Catalog::new(vec![Shape::new("inventory::Product")
            .field("Code", FieldKind::Text)
            .field("Price", FieldKind::Decimal)
            .field("Quantity", FieldKind::Integer)])
        .unwrap()
    }

    #[test]
    fn test_objects_carry_type_tag() {
        let record = Record::new("inventory::Product")
            .with("Code", Value::Text("P-001".into()))
            .with("Price", Value::Decimal(10.5))
            .with("Quantity", Value::Integer(3));
        let bytes = JsonCodec.encode(&[record], &catalog()).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed[0][TYPE_KEY], "inventory::Product");
        assert_eq!(parsed[0]["Price"], 10.5);
    }

    #[test]
    fn test_type_tag_optional_for_single_shape() {
        let text = r#"[{"Code": "P-001", "Price": 2, "Quantity": 1}]"#;
        let records = JsonCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .unwrap();
        assert_eq!(records[0].get("Price"), Some(&Value::Decimal(2.0)));
    }

    #[test]
    fn test_type_mismatch_is_decode_error() {
        let text = r#"[{"Code": "P-001", "Price": "free", "Quantity": 1}]"#;
        assert!(matches!(
            JsonCodec.decode(text.as_bytes(), &catalog(), DecodeOptions::default()),
            Err(StoreError::Decode { .. })
        ));

        let text = r#"[{"Code": "P-001", "Price": 1.0, "Quantity": 1.5}]"#;
        assert!(JsonCodec
            .decode(text.as_bytes(), &catalog(), DecodeOptions::default())
            .is_err());
    }

    #[test]
    fn test_nan_cannot_be_encoded() {
        let record = Record::new("inventory::Product")
            .with("Code", Value::Text("P-001".into()))
            .with("Price", Value::Decimal(f64::NAN))
            .with("Quantity", Value::Integer(3));
        assert!(matches!(
            JsonCodec.encode(&[record], &catalog()),
            Err(StoreError::Encode { .. })
        ));
    }
}
