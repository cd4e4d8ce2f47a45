use crate::domain::model::{Catalog, Record, RecordBuilder};
use crate::domain::ports::{Codec, DecodeOptions, UnknownTagPolicy};
use crate::utils::error::{Result, StoreError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const ROOT: &str = "Records";
const RECORD: &str = "Record";
const TYPE_ATTR: &str = "type";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

fn write_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::encode(format!("XML write failed: {}", e))
}

fn read_err(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> StoreError {
    StoreError::decode(format!(
        "invalid XML at byte {}: {}",
        reader.buffer_position(),
        e
    ))
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| StoreError::decode(format!("element name is not UTF-8: {}", e)))
}

enum State<'c> {
    Document,
    List,
    InRecord(RecordBuilder<'c>),
    InField(RecordBuilder<'c>, String, String),
    Skipping(usize),
    Done,
}

impl Codec for XmlCodec {
    fn encode(&self, records: &[Record], catalog: &Catalog) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_err)?;
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(write_err)?;

        for record in records {
            let (shape, fields) = catalog.persisted_fields(record)?;
            let mut start = BytesStart::new(RECORD);
            start.push_attribute((TYPE_ATTR, shape.tag.as_str()));
            writer.write_event(Event::Start(start)).map_err(write_err)?;

            for (field, value) in fields {
                let rendered = value.render();
                let name = field.name.as_str();
                if rendered.is_empty() {
                    writer
                        .write_event(Event::Empty(BytesStart::new(name)))
                        .map_err(write_err)?;
                    continue;
                }
                writer
                    .write_event(Event::Start(BytesStart::new(name)))
                    .map_err(write_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(&rendered)))
                    .map_err(write_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(write_err)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new(RECORD)))
                .map_err(write_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(write_err)?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(out)
    }

    fn decode(&self, data: &[u8], catalog: &Catalog, options: DecodeOptions) -> Result<Vec<Record>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| StoreError::decode(format!("file is not valid UTF-8: {}", e)))?;
        let mut reader = Reader::from_str(text);
        let mut records = Vec::new();
        let mut state = State::Document;

        loop {
            let event = reader.read_event().map_err(|e| read_err(&reader, e))?;
            state = match (state, event) {
                (State::Document, Event::Start(e)) if e.name().as_ref() == ROOT.as_bytes() => {
                    State::List
                }
                (State::Document, Event::Empty(e)) if e.name().as_ref() == ROOT.as_bytes() => {
                    State::Done
                }
                (State::List, Event::End(_)) => State::Done,

                (State::List, Event::Start(e)) | (State::List, Event::Empty(e))
                    if e.name().as_ref() != RECORD.as_bytes() =>
                {
                    return Err(StoreError::decode(format!(
                        "unexpected element <{}> in <{}>",
                        element_name(&e)?,
                        ROOT
                    )));
                }
                (State::List, Event::Start(e)) => {
                    let tag = record_tag(&reader, &e)?;
                    match catalog.shape(&tag) {
                        Some(shape) => State::InRecord(RecordBuilder::new(shape)),
                        None if options.unknown_tags == UnknownTagPolicy::Skip => {
                            tracing::warn!(tag = %tag, "skipping record with unknown tag");
                            State::Skipping(0)
                        }
                        None => {
                            return Err(StoreError::decode(format!(
                                "unknown record tag '{}'",
                                tag
                            )));
                        }
                    }
                }
                (State::List, Event::Empty(e)) => {
                    let tag = record_tag(&reader, &e)?;
                    match catalog.shape(&tag) {
                        Some(shape) => records.push(RecordBuilder::new(shape).finish()?),
                        None if options.unknown_tags == UnknownTagPolicy::Skip => {
                            tracing::warn!(tag = %tag, "skipping record with unknown tag");
                        }
                        None => {
                            return Err(StoreError::decode(format!(
                                "unknown record tag '{}'",
                                tag
                            )));
                        }
                    }
                    State::List
                }

                (State::InRecord(builder), Event::Start(e)) => {
                    let name = element_name(&e)?;
                    State::InField(builder, name, String::new())
                }
                (State::InRecord(mut builder), Event::Empty(e)) => {
                    builder.set_raw(&element_name(&e)?, "")?;
                    State::InRecord(builder)
                }
                (State::InRecord(builder), Event::End(_)) => {
                    records.push(builder.finish()?);
                    State::List
                }

                (State::InField(builder, name, mut value), Event::Text(t)) => {
                    value.push_str(&t.unescape().map_err(|e| read_err(&reader, e))?);
                    State::InField(builder, name, value)
                }
                (State::InField(builder, name, mut value), Event::CData(c)) => {
                    let raw = std::str::from_utf8(&c)
                        .map_err(|e| StoreError::decode(format!("CDATA is not UTF-8: {}", e)))?;
                    value.push_str(raw);
                    State::InField(builder, name, value)
                }
                (State::InField(mut builder, name, value), Event::End(_)) => {
                    builder.set_raw(&name, &value)?;
                    State::InRecord(builder)
                }
                (State::InField(_, name, _), Event::Start(_) | Event::Empty(_)) => {
                    return Err(StoreError::decode(format!(
                        "field <{}> must not contain elements",
                        name
                    )));
                }

                (State::Skipping(depth), Event::Start(_)) => State::Skipping(depth + 1),
                (State::Skipping(0), Event::End(_)) => State::List,
                (State::Skipping(depth), Event::End(_)) => State::Skipping(depth - 1),

                (State::Done, Event::Eof) => break,
                (_, Event::Eof) => {
                    return Err(StoreError::decode(format!(
                        "document ended before </{}>",
                        ROOT
                    )));
                }
                (State::Document | State::Done, Event::Start(e) | Event::Empty(e)) => {
                    return Err(StoreError::decode(format!(
                        "unexpected element <{}>",
                        element_name(&e)?
                    )));
                }
                (state, Event::Text(t)) => {
                    let is_blank = t.iter().all(|b| b.is_ascii_whitespace());
                    if !is_blank && !matches!(state, State::Skipping(_)) {
                        return Err(StoreError::decode("text outside of a field element"));
                    }
                    state
                }
                // Declarations, comments, processing instructions, doctype.
                (state, _) => state,
            };
        }

        Ok(records)
    }
}

fn record_tag(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    let attr = start
        .try_get_attribute(TYPE_ATTR)
        .map_err(|e| read_err(reader, e))?
        .ok_or_else(|| StoreError::decode(format!("<{}> without a {} attribute", RECORD, TYPE_ATTR)))?;
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| read_err(reader, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FieldKind, Shape, Value};

    fn catalog() -> Catalog {
        Catalog::new(vec![Shape::new("inventory::Product")
            .field("Code", FieldKind::Text)
            .field("Name", FieldKind::Text)
            .field("Quantity", FieldKind::Integer)])
        .unwrap()
    }

    fn record(name: &str) -> Record {
        Record::new("inventory::Product")
            .with("Code", Value::Text("P-001".into()))
            .with("Name", Value::Text(name.into()))
            .with("Quantity", Value::Integer(3))
    }

    #[test]
    fn test_document_layout() {
        let bytes = XmlCodec.encode(&[record("Widget")], &catalog()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<Record type=\"inventory::Product\">"));
        assert!(text.contains("<Name>Widget</Name>"));
        assert!(text.trim_end().ends_with("</Records>"));
    }

    #[test]
    fn test_markup_characters_and_whitespace_survive() {
        let records = vec![record("  <Nuts & \"Bolts\">  "), record("")];
        let bytes = XmlCodec.encode(&records, &catalog()).unwrap();
        let decoded = XmlCodec
            .decode(&bytes, &catalog(), DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_unclosed_document_is_an_error() {
        let text = r#"<Records><Record type="inventory::Product"><Code>P-001</Code>"#;
        assert!(matches!(
            XmlCodec.decode(text.as_bytes(), &catalog(), DecodeOptions::default()),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn test_unknown_tag_skipped_on_request() {
        let text = r#"<Records>
  <Record type="legacy::Thing"><Colour>red</Colour></Record>
  <Record type="inventory::Product"><Code>P-001</Code><Name>Widget</Name><Quantity>3</Quantity></Record>
</Records>"#;
        let strict = XmlCodec.decode(text.as_bytes(), &catalog(), DecodeOptions::default());
        assert!(strict.is_err());

        let lenient = XmlCodec
            .decode(
                text.as_bytes(),
                &catalog(),
                DecodeOptions {
                    unknown_tags: UnknownTagPolicy::Skip,
                },
            )
            .unwrap();
        assert_eq!(lenient, vec![record("Widget")]);
    }
}
