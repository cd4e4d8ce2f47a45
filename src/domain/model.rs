use crate::utils::error::{Result, StoreError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Enum(String),
}

impl Value {
    /// Renders the value the way the text-based formats store it.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) | Value::Enum(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Boolean(_) => "boolean",
            Value::Enum(_) => "enum",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Enum(variants.into_iter().map(Into::into).collect())
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum(_) => "enum",
        }
    }

    /// Checks that `value` is a legal value of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Text, Value::Text(_))
            | (FieldKind::Integer, Value::Integer(_))
            | (FieldKind::Decimal, Value::Decimal(_))
            | (FieldKind::Boolean, Value::Boolean(_)) => true,
            (FieldKind::Enum(variants), Value::Enum(v)) => variants.iter().any(|x| x == v),
            _ => false,
        }
    }

    /// Parses a stored string into a value of this kind.
    pub fn parse(&self, raw: &str) -> std::result::Result<Value, String> {
        match self {
            FieldKind::Text => Ok(Value::Text(raw.to_string())),
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("'{}' is not an integer", raw)),
            FieldKind::Decimal => raw
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|_| format!("'{}' is not a decimal", raw)),
            FieldKind::Boolean => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Boolean(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(format!("'{}' is not a boolean", raw))
                }
            }
            FieldKind::Enum(variants) => {
                if variants.iter().any(|v| v == raw) {
                    Ok(Value::Enum(raw.to_string()))
                } else {
                    Err(format!(
                        "'{}' is not one of [{}]",
                        raw,
                        variants.join(", ")
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Computed from other fields; never written or read back.
    pub derived: bool,
}

/// Static description of one record type: its tag and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub tag: String,
    pub fields: Vec<FieldDef>,
}

impl Shape {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            derived: false,
        });
        self
    }

    pub fn derived(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            derived: true,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn persisted(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.derived)
    }

    fn validate(&self) -> Result<()> {
        static FIELD_NAME: OnceLock<Regex> = OnceLock::new();
        let field_name = FIELD_NAME.get_or_init(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid")
        });

        if self.tag.is_empty()
            || self
                .tag
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}'))
        {
            return Err(StoreError::Config {
                message: format!("invalid record tag '{}'", self.tag),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !field_name.is_match(&field.name) {
                return Err(StoreError::Config {
                    message: format!("invalid field name '{}' in {}", field.name, self.tag),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(StoreError::Config {
                    message: format!("duplicate field '{}' in {}", field.name, self.tag),
                });
            }
        }
        Ok(())
    }
}

/// One flat record, tagged with the shape it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub tag: String,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Drops every field the shape marks as derived.
    pub fn without_derived(mut self, shape: &Shape) -> Self {
        for field in shape.fields.iter().filter(|f| f.derived) {
            self.fields.remove(&field.name);
        }
        self
    }

    fn missing(&self, name: &str) -> StoreError {
        StoreError::decode(format!("{} has no field '{}'", self.tag, name))
    }

    fn mismatch(&self, name: &str, expected: &str, got: &Value) -> StoreError {
        StoreError::decode(format!(
            "{}.{} should be {} but is {}",
            self.tag,
            name,
            expected,
            got.kind_name()
        ))
    }

    pub fn text(&self, name: &str) -> Result<String> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(name, "text", value))
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value
            .as_integer()
            .ok_or_else(|| self.mismatch(name, "integer", value))
    }

    pub fn decimal(&self, name: &str) -> Result<f64> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value
            .as_decimal()
            .ok_or_else(|| self.mismatch(name, "decimal", value))
    }
}

/// The closed set of shapes a store operation can encounter.
#[derive(Debug, Clone)]
pub struct Catalog {
    shapes: Vec<Shape>,
    by_tag: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(shapes: Vec<Shape>) -> Result<Self> {
        if shapes.is_empty() {
            return Err(StoreError::Config {
                message: "catalog needs at least one shape".to_string(),
            });
        }

        let mut by_tag = HashMap::new();
        for (i, shape) in shapes.iter().enumerate() {
            shape.validate()?;
            if by_tag.insert(shape.tag.clone(), i).is_some() {
                return Err(StoreError::Config {
                    message: format!("duplicate record tag '{}'", shape.tag),
                });
            }
        }

        Ok(Self { shapes, by_tag })
    }

    pub fn shape(&self, tag: &str) -> Option<&Shape> {
        self.by_tag.get(tag).map(|&i| &self.shapes[i])
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The only shape, when the catalog describes a homogeneous list.
    pub fn single(&self) -> Option<&Shape> {
        match self.shapes.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Resolves a record against its shape and returns the fields to persist,
    /// in shape order.
    pub fn persisted_fields<'a>(
        &'a self,
        record: &'a Record,
    ) -> Result<(&'a Shape, Vec<(&'a FieldDef, &'a Value)>)> {
        let shape = self.shape(&record.tag).ok_or_else(|| {
            StoreError::encode(format!("unknown record tag '{}'", record.tag))
        })?;

        if let Some(extra) = record.fields.keys().find(|k| shape.get(k).is_none()) {
            return Err(StoreError::encode(format!(
                "{} has undeclared field '{}'",
                shape.tag, extra
            )));
        }

        let mut out = Vec::with_capacity(shape.fields.len());
        for field in shape.persisted() {
            let value = record.get(&field.name).ok_or_else(|| {
                StoreError::encode(format!("{} is missing field '{}'", shape.tag, field.name))
            })?;
            if !field.kind.accepts(value) {
                return Err(StoreError::encode(format!(
                    "{}.{} expects {} but holds {} '{}'",
                    shape.tag,
                    field.name,
                    field.kind.name(),
                    value.kind_name(),
                    value
                )));
            }
            out.push((field, value));
        }
        Ok((shape, out))
    }
}

/// Accumulates decoded fields for one record and checks completeness.
pub struct RecordBuilder<'a> {
    shape: &'a Shape,
    record: Record,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(shape: &'a Shape) -> Self {
        Self {
            shape,
            record: Record::new(shape.tag.clone()),
        }
    }

    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Resolves a stored field name. `Ok(None)` means the field is derived and
    /// must be ignored.
    pub fn resolve(&self, name: &str) -> Result<Option<&'a FieldDef>> {
        let shape: &'a Shape = self.shape;
        let field = shape.get(name).ok_or_else(|| {
            StoreError::decode(format!("unknown field '{}' for {}", name, shape.tag))
        })?;
        Ok((!field.derived).then_some(field))
    }

    /// Parses and stores a field given as stored text.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> Result<()> {
        if let Some(field) = self.resolve(name)? {
            let value = field.kind.parse(raw).map_err(|reason| {
                StoreError::decode(format!("{}.{}: {}", self.shape.tag, name, reason))
            })?;
            self.record.set(name, value);
        }
        Ok(())
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(field) = self.resolve(name)? {
            if !field.kind.accepts(&value) {
                return Err(StoreError::decode(format!(
                    "{}.{} expects {} but file holds {} '{}'",
                    self.shape.tag,
                    name,
                    field.kind.name(),
                    value.kind_name(),
                    value
                )));
            }
            self.record.set(name, value);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Record> {
        if let Some(missing) = self
            .shape
            .persisted()
            .find(|f| !self.record.fields.contains_key(&f.name))
        {
            return Err(StoreError::decode(format!(
                "{} is missing field '{}'",
                self.shape.tag, missing.name
            )));
        }
        Ok(self.record)
    }
}
