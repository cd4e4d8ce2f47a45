use crate::adapters::codec::{BinaryCodec, JsonCodec, TextCodec, XmlCodec};
use crate::domain::ports::Codec;
use crate::utils::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
    Binary,
    Text,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Xml, Format::Binary, Format::Text];

    pub fn codec(self) -> &'static dyn Codec {
        match self {
            Format::Json => &JsonCodec,
            Format::Xml => &XmlCodec,
            Format::Binary => &BinaryCodec,
            Format::Text => &TextCodec,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Binary => "binary",
            Format::Text => "text",
        }
    }

    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "bin" | "dat" => Some(Format::Binary),
            "txt" => Some(Format::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "binary" | "bin" => Ok(Format::Binary),
            "text" | "custom" | "txt" => Ok(Format::Text),
            other => Err(StoreError::InvalidConfigValue {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Valid formats: json, xml, binary, text".to_string(),
            }),
        }
    }
}
