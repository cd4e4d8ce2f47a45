use crate::domain::model::{Catalog, Record, Shape};
use crate::utils::error::Result;
use std::path::Path;

/// Whole-file access to wherever records live.
pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// What to do with a record whose tag the catalog does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    /// Fail the whole load with a decode error.
    #[default]
    Reject,
    /// Drop the unknown record and keep reading.
    Skip,
}

/// Options shared by every decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub unknown_tags: UnknownTagPolicy,
}

/// Encodes and decodes a whole list of records in one file format.
pub trait Codec {
    fn encode(&self, records: &[Record], catalog: &Catalog) -> Result<Vec<u8>>;
    fn decode(&self, data: &[u8], catalog: &Catalog, options: DecodeOptions) -> Result<Vec<Record>>;
}

/// A typed domain value that maps onto one or more record shapes.
pub trait Entity: Sized {
    fn shapes() -> Vec<Shape>;
    fn to_record(&self) -> Record;
    fn from_record(record: &Record) -> Result<Self>;
}
