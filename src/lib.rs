pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::StoreConfig;

pub use adapters::LocalStorage;
pub use app::{Person, Product};
pub use core::{EntityService, Format, RecordStore};
pub use domain::model::{Catalog, FieldKind, Record, Shape, Value};
pub use domain::ports::{Entity, UnknownTagPolicy};
pub use utils::error::{Result, StoreError};
