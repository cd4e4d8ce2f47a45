pub mod format;
pub mod service;
pub mod store;

pub use crate::domain::model::{Catalog, Record, Shape, Value};
pub use crate::domain::ports::{Entity, Storage};
pub use crate::utils::error::Result;
pub use format::Format;
pub use service::EntityService;
pub use store::{BusyGuard, RecordStore};
