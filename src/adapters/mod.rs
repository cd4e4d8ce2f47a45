// Adapters layer: concrete file formats and storage backends behind the domain ports.

pub mod codec;
pub mod storage;

pub use codec::{BinaryCodec, JsonCodec, TextCodec, XmlCodec};
pub use storage::LocalStorage;
