pub mod binary;
pub mod json;
pub mod text;
pub mod xml;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use text::TextCodec;
pub use xml::XmlCodec;
