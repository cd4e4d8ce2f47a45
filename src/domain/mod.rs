// Domain layer: record model, shapes and ports. No file or format knowledge here.

pub mod model;
pub mod ports;
