mod projector;

pub use projector::*;
