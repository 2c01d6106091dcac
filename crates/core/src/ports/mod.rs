mod decoder;
mod handler;
mod log_source;

pub use decoder::*;
pub use handler::*;
pub use log_source::*;
