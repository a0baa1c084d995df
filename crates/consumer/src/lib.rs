pub mod consumer;
pub mod source;
