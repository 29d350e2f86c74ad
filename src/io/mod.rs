// src/io/mod.rs
//
// Device I/O: the serial line source and its error type.

mod error;
pub mod serial;

pub use error::IoError;
