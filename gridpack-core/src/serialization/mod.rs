//! Serialization framework: byte-level I/O and the compact format.

pub mod compact;
mod data_input;
mod data_output;

pub use data_input::{DataInput, ObjectDataInput};
pub use data_output::{DataOutput, ObjectDataOutput};
