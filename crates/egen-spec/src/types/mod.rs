pub mod api;
pub mod common;
pub mod document;
pub mod dtype;
pub mod error;
pub mod opcode;
