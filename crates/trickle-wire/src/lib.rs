#![warn(clippy::pedantic)]

pub mod buffer;
pub mod decoder;
pub mod error;
pub mod input;
pub mod source;
pub mod state;

pub use buffer::FeedBuffer;
pub use decoder::Decoder;
pub use error::DecodeError;
pub use input::{BitInput, DecoderInput, NullInput};
pub use source::{BufSource, ByteSource, FnSource, ReadSource, SliceSource};
pub use state::State;
