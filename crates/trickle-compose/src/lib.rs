#![warn(clippy::pedantic)]

pub mod accumulator;
pub mod composed;
pub mod config;
pub mod scope;
pub mod streaming;

pub use accumulator::{ElementsAccumulator, Layer};
pub use composed::{ComposedDecoder, composed_decoder, composed_decoder_with};
pub use config::ComposerConfig;
pub use scope::{DecodingScope, Interrupt, SelfDecoder};
pub use streaming::{DEFAULT_CHUNK_SIZE, StreamingDecoder};
