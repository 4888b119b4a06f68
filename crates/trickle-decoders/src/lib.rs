#![warn(clippy::pedantic)]

pub mod common;
pub mod ext;
pub mod fold;
pub mod item;
pub mod reduction;
pub mod varint;

pub use common::Endianness;
pub use ext::DecoderExt;
pub use fold::{Collect, Fold, FnFold};
pub use item::{
    ConstantDecoder, ConstantSizedItemDecoder, MarkerEndedItemDecoder, NothingDecoder,
    PrefixedSizeItemDecoder,
};
pub use reduction::{
    ConstantArityReductionDecoder, MarkerEndedReductionDecoder, PrefixedArityReductionDecoder,
};
pub use varint::VarIntDecoder;
