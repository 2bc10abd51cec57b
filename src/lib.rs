//! Core of a blocked, filter-pipelined compression format (c-blosc2
//! style): chunk header codec, filter primitives and pipeline, codec
//! registry, block/chunk engines, worker pool, getitem and dictionary
//! training.

pub mod api;
pub mod block;
pub mod chunk;
pub mod codecs;
pub mod constants;
pub mod context;
pub mod dict;
pub mod env;
pub mod error;
pub mod filters;
pub mod getitem;
pub mod header;
pub mod pool;
pub mod special;

pub use chunk::SplitMode;
pub use codecs::Codec;
pub use context::{Context, Cparams, CparamsBuilder, Dparams, DparamsBuilder};
pub use error::{BloscError, Result};
pub use special::SpecialType;
