#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod engine;
mod error;
mod resampler;

// public, flat re-exports
pub use error::Error;

pub use engine::{
    create_engine, ConversionEngine, EngineSpecs, InputProvider, Quality, MAX_CHANNEL_COUNT,
    MAX_RATIO,
};

pub use resampler::{ProcessedFrames, StreamResampler, CHUNK_LEN};

// public mods
pub mod utils;

pub mod engines {
    //! Built-in conversion engine implementations.

    pub use super::engine::{polynomial::PolynomialEngine, sinc::SincEngine};
}
