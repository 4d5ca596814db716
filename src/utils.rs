//! Buffer helpers for interleaved and planar audio.

pub mod buffer;
