//! ConversionEngine trait for stateful sample rate converters which pull their input on demand.

use crate::{resampler::CHUNK_LEN, Error};

pub(crate) mod polynomial;
pub(crate) mod sinc;

// -------------------------------------------------------------------------------------------------

/// Maximum number of interleaved channels a conversion engine can be created with.
pub const MAX_CHANNEL_COUNT: usize = 64;

/// Maximum up- or downsampling factor. Output/input ratios are clamped to
/// `1.0 / MAX_RATIO ..= MAX_RATIO`.
pub const MAX_RATIO: f64 = 256.0;

// -------------------------------------------------------------------------------------------------

/// Resampling quality levels, trading conversion speed for fidelity.
///
/// The numeric level of each variant is stable and can be used to persist or exchange qualities,
/// see `Quality::level` and `Quality::try_from`.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::FromRepr,
    strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
#[repr(u32)]
pub enum Quality {
    /// Bandlimited sinc interpolation with the longest filter. Best fidelity, highest CPU load.
    Best = 0,
    /// Bandlimited sinc interpolation with a medium sized filter.
    #[default]
    Medium = 1,
    /// Bandlimited sinc interpolation with a short filter.
    Fastest = 2,
    /// Repeats the last input frame. Very fast, not bandlimited, but an exact pass-through
    /// at a 1.0 ratio.
    ZeroOrderHold = 3,
    /// Linear interpolation between adjacent input frames. Fast, not bandlimited.
    Linear = 4,
}

impl Quality {
    /// Stable numeric level of this quality.
    pub fn level(self) -> u32 {
        self as u32
    }

    /// True for the bandlimited sinc qualities.
    pub fn is_bandlimited(self) -> bool {
        matches!(self, Self::Best | Self::Medium | Self::Fastest)
    }
}

impl TryFrom<u32> for Quality {
    type Error = Error;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        Self::from_repr(level).ok_or(Error::UnsupportedQuality(level))
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.level()
    }
}

// -------------------------------------------------------------------------------------------------

/// Conversion engine specs: the configuration an engine session gets created with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineSpecs {
    pub quality: Quality,
    pub channel_count: usize,
}

impl EngineSpecs {
    pub fn new(quality: Quality, channel_count: usize) -> Self {
        Self {
            quality,
            channel_count,
        }
    }

    /// Check if an engine can be created with the specs.
    pub fn validate(&self) -> Result<(), Error> {
        if self.channel_count == 0 || self.channel_count > MAX_CHANNEL_COUNT {
            return Err(Error::AllocationError(
                format!(
                    "Unsupported channel count {} for quality '{}' (must be 1..={})",
                    self.channel_count, self.quality, MAX_CHANNEL_COUNT
                )
                .into(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Pull callback interface of a conversion engine: hands out the engine's input.
pub trait InputProvider {
    /// Returns the next chunk of interleaved input frames. An empty chunk signals the end of
    /// input: the engine then flushes its buffered tail into the output.
    fn pull(&mut self) -> &[f32];
}

// -------------------------------------------------------------------------------------------------

/// Conversion engine interface.
///
/// An engine is an opaque, stateful session which carries interpolation and filter history
/// across `read` calls until it gets `reset`. Input is not pushed into the engine, but pulled
/// from the given `InputProvider` as needed to fill the output.
pub trait ConversionEngine: Send {
    /// The specs this engine got created with.
    fn specs(&self) -> EngineSpecs;

    /// Generate up to `output.len() / channel_count` interleaved output frames, pulling input
    /// chunks from `input` as needed. `input_frames_per_output_frame` is the reciprocal of the
    /// output/input sample rate ratio.
    ///
    /// Returns the number of written output frames. Writes less frames than requested only
    /// when the input ended and the engine's buffered tail is flushed.
    fn read(
        &mut self,
        input_frames_per_output_frame: f64,
        output: &mut [f32],
        input: &mut dyn InputProvider,
    ) -> usize;

    /// Clear interpolation and filter history, keeping the specs. Makes the engine ready for a
    /// new, unrelated stream.
    fn reset(&mut self);

    /// Create a new session with the same specs, but without any stream history.
    fn fresh(&self) -> Result<Box<dyn ConversionEngine>, Error>;
}

// -------------------------------------------------------------------------------------------------

/// Create a new conversion engine session for the given specs.
pub fn create_engine(specs: EngineSpecs) -> Result<Box<dyn ConversionEngine>, Error> {
    specs.validate()?;
    if specs.quality.is_bandlimited() {
        Ok(Box::new(sinc::SincEngine::new(specs)?))
    } else {
        Ok(Box::new(polynomial::PolynomialEngine::new(specs)?))
    }
}

/// Clamp the given output/input ratio into the supported range.
pub(crate) fn clamp_ratio(ratio: f64) -> f64 {
    debug_assert!(
        ratio.is_finite() && ratio > 0.0,
        "Invalid resampling ratio: {ratio}"
    );
    if !(ratio.is_finite() && ratio > 0.0) {
        log::warn!("Invalid resampling ratio {ratio}: falling back to 1.0");
        1.0
    } else if !(1.0 / MAX_RATIO..=MAX_RATIO).contains(&ratio) {
        log::warn!("Resampling ratio {ratio} is out of range: clamping it");
        ratio.clamp(1.0 / MAX_RATIO, MAX_RATIO)
    } else {
        ratio
    }
}

// -------------------------------------------------------------------------------------------------

/// Interleaved FIFO for input frames which got pulled from an `InputProvider`, but which are not
/// yet converted by the engine.
pub(crate) struct InputQueue {
    samples: Vec<f32>,
    read_pos: usize,
    channel_count: usize,
}

impl InputQueue {
    pub fn new(channel_count: usize, capacity_frames: usize) -> Self {
        let samples = Vec::with_capacity((capacity_frames + CHUNK_LEN) * channel_count);
        Self {
            samples,
            read_pos: 0,
            channel_count,
        }
    }

    /// Number of queued frames.
    pub fn frames(&self) -> usize {
        (self.samples.len() - self.read_pos) / self.channel_count
    }

    pub fn is_empty(&self) -> bool {
        self.read_pos == self.samples.len()
    }

    /// Make sure the queue can hold the given number of frames plus a pulled chunk without
    /// reallocating.
    pub fn reserve(&mut self, capacity_frames: usize) {
        let required = (capacity_frames + CHUNK_LEN) * self.channel_count;
        if self.samples.capacity() < required {
            self.samples.reserve(required - self.samples.len());
        }
    }

    /// Pull the next chunk from the given provider into the queue.
    /// Returns the number of queued frames, 0 when the input ended.
    pub fn pull(&mut self, input: &mut dyn InputProvider) -> usize {
        let chunk = input.pull();
        debug_assert!(
            chunk.len() % self.channel_count == 0,
            "Pulled chunks must contain whole frames"
        );
        if chunk.is_empty() {
            return 0;
        }
        if self.read_pos > 0 {
            // move remaining frames to the front, this never reallocates
            self.samples.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.samples.extend_from_slice(chunk);
        chunk.len() / self.channel_count
    }

    /// The given number of queued frames from the front.
    pub fn front(&self, frames: usize) -> &[f32] {
        let end = self.read_pos + frames * self.channel_count;
        &self.samples[self.read_pos..end]
    }

    /// The first queued frame, if any.
    pub fn front_frame(&self) -> Option<&[f32]> {
        if self.is_empty() {
            None
        } else {
            Some(self.front(1))
        }
    }

    /// Remove the given number of frames from the front.
    pub fn consume(&mut self, frames: usize) {
        debug_assert!(frames <= self.frames(), "Consuming more frames than queued");
        self.read_pos = (self.read_pos + frames * self.channel_count).min(self.samples.len());
        if self.is_empty() {
            self.clear();
        }
    }

    /// Move the first queued frame into the given frame buffer.
    /// Returns false when the queue is empty.
    pub fn pop_frame(&mut self, frame: &mut [f32]) -> bool {
        debug_assert_eq!(frame.len(), self.channel_count);
        match self.front_frame() {
            Some(front) => {
                frame.copy_from_slice(front);
                self.consume(1);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.read_pos = 0;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::{IntoEnumIterator, VariantNames};

    struct Chunks(Vec<Vec<f32>>, usize);

    impl InputProvider for Chunks {
        fn pull(&mut self) -> &[f32] {
            if self.1 < self.0.len() {
                self.1 += 1;
                &self.0[self.1 - 1]
            } else {
                &[]
            }
        }
    }

    #[test]
    fn quality_levels() {
        for (index, quality) in Quality::iter().enumerate() {
            assert_eq!(quality.level(), index as u32);
            assert_eq!(Quality::try_from(quality.level()).unwrap(), quality);
        }
        assert!(matches!(
            Quality::try_from(5_u32),
            Err(Error::UnsupportedQuality(5))
        ));
        assert_eq!(u32::from(Quality::Linear), 4);
    }

    #[test]
    fn quality_names() {
        assert_eq!(Quality::from_str("best").unwrap(), Quality::Best);
        assert_eq!(
            Quality::from_str("zero-order-hold").unwrap(),
            Quality::ZeroOrderHold
        );
        assert_eq!(Quality::Fastest.to_string(), "fastest");
        assert!(Quality::from_str("ultra").is_err());
        assert_eq!(
            Quality::VARIANTS,
            ["best", "medium", "fastest", "zero-order-hold", "linear"]
        );
    }

    #[test]
    fn engine_selection() {
        for quality in Quality::iter() {
            let engine = create_engine(EngineSpecs::new(quality, 2)).unwrap();
            assert_eq!(engine.specs(), EngineSpecs::new(quality, 2));
        }
        assert!(Quality::Fastest.is_bandlimited());
        assert!(!Quality::Linear.is_bandlimited());
        assert!(!Quality::ZeroOrderHold.is_bandlimited());
    }

    #[test]
    fn specs_validation() {
        assert!(EngineSpecs::new(Quality::Best, 2).validate().is_ok());
        assert!(EngineSpecs::new(Quality::Linear, MAX_CHANNEL_COUNT)
            .validate()
            .is_ok());
        assert!(matches!(
            EngineSpecs::new(Quality::Best, 0).validate(),
            Err(Error::AllocationError(_))
        ));
        assert!(matches!(
            create_engine(EngineSpecs::new(Quality::Linear, MAX_CHANNEL_COUNT + 1)),
            Err(Error::AllocationError(_))
        ));
    }

    #[test]
    fn ratio_clamping() {
        assert_eq!(clamp_ratio(1.5), 1.5);
        assert_eq!(clamp_ratio(1000.0), MAX_RATIO);
        assert_eq!(clamp_ratio(0.0001), 1.0 / MAX_RATIO);
    }

    #[test]
    fn input_queue() {
        let mut provider = Chunks(vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0]], 0);
        let mut queue = InputQueue::new(2, 4);
        assert!(queue.is_empty());
        assert_eq!(queue.front_frame(), None);

        assert_eq!(queue.pull(&mut provider), 2);
        assert_eq!(queue.frames(), 2);

        let mut frame = [0.0; 2];
        assert!(queue.pop_frame(&mut frame));
        assert_eq!(frame, [1.0, 2.0]);

        assert_eq!(queue.pull(&mut provider), 1);
        assert_eq!(queue.front(2), &[3.0, 4.0, 5.0, 6.0]);
        queue.consume(1);
        assert_eq!(queue.front_frame(), Some(&[5.0, 6.0][..]));

        assert_eq!(queue.pull(&mut provider), 0);
        queue.consume(1);
        assert!(queue.is_empty());
        assert!(!queue.pop_frame(&mut frame));
    }
}
