//! Pull based sample rate conversion of interleaved audio streams.

use crate::{
    engine::{clamp_ratio, create_engine, ConversionEngine, EngineSpecs, Quality},
    Error,
};

use cursor::InputCursor;

pub(crate) mod cursor;

// -------------------------------------------------------------------------------------------------

/// Maximum number of input frames the conversion engine gets handed out per pull.
pub const CHUNK_LEN: usize = 256;

// -------------------------------------------------------------------------------------------------

/// Result of a `StreamResampler::process` call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessedFrames {
    /// Number of input frames which got consumed.
    pub frames_used: usize,
    /// Number of output frames which got written.
    pub frames_generated: usize,
}

// -------------------------------------------------------------------------------------------------

/// A conversion engine together with the specs it got created with. Destroys the engine when
/// dropped, including when it gets replaced by a new session.
struct EngineSession {
    specs: EngineSpecs,
    engine: Box<dyn ConversionEngine>,
}

impl EngineSession {
    fn new(specs: EngineSpecs) -> Result<Self, Error> {
        let engine = create_engine(specs)?;
        log::debug!(
            "Created '{}' resampler session with {} channel(s)",
            specs.quality,
            specs.channel_count
        );
        Ok(Self { specs, engine })
    }

    fn from_engine(engine: Box<dyn ConversionEngine>) -> Self {
        let specs = engine.specs();
        Self { specs, engine }
    }

    fn fresh(&self) -> Result<Self, Error> {
        Ok(Self::from_engine(self.engine.fresh()?))
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        log::debug!(
            "Destroying '{}' resampler session with {} channel(s)",
            self.specs.quality,
            self.specs.channel_count
        );
    }
}

// -------------------------------------------------------------------------------------------------

/// Converts interleaved audio streams from one sample rate to another.
///
/// The resampler owns a conversion engine session, which pulls input from the buffer that got
/// passed to `process` in chunks of at most `CHUNK_LEN` frames, until the requested output is
/// generated or the input is exhausted. The session carries the stream's interpolation history
/// across `process` calls, until the resampler gets `reset` or reconfigured.
///
/// Cloning a resampler creates a configuration clone: the clone gets a new session with the
/// same quality and channel count, but none of the original's stream history.
///
/// ### Example
///
/// ```rust
/// use stream_resampler::{Quality, StreamResampler};
///
/// let mut resampler = StreamResampler::with_specs(Quality::Linear, 1)?;
///
/// let input = vec![0.0; 441];
/// let mut output = vec![0.0; 480];
/// let result = resampler.process(&input, 0, input.len(), &mut output, 48000.0 / 44100.0);
///
/// assert!(result.frames_used <= input.len());
/// assert!(result.frames_generated <= output.len());
/// # Ok::<(), stream_resampler::Error>(())
/// ```
#[derive(Default)]
pub struct StreamResampler {
    session: Option<EngineSession>,
}

impl StreamResampler {
    /// Create a new, unconfigured resampler. It must be configured before it can process.
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Create a new resampler and configure it with the given quality and channel count.
    pub fn with_specs(quality: Quality, channel_count: usize) -> Result<Self, Error> {
        let mut resampler = Self::new();
        resampler.configure(quality, channel_count)?;
        Ok(resampler)
    }

    /// Create a new resampler which uses the given, custom conversion engine.
    pub fn with_engine(engine: Box<dyn ConversionEngine>) -> Self {
        Self {
            session: Some(EngineSession::from_engine(engine)),
        }
    }

    /// (Re)create the resampler's engine session for the given quality and channel count,
    /// discarding any previous session and its stream history.
    ///
    /// When the new session can't be created, an `Error::AllocationError` is returned and an
    /// already existing session is kept as it is.
    pub fn configure(&mut self, quality: Quality, channel_count: usize) -> Result<(), Error> {
        let session = EngineSession::new(EngineSpecs::new(quality, channel_count))?;
        self.session = Some(session);
        Ok(())
    }

    /// True when the resampler got successfully configured.
    pub fn is_configured(&self) -> bool {
        self.session.is_some()
    }

    /// The specs of the current engine session, if the resampler is configured.
    pub fn specs(&self) -> Option<EngineSpecs> {
        self.session.as_ref().map(|session| session.specs)
    }

    /// Configured quality, if any.
    pub fn quality(&self) -> Option<Quality> {
        self.specs().map(|specs| specs.quality)
    }

    /// Configured channel count, if any.
    pub fn channel_count(&self) -> Option<usize> {
        self.specs().map(|specs| specs.channel_count)
    }

    /// Convert the interleaved input frames `input_pos..input_length` of the given input buffer
    /// into the given interleaved output buffer, using the given output/input sample rate ratio.
    ///
    /// Generates up to `output.len() / channel_count` frames. Less frames get generated only
    /// when the input got exhausted: the session's buffered tail then gets flushed into the
    /// output. Returns the number of consumed input and generated output frames.
    ///
    /// Panics when the resampler is not configured or when the input range is invalid.
    pub fn process(
        &mut self,
        input: &[f32],
        input_pos: usize,
        input_length: usize,
        output: &mut [f32],
        ratio: f64,
    ) -> ProcessedFrames {
        let session = self
            .session
            .as_mut()
            .unwrap_or_else(|| panic!("Resampler must be configured before processing"));

        let channel_count = session.specs.channel_count;
        debug_assert!(
            output.len() % channel_count == 0,
            "Output buffer must contain whole frames"
        );
        let output_capacity = output.len() / channel_count;
        let output = &mut output[..output_capacity * channel_count];

        let ratio = clamp_ratio(ratio);
        let mut cursor = InputCursor::new(input, input_pos, input_length, channel_count);

        let frames_generated =
            Self::assert_no_alloc(|| session.engine.read(1.0 / ratio, output, &mut cursor));
        debug_assert!(frames_generated <= output_capacity);

        let frames_used = cursor.frames_used();
        debug_assert!(frames_used <= input_length - input_pos);

        ProcessedFrames {
            frames_used,
            frames_generated,
        }
    }

    /// Clear the session's interpolation and filter history, e.g. after seeking or when
    /// looping, without reallocating the session. The next `process` call behaves as if the
    /// resampler just got configured.
    ///
    /// Panics when the resampler is not configured.
    pub fn reset(&mut self) {
        let session = self
            .session
            .as_mut()
            .unwrap_or_else(|| panic!("Resampler must be configured before resetting"));
        log::debug!("Resetting '{}' resampler session", session.specs.quality);
        session.engine.reset();
    }

    /// Create a configuration clone: a resampler with the same specs but a new engine session.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let session = match &self.session {
            Some(session) => Some(session.fresh()?),
            None => None,
        };
        Ok(Self { session })
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

impl Clone for StreamResampler {
    fn clone(&self) -> Self {
        self.try_clone()
            .expect("Failed to recreate a resampler session with valid specs")
    }
}

// -------------------------------------------------------------------------------------------------
