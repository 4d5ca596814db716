use rubato::{
    Resampler, SincFixedOut, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::{ConversionEngine, EngineSpecs, InputProvider, InputQueue, Quality};
use crate::{
    utils::buffer::{interleaved_to_planar, planar_to_interleaved, TempBuffer},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Bandlimited conversion engine for the `Best`, `Medium` and `Fastest` qualities, using a
/// `rubato` SincFixedOut resampler.
///
/// The resampler's read position starts half a filter length before the first input frame, so
/// output frames are aligned with the input frames without skipping any output. When the input
/// ended, the remaining output is flushed by zero-padding the input up to the number of output
/// frames the stream accounts for. Input which arrives after such a flush starts a new stream.
pub struct SincEngine {
    specs: EngineSpecs,
    resampler: SincFixedOut<f32>,
    // output/input ratio the sinc filter got designed for
    design_ratio: f64,
    ratio: f64,
    queue: InputQueue,
    planar_input: Vec<Vec<f32>>,
    planar_output: Vec<Vec<f32>>,
    pending_output: TempBuffer,
    // output frames the converted input accounts for, which are not yet produced
    unproduced_output_frames: f64,
    has_history: bool,
}

impl SincEngine {
    // Number of output frames the sinc resampler generates per process call.
    const OUTPUT_CHUNK_FRAMES: usize = 64;
    // Ratio changes up to this factor relative to the design ratio don't need a new filter.
    const MAX_RELATIVE_RATIO: f64 = 2.0;

    pub fn new(specs: EngineSpecs) -> Result<Self, Error> {
        specs.validate()?;
        let design_ratio = 1.0;
        let resampler = Self::create_resampler(specs, design_ratio)?;
        let planar_input = resampler.input_buffer_allocate(true);
        let planar_output = resampler.output_buffer_allocate(true);
        let queue = InputQueue::new(specs.channel_count, resampler.input_frames_max());
        let pending_output =
            TempBuffer::new(resampler.output_frames_max() * specs.channel_count);
        Ok(Self {
            specs,
            resampler,
            design_ratio,
            ratio: design_ratio,
            queue,
            planar_input,
            planar_output,
            pending_output,
            unproduced_output_frames: 0.0,
            has_history: false,
        })
    }

    fn interpolation_parameters(quality: Quality) -> Result<SincInterpolationParameters, Error> {
        match quality {
            Quality::Best => Ok(SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                oversampling_factor: 256,
                interpolation: SincInterpolationType::Cubic,
                window: WindowFunction::BlackmanHarris2,
            }),
            Quality::Medium => Ok(SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.925,
                oversampling_factor: 128,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::Blackman2,
            }),
            Quality::Fastest => Ok(SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.915,
                oversampling_factor: 64,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::Hann2,
            }),
            Quality::ZeroOrderHold | Quality::Linear => Err(Error::AllocationError(
                format!("Quality '{quality}' is not a sinc quality").into(),
            )),
        }
    }

    fn create_resampler(specs: EngineSpecs, ratio: f64) -> Result<SincFixedOut<f32>, Error> {
        let parameters = Self::interpolation_parameters(specs.quality)?;
        SincFixedOut::<f32>::new(
            ratio,
            Self::MAX_RELATIVE_RATIO,
            parameters,
            Self::OUTPUT_CHUNK_FRAMES,
            specs.channel_count,
        )
        .map_err(|err| Error::AllocationError(Box::new(err)))
    }

    fn update_ratio(&mut self, ratio: f64) {
        if ratio == self.ratio {
            return;
        }
        let relative_ratio = ratio / self.design_ratio;
        if (1.0 / Self::MAX_RELATIVE_RATIO..=Self::MAX_RELATIVE_RATIO).contains(&relative_ratio) {
            // ramp ratio changes within running streams only
            match self.resampler.set_resample_ratio(ratio, self.has_history) {
                Ok(()) => self.ratio = ratio,
                Err(err) => log::warn!("Failed to change sinc resampling ratio: {err}"),
            }
        } else {
            // the filter's cutoff depends on the ratio: this needs a new resampler
            match Self::create_resampler(self.specs, ratio) {
                Ok(resampler) => {
                    log::debug!(
                        "Redesigning '{}' sinc filter for ratio {ratio}",
                        self.specs.quality
                    );
                    self.planar_input = resampler.input_buffer_allocate(true);
                    self.planar_output = resampler.output_buffer_allocate(true);
                    self.queue.reserve(resampler.input_frames_max());
                    self.resampler = resampler;
                    self.design_ratio = ratio;
                    self.ratio = ratio;
                }
                Err(err) => {
                    log::error!("Failed to create sinc filter for ratio {ratio}: {err}");
                }
            }
        }
    }

    /// Convert the given number of queued input frames, zero-padding up to the number of frames
    /// the resampler needs. Returns false when the resampler failed.
    fn convert_chunk(&mut self, input_frames: usize) -> bool {
        let channel_count = self.specs.channel_count;
        let needed_frames = self.resampler.input_frames_next();
        debug_assert!(input_frames <= needed_frames);

        interleaved_to_planar(self.queue.front(input_frames), &mut self.planar_input);
        for channel in self.planar_input.iter_mut() {
            channel[input_frames..needed_frames].fill(0.0);
        }
        self.queue.consume(input_frames);

        let output_frames = match self.resampler.process_into_buffer(
            &self.planar_input,
            &mut self.planar_output,
            None,
        ) {
            Ok((_, output_frames)) => output_frames,
            Err(err) => {
                log::error!("Sinc resampler failed to process: {err}");
                return false;
            }
        };

        if input_frames > 0 {
            self.has_history = true;
            self.unproduced_output_frames += input_frames as f64 * self.ratio;
        }

        let mut frames = output_frames;
        if input_frames < needed_frames {
            // flushing: only emit what the input accounts for
            let remaining_frames = self.unproduced_output_frames.round().max(0.0) as usize;
            frames = frames.min(remaining_frames);
        }
        self.unproduced_output_frames -= frames as f64;

        self.pending_output.set_range(0, frames * channel_count);
        planar_to_interleaved(&self.planar_output, self.pending_output.get_mut());
        true
    }

    /// Forget about the current stream after its tail got flushed.
    fn finish_stream(&mut self) {
        self.resampler.reset();
        self.ratio = self.design_ratio;
        self.unproduced_output_frames = 0.0;
        self.has_history = false;
    }
}

impl ConversionEngine for SincEngine {
    fn specs(&self) -> EngineSpecs {
        self.specs
    }

    fn read(
        &mut self,
        input_frames_per_output_frame: f64,
        output: &mut [f32],
        input: &mut dyn InputProvider,
    ) -> usize {
        let channel_count = self.specs.channel_count;
        self.update_ratio(1.0 / input_frames_per_output_frame);

        let output_len = output.len() / channel_count * channel_count;
        let output = &mut output[..output_len];

        let mut output_written = 0;
        let mut input_ended = false;

        loop {
            // First, output all pending data
            if !self.pending_output.is_empty() {
                let copied = self.pending_output.copy_to(&mut output[output_written..]);
                self.pending_output.consume(copied);
                output_written += copied;
            }
            if output_written == output.len() {
                break;
            }

            // Then pull and convert new input
            let needed_frames = self.resampler.input_frames_next();
            while !input_ended && self.queue.frames() < needed_frames {
                if self.queue.pull(input) == 0 {
                    input_ended = true;
                }
            }
            let available_frames = self.queue.frames();
            let converted = if available_frames >= needed_frames {
                self.convert_chunk(needed_frames)
            } else if input_ended
                && (available_frames > 0 || self.unproduced_output_frames.round() > 0.0)
            {
                self.convert_chunk(available_frames)
            } else {
                false
            };
            if !converted {
                break;
            }
        }

        if input_ended
            && self.has_history
            && self.queue.is_empty()
            && self.unproduced_output_frames.round() <= 0.0
        {
            self.finish_stream();
        }

        output_written / channel_count
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.pending_output.clear();
        self.finish_stream();
    }

    fn fresh(&self) -> Result<Box<dyn ConversionEngine>, Error> {
        Ok(Box::new(Self::new(self.specs)?))
    }
}

// -------------------------------------------------------------------------------------------------
