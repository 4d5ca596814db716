use super::{ConversionEngine, EngineSpecs, InputProvider, InputQueue, Quality};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Simple, not bandlimited interpolating engine for the `ZeroOrderHold` and `Linear` qualities.
///
/// Has no latency: the first output frame is the first input frame, and at a 1.0 ratio the
/// output is an exact copy of the input. Suitable when lots of streams need to be converted at
/// the same time or when CPU resources are a problem. Downsampling may cause aliasing.
pub struct PolynomialEngine {
    specs: EngineSpecs,
    queue: InputQueue,
    // frame at the integer part of the current read position
    current_frame: Vec<f32>,
    has_current_frame: bool,
    // fractional read position, relative to the current frame
    position: f64,
}

impl PolynomialEngine {
    pub fn new(specs: EngineSpecs) -> Result<Self, Error> {
        specs.validate()?;
        if !matches!(specs.quality, Quality::ZeroOrderHold | Quality::Linear) {
            return Err(Error::AllocationError(
                format!("Quality '{}' is not a polynomial quality", specs.quality).into(),
            ));
        }
        let queue = InputQueue::new(specs.channel_count, 0);
        let current_frame = vec![0.0; specs.channel_count];
        Ok(Self {
            specs,
            queue,
            current_frame,
            has_current_frame: false,
            position: 0.0,
        })
    }

    #[inline]
    fn interpolate_linear(current: &[f32], next: &[f32], fraction: f32, output: &mut [f32]) {
        debug_assert!((0.0..=1.0).contains(&fraction));
        for ((o, a), b) in output.iter_mut().zip(current).zip(next) {
            *o = a + (b - a) * fraction;
        }
    }
}

impl ConversionEngine for PolynomialEngine {
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
        let step = input_frames_per_output_frame;
        debug_assert!(step > 0.0, "Invalid conversion step");

        let mut input_ended = false;
        let mut num_produced = 0;

        'outer_loop: for frame in output.chunks_exact_mut(channel_count) {
            // move to the input frame at the current read position
            while !self.has_current_frame || self.position >= 1.0 {
                if self.queue.is_empty() && (input_ended || self.queue.pull(input) == 0) {
                    break 'outer_loop;
                }
                self.queue.pop_frame(&mut self.current_frame);
                if self.has_current_frame {
                    self.position -= 1.0;
                } else {
                    self.has_current_frame = true;
                }
            }

            if self.position == 0.0 || self.specs.quality == Quality::ZeroOrderHold {
                frame.copy_from_slice(&self.current_frame);
            } else {
                if self.queue.is_empty() && !input_ended && self.queue.pull(input) == 0 {
                    input_ended = true;
                }
                // hold the last frame when flushing the tail
                let next_frame = self.queue.front_frame().unwrap_or(&self.current_frame);
                Self::interpolate_linear(
                    &self.current_frame,
                    next_frame,
                    self.position as f32,
                    frame,
                );
            }

            num_produced += 1;
            self.position += step;
        }

        num_produced
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.current_frame.fill(0.0);
        self.has_current_frame = false;
        self.position = 0.0;
    }

    fn fresh(&self) -> Result<Box<dyn ConversionEngine>, Error> {
        Ok(Box::new(Self::new(self.specs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // Hands out the given interleaved buffer in fixed size chunks.
    struct ChunkedInput<'a> {
        samples: &'a [f32],
        chunk_samples: usize,
        pos: usize,
    }

    impl<'a> ChunkedInput<'a> {
        fn new(samples: &'a [f32], chunk_samples: usize) -> Self {
            Self {
                samples,
                chunk_samples,
                pos: 0,
            }
        }
    }

    impl InputProvider for ChunkedInput<'_> {
        fn pull(&mut self) -> &[f32] {
            let end = (self.pos + self.chunk_samples).min(self.samples.len());
            let chunk = &self.samples[self.pos..end];
            self.pos = end;
            chunk
        }
    }

    #[test]
    fn pass_through() {
        let input = (0..100).map(|v| v as f32).collect::<Vec<_>>();
        for quality in [Quality::ZeroOrderHold, Quality::Linear] {
            let mut engine = PolynomialEngine::new(EngineSpecs::new(quality, 1)).unwrap();
            let mut provider = ChunkedInput::new(&input, 7);
            let mut output = vec![0.0; 100];
            assert_eq!(engine.read(1.0, &mut output, &mut provider), 100);
            assert_eq!(output, input);
        }
    }

    #[test]
    fn upsample_linear() {
        let input = [0.0, 2.0, 4.0, 6.0];
        let mut engine = PolynomialEngine::new(EngineSpecs::new(Quality::Linear, 1)).unwrap();
        let mut provider = ChunkedInput::new(&input, 2);
        let mut output = vec![0.0; 16];
        // the last input frame is held while flushing the tail
        assert_eq!(engine.read(0.5, &mut output, &mut provider), 8);
        assert_eq!(output[..8], [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 6.0]);
    }

    #[test]
    fn upsample_hold() {
        let input = [1.0, -1.0, 2.0, -2.0];
        let mut engine =
            PolynomialEngine::new(EngineSpecs::new(Quality::ZeroOrderHold, 2)).unwrap();
        let mut provider = ChunkedInput::new(&input, 2);
        let mut output = vec![0.0; 16];
        assert_eq!(engine.read(0.5, &mut output, &mut provider), 4);
        assert_eq!(output[..8], [1.0, -1.0, 1.0, -1.0, 2.0, -2.0, 2.0, -2.0]);
    }

    #[test]
    fn downsample() {
        let input = (0..10).map(|v| v as f32).collect::<Vec<_>>();
        let mut engine = PolynomialEngine::new(EngineSpecs::new(Quality::Linear, 1)).unwrap();
        let mut provider = ChunkedInput::new(&input, 3);
        let mut output = vec![0.0; 10];
        assert_eq!(engine.read(2.0, &mut output, &mut provider), 5);
        assert_eq!(output[..5], [0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn continues_across_reads() {
        let input = (0..8).map(|v| v as f32).collect::<Vec<_>>();
        let mut engine = PolynomialEngine::new(EngineSpecs::new(Quality::Linear, 1)).unwrap();
        let mut provider = ChunkedInput::new(&input, 8);

        let mut output = vec![0.0; 5];
        assert_eq!(engine.read(0.5, &mut output, &mut provider), 5);
        assert_eq!(output, [0.0, 0.5, 1.0, 1.5, 2.0]);
        // remaining input stays queued in the engine
        let mut output = vec![0.0; 5];
        assert_eq!(engine.read(0.5, &mut output, &mut provider), 5);
        assert_eq!(output, [2.5, 3.0, 3.5, 4.0, 4.5]);
    }

    #[test]
    fn reset_clears_history() {
        let mut engine = PolynomialEngine::new(EngineSpecs::new(Quality::Linear, 1)).unwrap();
        let mut output = vec![0.0; 3];

        let first = [10.0, 20.0, 30.0, 40.0];
        engine.read(0.5, &mut output, &mut ChunkedInput::new(&first, 4));
        engine.reset();

        let second = [1.0, 2.0];
        let mut output = vec![0.0; 8];
        assert_eq!(
            engine.read(0.5, &mut output, &mut ChunkedInput::new(&second, 4)),
            4
        );
        assert_eq!(output[..4], [1.0, 1.5, 2.0, 2.0]);
    }

    #[test]
    fn empty_input() {
        let mut engine = PolynomialEngine::new(EngineSpecs::new(Quality::Linear, 2)).unwrap();
        let mut output = vec![0.0; 8];
        assert_eq!(engine.read(1.0, &mut output, &mut ChunkedInput::new(&[], 4)), 0);
        assert!(PolynomialEngine::new(EngineSpecs::new(Quality::Best, 2)).is_err());
    }
}
