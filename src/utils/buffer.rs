// -------------------------------------------------------------------------------------------------

/// Copy the given planar buffer into an interleaved one.
/// The planar buffer's channel count and the interleaved buffer's length define the frame count.
/// Planar channels must be at least as long as the interleaved buffer's frame count.
pub fn planar_to_interleaved(planar: &[Vec<f32>], interleaved: &mut [f32]) {
    let channel_count = planar.len();
    debug_assert!(interleaved.len() % channel_count == 0);
    debug_assert!(planar
        .iter()
        .all(|channel| channel.len() >= interleaved.len() / channel_count));
    match channel_count {
        1 => {
            for (i, p) in interleaved.iter_mut().zip(planar[0].iter()) {
                *i = *p;
            }
        }
        2 => {
            for (frame, (l, r)) in interleaved
                .chunks_exact_mut(2)
                .zip(planar[0].iter().zip(planar[1].iter()))
            {
                frame[0] = *l;
                frame[1] = *r;
            }
        }
        _ => {
            for (frame_index, frame) in interleaved.chunks_exact_mut(channel_count).enumerate() {
                for (value, channel_values) in frame.iter_mut().zip(planar) {
                    *value = channel_values[frame_index];
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Copy the given interleaved buffer into a planar one.
/// The planar buffer's channel count and the interleaved buffer's length define the frame count.
/// Planar channels must be at least as long as the interleaved buffer's frame count.
pub fn interleaved_to_planar(interleaved: &[f32], planar: &mut [Vec<f32>]) {
    let channel_count = planar.len();
    debug_assert!(interleaved.len() % channel_count == 0);
    debug_assert!(planar
        .iter()
        .all(|channel| channel.len() >= interleaved.len() / channel_count));
    match channel_count {
        1 => {
            for (p, i) in planar[0].iter_mut().zip(interleaved) {
                *p = *i;
            }
        }
        _ => {
            for (frame_index, frame) in interleaved.chunks_exact(channel_count).enumerate() {
                for (channel_values, value) in planar.iter_mut().zip(frame) {
                    channel_values[frame_index] = *value;
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Pre-allocated interleaved sample buffer with a readable range, used to hold samples which
/// got produced but could not yet be delivered. Never reallocates after creation.
pub struct TempBuffer {
    buffer: Vec<f32>,
    start: usize,
    end: usize,
}

impl TempBuffer {
    /// Create a new, empty buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            start: 0,
            end: 0,
        }
    }

    /// Number of samples in the current range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn get_mut(&mut self) -> &mut [f32] {
        &mut self.buffer[self.start..self.end]
    }

    pub fn set_range(&mut self, start: usize, end: usize) {
        assert!(start <= end && end <= self.buffer.len(), "invalid range");
        self.start = start;
        self.end = end;
    }

    /// Empty the range.
    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Mark the given number of samples from the range's start as read.
    pub fn consume(&mut self, samples: usize) {
        debug_assert!(samples <= self.len(), "consuming more than available");
        self.start = (self.start + samples).min(self.end);
    }

    /// Copy as many samples as possible from the range into target.
    /// Returns the number of copied samples. Does not consume them.
    pub fn copy_to(&self, target: &mut [f32]) -> usize {
        let len = self.len().min(target.len());
        target[..len].copy_from_slice(&self.buffer[self.start..self.start + len]);
        len
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec;

    #[test]
    fn planar_interleaved() {
        // mono
        let planar_mono = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let interleaved_mono = vec![1.0, 2.0, 3.0, 4.0];
        let mut planar_mono_copy = vec![vec![0.0; 4]];
        let mut interleaved_mono_copy = vec![0.0; 4];

        planar_to_interleaved(&planar_mono, &mut interleaved_mono_copy);
        interleaved_to_planar(&interleaved_mono, &mut planar_mono_copy);
        assert_eq!(planar_mono, planar_mono_copy);
        assert_eq!(interleaved_mono, interleaved_mono_copy);

        // stereo
        let planar_stereo = vec![vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 3.0, 2.0, 1.0]];
        let interleaved_stereo = vec![1.0, 4.0, 2.0, 3.0, 3.0, 2.0, 4.0, 1.0];
        let mut planar_stereo_copy = vec![vec![0.0; 4]; 2];
        let mut interleaved_stereo_copy = vec![0.0; 8];

        planar_to_interleaved(&planar_stereo, &mut interleaved_stereo_copy);
        interleaved_to_planar(&interleaved_stereo, &mut planar_stereo_copy);
        assert_eq!(planar_stereo, planar_stereo_copy);
        assert_eq!(interleaved_stereo, interleaved_stereo_copy);

        // general
        let planar_general = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![4.0, 3.0, 2.0, 1.0],
            vec![2.0, 1.0, 4.0, 3.0],
        ];
        let interleaved_general = vec![1.0, 4.0, 2.0, 2.0, 3.0, 1.0, 3.0, 2.0, 4.0, 4.0, 1.0, 3.0];
        let mut planar_general_copy = vec![vec![0.0; 4]; 3];
        let mut interleaved_general_copy = vec![0.0; 12];
        planar_to_interleaved(&planar_general, &mut interleaved_general_copy);
        interleaved_to_planar(&interleaved_general, &mut planar_general_copy);
        assert_eq!(planar_general, planar_general_copy);
        assert_eq!(interleaved_general, interleaved_general_copy);
    }

    #[test]
    fn planar_interleaved_partial() {
        // planar buffers may be larger than the interleaved frame count
        let mut planar = vec![vec![0.0; 8]; 2];
        interleaved_to_planar(&[1.0, 2.0, 3.0, 4.0], &mut planar);
        assert_eq!(planar[0][..2], [1.0, 3.0]);
        assert_eq!(planar[1][..2], [2.0, 4.0]);
        assert_eq!(planar[0][2..], [0.0; 6]);

        let mut interleaved = vec![0.0; 4];
        planar_to_interleaved(&planar, &mut interleaved);
        assert_eq!(interleaved, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn temp_buffer() {
        let mut buffer = TempBuffer::new(6);
        assert!(buffer.is_empty());

        buffer.set_range(0, 4);
        buffer.get_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.len(), 4);

        let mut target = [0.0; 3];
        assert_eq!(buffer.copy_to(&mut target), 3);
        assert_eq!(target, [1.0, 2.0, 3.0]);
        buffer.consume(3);
        assert_eq!(buffer.len(), 1);

        let mut target = [0.0; 3];
        assert_eq!(buffer.copy_to(&mut target), 1);
        assert_eq!(target[0], 4.0);
        buffer.consume(1);
        assert!(buffer.is_empty());

        buffer.set_range(0, 6);
        assert_eq!(buffer.len(), 6);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
