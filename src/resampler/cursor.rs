use super::CHUNK_LEN;
use crate::engine::InputProvider;

// -------------------------------------------------------------------------------------------------

/// Read cursor over a caller owned, interleaved input buffer, which is valid for a single
/// `StreamResampler::process` call only. Hands out the buffer's frames in chunks of at most
/// `CHUNK_LEN` frames to the conversion engine and counts the handed out frames.
pub(crate) struct InputCursor<'a> {
    input: &'a [f32],
    position: usize,
    length: usize,
    channel_count: usize,
    frames_used: usize,
}

impl<'a> InputCursor<'a> {
    /// Create a new cursor over the frame range `position..length` of the given buffer.
    pub fn new(input: &'a [f32], position: usize, length: usize, channel_count: usize) -> Self {
        debug_assert!(channel_count > 0, "Invalid channel count");
        assert!(position <= length, "Input position must not exceed the input length");
        assert!(
            length * channel_count <= input.len(),
            "Input length exceeds the input buffer"
        );
        Self {
            input,
            position,
            length,
            channel_count,
            frames_used: 0,
        }
    }

    /// Current read position in frames.
    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of frames which got handed out so far.
    pub fn frames_used(&self) -> usize {
        self.frames_used
    }
}

impl InputProvider for InputCursor<'_> {
    fn pull(&mut self) -> &[f32] {
        let frames = (self.length - self.position).min(CHUNK_LEN);
        let start = self.position * self.channel_count;
        let end = start + frames * self.channel_count;

        self.position += frames;
        self.frames_used += frames;
        debug_assert!(self.position <= self.length);

        &self.input[start..end]
    }
}

// -------------------------------------------------------------------------------------------------
