//! Planar audio block borrowed from the host.

/// One block of mono or stereo audio, processed in place.
///
/// Stereo channels are always the same length.
#[derive(Debug)]
pub struct AudioBlock<'a> {
    left: &'a mut [f32],
    right: Option<&'a mut [f32]>,
}

impl<'a> AudioBlock<'a> {
    pub fn mono(samples: &'a mut [f32]) -> Self {
        Self {
            left: samples,
            right: None,
        }
    }

    /// Stereo block. The longer channel is truncated to the shorter one.
    pub fn stereo(left: &'a mut [f32], right: &'a mut [f32]) -> Self {
        let frames = left.len().min(right.len());
        Self {
            left: &mut left[..frames],
            right: Some(&mut right[..frames]),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        if self.right.is_some() {
            2
        } else {
            1
        }
    }

    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    /// Channel `ch` (0 or 1). Asking for channel 1 of a mono block yields
    /// the mono channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        match (ch, self.right.as_deref()) {
            (1, Some(right)) => right,
            _ => &*self.left,
        }
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        match (ch, self.right.as_deref_mut()) {
            (1, Some(right)) => right,
            _ => &mut *self.left,
        }
    }

    /// Both channels at once. `None` for a mono block.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [f32], Option<&mut [f32]>) {
        (&mut *self.left, self.right.as_deref_mut())
    }

    /// Frame `i` as (left, right). Mono blocks duplicate the channel.
    #[inline]
    pub fn frame(&self, i: usize) -> (f32, f32) {
        let l = self.left[i];
        let r = self.right.as_deref().map_or(l, |r| r[i]);
        (l, r)
    }

    /// Write frame `i`. Mono blocks take the average.
    #[inline]
    pub fn set_frame(&mut self, i: usize, l: f32, r: f32) {
        match self.right.as_deref_mut() {
            Some(right) => {
                self.left[i] = l;
                right[i] = r;
            }
            None => self.left[i] = 0.5 * (l + r),
        }
    }

    pub fn fill(&mut self, value: f32) {
        self.left.fill(value);
        if let Some(right) = self.right.as_deref_mut() {
            right.fill(value);
        }
    }

    /// Copy from another block of the same shape. Extra frames are left
    /// untouched.
    pub fn copy_from(&mut self, other: &AudioBlock<'_>) {
        for ch in 0..self.num_channels() {
            let src = other.channel(ch);
            let dst = self.channel_mut(ch);
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    pub fn apply_gain(&mut self, gain: f32) {
        self.left.iter_mut().for_each(|s| *s *= gain);
        if let Some(right) = self.right.as_deref_mut() {
            right.iter_mut().for_each(|s| *s *= gain);
        }
    }

    /// Replace NaN and infinite samples with silence. Returns how many were
    /// replaced.
    pub fn scrub_non_finite(&mut self) -> usize {
        let mut scrubbed = 0;
        let (left, right) = self.split_mut();
        for s in left.iter_mut().chain(right.into_iter().flatten()) {
            if !s.is_finite() {
                *s = 0.0;
                scrubbed += 1;
            }
        }
        scrubbed
    }

    /// Peak absolute sample across channels.
    pub fn peak(&self) -> f32 {
        let right = self.right.as_deref().unwrap_or(&[]);
        self.left
            .iter()
            .chain(right.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_truncates() {
        let mut l = [0.0f32; 8];
        let mut r = [0.0f32; 6];
        let block = AudioBlock::stereo(&mut l, &mut r);
        assert_eq!(block.len(), 6);
        assert_eq!(block.num_channels(), 2);
    }

    #[test]
    fn test_mono_channel_aliasing() {
        let mut m = [1.0f32, 2.0];
        let block = AudioBlock::mono(&mut m);
        assert_eq!(block.channel(1), &[1.0, 2.0]);
        assert_eq!(block.frame(1), (2.0, 2.0));
    }

    #[test]
    fn test_scrub_non_finite() {
        let mut l = [0.5, f32::NAN, 0.1];
        let mut r = [f32::INFINITY, 0.0, -0.2];
        let mut block = AudioBlock::stereo(&mut l, &mut r);
        assert_eq!(block.scrub_non_finite(), 2);
        assert_eq!(block.peak(), 0.5);
        assert_eq!(block.scrub_non_finite(), 0);
    }

    #[test]
    fn test_set_frame_mono_averages() {
        let mut m = [0.0f32; 2];
        let mut block = AudioBlock::mono(&mut m);
        block.set_frame(0, 1.0, 0.0);
        assert_eq!(m[0], 0.5);
    }
}
