//! Flush-to-zero guard for subnormal floats.
//!
//! Recursive filters decaying toward silence produce subnormal numbers,
//! which are slow on most CPUs. [`DenormalGuard`] sets the FTZ/DAZ bits for
//! the current thread and restores the previous state on drop.

/// Scoped flush-to-zero / denormals-are-zero mode.
#[derive(Debug)]
pub struct DenormalGuard {
    #[cfg(target_arch = "x86_64")]
    previous: u32,
    #[cfg(target_arch = "aarch64")]
    previous: u64,
}

#[cfg(target_arch = "x86_64")]
const MXCSR_FTZ_DAZ: u32 = 0x8040;

#[cfg(target_arch = "aarch64")]
const FPCR_FZ: u64 = 1 << 24;

impl DenormalGuard {
    #[cfg(target_arch = "x86_64")]
    #[inline]
    #[allow(deprecated)]
    pub fn new() -> Self {
        use std::arch::x86_64::{_mm_getcsr, _mm_setcsr};
        // SAFETY: SSE is part of the x86_64 baseline and only FP mode bits change.
        let previous = unsafe { _mm_getcsr() };
        unsafe { _mm_setcsr(previous | MXCSR_FTZ_DAZ) };
        Self { previous }
    }

    #[cfg(target_arch = "aarch64")]
    #[inline]
    pub fn new() -> Self {
        let previous: u64;
        // SAFETY: reading and writing FPCR only changes FP mode bits.
        unsafe {
            std::arch::asm!("mrs {0}, fpcr", out(reg) previous);
            std::arch::asm!("msr fpcr, {0}", in(reg) previous | FPCR_FZ);
        }
        Self { previous }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    #[inline]
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DenormalGuard {
    #[inline]
    #[allow(deprecated)]
    fn drop(&mut self) {
        #[cfg(target_arch = "x86_64")]
        // SAFETY: restores the value read in `new`.
        unsafe {
            std::arch::x86_64::_mm_setcsr(self.previous)
        };

        #[cfg(target_arch = "aarch64")]
        // SAFETY: restores the value read in `new`.
        unsafe {
            std::arch::asm!("msr fpcr, {0}", in(reg) self.previous)
        };
    }
}

/// Flush a subnormal value to zero in software.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < f32::MIN_POSITIVE {
        0.0
    } else {
        x
    }
}

/// f64 variant of [`flush_denormal`].
#[inline]
pub fn flush_denormal_f64(x: f64) -> f64 {
    if x.abs() < f64::MIN_POSITIVE {
        0.0
    } else {
        x
    }
}
