//! Static nonlinearities.

/// Transparent below `knee`, then a tanh shoulder that approaches `1.0`.
#[inline]
pub fn soft_limit(x: f32, knee: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude <= knee {
        x
    } else {
        let headroom = (1.0 - knee).max(1e-6);
        let shaped = knee + headroom * ((magnitude - knee) / headroom).tanh();
        shaped.copysign(x)
    }
}

/// `tanh(x·drive)/drive` normalized so small signals pass at unity.
#[inline]
pub fn saturate(x: f32, drive: f32) -> f32 {
    let drive = drive.max(1e-3);
    (x * drive).tanh() / drive
}
