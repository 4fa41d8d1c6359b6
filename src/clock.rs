/// Microsecond time source.
///
/// Times the High pulse of every bit and stamps each [`Reading`](crate::Reading).
/// Any `FnMut() -> u64` closure is a clock, which lets callers plug in the
/// free-running timer of their HAL.
pub trait Clock {
    /// Microseconds since an arbitrary, fixed point (boot, timer start, ...).
    ///
    /// The counter may wrap; pulse widths are computed with wrapping arithmetic.
    fn now_us(&mut self) -> u64;
}

impl<F> Clock for F
where
    F: FnMut() -> u64,
{
    fn now_us(&mut self) -> u64 {
        self()
    }
}
