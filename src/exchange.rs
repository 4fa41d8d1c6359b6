//! The timing-critical part of a read: start signal, acknowledgement and
//! sampling of the 40 frame bits.
//!
//! Nothing in here logs or allocates; the caller reports the outcome once the
//! line has been released.

use core::ops::{Deref, DerefMut};

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin, PinState},
};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{DhtError, Phase};
use crate::frame::{BitSequence, FRAME_BITS};

/// Classifies a High pulse: strictly longer than the threshold is a `1`.
pub const fn bit_from_pulse(duration_us: u64, threshold_us: u32) -> bool {
    duration_us > threshold_us as u64
}

/// Exclusive hold on the data line for the duration of one exchange.
///
/// Dropping the guard releases the line (drives it high) on every exit path,
/// including unwinding.
struct LineGuard<'a, PIN: OutputPin> {
    pin: &'a mut PIN,
}

impl<'a, PIN: OutputPin> LineGuard<'a, PIN> {
    fn acquire(pin: &'a mut PIN) -> Self {
        Self { pin }
    }
}

impl<PIN: OutputPin> Deref for LineGuard<'_, PIN> {
    type Target = PIN;

    fn deref(&self) -> &PIN {
        self.pin
    }
}

impl<PIN: OutputPin> DerefMut for LineGuard<'_, PIN> {
    fn deref_mut(&mut self) -> &mut PIN {
        self.pin
    }
}

impl<PIN: OutputPin> Drop for LineGuard<'_, PIN> {
    fn drop(&mut self) {
        // Nothing useful can be done with a failure here, and the caller
        // should see the error that ended the exchange.
        let _ = self.pin.set_high();
    }
}

/// One start-signal-to-frame exchange over a borrowed line.
pub(crate) struct Exchange<'a, PIN, DELAY, CLOCK>
where
    PIN: OutputPin,
{
    line: LineGuard<'a, PIN>,
    delay: &'a mut DELAY,
    clock: &'a mut CLOCK,
    config: &'a Config,
}

impl<'a, PIN, DELAY, CLOCK, E> Exchange<'a, PIN, DELAY, CLOCK>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: Clock,
    E: core::fmt::Debug,
{
    pub(crate) fn new(
        pin: &'a mut PIN,
        delay: &'a mut DELAY,
        clock: &'a mut CLOCK,
        config: &'a Config,
    ) -> Self {
        Self {
            line: LineGuard::acquire(pin),
            delay,
            clock,
            config,
        }
    }

    /// Runs the exchange to completion, consuming it and releasing the line.
    pub(crate) fn run(mut self) -> Result<BitSequence, DhtError<E>> {
        self.send_start()?;
        self.await_ack()?;

        let mut bits = [false; FRAME_BITS];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = self.read_bit(i as u8)?;
        }

        Ok(BitSequence::new(bits))
    }

    /// Wakes the sensor: low for `start_low_ms`, high for `start_high_us`,
    /// then the line is left released for the sensor to drive.
    fn send_start(&mut self) -> Result<(), DhtError<E>> {
        self.line.set_low()?;
        self.delay.delay_ms(self.config.start_low_ms);
        self.line.set_high()?;
        self.delay.delay_us(self.config.start_high_us);
        Ok(())
    }

    /// Waits for the sensor to pull the line low, then for its ~80us low and
    /// ~80us high acknowledgement pulses to pass.
    fn await_ack(&mut self) -> Result<(), DhtError<E>> {
        self.wait_while(PinState::High, Phase::AwaitAck)?;
        self.wait_while(PinState::Low, Phase::AwaitAck)?;
        self.wait_while(PinState::High, Phase::AwaitAck)?;
        Ok(())
    }

    /// Reads a single bit from the duration of its High pulse, timed by the clock.
    fn read_bit(&mut self, index: u8) -> Result<bool, DhtError<E>> {
        self.wait_while(PinState::Low, Phase::WaitHigh(index))?;
        let rise = self.clock.now_us();
        self.wait_while(PinState::High, Phase::MeasureHigh(index))?;
        let high_us = self.clock.now_us().wrapping_sub(rise);

        Ok(bit_from_pulse(high_us, self.config.bit_threshold_us))
    }

    /// Busy-waits while the line stays at `level`, timing out once `max_polls`
    /// polls have all seen `level`.
    fn wait_while(&mut self, level: PinState, phase: Phase) -> Result<(), DhtError<E>> {
        for _ in 0..self.config.max_polls {
            if PinState::from(self.line.is_high()?) != level {
                return Ok(());
            }
            if self.config.poll_interval_us > 0 {
                self.delay.delay_us(self.config.poll_interval_us);
            }
        }
        Err(DhtError::Timeout(phase))
    }
}
