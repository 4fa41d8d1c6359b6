use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::DhtError;
use crate::exchange::Exchange;
use crate::fmt::{debug, warning};
use crate::frame::{self, Reading};

/// Driver for the DHT11 temperature and humidity sensor.
///
/// The driver owns the data line for its whole lifetime. Reads on one instance
/// are therefore serialized by `&mut self`; sharing a sensor between threads
/// needs a mutex around the driver.
pub struct Dht11<PIN, DELAY, CLOCK> {
    pin: PIN,
    delay: DELAY,
    clock: CLOCK,
    config: Config,
}

impl<PIN, DELAY, CLOCK, E> Dht11<PIN, DELAY, CLOCK>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: Clock,
    E: core::fmt::Debug,
{
    /// Creates a new instance of the DHT11 driver with the default timings.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the DHT11 data line. Must support both input and output
    ///   (open-drain with a pull-up).
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `clock` - Microsecond time source used to time each bit and stamp the reading.
    pub fn new(pin: PIN, delay: DELAY, clock: CLOCK) -> Self {
        Self::with_config(pin, delay, clock, Config::default())
    }

    /// Creates a driver with custom timings.
    pub fn with_config(pin: PIN, delay: DELAY, clock: CLOCK, config: Config) -> Self {
        Dht11 {
            pin,
            delay,
            clock,
            config,
        }
    }

    /// Returns the timings this driver was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives back the pin, delay and clock.
    pub fn release(self) -> (PIN, DELAY, CLOCK) {
        (self.pin, self.delay, self.clock)
    }

    /// Performs one exchange with the sensor.
    ///
    /// Sends the start signal, waits for the acknowledgement, samples the 40
    /// frame bits, and validates the checksum. The line is released before
    /// this returns, whatever the outcome. No retry is attempted.
    ///
    /// Consecutive reads must be at least 1 s apart (2 s recommended);
    /// reading faster makes the sensor miss the start signal and the read
    /// fails with a timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the read is successful and the checksum is valid.
    /// * `Err(DhtError)` if a timeout, checksum or pin error occurs.
    pub fn read(&mut self) -> Result<Reading, DhtError<E>> {
        let exchange = Exchange::new(
            &mut self.pin,
            &mut self.delay,
            &mut self.clock,
            &self.config,
        );
        let bits = match exchange.run() {
            Ok(bits) => bits,
            Err(err) => {
                if let DhtError::Timeout(phase) = &err {
                    warning!("dht11: timeout while {:?}", phase);
                }
                return Err(err);
            }
        };

        let reading = frame::decode(&bits, self.clock.now_us());
        match &reading {
            Ok(r) => debug!("dht11: {} C, {} %RH", r.temperature, r.humidity),
            Err(DhtError::ChecksumMismatch { received, computed }) => {
                warning!(
                    "dht11: checksum mismatch, received {} computed {}",
                    received,
                    computed
                )
            }
            Err(_) => {}
        }
        reading
    }

    /// Reads the sensor, retrying failed exchanges.
    ///
    /// Makes up to `attempts` exchanges (always at least one), pausing
    /// `retry_interval_ms` between them, and returns the first successful
    /// reading or the last error.
    pub fn read_with_retry(&mut self, attempts: u8) -> Result<Reading, DhtError<E>> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.read() {
                Ok(reading) => return Ok(reading),
                Err(err) if attempt >= attempts => return Err(err),
                Err(_) => {
                    debug!("dht11: attempt {} of {} failed", attempt, attempts);
                    attempt += 1;
                    self.delay.delay_ms(self.config.retry_interval_ms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Phase;
    use embedded_hal_mock::eh1::delay::CheckedDelay;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::delay::Transaction as DelayTx;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTx,
    };

    const ZERO_US: u64 = 27;
    const ONE_US: u64 = 70;
    // Polls seen during each High pulse
    const HIGH_POLLS: usize = 3;

    fn start_sequence() -> Vec<PinTx> {
        vec![
            // MCU pulls the line low, then releases it
            PinTx::set(PinState::Low),
            PinTx::set(PinState::High),
            // Sensor acknowledges: pulls low, high, then low for the first bit
            PinTx::get(PinState::Low),
            PinTx::get(PinState::High),
            PinTx::get(PinState::Low),
        ]
    }

    // Line activity of a whole frame; bit values come from the clock
    fn frame_line() -> Vec<PinTx> {
        let mut pin_states = start_sequence();
        for _ in 0..40 {
            pin_states.extend([PinTx::get(PinState::Low), PinTx::get(PinState::High)]);
            pin_states.extend(std::iter::repeat_n(PinTx::get(PinState::High), HIGH_POLLS));
            pin_states.push(PinTx::get(PinState::Low));
        }
        // Released after the exchange
        pin_states.push(PinTx::set(PinState::High));
        pin_states
    }

    // Clock timing each bit of `bytes` (MSB first) as a 27us or 70us pulse,
    // ending at `end_us` for the reading timestamp
    fn frame_clock(bytes: [u8; 5], end_us: u64) -> impl FnMut() -> u64 {
        let mut times = Vec::new();
        let mut now = 0;
        for i in 0..40 {
            let high = if (bytes[i / 8] >> (7 - i % 8)) & 1 == 1 { ONE_US } else { ZERO_US };
            times.push(now);
            times.push(now + high);
            now += high + 50;
        }
        times.push(end_us);
        let mut times = times.into_iter();
        move || times.next().unwrap_or(end_us)
    }

    fn ack_timeout(max_polls: usize) -> Vec<PinTx> {
        let mut pin_states = vec![PinTx::set(PinState::Low), PinTx::set(PinState::High)];
        pin_states.extend((0..max_polls).map(|_| PinTx::get(PinState::High)));
        pin_states.push(PinTx::set(PinState::High));
        pin_states
    }

    #[test]
    fn test_read_valid() {
        // 50% / 25C, checksum 0x4B
        let bytes = [0x32, 0x00, 0x19, 0x00, 0x4B];
        let mut pin = PinMock::new(&frame_line());

        let mut dht = Dht11::new(pin.clone(), NoopDelay, frame_clock(bytes, 9_000));
        let reading = dht.read().unwrap();

        assert_eq!(
            reading,
            Reading {
                temperature: 25.0,
                humidity: 50.0,
                timestamp_us: 9_000,
            }
        );

        pin.done();
    }

    #[test]
    fn test_read_invalid() {
        let bytes = [0x32, 0x00, 0x19, 0x00, 0x00];
        let mut pin = PinMock::new(&frame_line());

        let mut dht = Dht11::new(pin.clone(), NoopDelay, frame_clock(bytes, 9_000));

        assert_eq!(
            dht.read().unwrap_err(),
            DhtError::ChecksumMismatch {
                received: 0x00,
                computed: 0x4B,
            }
        );

        pin.done();
    }

    #[test]
    fn test_read_start_timings() {
        let bytes = [0x32, 0x00, 0x19, 0x00, 0x4B];
        let mut pin = PinMock::new(&frame_line());

        // start = 20ms + 40us, then a 1us delay after every poll that still saw
        // the awaited level: one in each bit's low, HIGH_POLLS in its high
        let mut delay_transactions = vec![DelayTx::delay_ms(20), DelayTx::delay_us(40)];
        delay_transactions.extend(std::iter::repeat_n(
            DelayTx::delay_us(1),
            40 * (1 + HIGH_POLLS),
        ));
        let mut delay = CheckedDelay::new(&delay_transactions);

        let mut dht = Dht11::new(pin.clone(), &mut delay, frame_clock(bytes, 9_000));
        assert!(dht.read().is_ok());

        pin.done();
        delay.done();
    }

    #[test]
    fn test_read_ack_timeout() {
        let config = Config::new().with_max_polls(10);
        let mut pin = PinMock::new(&ack_timeout(10));

        let mut dht = Dht11::with_config(pin.clone(), NoopDelay, || 0u64, config);

        assert_eq!(
            dht.read().unwrap_err(),
            DhtError::Timeout(Phase::AwaitAck)
        );

        pin.done();
    }

    #[test]
    fn test_read_ack_timeout_default_ceiling() {
        let mut pin = PinMock::new(&ack_timeout(1000));

        let mut dht = Dht11::new(pin.clone(), NoopDelay, || 0u64);

        assert_eq!(
            dht.read().unwrap_err(),
            DhtError::Timeout(Phase::AwaitAck)
        );

        pin.done();
    }

    #[test]
    fn test_identical_timings_give_identical_readings() {
        let bytes = [0x2D, 0x05, 0x16, 0x05, 0x4D];
        let mut first_pin = PinMock::new(&frame_line());
        let mut second_pin = PinMock::new(&frame_line());

        let first = Dht11::new(first_pin.clone(), NoopDelay, frame_clock(bytes, 5_000))
            .read()
            .unwrap();
        let second = Dht11::new(second_pin.clone(), NoopDelay, frame_clock(bytes, 5_000))
            .read()
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.humidity, 45.5);
        assert_eq!(first.temperature, 22.5);

        first_pin.done();
        second_pin.done();
    }

    #[test]
    fn test_read_with_retry_recovers() {
        let config = Config::new().with_max_polls(100);
        let bytes = [0x32, 0x00, 0x19, 0x00, 0x4B];
        let mut expect = ack_timeout(100);
        expect.extend(frame_line());
        let mut pin = PinMock::new(&expect);

        // the failed attempt never reads the clock
        let mut dht = Dht11::with_config(pin.clone(), NoopDelay, frame_clock(bytes, 0), config);
        let reading = dht.read_with_retry(3).unwrap();

        assert_eq!(reading.temperature, 25.0);
        assert_eq!(reading.humidity, 50.0);

        pin.done();
    }

    #[test]
    fn test_read_with_retry_waits_between_attempts() {
        let config = Config::new().with_max_polls(2).with_retry_interval_ms(2000);
        let mut expect = ack_timeout(2);
        expect.extend(ack_timeout(2));
        let mut pin = PinMock::new(&expect);

        let attempt = [
            DelayTx::delay_ms(20),
            DelayTx::delay_us(40),
            DelayTx::delay_us(1),
            DelayTx::delay_us(1),
        ];
        let mut delay_transactions = attempt.to_vec();
        delay_transactions.push(DelayTx::delay_ms(2000));
        delay_transactions.extend_from_slice(&attempt);
        let mut delay = CheckedDelay::new(&delay_transactions);

        let mut dht = Dht11::with_config(pin.clone(), &mut delay, || 0u64, config);
        assert_eq!(
            dht.read_with_retry(2).unwrap_err(),
            DhtError::Timeout(Phase::AwaitAck)
        );

        pin.done();
        delay.done();
    }

    #[test]
    fn test_read_with_retry_zero_attempts_reads_once() {
        let config = Config::new().with_max_polls(4);
        let mut pin = PinMock::new(&ack_timeout(4));

        let mut dht = Dht11::with_config(pin.clone(), NoopDelay, || 0u64, config);
        assert!(dht.read_with_retry(0).is_err());

        pin.done();
    }

    #[test]
    fn test_release_returns_resources() {
        let mut pin = PinMock::new(&[]);
        let dht = Dht11::new(pin.clone(), NoopDelay, || 1_000u64);
        assert_eq!(dht.config(), &Config::default());

        let (_pin, _delay, mut clock) = dht.release();
        assert_eq!(clock.now_us(), 1_000);

        pin.done();
    }
}
