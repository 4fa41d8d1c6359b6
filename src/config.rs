//! Timing parameters for a DHT11 exchange.

/// Timing configuration of the driver.
///
/// The defaults follow the DHT11 datasheet: a 20 ms start pulse, 40 µs release,
/// a 50 µs discriminator between `0` (~27 µs) and `1` (~70 µs) bits and a
/// ceiling of 1000 polls (~1 ms) per wait phase.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of polls in a single wait phase before timing out.
    pub max_polls: u32,
    /// Busy-wait step between two polls, in microseconds. `0` spins without delay.
    pub poll_interval_us: u32,
    /// High pulses strictly longer than this decode to `1`.
    pub bit_threshold_us: u32,
    /// Duration the host holds the line low to wake the sensor.
    pub start_low_ms: u32,
    /// Duration the host drives the line high before releasing it.
    pub start_high_us: u32,
    /// Pause between attempts in [`Dht11::read_with_retry`](crate::Dht11::read_with_retry).
    pub retry_interval_ms: u32,
}

impl Config {
    /// Returns the datasheet timings, same as [`Config::default`].
    pub const fn new() -> Self {
        Self {
            max_polls: 1000,
            poll_interval_us: 1,
            bit_threshold_us: 50,
            start_low_ms: 20,
            start_high_us: 40,
            retry_interval_ms: 2000,
        }
    }

    /// Sets the polling ceiling of every wait phase.
    pub const fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Sets the pause between attempts of a retried read.
    pub const fn with_retry_interval_ms(mut self, retry_interval_ms: u32) -> Self {
        self.retry_interval_ms = retry_interval_ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
