/// Protocol phase in which the sensor stopped answering.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the sensor to acknowledge the start signal.
    AwaitAck,
    /// Waiting for the High pulse of the given bit to begin.
    WaitHigh(u8),
    /// Measuring the High pulse of the given bit.
    MeasureHigh(u8),
}

impl Phase {
    /// Index of the bit being read, if the phase belongs to the data frame.
    pub const fn bit_index(self) -> Option<u8> {
        match self {
            Phase::AwaitAck => None,
            Phase::WaitHigh(i) | Phase::MeasureHigh(i) => Some(i),
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::AwaitAck => write!(f, "awaiting acknowledgement"),
            Phase::WaitHigh(i) => write!(f, "waiting for high pulse of bit {i}"),
            Phase::MeasureHigh(i) => write!(f, "measuring high pulse of bit {i}"),
        }
    }
}

/// Possible errors from the DHT11 driver.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DhtError<E>
where
    E: core::fmt::Debug,
{
    /// The line did not change level within the polling ceiling.
    #[error("timed out while {0}")]
    Timeout(Phase),
    /// Checksum byte did not match the sum of the four data bytes.
    #[error("checksum mismatch: received {received:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { received: u8, computed: u8 },
    /// Error from the GPIO pin (input/output).
    #[error("pin error: {0:?}")]
    Pin(E),
}

impl<E: core::fmt::Debug> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::Pin(value)
    }
}
