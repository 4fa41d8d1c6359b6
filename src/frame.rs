//! Frame decoding: 40 sampled bits to a validated [`Reading`].

use crate::error::DhtError;

/// Number of bits in a DHT11 frame.
pub const FRAME_BITS: usize = 40;

/// The 40 bits of one frame, in the order they were sampled.
///
/// Bit 0 is the most significant bit of the humidity integer byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSequence([bool; FRAME_BITS]);

impl BitSequence {
    /// Wraps 40 sampled bits, first sampled first.
    pub const fn new(bits: [bool; FRAME_BITS]) -> Self {
        Self(bits)
    }

    /// The bits in sampling order.
    pub const fn bits(&self) -> &[bool; FRAME_BITS] {
        &self.0
    }
}

/// The five bytes carried by a frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub humidity_int: u8,
    pub humidity_dec: u8,
    pub temperature_int: u8,
    pub temperature_dec: u8,
    pub checksum: u8,
}

impl RawFrame {
    /// Groups the bits into five big-endian bytes.
    pub fn from_bits(bits: &BitSequence) -> Self {
        let mut bytes = [0u8; 5];
        for (byte, chunk) in bytes.iter_mut().zip(bits.0.chunks_exact(8)) {
            *byte = chunk.iter().fold(0, |acc, &bit| (acc << 1) | u8::from(bit));
        }
        let [humidity_int, humidity_dec, temperature_int, temperature_dec, checksum] = bytes;

        RawFrame {
            humidity_int,
            humidity_dec,
            temperature_int,
            temperature_dec,
            checksum,
        }
    }

    /// Sum of the four data bytes modulo 256.
    pub fn computed_checksum(&self) -> u8 {
        self.humidity_int
            .wrapping_add(self.humidity_dec)
            .wrapping_add(self.temperature_int)
            .wrapping_add(self.temperature_dec)
    }

    /// Whether the checksum byte matches the data bytes.
    pub fn is_valid(&self) -> bool {
        self.computed_checksum() == self.checksum
    }

    /// Validates the checksum and converts the frame into physical values.
    pub fn into_reading<E>(self, timestamp_us: u64) -> Result<Reading, DhtError<E>>
    where
        E: core::fmt::Debug,
    {
        if !self.is_valid() {
            return Err(DhtError::ChecksumMismatch {
                received: self.checksum,
                computed: self.computed_checksum(),
            });
        }

        Ok(Reading {
            temperature: f32::from(self.temperature_int) + f32::from(self.temperature_dec) / 10.0,
            humidity: f32::from(self.humidity_int) + f32::from(self.humidity_dec) / 10.0,
            timestamp_us,
        })
    }
}

/// Reading returned by the DHT11 sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Time the frame was sampled, in microseconds of the driver's [`Clock`](crate::Clock).
    pub timestamp_us: u64,
}

impl Reading {
    /// Temperature in degrees Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> f32 {
        self.temperature * 9.0 / 5.0 + 32.0
    }
}

/// Decodes a complete bit sequence into a [`Reading`].
pub fn decode<E>(bits: &BitSequence, timestamp_us: u64) -> Result<Reading, DhtError<E>>
where
    E: core::fmt::Debug,
{
    RawFrame::from_bits(bits).into_reading(timestamp_us)
}
