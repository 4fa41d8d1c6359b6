//! DHT11 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the DHT11 temperature
//! and humidity sensor, built on top of the [`embedded-hal`] traits.
//!
//! One call to [`Dht11::read`] is one exchange: the host wakes the sensor,
//! waits for its acknowledgement, times the 40 High pulses of the frame with
//! a [`Clock`] (longer than 50 µs is a `1`), and validates the checksum. The
//! result is a [`Reading`] or a [`DhtError`] naming the phase that failed; the
//! driver never retries on its own unless asked through
//! [`Dht11::read_with_retry`].
//!
//! # Features
//! - Blocking synchronous API using `embedded-hal` traits
//! - Designed for `no_std` environments
//! - Optional logging support via `defmt` or `log`
//!
//! # Dependencies
//! This driver depends on the following `embedded-hal` traits:
//! - [`InputPin`] and [`OutputPin`] for GPIO access
//! - [`DelayNs`] for accurate timing
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and logs through `defmt`
//! - `log`: Logs through the `log` facade
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod clock;
pub mod config;
pub mod dht11;
pub mod error;
pub mod exchange;
pub mod frame;

pub use clock::Clock;
pub use config::Config;
pub use dht11::Dht11;
pub use error::{DhtError, Phase};
pub use frame::{BitSequence, RawFrame, Reading};
