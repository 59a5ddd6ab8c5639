//! Bit-level LIN bus decoder and repeater, driven from a periodic timer tick.
//!
//! The decoder sits between a LIN master line and a slave line. It passively
//! decodes every frame the master starts, repeats each sampled bit onto the
//! opposite line half a bit later, and hands complete frames to the main loop
//! through a bounded queue. Decode problems are reported as sticky
//! [`ErrorFlags`].
//!
//! Frame semantics above the byte level (PID parity, checksum, signals) are
//! left to the consumer.
//!
//! Hardware access goes through the traits in [`hal`]. With the `std`
//! feature, [`sim`] provides a simulated bus to run the decoder against.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod config;
pub mod decoder;
pub mod errors;
pub mod frame;
pub mod hal;
pub mod queue;
#[cfg(feature = "std")]
pub mod sim;
mod wait;

pub use crate::config::{baud, Baud, ClockRates, Config, FrameLimits};
pub use crate::decoder::{LinDecoder, Phase};
pub use crate::errors::ErrorFlags;
pub use crate::frame::Frame;
pub use crate::hal::{Channel, Level};
