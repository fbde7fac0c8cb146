//! AIS DSP Core Library
//!
//! Platform-agnostic DSP primitives for the dual-channel AIS receiver.
//! This crate is `no_std` + `alloc` compatible; enable the `std` feature
//! on hosts to use the platform's libm instead of `micromath` approximations.
//!
//! # Modules
//!
//! - [`types`] - Core types: IqSample, SignalMetrics
//! - [`filter`] - FIR tap design and runtime FIR filters, DC blocker
//! - [`oscillator`] - Numerically controlled oscillator used for mixing
//! - [`xlating`] - Frequency-translating FIR (channel selector)
//! - [`resampler`] - Polyphase rational resampler
//! - [`error`] - Parameter validation errors

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod filter;
pub mod oscillator;
pub mod resampler;
pub mod types;
pub mod xlating;

// Re-export commonly used types
pub use error::DspError;
pub use filter::{firdes, DcBlocker, DcBlockerIq, FirFilter, FirFilterIq};
pub use oscillator::Nco;
pub use resampler::RationalResampler;
pub use types::{IqSample, SignalMetrics};
pub use xlating::FreqXlatingFir;
