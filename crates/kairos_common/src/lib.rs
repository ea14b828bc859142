//! Shared foundational types used across the kairos pipeline rebalancer.
//!
//! This crate provides content hashing for convergence tracking, the
//! single-hot [`PipelineMask`] with its stage-shift primitive, and the
//! [`ClockPeriod`] value type used by the clock-period sweep.

#![warn(missing_docs)]

pub mod hash;
pub mod mask;
pub mod period;

pub use hash::ContentHash;
pub use mask::{MaskError, PipelineMask, ShiftDirection, ShiftError};
pub use period::{ClockPeriod, ParsePeriodError};
