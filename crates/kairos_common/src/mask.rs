//! Single-hot pipeline stage masks and the stage-shift primitive.
//!
//! A mask is written highest-stage-first, the same order as a Verilog binary
//! literal: for a 5-stage datapath with stage 2 active the mask is `00100`,
//! and string position `p` holds stage `len - 1 - p`. Stage 0 is the stage
//! nearest the source of the datapath.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The direction in which the active stage bit of a mask can be moved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    /// One stage further from the source: `stage + 1`, string position `- 1`.
    TowardSink,
    /// One stage closer to the source: `stage - 1`, string position `+ 1`.
    TowardSource,
}

impl ShiftDirection {
    /// Returns the opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            ShiftDirection::TowardSink => ShiftDirection::TowardSource,
            ShiftDirection::TowardSource => ShiftDirection::TowardSink,
        }
    }
}

impl fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftDirection::TowardSink => f.write_str("toward sink"),
            ShiftDirection::TowardSource => f.write_str("toward source"),
        }
    }
}

/// Errors produced when constructing a [`PipelineMask`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    /// The mask has no stages at all.
    #[error("pipeline mask is empty")]
    Empty,
    /// The mask text contains something other than `0` or `1`.
    #[error("invalid pipeline mask digit '{0}'")]
    InvalidDigit(char),
    /// The mask does not have exactly one enabled stage.
    #[error("pipeline mask must have exactly one enabled stage, found {0}")]
    ActiveCount(usize),
    /// The requested active stage does not fit in the mask.
    #[error("stage {stage} does not fit in a {len}-stage mask")]
    StageOutOfRange {
        /// The requested stage.
        stage: usize,
        /// The mask length.
        len: usize,
    },
}

/// Reasons a stage shift cannot be performed. Never fatal: the caller keeps
/// the original mask and may retry in the other direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShiftError {
    /// The stage index is beyond the end of the mask.
    #[error("stage {stage} is outside a {len}-stage mask")]
    StageOutOfRange {
        /// The stage that was asked to move.
        stage: usize,
        /// The mask length.
        len: usize,
    },
    /// The stage named by the timing path is not the enabled one.
    #[error("stage {0} is not the enabled stage")]
    NotActive(usize),
    /// The enabled bit is already at the end of the mask in that direction.
    #[error("stage {stage} cannot move {direction}")]
    AtBoundary {
        /// The stage that was asked to move.
        stage: usize,
        /// The requested direction.
        direction: ShiftDirection,
    },
}

/// A fixed-width pipeline stage-enable mask with exactly one enabled stage.
///
/// The invariant is enforced at construction and preserved by [`shift`](Self::shift),
/// which only ever moves the enabled bit.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PipelineMask {
    /// Bits in string order, highest stage first.
    bits: Vec<bool>,
}

impl PipelineMask {
    /// Creates a mask from bits in string order (highest stage first).
    pub fn from_bits(bits: Vec<bool>) -> Result<Self, MaskError> {
        if bits.is_empty() {
            return Err(MaskError::Empty);
        }
        let active = bits.iter().filter(|b| **b).count();
        if active != 1 {
            return Err(MaskError::ActiveCount(active));
        }
        Ok(Self { bits })
    }

    /// Creates a `len`-stage mask with only `stage` enabled.
    pub fn with_active_stage(len: usize, stage: usize) -> Result<Self, MaskError> {
        if len == 0 {
            return Err(MaskError::Empty);
        }
        if stage >= len {
            return Err(MaskError::StageOutOfRange { stage, len });
        }
        let mut bits = vec![false; len];
        bits[len - 1 - stage] = true;
        Ok(Self { bits })
    }

    /// Returns the number of stages in the mask.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always `false`; an empty mask cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the string position of the enabled bit.
    fn active_position(&self) -> usize {
        self.bits.iter().position(|b| *b).unwrap_or(0)
    }

    /// Returns the enabled stage index (0 = nearest the source).
    pub fn active_stage(&self) -> usize {
        self.len() - 1 - self.active_position()
    }

    /// Returns whether any stage strictly below `stage` is enabled.
    pub fn any_enabled_below(&self, stage: usize) -> bool {
        self.active_stage() < stage
    }

    /// Returns whether any stage strictly above `stage` is enabled.
    pub fn any_enabled_above(&self, stage: usize) -> bool {
        self.active_stage() > stage
    }

    fn position_of(&self, stage: usize) -> Option<usize> {
        (stage < self.len()).then(|| self.len() - 1 - stage)
    }

    /// Moves the enabled bit from `stage` one step in `direction`.
    ///
    /// Succeeds only if `stage` is the enabled stage and the target position
    /// is inside the mask. On failure `self` is left untouched and the error
    /// says why.
    pub fn shift(&self, stage: usize, direction: ShiftDirection) -> Result<Self, ShiftError> {
        let len = self.len();
        let pos = self
            .position_of(stage)
            .ok_or(ShiftError::StageOutOfRange { stage, len })?;
        if !self.bits[pos] {
            return Err(ShiftError::NotActive(stage));
        }
        let target = match direction {
            ShiftDirection::TowardSink => pos.checked_sub(1),
            ShiftDirection::TowardSource => Some(pos + 1).filter(|p| *p < len),
        }
        .ok_or(ShiftError::AtBoundary { stage, direction })?;

        let mut bits = self.bits.clone();
        bits[pos] = false;
        bits[target] = true;
        Ok(Self { bits })
    }

    /// Renders the mask as a sized Verilog binary literal, e.g. `5'b00010`.
    pub fn to_verilog_literal(&self) -> String {
        format!("{}'b{self}", self.len())
    }
}

impl FromStr for PipelineMask {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(MaskError::InvalidDigit(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_bits(bits)
    }
}

impl TryFrom<String> for PipelineMask {
    type Error = MaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PipelineMask> for String {
    fn from(mask: PipelineMask) -> Self {
        mask.to_string()
    }
}

impl fmt::Display for PipelineMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for PipelineMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineMask({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(s: &str) -> PipelineMask {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        let m = mask("00100");
        assert_eq!(m.len(), 5);
        assert_eq!(m.to_string(), "00100");
        assert_eq!(m.active_position(), 2);
        assert_eq!(m.active_stage(), 2);
    }

    #[test]
    fn parse_ignores_underscores() {
        assert_eq!(mask("0_0100").to_string(), "00100");
    }

    #[test]
    fn rejects_multiple_active_bits() {
        assert_eq!(
            "100110".parse::<PipelineMask>().unwrap_err(),
            MaskError::ActiveCount(3)
        );
    }

    #[test]
    fn rejects_all_zero() {
        assert_eq!(
            "0000".parse::<PipelineMask>().unwrap_err(),
            MaskError::ActiveCount(0)
        );
    }

    #[test]
    fn rejects_bad_digit() {
        assert_eq!(
            "01x0".parse::<PipelineMask>().unwrap_err(),
            MaskError::InvalidDigit('x')
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!("".parse::<PipelineMask>().unwrap_err(), MaskError::Empty);
    }

    #[test]
    fn with_active_stage_places_bit() {
        let m = PipelineMask::with_active_stage(5, 0).unwrap();
        assert_eq!(m.to_string(), "00001");
        let m = PipelineMask::with_active_stage(5, 4).unwrap();
        assert_eq!(m.to_string(), "10000");
        assert!(PipelineMask::with_active_stage(3, 3).is_err());
    }

    #[test]
    fn shift_toward_source() {
        let m = mask("00100");
        let shifted = m.shift(2, ShiftDirection::TowardSource).unwrap();
        assert_eq!(shifted.to_string(), "00010");
        assert_eq!(shifted.active_stage(), 1);
        // original untouched
        assert_eq!(m.to_string(), "00100");
    }

    #[test]
    fn shift_toward_sink() {
        let m = mask("00100");
        let shifted = m.shift(2, ShiftDirection::TowardSink).unwrap();
        assert_eq!(shifted.to_string(), "01000");
        assert_eq!(shifted.active_stage(), 3);
    }

    #[test]
    fn shift_at_source_boundary_fails() {
        let m = mask("00001");
        assert_eq!(
            m.shift(0, ShiftDirection::TowardSource).unwrap_err(),
            ShiftError::AtBoundary {
                stage: 0,
                direction: ShiftDirection::TowardSource
            }
        );
        assert!(m.shift(0, ShiftDirection::TowardSink).is_ok());
    }

    #[test]
    fn shift_at_sink_boundary_fails() {
        let m = mask("10000");
        assert!(matches!(
            m.shift(4, ShiftDirection::TowardSink),
            Err(ShiftError::AtBoundary { .. })
        ));
    }

    #[test]
    fn shift_inactive_stage_fails() {
        let m = mask("00100");
        assert_eq!(
            m.shift(1, ShiftDirection::TowardSink).unwrap_err(),
            ShiftError::NotActive(1)
        );
    }

    #[test]
    fn shift_out_of_range_stage_fails() {
        let m = mask("00100");
        assert!(matches!(
            m.shift(9, ShiftDirection::TowardSink),
            Err(ShiftError::StageOutOfRange { stage: 9, len: 5 })
        ));
    }

    #[test]
    fn enabled_neighbourhood_queries() {
        let m = mask("00100");
        assert!(m.any_enabled_below(3));
        assert!(!m.any_enabled_below(2));
        assert!(m.any_enabled_above(1));
        assert!(!m.any_enabled_above(2));
    }

    #[test]
    fn verilog_literal() {
        let m = mask("00010");
        assert_eq!(m.to_verilog_literal(), "5'b00010");
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(
            ShiftDirection::TowardSink.opposite(),
            ShiftDirection::TowardSource
        );
        assert_eq!(
            ShiftDirection::TowardSource.opposite(),
            ShiftDirection::TowardSink
        );
    }

    #[test]
    fn serde_as_string() {
        let m = mask("0100");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"0100\"");
        let back: PipelineMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<PipelineMask>("\"0110\"").is_err());
    }
}
