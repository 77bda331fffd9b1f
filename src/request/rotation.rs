//! Rotation segment: optional mirroring followed by clockwise rotation.

use super::RequestError;
use crate::imaging::Operation;
use serde::Serialize;

/// Resolved rotation. `degrees` is always in `0..360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RotationSpec {
    pub mirror: bool,
    pub degrees: u16,
}

/// Rotation stage of a compiled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationRequest {
    pub spec: RotationSpec,
}

impl RotationRequest {
    /// Parse `[!]degrees`. Fractional degrees round to the nearest integer
    /// (halves up, like every other rounding in the compiler), and the result
    /// must fall in `[0, 360)`.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let (mirror, number) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let degrees: f64 = number
            .parse()
            .map_err(|_| RequestError::malformed(format!("invalid rotation '{raw}'")))?;
        let rounded = (degrees + 0.5).floor();
        if !(0.0..360.0).contains(&rounded) {
            return Err(RequestError::malformed(format!(
                "rotation '{raw}' must be within [0, 360)"
            )));
        }

        Ok(Self {
            spec: RotationSpec {
                mirror,
                degrees: rounded as u16,
            },
        })
    }

    pub fn requires_processing(&self) -> bool {
        self.spec.mirror || self.spec.degrees > 0
    }

    /// Mirror first, then rotate.
    pub fn describe(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if self.spec.mirror {
            ops.push(Operation::Flip);
        }
        if self.spec.degrees > 0 {
            ops.push(Operation::Rotate {
                degrees: self.spec.degrees,
            });
        }
        ops
    }
}
