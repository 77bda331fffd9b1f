//! Quality segment: color treatment of the output.

use super::RequestError;
use crate::imaging::Operation;
use serde::Serialize;

/// Gamma exponent applied before grayscale conversion.
pub const GRAY_GAMMA: f32 = 2.2;

/// Luma level separating black from white in bitonal output.
pub const BITONAL_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySpec {
    Default,
    Gray,
    Bitonal,
}

/// Quality stage of a compiled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityRequest {
    pub spec: QualitySpec,
}

impl QualityRequest {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let spec = match raw {
            "default" | "color" => QualitySpec::Default,
            "gray" => QualitySpec::Gray,
            "bitonal" => QualitySpec::Bitonal,
            other => {
                return Err(RequestError::malformed(format!("invalid quality '{other}'")));
            }
        };
        Ok(Self { spec })
    }

    pub fn requires_processing(&self) -> bool {
        self.spec != QualitySpec::Default
    }

    pub fn describe(&self) -> Vec<Operation> {
        match self.spec {
            QualitySpec::Default => Vec::new(),
            QualitySpec::Gray => vec![
                Operation::Gamma {
                    exponent: GRAY_GAMMA,
                },
                Operation::Grayscale,
            ],
            QualitySpec::Bitonal => vec![Operation::Threshold {
                level: BITONAL_THRESHOLD,
            }],
        }
    }
}
