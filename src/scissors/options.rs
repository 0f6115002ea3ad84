//! Tunables for path search, contour closing and mask generation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScissorsError};
use crate::selection::SelectionOp;

/// Weights and margins used by [`PathFinder`](super::PathFinder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Fraction of the endpoint bounding box added past the end point.
    pub extend_by: f64,
    /// Pixels added past the end point on top of `extend_by`.
    pub fixed_margin: i32,
    /// Weight of the inverted gradient magnitude in a link cost.
    pub gradient_weight: f64,
    /// Weight of the direction agreement term in a link cost.
    pub direction_weight: f64,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            extend_by: 0.2,
            fixed_margin: 5,
            gradient_weight: 0.8,
            direction_weight: 0.2,
        }
    }
}

impl PathOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.extend_by.is_finite() || self.extend_by < 0.0 {
            return Err(invalid(format!("extend_by must be >= 0, got {}", self.extend_by)));
        }
        if self.fixed_margin < 0 {
            return Err(invalid(format!("fixed_margin must be >= 0, got {}", self.fixed_margin)));
        }
        for (name, weight) in [
            ("gradient_weight", self.gradient_weight),
            ("direction_weight", self.direction_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(format!("{name} must be a finite value >= 0, got {weight}")));
            }
        }
        Ok(())
    }
}

/// Session level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScissorsOptions {
    pub antialias: bool,
    /// Linear supersampling factor used when `antialias` is set.
    pub supersample: u32,
    pub snap_to_edges: bool,
    /// Half size of the edge snapping window.
    pub snap_radius: u32,
    /// Clicks within this distance of the first vertex close the contour.
    pub close_radius: f64,
    pub operation: SelectionOp,
    pub feather: bool,
    pub feather_radius: f64,
    pub path: PathOptions,
}

impl Default for ScissorsOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            supersample: 3,
            snap_to_edges: true,
            snap_radius: 16,
            close_radius: 6.0,
            operation: SelectionOp::Replace,
            feather: false,
            feather_radius: 10.0,
            path: PathOptions::default(),
        }
    }
}

impl ScissorsOptions {
    /// Parse options from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: ScissorsOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.supersample == 0 {
            return Err(invalid("supersample must be at least 1".to_string()));
        }
        if !self.close_radius.is_finite() || self.close_radius < 0.0 {
            return Err(invalid(format!("close_radius must be >= 0, got {}", self.close_radius)));
        }
        if !self.feather_radius.is_finite() || self.feather_radius < 0.0 {
            return Err(invalid(format!(
                "feather_radius must be >= 0, got {}",
                self.feather_radius
            )));
        }
        self.path.validate()
    }
}

fn invalid(message: String) -> ScissorsError {
    ScissorsError::InvalidOptions(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ScissorsOptions::default();
        assert!(options.antialias);
        assert_eq!(options.supersample, 3);
        assert_eq!(options.snap_radius, 16);
        assert_eq!(options.operation, SelectionOp::Replace);
        assert_eq!(options.path.fixed_margin, 5);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            ScissorsOptions::from_json(r#"{"antialias": false, "operation": "add", "path": {"extend_by": 0.5}}"#)
                .unwrap();

        assert!(!options.antialias);
        assert_eq!(options.operation, SelectionOp::Add);
        assert_eq!(options.path.extend_by, 0.5);
        assert_eq!(options.path.gradient_weight, 0.8);
        assert_eq!(options.close_radius, 6.0);
    }

    #[test]
    fn test_json_round_trip() {
        let mut options = ScissorsOptions::default();
        options.feather = true;
        options.feather_radius = 4.5;

        let json = options.to_json().unwrap();
        assert_eq!(ScissorsOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert!(matches!(
            ScissorsOptions::from_json(r#"{"supersample": 0}"#),
            Err(ScissorsError::InvalidOptions(_))
        ));
        assert!(matches!(
            ScissorsOptions::from_json(r#"{"path": {"fixed_margin": -2}}"#),
            Err(ScissorsError::InvalidOptions(_))
        ));
        assert!(matches!(
            ScissorsOptions::from_json("not json"),
            Err(ScissorsError::Json(_))
        ));
    }
}
