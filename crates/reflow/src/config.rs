//! Tunable thresholds for the reconstruction pipeline.
//!
//! All distances are expressed in the page's native coordinate units (PDF
//! points for documents read through [`crate::parser`]), not pixels.

use serde::{Deserialize, Serialize};

use crate::ReflowError;

/// Fragments whose Y coordinates differ by less than this are tied during
/// reading-order sorting and ordered by X instead.
pub const Y_LINE_EPSILON: f64 = 5.0;

/// A fragment joins the open line when its Y is within this distance of the
/// line's representative Y.
pub const LINE_GROUP_EPSILON: f64 = 6.0;

/// A vertical gap larger than this multiple of the previous line's height
/// starts a new paragraph.
pub const PARAGRAPH_FACTOR: f64 = 1.8;

/// Height substituted when a fragment carries no usable font height.
pub const DEFAULT_FONT_HEIGHT: f64 = 10.0;

/// What to do when a single page cannot be acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFailurePolicy {
    /// Fail the whole document; no partial text is returned.
    #[default]
    Abort,
    /// Log the failure and treat the page as empty.
    Substitute,
}

impl std::str::FromStr for PageFailurePolicy {
    type Err = ReflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(PageFailurePolicy::Abort),
            "substitute" | "skip" => Ok(PageFailurePolicy::Substitute),
            other => Err(ReflowError::Config(format!(
                "unknown page failure policy '{other}' (expected 'abort' or 'substitute')"
            ))),
        }
    }
}

/// Thresholds and policies threaded explicitly through every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    pub y_line_epsilon: f64,
    pub line_group_epsilon: f64,
    pub paragraph_factor: f64,
    pub default_font_height: f64,
    pub page_failure: PageFailurePolicy,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            y_line_epsilon: Y_LINE_EPSILON,
            line_group_epsilon: LINE_GROUP_EPSILON,
            paragraph_factor: PARAGRAPH_FACTOR,
            default_font_height: DEFAULT_FONT_HEIGHT,
            page_failure: PageFailurePolicy::default(),
        }
    }
}

impl ReflowConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ReflowError> {
        let config: ReflowConfig =
            toml::from_str(s).map_err(|e| ReflowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tolerances that would make the heuristics meaningless.
    pub fn validate(&self) -> Result<(), ReflowError> {
        let fields = [
            ("y_line_epsilon", self.y_line_epsilon),
            ("line_group_epsilon", self.line_group_epsilon),
            ("paragraph_factor", self.paragraph_factor),
            ("default_font_height", self.default_font_height),
        ];

        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReflowError::Config(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }

        // Reading-order runs must fit inside one line, or a lower fragment can
        // open its line before a higher one.
        if self.line_group_epsilon < self.y_line_epsilon {
            return Err(ReflowError::Config(format!(
                "line_group_epsilon ({}) must not be smaller than y_line_epsilon ({})",
                self.line_group_epsilon, self.y_line_epsilon
            )));
        }

        Ok(())
    }

    /// Resolve a fragment's height, falling back to `default_font_height`
    /// when it is absent, zero, negative, or not finite.
    pub fn resolve_font_height(&self, height: Option<f64>) -> f64 {
        match height {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => self.default_font_height,
        }
    }
}
