//! Input fragments and the normalisation stage.

use serde::{Deserialize, Serialize};

use crate::config::ReflowConfig;

/// A run of text at a position on the page, as produced by an extraction
/// backend. Carries no line or paragraph identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub content: String,
    pub x: f64,
    /// Grows toward the top of the page.
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl TextFragment {
    pub fn new(content: impl Into<String>, x: f64, y: f64, font_height: Option<f64>) -> Self {
        Self {
            content: content.into(),
            x,
            y,
            font_height,
            width: None,
            height: None,
        }
    }

    /// Build a fragment from a glyph-run transform `[a, b, c, d, e, f]`.
    ///
    /// Position comes from the translation `(e, f)` and the font height from
    /// the vertical scale `d`.
    pub fn from_transform(content: impl Into<String>, transform: [f64; 6]) -> Self {
        Self::new(content, transform[4], transform[5], Some(transform[3]))
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// `true` when the content is empty once surrounding whitespace is removed.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A fragment that survived normalisation, with its height resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedFragment<'a> {
    /// Untrimmed content; interior and edge whitespace are preserved.
    pub content: &'a str,
    pub x: f64,
    pub y: f64,
    pub font_height: f64,
}

/// Drop whitespace-only fragments and resolve the font height of the rest.
pub fn normalize<'a>(
    fragments: &'a [TextFragment],
    config: &ReflowConfig,
) -> Vec<PositionedFragment<'a>> {
    fragments
        .iter()
        .filter(|f| !f.is_blank())
        .map(|f| PositionedFragment {
            content: f.content.as_str(),
            x: f.x,
            y: f.y,
            font_height: config.resolve_font_height(f.font_height),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[], &ReflowConfig::default()).is_empty());
    }

    #[test]
    fn test_normalize_drops_blank() {
        let fragments = vec![
            TextFragment::new("", 0.0, 100.0, Some(10.0)),
            TextFragment::new("   ", 10.0, 100.0, Some(10.0)),
            TextFragment::new("\t\n", 20.0, 100.0, Some(10.0)),
            TextFragment::new("kept", 30.0, 100.0, Some(10.0)),
        ];
        let out = normalize(&fragments, &ReflowConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "kept");
        assert_eq!(out[0].x, 30.0);
    }

    #[test]
    fn test_normalize_preserves_whitespace_in_content() {
        let fragments = vec![TextFragment::new("  two  words ", 0.0, 0.0, Some(9.0))];
        let out = normalize(&fragments, &ReflowConfig::default());
        assert_eq!(out[0].content, "  two  words ");
        assert_eq!(out[0].font_height, 9.0);
    }

    #[test]
    fn test_normalize_defaults_height() {
        let fragments = vec![
            TextFragment::new("a", 0.0, 0.0, None),
            TextFragment::new("b", 0.0, 0.0, Some(0.0)),
            TextFragment::new("c", 0.0, 0.0, Some(-12.0)),
        ];
        let out = normalize(&fragments, &ReflowConfig::default());
        assert!(out.iter().all(|f| f.font_height == 10.0));
    }

    #[test]
    fn test_normalize_uses_configured_default_height() {
        let config = ReflowConfig {
            default_font_height: 14.0,
            ..Default::default()
        };
        let fragments = vec![TextFragment::new("a", 0.0, 0.0, None)];
        assert_eq!(normalize(&fragments, &config)[0].font_height, 14.0);
    }

    #[test]
    fn test_from_transform() {
        let f = TextFragment::from_transform("Hi", [12.0, 0.0, 0.0, 12.0, 72.0, 700.0]);
        assert_eq!(f.x, 72.0);
        assert_eq!(f.y, 700.0);
        assert_eq!(f.font_height, Some(12.0));
        assert_eq!(f.width, None);
    }

    #[test]
    fn test_fragment_json_optional_fields() {
        let f: TextFragment =
            serde_json::from_str(r#"{"content":"x","x":1.0,"y":2.0}"#).unwrap();
        assert_eq!(f.font_height, None);

        let json = serde_json::to_string(&TextFragment::new("x", 1.0, 2.0, None)).unwrap();
        assert!(!json.contains("font_height"));
    }
}
