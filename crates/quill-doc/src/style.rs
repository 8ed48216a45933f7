//! Character-level text styling.

use serde::{Deserialize, Serialize};

/// Partial text style. `None` fields mean "leave unchanged" when applied
/// over existing formatting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Bold on/off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Italic on/off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    /// Underline on/off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    /// Strikethrough on/off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// Font size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Foreground color as lowercase 6-digit hex without `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Hyperlink target URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TextStyle {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.strikethrough.is_none()
            && self.font_size.is_none()
            && self.color.is_none()
            && self.link.is_none()
    }

    /// Overlay `patch`: every set field of `patch` replaces the field here.
    pub fn merge_from(&mut self, patch: &Self) {
        if patch.bold.is_some() {
            self.bold = patch.bold;
        }
        if patch.italic.is_some() {
            self.italic = patch.italic;
        }
        if patch.underline.is_some() {
            self.underline = patch.underline;
        }
        if patch.strikethrough.is_some() {
            self.strikethrough = patch.strikethrough;
        }
        if patch.font_size.is_some() {
            self.font_size = patch.font_size;
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(link) = &patch.link {
            self.link = Some(link.clone());
        }
    }

    /// A copy with `patch` overlaid.
    #[must_use]
    pub fn merged(&self, patch: &Self) -> Self {
        let mut out = self.clone();
        out.merge_from(patch);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_by_default() {
        assert!(TextStyle::default().is_empty());
    }

    #[test]
    fn merge_overrides_only_set_fields() {
        let mut base = TextStyle {
            bold: Some(true),
            font_size: Some(12.0),
            color: Some("ff0000".into()),
            ..TextStyle::default()
        };
        base.merge_from(&TextStyle {
            bold: Some(false),
            italic: Some(true),
            ..TextStyle::default()
        });
        assert_eq!(base.bold, Some(false));
        assert_eq!(base.italic, Some(true));
        assert_eq!(base.font_size, Some(12.0));
        assert_eq!(base.color.as_deref(), Some("ff0000"));
    }

    #[test]
    fn serde_skips_unset_fields() {
        let style = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        assert_eq!(serde_json::to_string(&style).unwrap(), r#"{"bold":true}"#);
    }

    #[test]
    fn serde_uses_camel_case() {
        let style = TextStyle {
            font_size: Some(14.0),
            ..TextStyle::default()
        };
        let value = serde_json::to_value(&style).unwrap();
        assert_eq!(value["fontSize"], 14.0);
    }
}
