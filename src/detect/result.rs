use std::fmt;

use serde::Serialize;

use super::bbox::BoundingBox;

/// Label emitted for candidate regions that could not be cropped.
pub const UNCLASSIFIABLE_LABEL: &str = "unclassifiable";

/// Class assigned to a localized region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Generic region awaiting secondary classification.
    Candidate,
    /// Terminal, human-readable class name.
    Named(String),
    /// Candidate whose crop was empty after clamping to the image.
    Unclassifiable,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Candidate => f.write_str("candidate"),
            Label::Named(name) => f.write_str(name),
            Label::Unclassifiable => f.write_str(UNCLASSIFIABLE_LABEL),
        }
    }
}

/// One surviving localizer detection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Localizer confidence in `[0, 1]`.
    pub score: f32,
    pub label: Label,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_display_as_delivered_text() {
        assert_eq!(Label::Candidate.to_string(), "candidate");
        assert_eq!(Label::Named("Stop".to_string()).to_string(), "Stop");
        assert_eq!(Label::Unclassifiable.to_string(), UNCLASSIFIABLE_LABEL);
    }
}
