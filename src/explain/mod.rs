//! Per-prediction explanations: exact feature contributions plus the
//! rendered chart served next to each score.

mod attribution;
mod render;

pub use attribution::{Attribution, FeatureContribution, TreeAttributor};
pub use render::{ForcePlotRenderer, RenderConfig};

use serde::{Deserialize, Serialize};

/// Outcome of the explanation stage for one prediction.
///
/// Explanations degrade independently of scoring: a prediction with an
/// [`Explanation::Unrendered`] explanation is still a valid prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Explanation {
    /// Attribution computed and chart rendered.
    Rendered {
        attribution: Attribution,
        image_base64: String,
    },
    /// The explanation stage failed; the score stands on its own.
    Unrendered { reason: String },
}

impl Explanation {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Explanation::Rendered { .. })
    }

    /// The encoded chart, or the empty string when the explanation was
    /// not rendered. Only the wire format wants the empty-string form.
    pub fn image_base64(&self) -> &str {
        match self {
            Explanation::Rendered { image_base64, .. } => image_base64,
            Explanation::Unrendered { .. } => "",
        }
    }

    pub fn attribution(&self) -> Option<&Attribution> {
        match self {
            Explanation::Rendered { attribution, .. } => Some(attribution),
            Explanation::Unrendered { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrendered_maps_to_empty_string() {
        let explanation = Explanation::Unrendered {
            reason: "canvas too small".to_string(),
        };
        assert!(!explanation.is_rendered());
        assert_eq!(explanation.image_base64(), "");
        assert!(explanation.attribution().is_none());
    }
}
