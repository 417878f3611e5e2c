use crate::burst::BurstOutcome;
use crate::config::ProviderMarkers;

/// Model field recorded for requests that never got a response.
pub const ERROR_MODEL: &str = "ERROR";

/// Per-backend response counts for a burst.
///
/// `primary` and `secondary` are counted independently and are not a
/// partition: a model string containing neither marker counts as
/// secondary, and one containing both counts as both. Error records are
/// excluded from both provider counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub primary: usize,
    pub secondary: usize,
    pub errors: usize,
}

impl Tally {
    pub fn from_outcomes(outcomes: &[BurstOutcome], markers: &ProviderMarkers) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            let model = outcome.model.as_str();
            if is_error(model) {
                tally.errors += 1;
                continue;
            }
            if is_primary(model, markers) {
                tally.primary += 1;
            }
            if is_secondary(model, markers) {
                tally.secondary += 1;
            }
        }
        tally
    }

    /// Fallback counts as working once any response came from outside the primary.
    pub fn fallback_working(&self) -> bool {
        self.secondary > 0
    }
}

pub fn is_error(model: &str) -> bool {
    model == ERROR_MODEL
}

pub fn is_primary(model: &str, markers: &ProviderMarkers) -> bool {
    !is_error(model) && model.contains(&markers.primary_marker)
}

pub fn is_secondary(model: &str, markers: &ProviderMarkers) -> bool {
    !is_error(model)
        && (model.contains(&markers.secondary_marker) || !model.contains(&markers.primary_marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> ProviderMarkers {
        ProviderMarkers::default()
    }

    #[test]
    fn primary_marker_only() {
        assert!(is_primary("cerebras/glm-4.6", &markers()));
        assert!(!is_secondary("cerebras/glm-4.6", &markers()));
    }

    #[test]
    fn unknown_model_counts_as_secondary() {
        assert!(!is_primary("zai/glm-4.6", &markers()));
        assert!(is_secondary("zai/glm-4.6", &markers()));
    }

    #[test]
    fn both_markers_count_twice() {
        let model = "openai/cerebras-glm";
        assert!(is_primary(model, &markers()));
        assert!(is_secondary(model, &markers()));
    }

    #[test]
    fn error_placeholder_is_never_a_provider() {
        let m = ProviderMarkers {
            primary_marker: "ERR".to_string(),
            secondary_marker: "OR".to_string(),
            ..markers()
        };
        assert!(is_error(ERROR_MODEL));
        assert!(!is_primary(ERROR_MODEL, &m));
        assert!(!is_secondary(ERROR_MODEL, &m));
    }

    #[test]
    fn empty_tally_reports_no_fallback() {
        assert!(!Tally::default().fallback_working());
    }
}
