//! Fixed-schema survey record and quality tier

use chrono::NaiveDateTime;
use serde::Serialize;

/// Quality tier assigned to a record by the rule validator.
///
/// Ordinal severity: `Anomaly` > `Warning` > `Valid`. The outlier stage may
/// move a record from `Valid` to `Anomaly` but never the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Tier {
    Valid,
    Warning,
    Anomaly,
}

impl Tier {
    /// Fixed presentation color for this tier.
    pub fn color(self) -> &'static str {
        match self {
            Tier::Valid => "green",
            Tier::Warning => "orange",
            Tier::Anomaly => "red",
        }
    }

    /// All tiers in canonical summary order.
    pub const ALL: [Tier; 3] = [Tier::Valid, Tier::Warning, Tier::Anomaly];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Valid => write!(f, "Valid"),
            Tier::Warning => write!(f, "Warning"),
            Tier::Anomaly => write!(f, "Anomaly"),
        }
    }
}

/// One survey submission with canonical field names.
///
/// Every field is optional: absent columns, blank cells and unparsable
/// tokens all normalize to `None`. The pipeline stages annotate the derived
/// fields in place and never remove a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub case_id: Option<String>,
    /// Age in years
    pub age: Option<f64>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    /// Height in centimeters
    pub height: Option<f64>,
    /// Body-mass index, supplied by the source or backfilled from
    /// weight/height during normalization
    pub bmi: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,

    // Passthrough fields kept for the enriched output, not analyzed
    pub sex: Option<String>,
    pub consent: Option<String>,
    pub completed: Option<String>,
    pub test_flag: Option<String>,
    pub bmi_index: Option<f64>,

    // Derived by the pipeline
    /// Tier assigned by the rule validator; `None` until the record has
    /// been through the rule stage
    pub status: Option<Tier>,
    pub dup_within_1h: bool,
    /// Isolation score from the outlier stage (more negative = more
    /// anomalous); `None` when the record was not scored
    pub isolation_score: Option<f64>,
    /// +1 inlier / -1 outlier from the outlier stage; `None` when unscored
    pub anomaly: Option<i8>,
}

impl Record {
    /// Presentation color for the current tier, if assigned.
    pub fn color(&self) -> Option<&'static str> {
        self.status.map(Tier::color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_severity() {
        assert!(Tier::Anomaly > Tier::Warning);
        assert!(Tier::Warning > Tier::Valid);
    }

    #[test]
    fn tier_colors_are_fixed() {
        assert_eq!(Tier::Valid.color(), "green");
        assert_eq!(Tier::Warning.color(), "orange");
        assert_eq!(Tier::Anomaly.color(), "red");
    }

    #[test]
    fn tier_names_match_display() {
        let names: Vec<String> = Tier::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["Valid", "Warning", "Anomaly"]);
    }

    #[test]
    fn default_record_is_fully_missing() {
        let rec = Record::default();
        assert!(rec.age.is_none());
        assert!(rec.status.is_none());
        assert!(!rec.dup_within_1h);
        assert!(rec.color().is_none());
    }
}
