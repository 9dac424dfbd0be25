//! Deterministic rule validation against medically plausible bounds
//!
//! The validator is a pure total function over `Option<f64>` inputs: every
//! combination of missing, NaN and finite values maps to exactly one tier.
//! Anomaly conditions are checked before warning conditions, so a record
//! that trips both is always an anomaly.

use super::record::Tier;

/// BMI below this is not compatible with life
const BMI_MIN: f64 = 12.0;
/// BMI above this is not compatible with life
const BMI_MAX: f64 = 60.0;
const AGE_MAX: f64 = 120.0;
const HEIGHT_MAX_CM: f64 = 220.0;
const WEIGHT_MIN_KG: f64 = 20.0;
const WEIGHT_MAX_KG: f64 = 300.0;

/// Age below this is flagged for review (minors)
const AGE_WARN_MIN: f64 = 18.0;
/// Age above this is flagged for review (elderly)
const AGE_WARN_MAX: f64 = 100.0;
/// Height below this is flagged for review
const HEIGHT_WARN_MIN_CM: f64 = 150.0;

/// Treat NaN the same as an absent value.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Classify one record's measurements into a quality tier.
///
/// Bounds are inclusive at the stated boundary: a BMI of exactly 12 or 60
/// is valid, an age of exactly 100 is valid and 120 is a warning, a height
/// of exactly 150 is valid. Any missing or NaN measurement is an anomaly,
/// never a warning.
///
/// Returns the tier together with its fixed presentation color.
pub fn validate(
    bmi: Option<f64>,
    age: Option<f64>,
    height: Option<f64>,
    weight: Option<f64>,
) -> (Tier, &'static str) {
    let bmi = present(bmi);
    let age = present(age);
    let height = present(height);
    let weight = present(weight);

    let anomaly = !matches!(bmi, Some(b) if (BMI_MIN..=BMI_MAX).contains(&b))
        || !matches!(age, Some(a) if (0.0..=AGE_MAX).contains(&a))
        || !matches!(height, Some(h) if (0.0..=HEIGHT_MAX_CM).contains(&h))
        || !matches!(weight, Some(w) if (WEIGHT_MIN_KG..=WEIGHT_MAX_KG).contains(&w));

    if anomaly {
        let tier = Tier::Anomaly;
        return (tier, tier.color());
    }

    // Past the anomaly gate all four values are known in-range
    let age = age.unwrap_or_default();
    let height = height.unwrap_or_default();

    let warning = age < AGE_WARN_MIN || age > AGE_WARN_MAX || height < HEIGHT_WARN_MIN_CM;

    let tier = if warning { Tier::Warning } else { Tier::Valid };
    (tier, tier.color())
}

/// Compute BMI from weight (kg) and height (cm).
///
/// Returns `None` when either input is missing or NaN, when the height is
/// not positive, or when the weight is negative. Never panics.
pub fn bmi_from(weight: Option<f64>, height: Option<f64>) -> Option<f64> {
    let weight = present(weight)?;
    let height = present(height)?;
    if height <= 0.0 || weight < 0.0 {
        return None;
    }
    let height_m = height / 100.0;
    Some(weight / (height_m * height_m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(bmi: f64, age: f64, height: f64, weight: f64) -> Tier {
        validate(Some(bmi), Some(age), Some(height), Some(weight)).0
    }

    #[test]
    fn nominal_record_is_valid() {
        assert_eq!(
            validate(Some(22.9), Some(35.0), Some(175.0), Some(70.0)),
            (Tier::Valid, "green")
        );
    }

    #[test]
    fn bmi_boundaries_are_inclusive() {
        assert_eq!(tier(12.0, 25.0, 170.0, 70.0), Tier::Valid);
        assert_eq!(tier(11.99, 25.0, 170.0, 70.0), Tier::Anomaly);
        assert_eq!(tier(60.0, 25.0, 170.0, 70.0), Tier::Valid);
        assert_eq!(tier(60.01, 25.0, 170.0, 70.0), Tier::Anomaly);
    }

    #[test]
    fn missing_values_force_anomaly() {
        assert_eq!(validate(None, Some(30.0), Some(170.0), Some(70.0)).0, Tier::Anomaly);
        assert_eq!(validate(Some(25.0), None, Some(170.0), Some(70.0)).0, Tier::Anomaly);
        assert_eq!(validate(Some(25.0), Some(30.0), None, Some(70.0)).0, Tier::Anomaly);
        assert_eq!(validate(Some(25.0), Some(30.0), Some(170.0), None).0, Tier::Anomaly);
        assert_eq!(validate(None, None, None, None).0, Tier::Anomaly);
    }

    #[test]
    fn nan_is_treated_as_missing() {
        assert_eq!(
            validate(Some(f64::NAN), Some(30.0), Some(170.0), Some(70.0)).0,
            Tier::Anomaly
        );
        assert!(bmi_from(Some(f64::NAN), Some(175.0)).is_none());
    }

    #[test]
    fn anomaly_dominates_warning() {
        // age and height alone would be warnings, but the missing BMI wins
        assert_eq!(
            validate(None, Some(16.0), Some(140.0), Some(70.0)),
            (Tier::Anomaly, "red")
        );
    }

    #[test]
    fn bmi_from_nominal() {
        let bmi = bmi_from(Some(70.0), Some(175.0)).unwrap();
        assert!((bmi - 22.86).abs() < 0.01, "expected ~22.86, got {}", bmi);
    }

    #[test]
    fn bmi_from_degenerate_inputs() {
        assert!(bmi_from(Some(70.0), Some(0.0)).is_none());
        assert!(bmi_from(Some(70.0), Some(-5.0)).is_none());
        assert!(bmi_from(Some(-1.0), Some(175.0)).is_none());
        assert!(bmi_from(None, Some(175.0)).is_none());
        assert!(bmi_from(Some(70.0), None).is_none());
    }
}
