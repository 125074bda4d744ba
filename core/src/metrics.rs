use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Classify a BMI using closed-open bands: `[18.5, 24)` is normal,
    /// `[24, 28)` overweight, `28` and above obese.
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 24.0 {
            BmiCategory::Normal
        } else if bmi < 28.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        };
        f.write_str(label)
    }
}

/// Body-mass index from kilograms and centimeters.
///
/// `height_cm` must be positive; callers guard this (a stored profile always
/// passed `validate_height`).
#[must_use]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

#[must_use]
pub fn classify_bmi(bmi: f64) -> BmiCategory {
    BmiCategory::from_bmi(bmi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_bmi() {
        let bmi = calculate_bmi(70.0, 175.0);
        assert!((bmi - 22.857).abs() < 0.001);
        let bmi = calculate_bmi(81.0, 180.0);
        assert!((bmi - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_bmi_boundaries() {
        assert_eq!(classify_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(classify_bmi(18.5), BmiCategory::Normal);
        assert_eq!(classify_bmi(23.99), BmiCategory::Normal);
        assert_eq!(classify_bmi(24.0), BmiCategory::Overweight);
        assert_eq!(classify_bmi(27.99), BmiCategory::Overweight);
        assert_eq!(classify_bmi(28.0), BmiCategory::Obese);
        assert_eq!(classify_bmi(40.0), BmiCategory::Obese);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BmiCategory::Overweight).unwrap(),
            "\"overweight\""
        );
        assert_eq!(BmiCategory::Normal.to_string(), "Normal");
    }
}
