//! Weight- and age-based single-dose calculation.

use serde::Serialize;
use std::fmt;

use super::{DrugId, Formulation};
use crate::error::ValidationError;

/// Caution attached to a calculated dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DoseWarning {
    WeightTooLow,
    VerifyWeight,
    SingleDoseCapped { max_mg: f64 },
    FirstDayDoseCapped { max_mg: f64 },
    ConsultDoctorUnderAge { months: u32 },
    NotRecommendedUnderAge { months: u32 },
    NotRecommendedUnderWeight { kg: f64 },
    StartWithin48Hours,
    TakeFasting,
    TakeWithFood,
    TakeAwayFromMeals,
    NotForAcuteAsthma,
    DissolveOrsInWater,
    DiscardOrsAfter24Hours,
    TakeBetweenMeals,
    DissolveInWater,
    SeparateFromOtherDrugs,
}

impl fmt::Display for DoseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseWarning::WeightTooLow => write!(f, "weight is very low, consult a doctor"),
            DoseWarning::VerifyWeight => write!(f, "please double-check the weight"),
            DoseWarning::SingleDoseCapped { max_mg } => {
                write!(f, "single dose capped at the maximum of {max_mg}mg")
            }
            DoseWarning::FirstDayDoseCapped { max_mg } => {
                write!(f, "first-day dose capped at the maximum of {max_mg}mg")
            }
            DoseWarning::ConsultDoctorUnderAge { months } => {
                write!(f, "under {months} months: use only under a doctor's guidance")
            }
            DoseWarning::NotRecommendedUnderAge { months } => {
                write!(f, "not recommended under {months} months")
            }
            DoseWarning::NotRecommendedUnderWeight { kg } => {
                write!(f, "not recommended below {kg}kg")
            }
            DoseWarning::StartWithin48Hours => {
                write!(f, "start within 48 hours of symptom onset")
            }
            DoseWarning::TakeFasting => write!(
                f,
                "take fasting or 2 hours after a meal, not with calcium or magnesium products"
            ),
            DoseWarning::TakeWithFood => write!(f, "take with food to reduce stomach upset"),
            DoseWarning::TakeAwayFromMeals => {
                write!(f, "take 1 hour before or 2 hours after a meal")
            }
            DoseWarning::NotForAcuteAsthma => write!(f, "not for treating an acute asthma attack"),
            DoseWarning::DissolveOrsInWater => {
                write!(f, "dissolve one sachet in 250ml warm water, do not add sugar")
            }
            DoseWarning::DiscardOrsAfter24Hours => {
                write!(f, "use within 24 hours of mixing, discard the rest")
            }
            DoseWarning::TakeBetweenMeals => write!(f, "take between meals"),
            DoseWarning::DissolveInWater => write!(f, "dissolve in 50ml warm water"),
            DoseWarning::SeparateFromOtherDrugs => {
                write!(f, "keep 1-2 hours apart from other medicines")
            }
        }
    }
}

/// Calculated dose for one administration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosageResult {
    pub recommended_dose_mg: f64,
    /// Amount of the formulation to give, in `unit`.
    pub recommended_dose_volume: f64,
    pub min_dose_mg: f64,
    pub max_dose_mg: f64,
    pub max_daily_dose_mg: f64,
    pub max_daily_times: u32,
    pub interval_hours: u32,
    pub warnings: Vec<DoseWarning>,
    pub unit: String,
    pub course_days: Option<u32>,
    pub course_note: Option<String>,
    pub administration_note: Option<String>,
    pub is_age_based: bool,
}

impl DosageResult {
    fn fixed(dose_mg: f64, formulation: &Formulation) -> Self {
        Self {
            recommended_dose_mg: dose_mg,
            recommended_dose_volume: volume(dose_mg, formulation.concentration),
            min_dose_mg: dose_mg,
            max_dose_mg: dose_mg,
            max_daily_dose_mg: dose_mg,
            max_daily_times: 1,
            interval_hours: 24,
            warnings: Vec::new(),
            unit: formulation.unit.to_string(),
            course_days: None,
            course_note: None,
            administration_note: None,
            is_age_based: false,
        }
    }
}

fn round1(mg: f64) -> f64 {
    (mg * 10.0).round() / 10.0
}

fn volume(mg: f64, concentration: f64) -> f64 {
    round1(mg / concentration)
}

/// Calculate a single dose of `drug` in the given formulation.
///
/// # Errors
/// Returns [`ValidationError`] for a non-positive weight or a formulation
/// that does not belong to the drug.
pub fn calculate_dose(
    drug: DrugId,
    weight_kg: f64,
    age_months: u32,
    formulation_id: &str,
) -> Result<DosageResult, ValidationError> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ValidationError::invalid("weight_kg", "must be a positive number"));
    }
    let formulation = drug
        .info()
        .formulation(formulation_id)
        .ok_or_else(|| ValidationError::UnknownFormulation {
            drug: drug.to_string(),
            formulation: formulation_id.to_string(),
        })?;

    let result = match drug {
        DrugId::Ibuprofen => weight_based_antipyretic(weight_kg, formulation, Antipyretic::IBUPROFEN),
        DrugId::Acetaminophen => {
            weight_based_antipyretic(weight_kg, formulation, Antipyretic::ACETAMINOPHEN)
        }
        DrugId::Oseltamivir => oseltamivir(weight_kg, age_months, formulation),
        DrugId::Baloxavir => baloxavir(weight_kg, age_months, formulation),
        DrugId::AmoxicillinClavulanate => amoxicillin_clavulanate(weight_kg, formulation),
        DrugId::Azithromycin => azithromycin(weight_kg, formulation),
        DrugId::Montelukast => montelukast(age_months, formulation),
        DrugId::Cetirizine => cetirizine(age_months, formulation),
        DrugId::Loratadine => loratadine(weight_kg, age_months, formulation),
        DrugId::Ors => ors(age_months),
        DrugId::Montmorillonite => montmorillonite(age_months, formulation),
    };
    tracing::debug!(drug = %drug, dose_mg = result.recommended_dose_mg, "calculated dose");
    Ok(result)
}

struct Antipyretic {
    standard_per_kg: f64,
    min_per_kg: f64,
    max_per_kg: f64,
    daily_per_kg: f64,
    single_cap: f64,
    daily_cap: f64,
    max_daily_times: u32,
    interval_hours: u32,
}

impl Antipyretic {
    const IBUPROFEN: Antipyretic = Antipyretic {
        standard_per_kg: 7.0,
        min_per_kg: 5.0,
        max_per_kg: 10.0,
        daily_per_kg: 40.0,
        single_cap: 400.0,
        daily_cap: 1200.0,
        max_daily_times: 4,
        interval_hours: 6,
    };

    const ACETAMINOPHEN: Antipyretic = Antipyretic {
        standard_per_kg: 12.0,
        min_per_kg: 10.0,
        max_per_kg: 15.0,
        daily_per_kg: 60.0,
        single_cap: 500.0,
        daily_cap: 2000.0,
        max_daily_times: 5,
        interval_hours: 4,
    };
}

fn weight_warnings(weight_kg: f64, warnings: &mut Vec<DoseWarning>) {
    if weight_kg < 5.0 {
        warnings.push(DoseWarning::WeightTooLow);
    }
    if weight_kg > 80.0 {
        warnings.push(DoseWarning::VerifyWeight);
    }
}

fn weight_based_antipyretic(weight_kg: f64, formulation: &Formulation, rule: Antipyretic) -> DosageResult {
    let mut warnings = Vec::new();
    weight_warnings(weight_kg, &mut warnings);

    let standard = round1(weight_kg * rule.standard_per_kg);
    let effective = standard.min(rule.single_cap);
    if standard > rule.single_cap {
        warnings.push(DoseWarning::SingleDoseCapped { max_mg: rule.single_cap });
    }

    DosageResult {
        recommended_dose_mg: effective,
        recommended_dose_volume: volume(effective, formulation.concentration),
        min_dose_mg: round1(weight_kg * rule.min_per_kg),
        max_dose_mg: round1(weight_kg * rule.max_per_kg).min(rule.single_cap),
        max_daily_dose_mg: round1(weight_kg * rule.daily_per_kg).min(rule.daily_cap),
        max_daily_times: rule.max_daily_times,
        interval_hours: rule.interval_hours,
        warnings,
        unit: formulation.unit.to_string(),
        course_days: None,
        course_note: None,
        administration_note: None,
        is_age_based: false,
    }
}

fn oseltamivir(weight_kg: f64, age_months: u32, formulation: &Formulation) -> DosageResult {
    let dose = if weight_kg <= 15.0 {
        30.0
    } else if weight_kg <= 23.0 {
        45.0
    } else if weight_kg <= 40.0 {
        60.0
    } else {
        75.0
    };

    let mut result = DosageResult::fixed(dose, formulation);
    if age_months < 12 {
        result.warnings.push(DoseWarning::ConsultDoctorUnderAge { months: 12 });
    }
    result.warnings.push(DoseWarning::StartWithin48Hours);
    result.max_daily_dose_mg = dose * 2.0;
    result.max_daily_times = 2;
    result.interval_hours = 12;
    result.course_days = Some(5);
    result.course_note = Some("twice daily for 5 days".to_string());
    result
}

fn baloxavir(weight_kg: f64, age_months: u32, formulation: &Formulation) -> DosageResult {
    let dose = if weight_kg >= 80.0 { 40.0 } else { 20.0 };

    let mut result = DosageResult::fixed(dose, formulation);
    if age_months < 60 {
        result.warnings.push(DoseWarning::NotRecommendedUnderAge { months: 60 });
    }
    if weight_kg < 20.0 {
        result.warnings.push(DoseWarning::NotRecommendedUnderWeight { kg: 20.0 });
    }
    result.warnings.push(DoseWarning::TakeFasting);
    result.interval_hours = 0;
    result.course_days = Some(1);
    result.course_note = Some("single dose only".to_string());
    result.administration_note = Some("fasting or 2 hours after a meal".to_string());
    result
}

fn amoxicillin_clavulanate(weight_kg: f64, formulation: &Formulation) -> DosageResult {
    let mut warnings = Vec::new();
    if weight_kg < 5.0 {
        warnings.push(DoseWarning::WeightTooLow);
    }

    // ~15mg/kg per dose, three times daily.
    let single = round1(weight_kg * 15.0);
    let effective = single.min(500.0);
    if single > 500.0 {
        warnings.push(DoseWarning::SingleDoseCapped { max_mg: 500.0 });
    }
    warnings.push(DoseWarning::TakeWithFood);

    DosageResult {
        recommended_dose_mg: effective,
        recommended_dose_volume: volume(effective, formulation.concentration),
        min_dose_mg: round1(weight_kg * 8.0),
        max_dose_mg: round1(weight_kg * 22.5).min(500.0),
        max_daily_dose_mg: round1(weight_kg * 45.0).min(2000.0),
        max_daily_times: 3,
        interval_hours: 8,
        warnings,
        unit: formulation.unit.to_string(),
        course_days: None,
        course_note: Some("three times daily, usually 5-10 days as prescribed".to_string()),
        administration_note: Some("with meals".to_string()),
        is_age_based: false,
    }
}

fn azithromycin(weight_kg: f64, formulation: &Formulation) -> DosageResult {
    let mut warnings = Vec::new();
    if weight_kg < 5.0 {
        warnings.push(DoseWarning::WeightTooLow);
    }

    let day1 = round1(weight_kg * 10.0);
    let day1_effective = day1.min(500.0);
    let day2_effective = round1(weight_kg * 5.0).min(250.0);
    if day1 > 500.0 {
        warnings.push(DoseWarning::FirstDayDoseCapped { max_mg: 500.0 });
    }
    warnings.push(DoseWarning::TakeAwayFromMeals);

    DosageResult {
        recommended_dose_mg: day1_effective,
        recommended_dose_volume: volume(day1_effective, formulation.concentration),
        min_dose_mg: day2_effective,
        max_dose_mg: day1_effective,
        max_daily_dose_mg: day1_effective,
        max_daily_times: 1,
        interval_hours: 24,
        warnings,
        unit: formulation.unit.to_string(),
        course_days: Some(3),
        course_note: Some(format!(
            "day 1: {day1_effective}mg, days 2-3: {day2_effective}mg (or {day1_effective}mg daily for 3 days)"
        )),
        administration_note: Some("1 hour before or 2 hours after a meal".to_string()),
        is_age_based: false,
    }
}

fn montelukast(age_months: u32, formulation: &Formulation) -> DosageResult {
    let dose = match age_months {
        0..=71 => 4.0,
        72..=179 => 5.0,
        _ => 10.0,
    };

    let mut result = DosageResult::fixed(dose, formulation);
    if age_months < 6 {
        result.warnings.push(DoseWarning::ConsultDoctorUnderAge { months: 6 });
    }
    result.warnings.push(DoseWarning::NotForAcuteAsthma);
    result.is_age_based = true;
    result.administration_note = Some("once daily in the evening".to_string());
    result
}

fn cetirizine(age_months: u32, formulation: &Formulation) -> DosageResult {
    let (dose, max_daily, times) = match age_months {
        0..=11 => (2.5, 2.5, 1),
        12..=71 => (2.5, 5.0, 2),
        72..=143 => (5.0, 10.0, 2),
        _ => (10.0, 10.0, 1),
    };

    let mut result = DosageResult::fixed(dose, formulation);
    if age_months < 6 {
        result.warnings.push(DoseWarning::NotRecommendedUnderAge { months: 6 });
    }
    result.max_daily_dose_mg = max_daily;
    result.max_daily_times = times;
    result.interval_hours = if times == 1 { 24 } else { 12 };
    result.is_age_based = true;
    result
}

fn loratadine(weight_kg: f64, age_months: u32, formulation: &Formulation) -> DosageResult {
    let dose = if age_months < 72 && weight_kg < 30.0 { 5.0 } else { 10.0 };

    let mut result = DosageResult::fixed(dose, formulation);
    if age_months < 24 {
        result.warnings.push(DoseWarning::NotRecommendedUnderAge { months: 24 });
    }
    result.is_age_based = true;
    result
}

fn ors(age_months: u32) -> DosageResult {
    // Replacement volume per loose stool, in ml.
    let (per_stool, max_daily) = match age_months {
        0..=5 => (50.0, 500),
        6..=23 => (100.0, 1000),
        24..=119 => (150.0, 2000),
        _ => (200.0, 3000),
    };

    DosageResult {
        recommended_dose_mg: 0.0,
        recommended_dose_volume: per_stool,
        min_dose_mg: 0.0,
        max_dose_mg: 0.0,
        max_daily_dose_mg: 0.0,
        max_daily_times: 0,
        interval_hours: 0,
        warnings: vec![DoseWarning::DissolveOrsInWater, DoseWarning::DiscardOrsAfter24Hours],
        unit: "ml".to_string(),
        course_days: None,
        course_note: Some(format!(
            "{per_stool}ml after each loose stool, at most {max_daily}ml per day"
        )),
        administration_note: Some("small sips, after each loose stool".to_string()),
        is_age_based: true,
    }
}

fn montmorillonite(age_months: u32, formulation: &Formulation) -> DosageResult {
    let (dose, label) = match age_months {
        0..=11 => (1000.0, "1g (1/3 sachet)"),
        12..=23 => (1500.0, "1.5g (1/2 sachet)"),
        _ => (3000.0, "3g (1 sachet)"),
    };

    let mut result = DosageResult::fixed(dose, formulation);
    result.warnings = vec![
        DoseWarning::TakeBetweenMeals,
        DoseWarning::DissolveInWater,
        DoseWarning::SeparateFromOtherDrugs,
    ];
    result.max_daily_dose_mg = dose * 3.0;
    result.max_daily_times = 3;
    result.interval_hours = 8;
    result.is_age_based = true;
    result.course_note = Some(format!("three times daily, {label} each"));
    result.administration_note = Some("between meals".to_string());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ibuprofen_by_weight() {
        let r = calculate_dose(DrugId::Ibuprofen, 10.0, 24, "ibu_susp").unwrap();
        assert_eq!(r.recommended_dose_mg, 70.0);
        assert_eq!(r.recommended_dose_volume, 3.5);
        assert_eq!(r.min_dose_mg, 50.0);
        assert_eq!(r.max_dose_mg, 100.0);
        assert_eq!(r.max_daily_dose_mg, 400.0);
        assert_eq!(r.interval_hours, 6);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn ibuprofen_caps_single_dose() {
        let r = calculate_dose(DrugId::Ibuprofen, 90.0, 200, "ibu_gran").unwrap();
        assert_eq!(r.recommended_dose_mg, 400.0);
        assert_eq!(r.recommended_dose_volume, 2.0);
        assert_eq!(r.max_daily_dose_mg, 1200.0);
        assert!(r.warnings.contains(&DoseWarning::VerifyWeight));
        assert!(r.warnings.contains(&DoseWarning::SingleDoseCapped { max_mg: 400.0 }));
    }

    #[test]
    fn acetaminophen_low_weight_warns() {
        let r = calculate_dose(DrugId::Acetaminophen, 4.0, 2, "ace_drops").unwrap();
        assert_eq!(r.recommended_dose_mg, 48.0);
        assert_eq!(r.recommended_dose_volume, 0.5);
        assert_eq!(r.warnings, vec![DoseWarning::WeightTooLow]);
    }

    #[test]
    fn oseltamivir_weight_bands() {
        let r = calculate_dose(DrugId::Oseltamivir, 20.0, 60, "osel_gran").unwrap();
        assert_eq!(r.recommended_dose_mg, 45.0);
        assert_eq!(r.recommended_dose_volume, 3.0);
        assert_eq!(r.max_daily_dose_mg, 90.0);
        assert_eq!(r.course_days, Some(5));
    }

    #[test]
    fn cetirizine_age_bands() {
        let toddler = calculate_dose(DrugId::Cetirizine, 12.0, 30, "cet_syrup").unwrap();
        assert_eq!(toddler.recommended_dose_mg, 2.5);
        assert_eq!(toddler.max_daily_times, 2);
        assert_eq!(toddler.interval_hours, 12);

        let teen = calculate_dose(DrugId::Cetirizine, 50.0, 150, "cet_tab").unwrap();
        assert_eq!(teen.recommended_dose_mg, 10.0);
        assert_eq!(teen.interval_hours, 24);
    }

    #[test]
    fn ors_is_measured_in_ml() {
        let r = calculate_dose(DrugId::Ors, 12.0, 30, "ors_powder").unwrap();
        assert_eq!(r.unit, "ml");
        assert_eq!(r.recommended_dose_volume, 150.0);
        assert_eq!(r.recommended_dose_mg, 0.0);
    }

    #[test]
    fn montmorillonite_by_age() {
        let r = calculate_dose(DrugId::Montmorillonite, 8.0, 18, "mont_powder").unwrap();
        assert_eq!(r.recommended_dose_mg, 1500.0);
        assert_eq!(r.recommended_dose_volume, 0.5);
        assert_eq!(r.max_daily_dose_mg, 4500.0);
    }

    #[test]
    fn rejects_foreign_formulation() {
        let err = calculate_dose(DrugId::Ibuprofen, 10.0, 24, "ace_drops").unwrap_err();
        assert!(matches!(err, ValidationError::UnknownFormulation { .. }));
    }

    #[test]
    fn rejects_bad_weight() {
        assert!(calculate_dose(DrugId::Ibuprofen, 0.0, 24, "ibu_susp").is_err());
        assert!(calculate_dose(DrugId::Ibuprofen, f64::NAN, 24, "ibu_susp").is_err());
    }

    #[test]
    fn warnings_render_as_text() {
        assert_eq!(
            DoseWarning::SingleDoseCapped { max_mg: 400.0 }.to_string(),
            "single dose capped at the maximum of 400mg"
        );
    }
}
