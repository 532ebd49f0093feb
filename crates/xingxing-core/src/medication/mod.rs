//! Medication reference data and the re-dose interval check.
//!
//! Drugs are a closed enum; per-drug data is looked up with [`DrugId::info`].

mod dosage;
mod interval;

pub use dosage::{calculate_dose, DosageResult, DoseWarning};
pub use interval::{check_medication_interval, IntervalCheck};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Drugs known to the dosage calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugId {
    Ibuprofen,
    Acetaminophen,
    Oseltamivir,
    Baloxavir,
    AmoxicillinClavulanate,
    Azithromycin,
    Montelukast,
    Cetirizine,
    Loratadine,
    Ors,
    Montmorillonite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrugCategory {
    Antipyretic,
    Antiviral,
    Antibiotic,
    Allergy,
    Gi,
}

/// A marketed form of a drug. `concentration` is mg per `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Formulation {
    pub id: &'static str,
    pub name: &'static str,
    pub concentration: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugInfo {
    pub id: DrugId,
    pub generic_name: &'static str,
    pub chinese_name: &'static str,
    pub category: DrugCategory,
    pub formulations: &'static [Formulation],
    /// Minimum minutes between doses; `None` for single-dose or as-needed drugs.
    pub min_interval_minutes: Option<u32>,
    pub requires_weight: bool,
    pub requires_age: bool,
    pub min_age_months: Option<u32>,
}

impl DrugInfo {
    pub fn formulation(&self, id: &str) -> Option<&'static Formulation> {
        self.formulations.iter().find(|f| f.id == id)
    }
}

const fn form(id: &'static str, name: &'static str, concentration: f64, unit: &'static str) -> Formulation {
    Formulation { id, name, concentration, unit }
}

static IBUPROFEN: DrugInfo = DrugInfo {
    id: DrugId::Ibuprofen,
    generic_name: "Ibuprofen",
    chinese_name: "布洛芬",
    category: DrugCategory::Antipyretic,
    formulations: &[
        form("ibu_drops", "Ibuprofen drops (40mg/ml)", 40.0, "ml"),
        form("ibu_susp", "Ibuprofen suspension (20mg/ml)", 20.0, "ml"),
        form("ibu_gran", "Ibuprofen granules (200mg/sachet)", 200.0, "sachet"),
    ],
    min_interval_minutes: Some(6 * 60),
    requires_weight: true,
    requires_age: false,
    min_age_months: None,
};

static ACETAMINOPHEN: DrugInfo = DrugInfo {
    id: DrugId::Acetaminophen,
    generic_name: "Acetaminophen",
    chinese_name: "对乙酰氨基酚",
    category: DrugCategory::Antipyretic,
    formulations: &[
        form("ace_drops", "Acetaminophen drops (100mg/ml)", 100.0, "ml"),
        form("ace_susp", "Acetaminophen suspension (32mg/ml)", 32.0, "ml"),
        form("ace_gran", "Acetaminophen granules (250mg/sachet)", 250.0, "sachet"),
    ],
    min_interval_minutes: Some(4 * 60),
    requires_weight: true,
    requires_age: false,
    min_age_months: None,
};

static OSELTAMIVIR: DrugInfo = DrugInfo {
    id: DrugId::Oseltamivir,
    generic_name: "Oseltamivir",
    chinese_name: "奥司他韦",
    category: DrugCategory::Antiviral,
    formulations: &[
        form("osel_gran", "Oseltamivir granules (15mg/sachet)", 15.0, "sachet"),
        form("osel_cap", "Oseltamivir capsule (75mg)", 75.0, "capsule"),
        form("osel_susp", "Oseltamivir suspension (12mg/ml)", 12.0, "ml"),
    ],
    min_interval_minutes: Some(12 * 60),
    requires_weight: true,
    requires_age: true,
    min_age_months: None,
};

static BALOXAVIR: DrugInfo = DrugInfo {
    id: DrugId::Baloxavir,
    generic_name: "Baloxavir",
    chinese_name: "玛巴洛沙韦",
    category: DrugCategory::Antiviral,
    formulations: &[form("bal_tab", "Baloxavir tablet (20mg)", 20.0, "tablet")],
    min_interval_minutes: None,
    requires_weight: true,
    requires_age: true,
    min_age_months: Some(60),
};

static AMOXICILLIN_CLAVULANATE: DrugInfo = DrugInfo {
    id: DrugId::AmoxicillinClavulanate,
    generic_name: "Amoxicillin-Clavulanate",
    chinese_name: "阿莫西林克拉维酸钾",
    category: DrugCategory::Antibiotic,
    formulations: &[
        form("amox_susp", "Suspension 7:1 (amoxicillin 40mg/ml)", 40.0, "ml"),
        form("amox_gran", "Granules 4:1 (amoxicillin 125mg/sachet)", 125.0, "sachet"),
    ],
    min_interval_minutes: Some(8 * 60),
    requires_weight: true,
    requires_age: false,
    min_age_months: None,
};

static AZITHROMYCIN: DrugInfo = DrugInfo {
    id: DrugId::Azithromycin,
    generic_name: "Azithromycin",
    chinese_name: "阿奇霉素",
    category: DrugCategory::Antibiotic,
    formulations: &[
        form("azi_gran", "Azithromycin suspension (100mg/sachet)", 100.0, "sachet"),
        form("azi_tab", "Azithromycin tablet (250mg)", 250.0, "tablet"),
    ],
    min_interval_minutes: Some(24 * 60),
    requires_weight: true,
    requires_age: false,
    min_age_months: None,
};

static MONTELUKAST: DrugInfo = DrugInfo {
    id: DrugId::Montelukast,
    generic_name: "Montelukast",
    chinese_name: "孟鲁司特钠",
    category: DrugCategory::Allergy,
    formulations: &[
        form("mont_gran", "Montelukast granules (4mg/sachet)", 4.0, "sachet"),
        form("mont_chew4", "Montelukast chewable (4mg)", 4.0, "tablet"),
        form("mont_chew5", "Montelukast chewable (5mg)", 5.0, "tablet"),
        form("mont_tab", "Montelukast tablet (10mg)", 10.0, "tablet"),
    ],
    min_interval_minutes: Some(24 * 60),
    requires_weight: false,
    requires_age: true,
    min_age_months: Some(6),
};

static CETIRIZINE: DrugInfo = DrugInfo {
    id: DrugId::Cetirizine,
    generic_name: "Cetirizine",
    chinese_name: "西替利嗪",
    category: DrugCategory::Allergy,
    formulations: &[
        form("cet_drops", "Cetirizine drops (10mg/ml)", 10.0, "ml"),
        form("cet_syrup", "Cetirizine syrup (1mg/ml)", 1.0, "ml"),
        form("cet_tab", "Cetirizine tablet (10mg)", 10.0, "tablet"),
    ],
    min_interval_minutes: Some(12 * 60),
    requires_weight: false,
    requires_age: true,
    min_age_months: Some(6),
};

static LORATADINE: DrugInfo = DrugInfo {
    id: DrugId::Loratadine,
    generic_name: "Loratadine",
    chinese_name: "氯雷他定",
    category: DrugCategory::Allergy,
    formulations: &[
        form("lor_syrup", "Loratadine syrup (1mg/ml)", 1.0, "ml"),
        form("lor_tab", "Loratadine tablet (10mg)", 10.0, "tablet"),
    ],
    min_interval_minutes: Some(24 * 60),
    requires_weight: true,
    requires_age: true,
    min_age_months: Some(24),
};

static ORS: DrugInfo = DrugInfo {
    id: DrugId::Ors,
    generic_name: "ORS",
    chinese_name: "口服补液盐 III",
    category: DrugCategory::Gi,
    formulations: &[form("ors_powder", "ORS III powder (one sachet in 250ml)", 1.0, "ml")],
    min_interval_minutes: None,
    requires_weight: false,
    requires_age: true,
    min_age_months: None,
};

static MONTMORILLONITE: DrugInfo = DrugInfo {
    id: DrugId::Montmorillonite,
    generic_name: "Montmorillonite",
    chinese_name: "蒙脱石散",
    category: DrugCategory::Gi,
    formulations: &[form("mont_powder", "Montmorillonite powder (3g/sachet)", 3000.0, "sachet")],
    min_interval_minutes: Some(8 * 60),
    requires_weight: false,
    requires_age: true,
    min_age_months: None,
};

impl DrugId {
    pub const ALL: [DrugId; 11] = [
        DrugId::Ibuprofen,
        DrugId::Acetaminophen,
        DrugId::Oseltamivir,
        DrugId::Baloxavir,
        DrugId::AmoxicillinClavulanate,
        DrugId::Azithromycin,
        DrugId::Montelukast,
        DrugId::Cetirizine,
        DrugId::Loratadine,
        DrugId::Ors,
        DrugId::Montmorillonite,
    ];

    pub fn info(self) -> &'static DrugInfo {
        match self {
            DrugId::Ibuprofen => &IBUPROFEN,
            DrugId::Acetaminophen => &ACETAMINOPHEN,
            DrugId::Oseltamivir => &OSELTAMIVIR,
            DrugId::Baloxavir => &BALOXAVIR,
            DrugId::AmoxicillinClavulanate => &AMOXICILLIN_CLAVULANATE,
            DrugId::Azithromycin => &AZITHROMYCIN,
            DrugId::Montelukast => &MONTELUKAST,
            DrugId::Cetirizine => &CETIRIZINE,
            DrugId::Loratadine => &LORATADINE,
            DrugId::Ors => &ORS,
            DrugId::Montmorillonite => &MONTMORILLONITE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrugId::Ibuprofen => "ibuprofen",
            DrugId::Acetaminophen => "acetaminophen",
            DrugId::Oseltamivir => "oseltamivir",
            DrugId::Baloxavir => "baloxavir",
            DrugId::AmoxicillinClavulanate => "amoxicillin_clavulanate",
            DrugId::Azithromycin => "azithromycin",
            DrugId::Montelukast => "montelukast",
            DrugId::Cetirizine => "cetirizine",
            DrugId::Loratadine => "loratadine",
            DrugId::Ors => "ors",
            DrugId::Montmorillonite => "montmorillonite",
        }
    }
}

impl fmt::Display for DrugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrugId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrugId::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownDrug(s.to_string()))
    }
}

/// A dose given to a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub id: String,
    pub child_id: String,
    pub drug: DrugId,
    pub dose_mg: f64,
    pub administered_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_drug_round_trips_through_its_name() {
        for drug in DrugId::ALL {
            assert_eq!(drug.as_str().parse::<DrugId>().unwrap(), drug);
            assert_eq!(drug.info().id, drug);
            assert!(!drug.info().formulations.is_empty());
        }
    }

    #[test]
    fn unknown_drug_is_rejected() {
        assert_eq!(
            "aspirin".parse::<DrugId>().unwrap_err(),
            ValidationError::UnknownDrug("aspirin".into())
        );
    }

    #[test]
    fn analgesic_intervals() {
        assert_eq!(DrugId::Ibuprofen.info().min_interval_minutes, Some(360));
        assert_eq!(DrugId::Acetaminophen.info().min_interval_minutes, Some(240));
        assert_eq!(DrugId::Baloxavir.info().min_interval_minutes, None);
        assert_eq!(DrugId::Ors.info().min_interval_minutes, None);
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&DrugId::AmoxicillinClavulanate).unwrap();
        assert_eq!(json, "\"amoxicillin_clavulanate\"");
    }
}
