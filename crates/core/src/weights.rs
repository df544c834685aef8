//! Weight set model and skill normalisation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Region whose base salary and currency back any unrecognised region code.
pub const FALLBACK_REGION: &str = "US";

/// Raw (uncapped) experience at which the senior bonus starts to apply.
pub const SENIOR_THRESHOLD_YEARS: f64 = 5.0;

const FALLBACK_CURRENCY: &str = "USD";

/// Normalise a raw skill string into a lookup key.
///
/// Lowercases and strips whitespace, `.` and `-`. Other punctuation is kept,
/// so `"C++"` becomes `"c++"` (not the stored `"cpp"` key).
pub fn normalize_skill(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Where a weight set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataOrigin {
    /// Built-in tables compiled into the binary.
    Static,
    /// Freshly fetched from a live source.
    Live,
    /// Served from the loader cache within its TTL.
    Cache,
    /// Served from the loader cache after a failed refresh.
    StaleCache,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOrigin::Static => "static",
            DataOrigin::Live => "live",
            DataOrigin::Cache => "cache",
            DataOrigin::StaleCache => "stale-cache",
        }
    }
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a weight set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightMeta {
    pub source: DataOrigin,
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl WeightMeta {
    pub fn fixed() -> Self {
        Self {
            source: DataOrigin::Static,
            stale: false,
            fetched_at: None,
        }
    }

    pub fn loaded(source: DataOrigin, stale: bool, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source,
            stale,
            fetched_at: Some(fetched_at),
        }
    }
}

impl Default for WeightMeta {
    fn default() -> Self {
        Self::fixed()
    }
}

/// Experience curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceCurve {
    /// Multiplier added per year of (capped) experience.
    pub per_year: f64,
    /// Years beyond this cap add nothing to the experience multiplier.
    pub max_years: f64,
    /// Flat bonus once raw experience reaches [`SENIOR_THRESHOLD_YEARS`].
    pub senior_bonus: f64,
}

/// A bonus applied when every skill in `skills` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboRule {
    /// Normalised skill keys.
    #[serde(alias = "skillSet")]
    pub skills: Vec<String>,
    pub bonus: f64,
}

impl ComboRule {
    pub fn new(skills: &[&str], bonus: f64) -> Self {
        Self {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            bonus,
        }
    }

    /// Label used in prediction output, e.g. `react+typescript+nodejs`.
    pub fn label(&self) -> String {
        self.skills.join("+")
    }
}

/// The full set of lookup tables the predictor works from.
///
/// Immutable once built; a refresh replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSet {
    pub base_salaries: BTreeMap<String, f64>,
    pub skills: BTreeMap<String, f64>,
    pub experience: ExperienceCurve,
    pub combos: Vec<ComboRule>,
    pub currencies: BTreeMap<String, String>,
    #[serde(default)]
    pub meta: WeightMeta,
}

impl WeightSet {
    /// Base salary for `region`, falling back to the US entry.
    pub fn base_salary(&self, region: &str) -> f64 {
        self.base_salaries
            .get(region)
            .or_else(|| self.base_salaries.get(FALLBACK_REGION))
            .copied()
            .unwrap_or(0.0)
    }

    /// Currency code for `region`, falling back to the US entry.
    pub fn currency(&self, region: &str) -> &str {
        self.currencies
            .get(region)
            .or_else(|| self.currencies.get(FALLBACK_REGION))
            .map(String::as_str)
            .unwrap_or(FALLBACK_CURRENCY)
    }

    pub fn skill_weight(&self, normalized: &str) -> Option<f64> {
        self.skills.get(normalized).copied()
    }

    /// Sorted normalised skill keys.
    pub fn supported_skills(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }

    /// Sorted region codes.
    pub fn supported_regions(&self) -> Vec<String> {
        self.base_salaries.keys().cloned().collect()
    }

    pub fn with_meta(mut self, meta: WeightMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Check that the set is usable for prediction.
    ///
    /// Requires a US base salary and non-negative finite weights everywhere.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if !self.base_salaries.contains_key(FALLBACK_REGION) {
            return Err(DomainError::invariant(format!(
                "baseSalaries must contain a {FALLBACK_REGION} entry"
            )));
        }

        for (region, amount) in &self.base_salaries {
            ensure_non_negative(*amount, || format!("base salary for {region}"))?;
        }
        for (skill, weight) in &self.skills {
            ensure_non_negative(*weight, || format!("multiplier for skill {skill}"))?;
        }
        for combo in &self.combos {
            ensure_non_negative(combo.bonus, || format!("bonus for combo {}", combo.label()))?;
        }

        let exp = &self.experience;
        ensure_non_negative(exp.per_year, || "experience.perYear".to_string())?;
        ensure_non_negative(exp.max_years, || "experience.maxYears".to_string())?;
        ensure_non_negative(exp.senior_bonus, || "experience.seniorBonus".to_string())?;

        Ok(())
    }
}

fn ensure_non_negative(value: f64, what: impl FnOnce() -> String) -> DomainResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::invariant(format!(
            "{} must be a finite non-negative number (got {value})",
            what()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn small_set() -> WeightSet {
        WeightSet {
            base_salaries: BTreeMap::from([("US".to_string(), 100.0), ("UK".to_string(), 80.0)]),
            skills: BTreeMap::from([("rust".to_string(), 1.2)]),
            experience: ExperienceCurve {
                per_year: 0.05,
                max_years: 10.0,
                senior_bonus: 0.1,
            },
            combos: vec![ComboRule::new(&["rust", "go"], 0.1)],
            currencies: BTreeMap::from([
                ("US".to_string(), "USD".to_string()),
                ("UK".to_string(), "GBP".to_string()),
            ]),
            meta: WeightMeta::fixed(),
        }
    }

    #[test]
    fn normalization_strips_whitespace_dots_and_hyphens() {
        assert_eq!(normalize_skill("Node.js"), "nodejs");
        assert_eq!(normalize_skill("  Machine Learning "), "machinelearning");
        assert_eq!(normalize_skill("Objective-C"), "objectivec");
        assert_eq!(normalize_skill("TypeScript"), "typescript");
    }

    #[test]
    fn normalization_keeps_plus_and_hash() {
        assert_eq!(normalize_skill("C++"), "c++");
        assert_eq!(normalize_skill("C#"), "c#");
    }

    #[test]
    fn unknown_region_uses_us_salary_and_currency() {
        let set = small_set();
        assert_eq!(set.base_salary("ZZ"), set.base_salary("US"));
        assert_eq!(set.currency("ZZ"), "USD");
        assert_eq!(set.base_salary("UK"), 80.0);
        assert_eq!(set.currency("UK"), "GBP");
    }

    #[test]
    fn region_lookup_is_exact() {
        let set = small_set();
        // Lowercase codes are not recognised.
        assert_eq!(set.base_salary("uk"), 100.0);
    }

    #[test]
    fn invariants_require_us_entry() {
        let mut set = small_set();
        set.base_salaries.remove("US");

        let err = set.check_invariants().unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("US") => {}
            other => panic!("expected missing-US invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn invariants_reject_negative_multipliers() {
        let mut set = small_set();
        set.skills.insert("cobol".to_string(), -0.5);
        assert!(set.check_invariants().is_err());

        let mut set = small_set();
        set.combos[0].bonus = f64::NAN;
        assert!(set.check_invariants().is_err());
    }

    #[test]
    fn deserializes_camel_case_payload_with_skill_set_alias() {
        let payload = json!({
            "baseSalaries": { "US": 90000.0 },
            "skills": { "go": 1.2 },
            "experience": { "perYear": 0.04, "maxYears": 12.0, "seniorBonus": 0.15 },
            "combos": [ { "skillSet": ["go", "kubernetes"], "bonus": 0.1 } ],
            "currencies": { "US": "USD" }
        });

        let set: WeightSet = serde_json::from_value(payload).unwrap();
        assert_eq!(set.combos[0].label(), "go+kubernetes");
        assert_eq!(set.experience.max_years, 12.0);
        assert_eq!(set.meta.source, DataOrigin::Static);
        assert!(set.check_invariants().is_ok());
    }

    proptest! {
        /// Normalising twice changes nothing, and the stripped characters never survive.
        #[test]
        fn normalization_is_idempotent(raw in "[ A-Za-z0-9.+#-]{0,24}") {
            let once = normalize_skill(&raw);
            prop_assert_eq!(normalize_skill(&once), once.clone());
            prop_assert!(!once.contains(['.', '-', ' ']));
        }
    }

    #[test]
    fn supported_lists_are_sorted() {
        let set = small_set();
        assert_eq!(set.supported_regions(), vec!["UK".to_string(), "US".to_string()]);
        assert_eq!(set.supported_skills(), vec!["rust".to_string()]);
    }
}
