use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use paycast_core::{
    DomainError, DomainResult, FALLBACK_REGION, SENIOR_THRESHOLD_YEARS, WeightSet, normalize_skill,
    static_weights,
};

use crate::live::LiveDataSource;
use crate::result::{
    Breakdown, DataInfo, DataStatus, PredictionResult, PredictorError, SalaryRange, SkillSummary,
};

/// Lower bound of the salary range as a fraction of the estimate.
const RANGE_LOW: f64 = 0.85;
/// Upper bound of the salary range as a fraction of the estimate.
const RANGE_HIGH: f64 = 1.20;

/// Matched-skill count at which the count component of confidence saturates.
const CONFIDENCE_SATURATION: f64 = 10.0;
const MATCH_RATE_WEIGHT: f64 = 0.7;
const MATCH_COUNT_WEIGHT: f64 = 0.3;

/// Region and experience a predictor is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictorConfig {
    pub region: String,
    pub experience_years: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            region: FALLBACK_REGION.to_string(),
            experience_years: 0.0,
        }
    }
}

impl PredictorConfig {
    pub fn new(region: impl Into<String>, experience_years: f64) -> Self {
        Self {
            region: region.into(),
            experience_years,
        }
    }

    /// Experience must be a finite, non-negative number. Region is never rejected.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.experience_years.is_finite() || self.experience_years < 0.0 {
            return Err(DomainError::validation(format!(
                "experienceYears must be a finite number >= 0 (got {})",
                self.experience_years
            )));
        }
        Ok(())
    }
}

/// Deterministic salary estimator.
///
/// Model:
/// - Base salary by region (unknown regions use the US entry).
/// - Matched skills stack additively: `1 + Σ(weight − 1)`.
/// - Every combo whose skills are all present adds its bonus.
/// - Experience adds `perYear` per capped year; a senior bonus applies from 5 raw years.
/// - `estimate = round(base * skill * experience * (1 + combo + senior))`.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
    weights: Arc<WeightSet>,
    live: Option<LiveDataSource>,
    status: DataStatus,
    last_error: Option<String>,
}

impl Predictor {
    /// A predictor over the built-in tables.
    pub fn new(config: PredictorConfig) -> Result<Self, PredictorError> {
        Self::with_weights(config, static_weights())
    }

    /// A predictor over an explicit weight set.
    pub fn with_weights(
        config: PredictorConfig,
        weights: Arc<WeightSet>,
    ) -> Result<Self, PredictorError> {
        config.validate()?;
        Ok(Self {
            config,
            weights,
            live: None,
            status: DataStatus::Static,
            last_error: None,
        })
    }

    /// A predictor whose weights come from `live` once resolved.
    ///
    /// Until [`ensure_live_data`](Self::ensure_live_data) runs, [`predict`](Self::predict)
    /// fails with [`PredictorError::DataNotReady`].
    pub fn with_live_source(
        config: PredictorConfig,
        live: LiveDataSource,
    ) -> Result<Self, PredictorError> {
        config.validate()?;
        Ok(Self {
            config,
            weights: static_weights(),
            live: Some(live),
            status: DataStatus::StaticPendingLive,
            last_error: None,
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn set_region(&mut self, region: impl Into<String>) -> &mut Self {
        self.config.region = region.into();
        self
    }

    /// Validated on the next prediction.
    pub fn set_experience(&mut self, years: f64) -> &mut Self {
        self.config.experience_years = years;
        self
    }

    pub fn data_info(&self) -> DataInfo {
        DataInfo {
            status: self.status,
            source: self.weights.meta.source,
            stale: self.weights.meta.stale,
            fetched_at: self.weights.meta.fetched_at,
            error: self.last_error.clone(),
        }
    }

    /// Resolve the live source if it is still pending.
    ///
    /// A failed load falls back to the built-in tables; it never fails the caller.
    pub async fn ensure_live_data(&mut self) -> DataStatus {
        if self.status != DataStatus::StaticPendingLive {
            return self.status;
        }
        let Some(live) = self.live.clone() else {
            self.status = DataStatus::Static;
            return self.status;
        };

        match live.load().await {
            Ok((outcome, warning)) => {
                self.status = if outcome.stale {
                    DataStatus::StaleLive
                } else {
                    DataStatus::Live
                };
                self.last_error = warning.map(|e| e.to_string());
                info!(source = %outcome.source, stale = outcome.stale, "live weight data resolved");
                self.weights = outcome.data;
            }
            Err(err) => {
                warn!(error = %err, "live weight data unavailable; falling back to static tables");
                self.status = DataStatus::StaticFallback;
                self.last_error = Some(err.to_string());
                self.weights = static_weights();
            }
        }
        self.status
    }

    /// Sorted normalised skill keys of the active weight set.
    pub fn supported_skills(&self) -> Vec<String> {
        self.weights.supported_skills()
    }

    pub fn supported_regions(&self) -> Vec<String> {
        self.weights.supported_regions()
    }

    pub fn predict<S: AsRef<str>>(&self, skills: &[S]) -> Result<PredictionResult, PredictorError> {
        if self.status == DataStatus::StaticPendingLive {
            return Err(PredictorError::DataNotReady);
        }
        self.config.validate()?;

        let started = Instant::now();
        let mut result = estimate(&self.weights, &self.config, skills);
        result.execution_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

        debug!(
            region = %result.region,
            estimated_salary = result.estimated_salary,
            matched = result.skills.matched.len(),
            "prediction computed"
        );
        Ok(result)
    }

    /// Predict each skill set independently, preserving order.
    pub fn batch_predict<S: AsRef<str>>(
        &self,
        skill_sets: &[Vec<S>],
    ) -> Result<Vec<PredictionResult>, PredictorError> {
        skill_sets.iter().map(|skills| self.predict(skills)).collect()
    }

    pub async fn predict_async<S: AsRef<str>>(
        &mut self,
        skills: &[S],
    ) -> Result<PredictionResult, PredictorError> {
        self.ensure_live_data().await;
        self.predict(skills)
    }

    pub async fn batch_predict_async<S: AsRef<str>>(
        &mut self,
        skill_sets: &[Vec<S>],
    ) -> Result<Vec<PredictionResult>, PredictorError> {
        self.ensure_live_data().await;
        self.batch_predict(skill_sets)
    }
}

/// The pure formula. `execution_time_ms` is left at zero for the caller to fill.
pub fn estimate<S: AsRef<str>>(
    weights: &WeightSet,
    config: &PredictorConfig,
    skills: &[S],
) -> PredictionResult {
    let normalized = normalize_all(skills);
    let present: HashSet<&str> = normalized.iter().map(String::as_str).collect();

    let base_salary = weights.base_salary(&config.region);

    let mut skill_multiplier = 1.0;
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for skill in &normalized {
        match weights.skill_weight(skill) {
            Some(weight) => {
                skill_multiplier += weight - 1.0;
                matched.push(skill.clone());
            }
            None => unmatched.push(skill.clone()),
        }
    }

    let mut combo_bonus = 0.0;
    let mut active_combos = Vec::new();
    for combo in &weights.combos {
        if combo.skills.iter().all(|s| present.contains(s.as_str())) {
            combo_bonus += combo.bonus;
            active_combos.push(combo.label());
        }
    }

    let curve = &weights.experience;
    let years = config.experience_years;
    let experience_multiplier = 1.0 + years.min(curve.max_years) * curve.per_year;
    let senior_bonus = if years >= SENIOR_THRESHOLD_YEARS {
        curve.senior_bonus
    } else {
        0.0
    };

    let final_multiplier =
        skill_multiplier * experience_multiplier * (1.0 + combo_bonus + senior_bonus);
    let estimated_salary = round_salary(base_salary * final_multiplier);

    let total = skills.len();
    let confidence = confidence(matched.len(), total);

    PredictionResult {
        estimated_salary,
        salary_range: SalaryRange {
            min: round_salary(estimated_salary as f64 * RANGE_LOW),
            max: round_salary(estimated_salary as f64 * RANGE_HIGH),
        },
        currency: weights.currency(&config.region).to_string(),
        region: config.region.clone(),
        experience_years: years,
        breakdown: Breakdown {
            base_salary,
            skill_multiplier: round2(skill_multiplier),
            experience_multiplier: round2(experience_multiplier),
            combo_bonus: round2(combo_bonus),
            senior_bonus: round2(senior_bonus),
            final_multiplier: round2(final_multiplier),
        },
        skills: SkillSummary {
            matched,
            unmatched,
            total,
        },
        active_combos,
        confidence,
        execution_time_ms: 0.0,
        timestamp: Utc::now(),
        data_source: weights.meta.clone(),
    }
}

/// Normalise every input. Blanks and repeats are kept: each entry counts.
fn normalize_all<S: AsRef<str>>(skills: &[S]) -> Vec<String> {
    skills
        .iter()
        .map(|raw| normalize_skill(raw.as_ref()))
        .collect()
}

fn confidence(matched: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let match_rate = matched as f64 / total as f64;
    let count_score = (matched as f64 / CONFIDENCE_SATURATION).min(1.0);
    let score = (match_rate * MATCH_RATE_WEIGHT + count_score * MATCH_COUNT_WEIGHT) * 100.0;
    score.round().clamp(0.0, 100.0) as u8
}

fn round_salary(value: f64) -> i64 {
    value.round() as i64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use paycast_core::{ComboRule, ExperienceCurve, WeightMeta};
    use proptest::prelude::*;

    fn us(years: f64) -> Predictor {
        Predictor::new(PredictorConfig::new("US", years)).unwrap()
    }

    fn custom_weights() -> Arc<WeightSet> {
        Arc::new(WeightSet {
            base_salaries: BTreeMap::from([("US".to_string(), 100_000.0)]),
            skills: BTreeMap::from([
                ("a".to_string(), 1.5),
                ("b".to_string(), 1.25),
                ("c".to_string(), 1.0),
            ]),
            experience: ExperienceCurve {
                per_year: 0.1,
                max_years: 3.0,
                senior_bonus: 0.5,
            },
            combos: vec![ComboRule::new(&["a", "b"], 0.1), ComboRule::new(&["b", "c"], 0.2)],
            currencies: BTreeMap::from([("US".to_string(), "USD".to_string())]),
            meta: WeightMeta::fixed(),
        })
    }

    fn expected_estimate(result: &PredictionResult, raw_skill_mult: f64, raw_exp_mult: f64) -> i64 {
        let b = &result.breakdown;
        let bonus = 1.0 + b.combo_bonus + b.senior_bonus;
        (b.base_salary * raw_skill_mult * raw_exp_mult * bonus).round() as i64
    }

    #[test]
    fn frontend_stack_example() {
        let result = us(5.0).predict(&["React", "TypeScript", "Node.js"]).unwrap();

        assert_eq!(result.skills.matched, vec!["react", "typescript", "nodejs"]);
        assert!(result.skills.unmatched.is_empty());
        assert_eq!(result.skills.total, 3);
        assert_eq!(result.active_combos, vec!["react+typescript+nodejs"]);
        assert_eq!(result.breakdown.combo_bonus, 0.15);
        assert_eq!(result.breakdown.senior_bonus, 0.2);
        assert_eq!(result.breakdown.base_salary, 75_000.0);
        assert_eq!(result.currency, "USD");

        let skill_mult = 1.0 + (1.15 - 1.0) + (1.15 - 1.0) + (1.12 - 1.0);
        let exp_mult = 1.0 + 5.0 * 0.05;
        assert_eq!(result.estimated_salary, expected_estimate(&result, skill_mult, exp_mult));
        assert_eq!(result.breakdown.skill_multiplier, 1.42);
        assert_eq!(result.breakdown.experience_multiplier, 1.25);
    }

    #[test]
    fn range_is_fixed_spread_around_estimate() {
        let result = us(3.0).predict(&["Rust", "Go"]).unwrap();
        let estimate = result.estimated_salary as f64;
        assert_eq!(result.salary_range.min, (estimate * 0.85).round() as i64);
        assert_eq!(result.salary_range.max, (estimate * 1.20).round() as i64);
    }

    #[test]
    fn unknown_skill_is_recorded_not_rejected() {
        let result = us(0.0).predict(&["UnknownSkill"]).unwrap();

        assert_eq!(result.skills.unmatched, vec!["unknownskill"]);
        assert!(result.skills.matched.is_empty());
        assert_eq!(result.breakdown.skill_multiplier, 1.0);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.estimated_salary, 75_000);
    }

    #[test]
    fn empty_skill_list_has_zero_confidence() {
        let empty: [&str; 0] = [];
        let result = us(2.0).predict(&empty).unwrap();
        assert_eq!(result.confidence, 0);
        assert_eq!(result.skills.total, 0);
        assert_eq!(result.estimated_salary, (75_000.0 * 1.1_f64).round() as i64);
    }

    #[test]
    fn cpp_spelling_quirk_is_preserved() {
        let result = us(0.0).predict(&["C++", "cpp"]).unwrap();
        assert_eq!(result.skills.unmatched, vec!["c++"]);
        assert_eq!(result.skills.matched, vec!["cpp"]);
    }

    #[test]
    fn repeated_skills_each_add_their_weight() {
        let result = us(0.0).predict(&["React", "react"]).unwrap();
        assert_eq!(result.skills.matched, vec!["react", "react"]);
        assert_eq!(result.skills.total, 2);
        assert_eq!(result.breakdown.skill_multiplier, 1.3);
        assert_eq!(result.estimated_salary, (75_000.0 * (1.0 + 2.0 * 0.15_f64)).round() as i64);
    }

    #[test]
    fn blank_skill_counts_as_unmatched_input() {
        let result = us(0.0).predict(&["React", ""]).unwrap();
        assert_eq!(result.skills.matched, vec!["react"]);
        assert_eq!(result.skills.unmatched, vec![""]);
        assert_eq!(result.skills.total, 2);
        assert_eq!(result.confidence, 38);

        let spaced = us(0.0).predict(&[" ", "re-act"]).unwrap();
        assert_eq!(spaced.skills.unmatched, vec![""]);
        assert_eq!(spaced.skills.matched, vec!["react"]);
    }

    #[test]
    fn unknown_region_matches_us() {
        let skills = ["Python", "AWS"];
        let us_result = us(4.0).predict(&skills).unwrap();
        let zz_result = Predictor::new(PredictorConfig::new("ZZ", 4.0))
            .unwrap()
            .predict(&skills)
            .unwrap();

        assert_eq!(zz_result.breakdown.base_salary, us_result.breakdown.base_salary);
        assert_eq!(zz_result.currency, us_result.currency);
        assert_eq!(zz_result.estimated_salary, us_result.estimated_salary);
        assert_eq!(zz_result.region, "ZZ");
    }

    #[test]
    fn known_region_uses_local_salary_and_currency() {
        let result = Predictor::new(PredictorConfig::new("UK", 0.0))
            .unwrap()
            .predict(&["Go"])
            .unwrap();
        assert_eq!(result.breakdown.base_salary, 52_000.0);
        assert_eq!(result.currency, "GBP");
    }

    #[test]
    fn qualifying_combos_stack() {
        let predictor =
            Predictor::with_weights(PredictorConfig::new("US", 0.0), custom_weights()).unwrap();
        let result = predictor.predict(&["a", "b", "c"]).unwrap();

        assert_eq!(result.active_combos, vec!["a+b", "b+c"]);
        assert_eq!(result.breakdown.combo_bonus, 0.3);
        assert_eq!(result.breakdown.skill_multiplier, 1.75);
    }

    #[test]
    fn senior_bonus_uses_raw_years_and_experience_is_capped() {
        let config = |years| PredictorConfig::new("US", years);

        let junior = Predictor::with_weights(config(2.0), custom_weights()).unwrap();
        let result = junior.predict(&["c"]).unwrap();
        assert_eq!(result.breakdown.senior_bonus, 0.0);
        assert_eq!(result.breakdown.experience_multiplier, 1.2);

        // Cap is 3 years, threshold is 5: multiplier capped, bonus still granted.
        let senior = Predictor::with_weights(config(5.0), custom_weights()).unwrap();
        let result = senior.predict(&["c"]).unwrap();
        assert_eq!(result.breakdown.experience_multiplier, 1.3);
        assert_eq!(result.breakdown.senior_bonus, 0.5);
        assert_eq!(result.estimated_salary, (100_000.0 * 1.3_f64 * 1.5).round() as i64);
    }

    #[test]
    fn confidence_blends_rate_and_count() {
        assert_eq!(confidence(0, 0), 0);
        assert_eq!(confidence(1, 2), 38);
        assert_eq!(confidence(10, 10), 100);
        assert_eq!(confidence(12, 12), 100);
        assert_eq!(confidence(5, 10), 50);
    }

    #[test]
    fn repeated_predictions_are_identical_apart_from_timing() {
        let predictor = us(7.0);
        let skills = ["Kubernetes", "Docker", "Go", "Haskell"];

        let first = predictor.predict(&skills).unwrap();
        let mut second = predictor.predict(&skills).unwrap();

        second.execution_time_ms = first.execution_time_ms;
        second.timestamp = first.timestamp;
        assert_eq!(first, second);
    }

    #[test]
    fn batch_preserves_order() {
        let predictor = us(1.0);
        let sets = vec![vec!["Rust"], vec!["UnknownSkill"], vec!["Python", "PyTorch"]];

        let results = predictor.batch_predict(&sets).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].skills.matched, vec!["rust"]);
        assert_eq!(results[1].skills.unmatched, vec!["unknownskill"]);
        assert_eq!(results[2].active_combos, vec!["python+pytorch"]);
    }

    #[test]
    fn fluent_setters_mutate_in_place() {
        let mut predictor = us(0.0);
        let result = predictor
            .set_region("DE")
            .set_experience(6.0)
            .predict(&["Java"])
            .unwrap();

        assert_eq!(result.region, "DE");
        assert_eq!(result.currency, "EUR");
        assert_eq!(result.experience_years, 6.0);
        assert_eq!(predictor.config().region, "DE");
    }

    #[test]
    fn negative_experience_is_rejected() {
        let err = Predictor::new(PredictorConfig::new("US", -1.0)).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidInput(DomainError::Validation(_))));

        let mut predictor = us(1.0);
        predictor.set_experience(f64::NAN);
        assert!(matches!(
            predictor.predict(&["Rust"]),
            Err(PredictorError::InvalidInput(_))
        ));
    }

    #[test]
    fn static_predictor_reports_static_data() {
        let predictor = us(0.0);
        let info = predictor.data_info();
        assert_eq!(info.status, DataStatus::Static);
        assert!(!info.stale);
        assert!(info.error.is_none());
        assert!(predictor.supported_regions().contains(&"US".to_string()));

        let skills = predictor.supported_skills();
        let mut sorted = skills.clone();
        sorted.sort();
        assert_eq!(skills, sorted);
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = us(5.0).predict(&["React"]).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert!(value.get("estimatedSalary").is_some());
        assert!(value["salaryRange"].get("min").is_some());
        assert!(value["breakdown"].get("skillMultiplier").is_some());
        assert!(value.get("activeCombos").is_some());
        assert_eq!(value["dataSource"]["source"], "static");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: more experience never lowers the estimate.
        #[test]
        fn more_experience_never_lowers_salary(
            years in 0.0f64..40.0,
            extra in 0.0f64..20.0,
            skills in prop::sample::subsequence(static_weights().supported_skills(), 0..6),
        ) {
            let lower = us(years).predict(&skills).unwrap();
            let higher = us(years + extra).predict(&skills).unwrap();
            prop_assert!(higher.estimated_salary >= lower.estimated_salary);
        }

        /// Property: adding a matched skill never lowers the skill multiplier.
        #[test]
        fn matched_skill_never_lowers_multiplier(
            skills in prop::sample::subsequence(static_weights().supported_skills(), 0..6),
            extra in prop::sample::select(static_weights().supported_skills()),
        ) {
            let predictor = us(3.0);
            let before = predictor.predict(&skills).unwrap();

            let mut more = skills.clone();
            more.push(extra);
            let after = predictor.predict(&more).unwrap();

            prop_assert!(after.breakdown.skill_multiplier >= before.breakdown.skill_multiplier);
        }
    }
}
