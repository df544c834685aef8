//! Built-in weight tables.
//!
//! Base salaries are annual amounts in each region's local currency. Skill
//! keys are stored pre-normalised (see [`normalize_skill`](crate::normalize_skill)).

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::weights::{ComboRule, ExperienceCurve, WeightMeta, WeightSet};

const BASE_SALARIES: &[(&str, f64, &str)] = &[
    ("US", 75_000.0, "USD"),
    ("CA", 68_000.0, "CAD"),
    ("UK", 52_000.0, "GBP"),
    ("DE", 58_000.0, "EUR"),
    ("FR", 48_000.0, "EUR"),
    ("NL", 55_000.0, "EUR"),
    ("ES", 36_000.0, "EUR"),
    ("PL", 150_000.0, "PLN"),
    ("AU", 90_000.0, "AUD"),
    ("SG", 80_000.0, "SGD"),
    ("JP", 6_000_000.0, "JPY"),
    ("IN", 1_200_000.0, "INR"),
    ("BR", 120_000.0, "BRL"),
];

const SKILLS: &[(&str, f64)] = &[
    // Languages
    ("javascript", 1.08),
    ("typescript", 1.15),
    ("python", 1.12),
    ("java", 1.10),
    ("go", 1.20),
    ("rust", 1.25),
    ("cpp", 1.15),
    ("csharp", 1.08),
    ("ruby", 1.06),
    ("php", 1.02),
    ("swift", 1.12),
    ("kotlin", 1.12),
    ("scala", 1.18),
    ("elixir", 1.15),
    // Frontend
    ("react", 1.15),
    ("vue", 1.08),
    ("angular", 1.06),
    ("svelte", 1.08),
    ("nextjs", 1.10),
    ("webassembly", 1.12),
    // Backend & data
    ("nodejs", 1.12),
    ("django", 1.06),
    ("spring", 1.08),
    ("graphql", 1.08),
    ("sql", 1.04),
    ("postgresql", 1.08),
    ("mongodb", 1.05),
    ("redis", 1.06),
    ("kafka", 1.15),
    ("spark", 1.18),
    // Infrastructure
    ("docker", 1.08),
    ("kubernetes", 1.20),
    ("terraform", 1.15),
    ("aws", 1.18),
    ("gcp", 1.15),
    ("azure", 1.12),
    ("linux", 1.05),
    // Machine learning
    ("machinelearning", 1.25),
    ("tensorflow", 1.20),
    ("pytorch", 1.22),
    ("pandas", 1.06),
];

const COMBOS: &[(&[&str], f64)] = &[
    (&["react", "typescript", "nodejs"], 0.15),
    (&["python", "machinelearning"], 0.12),
    (&["python", "pytorch"], 0.10),
    (&["docker", "kubernetes"], 0.08),
    (&["aws", "terraform"], 0.08),
    (&["go", "kubernetes"], 0.10),
    (&["rust", "webassembly"], 0.10),
    (&["kafka", "spark"], 0.10),
];

const EXPERIENCE: ExperienceCurve = ExperienceCurve {
    per_year: 0.05,
    max_years: 15.0,
    senior_bonus: 0.2,
};

/// The process-wide static weight set.
///
/// Built on first use and shared afterwards.
pub fn static_weights() -> Arc<WeightSet> {
    static WEIGHTS: OnceLock<Arc<WeightSet>> = OnceLock::new();
    WEIGHTS.get_or_init(|| Arc::new(build())).clone()
}

fn build() -> WeightSet {
    let base_salaries = BASE_SALARIES
        .iter()
        .map(|(region, amount, _)| (region.to_string(), *amount))
        .collect::<BTreeMap<_, _>>();

    let currencies = BASE_SALARIES
        .iter()
        .map(|(region, _, currency)| (region.to_string(), currency.to_string()))
        .collect::<BTreeMap<_, _>>();

    let skills = SKILLS
        .iter()
        .map(|(skill, weight)| (skill.to_string(), *weight))
        .collect::<BTreeMap<_, _>>();

    let combos = COMBOS
        .iter()
        .map(|(skills, bonus)| ComboRule::new(skills, *bonus))
        .collect();

    WeightSet {
        base_salaries,
        skills,
        experience: EXPERIENCE,
        combos,
        currencies,
        meta: WeightMeta::fixed(),
    }
}
