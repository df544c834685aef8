//! `paycast-predictor`
//!
//! **Responsibility:** turn skills, region and experience into a salary estimate.
//!
//! - The formula itself ([`estimate`]) is pure and synchronous.
//! - A [`Predictor`] may be bound to a [`LiveDataSource`]; until that resolves,
//!   synchronous prediction refuses to run rather than silently using static data.

pub mod live;
pub mod predictor;
pub mod result;

pub use live::LiveDataSource;
pub use predictor::{Predictor, PredictorConfig, estimate};
pub use result::{
    Breakdown, DataInfo, DataStatus, PredictionResult, PredictorError, SalaryRange, SkillSummary,
};
