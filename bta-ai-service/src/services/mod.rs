pub mod metrics;
pub mod origin_policy;
pub mod prompt;
pub mod providers;

pub use origin_policy::{AccessDecision, OriginPolicy};
