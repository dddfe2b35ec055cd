//! Rule model: ignore rules, transforms and the number rule.

mod rule;
mod set;

pub use rule::{NumberRule, Rule, Transform};
pub use set::RuleSet;
