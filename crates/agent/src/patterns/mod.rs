//! Agent patterns — structured strategies built on one completion client.
//!
//! 1. **Reflection** — Generate → Critique loop ending on approval or budget
//! 2. **Prompt optimization** — a single rewrite of the user's request

pub mod optimizer;
pub mod reflection;

pub use optimizer::PromptOptimizer;
pub use reflection::{
    DEFAULT_HISTORY_LENGTH, DEFAULT_STEPS, ReflectionAgent, ReflectionOutcome, ReflectionRequest,
    ReflectionResult, StepRecord, is_approval,
};

#[cfg(test)]
pub(crate) mod test_helpers;
