//! The reflection loop — the heart of Reflexa.
//!
//! A run follows a **Generate → Critique** cycle:
//!
//! 1. **Optionally optimize** the user's request
//! 2. **Generate** a draft from the generation conversation
//! 3. **Reflect** on the draft in the reviewer's conversation
//! 4. **If approved** (`<OK>` in the critique): return the draft
//! 5. **Otherwise**: feed the critique back and loop to step 2
//!
//! The loop ends on approval or when the step budget is spent.

pub mod patterns;
pub mod prompts;

pub use patterns::{
    PromptOptimizer, ReflectionAgent, ReflectionOutcome, ReflectionRequest, ReflectionResult,
    StepRecord,
};
pub use prompts::{APPROVAL_SENTINEL, TEMPLATES, Template, find_template};
