//! Lint Rules
//!
//! Each file in this module contains one rule:
//!
//! - `unused_functor.rs` - Functors declared but never referenced
//! - `shadowed_task.rs` - Functors whose name also has a task signature

mod shadowed_task;
mod unused_functor;

pub use shadowed_task::ShadowedTaskRule;
pub use unused_functor::UnusedFunctorRule;
