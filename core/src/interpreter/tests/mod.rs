//! Tests for the interpreter
//!
//! Organized by feature area

mod composition_tests;
mod helpers;
