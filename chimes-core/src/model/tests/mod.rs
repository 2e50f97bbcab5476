//! Tests for building models and running them end to end.

#[cfg(test)]
mod build_errors;
