//! A model is a validated, compiled set of fields ready to be simulated.
//!
//! Building a model runs the whole pipeline once: overlays are merged onto the base registry,
//! dimension tags are resolved to shapes, the statevar evaluation order is computed and every
//! evaluator is compiled to read its inputs by position. Each stage fails fast with the error
//! of the first problem it finds, and nothing is built unless every stage succeeds.
//!
//! A built model is immutable and can be shared between threads to run several simulations
//! at once. Mutable simulation state lives in [`crate::state::SimulationState`].

mod builder;
mod runtime;

#[cfg(test)]
mod tests;

pub use builder::ModelBuilder;
pub use runtime::Model;
