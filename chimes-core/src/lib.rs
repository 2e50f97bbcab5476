//! Engine for declarative multi-sector dynamical models.
//!
//! A model is a registry of named fields. Differential fields are integrated through time,
//! statevars are recomputed from other fields at every step and parameters are constants.
//! Fields may be scalars, one value per sector or one value per pair of sectors.
//!
//! ```
//! use chimes_core::expr::var;
//! use chimes_core::field::Field;
//! use chimes_core::integrator::run;
//! use chimes_core::model::ModelBuilder;
//! use chimes_core::preset::Preset;
//! use chimes_core::registry::FieldRegistry;
//!
//! let registry = FieldRegistry::new()
//!     .with_field(Field::parameter("r", 0.1))
//!     .with_field(Field::differential("X", var("r") * var("X"), 1.0));
//! let model = ModelBuilder::new(registry).build().unwrap();
//!
//! let outcome = run(&model, &Preset::new(), 10.0, 1.0).unwrap();
//! let x = outcome.series.last("X").unwrap().as_scalar().unwrap();
//! assert!((x - 2.5937424601).abs() < 1e-9);
//! ```

pub mod config;
pub mod dependency;
pub mod errors;
pub mod expr;
pub mod field;
pub mod graph;
pub mod integrator;
pub mod merge;
pub mod model;
pub mod operators;
pub mod preset;
pub mod registry;
pub mod shape;
pub mod state;
pub mod tensor;
pub mod timeseries;
