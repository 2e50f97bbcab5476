//! Declarative multi-sector dynamical economic models.
//!
//! The engine lives in [`chimes_core`] and the reference models in [`chimes_models`]. This crate
//! re-exports both under a single name.
//!
//! ```
//! use chimes::models::goodwin_keen;
//! use chimes::{Integrator, ModelBuilder, RunConfig, Scheme};
//!
//! let model = ModelBuilder::new(goodwin_keen::registry().unwrap())
//!     .build()
//!     .unwrap();
//! let config = RunConfig::new(10.0, 0.01).with_scheme(Scheme::Rk4);
//! let outcome = Integrator::new(config)
//!     .unwrap()
//!     .run(&model, &goodwin_keen::preset())
//!     .unwrap();
//! assert!(outcome.is_completed());
//! ```

pub use chimes_core::{
    config, dependency, errors, expr, field, graph, integrator, merge, model, operators, preset,
    registry, shape, state, tensor, timeseries,
};
pub use chimes_models as models;

pub use chimes_core::config::{RunConfig, Scenario, Scheme};
pub use chimes_core::errors::{ChimesError, ChimesResult};
pub use chimes_core::field::{Evaluator, Field, Input, Kind};
pub use chimes_core::integrator::{run, CancellationToken, Integrator, RunOutcome, Termination};
pub use chimes_core::merge::{merge, merge_all, Overlay};
pub use chimes_core::model::{Model, ModelBuilder};
pub use chimes_core::preset::{Preset, PresetValue};
pub use chimes_core::registry::FieldRegistry;
pub use chimes_core::shape::SectorAssignment;
pub use chimes_core::state::SimulationState;
pub use chimes_core::tensor::{Shape, Tensor};
pub use chimes_core::timeseries::TimeSeries;
