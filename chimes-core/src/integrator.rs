//! Time integration of differential fields.
//!
//! A step evaluates the rate of change of every differential field against a complete state
//! and advances the fields with the configured scheme. Statevars are re-evaluated after every
//! update, including the intermediate stages of Runge-Kutta, so every state the integrator
//! hands out is consistent.

use crate::config::{RunConfig, Scheme};
use crate::errors::{ChimesError, ChimesResult};
use crate::model::Model;
use crate::preset::Preset;
use crate::state::SimulationState;
use crate::tensor::Tensor;
use crate::timeseries::TimeSeries;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `base` with each differential field advanced by `factor * rate`, statevars re-evaluated.
fn advance(
    model: &Model,
    base: &[Tensor],
    rates: &[Tensor],
    factor: f64,
) -> ChimesResult<Vec<Tensor>> {
    let mut values = base.to_vec();
    for (&position, rate) in model.differential_positions().iter().zip(rates) {
        values[position] = base[position].scaled_add(factor, rate).ok_or_else(|| {
            ChimesError::shape(
                model.registry().fields()[position].name(),
                format!(
                    "rate of change has shape {} but the field is {}",
                    rate.shape(),
                    base[position].shape()
                ),
            )
        })?;
    }
    model.evaluate_statevars(&mut values)?;
    Ok(values)
}

/// Weighted sum of the four Runge-Kutta stages.
fn combine_stages(k1: &Tensor, k2: &Tensor, k3: &Tensor, k4: &Tensor) -> Option<Tensor> {
    let inner = k2.zip_with(k3, |a, b| 2.0 * (a + b))?;
    let outer = k1.zip_with(k4, |a, b| a + b)?;
    outer.zip_with(&inner, |a, b| (a + b) / 6.0)
}

/// Advance `state` by one step of size `dt`.
///
/// The returned state has its statevars evaluated, its time advanced by `dt` and its time
/// index advanced by one. No finiteness check is made here, see
/// [`SimulationState::check_finite`]. Fails with a `Preset` error if `state` was not created
/// from `model`.
pub fn step(
    model: &Model,
    state: &SimulationState,
    dt: f64,
    scheme: Scheme,
) -> ChimesResult<SimulationState> {
    state.check_compatible(model)?;
    let values = state.values();
    let next = match scheme {
        Scheme::Euler => {
            let rates = model.derivatives(values)?;
            advance(model, values, &rates, dt)?
        }
        Scheme::Rk4 => {
            let k1 = model.derivatives(values)?;
            let k2 = model.derivatives(&advance(model, values, &k1, dt / 2.0)?)?;
            let k3 = model.derivatives(&advance(model, values, &k2, dt / 2.0)?)?;
            let k4 = model.derivatives(&advance(model, values, &k3, dt)?)?;

            let mut rates = Vec::with_capacity(k1.len());
            for (i, &position) in model.differential_positions().iter().enumerate() {
                let rate = combine_stages(&k1[i], &k2[i], &k3[i], &k4[i]).ok_or_else(|| {
                    ChimesError::shape(
                        model.registry().fields()[position].name(),
                        "Runge-Kutta stages have different shapes",
                    )
                })?;
                rates.push(rate);
            }
            advance(model, values, &rates, dt)?
        }
    };
    Ok(SimulationState::from_parts(
        state.time() + dt,
        state.time_index() + 1,
        next,
    ))
}

/// Shared flag used to stop a run from another thread.
///
/// The flag is checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Simulated time reached the horizon
    Completed,
    Cancelled,
    /// The step budget or wall-clock budget ran out first
    BudgetExhausted,
    /// A field became NaN or infinite. Holds the `NumericDivergence` error.
    Diverged(ChimesError),
    /// The run could not continue for any other reason, such as a state from another model
    Failed(ChimesError),
}

impl Termination {
    fn from_error(err: ChimesError) -> Self {
        match err {
            ChimesError::NumericDivergence { .. } => Termination::Diverged(err),
            _ => Termination::Failed(err),
        }
    }
}

/// The result of a run. The series holds everything retained up to the point the run stopped.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub series: TimeSeries,
    pub termination: Termination,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.termination == Termination::Completed
    }

    pub fn error(&self) -> Option<&ChimesError> {
        match &self.termination {
            Termination::Diverged(err) | Termination::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The series of a completed run, or the error that stopped it.
    ///
    /// Cancelled and budget-limited runs are returned as they are.
    pub fn into_result(self) -> ChimesResult<TimeSeries> {
        match self.termination {
            Termination::Diverged(err) | Termination::Failed(err) => Err(err),
            _ => Ok(self.series),
        }
    }
}

/// Runs a model from a preset to the configured horizon.
#[derive(Debug, Clone)]
pub struct Integrator {
    config: RunConfig,
    cancellation: Option<CancellationToken>,
}

impl Integrator {
    pub fn new(config: RunConfig) -> ChimesResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancellation: None,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Instantiate `model` from `preset` and run it.
    ///
    /// Fails only if the initial state cannot be built. Anything that stops the run after
    /// that is reported in the outcome alongside the partial series.
    pub fn run(&self, model: &Model, preset: &Preset) -> ChimesResult<RunOutcome> {
        let state = SimulationState::new(model, preset, self.config.t_start)?;
        Ok(self.run_from(model, state))
    }

    /// Run from an existing state until the configured horizon.
    ///
    /// The final step is shortened when the horizon is not a whole number of steps, so a
    /// completed run always ends at `t_end`.
    pub fn run_from(&self, model: &Model, mut state: SimulationState) -> RunOutcome {
        let config = &self.config;
        let first_step = state.time_index();
        let n_steps = config.n_steps();
        let budget = config.wall_clock_budget_secs.map(Duration::from_secs_f64);
        let started = Instant::now();

        info!(
            "Running {} steps of {:?} with dt={} from t={}",
            n_steps.saturating_sub(first_step),
            config.scheme,
            config.dt,
            state.time()
        );

        let mut series = TimeSeries::new(model);
        let mut termination = Termination::Completed;

        if let Err(err) = state.check_compatible(model) {
            warn!("{}", err);
            return RunOutcome {
                series,
                termination: Termination::Failed(err),
            };
        }
        if config.check_finite {
            if let Err(err) = state.check_finite(model) {
                warn!("{}", err);
                series.record(&state);
                return RunOutcome {
                    series,
                    termination: Termination::from_error(err),
                };
            }
        }
        series.record(&state);
        let mut recorded = state.time_index();

        for k in first_step..n_steps {
            if self
                .cancellation
                .as_ref()
                .map_or(false, CancellationToken::is_cancelled)
            {
                warn!("Run cancelled at t={}", state.time());
                termination = Termination::Cancelled;
                break;
            }
            if config.max_steps.map_or(false, |max| k - first_step >= max) {
                warn!("Step budget exhausted at t={}", state.time());
                termination = Termination::BudgetExhausted;
                break;
            }
            if budget.map_or(false, |budget| started.elapsed() >= budget) {
                warn!("Wall-clock budget exhausted at t={}", state.time());
                termination = Termination::BudgetExhausted;
                break;
            }

            let mut next = match step(model, &state, config.step_size(k), config.scheme) {
                Ok(next) => next,
                Err(err) => {
                    warn!("{}", err);
                    termination = Termination::from_error(err);
                    break;
                }
            };
            // Avoid accumulating rounding errors in the time axis
            next.set_time(config.time_at(k + 1));

            if config.check_finite {
                if let Err(err) = next.check_finite(model) {
                    warn!("{}", err);
                    termination = Termination::from_error(err);
                    break;
                }
            }

            state = next;
            if state.time_index() % config.record_every == 0 {
                series.record(&state);
                recorded = state.time_index();
            }
        }

        if recorded != state.time_index() {
            series.record(&state);
        }

        info!(
            "Run stopped at t={} after {:.3}s: {:?}",
            state.time(),
            started.elapsed().as_secs_f64(),
            termination
        );
        debug!("Retained {} time points", series.len());
        RunOutcome {
            series,
            termination,
        }
    }
}

/// Run `model` from `preset` to `horizon` with forward Euler, retaining every step.
pub fn run(model: &Model, preset: &Preset, horizon: f64, dt: f64) -> ChimesResult<RunOutcome> {
    Integrator::new(RunConfig::new(horizon, dt))?.run(model, preset)
}
