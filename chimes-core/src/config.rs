//! Run configuration and scenarios.
//!
//! Both load from TOML:
//!
//! ```toml
//! [sectors]
//! Nprod = ["agri", "industry"]
//!
//! [preset]
//! K = [2.0, 3.0]
//!
//! [run]
//! t_end = 50.0
//! dt = 0.01
//! scheme = "rk4"
//! record_every = 10
//! ```

use crate::errors::{ChimesError, ChimesResult};
use crate::integrator::{Integrator, RunOutcome};
use crate::model::{Model, ModelBuilder};
use crate::preset::Preset;
use crate::registry::FieldRegistry;
use crate::shape::SectorAssignment;
use serde::{Deserialize, Serialize};

const STEP_TOLERANCE: f64 = 1e-9;

/// Numerical scheme used to advance differential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Forward Euler
    #[default]
    Euler,
    /// Classic fourth order Runge-Kutta
    Rk4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub t_start: f64,
    /// Simulated time at which the run stops
    pub t_end: f64,
    pub dt: f64,
    pub scheme: Scheme,
    /// Retain every n-th step. The final state is always retained.
    pub record_every: usize,
    /// Stop with `NumericDivergence` as soon as a field holds a NaN or infinite value
    pub check_finite: bool,
    pub max_steps: Option<usize>,
    pub wall_clock_budget_secs: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 100.0,
            dt: 0.01,
            scheme: Scheme::Euler,
            record_every: 1,
            check_finite: true,
            max_steps: None,
            wall_clock_budget_secs: None,
        }
    }
}

impl RunConfig {
    pub fn new(t_end: f64, dt: f64) -> Self {
        Self {
            t_end,
            dt,
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_record_every(mut self, record_every: usize) -> Self {
        self.record_every = record_every;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_wall_clock_budget(mut self, secs: f64) -> Self {
        self.wall_clock_budget_secs = Some(secs);
        self
    }

    pub fn validate(&self) -> ChimesResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ChimesError::Config(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        if !(self.t_start.is_finite() && self.t_end.is_finite()) || self.t_end < self.t_start {
            return Err(ChimesError::Config(format!(
                "t_end ({}) must not be before t_start ({})",
                self.t_end, self.t_start
            )));
        }
        if self.record_every == 0 {
            return Err(ChimesError::Config(
                "record_every must be at least 1".to_string(),
            ));
        }
        if let Some(budget) = self.wall_clock_budget_secs {
            if !(budget.is_finite() && budget >= 0.0) {
                return Err(ChimesError::Config(format!(
                    "wall_clock_budget_secs must be a non-negative number, got {}",
                    budget
                )));
            }
        }
        Ok(())
    }

    /// Number of steps needed to reach `t_end`.
    ///
    /// A horizon which is not a whole number of steps gets one extra, shorter, final step.
    /// Spans within a relative `1e-9` of a whole number of steps are treated as whole.
    pub fn n_steps(&self) -> usize {
        let steps = (self.t_end - self.t_start) / self.dt;
        let nearest = steps.round();
        if (steps - nearest).abs() <= STEP_TOLERANCE * nearest.max(1.0) {
            nearest as usize
        } else {
            steps.ceil() as usize
        }
    }

    /// Simulated time after `step` steps, never past `t_end`
    pub fn time_at(&self, step: usize) -> f64 {
        (self.t_start + step as f64 * self.dt).min(self.t_end)
    }

    /// Size of step number `step`. Equal to `dt` except for a shortened final step.
    pub fn step_size(&self, step: usize) -> f64 {
        self.time_at(step + 1) - self.time_at(step)
    }

    pub fn from_toml_str(text: &str) -> ChimesResult<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Everything needed to run a model: sector labels, preset values and run settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub sectors: SectorAssignment,
    pub preset: Preset,
    pub run: RunConfig,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> ChimesResult<Self> {
        let scenario: Scenario = toml::from_str(text)?;
        scenario.run.validate()?;
        Ok(scenario)
    }

    /// Build `registry` with the sector labels of this scenario.
    pub fn build_model(&self, registry: FieldRegistry) -> ChimesResult<Model> {
        ModelBuilder::new(registry)
            .with_sector_assignment(&self.sectors)
            .build()
    }

    /// Build a model from `registry` and run it.
    pub fn run(&self, registry: FieldRegistry) -> ChimesResult<RunOutcome> {
        let model = self.build_model(registry)?;
        Integrator::new(self.run.clone())?.run(&model, &self.preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::PresetValue;

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_steps(), 10_000);
        assert_eq!(config.scheme, Scheme::Euler);
    }

    #[test]
    fn step_count_rounds() {
        assert_eq!(RunConfig::new(10.0, 1.0).n_steps(), 10);
        assert_eq!(RunConfig::new(1.0, 0.1).n_steps(), 10);
        assert_eq!(RunConfig::new(0.0, 0.1).n_steps(), 0);
        assert_eq!(RunConfig::new(0.3, 0.1).n_steps(), 3);
        assert!((RunConfig::new(1.0, 0.1).time_at(7) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn final_step_lands_on_horizon() {
        let config = RunConfig::new(1.0, 0.3);
        assert_eq!(config.n_steps(), 4);
        assert_eq!(config.time_at(4), 1.0);
        assert!((config.step_size(0) - 0.3).abs() < 1e-12);
        assert!((config.step_size(3) - 0.1).abs() < 1e-12);

        let config = RunConfig::new(10.0, 3.0);
        assert_eq!(config.n_steps(), 4);
        assert_eq!(config.time_at(4), 10.0);
        assert_eq!(config.step_size(3), 1.0);

        let config = RunConfig::new(1.0, 0.4);
        assert_eq!(config.n_steps(), 3);
        assert_eq!(config.time_at(3), 1.0);
    }

    #[test]
    fn invalid_configs() {
        let bad = [
            RunConfig::new(10.0, 0.0),
            RunConfig::new(10.0, -1.0),
            RunConfig::new(10.0, f64::NAN),
            RunConfig::new(-1.0, 0.1),
            RunConfig::new(10.0, 0.1).with_record_every(0),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ChimesError::Config(_))));
        }
    }

    #[test]
    fn load_run_config() {
        let config = RunConfig::from_toml_str(
            r#"
            t_end = 50.0
            dt = 0.05
            scheme = "rk4"
            record_every = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.scheme, Scheme::Rk4);
        assert_eq!(config.t_start, 0.0);
        assert_eq!(config.n_steps(), 1000);
        assert!(config.check_finite);

        assert!(RunConfig::from_toml_str("dt = 0.0").is_err());
        assert!(matches!(
            RunConfig::from_toml_str("scheme = \"leapfrog\""),
            Err(ChimesError::Config(_))
        ));
    }

    #[test]
    fn load_scenario() {
        let scenario = Scenario::from_toml_str(
            r#"
            [sectors]
            Nprod = ["agri", "industry"]

            [preset]
            K = [2.0, 3.0]
            a = 1.5

            [run]
            t_end = 5.0
            dt = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(scenario.sectors.get("Nprod").map(|l| l.len()), Some(2));
        assert_eq!(scenario.preset.get("a"), Some(&PresetValue::Scalar(1.5)));
        assert_eq!(scenario.run.n_steps(), 10);
    }
}
