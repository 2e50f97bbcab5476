//! Reduced Goodwin-Keen model.
//!
//! Three differential variables: the employment rate, the wage share and the relative private
//! debt. Investment is a function of profit and is financed by debt. Typical behaviour is a
//! damped oscillation around a Solow point or a debt crisis.

use crate::library::library;
use chimes_core::errors::ChimesResult;
use chimes_core::expr::{exp, pow, var};
use chimes_core::field::{Evaluator, Field};
use chimes_core::merge::{merge, Overlay};
use chimes_core::preset::Preset;
use chimes_core::registry::FieldRegistry;

/// Fields added to [`library`] by this model.
pub fn overlay() -> Overlay {
    Overlay::new()
        .with_field(
            Field::parameter("n", 0.025)
                .with_comment("Rate of growth of the working population")
                .with_units("y^-1"),
        )
        .with_field(
            Field::differential(
                "employment",
                var("employment") * (var("g") - var("alpha") - var("n")),
                0.95,
            )
            .with_comment("Employment rate"),
        )
        .with_field(
            Field::differential(
                "omega",
                Evaluator::new(
                    var("omega")
                        * (var("phillips")
                            - (1.0 - var("gammai")) * var("inflation")
                            - var("alpha")),
                )
                .with_optional("gammai", 0.0),
                0.9,
            )
            .with_comment("Wage share")
            .with_symbol("ω"),
        )
        .with_field(
            Field::differential(
                "d",
                var("kappa") - var("pi") - var("d") * (var("g") + var("inflation")),
                2.0,
            )
            .with_comment("Relative private debt"),
        )
        .with_field(
            Field::statevar(
                "phillips",
                -var("phi0") + var("phi1") / pow(1.0 - var("employment"), 2.0),
            )
            .with_comment("Wage inflation rate")
            .with_units("y^-1"),
        )
        .with_field(
            Field::statevar("g", var("kappa") / var("nu") - var("delta"))
                .with_comment("Growth rate of output")
                .with_units("y^-1"),
        )
        .with_field(
            Field::statevar("pi", 1.0 - var("omega") - var("r") * var("d"))
                .with_comment("Relative profit"),
        )
        .with_field(
            Field::statevar(
                "kappa",
                var("k0") + var("k1") * exp(var("k2") * var("pi")),
            )
            .with_comment("Share of GDP invested"),
        )
        .with_field(
            Field::statevar(
                "inflation",
                var("eta") * (var("mu") * var("omega") - 1.0),
            )
            .with_comment("Markup driven price inflation")
            .with_units("y^-1"),
        )
}

/// The model registry: [`overlay`] merged onto [`library`].
pub fn registry() -> ChimesResult<FieldRegistry> {
    merge(&library(), &overlay())
}

pub fn preset() -> Preset {
    Preset::new()
        .with_value("employment", 0.95)
        .with_value("omega", 0.9)
        .with_value("d", 2.0)
        .with_value("alpha", 0.02)
        .with_value("n", 0.025)
        .with_value("nu", 3.0)
        .with_value("delta", 0.005)
        .with_value("phinull", 0.04)
        .with_value("r", 0.03)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimes_core::config::{RunConfig, Scheme};
    use chimes_core::field::Kind;
    use chimes_core::integrator::{step, Integrator};
    use chimes_core::model::{Model, ModelBuilder};
    use is_close::is_close;

    #[test]
    fn overlay_replaces_library_debt() {
        let registry = registry().unwrap();
        assert_eq!(library().get("d").unwrap().kind(), Kind::Parameter);
        assert_eq!(registry.get("d").unwrap().kind(), Kind::Differential);
        assert!(!registry.contains("gammai"));
    }

    #[test]
    fn initial_state() {
        let model = ModelBuilder::new(registry().unwrap()).build().unwrap();
        let state = model.instantiate(&preset()).unwrap();
        let scalar = |name: &str| state.get(&model, name).unwrap().as_scalar().unwrap();

        assert!(is_close!(scalar("pi"), 0.04));
        assert!(is_close!(scalar("inflation"), 0.8));
        assert!(is_close!(scalar("g"), scalar("kappa") / 3.0 - 0.005));

        let order = model.statevar_order();
        let at = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(at("pi") < at("kappa"));
        assert!(at("kappa") < at("g"));
        assert!(at("phi0") < at("phillips"));
    }

    #[test]
    fn century_run_stays_near_full_employment() {
        let model = ModelBuilder::new(registry().unwrap()).build().unwrap();
        let config = RunConfig::new(100.0, 0.01)
            .with_scheme(Scheme::Rk4)
            .with_record_every(100);
        let outcome = Integrator::new(config).unwrap().run(&model, &preset()).unwrap();
        assert!(outcome.is_completed());

        let series = outcome.series;
        assert_eq!(series.len(), 101);
        assert!(is_close!(series.last_time().unwrap(), 100.0));
        let employment = series.scalar("employment").unwrap();
        assert!(employment.iter().all(|&e| e > 0.9 && e < 1.0));
    }

    #[test]
    fn workers_share_of_inflation() {
        let base = ModelBuilder::new(registry().unwrap()).build().unwrap();
        let indexed = ModelBuilder::new(registry().unwrap())
            .with_overlay(Overlay::new().with_field(Field::parameter("gammai", 1.0)))
            .build()
            .unwrap();

        let next_omega = |model: &Model| {
            let state = model.instantiate(&preset()).unwrap();
            let next = step(model, &state, 1e-3, Scheme::Euler).unwrap();
            next.get(model, "omega").unwrap().as_scalar().unwrap()
        };
        // Fully indexed wages are unaffected by price inflation
        assert!(next_omega(&indexed) > next_omega(&base));
    }
}
