//! Goodwin growth cycle.
//!
//! Wages follow a Phillips curve on the employment rate and all profit is invested. Population
//! and productivity grow exponentially, so the employment rate and wage share cycle around an
//! equilibrium.

use crate::library::library;
use chimes_core::errors::ChimesResult;
use chimes_core::expr::{pow, var};
use chimes_core::field::{Evaluator, Field};
use chimes_core::merge::{merge, Overlay};
use chimes_core::preset::Preset;
use chimes_core::registry::FieldRegistry;

/// Fields added to, or replaced in, [`library`] by this model.
pub fn overlay() -> Overlay {
    Overlay::new()
        .with_field(
            Field::parameter("n", 0.025)
                .with_comment("Rate of growth of the working population")
                .with_units("y^-1"),
        )
        .with_field(
            Field::differential("a", var("a") * var("alpha"), 1.0)
                .with_comment("Labour productivity"),
        )
        .with_field(Field::differential("N", var("N") * var("n"), 1.0).with_comment("Population"))
        .with_field(
            Field::differential("K", var("Ir") - var("delta") * var("K"), 2.7)
                .with_comment("Productive capital")
                .with_units("units"),
        )
        .with_field(
            Field::differential("w", var("w") * var("phillips"), 0.85)
                .with_comment("Nominal wage")
                .with_units("dollars"),
        )
        .with_field(Field::statevar("Y", var("K") / var("nu")).with_comment("Output"))
        .with_field(Field::statevar("L", var("Y") / var("a")).with_comment("Workers"))
        .with_field(Field::statevar("GDP", var("Y")).with_comment("Nominal output"))
        .with_field(
            // Debt service is declared as an input but the model keeps no debt
            Field::statevar(
                "Pi",
                Evaluator::with_inputs(
                    var("GDP") - var("w") * var("L"),
                    ["GDP", "w", "L", "r", "D"],
                ),
            )
            .with_comment("Absolute profit"),
        )
        .with_field(Field::statevar("I", var("Pi")).with_comment("Nominal investment"))
        .with_field(Field::statevar("Ir", var("I")).with_comment("Real investment"))
        .with_field(Field::statevar("pi", var("Pi") / var("GDP")).with_comment("Relative profit"))
        .with_field(
            Field::statevar("employment", var("L") / var("N")).with_comment("Employment rate"),
        )
        .with_field(
            Field::statevar("omega", var("w") * var("L") / var("GDP"))
                .with_comment("Wage share")
                .with_symbol("ω"),
        )
        .with_field(
            Field::statevar(
                "phillips",
                -var("phi0") + var("phi1") / pow(1.0 - var("employment"), 2.0),
            )
            .with_comment("Wage inflation rate"),
        )
        .with_field(
            Field::statevar("g", (var("Ir") - var("delta") * var("K")) / var("K"))
                .with_comment("Growth rate of capital"),
        )
}

/// The model registry: [`overlay`] merged onto [`library`].
pub fn registry() -> ChimesResult<FieldRegistry> {
    merge(&library(), &overlay())
}

pub fn preset() -> Preset {
    Preset::new()
        .with_value("alpha", 0.021)
        .with_value("n", 0.0251)
        .with_value("nu", 3.0)
        .with_value("delta", 0.0051)
        .with_value("phinull", 0.11)
        .with_value("a", 1.01)
        .with_value("N", 1.01)
        .with_value("K", 2.91)
        .with_value("w", 0.5 * 1.19)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimes_core::config::{RunConfig, Scheme};
    use chimes_core::integrator::Integrator;
    use chimes_core::model::ModelBuilder;
    use is_close::is_close;

    #[test]
    fn initial_state() {
        let model = ModelBuilder::new(registry().unwrap()).build().unwrap();
        assert_eq!(model.differentials(), vec!["N", "a", "K", "w"]);

        let state = model.instantiate(&preset()).unwrap();
        let scalar = |name: &str| state.get(&model, name).unwrap().as_scalar().unwrap();
        assert!(is_close!(scalar("Y"), 0.97));
        assert!(is_close!(scalar("L"), 0.97 / 1.01));
        assert!(is_close!(scalar("employment"), 0.97 / 1.01 / 1.01));
        assert!(is_close!(scalar("omega"), 0.595 / 1.01));
        assert!(is_close!(scalar("pi"), 1.0 - 0.595 / 1.01));
        assert!(is_close!(scalar("phi0"), 0.11 / (1.0 - 0.0121)));
    }

    #[test]
    fn declared_inputs_are_dependencies() {
        let model = ModelBuilder::new(registry().unwrap()).build().unwrap();
        let position = model.position("Pi").unwrap();
        let dependencies: Vec<&str> = model
            .dependency_graph()
            .dependencies(position)
            .into_iter()
            .map(|i| model.registry().fields()[i].name())
            .collect();
        assert!(dependencies.contains(&"r"));
        assert!(dependencies.contains(&"D"));
    }

    #[test]
    fn income_is_shared_between_wages_and_profit() {
        let model = ModelBuilder::new(registry().unwrap()).build().unwrap();
        let config = RunConfig::new(20.0, 0.01)
            .with_scheme(Scheme::Rk4)
            .with_record_every(50);
        let outcome = Integrator::new(config).unwrap().run(&model, &preset()).unwrap();
        assert!(outcome.is_completed());

        let series = outcome.series;
        let omega = series.scalar("omega").unwrap();
        let pi = series.scalar("pi").unwrap();
        for (omega, pi) in omega.iter().zip(&pi) {
            assert!(is_close!(omega + pi, 1.0));
        }

        // Productivity grows exponentially at alpha
        let a = series.last("a").unwrap().as_scalar().unwrap();
        assert!(is_close!(a, 1.01 * (0.021f64 * 20.0).exp()));
        let employment = series.scalar("employment").unwrap();
        assert!(employment.iter().all(|&e| e > 0.0 && e < 1.0));
    }
}
