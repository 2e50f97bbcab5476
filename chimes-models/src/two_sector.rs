//! Input-output model over several productive sectors.
//!
//! Each sector owns capital, produces with a fixed capital to output ratio and buys
//! intermediate goods from the other sectors through the input-output matrix `Gamma`. Prices
//! follow a markup over unit costs. The sectors are labelled through the `Nprod` dimension and
//! default to a single sector.

use crate::library::MONO_SECTOR;
use chimes_core::config::{RunConfig, Scenario, Scheme};
use chimes_core::expr::{dot, ln, matmul, sum_axis, transpose, var};
use chimes_core::field::Field;
use chimes_core::preset::{Preset, PresetValue};
use chimes_core::registry::FieldRegistry;
use chimes_core::shape::SectorAssignment;
use std::collections::BTreeMap;

const SECTOR: [&str; 1] = ["Nprod"];
const SECTOR_PAIR: [&str; 2] = ["Nprod", "Nprod"];

pub fn registry() -> FieldRegistry {
    FieldRegistry::new()
        .with_dimension("Nprod", [MONO_SECTOR])
        .with_field(
            Field::parameter("Gamma", 0.1)
                .with_size(SECTOR_PAIR)
                .with_comment("Units of good j consumed to produce one unit of good i")
                .with_symbol("Γ"),
        )
        .with_field(
            Field::parameter("nu", 3.0)
                .with_size(SECTOR)
                .with_comment("Capital to output ratio"),
        )
        .with_field(Field::parameter("delta", 0.05).with_comment("Rate of capital depletion"))
        .with_field(Field::parameter("a", 1.0).with_comment("Labour productivity"))
        .with_field(Field::parameter("w", 0.5).with_comment("Nominal wage"))
        .with_field(Field::parameter("eta", 0.3).with_comment("Rate of price adjustment"))
        .with_field(Field::parameter("mu", 1.3).with_comment("Markup on unit costs"))
        .with_field(
            Field::parameter("kappa", 0.2).with_comment("Share of net output invested"),
        )
        .with_field(
            Field::differential("K", var("Ir") - var("delta") * var("K"), 2.7)
                .with_size(SECTOR)
                .with_comment("Capital per sector"),
        )
        .with_field(
            Field::differential("p", var("p") * var("inflation"), 1.0)
                .with_size(SECTOR)
                .with_comment("Price per sector"),
        )
        .with_field(
            Field::statevar("Y", var("K") / var("nu"))
                .with_size(SECTOR)
                .with_comment("Gross output"),
        )
        .with_field(
            Field::statevar("L", var("Y") / var("a"))
                .with_size(SECTOR)
                .with_comment("Workers per sector"),
        )
        .with_field(
            Field::statevar("intermediate", matmul(transpose(var("Gamma")), var("Y")))
                .with_size(SECTOR)
                .with_comment("Output consumed by other sectors"),
        )
        .with_field(
            Field::statevar("Ynet", var("Y") - var("intermediate"))
                .with_size(SECTOR)
                .with_comment("Output available for final demand"),
        )
        .with_field(
            Field::statevar("Mgamma", var("Gamma") * transpose(var("p")) / var("p"))
                .with_size(SECTOR_PAIR)
                .with_comment("Intermediate consumption per unit of output, in value"),
        )
        .with_field(
            Field::statevar("omega", var("w") * var("L") / (var("p") * var("Y")))
                .with_size(SECTOR)
                .with_comment("Wage share per sector"),
        )
        .with_field(
            Field::statevar("c", var("p") * (var("omega") + sum_axis(var("Mgamma"), 1)))
                .with_size(SECTOR)
                .with_comment("Unit cost of production"),
        )
        .with_field(
            Field::statevar(
                "inflation",
                var("eta") * ln(var("mu") * var("c") / var("p")),
            )
            .with_size(SECTOR),
        )
        .with_field(
            Field::statevar("Ir", var("kappa") * var("Ynet"))
                .with_size(SECTOR)
                .with_comment("Real investment per sector"),
        )
        .with_field(
            Field::statevar("GDP", dot(var("p"), var("Ynet"))).with_comment("Nominal net output"),
        )
        .with_field(
            Field::statevar("employment", sum_axis(var("L"), 0)).with_comment("Total workers"),
        )
}

/// Two sectors: food and industry.
pub fn sectors() -> SectorAssignment {
    SectorAssignment::new().with_sectors("Nprod", ["food", "industry"])
}

/// Default values for [`sectors`].
pub fn preset() -> Preset {
    let labelled = |food: f64, industry: f64| {
        PresetValue::Labelled(BTreeMap::from([
            ("food".to_string(), food),
            ("industry".to_string(), industry),
        ]))
    };
    Preset::new()
        .with_value("Gamma", [[0.1, 0.2], [0.15, 0.05]])
        .with_value("nu", labelled(3.0, 2.5))
        .with_value("K", [2.7, 2.7])
}

/// Fifty years with two sectors, retaining one point per year.
pub fn scenario() -> Scenario {
    Scenario {
        sectors: sectors(),
        preset: preset(),
        run: RunConfig::new(50.0, 0.01)
            .with_scheme(Scheme::Euler)
            .with_record_every(100),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimes_core::model::ModelBuilder;
    use chimes_core::tensor::{Shape, Tensor};
    use is_close::is_close;

    fn assert_all_close(actual: &Tensor, expected: &[f64]) {
        let actual = actual.to_vec();
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(is_close!(*a, *e), "{} != {}", a, e);
        }
    }

    #[test]
    fn single_sector_by_default() {
        let model = ModelBuilder::new(registry()).build().unwrap();
        assert_eq!(model.layout("Gamma").unwrap().shape, Shape::Matrix(1, 1));
        assert_eq!(model.layout("employment").unwrap().shape, Shape::Scalar);

        let state = model.instantiate(&Preset::new()).unwrap();
        assert_all_close(state.get(&model, "Y").unwrap(), &[0.9]);
        assert_all_close(state.get(&model, "Ynet").unwrap(), &[0.81]);
    }

    #[test]
    fn initial_state() {
        let model = scenario().build_model(registry()).unwrap();
        assert_eq!(model.layout("Mgamma").unwrap().shape, Shape::Matrix(2, 2));

        let state = model.instantiate(&preset()).unwrap();
        let get = |name: &str| state.get(&model, name).unwrap();
        assert_all_close(get("Y"), &[0.9, 1.08]);
        assert_all_close(get("intermediate"), &[0.252, 0.234]);
        assert_all_close(get("Ynet"), &[0.648, 0.846]);
        assert_all_close(get("Mgamma"), &[0.1, 0.2, 0.15, 0.05]);
        assert_all_close(get("c"), &[0.8, 0.7]);
        assert_all_close(
            get("inflation"),
            &[0.3 * (1.3f64 * 0.8).ln(), 0.3 * (1.3f64 * 0.7).ln()],
        );
        assert!(is_close!(get("GDP").as_scalar().unwrap(), 1.494));
        assert!(is_close!(get("employment").as_scalar().unwrap(), 1.98));
    }

    #[test]
    fn prices_settle() {
        let outcome = scenario().run(registry()).unwrap();
        assert!(outcome.is_completed());

        let series = outcome.series;
        assert_eq!(series.len(), 51);
        let inflation = series.last("inflation").unwrap().to_vec();
        assert!(inflation.iter().all(|x| x.abs() < 1e-4));

        // Food prices rise and industrial prices fall towards the markup equilibrium
        let prices = series.last("p").unwrap().to_vec();
        assert!(prices[0] > 1.0);
        assert!(prices[1] < 1.0);
    }
}
