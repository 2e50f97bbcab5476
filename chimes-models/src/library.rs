//! Fields shared between models.

use chimes_core::expr::{pow, var};
use chimes_core::field::Field;
use chimes_core::registry::FieldRegistry;

/// Default sector label used until a model assigns its own
pub const MONO_SECTOR: &str = "MONO";

/// The base registry models are merged onto.
///
/// Every field carries a usable default so the library validates on its own.
pub fn library() -> FieldRegistry {
    FieldRegistry::new()
        .with_dimension("Nprod", [MONO_SECTOR])
        // Population
        .with_field(
            Field::parameter("N", 1.0)
                .with_comment("Population")
                .with_units("humans"),
        )
        .with_field(
            Field::parameter("beta", 0.025)
                .with_comment("Rate of population growth")
                .with_units("y^-1"),
        )
        // Productivity
        .with_field(
            Field::parameter("a", 1.0)
                .with_comment("Labour productivity")
                .with_units("units.humans^-1.y^-1"),
        )
        .with_field(
            Field::parameter("alpha", 0.02)
                .with_comment("Rate of productivity increase")
                .with_units("y^-1"),
        )
        // Capital
        .with_field(
            Field::parameter("delta", 0.005)
                .with_comment("Rate of capital depletion")
                .with_units("y^-1"),
        )
        .with_field(Field::parameter("nu", 3.0).with_comment("Capital to output ratio"))
        .with_field(
            Field::parameter("K", 2.7)
                .with_comment("Productive capital")
                .with_units("units"),
        )
        // Wage negotiation
        .with_field(
            Field::parameter("phinull", 0.04)
                .with_comment("Unemployment rate with no salary increase"),
        )
        .with_field(Field::statevar(
            "phi0",
            var("phinull") / (1.0 - pow(var("phinull"), 2.0)),
        ))
        .with_field(Field::statevar(
            "phi1",
            pow(var("phinull"), 3.0) / (1.0 - pow(var("phinull"), 2.0)),
        ))
        // Investment
        .with_field(
            Field::parameter("k0", -0.0065)
                .with_comment("Share of GDP invested when profit is zero"),
        )
        .with_field(Field::parameter("k1", (-5.0f64).exp()).with_comment("Investment slope"))
        .with_field(Field::parameter("k2", 20.0).with_comment("Investment power in kappa"))
        // Debt
        .with_field(
            Field::parameter("r", 0.03)
                .with_comment("Interest rate at the bank")
                .with_units("y^-1"),
        )
        .with_field(
            Field::parameter("D", 0.1)
                .with_comment("Private debt")
                .with_units("dollars"),
        )
        .with_field(Field::parameter("d", 0.1).with_comment("Relative debt"))
        // Prices
        .with_field(Field::parameter("mu", 2.0).with_comment("Markup on prices"))
        .with_field(
            Field::parameter("eta", 1.0)
                .with_comment("Rate of price adjustment")
                .with_units("y^-1"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimes_core::model::ModelBuilder;
    use chimes_core::preset::Preset;
    use is_close::is_close;

    #[test]
    fn validates_on_its_own() {
        let registry = library();
        registry.validate().unwrap();
        assert_eq!(registry.dimension("Nprod").unwrap().labels, vec!["MONO"]);
        assert_eq!(
            registry.get("alpha").unwrap().metadata().units.as_deref(),
            Some("y^-1")
        );
    }

    #[test]
    fn phillips_coefficients() {
        let model = ModelBuilder::new(library()).build().unwrap();
        assert_eq!(model.statevar_order(), vec!["phi0", "phi1"]);

        let state = model.instantiate(&Preset::new()).unwrap();
        let phi0 = state.get(&model, "phi0").unwrap().as_scalar().unwrap();
        let phi1 = state.get(&model, "phi1").unwrap().as_scalar().unwrap();
        assert!(is_close!(phi0, 0.04 / (1.0 - 0.0016)));
        assert!(is_close!(phi1, 0.000064 / (1.0 - 0.0016)));
    }
}
