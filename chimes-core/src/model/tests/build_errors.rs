//! Each stage of the build pipeline rejects bad definitions with its own error.

use crate::errors::ChimesError;
use crate::expr::{sum_axis, var};
use crate::field::{Evaluator, Field};
use crate::merge::Overlay;
use crate::model::ModelBuilder;
use crate::registry::FieldRegistry;

fn base() -> FieldRegistry {
    FieldRegistry::new()
        .with_dimension("Nprod", ["MONO"])
        .with_field(Field::parameter("a", 1.0))
        .with_field(Field::parameter("b", 2.0))
        .with_field(Field::statevar("Y", var("a") + var("b")))
}

#[test]
fn dangling_input() {
    let registry = base().with_field(Field::statevar("Z", var("Y") * var("typo")));
    let err = ModelBuilder::new(registry).build().unwrap_err();
    assert!(matches!(err, ChimesError::Definition { ref field, .. } if field == "Z"));
    assert!(err.is_build_error());
}

#[test]
fn dangling_input_from_overlay() {
    let err = ModelBuilder::new(base())
        .with_overlay(Overlay::new().without_field("a"))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChimesError::Definition { ref field, .. } if field == "Y"));
}

#[test]
fn undeclared_variable() {
    let registry = base().with_field(Field::statevar(
        "Z",
        Evaluator::with_inputs(var("a") * var("b"), ["a"]),
    ));
    assert!(matches!(
        ModelBuilder::new(registry).build(),
        Err(ChimesError::Definition { .. })
    ));
}

#[test]
fn cyclic_statevars() {
    let registry = base()
        .with_field(Field::statevar("P", var("Q") + var("Y")))
        .with_field(Field::statevar("Q", var("P") * 0.5));
    match ModelBuilder::new(registry).build().unwrap_err() {
        ChimesError::CyclicDependency { fields } => assert_eq!(fields, vec!["P", "Q", "P"]),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn shape_mismatch() {
    let registry = base()
        .with_field(Field::parameter("M", 0.1).with_size(["Nprod", "Nprod"]))
        .with_field(Field::statevar("s", var("M") * var("a")));
    let err = ModelBuilder::new(registry.clone()).build().unwrap_err();
    assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "s"));

    // An explicit reduction fixes it
    let registry = registry.with_field(Field::statevar(
        "s",
        sum_axis(sum_axis(var("M"), 1), 0) * var("a"),
    ));
    assert!(ModelBuilder::new(registry).build().is_ok());
}

#[test]
fn unknown_dimension_tag() {
    let registry = base().with_field(Field::parameter("p", 1.0).with_size(["Nregion"]));
    let err = ModelBuilder::new(registry.clone()).build().unwrap_err();
    assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "p"));

    let model = ModelBuilder::new(registry)
        .with_sectors("Nregion", ["north", "south"])
        .build()
        .unwrap();
    assert_eq!(model.sectors("Nregion").map(|s| s.len()), Some(2));
}

#[test]
fn misspelled_sector_tag() {
    let registry = base().with_field(Field::parameter("p", 1.0).with_size(["Nprod"]));
    let err = ModelBuilder::new(registry.clone())
        .with_sectors("Nprd", ["Consumption", "Capital"])
        .build()
        .unwrap_err();
    assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "Nprd"));
    assert!(err.is_build_error());

    let model = ModelBuilder::new(registry)
        .with_sectors("Nprod", ["Consumption", "Capital"])
        .build()
        .unwrap();
    assert_eq!(model.layout("p").unwrap().shape, crate::tensor::Shape::Vector(2));
}
