//! Extraction of the inputs an evaluator depends on.
//!
//! Evaluators declare their inputs as data, so this runs once per field while a model is
//! built and never while stepping.

use crate::errors::{ChimesError, ChimesResult};
use crate::field::{Evaluator, Input};
use crate::registry::FieldRegistry;

/// Where the value of an input comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSource {
    /// Read from the field at this position in the registry
    Field(usize),
    /// An optional input with no field of that name
    Fallback(f64),
}

/// The names of the fields an evaluator depends on, in declaration order.
///
/// Optional inputs are only included when the registry has a field of that name.
/// Required inputs are always included, even when they dangle.
pub fn inputs_of<'e>(evaluator: &'e Evaluator, registry: &FieldRegistry) -> Vec<&'e str> {
    evaluator
        .inputs()
        .iter()
        .filter(|input| !input.is_optional() || registry.contains(&input.name))
        .map(|input| input.name.as_str())
        .collect()
}

/// Resolve an input of `field` against the registry.
pub fn resolve_input(
    field: &str,
    input: &Input,
    registry: &FieldRegistry,
) -> ChimesResult<InputSource> {
    match (registry.position(&input.name), input.fallback) {
        (Some(index), _) => Ok(InputSource::Field(index)),
        (None, Some(fallback)) => Ok(InputSource::Fallback(fallback)),
        (None, None) => Err(ChimesError::definition(
            field,
            format!("input '{}' is not a field of the model", input.name),
        )),
    }
}
