//! Resolution of symbolic field sizes into concrete shapes.
//!
//! A field's `size` lists dimension tags. Each tag resolves to the number of sectors assigned
//! to it: no tags is a scalar, one tag a vector and two tags a matrix whose first axis is the
//! row sector and second axis the column sector.

use crate::dependency::{resolve_input, InputSource};
use crate::errors::{ChimesError, ChimesResult};
use crate::registry::FieldRegistry;
use crate::tensor::Shape;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sector labels per dimension tag, e.g. `Nprod -> ["agri", "industry"]`.
///
/// Tags given here override the default labels declared by the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorAssignment {
    sectors: BTreeMap<String, Vec<String>>,
}

impl SectorAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sectors<I, S>(mut self, tag: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(tag, labels);
        self
    }

    pub fn set<I, S>(&mut self, tag: impl Into<String>, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors
            .insert(tag.into(), labels.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.sectors.get(tag).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sectors
            .iter()
            .map(|(tag, labels)| (tag.as_str(), labels.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

/// The resolved shape of a field and the dimension tag of each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub shape: Shape,
    /// Dimension tag of each axis.
    ///
    /// Tags only name the axes. Elementwise operations compare lengths, so an `[Nprod]` vector
    /// combines with an `[Nregion]` vector whenever both tags resolve to the same number of
    /// sectors.
    pub dims: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShapes {
    /// One layout per field, in registry order
    pub layouts: Vec<FieldLayout>,
    /// The effective sector labels of every known tag
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl ResolvedShapes {
    /// Sector labels of each axis of a layout.
    pub fn axis_labels(&self, layout: &FieldLayout) -> Vec<&[String]> {
        layout
            .dims
            .iter()
            .filter_map(|tag| self.sectors.get(tag).map(Vec::as_slice))
            .collect()
    }
}

fn check_labels(tag: &str, labels: &[String]) -> Result<usize, String> {
    if labels.is_empty() {
        return Err(format!("dimension '{}' has no sectors", tag));
    }
    for (i, label) in labels.iter().enumerate() {
        if labels[..i].contains(label) {
            return Err(format!(
                "dimension '{}' lists sector '{}' more than once",
                tag, label
            ));
        }
    }
    Ok(labels.len())
}

/// Resolve the shape of every field and check each evaluator against the declared shape.
///
/// An evaluator may produce exactly the declared shape, or a scalar which is broadcast.
/// Optional inputs that fall back to a constant count as scalars.
pub fn resolve_shapes(
    registry: &FieldRegistry,
    assignment: &SectorAssignment,
) -> ChimesResult<ResolvedShapes> {
    let mut sectors: BTreeMap<String, Vec<String>> = registry
        .dimensions()
        .iter()
        .map(|d| (d.tag.clone(), d.labels.clone()))
        .collect();
    for (tag, labels) in assignment.iter() {
        let known = sectors.contains_key(tag)
            || registry
                .fields()
                .iter()
                .any(|field| field.size().iter().any(|t| t == tag));
        if !known {
            return Err(ChimesError::shape(
                tag,
                format!(
                    "sectors assigned to dimension '{}' which no field or dimension declares",
                    tag
                ),
            ));
        }
        sectors.insert(tag.to_string(), labels.to_vec());
    }

    let mut layouts = Vec::with_capacity(registry.len());
    for field in registry.fields() {
        let mut lengths = vec![];
        for tag in field.size() {
            let labels = sectors.get(tag).ok_or_else(|| {
                ChimesError::shape(field.name(), format!("unknown dimension tag '{}'", tag))
            })?;
            let n = check_labels(tag, labels).map_err(|e| ChimesError::shape(field.name(), e))?;
            lengths.push(n);
        }
        let shape = match lengths.as_slice() {
            [] => Shape::Scalar,
            [n] => Shape::Vector(*n),
            [rows, cols] => Shape::Matrix(*rows, *cols),
            _ => {
                return Err(ChimesError::shape(
                    field.name(),
                    format!(
                        "at most two dimension tags are supported, got {:?}",
                        field.size()
                    ),
                ))
            }
        };
        layouts.push(FieldLayout {
            shape,
            dims: field.size().to_vec(),
        });
    }

    for (field, layout) in registry.fields().iter().zip(&layouts) {
        let evaluator = match field.evaluator() {
            Some(evaluator) => evaluator,
            None => continue,
        };
        let shape_of = |name: &String| -> Option<Shape> {
            let input = evaluator.input(name)?;
            match resolve_input(field.name(), input, registry).ok()? {
                InputSource::Field(j) => Some(layouts[j].shape),
                InputSource::Fallback(_) => Some(Shape::Scalar),
            }
        };
        let produced = evaluator
            .expr()
            .infer_shape(&shape_of)
            .map_err(|reason| ChimesError::shape(field.name(), reason))?;
        if !layout.shape.accepts(produced) {
            return Err(ChimesError::shape(
                field.name(),
                format!(
                    "declared as {} but `{}` yields {}",
                    layout.shape,
                    evaluator.expr(),
                    produced
                ),
            ));
        }
    }

    debug!(
        "Resolved shapes: {:?}",
        registry
            .names()
            .zip(&layouts)
            .filter(|(_, layout)| layout.shape != Shape::Scalar)
            .map(|(name, layout)| format!("{}: {}", name, layout.shape))
            .collect::<Vec<_>>()
    );
    Ok(ResolvedShapes { layouts, sectors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{matmul, sum_axis, transpose, var};
    use crate::field::{Evaluator, Field};

    fn registry() -> FieldRegistry {
        FieldRegistry::new()
            .with_dimension("Nprod", ["MONO"])
            .with_field(Field::parameter("a", 1.0))
            .with_field(Field::parameter("p", 1.0).with_size(["Nprod"]))
            .with_field(Field::parameter("Gamma", 0.1).with_size(["Nprod", "Nprod"]))
    }

    fn shape_of(shapes: &ResolvedShapes, registry: &FieldRegistry, name: &str) -> Shape {
        shapes.layouts[registry.position(name).unwrap()].shape
    }

    #[test]
    fn defaults_and_overrides() {
        let registry = registry();
        let shapes = resolve_shapes(&registry, &SectorAssignment::new()).unwrap();
        assert_eq!(shape_of(&shapes, &registry, "a"), Shape::Scalar);
        assert_eq!(shape_of(&shapes, &registry, "p"), Shape::Vector(1));
        assert_eq!(shape_of(&shapes, &registry, "Gamma"), Shape::Matrix(1, 1));

        let assignment =
            SectorAssignment::new().with_sectors("Nprod", ["agri", "industry", "services"]);
        let shapes = resolve_shapes(&registry, &assignment).unwrap();
        assert_eq!(shape_of(&shapes, &registry, "p"), Shape::Vector(3));
        assert_eq!(shape_of(&shapes, &registry, "Gamma"), Shape::Matrix(3, 3));
        let layout = &shapes.layouts[2];
        assert_eq!(shapes.axis_labels(layout).len(), 2);
        assert_eq!(shapes.axis_labels(layout)[1][2], "services");
    }

    #[test]
    fn bad_dimensions() {
        let unknown = registry().with_field(Field::parameter("q", 1.0).with_size(["Nregion"]));
        let err = resolve_shapes(&unknown, &SectorAssignment::new()).unwrap_err();
        assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "q"));

        let empty = SectorAssignment::new().with_sectors("Nprod", Vec::<String>::new());
        assert!(resolve_shapes(&registry(), &empty).is_err());

        let duplicated = SectorAssignment::new().with_sectors("Nprod", ["agri", "agri"]);
        let err = resolve_shapes(&registry(), &duplicated).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let cube = registry()
            .with_field(Field::parameter("T", 1.0).with_size(["Nprod", "Nprod", "Nprod"]));
        assert!(resolve_shapes(&cube, &SectorAssignment::new()).is_err());
    }

    #[test]
    fn evaluators_must_fit() {
        let assignment = SectorAssignment::new().with_sectors("Nprod", ["agri", "industry"]);

        let ok = registry()
            .with_field(
                Field::statevar("demand", matmul(var("Gamma"), var("p"))).with_size(["Nprod"]),
            )
            .with_field(Field::statevar("total", sum_axis(var("p"), 0)))
            .with_field(
                Field::statevar("flows", var("Gamma") * transpose(var("p")))
                    .with_size(["Nprod", "Nprod"]),
            )
            .with_field(Field::statevar("uniform", var("a") * 2.0).with_size(["Nprod"]));
        assert!(resolve_shapes(&ok, &assignment).is_ok());

        // A matrix cannot feed a scalar field without a reduction
        let bad = registry().with_field(Field::statevar("x", var("Gamma") * var("a")));
        let err = resolve_shapes(&bad, &assignment).unwrap_err();
        assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "x"));

        let bad = registry()
            .with_field(Field::statevar("x", var("Gamma") + var("a")).with_size(["Nprod"]));
        assert!(resolve_shapes(&bad, &assignment).is_err());
    }

    #[test]
    fn assignment_must_name_a_used_tag() {
        let typo = SectorAssignment::new().with_sectors("Nprd", ["agri", "industry"]);
        let err = resolve_shapes(&registry(), &typo).unwrap_err();
        assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "Nprd"));

        // Tags used only in a field's size can be assigned without a dimension declaration
        let regions = registry().with_field(Field::parameter("q", 1.0).with_size(["Nregion"]));
        let assignment = SectorAssignment::new().with_sectors("Nregion", ["north", "south"]);
        let shapes = resolve_shapes(&regions, &assignment).unwrap();
        assert_eq!(shape_of(&shapes, &regions, "q"), Shape::Vector(2));
    }

    #[test]
    fn axes_of_equal_length_combine() {
        let registry = registry()
            .with_dimension("Nregion", ["north", "south"])
            .with_field(Field::parameter("q", 1.0).with_size(["Nregion"]))
            .with_field(Field::statevar("mixed", var("p") * var("q")).with_size(["Nprod"]));

        let assignment = SectorAssignment::new().with_sectors("Nprod", ["agri", "industry"]);
        let shapes = resolve_shapes(&registry, &assignment).unwrap();
        assert_eq!(shape_of(&shapes, &registry, "mixed"), Shape::Vector(2));

        let assignment =
            SectorAssignment::new().with_sectors("Nprod", ["agri", "industry", "services"]);
        let err = resolve_shapes(&registry, &assignment).unwrap_err();
        assert!(matches!(err, ChimesError::Shape { ref field, .. } if field == "mixed"));
    }

    #[test]
    fn fallbacks_are_scalars() {
        let registry = registry().with_field(
            Field::statevar(
                "x",
                Evaluator::parse("p * scale").unwrap().with_optional("scale", 1.0),
            )
            .with_size(["Nprod"]),
        );
        assert!(resolve_shapes(&registry, &SectorAssignment::new()).is_ok());
    }
}
