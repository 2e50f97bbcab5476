//! Composition of models from a base registry and overlays.
//!
//! A field is atomic: an overlay replaces it whole, never partially. Merging never mutates its
//! inputs; the merged registry is a new value, validated before it is returned.

use crate::errors::{ChimesError, ChimesResult};
use crate::field::{Field, FieldSpec};
use crate::registry::{Dimension, FieldRegistry};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// Add the field, or replace the field of the same name
    Upsert(Field),
    Remove(String),
}

/// A set of changes applied to a base registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OverlaySpec", into = "OverlaySpec")]
pub struct Overlay {
    changes: Vec<FieldChange>,
    dimensions: Vec<Dimension>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.changes.push(FieldChange::Upsert(field));
        self
    }

    pub fn without_field(mut self, name: impl Into<String>) -> Self {
        self.changes.push(FieldChange::Remove(name.into()));
        self
    }

    pub fn with_dimension<I, S>(mut self, tag: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.push(Dimension::new(tag, labels));
        self
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.dimensions.is_empty()
    }
}

impl From<FieldRegistry> for Overlay {
    /// Every field of the registry becomes an upsert.
    fn from(registry: FieldRegistry) -> Self {
        Overlay {
            dimensions: registry.dimensions().to_vec(),
            changes: registry
                .fields()
                .iter()
                .cloned()
                .map(FieldChange::Upsert)
                .collect(),
        }
    }
}

/// Data-level form of an overlay. Upserts are applied before removals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl TryFrom<OverlaySpec> for Overlay {
    type Error = ChimesError;

    fn try_from(spec: OverlaySpec) -> ChimesResult<Self> {
        let mut changes = spec
            .fields
            .into_iter()
            .map(|spec| Field::try_from(spec).map(FieldChange::Upsert))
            .collect::<ChimesResult<Vec<_>>>()?;
        changes.extend(spec.remove.into_iter().map(FieldChange::Remove));
        Ok(Overlay {
            changes,
            dimensions: spec.dimensions,
        })
    }
}

impl From<Overlay> for OverlaySpec {
    fn from(overlay: Overlay) -> Self {
        let mut spec = OverlaySpec {
            dimensions: overlay.dimensions,
            ..Default::default()
        };
        for change in overlay.changes {
            match change {
                FieldChange::Upsert(field) => spec.fields.push(FieldSpec::from(field)),
                FieldChange::Remove(name) => spec.remove.push(name),
            }
        }
        spec
    }
}

/// Apply `overlay` to `base`, producing a new registry.
///
/// Fields only in `base` are kept unchanged and in place, replaced fields keep the position of
/// the field they replace and new fields are appended in overlay order. Fails if a removal
/// names an unknown field, or if the result has a required input with no field.
pub fn merge(base: &FieldRegistry, overlay: &Overlay) -> ChimesResult<FieldRegistry> {
    let mut merged = base.clone();
    let (mut added, mut replaced, mut removed) = (0, 0, 0);

    for dimension in &overlay.dimensions {
        merged.set_dimension(dimension.clone());
    }
    for change in &overlay.changes {
        match change {
            FieldChange::Upsert(field) => match merged.upsert(field.clone()) {
                Some(_) => replaced += 1,
                None => added += 1,
            },
            FieldChange::Remove(name) => {
                merged.remove(name).ok_or_else(|| {
                    ChimesError::definition(name, "cannot remove a field which does not exist")
                })?;
                removed += 1;
            }
        }
    }

    merged.validate()?;
    debug!(
        "Merged overlay: {} added, {} replaced, {} removed, {} fields in total",
        added,
        replaced,
        removed,
        merged.len()
    );
    Ok(merged)
}

/// Apply overlays one after another, left to right.
///
/// Every intermediate registry must itself be valid.
pub fn merge_all<'a, I>(base: &FieldRegistry, overlays: I) -> ChimesResult<FieldRegistry>
where
    I: IntoIterator<Item = &'a Overlay>,
{
    overlays
        .into_iter()
        .try_fold(base.clone(), |merged, overlay| merge(&merged, overlay))
}
