//! The field registry: the complete, ordered set of fields that define a model.
//!
//! Declaration order is significant. It breaks ties in the statevar evaluation order, so the
//! registry keeps fields in a `Vec` and indexes them by name.

use crate::dependency::resolve_input;
use crate::errors::{ChimesError, ChimesResult};
use crate::field::{Field, FieldSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A dimension tag and the sector labels it resolves to unless a model build overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub tag: String,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Dimension {
    pub fn new<I, S>(tag: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            comment: None,
        }
    }
}

/// Data-level form of a registry, as found in a definition file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySpec {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegistrySpec", into = "RegistrySpec")]
pub struct FieldRegistry {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    dimensions: Vec<Dimension>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any existing field of the same name in place.
    pub fn with_field(mut self, field: Field) -> Self {
        self.upsert(field);
        self
    }

    /// Declare the default sector labels of a dimension tag, replacing earlier declarations.
    pub fn with_dimension<I, S>(mut self, tag: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_dimension(Dimension::new(tag, labels));
        self
    }

    /// Insert or replace a field. Returns the replaced field, if any.
    ///
    /// A replaced field keeps its position in the declaration order.
    pub fn upsert(&mut self, field: Field) -> Option<Field> {
        match self.index.get(field.name()) {
            Some(&i) => Some(std::mem::replace(&mut self.fields[i], field)),
            None => {
                self.index.insert(field.name().to_string(), self.fields.len());
                self.fields.push(field);
                None
            }
        }
    }

    /// Remove a field, shifting later fields up by one position.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let i = self.index.remove(name)?;
        let field = self.fields.remove(i);
        for position in self.index.values_mut() {
            if *position > i {
                *position -= 1;
            }
        }
        Some(field)
    }

    pub fn set_dimension(&mut self, dimension: Dimension) {
        match self.dimensions.iter_mut().find(|d| d.tag == dimension.tag) {
            Some(existing) => *existing = dimension,
            None => self.dimensions.push(dimension),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a field in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, tag: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.tag == tag)
    }

    /// Check every field definition and that every required input names a field.
    pub fn validate(&self) -> ChimesResult<()> {
        for field in &self.fields {
            field.validate()?;
            if let Some(evaluator) = field.evaluator() {
                for input in evaluator.inputs() {
                    resolve_input(field.name(), input, self)?;
                }
            }
        }
        Ok(())
    }

    /// Read and validate a registry from a TOML definition.
    ///
    /// ```toml
    /// [[dimensions]]
    /// tag = "Nprod"
    /// labels = ["MONO"]
    ///
    /// [[fields]]
    /// name = "r"
    /// kind = "parameter"
    /// value = 0.03
    /// ```
    pub fn from_toml_str(text: &str) -> ChimesResult<Self> {
        let spec: RegistrySpec = toml::from_str(text)?;
        let registry = FieldRegistry::try_from(spec)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn to_toml_string(&self) -> ChimesResult<String> {
        toml::to_string(&RegistrySpec::from(self.clone()))
            .map_err(|e| ChimesError::Config(e.to_string()))
    }
}

impl TryFrom<RegistrySpec> for FieldRegistry {
    type Error = ChimesError;

    /// Converts every field definition. Duplicate names are rejected; dangling inputs are
    /// left to [`FieldRegistry::validate`] so that partial registries can be merged.
    fn try_from(spec: RegistrySpec) -> ChimesResult<Self> {
        let mut registry = FieldRegistry::new();
        for dimension in spec.dimensions {
            registry.set_dimension(dimension);
        }
        for field_spec in spec.fields {
            let field = Field::try_from(field_spec)?;
            if registry.contains(field.name()) {
                return Err(ChimesError::definition(
                    field.name(),
                    "field is defined more than once",
                ));
            }
            registry.upsert(field);
        }
        Ok(registry)
    }
}

impl From<FieldRegistry> for RegistrySpec {
    fn from(registry: FieldRegistry) -> Self {
        RegistrySpec {
            dimensions: registry.dimensions,
            fields: registry.fields.into_iter().map(FieldSpec::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::var;
    use crate::field::{Evaluator, Kind};

    fn registry() -> FieldRegistry {
        FieldRegistry::new()
            .with_dimension("Nprod", ["MONO"])
            .with_field(Field::parameter("r", 0.1))
            .with_field(Field::differential("X", var("r") * var("X"), 1.0))
            .with_field(Field::statevar("Y", var("X") * 2.0))
    }

    #[test]
    fn declaration_order() {
        let registry = registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["r", "X", "Y"]);
        assert_eq!(registry.position("Y"), Some(2));
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn upsert_keeps_position() {
        let mut registry = registry();
        let replaced = registry.upsert(Field::parameter("X", 2.0));
        assert_eq!(replaced.map(|f| f.kind()), Some(Kind::Differential));
        assert_eq!(registry.position("X"), Some(1));
        assert_eq!(registry.get("X").unwrap().kind(), Kind::Parameter);
    }

    #[test]
    fn remove_reindexes() {
        let mut registry = registry();
        assert!(registry.remove("r").is_some());
        assert_eq!(registry.position("X"), Some(0));
        assert_eq!(registry.position("Y"), Some(1));
        assert!(registry.remove("r").is_none());

        // X now reads a field which no longer exists
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, ChimesError::Definition { ref field, .. } if field == "X"));
    }

    #[test]
    fn optional_inputs_do_not_dangle() {
        let registry = registry().with_field(Field::statevar(
            "Z",
            Evaluator::parse("Y - tax").unwrap().with_optional("tax", 0.0),
        ));
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn dimensions_are_replaced() {
        let registry = registry().with_dimension("Nprod", ["agri", "industry"]);
        assert_eq!(registry.dimensions().len(), 1);
        assert_eq!(registry.dimension("Nprod").unwrap().labels.len(), 2);
    }

    #[test]
    fn load_from_toml() {
        let registry = FieldRegistry::from_toml_str(
            r#"
            [[dimensions]]
            tag = "Nprod"
            labels = ["MONO"]

            [[fields]]
            name = "r"
            kind = "parameter"
            value = 0.1
            units = "y^{-1}"

            [[fields]]
            name = "X"
            kind = "differential"
            func = "r * X"
            initial = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("r").unwrap().metadata().units.as_deref(), Some("y^{-1}"));
        assert_eq!(
            registry.get("X").unwrap().evaluator().unwrap().expr(),
            &(var("r") * var("X"))
        );
    }

    #[test]
    fn toml_errors() {
        let duplicate = r#"
            [[fields]]
            name = "r"
            kind = "parameter"
            value = 0.1

            [[fields]]
            name = "r"
            kind = "parameter"
            value = 0.2
            "#;
        assert!(matches!(
            FieldRegistry::from_toml_str(duplicate),
            Err(ChimesError::Definition { .. })
        ));

        let dangling = r#"
            [[fields]]
            name = "Y"
            kind = "statevar"
            func = "a + b"
            "#;
        assert!(matches!(
            FieldRegistry::from_toml_str(dangling),
            Err(ChimesError::Definition { .. })
        ));

        let unknown_kind = r#"
            [[fields]]
            name = "Y"
            kind = "algebraic"
            "#;
        assert!(matches!(
            FieldRegistry::from_toml_str(unknown_kind),
            Err(ChimesError::Config(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let registry = registry();
        let text = registry.to_toml_string().unwrap();
        let back = FieldRegistry::from_toml_str(&text).unwrap();
        assert_eq!(back, registry);
    }
}
