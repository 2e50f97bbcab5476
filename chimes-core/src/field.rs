//! Fields, the atomic unit of a model.
//!
//! A field is exactly one of:
//! - a *differential* field: persisted state advanced by integrating its rate of change,
//! - a *statevar*: recomputed from other fields every time it is needed,
//! - a *parameter*: a constant.
//!
//! [`FieldKind`] makes other combinations unrepresentable in Rust code. Definitions read as
//! data go through [`FieldSpec`], where a bad combination is reported as a
//! [`ChimesError::Definition`].

use crate::errors::{ChimesError, ChimesResult};
use crate::expr::Expr;
use crate::preset::PresetValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named value read by an evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub name: String,
    /// Value used when the registry has no field called `name`.
    ///
    /// Inputs without a fallback must be provided by some field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<f64>,
}

impl Input {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fallback: None,
        }
    }

    pub fn optional(name: impl Into<String>, fallback: f64) -> Self {
        Self {
            name: name.into(),
            fallback: Some(fallback),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.fallback.is_some()
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::required(value)
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::required(value)
    }
}

/// An expression together with the ordered list of inputs it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    expr: Expr,
    inputs: Vec<Input>,
}

impl Evaluator {
    /// Create an evaluator whose inputs are the variables of `expr` in order of first use.
    pub fn new(expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        let inputs = expr
            .variables()
            .into_iter()
            .map(|name| Input::required(name.as_str()))
            .collect();
        Self { expr, inputs }
    }

    /// Create an evaluator with an explicit input declaration.
    ///
    /// Declared inputs which the expression does not use are kept as dependencies.
    pub fn with_inputs<I>(expr: impl Into<Expr>, inputs: impl IntoIterator<Item = I>) -> Self
    where
        I: Into<Input>,
    {
        Self {
            expr: expr.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the expression from text. See [`crate::expr`] for the grammar.
    pub fn parse(text: &str) -> ChimesResult<Self> {
        Ok(Self::new(text.parse::<Expr>()?))
    }

    /// Mark `name` as optional, resolving to `fallback` when no field provides it.
    ///
    /// The input is appended if it was not declared yet.
    pub fn with_optional(mut self, name: &str, fallback: f64) -> Self {
        match self.inputs.iter_mut().find(|input| input.name == name) {
            Some(input) => input.fallback = Some(fallback),
            None => self.inputs.push(Input::optional(name, fallback)),
        }
        self
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Checks that the declared inputs are unique and cover every variable of the expression.
    pub(crate) fn validate(&self, field: &str) -> ChimesResult<()> {
        for (i, input) in self.inputs.iter().enumerate() {
            if self.inputs[..i].iter().any(|other| other.name == input.name) {
                return Err(ChimesError::definition(
                    field,
                    format!("input '{}' is declared more than once", input.name),
                ));
            }
        }
        for name in self.expr.variables() {
            if self.input(name).is_none() {
                return Err(ChimesError::definition(
                    field,
                    format!(
                        "expression `{}` reads '{}' which is not a declared input",
                        self.expr, name
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl From<Expr> for Evaluator {
    fn from(value: Expr) -> Self {
        Evaluator::new(value)
    }
}

impl From<f64> for Evaluator {
    fn from(value: f64) -> Self {
        Evaluator::new(Expr::Constant(value))
    }
}

/// Classification of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Differential,
    Statevar,
    Parameter,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Differential => write!(f, "differential"),
            Kind::Statevar => write!(f, "statevar"),
            Kind::Parameter => write!(f, "parameter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Differential {
        /// Rate of change of the field
        derivative: Evaluator,
        initial: PresetValue,
    },
    Statevar {
        evaluator: Evaluator,
    },
    Parameter {
        value: PresetValue,
    },
}

/// Descriptive metadata. Not used by any computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(default, alias = "com", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub struct Field {
    name: String,
    kind: FieldKind,
    size: Vec<String>,
    metadata: FieldMetadata,
}

impl Field {
    pub fn differential(
        name: impl Into<String>,
        derivative: impl Into<Evaluator>,
        initial: impl Into<PresetValue>,
    ) -> Self {
        Self::with_kind(
            name,
            FieldKind::Differential {
                derivative: derivative.into(),
                initial: initial.into(),
            },
        )
    }

    pub fn statevar(name: impl Into<String>, evaluator: impl Into<Evaluator>) -> Self {
        Self::with_kind(
            name,
            FieldKind::Statevar {
                evaluator: evaluator.into(),
            },
        )
    }

    pub fn parameter(name: impl Into<String>, value: impl Into<PresetValue>) -> Self {
        Self::with_kind(
            name,
            FieldKind::Parameter {
                value: value.into(),
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: vec![],
            metadata: FieldMetadata::default(),
        }
    }

    /// Declare the dimension tags of the field, e.g. `["Nprod"]` for one value per sector.
    pub fn with_size<I, S>(mut self, size: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.size = size.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.metadata.comment = Some(comment.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.metadata.definition = Some(definition.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.metadata.units = Some(units.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.metadata.symbol = Some(symbol.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        match self.kind {
            FieldKind::Differential { .. } => Kind::Differential,
            FieldKind::Statevar { .. } => Kind::Statevar,
            FieldKind::Parameter { .. } => Kind::Parameter,
        }
    }

    pub fn field_kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The evaluator of a statevar, or the rate of change of a differential field.
    pub fn evaluator(&self) -> Option<&Evaluator> {
        match &self.kind {
            FieldKind::Differential { derivative, .. } => Some(derivative),
            FieldKind::Statevar { evaluator } => Some(evaluator),
            FieldKind::Parameter { .. } => None,
        }
    }

    /// The initial value of a differential field or the value of a parameter.
    pub fn default_value(&self) -> Option<&PresetValue> {
        match &self.kind {
            FieldKind::Differential { initial, .. } => Some(initial),
            FieldKind::Statevar { .. } => None,
            FieldKind::Parameter { value } => Some(value),
        }
    }

    pub fn size(&self) -> &[String] {
        &self.size
    }

    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    /// Checks the parts of a definition that do not depend on other fields.
    pub fn validate(&self) -> ChimesResult<()> {
        if !is_identifier(&self.name) {
            return Err(ChimesError::definition(
                &self.name,
                "field names must start with a letter or '_' and contain only letters, digits and '_'",
            ));
        }
        if let Some(evaluator) = self.evaluator() {
            evaluator.validate(&self.name)?;
        }
        Ok(())
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// An input declaration as written in a definition file: either a bare name or a table
/// with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSpec {
    Name(String),
    Full(Input),
}

impl From<InputSpec> for Input {
    fn from(value: InputSpec) -> Self {
        match value {
            InputSpec::Name(name) => Input::required(name),
            InputSpec::Full(input) => input,
        }
    }
}

impl From<Input> for InputSpec {
    fn from(value: Input) -> Self {
        match value.fallback {
            None => InputSpec::Name(value.name),
            Some(_) => InputSpec::Full(value),
        }
    }
}

/// Flat, data-level description of a field.
///
/// This is the shape a field takes in a definition file:
///
/// ```toml
/// [[fields]]
/// name = "K"
/// kind = "differential"
/// func = "Ir - delta * K"
/// initial = 2.7
/// size = ["Nprod"]
/// units = "units"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<InputSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PresetValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<PresetValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub size: Vec<String>,
    #[serde(flatten)]
    pub metadata: FieldMetadata,
}

impl FieldSpec {
    fn forbid<T>(&self, value: &Option<T>, key: &str) -> ChimesResult<()> {
        match value {
            Some(_) => Err(ChimesError::definition(
                &self.name,
                format!("a {} field cannot have '{}'", self.kind, key),
            )),
            None => Ok(()),
        }
    }

    fn require<'a, T>(&self, value: &'a Option<T>, key: &str) -> ChimesResult<&'a T> {
        value.as_ref().ok_or_else(|| {
            ChimesError::definition(
                &self.name,
                format!("a {} field requires '{}'", self.kind, key),
            )
        })
    }

    fn evaluator(&self) -> ChimesResult<Evaluator> {
        let text = self.require(&self.func, "func")?;
        let expr: Expr = text.parse()?;
        Ok(match &self.inputs {
            Some(inputs) => Evaluator::with_inputs(expr, inputs.iter().cloned()),
            None => Evaluator::new(expr),
        })
    }
}

impl TryFrom<FieldSpec> for Field {
    type Error = ChimesError;

    fn try_from(spec: FieldSpec) -> ChimesResult<Self> {
        let kind = match spec.kind {
            Kind::Differential => {
                spec.forbid(&spec.value, "value")?;
                FieldKind::Differential {
                    derivative: spec.evaluator()?,
                    initial: spec.require(&spec.initial, "initial")?.clone(),
                }
            }
            Kind::Statevar => {
                spec.forbid(&spec.value, "value")?;
                spec.forbid(&spec.initial, "initial")?;
                FieldKind::Statevar {
                    evaluator: spec.evaluator()?,
                }
            }
            Kind::Parameter => {
                spec.forbid(&spec.func, "func")?;
                spec.forbid(&spec.inputs, "inputs")?;
                spec.forbid(&spec.initial, "initial")?;
                FieldKind::Parameter {
                    value: spec.require(&spec.value, "value")?.clone(),
                }
            }
        };
        let field = Field {
            name: spec.name,
            kind,
            size: spec.size,
            metadata: spec.metadata,
        };
        field.validate()?;
        Ok(field)
    }
}

impl From<Field> for FieldSpec {
    fn from(field: Field) -> Self {
        // Inputs are only written out when they differ from what the expression implies.
        fn split(evaluator: Evaluator) -> (Option<String>, Option<Vec<InputSpec>>) {
            let implied = Evaluator::new(evaluator.expr.clone());
            let inputs = (implied.inputs != evaluator.inputs)
                .then(|| evaluator.inputs.into_iter().map(InputSpec::from).collect());
            (Some(evaluator.expr.to_string()), inputs)
        }

        let kind = field.kind();
        let ((func, inputs), value, initial) = match field.kind {
            FieldKind::Differential {
                derivative,
                initial,
            } => (split(derivative), None, Some(initial)),
            FieldKind::Statevar { evaluator } => (split(evaluator), None, None),
            FieldKind::Parameter { value } => ((None, None), Some(value), None),
        };
        FieldSpec {
            name: field.name,
            kind,
            func,
            inputs,
            value,
            initial,
            size: field.size,
            metadata: field.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::var;

    fn spec(kind: Kind) -> FieldSpec {
        FieldSpec {
            name: "X".to_string(),
            kind,
            func: None,
            inputs: None,
            value: None,
            initial: None,
            size: vec![],
            metadata: FieldMetadata::default(),
        }
    }

    #[test]
    fn evaluator_inputs_follow_expression() {
        let evaluator = Evaluator::new(var("w") * var("phillips") - var("w"));
        let names: Vec<_> = evaluator.inputs().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["w", "phillips"]);
    }

    #[test]
    fn explicit_inputs_keep_unused_names() {
        let evaluator = Evaluator::with_inputs(var("w") * var("phillips"), ["phillips", "w", "pi"]);
        assert!(evaluator.validate("w").is_ok());
        assert_eq!(evaluator.inputs().len(), 3);
    }

    #[test]
    fn undeclared_variable_is_rejected() {
        let evaluator = Evaluator::with_inputs(var("a") + var("b"), ["a"]);
        let err = evaluator.validate("Y").unwrap_err();
        assert!(matches!(err, ChimesError::Definition { ref field, .. } if field == "Y"));
    }

    #[test]
    fn duplicate_inputs_are_rejected() {
        let evaluator = Evaluator::with_inputs(var("a"), ["a", "a"]);
        assert!(evaluator.validate("Y").is_err());
    }

    #[test]
    fn optional_inputs() {
        let evaluator = Evaluator::parse("Pi - profit_tax")
            .unwrap()
            .with_optional("profit_tax", 0.0);
        assert!(evaluator.input("profit_tax").unwrap().is_optional());
        assert!(!evaluator.input("Pi").unwrap().is_optional());
    }

    #[test]
    fn invalid_names() {
        assert!(Field::parameter("a b", 1.0).validate().is_err());
        assert!(Field::parameter("1a", 1.0).validate().is_err());
        assert!(Field::parameter("", 1.0).validate().is_err());
        assert!(Field::parameter("_phi0", 1.0).validate().is_ok());
    }

    #[test]
    fn spec_combinations() {
        let mut statevar = spec(Kind::Statevar);
        statevar.func = Some("a + b".to_string());
        let field = Field::try_from(statevar.clone()).unwrap();
        assert_eq!(field.kind(), Kind::Statevar);

        statevar.value = Some(PresetValue::Scalar(1.0));
        assert!(matches!(
            Field::try_from(statevar),
            Err(ChimesError::Definition { .. })
        ));

        let mut differential = spec(Kind::Differential);
        differential.func = Some("r * X".to_string());
        assert!(Field::try_from(differential.clone()).is_err());
        differential.initial = Some(PresetValue::Scalar(1.0));
        assert!(Field::try_from(differential).is_ok());

        let mut parameter = spec(Kind::Parameter);
        assert!(Field::try_from(parameter.clone()).is_err());
        parameter.value = Some(PresetValue::Scalar(0.1));
        assert!(Field::try_from(parameter.clone()).is_ok());
        parameter.func = Some("1".to_string());
        assert!(Field::try_from(parameter).is_err());
    }

    #[test]
    fn bad_expression_in_spec() {
        let mut statevar = spec(Kind::Statevar);
        statevar.func = Some("a +".to_string());
        assert!(matches!(
            Field::try_from(statevar),
            Err(ChimesError::Parse { .. })
        ));
    }

    #[test]
    fn serde_round_trip() {
        let field = Field::differential(
            "K",
            Evaluator::parse("Ir - delta * K").unwrap(),
            2.7,
        )
        .with_size(["Nprod"])
        .with_units("units")
        .with_comment("depreciation proportional to capital");

        let json = serde_json::to_string(&field).unwrap();
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);

        let toml = toml::to_string(&field).unwrap();
        assert!(toml.contains("func = \"Ir - delta * K\""), "{}", toml);
        let back: Field = toml::from_str(&toml).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn serde_accepts_source_comment_key() {
        let json = r#"{"name": "a", "kind": "parameter", "value": 1.0, "com": "productivity"}"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.metadata().comment.as_deref(), Some("productivity"));
    }
}
