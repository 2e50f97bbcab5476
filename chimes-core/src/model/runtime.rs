//! The compiled model.

use crate::errors::{ChimesError, ChimesResult};
use crate::expr::Expr;
use crate::field::{Field, Kind};
use crate::graph::{DependencyGraph, FieldGraph};
use crate::preset::Preset;
use crate::registry::FieldRegistry;
use crate::shape::{FieldLayout, ResolvedShapes};
use crate::state::SimulationState;
use crate::tensor::Tensor;
use petgraph::dot::Dot;

/// A validated, compiled model.
///
/// Field values are addressed by registry position. A model never changes once built, so it
/// can be shared freely between concurrent simulations.
#[derive(Debug, Clone)]
pub struct Model {
    registry: FieldRegistry,
    shapes: ResolvedShapes,
    graph: DependencyGraph,
    programs: Vec<Option<Expr<usize>>>,
    differentials: Vec<usize>,
}

impl Model {
    pub(super) fn new(
        registry: FieldRegistry,
        shapes: ResolvedShapes,
        graph: DependencyGraph,
        programs: Vec<Option<Expr<usize>>>,
    ) -> Self {
        let differentials = registry
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.kind() == Kind::Differential)
            .map(|(i, _)| i)
            .collect();
        Self {
            registry,
            shapes,
            graph,
            programs,
            differentials,
        }
    }

    /// The merged registry the model was built from
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.registry.get(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.registry.position(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn layout(&self, name: &str) -> Option<&FieldLayout> {
        self.position(name).map(|i| &self.shapes.layouts[i])
    }

    pub(crate) fn layout_at(&self, position: usize) -> &FieldLayout {
        &self.shapes.layouts[position]
    }

    /// Sector labels of each axis of a field
    pub(crate) fn axis_labels(&self, position: usize) -> Vec<&[String]> {
        self.shapes.axis_labels(&self.shapes.layouts[position])
    }

    /// The sector labels a dimension tag resolved to.
    pub fn sectors(&self, tag: &str) -> Option<&[String]> {
        self.shapes.sectors.get(tag).map(Vec::as_slice)
    }

    /// Names of the statevars in the order they are evaluated
    pub fn statevar_order(&self) -> Vec<&str> {
        self.graph.order_names()
    }

    /// Names of the differential fields, in declaration order
    pub fn differentials(&self) -> Vec<&str> {
        self.differentials
            .iter()
            .map(|&i| self.registry.fields()[i].name())
            .collect()
    }

    pub(crate) fn differential_positions(&self) -> &[usize] {
        &self.differentials
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Create a diagram of the statevar dependencies
    ///
    /// Useful for debugging
    pub fn as_dot(&self) -> Dot<'_, &FieldGraph> {
        self.graph.as_dot()
    }

    /// Create the state at `t = 0` from a preset. See [`SimulationState::new`].
    pub fn instantiate(&self, preset: &Preset) -> ChimesResult<SimulationState> {
        SimulationState::new(self, preset, 0.0)
    }

    /// Evaluate the compiled evaluator of the field at `position` against `values`.
    ///
    /// Scalar results are broadcast to the shape of the field.
    fn evaluate(&self, position: usize, values: &[Tensor]) -> ChimesResult<Tensor> {
        let name = self.registry.fields()[position].name();
        let program = self.programs[position]
            .as_ref()
            .ok_or_else(|| ChimesError::definition(name, "field has no evaluator"))?;
        let shape = self.shapes.layouts[position].shape;
        let value = program
            .evaluate(&|slot: &usize| values.get(*slot))
            .map_err(|reason| ChimesError::shape(name, reason))?;
        value.broadcast_to(shape).ok_or_else(|| {
            ChimesError::shape(
                name,
                format!("evaluated to {} but the field is {}", value.shape(), shape),
            )
        })
    }

    /// Recompute every statevar in evaluation order, in place.
    pub(crate) fn evaluate_statevars(&self, values: &mut [Tensor]) -> ChimesResult<()> {
        for &position in self.graph.order() {
            let value = self.evaluate(position, values)?;
            values[position] = value;
        }
        Ok(())
    }

    /// The rate of change of every differential field, in declaration order.
    ///
    /// `values` must be a complete state with every statevar evaluated.
    pub(crate) fn derivatives(&self, values: &[Tensor]) -> ChimesResult<Vec<Tensor>> {
        self.differentials
            .iter()
            .map(|&position| self.evaluate(position, values))
            .collect()
    }
}
