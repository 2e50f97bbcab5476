//! Model builder for composing and validating models.

use crate::dependency::{resolve_input, InputSource};
use crate::errors::{ChimesError, ChimesResult};
use crate::expr::Expr;
use crate::graph::DependencyGraph;
use crate::merge::{merge_all, Overlay};
use crate::registry::FieldRegistry;
use crate::shape::{resolve_shapes, SectorAssignment};
use log::debug;

use super::runtime::Model;

/// Build a model from a base registry, a chain of overlays and a sector assignment.
///
/// The base registry is passed by value and never shared, so a model depends only on
/// what was given to its builder.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    base: FieldRegistry,
    overlays: Vec<Overlay>,
    sectors: SectorAssignment,
}

impl ModelBuilder {
    pub fn new(base: FieldRegistry) -> Self {
        Self {
            base,
            overlays: vec![],
            sectors: SectorAssignment::new(),
        }
    }

    /// Queue an overlay. Overlays are merged in the order they are added.
    pub fn with_overlay(&mut self, overlay: Overlay) -> &mut Self {
        self.overlays.push(overlay);
        self
    }

    /// Assign sector labels to a dimension tag, replacing the registry's defaults.
    pub fn with_sectors<I, S>(&mut self, tag: &str, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors.set(tag, labels);
        self
    }

    /// Assign the sector labels of every tag in `assignment`.
    pub fn with_sector_assignment(&mut self, assignment: &SectorAssignment) -> &mut Self {
        for (tag, labels) in assignment.iter() {
            self.sectors.set(tag, labels.iter().cloned());
        }
        self
    }

    /// Run the build pipeline.
    ///
    /// Fails with the error of the first stage that rejects the definition:
    /// `Definition` while merging, `Shape` while resolving shapes and `CyclicDependency`
    /// while ordering statevars.
    pub fn build(&self) -> ChimesResult<Model> {
        let registry = merge_all(&self.base, &self.overlays)?;
        registry.validate()?;
        let shapes = resolve_shapes(&registry, &self.sectors)?;
        let graph = DependencyGraph::build(&registry)?;
        let programs = compile(&registry)?;

        debug!(
            "Built model with {} fields ({} statevars)",
            registry.len(),
            graph.order().len()
        );
        Ok(Model::new(registry, shapes, graph, programs))
    }
}

/// Rewrite each evaluator to read its inputs by registry position.
///
/// Optional inputs with no field are replaced by their fallback constant.
fn compile(registry: &FieldRegistry) -> ChimesResult<Vec<Option<Expr<usize>>>> {
    registry
        .fields()
        .iter()
        .map(|field| -> ChimesResult<Option<Expr<usize>>> {
            let evaluator = match field.evaluator() {
                Some(evaluator) => evaluator,
                None => return Ok(None),
            };
            let mut slot = |name: &String| -> ChimesResult<Expr<usize>> {
                let input = evaluator.input(name).ok_or_else(|| {
                    ChimesError::definition(
                        field.name(),
                        format!("'{}' is not a declared input", name),
                    )
                })?;
                Ok(match resolve_input(field.name(), input, registry)? {
                    InputSource::Field(position) => Expr::Var(position),
                    InputSource::Fallback(value) => Expr::Constant(value),
                })
            };
            let program = evaluator.expr().try_map_vars(&mut slot)?;
            Ok(Some(program))
        })
        .collect()
}
