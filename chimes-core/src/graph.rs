//! The statevar dependency graph and its evaluation order.
//!
//! Every field is a node, in declaration order, so node indices match registry positions.
//! Edges only leave statevars: differential fields and parameters hold their values at the
//! start of a step and need nothing computed first. A cycle can therefore only run through
//! statevars.

use crate::dependency::inputs_of;
use crate::errors::{ChimesError, ChimesResult};
use crate::field::Kind;
use crate::registry::FieldRegistry;
use log::debug;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub name: String,
    pub kind: Kind,
}

/// Edges point from a statevar to each field it reads.
pub type FieldGraph = DiGraph<GraphNode, ()>;

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: FieldGraph,
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph and a topological order of the statevars.
    ///
    /// The order is a depth-first post-order started from each statevar in declaration order,
    /// visiting inputs in the order they are declared. It depends only on the registry.
    pub fn build(registry: &FieldRegistry) -> ChimesResult<Self> {
        let mut graph = FieldGraph::with_capacity(registry.len(), 0);
        for field in registry.fields() {
            graph.add_node(GraphNode {
                name: field.name().to_string(),
                kind: field.kind(),
            });
        }

        let mut statevars = vec![];
        for (i, field) in registry.fields().iter().enumerate() {
            if field.kind() != Kind::Statevar {
                continue;
            }
            statevars.push(NodeIndex::new(i));
            if let Some(evaluator) = field.evaluator() {
                // petgraph lists neighbours newest first
                for name in inputs_of(evaluator, registry).into_iter().rev() {
                    if let Some(j) = registry.position(name) {
                        graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
                    }
                }
            }
        }

        let mut order = vec![];
        let mut path: Vec<NodeIndex> = vec![];
        let result = depth_first_search(&graph, statevars, |event| {
            match event {
                DfsEvent::Discover(node, _) => path.push(node),
                DfsEvent::BackEdge(_, to) => {
                    let start = path.iter().rposition(|&n| n == to).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(to);
                    return Err(cycle);
                }
                DfsEvent::Finish(node, _) => {
                    path.pop();
                    if graph[node].kind == Kind::Statevar {
                        order.push(node.index());
                    }
                }
                _ => {}
            }
            Ok(())
        });

        if let Err(cycle) = result {
            return Err(ChimesError::CyclicDependency {
                fields: cycle.iter().map(|&n| graph[n].name.clone()).collect(),
            });
        }

        debug!(
            "Statevar evaluation order: {:?}",
            order
                .iter()
                .map(|&i| graph[NodeIndex::new(i)].name.as_str())
                .collect::<Vec<_>>()
        );
        Ok(Self { graph, order })
    }

    /// Registry positions of the statevars in evaluation order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn order_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.graph[NodeIndex::new(i)].name.as_str())
            .collect()
    }

    /// Registry positions of the fields a statevar reads.
    pub fn dependencies(&self, position: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(position))
            .map(|n| n.index())
            .collect();
        deps.sort_unstable();
        deps
    }

    pub fn graph(&self) -> &FieldGraph {
        &self.graph
    }

    /// Create a diagram of the dependencies between fields
    ///
    /// Useful for debugging
    pub fn as_dot(&self) -> Dot<'_, &FieldGraph> {
        Dot::with_attr_getters(
            &self.graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, (_, node)| format!("label = \"{}\" kind = \"{}\"", node.name, node.kind),
        )
    }
}

/// The order in which statevars must be evaluated.
pub fn build_order(registry: &FieldRegistry) -> ChimesResult<Vec<String>> {
    let graph = DependencyGraph::build(registry)?;
    Ok(graph.order_names().into_iter().map(String::from).collect())
}
