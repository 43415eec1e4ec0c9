use crate::{
    arena::{Arena, Expr},
    backend::Backend,
    error::GraphError,
    node::Node,
};
use std::collections::BTreeMap;

/// Name keyed set of parameter nodes.
///
/// Parameters persist across build cycles, only
/// [`Graph::clear_parameters`](crate::graph::Graph::clear_parameters) removes them.
#[derive(Debug, Default)]
pub struct Parameters {
    params: BTreeMap<String, Expr>,
}

impl Parameters {
    /// New empty parameter set
    #[must_use]
    pub fn new() -> Parameters {
        Parameters::default()
    }

    /// Parameter by full name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Expr> {
        self.params.get(name).copied()
    }

    /// Insert parameter under name
    pub fn add(&mut self, name: String, expr: Expr) {
        self.params.insert(name, expr);
    }

    /// Parameters sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, Expr)> {
        self.params.iter().map(|(name, x)| (name.as_str(), *x))
    }

    /// Allocate and initialize values of all parameters
    pub fn allocate_forward<B: Backend>(&self, nodes: &mut Arena<Node>, backend: &mut B) -> Result<(), GraphError> {
        for x in self.params.values() {
            let node = nodes.get_mut(*x).ok_or(GraphError::InvalidExpr(*x))?;
            node.allocate(backend)?;
            node.init(backend)?;
        }
        Ok(())
    }

    /// Allocate gradients of trainable parameters, zeroing only fresh buffers
    pub fn allocate_backward<B: Backend>(&self, nodes: &mut Arena<Node>, backend: &mut B) -> Result<(), GraphError> {
        for x in self.params.values() {
            let node = nodes.get_mut(*x).ok_or(GraphError::InvalidExpr(*x))?;
            if node.is_trainable() {
                node.set_zero_adjoint(backend)?;
            }
        }
        Ok(())
    }

    /// Set gradients of all parameters to zero
    pub fn set_zero_adjoint<B: Backend>(&self, nodes: &Arena<Node>, backend: &mut B) -> Result<(), GraphError> {
        for x in self.params.values() {
            if let Some(grad) = nodes.get(*x).and_then(Node::grad) {
                backend.fill(grad, 0.0)?;
            }
        }
        Ok(())
    }

    /// Remove all parameters, releasing their buffers
    pub fn clear<B: Backend>(&mut self, nodes: &mut Arena<Node>, backend: &mut B) {
        for (_, x) in std::mem::take(&mut self.params) {
            if let Some(mut node) = nodes.remove(x) {
                node.release(backend);
            }
        }
    }
}
