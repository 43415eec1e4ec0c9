use crate::{
    arena::{Arena, Expr},
    node::Node,
};
use std::collections::BTreeSet;

/// Summary of one checkpoint plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plan {
    /// Nodes carrying a non-empty subtape
    pub checkpoints: usize,
    /// Nodes recomputed during backward
    pub recomputed: usize,
    /// Nodes between the last checkpoint and the root, kept materialized
    pub folded: usize,
}

// Leaves and memoized nodes are always resident, checkpoints cut the walk.
fn is_resident(nodes: &Arena<Node>, x: Expr) -> bool {
    nodes
        .get(x)
        .map_or(true, |node| node.is_checkpoint() || node.is_leaf() || node.is_memoized())
}

/// Collect non-checkpoint descendants of root in post-order, children
/// before the nodes reading them. Each node lands in at most one subtape.
fn create_subtape(nodes: &Arena<Node>, root: Expr, visited: &mut BTreeSet<Expr>) -> Vec<Expr> {
    let mut subtape = Vec::new();
    let mut stack: Vec<(Expr, usize)> = vec![(root, 0)];
    while let Some((x, i)) = stack.pop() {
        let children = nodes.get(x).map_or(&[][..], Node::children);
        if let Some(&child) = children.get(i) {
            stack.push((x, i + 1));
            if !is_resident(nodes, child) && visited.insert(child) {
                stack.push((child, 0));
            }
        } else if x != root {
            subtape.push(x);
        }
    }
    subtape
}

/// Build recomputation subtapes for every checkpoint on the backward tape.
///
/// Roots become checkpoints. The subtape of the roots was computed by the
/// forward pass right before backward, its nodes are turned into checkpoints
/// instead of being recomputed.
pub fn plan(nodes: &mut Arena<Node>, backward_tape: &[Expr], roots: &BTreeSet<Expr>) -> Plan {
    for x in backward_tape {
        if let Some(node) = nodes.get_mut(*x) {
            node.subtape.clear();
        }
    }
    for x in roots {
        if let Some(node) = nodes.get_mut(*x) {
            node.checkpoint = true;
        }
    }

    let mut plan = Plan::default();
    let mut visited = BTreeSet::new();
    for x in backward_tape.iter().rev() {
        if nodes.get(*x).is_some_and(Node::is_checkpoint) {
            let subtape = create_subtape(nodes, *x, &mut visited);
            if let Some(node) = nodes.get_mut(*x) {
                node.subtape = subtape;
            }
        }
    }

    for x in roots {
        let subtape = nodes.get_mut(*x).map(|node| std::mem::take(&mut node.subtape)).unwrap_or_default();
        plan.folded += subtape.len();
        for y in subtape {
            if let Some(node) = nodes.get_mut(y) {
                node.checkpoint = true;
            }
        }
    }

    for x in backward_tape {
        if let Some(node) = nodes.get(*x) {
            if !node.subtape.is_empty() {
                plan.checkpoints += 1;
                plan.recomputed += node.subtape.len();
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::GraphError, init, node::Op};

    fn push_op(nodes: &mut Arena<Node>, op: Op, children: Vec<Expr>) -> Result<Expr, GraphError> {
        let node = Node::new_op(op, children, nodes)?;
        Ok(nodes.push(node))
    }

    #[test]
    fn segments() -> Result<(), GraphError> {
        let mut nodes = Arena::new();
        let p = nodes.push(Node::param("p", [3].into(), init::ones(), true)?);
        let h1 = push_op(&mut nodes, Op::Tanh, vec![p])?;
        let h2 = push_op(&mut nodes, Op::Tanh, vec![h1])?;
        let h3 = push_op(&mut nodes, Op::Tanh, vec![h2])?;
        let h4 = push_op(&mut nodes, Op::Mul, vec![h3, h3])?;
        let root = push_op(&mut nodes, Op::Sum(0), vec![h4])?;
        if let Some(node) = nodes.get_mut(h2) {
            node.checkpoint = true;
        }
        let tape = [p, h1, h2, h3, h4, root];
        let plan = plan(&mut nodes, &tape, &BTreeSet::from([root]));

        assert_eq!(plan, Plan { checkpoints: 1, recomputed: 1, folded: 2 });
        let node = |x: Expr| nodes.get(x).ok_or(GraphError::InvalidExpr(x));
        assert_eq!(node(h2)?.subtape, vec![h1]);
        assert!(node(root)?.subtape.is_empty());
        assert!(node(h3)?.is_checkpoint() && node(h4)?.is_checkpoint());
        assert!(!node(h1)?.is_checkpoint());
        assert!(!node(p)?.is_checkpoint());
        Ok(())
    }

    #[test]
    fn shared_node_in_one_subtape() -> Result<(), GraphError> {
        let mut nodes = Arena::new();
        let p = nodes.push(Node::param("p", [2].into(), init::ones(), true)?);
        let a = push_op(&mut nodes, Op::Exp, vec![p])?;
        let b = push_op(&mut nodes, Op::Tanh, vec![a])?;
        let c = push_op(&mut nodes, Op::Sigmoid, vec![a])?;
        let d = push_op(&mut nodes, Op::Add, vec![b, c])?;
        let e = push_op(&mut nodes, Op::Tanh, vec![d])?;
        let root = push_op(&mut nodes, Op::Sum(0), vec![e])?;
        for x in [d, e] {
            if let Some(node) = nodes.get_mut(x) {
                node.checkpoint = true;
            }
        }
        let tape = [p, a, b, c, d, e, root];
        let plan = plan(&mut nodes, &tape, &BTreeSet::from([root]));
        assert_eq!(plan.recomputed, 3);
        assert_eq!(nodes.get(d).map(|n| n.subtape.clone()), Some(vec![a, b, c]));
        assert_eq!(nodes.get(e).map(|n| n.subtape.len()), Some(0));
        Ok(())
    }
}
