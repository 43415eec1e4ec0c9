use crate::{
    arena::{Arena, Expr},
    node::Node,
};
use std::collections::{BTreeMap, BTreeSet};

/// Where a memoized node was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Created in the current build cycle
    ShortTerm,
    /// Kept across build cycles
    LongTerm,
}

/// Memoization cache mapping structural hashes to candidate nodes.
///
/// Short-term entries are observations of nodes registered since the last
/// forward pass. Long-term entries own their nodes, [`Graph::clear`](crate::graph::Graph::clear)
/// keeps every node reachable from them alive.
///
/// Both scopes accept the first candidate in the hash bucket for which
/// [`Node::equal`] holds. Hash equality alone is never enough.
#[derive(Debug, Default)]
pub struct Memo {
    short_term: BTreeMap<u64, Vec<Expr>>,
    long_term: BTreeMap<u64, Vec<Expr>>,
}

fn find(bucket: Option<&Vec<Expr>>, node: &Node, nodes: &Arena<Node>) -> Option<Expr> {
    bucket?
        .iter()
        .copied()
        .find(|x| nodes.get(*x).is_some_and(|candidate| candidate.equal(node)))
}

impl Memo {
    /// New empty cache
    #[must_use]
    pub fn new() -> Memo {
        Memo::default()
    }

    /// Find structurally equal node. Memoizable nodes are searched
    /// in the long-term scope first.
    #[must_use]
    pub fn find(&self, node: &Node, nodes: &Arena<Node>) -> Option<(Expr, Scope)> {
        let hash = node.hash();
        if node.is_memoized() {
            if let Some(x) = find(self.long_term.get(&hash), node, nodes) {
                return Some((x, Scope::LongTerm));
            }
        }
        find(self.short_term.get(&hash), node, nodes).map(|x| (x, Scope::ShortTerm))
    }

    /// Remember newly registered node, memoizable nodes go to the long-term scope
    pub fn remember(&mut self, hash: u64, expr: Expr, memoize: bool) {
        let scope = if memoize {
            &mut self.long_term
        } else {
            &mut self.short_term
        };
        scope.entry(hash).or_default().push(expr);
    }

    /// Forget observations of the current build cycle
    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    /// Forget long-term entries, their nodes are dropped by the next clear
    pub fn clear_long_term(&mut self) {
        self.long_term.clear();
    }

    /// Nodes owned by the long-term scope
    #[must_use]
    pub fn long_term(&self) -> BTreeSet<Expr> {
        self.long_term.values().flatten().copied().collect()
    }

    /// Is expr owned by the long-term scope?
    #[must_use]
    pub fn is_long_term(&self, expr: Expr, hash: u64) -> bool {
        self.long_term.get(&hash).is_some_and(|bucket| bucket.contains(&expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::GraphError, init, node::Op};

    #[test]
    fn scopes() -> Result<(), GraphError> {
        let mut nodes = Arena::new();
        let mut memo = Memo::new();
        let c = Node::memoized([2].into(), init::ones())?;
        let hash = c.hash();
        assert_eq!(memo.find(&c, &nodes), None);
        let c = nodes.push(c);
        memo.remember(hash, c, true);

        let d = Node::memoized([2].into(), init::ones())?;
        assert_eq!(memo.find(&d, &nodes), Some((c, Scope::LongTerm)));

        let p = nodes.push(Node::param("p", [2].into(), init::zeros(), true)?);
        let x = Node::new_op(Op::Mul, vec![p, c], &nodes)?;
        let hash = x.hash();
        let x = nodes.push(x);
        memo.remember(hash, x, false);
        let y = Node::new_op(Op::Mul, vec![p, c], &nodes)?;
        assert_eq!(memo.find(&y, &nodes), Some((x, Scope::ShortTerm)));
        let z = Node::new_op(Op::Add, vec![p, c], &nodes)?;
        assert_eq!(memo.find(&z, &nodes), None);
        assert_eq!(memo.long_term(), BTreeSet::from([c]));

        memo.clear_short_term();
        assert_eq!(memo.find(&y, &nodes), None);
        assert!(memo.is_long_term(c, hash_of(&nodes, c)));
        memo.clear_long_term();
        assert_eq!(memo.find(&d, &nodes), None);
        Ok(())
    }

    fn hash_of(nodes: &Arena<Node>, x: Expr) -> u64 {
        nodes.get(x).map_or(0, Node::hash)
    }
}
