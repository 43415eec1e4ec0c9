use exgraph_core::{backend::Allocator, init, ops, Expr, Graph, GraphConfig, GraphError};
use exgraph_cpu::Cpu;

const N: usize = 64;
const BYTES: usize = N * N * 4;

// Returns the parameter and the tanh node
fn build(graph: &mut Graph<Cpu>) -> Result<(Expr, Expr), GraphError> {
    let p = graph.param("p", [N, N], init::glorot_uniform(true, true), false)?;
    let d = ops::dot(graph, p, p)?;
    let t = ops::tanh(graph, d)?;
    ops::sum_all(graph, t)?;
    Ok((p, t))
}

#[test]
fn tiny_budget() -> Result<(), GraphError> {
    let mut graph = Graph::new(exgraph_cpu::device(), GraphConfig::default());
    let (p, _) = build(&mut graph)?;
    assert!(!graph.fits(16)?);
    assert!(!graph.backend().is_probing());
    assert!(graph.fits(usize::MAX)?);
    assert_eq!(graph.grad(p)?.len(), N * N);
    Ok(())
}

#[test]
fn fails_in_backward() -> Result<(), GraphError> {
    let mut reference = Graph::new(exgraph_cpu::device(), GraphConfig::default());
    let (q, _) = build(&mut reference)?;
    reference.backprop()?;

    let mut graph = Graph::new(exgraph_cpu::device(), GraphConfig::default());
    let (p, _) = build(&mut graph)?;
    let tapes = (graph.forward_tape().count(), graph.backward_tape().to_vec());
    // enough for the forward pass, parameter gradient does not fit
    assert!(!graph.fits(3 * BYTES + 300)?);
    assert!(!graph.backend().is_probing());
    assert_eq!(graph.forward_tape().count(), tapes.0);
    assert_eq!(graph.backward_tape(), tapes.1);
    assert_eq!(graph.roots().count(), 1);

    assert!(graph.fits(usize::MAX)?);
    assert_eq!(graph.grad(p)?, reference.grad(q)?);
    Ok(())
}

#[test]
fn checkpointed() -> Result<(), GraphError> {
    let mut reference = Graph::new(exgraph_cpu::device(), GraphConfig::default());
    let (q, _) = build(&mut reference)?;
    reference.backprop()?;

    let config = GraphConfig {
        checkpointing: true,
        ..GraphConfig::default()
    };
    let mut graph = Graph::new(exgraph_cpu::device(), config);
    let (p, t) = build(&mut graph)?;
    graph.mark_checkpoint(t)?;
    assert!(!graph.fits(16)?);
    assert!(!graph.backend().is_probing());
    assert!(graph.fits(usize::MAX)?);
    for (a, b) in graph.grad(p)?.iter().zip(reference.grad(q)?) {
        assert!((a - b).abs() < 1e-5);
    }
    Ok(())
}
