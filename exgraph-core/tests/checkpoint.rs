use exgraph_core::{init, ops, Expr, Graph, GraphConfig, GraphError};
use exgraph_cpu::Cpu;
use itertools::Itertools;

struct Net {
    p: Expr,
    w: Expr,
    h1: Expr,
    h2: Expr,
    h3: Expr,
    loss: Expr,
}

fn build(graph: &mut Graph<Cpu>) -> Result<Net, GraphError> {
    let p = graph.param("p", [2, 3], init::from_vec(vec![0.1, 0.2, 0.3, -0.1, -0.2, 0.5]), false)?;
    let w = graph.param("w", [3, 2], init::from_vec(vec![0.3, -0.4, 0.2, 0.1, -0.5, 0.6]), false)?;
    let h1 = ops::dot(graph, p, w)?;
    let h2 = ops::tanh(graph, h1)?;
    let h3 = ops::mul(graph, h2, h2)?;
    let h4 = ops::sigmoid(graph, h3)?;
    let h5 = ops::exp(graph, h4)?;
    let loss = ops::sum_all(graph, h5)?;
    Ok(Net { p, w, h1, h2, h3, loss })
}

fn assert_close(x: &[f32], y: &[f32]) {
    for (a, b) in x.iter().zip_eq(y) {
        assert!((a - b).abs() < 1e-6, "{x:?} != {y:?}");
    }
}

#[test]
fn recomputation_matches() -> Result<(), GraphError> {
    let mut plain = Graph::new(exgraph_cpu::device(), GraphConfig::default());
    let net = build(&mut plain)?;
    plain.backprop()?;

    let config = GraphConfig {
        checkpointing: true,
        ..GraphConfig::default()
    };
    let mut graph = Graph::new(exgraph_cpu::device(), config);
    let cnet = build(&mut graph)?;
    graph.mark_checkpoint(cnet.h3)?;
    graph.forward()?;
    // nodes below the checkpoint are evicted after forward
    assert!(graph.node(cnet.h1)?.value().is_none());
    assert!(graph.node(cnet.h2)?.value().is_none());
    assert!(graph.node(cnet.h3)?.value().is_some());
    assert_eq!(graph.node(cnet.h3)?.subtape().len(), 2);
    assert_close(&graph.value(cnet.loss)?, &plain.value(net.loss)?);

    graph.backward(true, 0.0)?;
    assert_close(&graph.grad(cnet.p)?, &plain.grad(net.p)?);
    assert_close(&graph.grad(cnet.w)?, &plain.grad(net.w)?);
    Ok(())
}

#[test]
fn roots_are_checkpoints() -> Result<(), GraphError> {
    let config = GraphConfig {
        checkpointing: true,
        ..GraphConfig::default()
    };
    let mut graph = Graph::new(exgraph_cpu::device(), config);
    let net = build(&mut graph)?;
    graph.forward()?;
    // without marks everything between parameters and root stays materialized
    assert!(graph.node(net.loss)?.is_checkpoint());
    assert!(graph.node(net.h1)?.is_checkpoint());
    assert!(graph.node(net.h2)?.value().is_some());
    graph.backward(true, 0.0)?;
    assert_eq!(graph.grad(net.p)?.len(), 6);
    Ok(())
}
