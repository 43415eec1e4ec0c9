use exgraph_core::{init, io::Item, ops, DType, Graph, GraphConfig, GraphError};
use exgraph_cpu::Cpu;

fn graph() -> Graph<Cpu> {
    Graph::new(exgraph_cpu::device(), GraphConfig::default())
}

#[test]
fn get_or_create() -> Result<(), GraphError> {
    let mut graph = graph();
    let w = graph.param("w", [2, 3], init::glorot_normal(true, true), false)?;
    assert_eq!(graph.param("w", [2, 3], init::zeros(), false)?, w);
    assert!(matches!(
        graph.param("w", [3, 2], init::zeros(), false),
        Err(GraphError::ParamShapeMismatch { .. })
    ));
    let f = graph.param("f", [2], init::ones(), true)?;
    assert!(!graph.node(f)?.is_trainable());
    assert!(!graph.backward_tape().contains(&f));
    assert_eq!(graph.params().map(|(name, _)| name).collect::<Vec<_>>(), ["f", "w"]);
    Ok(())
}

#[test]
fn namespaces() -> Result<(), GraphError> {
    let mut graph = graph();
    graph.switch_params("encoder");
    let w = graph.param("w", [2], init::ones(), false)?;
    assert_eq!(graph.node(w)?.name(), Some("encoder::w"));
    assert_eq!(graph.get("w"), Some(w));
    graph.switch_params("");
    assert_eq!(graph.get("w"), None);
    assert_eq!(graph.get("encoder::w"), Some(w));
    Ok(())
}

#[test]
fn clear_keeps_parameters() -> Result<(), GraphError> {
    let mut graph = graph();
    let p = graph.param("p", [3], init::uniform(-1.0, 1.0), false)?;
    let e = ops::exp(&mut graph, p)?;
    let y = ops::sum_all(&mut graph, e)?;
    graph.backprop()?;
    let value = graph.value(p)?;

    graph.clear();
    assert!(matches!(graph.node(y), Err(GraphError::InvalidExpr(_))));
    assert_eq!(graph.id(p), None);
    assert_eq!(graph.forward_tape().count(), 0);
    assert_eq!(graph.param("p", [3], init::zeros(), false)?, p);
    assert_eq!(graph.id(p), Some(0));
    assert_eq!(graph.value(p)?, value);

    graph.clear_parameters();
    assert!(graph.get("p").is_none());
    assert!(graph.is_empty());
    let q = graph.param("p", [3], init::zeros(), false)?;
    assert_ne!(p, q);
    Ok(())
}

#[test]
fn save_load() -> Result<(), GraphError> {
    let mut graph = graph();
    graph.switch_params("dec");
    graph.param("b", [2], init::from_value(0.5), false)?;
    graph.param("a", [2, 2], init::eye(), false)?;
    graph.switch_params("");
    graph.param("other", [1], init::ones(), false)?;
    graph.switch_params("dec");
    let items = graph.save()?;
    assert_eq!(
        items,
        [
            Item::new("a", [2, 2], vec![1.0, 0.0, 0.0, 1.0]),
            Item::new("b", [2], vec![0.5, 0.5]),
        ]
    );

    let mut loaded = self::graph();
    let mut with_meta = items.clone();
    with_meta.push(Item::new("special:model.yml", [1], vec![0.0]));
    loaded.load(&with_meta, true)?;
    assert_eq!(loaded.params().count(), 2);
    let a = loaded.param("a", [2, 2], init::zeros(), false)?;
    loaded.forward()?;
    assert_eq!(loaded.value(a)?, items[0].data);
    assert!(matches!(
        loaded.param("c", [2], init::zeros(), false),
        Err(GraphError::ReloadedGraph { .. })
    ));

    // existing parameters are overwritten
    loaded.load(&[Item::new("b", [2], vec![7.0, 8.0])], false)?;
    let b = loaded.get("b").ok_or(GraphError::Parse("missing b".into()))?;
    loaded.forward()?;
    assert_eq!(loaded.value(b)?, [7.0, 8.0]);
    assert!(matches!(
        loaded.load(&[Item::new("b", [3], vec![1.0; 3])], false),
        Err(GraphError::ParamShapeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn long_term_memo_survives_clear() -> Result<(), GraphError> {
    let mut graph = graph();
    let c = graph.constant_memoized([2], init::ones())?;
    let e = ops::exp(&mut graph, c)?;
    let p = graph.param("p", [2], init::ones(), false)?;
    let y = ops::mul(&mut graph, p, e)?;
    ops::sum_all(&mut graph, y)?;
    graph.backprop()?;

    graph.clear();
    assert_eq!(graph.constant_memoized([2], init::ones())?, c);
    assert_eq!(ops::exp(&mut graph, c)?, e);
    // evaluated nodes are reused without going on the tape again
    assert_eq!(graph.forward_tape().count(), 0);
    assert!(graph.value(e).is_ok());

    graph.clear_longterm();
    graph.clear();
    assert!(graph.node(e).is_err());
    assert_ne!(graph.constant_memoized([2], init::ones())?, c);
    Ok(())
}

#[test]
fn training_loop_memory_is_flat() -> Result<(), GraphError> {
    let mut graph = graph();
    let mut live = Vec::new();
    for step in 0..4u32 {
        let w = graph.param("w", [2, 2], init::ones(), false)?;
        let x = graph.constant([2, 2], init::from_vec(vec![step as f32; 4]))?;
        let idx = graph.indices(&[step % 2, 1])?;
        let mask = graph.constant_memoized([2, 2], init::from_value(0.5))?;
        let r = ops::rows(&mut graph, w, idx)?;
        let h = ops::mul(&mut graph, r, x)?;
        let y = ops::mul(&mut graph, h, mask)?;
        ops::sum_all(&mut graph, y)?;
        graph.backprop()?;
        assert_eq!(graph.grad(w)?.iter().sum::<f32>(), 0.5 * 4.0 * step as f32);
        graph.clear();
        live.push((graph.len(), graph.allocated_bytes()));
    }
    // w with value and gradient, mask with value
    assert!(live.iter().all(|x| *x == (2, 48)), "{live:?}");
    Ok(())
}

#[test]
fn load_indices() -> Result<(), GraphError> {
    let mut graph = graph();
    graph.load(&[Item::from_indices("vocab", [3], &[2, 0, 1])], false)?;
    let vocab = graph.get("vocab").ok_or(GraphError::Parse("missing vocab".into()))?;
    assert_eq!(graph.node(vocab)?.dtype(), DType::I32);
    assert!(!graph.node(vocab)?.is_trainable());
    let emb = graph.param("emb", [3, 2], init::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), false)?;
    let r = ops::rows(&mut graph, emb, vocab)?;
    graph.forward()?;
    assert_eq!(graph.value(vocab)?, [2.0, 0.0, 1.0]);
    assert_eq!(graph.value(r)?, [5.0, 6.0, 1.0, 2.0, 3.0, 4.0]);

    let broken = Item {
        data: vec![1.0, -2.0, 0.0],
        ..Item::from_indices("other", [3], &[0, 0, 0])
    };
    assert!(matches!(
        graph.load(&[broken], false),
        Err(GraphError::InvalidIndex { value, .. }) if value == -2.0
    ));
    assert!(graph.get("other").is_none());
    Ok(())
}
