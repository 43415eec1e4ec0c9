use crate::{
    arena::{Arena, Expr},
    backend::{Backend, Memory},
    checkpoint,
    config::GraphConfig,
    debug::DebugMask,
    dtype::DType,
    error::GraphError,
    init::{self, Init},
    io::Item,
    memo::{Memo, Scope},
    node::{Node, Op},
    parameters::Parameters,
    shape::Shape,
};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt::Write,
    ops::{Deref, DerefMut},
};

/// Expression graph.
///
/// Owns all nodes created during a build cycle, records them on the forward
/// tape in creation order and on the backward tape if they are trainable,
/// tracks root nodes and owns the persistent parameter set.
pub struct Graph<B: Backend> {
    backend: B,
    config: GraphConfig,
    debug: DebugMask,
    nodes: Arena<Node>,
    count: usize,
    forward_tape: VecDeque<Expr>,
    backward_tape: Vec<Expr>,
    roots: BTreeSet<Expr>,
    memo: Memo,
    params: Parameters,
    pinned: BTreeSet<Expr>,
    namespace: String,
    reloaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    // Batch taken from the forward tape
    Tape,
    // Checkpoint subtape recomputed before backward
    Replay,
}

/// Puts the allocator into probing mode for as long as it lives.
struct Probe<'a, B: Backend> {
    graph: &'a mut Graph<B>,
}

impl<'a, B: Backend> Probe<'a, B> {
    fn new(graph: &'a mut Graph<B>, budget: usize) -> Probe<'a, B> {
        if graph.debug.memory() {
            println!("Probing with budget of {budget} bytes");
        }
        graph.backend.throw_at_reallocation(Some(budget));
        Probe { graph }
    }
}

impl<B: Backend> Deref for Probe<'_, B> {
    type Target = Graph<B>;
    fn deref(&self) -> &Self::Target {
        self.graph
    }
}

impl<B: Backend> DerefMut for Probe<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.graph
    }
}

impl<B: Backend> Drop for Probe<'_, B> {
    fn drop(&mut self) {
        self.graph.backend.throw_at_reallocation(None);
    }
}

impl<B: Backend> Graph<B> {
    /// New graph bound to backend
    pub fn new(mut backend: B, config: GraphConfig) -> Graph<B> {
        let debug = DebugMask::from_env(config.debug);
        if config.seed != 0 {
            backend.seed(config.seed);
        }
        if debug.memory() {
            println!("New graph on {}, {config:?}", backend.device());
        }
        Graph {
            backend,
            config,
            debug,
            nodes: Arena::new(),
            count: 0,
            forward_tape: VecDeque::new(),
            backward_tape: Vec::new(),
            roots: BTreeSet::new(),
            memo: Memo::new(),
            params: Parameters::new(),
            pinned: BTreeSet::new(),
            namespace: String::new(),
            reloaded: false,
        }
    }

    /// Backend of this graph
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Configuration in use
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Switch between training and inference. In inference nothing is
    /// recorded for backward.
    pub fn set_inference(&mut self, inference: bool) {
        self.config.inference = inference;
    }

    /// Is the graph in inference mode?
    pub fn is_inference(&self) -> bool {
        self.config.inference
    }

    /// Enable or disable gradient checkpointing
    pub fn set_checkpointing(&mut self, checkpointing: bool) {
        self.config.checkpointing = checkpointing;
    }

    /// Enable NaN and Inf checks, `abort` turns detection into an error
    pub fn set_throw_nan(&mut self, throw_nan: bool, abort: bool) {
        self.config.throw_nan = throw_nan;
        self.config.abort_on_nan = abort;
    }

    /// Reloaded graphs refuse new parameters
    pub fn set_reloaded(&mut self, reloaded: bool) {
        self.reloaded = reloaded;
    }

    /// Prefix parameter names with `namespace::`, empty string removes the prefix
    pub fn switch_params(&mut self, namespace: &str) {
        self.namespace = namespace.into();
    }

    fn full_name(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.into()
        } else {
            format!("{}::{name}", self.namespace)
        }
    }

    /// Node behind handle
    pub fn node(&self, x: Expr) -> Result<&Node, GraphError> {
        self.nodes.get(x).ok_or(GraphError::InvalidExpr(x))
    }

    fn node_mut(&mut self, x: Expr) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(x).ok_or(GraphError::InvalidExpr(x))
    }

    /// Shape of node
    pub fn shape(&self, x: Expr) -> Result<&Shape, GraphError> {
        Ok(self.node(x)?.shape())
    }

    /// Id of node in the current build cycle
    pub fn id(&self, x: Expr) -> Option<usize> {
        self.nodes.get(x).and_then(Node::id)
    }

    /// Nodes waiting for forward evaluation, in creation order
    pub fn forward_tape(&self) -> impl Iterator<Item = Expr> + '_ {
        self.forward_tape.iter().copied()
    }

    /// Trainable nodes in creation order
    pub fn backward_tape(&self) -> &[Expr] {
        &self.backward_tape
    }

    /// Nodes not consumed by any other node
    pub fn roots(&self) -> impl Iterator<Item = Expr> + '_ {
        self.roots.iter().copied()
    }

    /// Number of live nodes, including parameters and long-term memoized nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does the graph hold no nodes?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parameters sorted by full name
    pub fn params(&self) -> impl Iterator<Item = (&str, Expr)> {
        self.params.iter()
    }

    /// Bytes held by the allocator
    pub fn allocated_bytes(&self) -> usize {
        self.backend.allocated_bytes()
    }

    /// Copy node's value to host
    pub fn value(&self, x: Expr) -> Result<Vec<f32>, GraphError> {
        let node = self.node(x)?;
        let value = node.value().ok_or_else(|| GraphError::NullValue {
            child: node.to_string(),
            parent: "host".into(),
        })?;
        self.backend.load(value)
    }

    /// Copy node's gradient to host
    pub fn grad(&self, x: Expr) -> Result<Vec<f32>, GraphError> {
        let node = self.node(x)?;
        let grad = node.grad().ok_or_else(|| GraphError::NullGradient { node: node.to_string() })?;
        self.backend.load(grad)
    }

    fn describe(&self, x: Expr) -> String {
        self.nodes
            .get(x)
            .map_or_else(|| format!("{x} removed"), |node| format!("{x} {node}"))
    }

    /// Register node. Returns existing structurally equal node if the
    /// memoization cache has one, the new node is dropped in that case.
    pub fn add(&mut self, node: Node) -> Result<Expr, GraphError> {
        if let Some((x, scope)) = self.memo.find(&node, &self.nodes) {
            if self.debug.memo() {
                println!("Memoized {scope:?} {node} as {x}");
            }
            if scope == Scope::LongTerm {
                self.revive(x)?;
            }
            return Ok(x);
        }
        let hash = node.hash();
        let memoize = node.is_memoized();
        let x = self.nodes.push(node);
        self.memo.remember(hash, x, memoize);
        self.register(x)?;
        Ok(x)
    }

    fn register(&mut self, x: Expr) -> Result<(), GraphError> {
        let id = self.count;
        let inference = self.config.inference;
        let node = self.node_mut(x)?;
        node.id = Some(id);
        let trainable = node.trainable;
        let children = node.children().to_vec();
        self.count += 1;
        self.forward_tape.push_back(x);
        if !inference && trainable {
            self.backward_tape.push(x);
            self.roots.insert(x);
        }
        if self.roots.contains(&x) {
            for child in children {
                self.roots.remove(&child);
            }
        }
        Ok(())
    }

    // Long-term nodes from earlier build cycles are used as they are if they
    // hold a value, otherwise they are put on the tape again.
    fn revive(&mut self, x: Expr) -> Result<(), GraphError> {
        let node = self.node(x)?;
        if node.id().is_some() || node.value().is_some() {
            return Ok(());
        }
        for child in node.children().to_vec() {
            self.revive(child)?;
        }
        self.register(x)
    }

    /// Construct operation node over children and register it
    pub fn apply(&mut self, op: Op, children: Vec<Expr>) -> Result<Expr, GraphError> {
        let node = Node::new_op(op, children, &self.nodes)?;
        self.add(node)
    }

    /// Get or create parameter.
    ///
    /// Existing parameters must be requested with the same shape, their
    /// initializer is ignored. `fixed` parameters are not trained.
    pub fn param(&mut self, name: &str, shape: impl Into<Shape>, init: Init, fixed: bool) -> Result<Expr, GraphError> {
        let name = self.full_name(name);
        let shape = shape.into();
        if let Some(p) = self.params.get(&name) {
            let node = self.node_mut(p)?;
            if node.shape() != &shape {
                return Err(GraphError::ParamShapeMismatch {
                    name,
                    requested: shape,
                    original: node.shape().clone(),
                });
            }
            node.trainable = !fixed;
            if node.id().is_none() {
                self.register(p)?;
            }
            return Ok(p);
        }
        if self.reloaded {
            return Err(GraphError::ReloadedGraph { name });
        }
        let node = Node::param(name.clone(), shape, init, !fixed)?;
        let p = self.nodes.push(node);
        self.params.add(name, p);
        self.register(p)?;
        Ok(p)
    }

    /// Parameter by name, in current namespace
    pub fn get(&self, name: &str) -> Option<Expr> {
        self.params.get(&self.full_name(name))
    }

    /// Constant node
    pub fn constant(&mut self, shape: impl Into<Shape>, init: Init) -> Result<Expr, GraphError> {
        let node = Node::constant(shape.into(), init)?;
        self.add(node)
    }

    /// Constant kept across build cycles, for input independent values such
    /// as fixed masks. It is released by [`Graph::clear_longterm`] followed by
    /// [`Graph::clear`].
    pub fn constant_memoized(&mut self, shape: impl Into<Shape>, init: Init) -> Result<Expr, GraphError> {
        let node = Node::memoized(shape.into(), init)?;
        self.add(node)
    }

    /// Constant of ones
    pub fn ones(&mut self, shape: impl Into<Shape>) -> Result<Expr, GraphError> {
        self.constant(shape, init::ones())
    }

    /// Constant of zeros
    pub fn zeros(&mut self, shape: impl Into<Shape>) -> Result<Expr, GraphError> {
        self.constant(shape, init::zeros())
    }

    /// I32 index vector
    pub fn indices(&mut self, indices: &[u32]) -> Result<Expr, GraphError> {
        self.constant(indices.len(), init::from_indices(indices))
    }

    /// Dropout mask, never memoized
    pub fn dropout_mask(&mut self, prob: f32, shape: impl Into<Shape>) -> Result<Expr, GraphError> {
        self.constant(shape, init::dropout(prob))
    }

    /// Keep node's buffers alive until the next clear
    pub fn retain(&mut self, x: Expr) -> Result<(), GraphError> {
        self.node(x)?;
        self.pinned.insert(x);
        Ok(())
    }

    /// Mark node as recomputation boundary
    pub fn mark_checkpoint(&mut self, x: Expr) -> Result<(), GraphError> {
        self.node_mut(x)?.checkpoint = true;
        Ok(())
    }

    /// Print node's value after forward and gradient after backward
    pub fn debug(&mut self, x: Expr, message: impl Into<String>) -> Result<(), GraphError> {
        self.node_mut(x)?.debug = Some(message.into());
        Ok(())
    }

    fn is_persistent(&self, x: Expr) -> bool {
        self.pinned.contains(&x)
            || self
                .nodes
                .get(x)
                .map_or(true, |node| node.is_param() || (node.is_memoized() && self.memo.is_long_term(x, node.hash())))
    }

    fn free(&mut self, x: Expr) {
        if self.is_persistent(x) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(x) {
            if self.debug.memory() && node.value().is_some() {
                println!("Free {x} {node}");
            }
            node.free(&mut self.backend);
        }
    }

    fn dump(&self, message: &str, label: &str, memory: &Memory) -> Result<(), GraphError> {
        println!("Debug {label}: {message}");
        println!("{:?}", self.backend.load(memory)?);
        Ok(())
    }

    fn report_nan(&self, x: Expr, pass: &'static str, nan: bool, inf: bool, children: &[Expr]) -> Result<(), GraphError> {
        let node = self.describe(x);
        eprintln!("Detected NaN ({nan}) or Inf ({inf}) in {pass} pass of {node}");
        for child in children {
            eprintln!("Child - {}", self.describe(*child));
        }
        if self.config.abort_on_nan {
            return Err(GraphError::NumericHealth { nan, inf, pass, node });
        }
        Ok(())
    }

    /// Allocate and initialize parameters, then evaluate the forward tape
    pub fn forward(&mut self) -> Result<(), GraphError> {
        self.params.allocate_forward(&mut self.nodes, &mut self.backend)?;
        self.forward_next()
    }

    /// Evaluate nodes registered since the previous forward pass.
    ///
    /// Nodes leave the forward tape once evaluated. On error the failing node
    /// and the ones after it stay on the tape.
    pub fn forward_next(&mut self) -> Result<(), GraphError> {
        self.memo.clear_short_term();
        if self.config.checkpointing {
            let plan = checkpoint::plan(&mut self.nodes, &self.backward_tape, &self.roots);
            if self.debug.checkpoint() {
                println!("Checkpoint plan {plan:?}");
            }
        }
        let tape: Vec<Expr> = self.forward_tape.iter().copied().collect();
        self.run_forward(&tape, Pass::Tape)
    }

    fn run_forward(&mut self, tape: &[Expr], pass: Pass) -> Result<(), GraphError> {
        let inference = self.config.inference;
        let evict = self.config.checkpointing && pass == Pass::Tape;
        // Only nodes of this batch are evicted, earlier batches may be read again
        let batch: BTreeSet<Expr> = tape.iter().copied().collect();
        // Consumers left on this tape and position of the last one
        let mut consumers: BTreeMap<Expr, usize> = BTreeMap::new();
        let mut last_use: BTreeMap<Expr, usize> = BTreeMap::new();
        if inference || evict {
            for (i, x) in tape.iter().enumerate() {
                for child in self.node(*x)?.children() {
                    if batch.contains(child) {
                        *consumers.entry(*child).or_insert(0) += 1;
                        last_use.insert(*child, i);
                    }
                }
            }
        }

        for (i, &x) in tape.iter().enumerate() {
            let children = match self.eval(x) {
                Ok(children) => children,
                Err(e) => {
                    if let Some(node) = self.nodes.get_mut(x) {
                        node.discard_value(&mut self.backend);
                    }
                    return Err(e);
                }
            };
            if pass == Pass::Tape {
                self.forward_tape.pop_front();
            }

            if inference {
                for child in &children {
                    if let Some(n) = consumers.get_mut(child) {
                        *n -= 1;
                        if *n == 0 {
                            self.free(*child);
                        }
                    }
                }
            }

            if evict {
                let subtape = self.nodes.get(x).map(|node| node.subtape.clone()).unwrap_or_default();
                for y in subtape {
                    if batch.contains(&y) && last_use.get(&y).map_or(true, |&u| u <= i) {
                        self.free(y);
                    }
                }
            }
        }
        Ok(())
    }

    // Allocates, initializes and evaluates one node, returns its children
    fn eval(&mut self, x: Expr) -> Result<Vec<Expr>, GraphError> {
        let node = self.nodes.get_mut(x).ok_or(GraphError::InvalidExpr(x))?;
        node.allocate(&mut self.backend)?;
        node.init(&mut self.backend)?;

        let node = self.nodes.get(x).ok_or(GraphError::InvalidExpr(x))?;
        if self.debug.forward() {
            println!("Forward {x} {node}");
        }
        if let Err(e) = node.forward(&self.nodes, &mut self.backend) {
            if matches!(e, GraphError::NullValue { .. }) {
                eprintln!("{e}");
            }
            return Err(e);
        }
        let trainable = node.is_trainable();
        let children = node.children().to_vec();
        if let (Some(message), Some(value)) = (&node.debug, node.value()) {
            self.dump(message, "value", value)?;
        }

        if trainable && self.config.throw_nan {
            if let Some(value) = self.nodes.get(x).and_then(Node::value) {
                let (nan, inf) = self.backend.check_nan(value)?;
                if nan || inf {
                    self.report_nan(x, "forward", nan, inf, &children)?;
                }
            }
        }
        Ok(children)
    }

    /// Backward pass over the backward tape.
    ///
    /// Exactly one root is required, it is seeded with gradient of ones.
    /// `zero` resets parameter gradients before accumulation, `clip_norm`
    /// above zero clips each node's gradient to that L2 norm.
    pub fn backward(&mut self, zero: bool, clip_norm: f32) -> Result<(), GraphError> {
        if self.roots.len() != 1 {
            let roots = self
                .roots
                .iter()
                .map(|x| self.describe(*x))
                .collect::<Vec<String>>()
                .join("\n");
            eprintln!("There are {} root nodes for backward pass:\n{roots}", self.roots.len());
            return Err(GraphError::RootCount {
                count: self.roots.len(),
                roots,
            });
        }

        self.params.allocate_backward(&mut self.nodes, &mut self.backend)?;
        if zero {
            self.params.set_zero_adjoint(&self.nodes, &mut self.backend)?;
        }
        let roots = std::mem::take(&mut self.roots);
        for x in &roots {
            let node = self.nodes.get_mut(*x).ok_or(GraphError::InvalidExpr(*x))?;
            node.init_dependent(&mut self.backend)?;
        }
        self.memo.clear_short_term();

        let mut first_nan = true;
        while let Some(v) = self.backward_tape.pop() {
            let node = self.node_mut(v)?;
            let children = node.children().to_vec();
            let subtape = std::mem::take(&mut node.subtape);

            for child in &children {
                let node = self.nodes.get_mut(*child).ok_or(GraphError::InvalidExpr(*child))?;
                if node.is_trainable() && !node.is_param() {
                    node.set_zero_adjoint(&mut self.backend)?;
                }
            }

            if self.config.checkpointing && !subtape.is_empty() {
                if self.debug.checkpoint() {
                    println!("Recomputing {} nodes for {v}", subtape.len());
                }
                self.run_forward(&subtape, Pass::Replay)?;
            }

            let node = self.nodes.get(v).ok_or(GraphError::InvalidExpr(v))?;
            if self.debug.backward() {
                println!("Backward {v} {node}");
            }
            if let (Some(message), Some(grad)) = (&node.debug, node.grad()) {
                self.dump(message, "grad", grad)?;
            }
            if clip_norm > 0.0 {
                if let Some(grad) = node.grad() {
                    let norm = self.backend.l2_norm(grad)?;
                    if norm > clip_norm {
                        self.backend.scale(grad, clip_norm / norm)?;
                    }
                }
            }
            node.backward(&self.nodes, &mut self.backend)?;

            if self.config.throw_nan && first_nan {
                for child in &children {
                    if let Some(grad) = self.nodes.get(*child).and_then(Node::grad) {
                        let (nan, inf) = self.backend.check_nan(grad)?;
                        if nan || inf {
                            first_nan = false;
                            self.report_nan(*child, "backward", nan, inf, &[v])?;
                            break;
                        }
                    }
                }
            }

            // every consumer of v was processed before it
            if !roots.contains(&v) {
                self.free(v);
            }
        }
        Ok(())
    }

    /// Forward pass followed by backward pass with zeroed parameter gradients
    pub fn backprop(&mut self) -> Result<(), GraphError> {
        self.forward()?;
        let clip = self.config.clip_norm;
        self.backward(true, clip)
    }

    /// Capacity probe. Runs [`Graph::backprop`] with the allocator limited
    /// to budget bytes, returns false if it ran out of memory. On failure
    /// the pass is rewound so the graph can be probed or run again.
    pub fn fits(&mut self, budget: usize) -> Result<bool, GraphError> {
        let backward_tape = self.backward_tape.clone();
        let roots = self.roots.clone();
        let result = {
            let mut probe = Probe::new(self, budget);
            probe.backprop()
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_out_of_memory() => {
                if self.debug.memory() {
                    println!("Probe failed, {e}");
                }
                self.rewind(backward_tape, roots);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // Nodes of the current build cycle ordered by id
    fn cycle(&self) -> Vec<Expr> {
        let mut cycle: Vec<(usize, Expr)> = self
            .nodes
            .iter()
            .filter_map(|(x, node)| node.id().map(|id| (id, x)))
            .collect();
        cycle.sort_unstable();
        cycle.into_iter().map(|(_, x)| x).collect()
    }

    fn rewind(&mut self, backward_tape: Vec<Expr>, roots: BTreeSet<Expr>) {
        let cycle = self.cycle();
        for x in &cycle {
            self.free(*x);
        }
        self.forward_tape = cycle.into();
        self.backward_tape = backward_tape;
        self.roots = roots;
    }

    /// Drop all nodes of the current build cycle. Parameters and long-term
    /// memoized nodes stay, ids restart at zero.
    pub fn clear(&mut self) {
        self.count = 0;
        self.forward_tape.clear();
        self.backward_tape.clear();
        self.roots.clear();
        self.pinned.clear();
        self.memo.clear_short_term();
        let mut keep = self.memo.long_term();
        keep.extend(self.params.iter().map(|(_, x)| x));
        let exprs: Vec<Expr> = self.nodes.exprs().collect();
        for x in exprs {
            if keep.contains(&x) {
                if let Some(node) = self.nodes.get_mut(x) {
                    node.id = None;
                    node.checkpoint = false;
                    node.subtape.clear();
                }
            } else if let Some(mut node) = self.nodes.remove(x) {
                node.release(&mut self.backend);
            }
        }
        if self.debug.memory() {
            println!(
                "Cleared graph, {} nodes kept, {} bytes allocated",
                self.nodes.len(),
                self.backend.allocated_bytes()
            );
        }
    }

    /// Clear the graph and remove all parameters
    pub fn clear_parameters(&mut self) {
        self.clear();
        self.params.clear(&mut self.nodes, &mut self.backend);
    }

    /// Forget long-term memoized nodes, they are dropped by the next clear
    pub fn clear_longterm(&mut self) {
        self.memo.clear_long_term();
    }

    /// Parameters of the current namespace as items, namespace is stripped from names
    pub fn save(&mut self) -> Result<Vec<Item>, GraphError> {
        self.params.allocate_forward(&mut self.nodes, &mut self.backend)?;
        let prefix = if self.namespace.is_empty() {
            String::new()
        } else {
            format!("{}::", self.namespace)
        };
        let mut items = Vec::new();
        for (name, x) in self.params.iter() {
            let Some(name) = name.strip_prefix(&prefix) else {
                continue;
            };
            let node = self.node(x)?;
            let value = node.value().ok_or_else(|| GraphError::NullValue {
                child: node.to_string(),
                parent: "save".into(),
            })?;
            items.push(Item {
                name: name.into(),
                shape: node.shape().clone(),
                dtype: node.dtype(),
                data: self.backend.load(value)?,
            });
        }
        Ok(items)
    }

    /// Populate parameters from items. Existing parameters are overwritten,
    /// missing ones created. Items named `special:*` are skipped.
    pub fn load(&mut self, items: &[Item], mark_reloaded: bool) -> Result<(), GraphError> {
        self.set_reloaded(false);
        for item in items.iter().filter(|item| !item.is_special()) {
            let init = match item.dtype {
                DType::F32 => init::from_vec(item.data.clone()),
                DType::I32 => init::from_indices(item.indices()?),
            };
            if let Some(p) = self.get(&item.name) {
                let node = self.nodes.get_mut(p).ok_or(GraphError::InvalidExpr(p))?;
                if node.shape() != &item.shape {
                    return Err(GraphError::ParamShapeMismatch {
                        name: item.name.clone(),
                        requested: item.shape.clone(),
                        original: node.shape().clone(),
                    });
                }
                node.set_init(init);
                if node.value().is_some() {
                    node.init(&mut self.backend)?;
                }
            } else {
                // index data is never trained
                self.param(&item.name, item.shape.clone(), init, item.dtype == DType::I32)?;
            }
        }
        self.set_reloaded(mark_reloaded);
        Ok(())
    }

    /// Current build cycle in graphviz dot format
    pub fn graphviz(&self) -> String {
        let mut res = String::from("digraph ExpressionGraph {\n  graph[splines=ortho]\n");
        let mut edges = String::new();
        for x in self.cycle().into_iter().rev() {
            let Some(node) = self.nodes.get(x) else {
                continue;
            };
            let fillcolor = if node.is_param() {
                "orange"
            } else if node.is_trainable() {
                "white"
            } else {
                "grey"
            };
            let penwidth = if node.is_checkpoint() { 3 } else { 1 };
            let name = node.name().map_or_else(String::new, |name| format!("\\n{name}"));
            let _ = writeln!(
                res,
                "  \"{x}\" [shape=box, label=\"{} {}{name}\\n{}\", style=filled, fillcolor=\"{fillcolor}\", penwidth={penwidth}]",
                node.op().name(),
                node.id().unwrap_or_default(),
                node.shape(),
            );
            for child in node.children() {
                let _ = writeln!(edges, "  \"{child}\" -> \"{x}\"");
            }
        }
        res.push_str(&edges);
        res.push_str("}\n");
        res
    }
}
