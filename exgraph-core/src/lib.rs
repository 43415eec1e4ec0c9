//! # exgraph-core
//!
//! exgraph-core is the core part of exgraph, a dynamic expression graph
//! with reverse-mode automatic differentiation.
//! It contains the graph container with its forward and backward tapes,
//! node lifecycle, memoization of structurally identical subexpressions,
//! gradient checkpointing and the traits backends implement.
//!
//! ```ignore
//! let mut graph = Graph::new(exgraph_cpu::device(), GraphConfig::default());
//! let a = graph.param("a", [2, 2], init::ones(), false)?;
//! let b = graph.param("b", [2, 2], init::from_value(2.0), false)?;
//! let ab = ops::mul(&mut graph, a, b)?;
//! let y = ops::add(&mut graph, ab, a)?;
//! let loss = ops::sum_all(&mut graph, y)?;
//! graph.backprop()?;
//! ```
#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]
#![forbid(rustdoc::unescaped_backticks)]
#![forbid(rustdoc::redundant_explicit_links)]

/// See [Arena](arena::Arena) and [Expr](arena::Expr)
pub mod arena;
/// See [Backend](backend::Backend)
pub mod backend;
/// Checkpoint planner building recomputation subtapes
pub mod checkpoint;
/// See [GraphConfig](config::GraphConfig)
pub mod config;
/// See [DebugMask](debug::DebugMask)
pub mod debug;
/// See [DType](dtype::DType)
pub mod dtype;
/// See [GraphError](error::GraphError)
pub mod error;
/// See [Graph](graph::Graph)
pub mod graph;
/// See [Init](init::Init)
pub mod init;
/// See [Item](io::Item)
pub mod io;
/// Short-term and long-term memoization of nodes
pub mod memo;
/// See [Node](node::Node)
pub mod node;
/// Operations composing nodes on a graph
pub mod ops;
/// See [Parameters](parameters::Parameters)
pub mod parameters;
/// See [Shape](shape::Shape)
pub mod shape;

pub use crate::{
    arena::Expr, config::GraphConfig, dtype::DType, error::GraphError, graph::Graph, init::Init,
    shape::Shape,
};
