//! Downstream renderers for ontology graphs: Cypher scripts, markdown, and
//! an in-memory `petgraph` graph.

pub mod cypher;
pub mod graph;
pub mod markdown;

pub use cypher::{cypher_parameters, generate_cypher_script, CypherOptions};
pub use graph::{EdgeData, KnowledgeGraph, NetworkStatistics, NodeData};
pub use markdown::{render_card, render_graph, render_table};
