use extract::Category;
use ontology::properties::canonical_code;
use ontology::OntologyGraph;
use petgraph::algo::{connected_components, kosaraju_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub id: Uuid,
    pub category: Category,
    pub class_code: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeData {
    pub property_code: String,
    pub property_label: String,
    pub confidence: f64,
}

/// Whole-graph summary. Degrees count incoming plus outgoing edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStatistics {
    pub nodes: usize,
    pub edges: usize,
    /// `edges / (nodes * (nodes - 1))`, 0 below two nodes
    pub density: f64,
    pub weakly_connected_components: usize,
    pub strongly_connected_components: usize,
    pub is_weakly_connected: bool,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
    /// Node count per class code
    pub entity_types: BTreeMap<String, usize>,
    /// Edge count per property code
    pub relationship_types: BTreeMap<String, usize>,
}

/// Directed multigraph over typed entities, built from the generic relations.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    pub graph: DiGraph<NodeData, EdgeData>,
    index: HashMap<Uuid, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn build(ontology: &OntologyGraph) -> Self {
        let mut graph = DiGraph::with_capacity(ontology.entities.len(), ontology.relations.len());
        let mut index = HashMap::with_capacity(ontology.entities.len());

        for entity in &ontology.entities {
            let node = graph.add_node(NodeData {
                id: entity.id(),
                category: entity.category(),
                class_code: entity.class_code(),
                label: entity.label().to_string(),
            });
            index.insert(entity.id(), node);
        }

        for relation in &ontology.relations {
            let (Some(&source), Some(&target)) =
                (index.get(&relation.source_id), index.get(&relation.target_id))
            else {
                warn!(
                    source_id = %relation.source_id,
                    target_id = %relation.target_id,
                    "Relation endpoint missing from graph, skipping edge"
                );
                continue;
            };
            graph.add_edge(
                source,
                target,
                EdgeData {
                    property_code: relation.property_code.clone(),
                    property_label: relation.property_label.clone(),
                    confidence: relation.confidence,
                },
            );
        }

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &Uuid) -> Option<&NodeData> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Ids of entities reachable over one outgoing edge.
    pub fn successors(&self, id: &Uuid) -> Vec<Uuid> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: &Uuid) -> Vec<Uuid> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &Uuid, direction: Direction) -> Vec<Uuid> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<Uuid> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].id)
            .collect();
        // petgraph walks edges newest first
        ids.reverse();
        ids
    }

    pub fn degree(&self, id: &Uuid) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.node_degree(idx))
            .unwrap_or(0)
    }

    fn node_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
            + self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn statistics(&self) -> NetworkStatistics {
        let nodes = self.node_count();
        let edges = self.edge_count();
        let degrees: Vec<usize> = self.graph.node_indices().map(|idx| self.node_degree(idx)).collect();

        let density = if nodes < 2 {
            0.0
        } else {
            edges as f64 / (nodes * (nodes - 1)) as f64
        };
        let weakly_connected_components = if nodes == 0 { 0 } else { connected_components(&self.graph) };

        let mut entity_types = BTreeMap::new();
        for node in self.graph.node_weights() {
            *entity_types.entry(node.class_code.to_string()).or_insert(0) += 1;
        }
        let mut relationship_types = BTreeMap::new();
        for edge in self.graph.edge_weights() {
            *relationship_types.entry(canonical_code(&edge.property_code)).or_insert(0) += 1;
        }

        NetworkStatistics {
            nodes,
            edges,
            density,
            weakly_connected_components,
            strongly_connected_components: kosaraju_scc(&self.graph).len(),
            is_weakly_connected: weakly_connected_components == 1,
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            avg_degree: if nodes == 0 {
                0.0
            } else {
                degrees.iter().sum::<usize>() as f64 / nodes as f64
            },
            entity_types,
            relationship_types,
        }
    }

    /// Degree over `nodes - 1` for every node, in node order. A lone node
    /// scores 1.
    pub fn degree_centrality(&self) -> Vec<(Uuid, f64)> {
        let nodes = self.node_count();
        self.graph
            .node_indices()
            .map(|idx| {
                let score = if nodes <= 1 {
                    1.0
                } else {
                    self.node_degree(idx) as f64 / (nodes - 1) as f64
                };
                (self.graph[idx].id, score)
            })
            .collect()
    }

    /// Top `k` nodes by degree centrality; ties keep node order.
    pub fn most_central(&self, k: usize) -> Vec<(Uuid, f64)> {
        let mut scores = self.degree_centrality();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);
        scores
    }

    /// Nodes of the given categories and the edges between them.
    pub fn subgraph_by_category(&self, categories: &[Category]) -> Self {
        let graph = self.graph.filter_map(
            |_, node| categories.contains(&node.category).then(|| node.clone()),
            |_, edge| Some(edge.clone()),
        );
        let index = graph
            .node_indices()
            .map(|idx| (graph[idx].id, idx))
            .collect();
        Self { graph, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{RawEntity, RawExtraction, RawRelationship, Resolver};
    use ontology::process_extraction;

    fn ontology() -> OntologyGraph {
        let raw = RawExtraction {
            entities: vec![
                RawEntity::new("person_1", Category::Person, "Albert Einstein"),
                RawEntity::new("place_1", Category::Place, "Ulm"),
                RawEntity::new("event_1", Category::Event, "Annus Mirabilis"),
            ],
            relationships: vec![
                RawRelationship::new("person_1", "place_1", "P98", "was born"),
                RawRelationship::new("event_1", "person_1", "P14", "carried out by"),
                RawRelationship::new("person_1", "person_1", "P130", "shows features of"),
            ],
            ..RawExtraction::default()
        };
        process_extraction(&Resolver::default(), &raw).unwrap().graph
    }

    #[test]
    fn test_build() {
        let ontology = ontology();
        let graph = KnowledgeGraph::build(&ontology);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);

        let einstein = ontology.entities[0].id();
        let node = graph.node(&einstein).unwrap();
        assert_eq!(node.class_code, "E21");
        assert_eq!(node.label, "Albert Einstein");
        // out: Ulm, self; in: event, self
        assert_eq!(graph.degree(&einstein), 4);
    }

    #[test]
    fn test_neighbors() {
        let ontology = ontology();
        let graph = KnowledgeGraph::build(&ontology);
        let einstein = ontology.entities[0].id();
        let ulm = ontology.entities[1].id();
        let event = ontology.entities[2].id();

        assert_eq!(graph.successors(&einstein), vec![ulm, einstein]);
        assert_eq!(graph.predecessors(&ulm), vec![einstein]);
        assert!(graph.predecessors(&event).is_empty());
        assert!(graph.successors(&Uuid::nil()).is_empty());
    }

    #[test]
    fn test_empty() {
        let graph = KnowledgeGraph::build(&OntologyGraph::default());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);

        let stats = graph.statistics();
        assert_eq!(stats.density, 0.0);
        assert_eq!(stats.weakly_connected_components, 0);
        assert!(!stats.is_weakly_connected);
        assert_eq!(stats.avg_degree, 0.0);
        assert!(graph.most_central(3).is_empty());
    }

    #[test]
    fn test_statistics() {
        let graph = KnowledgeGraph::build(&ontology());
        let stats = graph.statistics();

        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.edges, 3);
        assert!((stats.density - 0.5).abs() < 1e-9);
        assert_eq!(stats.weakly_connected_components, 1);
        assert!(stats.is_weakly_connected);
        // No cycle spans more than one node
        assert_eq!(stats.strongly_connected_components, 3);
        assert_eq!((stats.min_degree, stats.max_degree), (1, 4));
        assert!((stats.avg_degree - 2.0).abs() < 1e-9);
        assert_eq!(stats.entity_types.get("E21"), Some(&1));
        assert_eq!(stats.entity_types.get("E5"), Some(&1));
        assert_eq!(stats.relationship_types.get("P130"), Some(&1));
        assert_eq!(stats.relationship_types.len(), 3);
    }

    #[test]
    fn test_degree_centrality() {
        let ontology = ontology();
        let graph = KnowledgeGraph::build(&ontology);
        let einstein = ontology.entities[0].id();
        let ulm = ontology.entities[1].id();

        let scores = graph.degree_centrality();
        assert_eq!(scores[0], (einstein, 2.0));
        assert_eq!(scores[1], (ulm, 0.5));

        let top = graph.most_central(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, einstein);
        assert_eq!(top[1].0, ulm);
    }

    #[test]
    fn test_subgraph_by_category() {
        let ontology = ontology();
        let graph = KnowledgeGraph::build(&ontology);
        let einstein = ontology.entities[0].id();
        let event = ontology.entities[2].id();

        let people_and_places = graph.subgraph_by_category(&[Category::Person, Category::Place]);
        assert_eq!(people_and_places.node_count(), 2);
        // P98 and the self-loop survive, P14 from the event does not
        assert_eq!(people_and_places.edge_count(), 2);
        assert!(people_and_places.node(&event).is_none());
        assert_eq!(people_and_places.degree(&einstein), 3);

        let places = graph.subgraph_by_category(&[Category::Place]);
        assert_eq!(places.node_count(), 1);
        assert_eq!(places.edge_count(), 0);
        assert_eq!(places.statistics().weakly_connected_components, 1);
    }
}
