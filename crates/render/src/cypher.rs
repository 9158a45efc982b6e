use ontology::properties::property_label;
use ontology::{OntologyGraph, ShortcutLink, TypedEntity};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CypherOptions {
    pub include_constraints: bool,
    pub batch_size: usize,
}

impl Default for CypherOptions {
    fn default() -> Self {
        Self {
            include_constraints: true,
            batch_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct NodeRow<'a> {
    id: String,
    class_code: &'static str,
    category: &'static str,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
struct RelRow {
    src: String,
    tgt: String,
}

fn node_row(entity: &TypedEntity) -> NodeRow<'_> {
    NodeRow {
        id: entity.id().to_string(),
        class_code: entity.class_code(),
        category: entity.category().as_str(),
        label: entity.label(),
        notes: entity.base().description.as_deref(),
    }
}

/// Relationship type for a property code: `P4` -> `P4_has_time_span`.
pub fn relationship_type(property_code: &str) -> String {
    let code = ontology::properties::canonical_code(property_code);
    match property_label(&code) {
        Some(label) => {
            let slug: String = label
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
                .collect();
            format!("{}_{}", code, slug)
        }
        None => code,
    }
}

/// Shortcut links grouped by relationship type, in first-seen order.
fn group_links(links: &[ShortcutLink]) -> Vec<(String, Vec<&ShortcutLink>)> {
    let mut groups: Vec<(String, Vec<&ShortcutLink>)> = Vec::new();
    for link in links {
        let rel_type = relationship_type(&link.property_code);
        match groups.iter_mut().find(|(t, _)| *t == rel_type) {
            Some((_, members)) => members.push(link),
            None => groups.push((rel_type, vec![link])),
        }
    }
    groups
}

fn escape_identifier(identifier: &str) -> String {
    identifier.replace('`', "``")
}

/// Idempotent MERGE script. Nodes come from every entity, edges from the
/// shortcut fields. Parameters are produced by [`cypher_parameters`].
pub fn generate_cypher_script(graph: &OntologyGraph, options: &CypherOptions) -> String {
    let batch_size = options.batch_size.max(1);
    let mut parts = Vec::new();

    if options.include_constraints {
        parts.push(
            "// Create constraints\n\
             CREATE CONSTRAINT crm_id IF NOT EXISTS FOR (n:CRM) REQUIRE n.id IS UNIQUE;"
                .to_string(),
        );
    }

    if !graph.entities.is_empty() {
        let mut lines = vec!["// Create nodes".to_string()];
        for batch in 0..graph.entities.len().div_ceil(batch_size) {
            lines.push(format!("UNWIND $nodes_{} AS n", batch));
            lines.push("MERGE (x:CRM {id: n.id})".to_string());
            lines.push("SET x.label = coalesce(n.label, x.label)".to_string());
            lines.push("SET x.class_code = n.class_code".to_string());
            lines.push("SET x.category = n.category".to_string());
            lines.push("SET x.notes = coalesce(n.notes, x.notes);".to_string());
            lines.push(String::new());
        }
        parts.push(lines.join("\n"));
    }

    let links = graph.shortcut_links();
    if !links.is_empty() {
        let mut lines = vec!["// Create relationships".to_string()];
        for (rel_type, members) in group_links(&links) {
            for batch in 0..members.len().div_ceil(batch_size) {
                lines.push(format!("UNWIND $rels_{}_{} AS r", rel_type, batch));
                lines.push("MATCH (s:CRM {id: r.src})".to_string());
                lines.push("MATCH (t:CRM {id: r.tgt})".to_string());
                lines.push(format!("MERGE (s)-[:`{}`]->(t);", escape_identifier(&rel_type)));
                lines.push(String::new());
            }
        }
        parts.push(lines.join("\n"));
    }

    parts.join("\n\n")
}

/// Parameter map matching the `$nodes_<n>` / `$rels_<type>_<n>` placeholders.
pub fn cypher_parameters(graph: &OntologyGraph, options: &CypherOptions) -> Value {
    let batch_size = options.batch_size.max(1);
    let mut params = Map::new();

    for (batch, chunk) in graph.entities.chunks(batch_size).enumerate() {
        let rows: Vec<NodeRow<'_>> = chunk.iter().map(node_row).collect();
        params.insert(format!("nodes_{}", batch), serde_json::json!(rows));
    }

    let links = graph.shortcut_links();
    for (rel_type, members) in group_links(&links) {
        for (batch, chunk) in members.chunks(batch_size).enumerate() {
            let rows: Vec<RelRow> = chunk
                .iter()
                .map(|link| RelRow {
                    src: link.source_id.to_string(),
                    tgt: link.target_id.to_string(),
                })
                .collect();
            params.insert(format!("rels_{}_{}", rel_type, batch), serde_json::json!(rows));
        }
    }

    Value::Object(params)
}
