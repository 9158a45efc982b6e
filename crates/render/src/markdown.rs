use ontology::{OntologyGraph, TypedEntity};
use uuid::Uuid;

/// First eight hex digits, enough to tell entities apart on screen.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn display_target(graph: &OntologyGraph, id: &Uuid) -> String {
    match graph.entity(id) {
        Some(target) => format!("{} ({})", target.label(), short_id(id)),
        None => short_id(id),
    }
}

/// `### E21 · Person · Albert Einstein (1a2b3c4d)` followed by the
/// populated shortcut fields and notes.
pub fn render_card(entity: &TypedEntity, graph: &OntologyGraph) -> String {
    let header = format!(
        "### {} · {} · {} ({})",
        entity.class_code(),
        entity.class_name(),
        entity.label(),
        short_id(&entity.id())
    );

    let mut body = Vec::new();
    for (field, target) in entity.shortcuts() {
        body.push(format!("- **{}**: {}", field.name(), display_target(graph, &target)));
    }
    if let Some(notes) = &entity.base().description {
        body.push(format!("- **Notes**: {}", notes));
    }
    if let Some(source) = &entity.base().source_text {
        body.push(format!("- **Source**: \"{}\"", source));
    }

    if body.is_empty() {
        header
    } else {
        format!("{}\n\n{}", header, body.join("\n"))
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

pub fn render_table(entities: &[TypedEntity]) -> String {
    if entities.is_empty() {
        return "No entities to display.".to_string();
    }

    let mut rows = vec![
        "| id | class_code | label | confidence |".to_string(),
        "| --- | --- | --- | --- |".to_string(),
    ];
    for entity in entities {
        rows.push(format!(
            "| {} | {} | {} | {:.2} |",
            short_id(&entity.id()),
            entity.class_code(),
            escape_cell(entity.label()),
            entity.base().confidence
        ));
    }
    rows.join("\n")
}

/// Full document: entity table, one card per entity, relation list.
pub fn render_graph(graph: &OntologyGraph) -> String {
    let mut sections = vec!["## Entities".to_string(), render_table(&graph.entities)];

    for entity in &graph.entities {
        sections.push(render_card(entity, graph));
    }

    if !graph.relations.is_empty() {
        let lines: Vec<String> = graph
            .relations
            .iter()
            .map(|rel| {
                format!(
                    "- {} -[{} {}]-> {}",
                    display_target(graph, &rel.source_id),
                    rel.property_code,
                    rel.property_label,
                    display_target(graph, &rel.target_id)
                )
            })
            .collect();
        sections.push("## Relations".to_string());
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}
