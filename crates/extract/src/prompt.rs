pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        r#"You are a CIDOC CRM expert extracting structured information from text.

INSTRUCTIONS:
1. Identify entities of these types only:
   - Person (E21): individuals, ref_id like "person_1"
   - Event (E5): historical or biographical events, ref_id like "event_1"
   - Place (E53): geographic locations, ref_id like "place_1"
   - Object (E22): human-made objects and artifacts, ref_id like "object_1"
   - TimeSpan (E52): dates or periods, ref_id like "timespan_1"
2. Extract relationships between entities using CIDOC CRM property codes
3. Output ONLY valid JSON, nothing else

COMMON PROPERTY CODES:
- P98: was born (Person -> Place/Event)
- P100: died in (Person -> Event)
- P7: took place at (Event -> Place)
- P4: has time-span (Event -> TimeSpan)
- P11: had participant (Event -> Person)
- P14: carried out by (Event -> Person)
- P53: has former or current location (Object/Person -> Place)
- P108i: was produced by (Object -> Event)

SCHEMA:
{{
  "entities": [
    {{"ref_id": "person_1", "entity_type": "Person|Event|Place|Object|TimeSpan", "label": "Name", "description": "brief description", "confidence": 0.9, "source_snippet": "quote from text", "attributes": {{}}}}
  ],
  "relationships": [
    {{"source_ref": "person_1", "target_ref": "place_1", "property_code": "P98", "property_label": "was born", "confidence": 0.9, "source_snippet": "quote from text"}}
  ],
  "overall_confidence": 0.9
}}

RULES:
- Use consistent ref_ids and reference them exactly in relationships
- Confidence: 0.9-1.0 directly stated, 0.7-0.8 clearly implied, 0.5-0.6 inferred, 0.3-0.4 uncertain
- source_snippet must be a direct quote from the text
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following reply is not a valid extraction object with "entities" and "relationships" arrays:

{}

Fix it. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = build_extraction_prompt("Albert Einstein was born in Ulm.");
        assert!(prompt.contains("Albert Einstein was born in Ulm."));
        assert!(prompt.contains("\"entity_type\""));
        assert!(prompt.contains("TimeSpan (E52)"));
    }

    #[test]
    fn test_retry_prompt_embeds_payload() {
        let prompt = build_retry_prompt("{\"entities\": [");
        assert!(prompt.contains("{\"entities\": ["));
    }
}
