use extract::Category;
use serde::{Deserialize, Serialize};

/// Shortcut fields carried directly on typed entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutField {
    CurrentLocation,
    Timespan,
    TookPlaceAt,
    ProducedBy,
}

impl ShortcutField {
    pub fn name(self) -> &'static str {
        match self {
            ShortcutField::CurrentLocation => "current_location",
            ShortcutField::Timespan => "timespan",
            ShortcutField::TookPlaceAt => "took_place_at",
            ShortcutField::ProducedBy => "produced_by",
        }
    }
}

/// A shortcut field is filled from an outgoing relationship coded
/// `property_code` (or one of `aliases`) from a `domain` entity to a `range`
/// entity, or from an incoming `inverse_code` relationship whose source is a
/// `range` entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutRule {
    pub field: ShortcutField,
    pub property_code: &'static str,
    pub aliases: &'static [&'static str],
    pub inverse_code: Option<&'static str>,
    pub domain: Category,
    pub range: Category,
}

impl ShortcutRule {
    pub fn matches_outgoing(&self, code: &str) -> bool {
        property_matches(code, self.property_code)
            || self.aliases.iter().any(|alias| property_matches(code, alias))
    }

    pub fn matches_incoming(&self, code: &str) -> bool {
        self.inverse_code.is_some_and(|inverse| property_matches(code, inverse))
    }
}

pub const SHORTCUT_RULES: &[ShortcutRule] = &[
    ShortcutRule {
        field: ShortcutField::CurrentLocation,
        property_code: "P53",
        aliases: &[],
        inverse_code: None,
        domain: Category::Person,
        range: Category::Place,
    },
    ShortcutRule {
        field: ShortcutField::Timespan,
        property_code: "P4",
        aliases: &[],
        inverse_code: None,
        domain: Category::Event,
        range: Category::TimeSpan,
    },
    ShortcutRule {
        field: ShortcutField::TookPlaceAt,
        property_code: "P7",
        aliases: &[],
        inverse_code: None,
        domain: Category::Event,
        range: Category::Place,
    },
    ShortcutRule {
        field: ShortcutField::CurrentLocation,
        property_code: "P53",
        aliases: &[],
        inverse_code: None,
        domain: Category::Object,
        range: Category::Place,
    },
    ShortcutRule {
        field: ShortcutField::ProducedBy,
        property_code: "P108i",
        // Object -P108-> Event is unambiguous given the categories.
        aliases: &["P108"],
        inverse_code: Some("P108"),
        domain: Category::Object,
        range: Category::Event,
    },
];

pub fn rule_for(domain: Category, field: ShortcutField) -> Option<&'static ShortcutRule> {
    SHORTCUT_RULES
        .iter()
        .find(|rule| rule.domain == domain && rule.field == field)
}

/// Leading code token: `"P4_has_time-span"` -> `"P4"`.
pub fn code_token(code: &str) -> &str {
    let code = code.trim();
    let end = code
        .find(|c: char| c == '_' || c.is_whitespace())
        .unwrap_or(code.len());
    &code[..end]
}

/// Case-insensitive match on the leading code token.
pub fn property_matches(code: &str, expected: &str) -> bool {
    code_token(code).eq_ignore_ascii_case(expected)
}

/// `"p108I_was_produced_by"` -> `"P108i"`: upper-case `P`, lower-case
/// inverse marker.
pub fn canonical_code(code: &str) -> String {
    let upper = code_token(code).to_ascii_uppercase();
    match upper.strip_suffix('I') {
        Some(stem) => format!("{}i", stem),
        None => upper,
    }
}

/// English labels for the property codes the extraction prompt advertises.
pub fn property_label(code: &str) -> Option<&'static str> {
    let label = match canonical_code(code).as_str() {
        "P1" => "is identified by",
        "P4" => "has time-span",
        "P7" => "took place at",
        "P11" => "had participant",
        "P14" => "carried out by",
        "P53" => "has former or current location",
        "P98" => "brought into life",
        "P100" => "was death of",
        "P108" => "has produced",
        "P108i" => "was produced by",
        _ => return None,
    };
    Some(label)
}
