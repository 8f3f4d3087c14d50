//! Render a [`Subgraph`] as plain-text context for a language model.
//!
//! ```text
//! [Traversal: targeted, depth=1, 3 nodes, 2 edges]
//!
//! ENTITIES:
//!   - [Drug] Aspirin (class: NSAID)
//!   - [SideEffect] Nausea
//!
//! RELATIONSHIPS:
//!   - Aspirin may cause Nausea
//! ```
//!
//! Relationship sentences come from per-type templates using the `{source}`,
//! `{target}` and `{type}` placeholders. Templates are checked when the
//! formatter is built, so formatting itself cannot fail.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{KgragError, Result};
use crate::graph::Subgraph;

pub const NO_CONTEXT: &str = "No relevant information found in the knowledge graph.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Source,
    Target,
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// A parsed relationship sentence template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTemplate {
    segments: Vec<Segment>,
}

impl RelationTemplate {
    /// Parse a template. `{{` and `}}` are literal braces; any other
    /// placeholder than `{source}`, `{target}` or `{type}` is rejected.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(KgragError::Config(format!(
                                    "unclosed placeholder in template {:?}",
                                    template
                                )))
                            }
                        }
                    }
                    let field = match name.as_str() {
                        "source" => Field::Source,
                        "target" => Field::Target,
                        "type" => Field::Type,
                        other => {
                            return Err(KgragError::Config(format!(
                                "unknown placeholder {{{}}} in template {:?}; use {{source}}, {{target}} or {{type}}",
                                other, template
                            )))
                        }
                    };
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(KgragError::Config(format!(
                        "single '}}' in template {:?}; write '}}}}' for a literal brace",
                        template
                    )))
                }
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, source: &str, target: &str, rel_type: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(Field::Source) => out.push_str(source),
                Segment::Field(Field::Target) => out.push_str(target),
                Segment::Field(Field::Type) => out.push_str(rel_type),
            }
        }
        out
    }
}

/// Formats subgraphs using per-relationship-type sentence templates.
#[derive(Debug, Clone)]
pub struct ContextFormatter {
    templates: HashMap<String, RelationTemplate>,
    fallback: RelationTemplate,
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self {
            templates: HashMap::new(),
            fallback: Self::default_template(),
        }
    }
}

impl ContextFormatter {
    /// `{source} --{type}--> {target}`
    fn default_template() -> RelationTemplate {
        RelationTemplate {
            segments: vec![
                Segment::Field(Field::Source),
                Segment::Text(" --".to_string()),
                Segment::Field(Field::Type),
                Segment::Text("--> ".to_string()),
                Segment::Field(Field::Target),
            ],
        }
    }

    /// Build from relationship type -> template text, validating every template.
    pub fn from_templates<'a, I>(templates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut parsed = HashMap::new();
        for (rel_type, template) in templates {
            let template = RelationTemplate::parse(template).map_err(|e| match e {
                KgragError::Config(msg) => KgragError::Config(format!("relationship template {}: {}", rel_type, msg)),
                other => other,
            })?;
            parsed.insert(rel_type.clone(), template);
        }
        Ok(Self {
            templates: parsed,
            fallback: Self::default_template(),
        })
    }

    pub fn format(&self, subgraph: &Subgraph) -> String {
        if subgraph.nodes.is_empty() {
            return NO_CONTEXT.to_string();
        }

        let display: HashMap<&str, &str> = subgraph
            .nodes
            .iter()
            .map(|n| {
                let shown = if n.name.is_empty() { n.label.as_str() } else { n.name.as_str() };
                (n.id.as_str(), shown)
            })
            .collect();

        let mut lines = vec![
            format!(
                "[Traversal: {}, depth={}, {} nodes, {} edges]",
                subgraph.strategy,
                subgraph.hop_depth,
                subgraph.nodes.len(),
                subgraph.relationships.len()
            ),
            String::new(),
            "ENTITIES:".to_string(),
        ];

        for node in &subgraph.nodes {
            let name = if node.name.is_empty() { "(unnamed)" } else { node.name.as_str() };
            let extras: Vec<String> = node
                .properties
                .iter()
                .filter(|(k, v)| k.as_str() != "name" && !is_blank(v))
                .map(|(k, v)| format!("{}: {}", k, display_value(v)))
                .collect();
            if extras.is_empty() {
                lines.push(format!("  - [{}] {}", node.label, name));
            } else {
                lines.push(format!("  - [{}] {} ({})", node.label, name, extras.join(", ")));
            }
        }

        if !subgraph.relationships.is_empty() {
            lines.push("\nRELATIONSHIPS:".to_string());
            for rel in &subgraph.relationships {
                let source = display.get(rel.source_id.as_str()).copied().unwrap_or(&rel.source_id);
                let target = display.get(rel.target_id.as_str()).copied().unwrap_or(&rel.target_id);
                let template = self.templates.get(&rel.rel_type).unwrap_or(&self.fallback);
                lines.push(format!("  - {}", template.render(source, target, &rel.rel_type)));
            }
        }

        lines.join("\n")
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
