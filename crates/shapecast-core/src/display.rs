//! # Schema Rendering
//!
//! `Display for Schema` renders the shape in a compact type-expression
//! syntax (`string[]`, `{ name: string; }`, `"a" | 42`). The rendering
//! is part of the error model: failure messages embed it, so its exact
//! form is load-bearing, not cosmetic.
//!
//! A per-render set of in-progress schema identities guards against
//! recursive schemas: a node reached again inside its own rendering
//! collapses to `CIRCULAR <kind>`.

use std::collections::HashSet;
use std::fmt;

use crate::schema::{Schema, SchemaKind};

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut in_progress = HashSet::new();
        f.write_str(&show(self, false, &mut in_progress))
    }
}

fn show(schema: &Schema, needs_parens: bool, in_progress: &mut HashSet<usize>) -> String {
    let parenthesize = |s: String| {
        if needs_parens {
            format!("({s})")
        } else {
            s
        }
    };

    if !in_progress.insert(schema.identity()) {
        return parenthesize(format!("CIRCULAR {}", schema.kind_name()));
    }

    let rendered = match &*schema.kind {
        SchemaKind::Unknown => "unknown".to_string(),
        SchemaKind::Never => "never".to_string(),
        SchemaKind::Boolean => "boolean".to_string(),
        SchemaKind::Number => "number".to_string(),
        SchemaKind::String => "string".to_string(),
        SchemaKind::Literal(literal) => literal.show(),
        SchemaKind::Enum { name, .. } => name.clone(),
        SchemaKind::Array { element, readonly } => {
            let prefix = if *readonly { "readonly " } else { "" };
            format!("{prefix}{}[]", show(element, true, in_progress))
        }
        SchemaKind::Tuple { components } => {
            let rendered: Vec<String> = components
                .iter()
                .map(|c| show(c, false, in_progress))
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        SchemaKind::Record {
            fields,
            partial,
            readonly,
        } => {
            if fields.is_empty() {
                "{}".to_string()
            } else {
                let prefix = if *readonly { "readonly " } else { "" };
                let optional = if *partial { "?" } else { "" };
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(name, field)| {
                        format!("{prefix}{name}{optional}: {};", show(field, false, in_progress))
                    })
                    .collect();
                format!("{{ {} }}", rendered.join(" "))
            }
        }
        SchemaKind::Dictionary { key, value, .. } => {
            format!(
                "{{ [_: {}]: {} }}",
                show(key, false, in_progress),
                show(value, false, in_progress)
            )
        }
        SchemaKind::Union { alternatives } => {
            let rendered: Vec<String> = alternatives
                .iter()
                .map(|a| show(a, true, in_progress))
                .collect();
            in_progress.remove(&schema.identity());
            return parenthesize(rendered.join(" | "));
        }
        SchemaKind::Intersect { intersectees } => {
            let rendered: Vec<String> = intersectees
                .iter()
                .map(|i| show(i, true, in_progress))
                .collect();
            in_progress.remove(&schema.identity());
            return parenthesize(rendered.join(" & "));
        }
        SchemaKind::Lazy(cell) => show(&cell.resolve(), needs_parens, in_progress),
        SchemaKind::Brand { entity, .. } => show(entity, needs_parens, in_progress),
        SchemaKind::Constraint {
            underlying, name, ..
        } => match name {
            Some(name) => name.clone(),
            None => show(underlying, needs_parens, in_progress),
        },
        SchemaKind::Parsed { underlying, codec } => codec.display_name_guarded(underlying, |u| {
            show(u, false, in_progress)
        }),
    };

    in_progress.remove(&schema.identity());
    rendered
}

impl crate::schema::Codec {
    /// Like `display_name`, rendering the underlying schema through
    /// the caller so the circularity guard stays threaded.
    fn display_name_guarded(
        &self,
        underlying: &Schema,
        render: impl FnOnce(&Schema) -> String,
    ) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("ParsedValue<{}>", render(underlying)),
        }
    }
}
