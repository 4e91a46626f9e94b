//! # Validation Engine
//!
//! One recursive descent handles all three directions of the engine:
//!
//! - `Parse`: check a raw value and apply codec transforms.
//! - `Test`: check a value already in its parsed representation.
//! - `Serialize`: run codecs in reverse, parsed back to raw.
//!
//! The descent threads a per-call [`VisitedState`] keyed on (value
//! identity, schema identity). Revisiting a pair means the same
//! container is being validated against the same schema node further
//! up the stack, so it short-circuits to success; that is what makes
//! cyclic values validate against recursive schemas in finite time.
//! Mode transitions inside codec schemas start a fresh state, since a
//! pair proven in one direction says nothing about another.

use std::collections::{BTreeMap, HashSet};

use crate::result::{Failure, FullError};
use crate::schema::{Codec, KeyBase, Schema, SchemaKind};
use crate::value::{LiteralValue, Value};

/// Which direction a descent is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Parse,
    Test,
    Serialize,
}

/// The (value identity, schema identity) pairs currently assumed to
/// hold in this call. Primitives carry no identity and never memoize.
pub(crate) struct VisitedState {
    seen: HashSet<(usize, usize)>,
}

impl VisitedState {
    pub(crate) fn new() -> VisitedState {
        VisitedState {
            seen: HashSet::new(),
        }
    }

    /// Mark the pair, reporting whether it was already present.
    fn check_and_mark(&mut self, value: &Value, schema: &Schema) -> bool {
        match value.identity() {
            Some(id) => !self.seen.insert((id, schema.identity())),
            None => false,
        }
    }
}

pub(crate) fn inner_validate(
    schema: &Schema,
    value: &Value,
    visited: &mut VisitedState,
    mode: Mode,
) -> Result<Value, Failure> {
    if visited.check_and_mark(value, schema) {
        tracing::trace!(kind = schema.kind_name(), "cycle short-circuit");
        return Ok(value.clone());
    }

    match &*schema.kind {
        SchemaKind::Unknown => Ok(value.clone()),

        SchemaKind::Never => Err(Failure::new(format!(
            "Expected nothing, but was {}",
            value.show()
        ))),

        SchemaKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(Failure::expected("boolean", value.kind())),
        },

        SchemaKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(Failure::expected("number", value.kind())),
        },

        SchemaKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(Failure::expected("string", value.kind())),
        },

        SchemaKind::Literal(literal) => {
            if literal.matches(value) {
                Ok(value.clone())
            } else {
                Err(Failure::new(format!(
                    "Expected literal {}, but was {}",
                    literal.show(),
                    value.show()
                )))
            }
        }

        SchemaKind::Enum { name, members } => {
            if members.iter().any(|m| m.matches(value)) {
                Ok(value.clone())
            } else {
                Err(Failure::expected(name, value.show()))
            }
        }

        SchemaKind::Array { element, .. } => {
            let Some(items) = value.as_array() else {
                return Err(Failure::expected(schema, value.kind()));
            };
            // Snapshot before recursing so a cyclic array cannot hold
            // the borrow across its own validation.
            let items: Vec<Value> = items.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let validated = inner_validate(element, item, visited, mode)
                    .map_err(|failure| failure.at_index(index))?;
                out.push(validated);
            }
            Ok(match mode {
                Mode::Test => value.clone(),
                Mode::Parse | Mode::Serialize => Value::array(out),
            })
        }

        SchemaKind::Tuple { components } => {
            let Some(items) = value.as_array() else {
                return Err(Failure::expected(schema, value.kind()));
            };
            let items: Vec<Value> = items.borrow().clone();
            if items.len() != components.len() {
                return Err(Failure::new(format!(
                    "Expected an array of length {}, but was {}",
                    components.len(),
                    items.len()
                )));
            }
            let mut out = Vec::with_capacity(items.len());
            let mut failures: Vec<(usize, Failure)> = Vec::new();
            for (index, (component, item)) in components.iter().zip(&items).enumerate() {
                match inner_validate(component, item, visited, mode) {
                    Ok(validated) => out.push(validated),
                    Err(failure) => failures.push((index, failure)),
                }
            }
            if !failures.is_empty() {
                let details = failures
                    .iter()
                    .map(|(index, failure)| {
                        detail(format!("The types of [{index}] are not compatible"), failure)
                    })
                    .collect();
                let (first_index, first) = failures.swap_remove(0);
                let mut first = first.at_index(first_index);
                first.full_error = Some(FullError {
                    title: format!("Unable to assign {} to {}", value.show(), schema),
                    details,
                });
                return Err(first);
            }
            Ok(match mode {
                Mode::Test => value.clone(),
                Mode::Parse | Mode::Serialize => Value::array(out),
            })
        }

        SchemaKind::Record {
            fields, partial, ..
        } => {
            let Some(entries) = value.as_object() else {
                return Err(Failure::expected(schema, value.kind()));
            };
            let entries: BTreeMap<String, Value> = entries.borrow().clone();
            // Undeclared fields pass through untouched.
            let mut out = entries.clone();
            let mut failures: Vec<(String, Failure)> = Vec::new();
            for (name, field_schema) in fields {
                match entries.get(name) {
                    None => {
                        if !partial {
                            failures.push((
                                name.clone(),
                                Failure::expected(field_schema, "missing").at_field(name),
                            ));
                        }
                    }
                    Some(present) => match inner_validate(field_schema, present, visited, mode) {
                        Ok(validated) => {
                            out.insert(name.clone(), validated);
                        }
                        Err(failure) => failures.push((name.clone(), failure.at_field(name))),
                    },
                }
            }
            if !failures.is_empty() {
                let details = failures
                    .iter()
                    .map(|(name, failure)| {
                        detail(format!("The types of {name:?} are not compatible"), failure)
                    })
                    .collect();
                let (_, mut first) = failures.swap_remove(0);
                first.full_error = Some(FullError {
                    title: format!("Unable to assign {} to {}", value.show(), schema),
                    details,
                });
                return Err(first);
            }
            Ok(match mode {
                Mode::Test => value.clone(),
                Mode::Parse | Mode::Serialize => Value::object(out),
            })
        }

        SchemaKind::Dictionary {
            key,
            value: value_schema,
            base,
        } => {
            let Some(entries) = value.as_object() else {
                return Err(Failure::expected(schema, value.kind()));
            };
            let entries: BTreeMap<String, Value> = entries.borrow().clone();
            let mut out = BTreeMap::new();
            for (name, entry) in &entries {
                validate_dictionary_key(key, *base, name)?;
                let validated = inner_validate(value_schema, entry, visited, mode)
                    .map_err(|failure| failure.at_field(name))?;
                out.insert(name.clone(), validated);
            }
            Ok(match mode {
                Mode::Test => value.clone(),
                Mode::Parse | Mode::Serialize => Value::object(out),
            })
        }

        SchemaKind::Union { alternatives } => {
            if let Some(chosen) = resolve_discriminant(alternatives, value) {
                tracing::debug!(
                    alternatives = alternatives.len(),
                    "union resolved via discriminant field"
                );
                return inner_validate(&chosen, value, visited, mode);
            }
            for alternative in alternatives {
                if let Ok(validated) = inner_validate(alternative, value, visited, mode) {
                    return Ok(validated);
                }
            }
            Err(Failure::expected(schema, value.kind()))
        }

        SchemaKind::Intersect { intersectees } => {
            let mut out = value.clone();
            for intersectee in intersectees {
                out = inner_validate(intersectee, value, visited, mode)?;
            }
            Ok(out)
        }

        SchemaKind::Lazy(cell) => inner_validate(&cell.resolve(), value, visited, mode),

        SchemaKind::Brand { entity, .. } => inner_validate(entity, value, visited, mode),

        SchemaKind::Constraint {
            underlying,
            name,
            check,
        } => {
            // In the serialize direction the value is already in its
            // constrained form, so the check runs before the inverse.
            if mode == Mode::Serialize {
                run_check(check, value, name)?;
                inner_validate(underlying, value, visited, mode)
            } else {
                let validated = inner_validate(underlying, value, visited, mode)?;
                run_check(check, &validated, name)?;
                Ok(validated)
            }
        }

        SchemaKind::Parsed { underlying, codec } => match mode {
            Mode::Parse => {
                let validated = inner_validate(underlying, value, visited, Mode::Parse)?;
                let parsed = (codec.parse)(&validated).map_err(Failure::new)?;
                if let Some(test) = &codec.test {
                    let mut fresh = VisitedState::new();
                    inner_validate(test, &parsed, &mut fresh, Mode::Test)?;
                }
                Ok(parsed)
            }
            Mode::Test => match &codec.test {
                Some(test) => inner_validate(test, value, visited, Mode::Test),
                None => Err(unsupported(codec, underlying, "test")),
            },
            Mode::Serialize => {
                let Some(serialize) = &codec.serialize else {
                    return Err(unsupported(codec, underlying, "serialize"));
                };
                if let Some(test) = &codec.test {
                    let mut fresh = VisitedState::new();
                    inner_validate(test, value, &mut fresh, Mode::Test)?;
                }
                let raw = serialize(value).map_err(Failure::new)?;
                inner_validate(underlying, &raw, visited, Mode::Serialize)
            }
        },
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// One full-error child per failing position or field, nesting the
/// child failure's own tree when it has one.
fn detail(title: String, failure: &Failure) -> FullError {
    let nested = failure
        .full_error
        .clone()
        .unwrap_or_else(|| FullError::leaf(failure.message.clone()));
    FullError {
        title,
        details: vec![nested],
    }
}

fn unsupported(codec: &Codec, underlying: &Schema, operation: &str) -> Failure {
    Failure::new(format!(
        "{} does not support {operation}",
        codec.display_name(underlying)
    ))
}

fn run_check(
    check: &crate::schema::ConstraintFn,
    value: &Value,
    name: &Option<String>,
) -> Result<(), Failure> {
    check(value).map_err(|message| match message {
        Some(message) => Failure::new(message),
        None => Failure::new(format!(
            "Failed {} check",
            name.as_deref().unwrap_or("constraint")
        )),
    })
}

/// Validate one dictionary key string against the key schema. Keys
/// were stored as strings, so a numeric base first coerces the string
/// back to a number; a mixed base tries number, then string.
fn validate_dictionary_key(key: &Schema, base: KeyBase, name: &str) -> Result<(), Failure> {
    // "NaN" parses, but is not a number any key schema should see.
    let as_number = name
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .map(Value::Number);
    let key_failure = || {
        Failure::new(format!(
            "Expected dictionary key to be {key}, but was '{name}'"
        ))
    };
    let accepts = |candidate: &Value| {
        let mut fresh = VisitedState::new();
        inner_validate(key, candidate, &mut fresh, Mode::Test).is_ok()
    };
    match base {
        KeyBase::Num => {
            let number = as_number.ok_or_else(|| {
                Failure::new(format!(
                    "Expected dictionary key to be a number, but was '{name}'"
                ))
            })?;
            if accepts(&number) {
                Ok(())
            } else {
                Err(key_failure())
            }
        }
        KeyBase::Str => {
            if accepts(&Value::String(name.to_string())) {
                Ok(())
            } else {
                Err(key_failure())
            }
        }
        KeyBase::Mixed => {
            if as_number.is_some_and(|n| accepts(&n))
                || accepts(&Value::String(name.to_string()))
            {
                Ok(())
            } else {
                Err(key_failure())
            }
        }
    }
}

/// Find the alternative selected by a discriminant field, if the union
/// has one and the value carries a matching tag.
///
/// A field qualifies only when every alternative, after resolving
/// `Lazy` wrappers (and only those), is a record declaring that field
/// as a literal, with all the literals pairwise distinct.
fn resolve_discriminant(alternatives: &[Schema], value: &Value) -> Option<Schema> {
    let entries = value.as_object()?;

    let mut literal_fields: BTreeMap<String, Vec<LiteralValue>> = BTreeMap::new();
    for alternative in alternatives {
        let resolved = resolve_lazy(alternative);
        if let SchemaKind::Record { fields, .. } = &*resolved.kind {
            for (name, field) in fields {
                let field = resolve_lazy(field);
                if let SchemaKind::Literal(literal) = &*field.kind {
                    let known = literal_fields.entry(name.clone()).or_default();
                    if !known.contains(literal) {
                        known.push(literal.clone());
                    }
                }
            }
        }
    }

    for (name, literals) in &literal_fields {
        if literals.len() != alternatives.len() {
            continue;
        }
        let Some(tag) = entries.borrow().get(name).cloned() else {
            continue;
        };
        for alternative in alternatives {
            let resolved = resolve_lazy(alternative);
            if let SchemaKind::Record { fields, .. } = &*resolved.kind {
                if let Some(field) = fields.get(name) {
                    if let SchemaKind::Literal(literal) = &*resolve_lazy(field).kind {
                        if literal.matches(&tag) {
                            return Some(resolved);
                        }
                    }
                }
            }
        }
        // A tag matching no alternative tries the next candidate
        // field; with none left, validation falls back to order-try.
    }
    None
}

fn resolve_lazy(schema: &Schema) -> Schema {
    let mut current = schema.clone();
    loop {
        let next = match &*current.kind {
            SchemaKind::Lazy(cell) => cell.resolve(),
            _ => return current,
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schema;

    #[test]
    fn primitive_mismatch_messages() {
        let failure = Schema::number().validate(&Value::from("x")).unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");

        let failure = Schema::string().validate(&Value::Null).unwrap_err();
        assert_eq!(failure.message, "Expected string, but was null");

        let failure = Schema::boolean().validate(&Value::array([])).unwrap_err();
        assert_eq!(failure.message, "Expected boolean, but was array");
    }

    #[test]
    fn never_shows_the_value() {
        let failure = Schema::never().validate(&Value::from(42)).unwrap_err();
        assert_eq!(failure.message, "Expected nothing, but was 42");
    }

    #[test]
    fn unknown_accepts_everything() {
        assert!(Schema::unknown().guard(&Value::Null));
        assert!(Schema::unknown().guard(&Value::object([("k", Value::from(1))])));
    }

    #[test]
    fn literal_mismatch_message() {
        let failure = Schema::literal(42).validate(&Value::from(24)).unwrap_err();
        assert_eq!(failure.message, "Expected literal 42, but was 24");

        let failure = Schema::literal("42").validate(&Value::from("24")).unwrap_err();
        assert_eq!(failure.message, "Expected literal \"42\", but was \"24\"");

        assert!(Schema::null().guard(&Value::Null));
    }

    #[test]
    fn enum_matches_members_or_names_itself() {
        let day = Schema::enumeration("Day", ["mon", "tue", "wed"]);
        assert!(day.guard(&Value::from("tue")));
        let failure = day.validate(&Value::from("sun")).unwrap_err();
        assert_eq!(failure.message, "Expected Day, but was \"sun\"");
    }

    #[test]
    fn array_failures_carry_index_keys() {
        let schema = Schema::array(Schema::number());
        let failure = schema
            .validate(&Value::array([
                Value::from(1),
                Value::from("x"),
                Value::from(3),
            ]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");
        assert_eq!(failure.key.as_deref(), Some("[1]"));

        let nested = Schema::array(Schema::record([("n", Schema::number())]));
        let failure = nested
            .validate(&Value::array([Value::object([("n", Value::from("x"))])]))
            .unwrap_err();
        assert_eq!(failure.key.as_deref(), Some("[0].n"));
    }

    #[test]
    fn tuple_length_and_position_failures() {
        let schema = Schema::tuple([Schema::number(), Schema::string()]);

        let failure = schema
            .validate(&Value::array([Value::from(1)]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected an array of length 2, but was 1");

        let failure = schema
            .validate(&Value::array([Value::from("a"), Value::from(2)]))
            .unwrap_err();
        // The lowest failing position wins the one-line summary.
        assert_eq!(failure.message, "Expected number, but was string");
        assert_eq!(failure.key.as_deref(), Some("[0]"));
        let tree = failure.full_error.unwrap();
        assert_eq!(tree.title, "Unable to assign [\"a\", 2] to [number, string]");
        assert_eq!(tree.details.len(), 2);
        assert_eq!(tree.details[0].title, "The types of [0] are not compatible");
        assert_eq!(tree.details[1].title, "The types of [1] are not compatible");
    }

    #[test]
    fn record_missing_and_mismatched_fields() {
        let schema = Schema::record([("version", Schema::literal(1)), ("size", Schema::number())]);

        let failure = schema
            .validate(&Value::object([("version", Value::from(1))]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected number, but was missing");
        assert_eq!(failure.key.as_deref(), Some("size"));

        let failure = schema
            .validate(&Value::object([
                ("version", Value::from(1)),
                ("size", Value::from("x")),
            ]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");
        assert_eq!(failure.key.as_deref(), Some("size"));
        let tree = failure.full_error.unwrap();
        assert_eq!(
            tree.details[0].title,
            "The types of \"size\" are not compatible"
        );
    }

    #[test]
    fn record_passes_undeclared_fields_through() {
        let schema = Schema::record([("a", Schema::number())]);
        let result = schema
            .validate(&Value::object([
                ("a", Value::from(1)),
                ("extra", Value::from("kept")),
            ]))
            .unwrap();
        let entries = result.as_object().unwrap().borrow().clone();
        assert_eq!(entries.get("extra"), Some(&Value::from("kept")));
    }

    #[test]
    fn dictionary_keyed_by_number() {
        let schema = Schema::dictionary(Schema::number(), Schema::string()).unwrap();

        assert!(schema.guard(&Value::object([
            ("3.14", Value::from("pi")),
            ("42", Value::from("answer")),
        ])));

        let failure = schema
            .validate(&Value::object([("foo", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(
            failure.message,
            "Expected dictionary key to be a number, but was 'foo'"
        );
    }

    #[test]
    fn dictionary_rejects_nan_keys() {
        let schema = Schema::dictionary(Schema::number(), Schema::string()).unwrap();
        let failure = schema
            .validate(&Value::object([("NaN", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(
            failure.message,
            "Expected dictionary key to be a number, but was 'NaN'"
        );

        // A mixed string-or-number key base still accepts "NaN" as a
        // plain string key.
        let mixed = Schema::dictionary(
            Schema::union([Schema::string(), Schema::number()]),
            Schema::string(),
        )
        .unwrap();
        assert!(mixed.guard(&Value::object([("NaN", Value::from("x"))])));
    }

    #[test]
    fn dictionary_named_constraint_key() {
        let integer = Schema::number().with_guard_named("Integer", |v| {
            matches!(v, Value::Number(n) if n.fract() == 0.0)
        });
        let schema = Schema::dictionary(integer, Schema::string()).unwrap();

        assert!(schema.guard(&Value::object([("42", Value::from("ok"))])));
        let failure = schema
            .validate(&Value::object([("3.14", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(
            failure.message,
            "Expected dictionary key to be Integer, but was '3.14'"
        );
    }

    #[test]
    fn dictionary_value_failures_carry_key_path() {
        let schema = Schema::dictionary(Schema::string(), Schema::number()).unwrap();
        let failure = schema
            .validate(&Value::object([("count", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");
        assert_eq!(failure.key.as_deref(), Some("count"));
    }

    #[test]
    fn union_discriminant_dispatch_gives_precise_keys() {
        let square = Schema::record([("kind", Schema::literal("square")), ("x", Schema::number())]);
        let circle = Schema::record([("kind", Schema::literal("circle")), ("r", Schema::number())]);
        let shape = Schema::union([square, circle]);

        let failure = shape
            .validate(&Value::object([
                ("kind", Value::from("square")),
                ("x", Value::from("big")),
            ]))
            .unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");
        assert_eq!(failure.key.as_deref(), Some("x"));
    }

    #[test]
    fn union_fallback_is_generic_and_keyless() {
        let shape = Schema::union([Schema::number(), Schema::string()]);
        let failure = shape.validate(&Value::from(true)).unwrap_err();
        assert_eq!(failure.message, "Expected number | string, but was boolean");
        assert_eq!(failure.key, None);

        // An ambiguous tag (same literal in two alternatives) cannot
        // discriminate, so the failure is the keyless generic one.
        let a = Schema::record([("kind", Schema::literal("x")), ("a", Schema::number())]);
        let b = Schema::record([("kind", Schema::literal("x")), ("b", Schema::number())]);
        let ambiguous = Schema::union([a, b]);
        let failure = ambiguous
            .validate(&Value::object([
                ("kind", Value::from("x")),
                ("a", Value::from("bad")),
            ]))
            .unwrap_err();
        assert_eq!(failure.key, None);
    }

    #[test]
    fn union_unmatched_tag_falls_back() {
        let square = Schema::record([("kind", Schema::literal("square"))]);
        let circle = Schema::record([("kind", Schema::literal("circle"))]);
        let shape = Schema::union([square, circle]);
        let failure = shape
            .validate(&Value::object([("kind", Value::from("other"))]))
            .unwrap_err();
        assert_eq!(failure.key, None);
        assert!(failure.message.starts_with("Expected"));
    }

    #[test]
    fn intersect_reports_first_violation() {
        let schema = Schema::intersect([
            Schema::record([("a", Schema::number())]),
            Schema::record([("b", Schema::string())]),
        ]);
        assert!(schema.guard(&Value::object([
            ("a", Value::from(1)),
            ("b", Value::from("x")),
        ])));

        let failure = schema
            .validate(&Value::object([("b", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(failure.key.as_deref(), Some("a"));
    }

    #[test]
    fn brand_is_transparent() {
        let schema = Schema::string().with_brand("UserId");
        assert!(schema.guard(&Value::from("u-1")));
        let failure = schema.validate(&Value::from(1)).unwrap_err();
        assert_eq!(failure.message, "Expected string, but was number");
    }

    #[test]
    fn constraint_messages() {
        let positive = Schema::number()
            .with_constraint(|v| match v {
                Value::Number(n) if *n > 0.0 => Ok(()),
                _ => Err("value must be positive".to_string()),
            });
        let failure = positive.validate(&Value::from(-1)).unwrap_err();
        assert_eq!(failure.message, "value must be positive");

        let anon = Schema::number().with_guard(|v| matches!(v, Value::Number(n) if *n > 0.0));
        let failure = anon.validate(&Value::from(-1)).unwrap_err();
        assert_eq!(failure.message, "Failed constraint check");

        let named = Schema::number()
            .with_guard_named("Positive", |v| matches!(v, Value::Number(n) if *n > 0.0));
        let failure = named.validate(&Value::from(-1)).unwrap_err();
        assert_eq!(failure.message, "Failed Positive check");

        // The underlying schema is checked before the predicate runs.
        let failure = named.validate(&Value::from("x")).unwrap_err();
        assert_eq!(failure.message, "Expected number, but was string");
    }

    fn doubled_number() -> Schema {
        Schema::parsed(
            Schema::number(),
            crate::Codec::new(|v| match v {
                Value::Number(n) => Ok(Value::Number(n * 2.0)),
                _ => Err("expected a number".to_string()),
            })
            .named("DoubledNumber")
            .with_serialize(|v| match v {
                Value::Number(n) => Ok(Value::Number(n / 2.0)),
                _ => Err("expected a number".to_string()),
            })
            .with_test(Schema::number()),
        )
    }

    #[test]
    fn parsed_transforms_on_parse() {
        let schema = doubled_number();
        assert_eq!(schema.parse(&Value::from(21)).unwrap(), Value::from(42));
        assert_eq!(schema.serialize(&Value::from(42)).unwrap(), Value::from(21));
        // Round trip back to the canonical raw form.
        let raw = Value::from(21);
        let parsed = schema.parse(&raw).unwrap();
        assert_eq!(schema.serialize(&parsed).unwrap(), raw);
    }

    #[test]
    fn parsed_without_test_rejects_checks() {
        let schema = Schema::parsed(
            Schema::string(),
            crate::Codec::new(|v| match v {
                Value::String(s) => Ok(Value::from(s.trim())),
                _ => Err("expected a string".to_string()),
            })
            .named("TrimmedString"),
        );
        let err = schema.check(&Value::from("x")).unwrap_err();
        assert_eq!(err.message(), "TrimmedString does not support test");
        assert!(!schema.guard(&Value::from("x")));

        let anonymous = Schema::parsed(
            Schema::string(),
            crate::Codec::new(|v| Ok(v.clone())),
        );
        let err = anonymous.check(&Value::from("x")).unwrap_err();
        assert_eq!(err.message(), "ParsedValue<string> does not support test");
    }

    #[test]
    fn parsed_without_serialize_rejects_serialization() {
        let schema = Schema::parsed(
            Schema::number(),
            crate::Codec::new(|v| match v {
                Value::Number(n) => Ok(Value::Number(n * 2.0)),
                _ => Err("expected a number".to_string()),
            })
            .named("DoubledNumber")
            .with_test(Schema::number()),
        );
        let failure = schema.serialize(&Value::from(42)).unwrap_err();
        assert_eq!(failure.message, "DoubledNumber does not support serialize");
    }

    #[test]
    fn parsed_check_uses_the_test_schema() {
        let schema = doubled_number();
        assert!(schema.guard(&Value::from(42)));
        assert!(!schema.guard(&Value::from("x")));
    }

    #[test]
    fn parse_rebuilds_containers() {
        let schema = Schema::record([("n", doubled_number())]);
        let input = Value::object([("n", Value::from(21))]);
        let parsed = schema.parse(&input).unwrap();
        assert_eq!(parsed, Value::object([("n", Value::from(42))]));
        // The input is untouched.
        assert_eq!(input, Value::object([("n", Value::from(21))]));
    }

    #[test]
    fn cyclic_value_against_recursive_schema_terminates() {
        let schema = Schema::recursive(|this| {
            Schema::union([Schema::number(), Schema::array(this)])
        });

        let v = Value::array([Value::from(1), Value::Null]);
        v.as_array().unwrap().borrow_mut()[1] = v.clone();
        assert!(schema.guard(&v));

        // The same cyclic value fails when the element type forbids it.
        let strings = Schema::recursive(|this| {
            Schema::union([Schema::string(), Schema::array(this)])
        });
        assert!(!strings.guard(&v));
    }

    #[test]
    fn mutual_recursion_via_lazy() {
        // A linked list: { head: number, tail: list | null }
        let list = Schema::recursive(|this| {
            Schema::record([
                ("head", Schema::number()),
                ("tail", Schema::union([this, Schema::null()])),
            ])
        });
        let value = Value::object([
            ("head", Value::from(1)),
            (
                "tail",
                Value::object([("head", Value::from(2)), ("tail", Value::Null)]),
            ),
        ]);
        assert!(list.guard(&value));

        let bad = Value::object([("head", Value::from(1)), ("tail", Value::from(5))]);
        assert!(!list.guard(&bad));
    }
}
