//! # Schema Type & Constructors
//!
//! [`Schema`] is an immutable, composable description of an accepted
//! value shape: a cheaply-cloneable handle around a closed
//! [`SchemaKind`] sum type. Composites own their children; children
//! may be shared between parents. The only interior mutation anywhere
//! is the lazy variant's write-once resolution cell.
//!
//! Derived operations (`check`, `guard`, `or`, `and`, `with_*`) are
//! inherent methods, so every constructor implements only its own
//! validation logic and the uniform surface comes for free.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{SchemaError, ValidationError};
use crate::result::Failure;
use crate::validate::{inner_validate, Mode, VisitedState};
use crate::value::{LiteralValue, Value};

/// An arbitrary constraint over an already-validated value. `Err(None)`
/// is a failed check with the generic message; `Err(Some(msg))` carries
/// a custom message.
pub(crate) type ConstraintFn = Arc<dyn Fn(&Value) -> Result<(), Option<String>> + Send + Sync>;

/// A codec direction: transform a value or explain why it cannot be.
pub(crate) type CodecFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// A composable runtime description of an accepted value shape.
///
/// Schemas are immutable and referentially transparent; cloning is an
/// `Arc` bump. Validation never panics and never raises: it returns
/// `Result<Value, Failure>`, the success side carrying the (possibly
/// codec-transformed) value.
#[derive(Clone)]
pub struct Schema {
    pub(crate) kind: Arc<SchemaKind>,
}

/// The closed set of schema variants. Adding a variant means extending
/// this enum; every consumer matches exhaustively.
pub(crate) enum SchemaKind {
    Unknown,
    Never,
    Boolean,
    Number,
    String,
    Literal(LiteralValue),
    Enum {
        name: String,
        members: Vec<LiteralValue>,
    },
    Array {
        element: Schema,
        readonly: bool,
    },
    Tuple {
        components: Vec<Schema>,
    },
    Record {
        fields: BTreeMap<String, Schema>,
        partial: bool,
        readonly: bool,
    },
    Dictionary {
        key: Schema,
        value: Schema,
        base: KeyBase,
    },
    Union {
        alternatives: Vec<Schema>,
    },
    Intersect {
        intersectees: Vec<Schema>,
    },
    Lazy(LazySchema),
    Brand {
        name: String,
        entity: Schema,
    },
    Constraint {
        underlying: Schema,
        name: Option<String>,
        check: ConstraintFn,
    },
    Parsed {
        underlying: Schema,
        codec: Codec,
    },
}

// ── Constructors ─────────────────────────────────────────────────────

impl Schema {
    fn from_kind(kind: SchemaKind) -> Schema {
        Schema {
            kind: Arc::new(kind),
        }
    }

    /// Accepts anything.
    pub fn unknown() -> Schema {
        Schema::from_kind(SchemaKind::Unknown)
    }

    /// Accepts nothing.
    pub fn never() -> Schema {
        Schema::from_kind(SchemaKind::Never)
    }

    /// Accepts booleans.
    pub fn boolean() -> Schema {
        Schema::from_kind(SchemaKind::Boolean)
    }

    /// Accepts numbers.
    pub fn number() -> Schema {
        Schema::from_kind(SchemaKind::Number)
    }

    /// Accepts strings.
    pub fn string() -> Schema {
        Schema::from_kind(SchemaKind::String)
    }

    /// Accepts only `null` (a literal schema over the null value).
    pub fn null() -> Schema {
        Schema::literal(LiteralValue::Null)
    }

    /// Accepts exactly one fixed value.
    pub fn literal(value: impl Into<LiteralValue>) -> Schema {
        Schema::from_kind(SchemaKind::Literal(value.into()))
    }

    /// Accepts any member of a named set of literal values. The name
    /// is what failures and display render.
    pub fn enumeration<L>(name: impl Into<String>, members: impl IntoIterator<Item = L>) -> Schema
    where
        L: Into<LiteralValue>,
    {
        Schema::from_kind(SchemaKind::Enum {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    /// Accepts arrays whose every element matches `element`.
    pub fn array(element: Schema) -> Schema {
        Schema::from_kind(SchemaKind::Array {
            element,
            readonly: false,
        })
    }

    /// Accepts arrays of exactly `components.len()` elements, each
    /// matching the schema at its position.
    pub fn tuple(components: impl IntoIterator<Item = Schema>) -> Schema {
        Schema::from_kind(SchemaKind::Tuple {
            components: components.into_iter().collect(),
        })
    }

    /// Accepts objects declaring the given fields. Undeclared fields
    /// are allowed and pass through untouched; declared fields are
    /// required.
    pub fn record<K, I>(fields: I) -> Schema
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::from_kind(SchemaKind::Record {
            fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            partial: false,
            readonly: false,
        })
    }

    /// Like [`Schema::record`], but every declared field may be absent.
    pub fn partial<K, I>(fields: I) -> Schema
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::from_kind(SchemaKind::Record {
            fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            partial: true,
            readonly: false,
        })
    }

    /// Accepts objects with dynamic keys: every key must satisfy the
    /// key schema, every value the value schema.
    ///
    /// The key schema must describe strings or numbers: `string`,
    /// `number`, string/number literals, enumerations, and unions,
    /// constraints or lazy wrappers thereof. Anything else is a
    /// definition-time [`SchemaError::InvalidKeySchema`]. A numeric
    /// key base coerces incoming string keys to numbers before key
    /// validation.
    pub fn dictionary(key: Schema, value: Schema) -> Result<Schema, SchemaError> {
        let base = key_base(&key)?;
        Ok(Schema::from_kind(SchemaKind::Dictionary {
            key,
            value,
            base,
        }))
    }

    /// Accepts values matching at least one alternative, tried in
    /// declaration order unless a discriminant field applies.
    pub fn union(alternatives: impl IntoIterator<Item = Schema>) -> Schema {
        Schema::from_kind(SchemaKind::Union {
            alternatives: alternatives.into_iter().collect(),
        })
    }

    /// Accepts values matching every intersectee.
    pub fn intersect(intersectees: impl IntoIterator<Item = Schema>) -> Schema {
        Schema::from_kind(SchemaKind::Intersect {
            intersectees: intersectees.into_iter().collect(),
        })
    }

    /// Defer construction of the underlying schema to first use. The
    /// thunk runs at most once; its result is memoized.
    pub fn lazy(thunk: impl FnOnce() -> Schema + Send + 'static) -> Schema {
        Schema::from_kind(SchemaKind::Lazy(LazySchema::new(thunk)))
    }

    /// Build a self-referential schema: `define` receives a handle to
    /// the schema being defined and may embed it in the result.
    ///
    /// ```
    /// use shapecast_core::Schema;
    ///
    /// // A number, or arbitrarily nested arrays of the same shape.
    /// let nested = Schema::recursive(|this| {
    ///     Schema::union([Schema::number(), Schema::array(this)])
    /// });
    /// ```
    pub fn recursive<F>(define: F) -> Schema
    where
        F: FnOnce(Schema) -> Schema + Send + 'static,
    {
        let kind = Arc::new_cyclic(|weak: &Weak<SchemaKind>| {
            let weak = weak.clone();
            SchemaKind::Lazy(LazySchema::new(move || {
                let handle = Schema {
                    kind: weak
                        .upgrade()
                        .expect("the schema owning this thunk is alive while it resolves"),
                };
                define(handle)
            }))
        });
        Schema { kind }
    }

    /// Validate against `underlying`, then transform with the codec's
    /// `parse`. See [`Codec`] for the `serialize` and `test` halves.
    pub fn parsed(underlying: Schema, codec: Codec) -> Schema {
        Schema::from_kind(SchemaKind::Parsed { underlying, codec })
    }
}

// ── Combinators ──────────────────────────────────────────────────────

impl Schema {
    /// Union this schema with another.
    pub fn or(&self, other: &Schema) -> Schema {
        Schema::union([self.clone(), other.clone()])
    }

    /// Intersect this schema with another.
    pub fn and(&self, other: &Schema) -> Schema {
        Schema::intersect([self.clone(), other.clone()])
    }

    /// Constrain with an arbitrary predicate whose `Err` carries the
    /// failure message.
    pub fn with_constraint<F>(&self, constraint: F) -> Schema
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.constrained(None, move |v| constraint(v).map_err(Some))
    }

    /// Like [`Schema::with_constraint`], naming the constraint for
    /// display and dictionary-key diagnostics.
    pub fn with_constraint_named<F>(&self, name: impl Into<String>, constraint: F) -> Schema
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.constrained(Some(name.into()), move |v| constraint(v).map_err(Some))
    }

    /// Constrain with a boolean predicate; failures use the generic
    /// `Failed constraint check` message.
    pub fn with_guard<F>(&self, guard: F) -> Schema
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.constrained(None, move |v| if guard(v) { Ok(()) } else { Err(None) })
    }

    /// Like [`Schema::with_guard`], with a name.
    pub fn with_guard_named<F>(&self, name: impl Into<String>, guard: F) -> Schema
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.constrained(
            Some(name.into()),
            move |v| if guard(v) { Ok(()) } else { Err(None) },
        )
    }

    fn constrained<F>(&self, name: Option<String>, check: F) -> Schema
    where
        F: Fn(&Value) -> Result<(), Option<String>> + Send + Sync + 'static,
    {
        Schema::from_kind(SchemaKind::Constraint {
            underlying: self.clone(),
            name,
            check: Arc::new(check),
        })
    }

    /// Wrap in a nominal brand. Validation is transparent; the brand
    /// only tags the schema's meaning.
    pub fn with_brand(&self, name: impl Into<String>) -> Schema {
        Schema::from_kind(SchemaKind::Brand {
            name: name.into(),
            entity: self.clone(),
        })
    }
}

// ── Record Refinements ───────────────────────────────────────────────

impl Schema {
    /// A record retaining only the named fields. Naming an undeclared
    /// field is a definition-time error.
    pub fn pick(&self, names: &[&str]) -> Result<Schema, SchemaError> {
        let (fields, partial, readonly) = self.record_parts("pick")?;
        let mut kept = BTreeMap::new();
        for name in names {
            let schema = fields
                .get(*name)
                .ok_or_else(|| SchemaError::UnknownField(name.to_string()))?;
            kept.insert(name.to_string(), schema.clone());
        }
        Ok(Schema::from_kind(SchemaKind::Record {
            fields: kept,
            partial,
            readonly,
        }))
    }

    /// A record without the named fields. Names the record does not
    /// declare are ignored.
    pub fn omit(&self, names: &[&str]) -> Result<Schema, SchemaError> {
        let (fields, partial, readonly) = self.record_parts("omit")?;
        let kept = fields
            .iter()
            .filter(|(k, _)| !names.contains(&k.as_str()))
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        Ok(Schema::from_kind(SchemaKind::Record {
            fields: kept,
            partial,
            readonly,
        }))
    }

    /// The same record with every field optional.
    pub fn as_partial(&self) -> Result<Schema, SchemaError> {
        let (fields, _, readonly) = self.record_parts("as_partial")?;
        Ok(Schema::from_kind(SchemaKind::Record {
            fields: fields.clone(),
            partial: true,
            readonly,
        }))
    }

    /// The same record or array, marked readonly. The flag affects
    /// display only; validation is unchanged.
    pub fn as_readonly(&self) -> Result<Schema, SchemaError> {
        match &*self.kind {
            SchemaKind::Record {
                fields, partial, ..
            } => Ok(Schema::from_kind(SchemaKind::Record {
                fields: fields.clone(),
                partial: *partial,
                readonly: true,
            })),
            SchemaKind::Array { element, .. } => Ok(Schema::from_kind(SchemaKind::Array {
                element: element.clone(),
                readonly: true,
            })),
            _ => Err(SchemaError::UnsupportedRefinement {
                operation: "as_readonly",
                kind: self.kind_name(),
            }),
        }
    }

    fn record_parts(
        &self,
        operation: &'static str,
    ) -> Result<(&BTreeMap<String, Schema>, bool, bool), SchemaError> {
        match &*self.kind {
            SchemaKind::Record {
                fields,
                partial,
                readonly,
            } => Ok((fields, *partial, *readonly)),
            _ => Err(SchemaError::UnsupportedRefinement {
                operation,
                kind: self.kind_name(),
            }),
        }
    }
}

// ── Validation Surface ───────────────────────────────────────────────

impl Schema {
    /// Validate a value, returning the (possibly codec-transformed)
    /// result or a structured [`Failure`]. Never panics, for any
    /// input, including cyclic values against recursive schemas.
    pub fn validate(&self, value: &Value) -> Result<Value, Failure> {
        let mut visited = VisitedState::new();
        inner_validate(self, value, &mut visited, Mode::Parse)
    }

    /// Alias of [`Schema::validate`] emphasising the codec direction:
    /// raw representation in, parsed representation out.
    pub fn parse(&self, value: &Value) -> Result<Value, Failure> {
        self.validate(value)
    }

    /// Check a value already in its parsed representation, raising a
    /// [`ValidationError`] on mismatch. On codec schemas this runs the
    /// `test` side; a codec without `test` fails loudly here.
    pub fn check(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut visited = VisitedState::new();
        inner_validate(self, value, &mut visited, Mode::Test).map_err(ValidationError::from)
    }

    /// Boolean form of [`Schema::check`].
    pub fn guard(&self, value: &Value) -> bool {
        let mut visited = VisitedState::new();
        inner_validate(self, value, &mut visited, Mode::Test).is_ok()
    }

    /// The codec inverse of [`Schema::parse`]: parsed representation
    /// in, raw representation out. On non-codec schemas this is plain
    /// validation.
    pub fn serialize(&self, value: &Value) -> Result<Value, Failure> {
        let mut visited = VisitedState::new();
        inner_validate(self, value, &mut visited, Mode::Serialize)
    }

    /// Stable identity of this schema node, used by the per-call cycle
    /// memo and the display circularity guard.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.kind) as usize
    }

    /// The variant name, used in refinement errors and circular
    /// display.
    pub(crate) fn kind_name(&self) -> &'static str {
        match &*self.kind {
            SchemaKind::Unknown => "unknown",
            SchemaKind::Never => "never",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Number => "number",
            SchemaKind::String => "string",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Dictionary { .. } => "dictionary",
            SchemaKind::Union { .. } => "union",
            SchemaKind::Intersect { .. } => "intersect",
            SchemaKind::Lazy(_) => "lazy",
            SchemaKind::Brand { .. } => "brand",
            SchemaKind::Constraint { .. } => "constraint",
            SchemaKind::Parsed { .. } => "parsed",
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema<{self}>")
    }
}

// ── Lazy Resolution ──────────────────────────────────────────────────

/// A deferred schema: a thunk taken exactly once, and a write-once
/// cell memoizing its result. Resolution is thread-safe; a lazy
/// schema must not force itself from inside its own thunk.
pub(crate) struct LazySchema {
    thunk: Mutex<Option<Box<dyn FnOnce() -> Schema + Send>>>,
    resolved: OnceCell<Schema>,
}

impl LazySchema {
    fn new(thunk: impl FnOnce() -> Schema + Send + 'static) -> LazySchema {
        LazySchema {
            thunk: Mutex::new(Some(Box::new(thunk))),
            resolved: OnceCell::new(),
        }
    }

    pub(crate) fn resolve(&self) -> Schema {
        self.resolved
            .get_or_init(|| {
                tracing::trace!("resolving lazy schema");
                let thunk = self
                    .thunk
                    .lock()
                    .take()
                    .expect("lazy schema thunk runs at most once");
                thunk()
            })
            .clone()
    }
}

// ── Codec Configuration ──────────────────────────────────────────────

/// The transformation half of a parsed-value schema: a mandatory
/// `parse`, and optional `serialize` (the inverse), `test` (a schema
/// for the parsed representation) and display name.
#[derive(Clone)]
pub struct Codec {
    pub(crate) name: Option<String>,
    pub(crate) parse: CodecFn,
    pub(crate) serialize: Option<CodecFn>,
    pub(crate) test: Option<Schema>,
}

impl Codec {
    /// A codec that only parses.
    pub fn new<F>(parse: F) -> Codec
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Codec {
            name: None,
            parse: Arc::new(parse),
            serialize: None,
            test: None,
        }
    }

    /// Name the codec for display and failure messages.
    pub fn named(mut self, name: impl Into<String>) -> Codec {
        self.name = Some(name.into());
        self
    }

    /// Provide the inverse transformation.
    pub fn with_serialize<F>(mut self, serialize: F) -> Codec
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    /// Provide a schema for the parsed representation. Without one,
    /// parsing is accepted unchecked and direct checks fail loudly.
    pub fn with_test(mut self, test: Schema) -> Codec {
        self.test = Some(test);
        self
    }

    /// The display name: the given one, or `ParsedValue<underlying>`.
    pub(crate) fn display_name(&self, underlying: &Schema) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("ParsedValue<{underlying}>"),
        }
    }
}

// ── Dictionary Key Analysis ──────────────────────────────────────────

/// The primitive base of a dictionary key schema, computed once at
/// construction. Numeric bases coerce incoming string keys to numbers
/// before key validation; mixed bases try number first, then string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyBase {
    Str,
    Num,
    Mixed,
}

impl KeyBase {
    fn merge(self, other: KeyBase) -> KeyBase {
        if self == other {
            self
        } else {
            KeyBase::Mixed
        }
    }
}

fn key_base(schema: &Schema) -> Result<KeyBase, SchemaError> {
    let invalid = || SchemaError::InvalidKeySchema {
        shown: schema.to_string(),
    };
    match &*schema.kind {
        SchemaKind::String => Ok(KeyBase::Str),
        SchemaKind::Number => Ok(KeyBase::Num),
        SchemaKind::Literal(LiteralValue::String(_)) => Ok(KeyBase::Str),
        SchemaKind::Literal(LiteralValue::Number(_)) => Ok(KeyBase::Num),
        SchemaKind::Enum { members, .. } => {
            let mut base: Option<KeyBase> = None;
            for member in members {
                let next = match member {
                    LiteralValue::String(_) => KeyBase::Str,
                    LiteralValue::Number(_) => KeyBase::Num,
                    _ => return Err(invalid()),
                };
                base = Some(base.map_or(next, |b| b.merge(next)));
            }
            base.ok_or_else(invalid)
        }
        SchemaKind::Union { alternatives } => {
            let mut base: Option<KeyBase> = None;
            for alternative in alternatives {
                let next = key_base(alternative)?;
                base = Some(base.map_or(next, |b| b.merge(next)));
            }
            base.ok_or_else(invalid)
        }
        SchemaKind::Constraint { underlying, .. } => key_base(underlying),
        SchemaKind::Lazy(cell) => key_base(&cell.resolve()),
        _ => Err(invalid()),
    }
}
