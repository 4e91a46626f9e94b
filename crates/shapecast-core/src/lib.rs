//! # shapecast-core — Runtime Schema Validation Engine
//!
//! This crate provides composable runtime *schemas*: values describing
//! the shape of dynamic data, able to check arbitrary input against
//! that shape, transform it to and from another representation (codec
//! semantics), and report precise, structured failures.
//!
//! ## Responsibilities
//!
//! - **Schema composition:** Primitive, literal and enum schemas plus
//!   the composite constructors — arrays, tuples, records,
//!   dictionaries, unions, intersections, lazy/recursive definitions,
//!   brands, constraints and parsed values. See [`Schema`].
//!
//! - **Cycle-safe validation:** A per-call memo of (value identity,
//!   schema identity) pairs lets self-referential values validate
//!   against recursive schemas in finite time. `validate` never panics
//!   for any input.
//!
//! - **Codec semantics:** `parse` transforms raw input into a parsed
//!   representation, `serialize` runs the inverse, and `check`/`guard`
//!   test values already in parsed form. See [`Codec`].
//!
//! - **Structured failures:** [`Failure`] carries a message, a key
//!   path into the offending structure (`items.[2].name`), and a full
//!   error tree over every simultaneously failing tuple position or
//!   record field.
//!
//! ## Design
//!
//! Schemas are immutable `Arc`-shared handles and are `Send + Sync`;
//! values use `Rc`-shared container storage so cyclic data is
//! constructible and carries the stable identity the memo keys on.
//! Unions prefer a discriminant field when every alternative is a
//! record tagging that field with a distinct literal, which yields
//! precise nested error paths instead of a generic union failure.
//!
//! ```
//! use shapecast_core::{Schema, Value};
//!
//! let package = Schema::record([
//!     ("version", Schema::literal(1)),
//!     ("size", Schema::number()),
//! ]);
//!
//! let failure = package
//!     .validate(&Value::object([
//!         ("version", Value::from(1)),
//!         ("size", Value::from("huge")),
//!     ]))
//!     .unwrap_err();
//! assert_eq!(failure.message, "Expected number, but was string");
//! assert_eq!(failure.key.as_deref(), Some("size"));
//! ```

mod display;
pub mod error;
pub mod result;
pub mod schema;
mod validate;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{SchemaError, ValidationError};
pub use result::{Failure, FullError};
pub use schema::{Codec, Schema};
pub use value::{CyclicValueError, LiteralValue, Value};
