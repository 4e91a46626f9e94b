//! # Validation Results
//!
//! A failed validation is a [`Failure`]: a single best message, an
//! optional key path locating the failure inside the validated
//! structure, and an optional [`FullError`] tree capturing every
//! simultaneous candidate failure (tuple positions, record fields).
//! Failures are returned, never raised; only
//! [`Schema::check`](crate::Schema::check) converts one into a raised
//! [`ValidationError`](crate::ValidationError).

use std::fmt;

use serde::Serialize;

/// A failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// The reason validation failed.
    pub message: String,
    /// Dotted/bracketed path locating the failure, e.g. `[2].name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Tree of every simultaneous candidate failure, built only at
    /// tuple/record boundaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_error: Option<FullError>,
}

impl Failure {
    /// A failure with a message and no location.
    pub fn new(message: impl Into<String>) -> Failure {
        Failure {
            message: message.into(),
            key: None,
            full_error: None,
        }
    }

    /// The standard mismatch message: `Expected <x>, but was <y>`.
    pub fn expected(expected: impl fmt::Display, actual: impl fmt::Display) -> Failure {
        Failure::new(format!("Expected {expected}, but was {actual}"))
    }

    /// Prefix the key path with an array index segment: a failure at
    /// key `name` under index 2 becomes `[2].name`.
    pub fn at_index(mut self, index: usize) -> Failure {
        self.key = Some(match self.key {
            Some(rest) => format!("[{index}].{rest}"),
            None => format!("[{index}]"),
        });
        self
    }

    /// Prefix the key path with a field or dictionary-key segment.
    pub fn at_field(mut self, field: &str) -> Failure {
        self.key = Some(match self.key {
            Some(rest) => format!("{field}.{rest}"),
            None => field.to_string(),
        });
        self
    }

    /// Render for humans: the full error tree when present, otherwise
    /// `<message> in <key>` or just the message.
    pub fn show(&self) -> String {
        if let Some(full) = &self.full_error {
            return full.render();
        }
        match &self.key {
            Some(key) => format!("{} in {}", self.message, key),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show())
    }
}

/// A node in the full-error tree: a title plus nested detail nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullError {
    /// What went wrong at this level.
    pub title: String,
    /// Failures nested one level deeper.
    pub details: Vec<FullError>,
}

impl FullError {
    /// A tree root with no details yet.
    pub fn new(title: impl Into<String>) -> FullError {
        FullError {
            title: title.into(),
            details: Vec::new(),
        }
    }

    /// A leaf node.
    pub fn leaf(title: impl Into<String>) -> FullError {
        FullError::new(title)
    }

    /// Render the tree, indenting each level by two spaces.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        if depth > 0 {
            out.push('\n');
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.title);
        for child in &self.details {
            child.render_into(out, depth + 1);
        }
    }
}

impl fmt::Display for FullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
