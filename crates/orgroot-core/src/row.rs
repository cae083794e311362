//! Input rows as extracted from the warehouse.
//!
//! A row is `(id, name, is_generic, has_redirect, redirect_id, redirect_name)`.
//! Strongly typed callers build [`RedirectRow`] directly; callers holding
//! loosely typed query output go through [`RedirectRow::from_values`], which
//! enforces the column count and column types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResolveError;

/// Number of columns every input row must carry.
pub const ROW_WIDTH: usize = 6;

/// One site record and its optional redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_generic: bool,
    #[serde(default)]
    pub has_redirect: bool,
    #[serde(default)]
    pub redirect_id: Option<String>,
    #[serde(default)]
    pub redirect_name: Option<String>,
}

impl RedirectRow {
    /// A record with no redirect.
    #[must_use]
    pub fn terminal(id: impl Into<String>, name: impl Into<String>, is_generic: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_generic,
            has_redirect: false,
            redirect_id: None,
            redirect_name: None,
        }
    }

    /// A record redirecting to `target_id`.
    #[must_use]
    pub fn redirecting(
        id: impl Into<String>,
        name: impl Into<String>,
        is_generic: bool,
        target_id: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_generic,
            has_redirect: true,
            redirect_id: Some(target_id.into()),
            redirect_name: Some(target_name.into()),
        }
    }

    /// The redirect target id, if this row redirects.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        if self.has_redirect {
            self.redirect_id.as_deref()
        } else {
            None
        }
    }

    /// Parse one loosely typed row.
    ///
    /// Ids accept strings or integers, flags accept booleans or `0`/`1`, and
    /// the redirect columns may be `null` when `has_redirect` is false.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedRow`] when the row does not have
    /// exactly [`ROW_WIDTH`] columns, a column has the wrong type, or the row
    /// claims a redirect without a target id.
    pub fn from_values(row: usize, values: &[Value]) -> Result<Self, ResolveError> {
        let [id, name, is_generic, has_redirect, redirect_id, redirect_name] = values else {
            return Err(ResolveError::malformed(
                row,
                format!("expected {ROW_WIDTH} fields, got {}", values.len()),
            ));
        };

        let id = id_field(row, "id", id)?
            .ok_or_else(|| ResolveError::malformed(row, "id must not be null"))?;
        let name = text_field(row, "name", name)?.unwrap_or_default();
        let is_generic = flag_field(row, "is_generic", is_generic)?;
        let has_redirect = flag_field(row, "has_redirect", has_redirect)?;
        let redirect_id = id_field(row, "redirect_id", redirect_id)?;
        let redirect_name = text_field(row, "redirect_name", redirect_name)?;

        if has_redirect && redirect_id.is_none() {
            return Err(ResolveError::malformed(
                row,
                "has_redirect is set but redirect_id is null",
            ));
        }

        Ok(Self {
            id,
            name,
            is_generic,
            has_redirect,
            redirect_id,
            redirect_name,
        })
    }
}

/// Parse a batch of loosely typed rows, stopping at the first malformed one.
///
/// # Errors
///
/// Returns the first [`ResolveError::MalformedRow`] encountered.
pub fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<RedirectRow>, ResolveError> {
    rows.iter()
        .enumerate()
        .map(|(i, values)| RedirectRow::from_values(i, values))
        .collect()
}

fn id_field(row: usize, column: &str, value: &Value) -> Result<Option<String>, ResolveError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
        other => Err(type_error(row, column, "a string or integer id", other)),
    }
}

fn text_field(row: usize, column: &str, value: &Value) -> Result<Option<String>, ResolveError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(type_error(row, column, "a string", other)),
    }
}

fn flag_field(row: usize, column: &str, value: &Value) -> Result<bool, ResolveError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(type_error(row, column, "a boolean", value)),
        },
        other => Err(type_error(row, column, "a boolean", other)),
    }
}

fn type_error(row: usize, column: &str, expected: &str, got: &Value) -> ResolveError {
    ResolveError::malformed(row, format!("{column} must be {expected}, got {got}"))
}
