//! List queries: pagination and the single-clause filter grammar.
//!
//! SCIM pagination is 1-based. A request's `startIndex` (default 1) is
//! converted to a 0-based offset over the *filtered* sequence, and `count`
//! (default 100) records are taken from there. `totalResults` always
//! reports the filtered set's size; `itemsPerPage` reports what was
//! actually returned. Walking past the end is not an error, it yields an
//! empty page.
//!
//! Filtering accepts exactly one grammar: `<attribute> eq "<value>"`, with
//! attribute and operator matched case-insensitively. Each resource type
//! admits a single filterable attribute (`userName` for users,
//! `displayName` for groups); other attributes, other operators and
//! boolean connectives are rejected as not implemented rather than
//! half-supported.

use crate::error::{ScimError, ScimResult};

/// Default page size when the client does not send `count`.
pub const DEFAULT_COUNT: usize = 100;

/// Inputs of a list operation.
///
/// Sorting and attribute projection are carried so the engine can reject
/// them explicitly; they are never honored.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// 1-based index of the first result to return
    pub start_index: Option<usize>,
    /// Maximum number of results to return
    pub count: Option<usize>,
    /// Filter expression
    pub filter: Option<String>,
    /// Attribute to sort by (rejected)
    pub sort_by: Option<String>,
    /// Sort order (rejected)
    pub sort_order: Option<String>,
    /// Attributes to include (rejected)
    pub attributes: Option<String>,
    /// Attributes to exclude (rejected)
    pub excluded_attributes: Option<String>,
}

impl ListQuery {
    /// Create an empty query (first page, default count, no filter).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 1-based starting index.
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Set the maximum count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set a filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Reject the query parameters this engine never honors.
    pub fn ensure_supported(&self) -> ScimResult<()> {
        if self.sort_by.is_some() || self.sort_order.is_some() {
            return Err(ScimError::not_implemented("Sorting is not implemented."));
        }
        if self.attributes.is_some() || self.excluded_attributes.is_some() {
            return Err(ScimError::not_implemented(
                "Attribute projection is not implemented.",
            ));
        }
        Ok(())
    }

    /// The 1-based start index to echo back in the response.
    pub fn effective_start_index(&self) -> usize {
        self.start_index.unwrap_or(1)
    }

    /// The page size to apply.
    pub fn effective_count(&self) -> usize {
        self.count.unwrap_or(DEFAULT_COUNT)
    }
}

/// Parse a filter expression against the single attribute a resource type
/// supports, returning the literal to match.
///
/// Values may contain spaces inside the quotes; interior quotes, trailing
/// tokens after the literal, or any other operator make the expression
/// unsupported.
pub fn parse_eq_filter(raw: &str, attribute: &str) -> ScimResult<String> {
    let unsupported = || ScimError::not_implemented(format!("Filter syntax not supported: {raw}"));

    let expression = raw.trim();
    let (attr_token, rest) = expression.split_once(' ').ok_or_else(unsupported)?;
    let (op_token, value_expr) = rest.trim_start().split_once(' ').ok_or_else(unsupported)?;
    let value_expr = value_expr.trim();

    if !attr_token.eq_ignore_ascii_case(attribute) {
        return Err(ScimError::not_implemented(format!(
            "Filtering on '{attr_token}' is not supported."
        )));
    }
    if !op_token.eq_ignore_ascii_case("eq") {
        return Err(unsupported());
    }

    if let Some(inner) = value_expr
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        // A quote inside the literal means the expression continued past
        // it (e.g. a boolean connective), so it is not a single clause.
        if inner.contains('"') {
            return Err(unsupported());
        }
        return Ok(inner.to_string());
    }

    // Lenient: a bare single-token literal without quotes
    if !value_expr.is_empty()
        && !value_expr.contains('"')
        && !value_expr.contains(char::is_whitespace)
    {
        return Ok(value_expr.to_string());
    }

    Err(unsupported())
}

/// Take one page out of an already-filtered sequence.
///
/// Returns the page and the total (pre-pagination) length.
pub fn paginate<T>(items: Vec<T>, query: &ListQuery) -> (Vec<T>, usize) {
    let total = items.len();
    let offset = query.effective_start_index().saturating_sub(1);
    let page = items
        .into_iter()
        .skip(offset)
        .take(query.effective_count())
        .collect();
    (page, total)
}
