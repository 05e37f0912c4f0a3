//! `field-value` filter map and its comma-joined wire format.
//!
//! `{"city": "Santiago", "type": "Casa"}` travels as `city-Santiago,type-Casa`.
//! The format has no escaping, so `-` and `,` cannot appear in a field or a
//! value. Such filters are rejected at encode time instead of being mangled.

use indexmap::IndexMap;

use crate::error::{FilterPart, QueryError};

const PAIR_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = '-';

/// Insertion-ordered `field -> value` filter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(IndexMap<String, String>);

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter, replacing any previous value for `field` in place.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.shift_remove(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn check_reserved(part: FilterPart, text: &str) -> Result<(), QueryError> {
    match text.chars().find(|c| *c == PAIR_SEPARATOR || *c == FIELD_SEPARATOR) {
        Some(ch) => Err(QueryError::ReservedCharacter {
            part,
            text: text.to_owned(),
            ch,
        }),
        None => Ok(()),
    }
}

/// Encode filters to the wire format. Empty filters encode to `""`.
///
/// # Errors
/// Returns [`QueryError::EmptyFilterField`] for a blank field name and
/// [`QueryError::ReservedCharacter`] if a field or value contains `-` or `,`.
pub fn encode_filters(filters: &Filters) -> Result<String, QueryError> {
    let mut out = String::new();
    for (field, value) in filters.iter() {
        if field.is_empty() {
            return Err(QueryError::EmptyFilterField);
        }
        check_reserved(FilterPart::Field, field)?;
        check_reserved(FilterPart::Value, value)?;

        if !out.is_empty() {
            out.push(PAIR_SEPARATOR);
        }
        out.push_str(field);
        out.push(FIELD_SEPARATOR);
        out.push_str(value);
    }
    Ok(out)
}

/// Decode the wire format back into [`Filters`]. `""` decodes to no filters.
///
/// # Errors
/// Returns [`QueryError::MalformedFilter`] for a pair with no `-` separator,
/// and [`QueryError::EmptyFilterField`] for a pair with an empty field.
pub fn decode_filters(wire: &str) -> Result<Filters, QueryError> {
    let mut filters = Filters::new();
    if wire.is_empty() {
        return Ok(filters);
    }
    for pair in wire.split(PAIR_SEPARATOR) {
        let Some((field, value)) = pair.split_once(FIELD_SEPARATOR) else {
            return Err(QueryError::MalformedFilter(pair.to_owned()));
        };
        if field.is_empty() {
            return Err(QueryError::EmptyFilterField);
        }
        filters.insert(field, value);
    }
    Ok(filters)
}
