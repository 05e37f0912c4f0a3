use url::Url;

use crate::error::QueryError;
use crate::filters::encode_filters;
use crate::query::GridQuery;

/// Wire parameters produced by [`encode_query`], in their fixed order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedQuery {
    pairs: Vec<(&'static str, String)>,
}

impl EncodedQuery {
    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.pairs.push((name, value.into()));
    }

    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append the parameters to `url`'s query string.
    pub fn apply_to(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        url.query_pairs_mut()
            .extend_pairs(self.pairs.iter().map(|(n, v)| (*n, v.as_str())));
    }

    /// `application/x-www-form-urlencoded` rendering, without a leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(n, v)| (*n, v.as_str())))
            .finish()
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Encode a [`GridQuery`] into wire parameters.
///
/// Only present fields are emitted, always in the order `search`,
/// `sortField`, `sort`, `filters`, `filtration`, `pagination`, `page`,
/// `limit`. Blank `search`/`sortField` and empty filters count as absent.
/// Booleans go out as `"true"` / `"false"`.
///
/// # Errors
/// Returns [`QueryError::InvalidPage`] / [`QueryError::InvalidLimit`] for a
/// zero page or limit, and any filter encoding error from
/// [`encode_filters`].
pub fn encode_query(query: &GridQuery) -> Result<EncodedQuery, QueryError> {
    if query.page == Some(0) {
        return Err(QueryError::InvalidPage);
    }
    if query.limit == Some(0) {
        return Err(QueryError::InvalidLimit);
    }

    let mut out = EncodedQuery::default();

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        out.push("search", search);
    }
    if let Some(field) = query.sort_field.as_deref().filter(|s| !s.is_empty()) {
        out.push("sortField", field);
    }
    if let Some(dir) = query.sort {
        out.push("sort", dir.as_str());
    }
    let filters = encode_filters(&query.filters)?;
    if !filters.is_empty() {
        out.push("filters", filters);
    }
    if let Some(filtration) = query.filtration {
        out.push("filtration", flag(filtration));
    }
    if let Some(pagination) = query.pagination {
        out.push("pagination", flag(pagination));
    }
    if let Some(page) = query.page {
        out.push("page", page.to_string());
    }
    if let Some(limit) = query.limit {
        out.push("limit", limit.to_string());
    }

    Ok(out)
}
