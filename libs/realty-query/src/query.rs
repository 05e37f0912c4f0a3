use serde::{Deserialize, Serialize};

use crate::filters::Filters;

/// Sort direction, `asc` / `desc` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

impl std::str::FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            other => Err(format!("unknown sort direction '{other}', expected asc or desc")),
        }
    }
}

/// Parameters of one list/grid request. Every field is optional; unset
/// fields are left off the wire.
///
/// `pagination = Some(false)` asks the backend for the full, unpaged result
/// set regardless of `page` and `limit`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridQuery {
    pub search: Option<String>,
    pub sort_field: Option<String>,
    pub sort: Option<SortDir>,
    pub filters: Filters,
    pub filtration: Option<bool>,
    pub pagination: Option<bool>,
    /// 1-based.
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl GridQuery {
    pub fn builder() -> GridQueryBuilder {
        GridQueryBuilder::default()
    }

    /// Same query, different page.
    #[must_use]
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

/// Fluent builder for [`GridQuery`].
///
/// ```rust,ignore
/// let query = GridQuery::builder()
///     .search("vista")
///     .sort_by("price", SortDir::Desc)
///     .filter("city", "Santiago")
///     .page(1)
///     .limit(20)
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct GridQueryBuilder {
    query: GridQuery,
}

impl GridQueryBuilder {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.query.search = Some(text.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.query.sort_field = Some(field.into());
        self.query.sort = Some(dir);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.filters.insert(field, value);
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.query.filters = filters;
        self
    }

    pub fn filtration(mut self, enabled: bool) -> Self {
        self.query.filtration = Some(enabled);
        self
    }

    pub fn pagination(mut self, enabled: bool) -> Self {
        self.query.pagination = Some(enabled);
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.query.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> GridQuery {
        self.query
    }
}
