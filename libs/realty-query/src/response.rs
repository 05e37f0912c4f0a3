use serde::{Deserialize, Serialize};

/// One grid row. The layer does not interpret row contents.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Paginated wrapper returned when the backend pages results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Row>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default, rename = "totalPages")]
    pub total_pages: u64,
}

/// Body of a list endpoint: a bare array of rows or a [`Page`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridResponse {
    Rows(Vec<Row>),
    Paged(Page),
}

impl Default for GridResponse {
    fn default() -> Self {
        Self::empty()
    }
}

impl GridResponse {
    /// What read paths return when they degrade: no rows, no paging info.
    #[must_use]
    pub fn empty() -> Self {
        Self::Rows(Vec::new())
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Rows(rows) => rows,
            Self::Paged(page) => &page.data,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Paged(page) => page.data,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    #[must_use]
    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Paged(page) => Some(page),
            Self::Rows(_) => None,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> Option<u64> {
        self.as_page().map(|p| p.total_pages)
    }
}
