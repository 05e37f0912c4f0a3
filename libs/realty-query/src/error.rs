use thiserror::Error;

/// Client-side query encoding failures. Nothing is sent when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// Pages are 1-based.
    #[error("page must be at least 1")]
    InvalidPage,

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error("filter field name must not be empty")]
    EmptyFilterField,

    /// A filter field or value contains `-` or `,`, which the wire format
    /// uses as separators.
    #[error("filter {part} '{text}' contains reserved character '{ch}'")]
    ReservedCharacter {
        part: FilterPart,
        text: String,
        ch: char,
    },

    /// A wire filter string could not be split into `field-value` pairs.
    #[error("malformed filter pair '{0}'")]
    MalformedFilter(String),
}

/// Which half of a filter pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPart {
    Field,
    Value,
}

impl std::fmt::Display for FilterPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Field => "field",
            Self::Value => "value",
        })
    }
}
