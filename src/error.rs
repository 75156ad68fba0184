use thiserror::Error;

pub type Result<T> = std::result::Result<T, SitemapError>;

/// Failure to parse a raw location string into its canonical form.
///
/// Fatal only when the location is the document's base; a `loc` field that
/// fails to normalize is silently skipped instead.
#[derive(Debug, Error)]
pub enum MalformedLocation {
    #[error("not an absolute URL")]
    Parse(#[from] url::ParseError),

    #[error("URL has no host")]
    MissingHost,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    /// The base location supplied at construction is not a well-formed
    /// absolute URL. Fatal to that instance.
    #[error("base location `{0}` is not a valid absolute URL")]
    Configuration(String),

    /// The document's root element carries no namespace at all, which would
    /// bypass schema matching entirely.
    #[error("root element's namespace must be http://www.sitemaps.org/schemas/sitemap/0.9")]
    MissingNamespace,

    /// Malformed markup or a schema violation anywhere in the stream: wrong
    /// root tag, wrong child tag, unexpected structure, premature end of
    /// input. Parsing stops at the point of failure.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A recognized field's text could not be parsed into its semantic type.
    #[error("invalid value for `{field}`: {message}")]
    InvalidFieldValue {
        field: &'static str,
        message: String,
    },
}

impl SitemapError {
    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }

    pub(crate) fn invalid_field_value(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field,
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for SitemapError {
    fn from(e: quick_xml::Error) -> Self {
        Self::InvalidDocument(e.to_string())
    }
}
