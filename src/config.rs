/// XML namespace every sitemap and sitemap-index document must declare
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Maximum number of entries per document, as per the standard
pub const DEFAULT_ENTRY_MAX_COUNT: usize = 50_000;

/// Port inserted into canonical locations that carry none (the protocol's
/// historical default, regardless of scheme)
pub const DEFAULT_PORT: u16 = 80;
