use std::collections::HashSet;

use crate::config::SITEMAP_NAMESPACE;

/// The grammar the validating reader enforces over a document: expected
/// namespace, root tag, entry tag, and the set of permitted field tags
/// (local names, so vendor-prefixed tags resolve to their local part).
///
/// The two built-in grammars mirror the protocol's bundled schemas. Callers
/// may derive a wider grammar with [`with_field_tag`](Self::with_field_tag)
/// to permit vendor-extension elements for a single load.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    namespace: String,
    root_tag: String,
    entry_tag: String,
    field_tags: HashSet<String>,
}

impl DocumentSchema {
    /// Grammar of a sitemap document: `urlset` of `url` entries.
    pub fn sitemap() -> Self {
        Self::new("urlset", "url", &["loc", "lastmod", "changefreq", "priority"])
    }

    /// Grammar of a sitemap-index document: `sitemapindex` of `sitemap`
    /// entries.
    pub fn sitemap_index() -> Self {
        Self::new("sitemapindex", "sitemap", &["loc", "lastmod"])
    }

    pub fn new(root_tag: &str, entry_tag: &str, field_tags: &[&str]) -> Self {
        Self {
            namespace: SITEMAP_NAMESPACE.to_string(),
            root_tag: root_tag.to_string(),
            entry_tag: entry_tag.to_string(),
            field_tags: field_tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Permits an additional field tag (by local name) inside entries.
    pub fn with_field_tag(mut self, name: &str) -> Self {
        self.field_tags.insert(name.to_string());
        self
    }

    /// Overrides the namespace the root element must declare.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    pub fn entry_tag(&self) -> &str {
        &self.entry_tag
    }

    pub fn permits_field(&self, local_name: &str) -> bool {
        self.field_tags.contains(local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_grammars() {
        let sitemap = DocumentSchema::sitemap();
        assert_eq!(sitemap.root_tag(), "urlset");
        assert_eq!(sitemap.entry_tag(), "url");
        assert!(sitemap.permits_field("changefreq"));
        assert!(!sitemap.permits_field("title"));

        let index = DocumentSchema::sitemap_index();
        assert_eq!(index.entry_tag(), "sitemap");
        assert!(!index.permits_field("priority"));
    }

    #[test]
    fn extension_tags_widen_the_grammar() {
        let schema = DocumentSchema::sitemap().with_field_tag("title");
        assert!(schema.permits_field("title"));
        assert!(schema.permits_field("loc"));
    }
}
