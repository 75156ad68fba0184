use std::collections::HashSet;
use std::io::BufRead;

use tracing::{debug, info};

use crate::entry::{
    location_key, Entry, EntryFactory, SitemapEntryFactory, SitemapIndexEntryFactory,
};
use crate::error::Result;
use crate::location::Scope;
use crate::parser::EntryParser;
use crate::schema::DocumentSchema;

/// One sitemap or sitemap-index document instance: a deduplicated,
/// size-bounded collection of entries populated by draining the streaming
/// parser.
///
/// `load` replaces, never merges: every call clears all prior entries before
/// reading a single byte. A `Document` is therefore not meant for overlapping
/// loads; use one instance per concurrent load.
pub struct Document<F: EntryFactory> {
    parser: EntryParser<F>,
    entries: Vec<F::Entry>,
    seen: HashSet<String>,
}

/// A sitemap document (`urlset` of `url` entries).
pub type Sitemap = Document<SitemapEntryFactory>;

/// A sitemap-index document (`sitemapindex` of `sitemap` entries).
pub type SitemapIndex = Document<SitemapIndexEntryFactory>;

impl Sitemap {
    /// Binds a sitemap to its base location, which every accepted entry must
    /// fall strictly under. Fails with [`SitemapError::Configuration`] if
    /// `location` is not a well-formed absolute URL.
    ///
    /// [`SitemapError::Configuration`]: crate::SitemapError::Configuration
    pub fn new(location: &str) -> Result<Self> {
        let scope = Scope::new(location)?;
        Ok(Self::with_parts(
            scope,
            DocumentSchema::sitemap(),
            SitemapEntryFactory,
        ))
    }
}

impl SitemapIndex {
    /// Sitemap-index counterpart of [`Sitemap::new`].
    pub fn new(location: &str) -> Result<Self> {
        let scope = Scope::new(location)?;
        Ok(Self::with_parts(
            scope,
            DocumentSchema::sitemap_index(),
            SitemapIndexEntryFactory,
        ))
    }
}

impl<F: EntryFactory> Document<F> {
    /// Assembles a document from explicit parts, for vendor extensions that
    /// bring their own entry factory and widened grammar.
    pub fn with_parts(scope: Scope, schema: DocumentSchema, factory: F) -> Self {
        Self {
            parser: EntryParser::new(scope, schema, factory),
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn with_entry_max_count(mut self, entry_max_count: usize) -> Self {
        self.parser = self.parser.with_entry_max_count(entry_max_count);
        self
    }

    /// The canonical base location this document is bound to.
    pub fn location(&self) -> &str {
        self.parser.scope().as_str()
    }

    pub fn entry_max_count(&self) -> usize {
        self.parser.entry_max_count()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Read-only iteration over the accepted entries. Set semantics:
    /// iteration order is not part of the contract.
    pub fn entries(&self) -> impl Iterator<Item = &F::Entry> {
        self.entries.iter()
    }

    /// Loads the document from a byte stream, validating as it reads.
    ///
    /// All existing entries are cleared first, even if the load then fails;
    /// this call replaces, never merges. The stream is only read from, never
    /// closed; dropping it mid-load is the way to cancel.
    pub fn load<R: BufRead>(&mut self, data: R) -> Result<()> {
        let schema = self.parser.schema().clone();
        self.load_with_schema(data, schema)
    }

    /// Like [`load`](Self::load), but validates against `schema` for this
    /// call only, e.g. to permit vendor-extension elements.
    pub fn load_with_schema<R: BufRead>(&mut self, data: R, schema: DocumentSchema) -> Result<()> {
        self.entries.clear();
        self.seen.clear();
        debug!(location = %self.parser.scope(), "loading document");

        let max = self.parser.entry_max_count();
        let mut stream = self.parser.parse_with_schema(data, schema);
        loop {
            // Pull-based: once the collection is full, no further entry is
            // requested and the rest of the input is never read.
            if self.entries.len() >= max {
                debug!(entries = self.entries.len(), "entry bound reached");
                break;
            }
            let Some(result) = stream.next() else {
                break;
            };
            let entry = result?;
            if !self.seen.insert(location_key(&entry)) {
                debug!(location = entry.location(), "duplicate location, skipped");
                continue;
            }
            self.entries.push(entry);
        }
        drop(stream);

        info!(
            location = %self.parser.scope(),
            entries = self.entries.len(),
            "document loaded"
        );
        Ok(())
    }

    /// Convenience over [`load`](Self::load) for a whole document already in
    /// memory.
    pub fn load_str(&mut self, data: &str) -> Result<()> {
        self.load(data.as_bytes())
    }

    /// Inserts an entry, upholding the document's invariants. Rejected as a
    /// no-op when the entry has no location, an equal location (ASCII
    /// case-insensitive) is already present, or the collection is full.
    pub fn add_entry(&mut self, entry: F::Entry) -> bool {
        if entry.location().is_none() || self.entries.len() >= self.parser.entry_max_count() {
            return false;
        }
        if !self.seen.insert(location_key(&entry)) {
            return false;
        }
        self.entries.push(entry);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SitemapEntry;
    use std::sync::Arc;

    #[test]
    fn add_entry_upholds_invariants() {
        let mut sitemap = Sitemap::new("http://www.example.com")
            .unwrap()
            .with_entry_max_count(2);
        let scope = Arc::new(Scope::new("http://www.example.com").unwrap());

        let entry = |loc: &str| {
            let mut e = SitemapEntry::new(Arc::clone(&scope));
            e.set("loc", loc).unwrap();
            e
        };

        assert!(!sitemap.add_entry(SitemapEntry::new(Arc::clone(&scope)))); // no location
        assert!(sitemap.add_entry(entry("http://www.example.com/a")));
        assert!(!sitemap.add_entry(entry("http://www.example.com/A"))); // duplicate, case-insensitive
        assert!(sitemap.add_entry(entry("http://www.example.com/b")));
        assert!(!sitemap.add_entry(entry("http://www.example.com/c"))); // full
        assert_eq!(sitemap.entry_count(), 2);
    }
}
