use std::io::BufRead;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::debug;

use crate::config::DEFAULT_ENTRY_MAX_COUNT;
use crate::entry::{Entry, EntryFactory};
use crate::error::{Result, SitemapError};
use crate::location::Scope;
use crate::schema::DocumentSchema;

/// Streaming parser producing validated entries from a sitemap or
/// sitemap-index byte stream.
///
/// Fixed per instance: the scope every accepted location must fall under, the
/// document grammar, the factory creating a fresh entry per entry element,
/// and the maximum number of entries ever yielded.
pub struct EntryParser<F: EntryFactory> {
    scope: Arc<Scope>,
    schema: DocumentSchema,
    factory: F,
    entry_max_count: usize,
}

impl<F: EntryFactory> EntryParser<F> {
    pub fn new(scope: Scope, schema: DocumentSchema, factory: F) -> Self {
        Self {
            scope: Arc::new(scope),
            schema,
            factory,
            entry_max_count: DEFAULT_ENTRY_MAX_COUNT,
        }
    }

    pub fn with_entry_max_count(mut self, entry_max_count: usize) -> Self {
        self.entry_max_count = entry_max_count;
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    pub fn entry_max_count(&self) -> usize {
        self.entry_max_count
    }

    /// Opens a pull-based stream of entries over `data`.
    ///
    /// The stream is single-pass and non-restartable; dropping it before
    /// exhaustion abandons parsing, which is the documented cancellation
    /// mechanism. `data` is borrowed for reading only and never closed here.
    pub fn parse<R: BufRead>(&self, data: R) -> EntryStream<'_, R, F> {
        self.parse_with_schema(data, self.schema.clone())
    }

    /// Like [`parse`](Self::parse), but validates against `schema` for this
    /// call only, e.g. to permit vendor-extension elements.
    pub fn parse_with_schema<R: BufRead>(
        &self,
        data: R,
        schema: DocumentSchema,
    ) -> EntryStream<'_, R, F> {
        EntryStream {
            parser: self,
            schema,
            reader: NsReader::from_reader(data),
            buf: Vec::new(),
            current: None,
            emitted: 0,
            started: false,
            in_entry: false,
            done: false,
        }
    }
}

/// Lazy sequence of validated entries; see [`EntryParser::parse`].
///
/// Entries are emitted one boundary late: a field may appear in any order
/// within its entry, so completeness is only known at the next entry's open
/// tag or the root's close. The max-count check happens at that boundary, so
/// exactly `entry_max_count` entries are ever yielded and the remainder of
/// the input is never read.
pub struct EntryStream<'a, R: BufRead, F: EntryFactory> {
    parser: &'a EntryParser<F>,
    schema: DocumentSchema,
    reader: NsReader<R>,
    buf: Vec<u8>,
    current: Option<F::Entry>,
    emitted: usize,
    started: bool,
    in_entry: bool,
    done: bool,
}

enum XmlEvent {
    Start { local: String, namespace: NamespaceBinding },
    Empty { local: String, namespace: NamespaceBinding },
    End { local: String },
    Text(String),
    Skip,
    Eof,
}

enum NamespaceBinding {
    None,
    Bound(Vec<u8>),
    Unresolved,
}

impl<'a, R: BufRead, F: EntryFactory> EntryStream<'a, R, F> {
    fn advance(&mut self) -> Result<Option<F::Entry>> {
        if !self.started {
            self.started = true;
            if !self.open_root()? {
                // self-closing root: a valid, entry-less document
                return Ok(None);
            }
            self.current = Some(self.fresh_entry());
        }
        loop {
            match self.next_event()? {
                XmlEvent::Start { local, .. } => {
                    if self.in_entry {
                        let value = self.read_field_text(&local)?;
                        self.set_field(&local, &value)?;
                    } else {
                        self.in_entry = true;
                        if let Some(completed) = self.entry_boundary(&local)? {
                            return Ok(Some(completed));
                        }
                        if self.done {
                            return Ok(None);
                        }
                    }
                }
                XmlEvent::Empty { local, .. } => {
                    if self.in_entry {
                        self.permit_field(&local)?;
                        self.set_field(&local, "")?;
                    } else {
                        if let Some(completed) = self.entry_boundary(&local)? {
                            return Ok(Some(completed));
                        }
                        if self.done {
                            return Ok(None);
                        }
                    }
                }
                XmlEvent::End { local } => {
                    if self.in_entry {
                        if local == self.schema.entry_tag() {
                            self.in_entry = false;
                        }
                    } else if local == self.schema.root_tag() {
                        self.done = true;
                        if let Some(last) = self.current.take() {
                            if last.location().is_some()
                                && self.emitted < self.parser.entry_max_count
                            {
                                return Ok(Some(last));
                            }
                        }
                        return Ok(None);
                    }
                }
                XmlEvent::Text(text) => {
                    if !text.trim().is_empty() {
                        return Err(SitemapError::invalid_document(format!(
                            "unexpected text `{}`",
                            text.trim()
                        )));
                    }
                }
                XmlEvent::Skip => {}
                XmlEvent::Eof => {
                    return Err(SitemapError::invalid_document("unexpected end of document"));
                }
            }
        }
    }

    /// Handles the opening of an entry element: the boundary at which the
    /// previous entry, if it gained a location, is complete. Sets `done` on
    /// reaching the entry bound, terminating without reading further input.
    fn entry_boundary(&mut self, local: &str) -> Result<Option<F::Entry>> {
        if local != self.schema.entry_tag() {
            return Err(SitemapError::invalid_document(format!(
                "expected `{}` element, found `{local}`",
                self.schema.entry_tag()
            )));
        }
        let fresh = self.fresh_entry();
        let previous = self.current.replace(fresh);
        if let Some(previous) = previous {
            if previous.location().is_some() {
                if self.emitted >= self.parser.entry_max_count {
                    debug!(
                        emitted = self.emitted,
                        "entry bound reached, rest of input unread"
                    );
                    self.done = true;
                    return Ok(None);
                }
                self.emitted += 1;
                return Ok(Some(previous));
            }
        }
        Ok(None)
    }

    /// Advances past leading prolog content to the root element and checks
    /// its namespace and name. Returns `false` for a self-closing root.
    fn open_root(&mut self) -> Result<bool> {
        loop {
            match self.next_event()? {
                XmlEvent::Skip => {}
                XmlEvent::Text(text) if text.trim().is_empty() => {}
                XmlEvent::Text(_) => {
                    return Err(SitemapError::invalid_document(
                        "unexpected text before root element",
                    ));
                }
                XmlEvent::Start { local, namespace } => {
                    self.check_root(&local, namespace)?;
                    return Ok(true);
                }
                XmlEvent::Empty { local, namespace } => {
                    self.check_root(&local, namespace)?;
                    return Ok(false);
                }
                XmlEvent::End { local } => {
                    return Err(SitemapError::invalid_document(format!(
                        "unexpected closing tag `{local}`"
                    )));
                }
                XmlEvent::Eof => {
                    return Err(SitemapError::invalid_document("document is empty"));
                }
            }
        }
    }

    fn check_root(&self, local: &str, namespace: NamespaceBinding) -> Result<()> {
        match namespace {
            NamespaceBinding::None => return Err(SitemapError::MissingNamespace),
            NamespaceBinding::Unresolved => {
                return Err(SitemapError::invalid_document(
                    "root element has an unresolved namespace prefix",
                ));
            }
            NamespaceBinding::Bound(ns) => {
                if ns != self.schema.namespace().as_bytes() {
                    return Err(SitemapError::invalid_document(format!(
                        "root element's namespace must be {}",
                        self.schema.namespace()
                    )));
                }
            }
        }
        if local != self.schema.root_tag() {
            return Err(SitemapError::invalid_document(format!(
                "expected root element `{}`, found `{local}`",
                self.schema.root_tag()
            )));
        }
        Ok(())
    }

    /// Reads the simple text content of a field element up to its close.
    fn read_field_text(&mut self, field: &str) -> Result<String> {
        self.permit_field(field)?;
        let mut text = String::new();
        loop {
            match self.next_event()? {
                XmlEvent::Text(chunk) => text.push_str(&chunk),
                XmlEvent::End { .. } => return Ok(text),
                XmlEvent::Skip => {}
                XmlEvent::Start { local, .. } | XmlEvent::Empty { local, .. } => {
                    return Err(SitemapError::invalid_document(format!(
                        "`{field}` must contain only text, found element `{local}`"
                    )));
                }
                XmlEvent::Eof => {
                    return Err(SitemapError::invalid_document("unexpected end of document"));
                }
            }
        }
    }

    fn permit_field(&self, local: &str) -> Result<()> {
        if self.schema.permits_field(local) {
            Ok(())
        } else {
            Err(SitemapError::invalid_document(format!(
                "unexpected element `{local}` in `{}`",
                self.schema.entry_tag()
            )))
        }
    }

    fn set_field(&mut self, local: &str, value: &str) -> Result<()> {
        if let Some(current) = self.current.as_mut() {
            current.set(local, value)?;
        }
        Ok(())
    }

    fn fresh_entry(&self) -> F::Entry {
        self.parser.factory.create(Arc::clone(&self.parser.scope))
    }

    /// Pulls the next raw event, resolved against in-scope namespaces and
    /// copied out of the reader's buffer.
    fn next_event(&mut self) -> Result<XmlEvent> {
        self.buf.clear();
        let (resolution, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
        let namespace = match resolution {
            ResolveResult::Unbound => NamespaceBinding::None,
            ResolveResult::Bound(ns) => NamespaceBinding::Bound(ns.as_ref().to_vec()),
            ResolveResult::Unknown(_) => NamespaceBinding::Unresolved,
        };
        Ok(match event {
            Event::Start(e) => XmlEvent::Start {
                local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                namespace,
            },
            Event::Empty(e) => XmlEvent::Empty {
                local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                namespace,
            },
            Event::End(e) => XmlEvent::End {
                local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            },
            Event::Text(e) => XmlEvent::Text(e.unescape()?.into_owned()),
            Event::CData(e) => {
                XmlEvent::Text(String::from_utf8_lossy(&e.into_inner()).into_owned())
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => XmlEvent::Skip,
            Event::Eof => XmlEvent::Eof,
        })
    }
}

impl<'a, R: BufRead, F: EntryFactory> Iterator for EntryStream<'a, R, F> {
    type Item = Result<F::Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SitemapEntryFactory;

    fn parser(entry_max_count: usize) -> EntryParser<SitemapEntryFactory> {
        EntryParser::new(
            Scope::new("http://www.example.com").unwrap(),
            DocumentSchema::sitemap(),
            SitemapEntryFactory,
        )
        .with_entry_max_count(entry_max_count)
    }

    #[test]
    fn yields_entries_in_source_order() {
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>http://www.example.com/a</loc></url>
            <url><loc>http://www.example.com/b</loc></url>
        </urlset>"#;
        let parser = parser(100);
        let locations: Vec<String> = parser
            .parse(data.as_bytes())
            .map(|r| r.unwrap().location().unwrap().to_string())
            .collect();
        assert_eq!(
            locations,
            ["http://www.example.com:80/a", "http://www.example.com:80/b"]
        );
    }

    #[test]
    fn bound_short_circuits_without_reading_the_rest() {
        // The bound check fires at the boundary after the second yield, so
        // everything past the fourth entry's open tag is never read and need
        // not be well-formed.
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>http://www.example.com/a</loc></url>
            <url><loc>http://www.example.com/b</loc></url>
            <url><loc>http://www.example.com/c</loc></url>
            <url><bogus><<<garbage"#;
        let parser = parser(2);
        let entries: Vec<_> = parser.parse(data.as_bytes()).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn stream_is_lazy() {
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>http://www.example.com/a</loc></url>
            <url><loc>http://www.example.com/b</loc>"#;
        let parser = parser(100);
        let mut stream = parser.parse(data.as_bytes());
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.location(), Some("http://www.example.com:80/a"));
        // abandoning the stream here is the cancellation mechanism
        drop(stream);
    }

    #[test]
    fn entry_without_location_is_never_yielded() {
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><priority>0.5</priority></url>
            <url><loc>http://www.example.com/a</loc></url>
        </urlset>"#;
        let parser = parser(100);
        let entries: Vec<_> = parser.parse(data.as_bytes()).map(Result::unwrap).collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn self_closing_root_yields_nothing() {
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#;
        let parser = parser(100);
        assert_eq!(parser.parse(data.as_bytes()).count(), 0);
    }

    #[test]
    fn truncated_document_fails() {
        let data = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>http://www.example.com/a</loc></url>"#;
        let parser = parser(100);
        let results: Vec<_> = parser.parse(data.as_bytes()).collect();
        assert!(matches!(
            results.last(),
            Some(Err(SitemapError::InvalidDocument(_)))
        ));
    }

    #[test]
    fn stream_is_fused_after_an_error() {
        let data = r#"<notaurlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#;
        let parser = parser(100);
        let mut stream = parser.parse(data.as_bytes());
        assert!(matches!(
            stream.next(),
            Some(Err(SitemapError::InvalidDocument(_)))
        ));
        assert!(stream.next().is_none());
    }
}
