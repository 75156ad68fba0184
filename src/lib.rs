//! Streaming parser and validator for documents conforming to the Sitemaps
//! protocol: sitemap files (`urlset` of `url` entries) and sitemap-index
//! files (`sitemapindex` of `sitemap` entries).
//!
//! A document is bound to a base location -- its *scope* -- and every entry
//! it accepts must canonicalize to a location strictly beneath that scope.
//! Parsing is event-driven and pull-based: entries are produced one at a
//! time as the consumer requests them, the rest of the input stays unread
//! when consumption stops, and malformed or out-of-grammar input fails
//! closed.
//!
//! # Architecture
//!
//! - **Streaming parsing** -- never loads the document into memory; walks
//!   namespace-resolved XML events and emits each entry at its boundary (the
//!   next entry's open tag or the root's close), since fields may appear in
//!   any order within an entry
//! - **Scope-bound canonicalization** -- every `loc` is normalized to
//!   `scheme://host:port/path[?query]` (credentials stripped, default port
//!   inserted) and silently dropped unless strictly under the scope
//! - **Deduplicated, bounded collection** -- a document keeps at most
//!   `entry_max_count` entries (50 000 per the standard) and never two whose
//!   locations compare equal case-insensitively
//! - **Pluggable entries** -- an entry factory and field-setter capability
//!   let callers capture vendor-extension elements without touching the
//!   state machine
//!
//! # Key Modules
//!
//! - [`parser`] -- Event-driven streaming entry parser
//! - [`document`] -- [`Sitemap`] / [`SitemapIndex`] collections over the parser
//! - [`entry`] -- Entry records, factories, and the field-setter capability
//! - [`location`] -- Location canonicalization and the [`Scope`] containment rule
//! - [`schema`] -- Document grammars the validating reader enforces
//! - [`error`] -- Error taxonomy
//! - [`config`] -- Protocol constants
//!
//! # Example
//!
//! ```
//! use sitemaps_protocol::Sitemap;
//!
//! let mut sitemap = Sitemap::new("http://www.example.com")?;
//! sitemap.load_str(
//!     r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!         <url>
//!             <loc>http://www.example.com/index.html</loc>
//!             <changefreq>weekly</changefreq>
//!         </url>
//!     </urlset>"#,
//! )?;
//!
//! assert_eq!(sitemap.entry_count(), 1);
//! # Ok::<(), sitemaps_protocol::SitemapError>(())
//! ```

pub mod config;
pub mod document;
pub mod entry;
pub mod error;
pub mod location;
pub mod parser;
pub mod schema;

pub use document::{Document, Sitemap, SitemapIndex};
pub use entry::{
    ChangeFrequency, Entry, EntryFactory, SitemapEntry, SitemapEntryFactory, SitemapIndexEntry,
    SitemapIndexEntryFactory,
};
pub use error::{MalformedLocation, Result, SitemapError};
pub use location::Scope;
pub use parser::{EntryParser, EntryStream};
pub use schema::DocumentSchema;
