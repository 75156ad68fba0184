use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use tracing::debug;

use crate::error::{Result, SitemapError};
use crate::location::{normalize, Scope};

/// Crawl-frequency hint carried by a sitemap `changefreq` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl FromStr for ChangeFrequency {
    type Err = SitemapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            other => Err(SitemapError::invalid_field_value(
                "changefreq",
                format!("`{other}` is not a change frequency"),
            )),
        }
    }
}

/// One listed URL record under construction by the parser.
///
/// `set` is the field-setter capability: it consumes a `(field-name,
/// field-value)` pair and updates the record, silently ignoring names it does
/// not recognize. Vendor extensions wrap a built-in entry, try their own
/// names first, and fall back to the wrapped `set` for everything else.
pub trait Entry {
    fn set(&mut self, name: &str, value: &str) -> Result<()>;

    /// Canonical location, once a `loc` field inside the scope has been seen.
    fn location(&self) -> Option<&str>;
}

/// Produces a fresh entry each time the parser begins a new entry element.
pub trait EntryFactory {
    type Entry: Entry;

    fn create(&self, scope: Arc<Scope>) -> Self::Entry;
}

/// Deduplication key for an entry: its location under ASCII case-insensitive
/// comparison. Entries without a location key as the empty string, but such
/// entries are never inserted into a document.
pub fn location_key(entry: &impl Entry) -> String {
    entry.location().unwrap_or("").to_ascii_lowercase()
}

/// Entry of a sitemap's `url` element.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    scope: Arc<Scope>,
    location: Option<String>,
    last_modified: Option<DateTime<FixedOffset>>,
    change_frequency: Option<ChangeFrequency>,
    priority: Option<f64>,
}

impl SitemapEntry {
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            location: None,
            last_modified: None,
            change_frequency: None,
            priority: None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn last_modified(&self) -> Option<DateTime<FixedOffset>> {
        self.last_modified
    }

    pub fn change_frequency(&self) -> Option<ChangeFrequency> {
        self.change_frequency
    }

    pub fn priority(&self) -> Option<f64> {
        self.priority
    }
}

impl Entry for SitemapEntry {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "loc" => set_location(&self.scope, &mut self.location, value),
            "lastmod" => {
                self.last_modified = Some(parse_lastmod(value)?);
            }
            "changefreq" => {
                self.change_frequency = Some(value.parse()?);
            }
            "priority" => {
                self.priority = Some(parse_priority(value)?);
            }
            _ => {}
        }
        Ok(())
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// Entry of a sitemap index's `sitemap` element.
#[derive(Debug, Clone)]
pub struct SitemapIndexEntry {
    scope: Arc<Scope>,
    location: Option<String>,
    last_modified: Option<DateTime<FixedOffset>>,
}

impl SitemapIndexEntry {
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            location: None,
            last_modified: None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn last_modified(&self) -> Option<DateTime<FixedOffset>> {
        self.last_modified
    }
}

impl Entry for SitemapIndexEntry {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "loc" => set_location(&self.scope, &mut self.location, value),
            "lastmod" => {
                self.last_modified = Some(parse_lastmod(value)?);
            }
            _ => {}
        }
        Ok(())
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SitemapEntryFactory;

impl EntryFactory for SitemapEntryFactory {
    type Entry = SitemapEntry;

    fn create(&self, scope: Arc<Scope>) -> SitemapEntry {
        SitemapEntry::new(scope)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SitemapIndexEntryFactory;

impl EntryFactory for SitemapIndexEntryFactory {
    type Entry = SitemapIndexEntry;

    fn create(&self, scope: Arc<Scope>) -> SitemapIndexEntry {
        SitemapIndexEntry::new(scope)
    }
}

// A `loc` that fails to normalize or falls outside the scope is a policy
// exclusion, not an error: the slot is left as-is and the entry is dropped at
// the boundary if no acceptable location ever arrives.
fn set_location(scope: &Scope, slot: &mut Option<String>, value: &str) {
    match normalize(value.trim()) {
        Ok(canonical) if scope.admits(&canonical) => *slot = Some(canonical),
        Ok(canonical) => {
            debug!(location = %canonical, scope = %scope, "location outside scope, skipped");
        }
        Err(e) => {
            debug!(location = value, error = %e, "unparseable location, skipped");
        }
    }
}

/// Parses a W3C Datetime value: RFC 3339, or the truncated `YYYY-MM-DD`,
/// `YYYY-MM` and `YYYY` forms (read as midnight UTC of the period's start).
fn parse_lastmod(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime);
    }
    let padded = match value.len() {
        4 => format!("{value}-01-01"),
        7 => format!("{value}-01"),
        _ => value.to_string(),
    };
    let date = NaiveDate::parse_from_str(&padded, "%Y-%m-%d").map_err(|_| {
        SitemapError::invalid_field_value("lastmod", format!("`{value}` is not a W3C datetime"))
    })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}

fn parse_priority(value: &str) -> Result<f64> {
    let value = value.trim();
    let priority: f64 = value.parse().map_err(|_| {
        SitemapError::invalid_field_value("priority", format!("`{value}` is not a number"))
    })?;
    if !priority.is_finite() {
        return Err(SitemapError::invalid_field_value(
            "priority",
            format!("`{value}` is not finite"),
        ));
    }
    Ok(priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Arc<Scope> {
        Arc::new(Scope::new("http://www.example.com").unwrap())
    }

    fn entry_with(fields: &[(&str, &str)]) -> SitemapEntry {
        let mut entry = SitemapEntry::new(scope());
        for (name, value) in fields {
            entry.set(name, value).unwrap();
        }
        entry
    }

    #[test]
    fn all_fields_populated() {
        let entry = entry_with(&[
            ("loc", "http://www.example.com/sitemap.xml"),
            ("lastmod", "2005-01-01"),
            ("changefreq", "monthly"),
            ("priority", "0.8"),
        ]);
        assert_eq!(
            Entry::location(&entry),
            Some("http://www.example.com:80/sitemap.xml")
        );
        assert_eq!(entry.change_frequency(), Some(ChangeFrequency::Monthly));
        assert_eq!(entry.priority(), Some(0.8));
        assert!(entry.last_modified().is_some());
    }

    #[test]
    fn change_frequency_is_case_insensitive() {
        assert_eq!(
            "MONTHLY".parse::<ChangeFrequency>().unwrap(),
            ChangeFrequency::Monthly
        );
        assert!("invalid".parse::<ChangeFrequency>().is_err());
    }

    #[test]
    fn lastmod_accepts_truncated_w3c_forms() {
        for value in ["2004", "2004-12", "2004-12-23", "2004-12-23T18:00:15+00:00"] {
            assert!(parse_lastmod(value).is_ok(), "rejected {value}");
        }
        assert!(parse_lastmod("invalid").is_err());
        assert!(parse_lastmod("2004-13-01").is_err());
    }

    #[test]
    fn priority_must_be_finite() {
        assert!(parse_priority("0.5").is_ok());
        assert!(parse_priority("2.5").is_ok()); // no range check, by the standard's laxest reading
        assert!(parse_priority("inf").is_err());
        assert!(parse_priority("NaN").is_err());
        assert!(parse_priority("invalid").is_err());
    }

    #[test]
    fn loc_outside_scope_is_skipped_silently() {
        let entry = entry_with(&[("loc", "http://elsewhere.com/sitemap.xml")]);
        assert_eq!(Entry::location(&entry), None);

        let entry = entry_with(&[("loc", "http://www.example.com")]);
        assert_eq!(Entry::location(&entry), None, "scope itself is rejected");

        let entry = entry_with(&[("loc", "invalid")]);
        assert_eq!(Entry::location(&entry), None);
    }

    #[test]
    fn unknown_field_names_are_ignored() {
        let mut entry = SitemapEntry::new(scope());
        entry.set("unknown", "whatever").unwrap();
        assert_eq!(Entry::location(&entry), None);
    }

    #[test]
    fn index_entry_ignores_leaf_only_fields() {
        let mut entry = SitemapIndexEntry::new(scope());
        entry.set("changefreq", "invalid").unwrap();
        entry.set("priority", "invalid").unwrap();
        entry.set("loc", "http://www.example.com/sitemap.xml").unwrap();
        assert_eq!(
            Entry::location(&entry),
            Some("http://www.example.com:80/sitemap.xml")
        );
    }

    #[test]
    fn location_key_lowercases() {
        let entry = entry_with(&[("loc", "http://www.example.com/SiteMap.xml")]);
        assert_eq!(location_key(&entry), "http://www.example.com:80/sitemap.xml");

        let empty = SitemapEntry::new(scope());
        assert_eq!(location_key(&empty), "");
    }
}
