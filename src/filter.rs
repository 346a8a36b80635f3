//! Listing filters shared by guides and announcements.

use time::{Duration, OffsetDateTime};

/// Splits a comma separated tag field, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Lower-cased query tags, as used for matching.
pub fn query_tags(raw: &str) -> Vec<String> {
    parse_tags(raw).into_iter().map(|tag| tag.to_lowercase()).collect()
}

/// True when any of `wanted` (already lower-cased) is among `tags` after trimming and lower-casing.
pub fn matches_any_tag(tags: &[String], wanted: &[String]) -> bool {
    let normalized: Vec<String> = tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    wanted.iter().any(|tag| normalized.contains(tag))
}

/// Case-insensitive substring test used for `search=` parameters.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Week,
    Month,
}

impl DateFilter {
    /// Unknown values mean "no date filter".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    pub fn admits(self, created_at: OffsetDateTime, now: OffsetDateTime) -> bool {
        let today = now.date();
        let created = created_at.to_offset(now.offset()).date();
        match self {
            Self::Today => created == today,
            Self::Week => created >= today - Duration::days(7),
            Self::Month => created >= today - Duration::days(30),
        }
    }
}

/// Query parameters accepted by the `/filter` endpoints.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub date_filter: Option<String>,
}

impl ListFilter {
    /// Applies every filter to one item.
    pub fn admits(&self, title: &str, tags: &[String], created_at: OffsetDateTime, now: OffsetDateTime) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !contains_ignore_case(title, search) {
                return false;
            }
        }

        if let Some(raw) = self.tags.as_deref() {
            let wanted = query_tags(raw);
            if !wanted.is_empty() && !matches_any_tag(tags, &wanted) {
                return false;
            }
        }

        match self.date_filter.as_deref().and_then(DateFilter::parse) {
            Some(filter) => filter.admits(created_at, now),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tag_field_is_split_and_trimmed() {
        assert_eq!(parse_tags(" rust, ,web ,"), tags(&["rust", "web"]));
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn tag_matching_normalizes_both_sides() {
        let wanted = query_tags("Rust, GO");
        assert!(matches_any_tag(&tags(&[" rust ", "python"]), &wanted));
        assert!(matches_any_tag(&tags(&["Go"]), &wanted));
        assert!(!matches_any_tag(&tags(&["java", ""]), &wanted));
    }

    #[test]
    fn date_filters() {
        let now = datetime!(2025-03-20 12:00 UTC);
        assert!(DateFilter::Today.admits(datetime!(2025-03-20 00:01 UTC), now));
        assert!(!DateFilter::Today.admits(datetime!(2025-03-19 23:59 UTC), now));
        assert!(DateFilter::Week.admits(datetime!(2025-03-13 08:00 UTC), now));
        assert!(!DateFilter::Week.admits(datetime!(2025-03-12 23:00 UTC), now));
        assert!(DateFilter::Month.admits(datetime!(2025-02-18 08:00 UTC), now));
        assert!(!DateFilter::Month.admits(datetime!(2025-02-17 08:00 UTC), now));
        assert_eq!(DateFilter::parse("year"), None);
    }

    #[test]
    fn list_filter_combines_conditions() {
        let now = datetime!(2025-03-20 12:00 UTC);
        let filter = ListFilter {
            search: Some("axum".into()),
            tags: Some("web".into()),
            date_filter: Some("week".into()),
        };
        let created = datetime!(2025-03-19 10:00 UTC);
        assert!(filter.admits("Intro to Axum", &tags(&["Web"]), created, now));
        assert!(!filter.admits("Intro to Tokio", &tags(&["Web"]), created, now));
        assert!(!filter.admits("Intro to Axum", &tags(&["cli"]), created, now));
        assert!(ListFilter::default().admits("anything", &[], created, now));
    }
}
