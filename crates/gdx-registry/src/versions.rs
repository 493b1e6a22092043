//! Version listing helpers.

use std::collections::HashSet;

use crate::VersionEntry;

/// Drop repeated version numbers (one row per platform build), keeping the
/// first occurrence.
#[must_use]
pub fn dedupe_versions(entries: Vec<VersionEntry>) -> Vec<VersionEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.number.clone()))
        .collect()
}

/// `major.minor` prefix of a version number (`"7.1.3"` → `"7.1"`, `"2"` → `"2"`).
#[must_use]
pub fn minor_series(number: &str) -> String {
    number.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Group entries by their `major.minor` series, in first-seen order.
#[must_use]
pub fn group_versions(entries: &[VersionEntry]) -> Vec<(String, Vec<VersionEntry>)> {
    let mut groups: Vec<(String, Vec<VersionEntry>)> = Vec::new();
    for entry in entries {
        let series = minor_series(&entry.number);
        match groups.iter_mut().find(|(key, _)| *key == series) {
            Some((_, members)) => members.push(entry.clone()),
            None => groups.push((series, vec![entry.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn entry(number: &str) -> VersionEntry {
        VersionEntry {
            number: number.to_string(),
            created_at: Utc::now(),
            downloads_count: 0,
            platform: "ruby".to_string(),
            prerelease: false,
        }
    }

    #[test]
    fn minor_series_truncates_to_two_segments() {
        assert_eq!(minor_series("7.1.3"), "7.1");
        assert_eq!(minor_series("7.1.3.4"), "7.1");
        assert_eq!(minor_series("2"), "2");
        assert_eq!(minor_series("1.0.0.rc1"), "1.0");
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let entries = vec![entry("7.1.3"), entry("7.0.8"), entry("7.1.2"), entry("6.1.0")];
        let groups = group_versions(&entries);

        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["7.1", "7.0", "6.1"]);

        let seven_one: Vec<&str> = groups[0].1.iter().map(|e| e.number.as_str()).collect();
        assert_eq!(seven_one, vec!["7.1.3", "7.1.2"]);
    }

    #[test]
    fn dedupe_keeps_first() {
        let mut java = entry("1.0.0");
        java.platform = "java".to_string();
        let entries = vec![entry("1.0.0"), java, entry("0.9.0")];
        let deduped = dedupe_versions(entries);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].platform, "ruby");
    }
}
