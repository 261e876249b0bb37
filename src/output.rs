//! CLI output formatting.
//!
//! Output is **information-centric**: every entity (a profile, a resolved
//! source) leads with a positional index and its identity, with details
//! shown as indented context lines underneath.
//!
//! # Output Format
//!
//! ## Profiles
//!
//! ```text
//! Profiles
//! 001 Thumbnail (2 filters)
//!     0 Transform/Resize width=200&height=200&mode=crop
//!     1 Effects/Watermark (unknown filter)
//!
//! Filters
//!     Transform/Resize: Resize to a width and/or height (max, crop, pad, stretch)
//! ```
//!
//! ## Resolve
//!
//! ```text
//! 001 /media/img/a.jpg
//!     → /media/_Profiles/8c2e.../d07f.../41aa.../a.jpg?v=638412345678901234
//! 002 /media/img/gone.jpg
//!     image unavailable
//!
//! Resolved 1 of 2: 1 processed, 1 unavailable
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::imaging::FilterRegistry;
use crate::profile::ProfileStore;
use crate::resolver::Resolution;
use crate::types::ordered_filters;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Configured profiles with their filters in execution order, followed by
/// the filters the registry knows.
pub fn format_profiles(profiles: &ProfileStore, registry: &FilterRegistry) -> Vec<String> {
    let mut lines = vec!["Profiles".to_string()];
    let mut any = false;

    for (i, profile) in profiles.profiles().enumerate() {
        any = true;
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            profile.name,
            plural(profile.filters.len(), "filter")
        ));
        for filter in ordered_filters(&profile.filters) {
            let name = format!("{}/{}", filter.category, filter.filter_type);
            let detail = if registry.find(&filter.category, &filter.filter_type).is_none() {
                "(unknown filter)"
            } else {
                filter.state.as_str()
            };
            let line = format!("    {} {} {}", filter.position, name, detail);
            lines.push(line.trim_end().to_string());
        }
    }
    if !any {
        lines.push("    (none)".to_string());
    }

    lines.push(String::new());
    lines.push("Filters".to_string());
    for descriptor in registry.describe_filters() {
        let name = format!("{}/{}", descriptor.category(), descriptor.filter_type());
        if descriptor.description().is_empty() {
            lines.push(format!("    {}", name));
        } else {
            lines.push(format!("    {}: {}", name, descriptor.description()));
        }
    }
    lines
}

pub fn print_profiles(profiles: &ProfileStore, registry: &FilterRegistry) {
    for line in format_profiles(profiles, registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Resolve
// ============================================================================

/// One entry per requested path, in request order, plus a summary line.
pub fn format_resolutions(results: &[(String, Resolution)], stats: &CacheStats) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (path, resolution)) in results.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), path));
        lines.push(match resolution {
            Resolution::Url(url) => format!("    \u{2192} {}", url),
            Resolution::UnknownProfile => "    unknown profile".to_string(),
            Resolution::ImageUnavailable => "    image unavailable".to_string(),
        });
    }

    let resolved = results.iter().filter(|(_, r)| r.url().is_some()).count();
    lines.push(String::new());
    lines.push(format!("Resolved {} of {}: {}", resolved, results.len(), stats));
    lines
}

pub fn print_resolutions(results: &[(String, Resolution)], stats: &CacheStats) {
    for line in format_resolutions(results, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Purge
// ============================================================================

pub fn format_purge(profile_name: &str, removed: usize) -> String {
    format!("Purged {} ({} removed)", profile_name, plural(removed, "file"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::filter::tests::RecordingFilter;
    use crate::profile::Profile;
    use crate::types::FilterRecord;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "filter"), "1 filter");
        assert_eq!(plural(0, "filter"), "0 filters");
        assert_eq!(plural(3, "file"), "3 files");
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    #[test]
    fn profiles_list_filters_in_execution_order() {
        let store = ProfileStore::from_profiles([Profile::new(
            "Thumbnail",
            vec![
                FilterRecord::new("Effects", "Watermark", 1, "text=x"),
                FilterRecord::new("Transform", "Resize", 0, "width=200"),
            ],
        )]);
        let mut registry = FilterRegistry::with_builtin();
        registry.register(RecordingFilter::new("Effects", "Watermark", ""));

        let lines = format_profiles(&store, &registry);

        assert_eq!(lines[0], "Profiles");
        assert_eq!(lines[1], "001 Thumbnail (2 filters)");
        assert_eq!(lines[2], "    0 Transform/Resize width=200");
        assert_eq!(lines[3], "    1 Effects/Watermark text=x");
    }

    #[test]
    fn unknown_filters_are_marked() {
        let store = ProfileStore::from_profiles([Profile::new(
            "Thumbnail",
            vec![FilterRecord::new("Effects", "Sepia", 0, "")],
        )]);
        let lines = format_profiles(&store, &FilterRegistry::new());
        assert_eq!(lines[1], "001 Thumbnail (1 filter)");
        assert_eq!(lines[2], "    0 Effects/Sepia (unknown filter)");
    }

    #[test]
    fn empty_profile_store() {
        let lines = format_profiles(&ProfileStore::new(), &FilterRegistry::new());
        assert_eq!(lines, vec!["Profiles", "    (none)", "", "Filters"]);
    }

    #[test]
    fn registry_filters_are_listed() {
        let lines = format_profiles(&ProfileStore::new(), &FilterRegistry::with_builtin());
        let filters: Vec<&String> = lines.iter().skip_while(|l| *l != "Filters").collect();
        assert_eq!(filters.len(), 4);
        assert!(filters[1].starts_with("    Transform/Resize: "));
    }

    // =========================================================================
    // Resolve
    // =========================================================================

    #[test]
    fn resolutions_show_each_outcome() {
        let stats = CacheStats::default();
        stats.process();
        stats.unavailable();
        let results = vec![
            ("/media/a.jpg".to_string(), Resolution::Url("/media/_P/a.jpg?v=1".into())),
            ("/media/b.jpg".to_string(), Resolution::ImageUnavailable),
            ("/media/c.jpg".to_string(), Resolution::UnknownProfile),
        ];

        let lines = format_resolutions(&results, &stats);

        assert_eq!(lines[0], "001 /media/a.jpg");
        assert_eq!(lines[1], "    \u{2192} /media/_P/a.jpg?v=1");
        assert_eq!(lines[3], "    image unavailable");
        assert_eq!(lines[5], "    unknown profile");
        assert_eq!(
            lines.last().unwrap(),
            "Resolved 1 of 3: 1 processed, 1 unavailable"
        );
    }

    #[test]
    fn format_purge_counts_files() {
        assert_eq!(format_purge("Thumb", 1), "Purged Thumb (1 file removed)");
        assert_eq!(format_purge("Thumb", 0), "Purged Thumb (0 files removed)");
    }
}
