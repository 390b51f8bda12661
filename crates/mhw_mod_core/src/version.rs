//! Free-form version parsing and candidate file ordering.
//!
//! Mod authors version their uploads inconsistently ("1.2", "v2", "2024-01-15",
//! "1.0-beta", "Final"). [`parse`] maps any such string onto a [`ParsedVersion`]
//! which has a total order, and [`sort_candidates`] uses that order to rank the
//! files offered for a mod by a hosting service.
//!
//! Recognized grammars, tried in order:
//!
//! 1. Semantic-version-like: `v1`, `1.2`, `1.2.3`, `1.0-beta.1`, `2.0rc1`, `1.0+build`
//! 2. Date-like with separators: `2024-01-15`, `v2024_01_15-hotfix`
//! 3. Simple integer: `7`, `v12`
//!
//! Anything else stays unparsed and sorts below every parsed version.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-_.]?((?:alpha|beta|rc|pre|dev|snapshot|a|b|c)(?:[-_.]?\d+)?))?(?:\+(.+))?$",
    )
    .expect("semver pattern must compile")
});

// Separators are mandatory: a bare 8-digit string is left to the integer grammar.
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d{4})[-_.](\d{2})[-_.](\d{2})(?:[-_.]?(.+))?$")
        .expect("date pattern must compile")
});

static SIMPLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[vV]?(\d+)$").expect("integer pattern must compile"));

static ARCHIVE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(zip|rar|7z|tar\.gz)$").expect("extension pattern must compile")
});

static FILENAME_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // name-1.2.3, name_v1.2.3, name-1.2-beta
        Regex::new(r"[-_]v?(\d+\.\d+(?:\.\d+)?(?:[-_.]\w+)?)\s*$"),
        // name-20240115
        Regex::new(r"[-_](\d{8})\s*$"),
        // name-v2, name_2
        Regex::new(r"[-_]v?(\d+)\s*$"),
    ]
    .map(|pattern| pattern.expect("filename version pattern must compile"))
});

/// Category ordering used when the caller has no preference.
pub const DEFAULT_CATEGORY_ORDER: [&str; 5] = ["main", "update", "optional", "miscellaneous", "old"];

/// A version string split into comparable components.
///
/// Equality and ordering ignore `build`. Unparsed versions compare by their
/// original text, case-insensitively, and are always older than parsed ones.
#[derive(Debug, Clone)]
pub struct ParsedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
    pub original: String,
    pub is_parsed: bool,
}

impl ParsedVersion {
    fn unparsed(original: &str) -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            prerelease: None,
            build: None,
            original: original.to_string(),
            is_parsed: false,
        }
    }

    fn prerelease_key(&self) -> Option<String> {
        self.prerelease.as_deref().map(str::to_lowercase)
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_parsed, other.is_parsed) {
            (false, false) => self
                .original
                .to_lowercase()
                .cmp(&other.original.to_lowercase()),
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => (self.major, self.minor, self.patch)
                .cmp(&(other.major, other.minor, other.patch))
                .then_with(|| match (self.prerelease_key(), other.prerelease_key()) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(a), Some(b)) => a.cmp(&b),
                }),
        }
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn number(captures: &regex::Captures<'_>, index: usize) -> Option<u64> {
    match captures.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn text(captures: &regex::Captures<'_>, index: usize) -> Option<String> {
    captures
        .get(index)
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_semver(cleaned: &str, original: &str) -> Option<ParsedVersion> {
    let captures = SEMVER_PATTERN.captures(cleaned)?;
    Some(ParsedVersion {
        major: number(&captures, 1)?,
        minor: number(&captures, 2)?,
        patch: number(&captures, 3)?,
        prerelease: text(&captures, 4),
        build: text(&captures, 5),
        original: original.to_string(),
        is_parsed: true,
    })
}

fn parse_date(cleaned: &str, original: &str) -> Option<ParsedVersion> {
    let captures = DATE_PATTERN.captures(cleaned)?;
    Some(ParsedVersion {
        major: number(&captures, 1)?,
        minor: number(&captures, 2)?,
        patch: number(&captures, 3)?,
        prerelease: text(&captures, 4),
        build: None,
        original: original.to_string(),
        is_parsed: true,
    })
}

fn parse_simple(cleaned: &str, original: &str) -> Option<ParsedVersion> {
    let captures = SIMPLE_PATTERN.captures(cleaned)?;
    Some(ParsedVersion {
        major: number(&captures, 1)?,
        minor: 0,
        patch: 0,
        prerelease: None,
        build: None,
        original: original.to_string(),
        is_parsed: true,
    })
}

/// Parses a version string. Never fails: unrecognized input comes back with
/// `is_parsed == false`.
///
/// A numeric component too large for `u64` makes its grammar miss, so such
/// input falls through to the next grammar and may end up unparsed.
pub fn parse(version: &str) -> ParsedVersion {
    let cleaned = version.trim();
    if cleaned.is_empty() {
        return ParsedVersion::unparsed(version);
    }

    parse_semver(cleaned, version)
        .or_else(|| parse_date(cleaned, version))
        .or_else(|| parse_simple(cleaned, version))
        .unwrap_or_else(|| {
            tracing::debug!("Could not parse version string: '{}'", version);
            ParsedVersion::unparsed(version)
        })
}

/// Compares two version strings by the [`ParsedVersion`] ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    parse(a).cmp(&parse(b))
}

/// Returns true when `candidate` is strictly newer than `current`.
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

/// Formats a version for display, adding a `v` prefix to recognized versions.
pub fn format_version_display(version: &str) -> String {
    let cleaned = version.trim();
    if cleaned.is_empty() {
        return "Unknown".to_string();
    }
    if cleaned.starts_with(['v', 'V']) {
        return cleaned.to_string();
    }
    if parse(cleaned).is_parsed {
        format!("v{}", cleaned)
    } else {
        cleaned.to_string()
    }
}

/// Best-effort version extraction from an archive file name such as
/// `MyMod-1.2.3.zip` or `MyMod_20240115.zip`.
pub fn extract_version_from_filename(file_name: &str) -> Option<String> {
    if file_name.is_empty() {
        return None;
    }
    let stem = ARCHIVE_EXTENSION.replace(file_name, "");

    FILENAME_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(&stem))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Direction of [`sort_candidates`] within each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// A downloadable file offered for a mod by an external hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub file_id: u64,
    pub mod_id: u64,
    pub name: String,
    pub version: Option<String>,
    pub mod_version: Option<String>,
    pub category_name: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl CandidateFile {
    /// The file's own version, else the parent mod's version, else empty.
    pub fn effective_version(&self) -> &str {
        self.version
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.mod_version.as_deref())
            .unwrap_or("")
    }
}

fn category_rank(category: &str, priority: &[&str]) -> usize {
    priority
        .iter()
        .position(|c| c.eq_ignore_ascii_case(category))
        .unwrap_or(priority.len())
}

/// Newest-first comparison of two files ignoring category.
fn recency(
    a: &CandidateFile,
    a_version: &ParsedVersion,
    b: &CandidateFile,
    b_version: &ParsedVersion,
) -> Ordering {
    let by_version = match (a_version.is_parsed, b_version.is_parsed) {
        (true, true) => b_version.cmp(a_version),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    };
    by_version
        .then_with(|| b.uploaded_at.cmp(&a.uploaded_at))
        .then_with(|| b.file_id.cmp(&a.file_id))
}

/// Sorts candidate files: grouped by category in `category_priority` order
/// (unknown categories last), then by recency within each group.
///
/// `OldestFirst` reverses only the within-category ordering.
pub fn sort_candidates(
    files: &[CandidateFile],
    order: SortOrder,
    category_priority: &[&str],
) -> Vec<CandidateFile> {
    let mut keyed: Vec<(usize, ParsedVersion, &CandidateFile)> = files
        .iter()
        .map(|f| {
            (
                category_rank(&f.category_name, category_priority),
                parse(f.effective_version()),
                f,
            )
        })
        .collect();

    keyed.sort_by(|(a_rank, a_version, a), (b_rank, b_version, b)| {
        a_rank.cmp(b_rank).then_with(|| {
            let within = recency(a, a_version, b, b_version);
            match order {
                SortOrder::NewestFirst => within,
                SortOrder::OldestFirst => within.reverse(),
            }
        })
    });

    keyed.into_iter().map(|(_, _, f)| f.clone()).collect()
}

/// Picks the newest file, optionally restricted to one category.
pub fn newest_candidate<'a>(
    files: &'a [CandidateFile],
    category: Option<&str>,
) -> Option<&'a CandidateFile> {
    let pool: Vec<&CandidateFile> = files
        .iter()
        .filter(|f| category.map_or(true, |c| f.category_name.eq_ignore_ascii_case(c)))
        .collect();

    pool.into_iter().min_by(|a, b| {
        category_rank(&a.category_name, &DEFAULT_CATEGORY_ORDER)
            .cmp(&category_rank(&b.category_name, &DEFAULT_CATEGORY_ORDER))
            .then_with(|| {
                recency(
                    a,
                    &parse(a.effective_version()),
                    b,
                    &parse(b.effective_version()),
                )
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(id: u64, version: &str, category: &str, day: u32) -> CandidateFile {
        CandidateFile {
            file_id: id,
            mod_id: 1,
            name: format!("file-{}", id),
            version: Some(version.to_string()),
            mod_version: None,
            category_name: category.to_string(),
            uploaded_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
        }
    }

    fn ids(files: &[CandidateFile]) -> Vec<u64> {
        files.iter().map(|f| f.file_id).collect()
    }

    #[test]
    fn parses_semver_components() {
        let v = parse("1.2.3");
        assert!(v.is_parsed);
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.prerelease, None);

        let v = parse("v2");
        assert_eq!((v.major, v.minor, v.patch), (2, 0, 0));

        let v = parse("1.0.0-beta.1+build.5");
        assert_eq!(v.prerelease.as_deref(), Some("beta.1"));
        assert_eq!(v.build.as_deref(), Some("build.5"));

        let v = parse("2.0RC1");
        assert_eq!(v.prerelease.as_deref(), Some("RC1"));
    }

    #[test]
    fn parses_dates_and_integers() {
        let v = parse("2024.01.15");
        assert_eq!((v.major, v.minor, v.patch), (2024, 1, 15));

        let v = parse("2024-01-15-hotfix");
        assert!(v.is_parsed);
        assert_eq!((v.major, v.minor, v.patch), (2024, 1, 15));
        assert_eq!(v.prerelease.as_deref(), Some("hotfix"));

        let v = parse("20240115");
        assert!(v.is_parsed);
        assert_eq!((v.major, v.minor, v.patch), (20240115, 0, 0));
    }

    #[test]
    fn parse_is_total() {
        for input in ["", "   ", "Final", "версия 2", "1.2.3.4.5", "v", "+", "٣"] {
            let v = parse(input);
            assert_eq!(v.original, input);
        }
        assert!(!parse("Final").is_parsed);
        assert!(!parse("").is_parsed);

        let long = "9".repeat(10_000);
        assert!(!parse(&long).is_parsed);
        let long = "x".repeat(10_000);
        assert!(!parse(&long).is_parsed);
    }

    #[test]
    fn input_is_trimmed_but_original_kept() {
        let v = parse("  1.4 ");
        assert!(v.is_parsed);
        assert_eq!(v.minor, 4);
        assert_eq!(v.original, "  1.4 ");
    }

    #[test]
    fn release_beats_prerelease() {
        assert!(parse("1.0.0") > parse("1.0.0-beta"));
        assert!(parse("1.0.0-alpha") < parse("1.0.0-BETA"));
        assert!(parse("1.0.1-alpha") > parse("1.0.0"));
    }

    #[test]
    fn unparsed_sorts_below_parsed() {
        assert!(parse("Final") < parse("0.0.1"));
        assert_eq!(compare_versions("final", "FINAL"), Ordering::Equal);
        assert_eq!(compare_versions("alpha-x", "beta-x"), Ordering::Less);
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(compare_versions("1.0.0+a", "1.0.0+b"), Ordering::Equal);
        assert_eq!(parse("1.0+x"), parse("1.0.0"));
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let samples = ["1", "1.0.1", "1.0.0-rc1", "v2.3", "2024-02-01", "Final", "", "0.9b"];
        for a in samples {
            assert_eq!(compare_versions(a, a), Ordering::Equal);
            for b in samples {
                assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse());
            }
        }
    }

    #[test]
    fn newer_version_check() {
        assert!(is_newer_version("1.1", "1.0.9"));
        assert!(!is_newer_version("1.0", "1.0.0"));
        assert!(!is_newer_version("Final", "0.1"));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format_version_display(""), "Unknown");
        assert_eq!(format_version_display("1.2"), "v1.2");
        assert_eq!(format_version_display("V3"), "V3");
        assert_eq!(format_version_display(" Final "), "Final");
    }

    #[test]
    fn extracts_versions_from_file_names() {
        assert_eq!(extract_version_from_filename("ModName-1.2.3.zip").as_deref(), Some("1.2.3"));
        assert_eq!(extract_version_from_filename("ModName_v2.0.0.zip").as_deref(), Some("2.0.0"));
        assert_eq!(extract_version_from_filename("ModName-20240115.zip").as_deref(), Some("20240115"));
        assert_eq!(extract_version_from_filename("ModName-v2.zip").as_deref(), Some("2"));
        assert_eq!(extract_version_from_filename("ModName-1.1-beta.RAR").as_deref(), Some("1.1-beta"));
        assert_eq!(extract_version_from_filename("ModName.zip"), None);
        assert_eq!(extract_version_from_filename(""), None);
    }

    #[test]
    fn sorts_by_category_then_newest() {
        let files = vec![
            file(1, "1.0", "optional", 1),
            file(2, "2.0", "old", 2),
            file(3, "1.1", "main", 3),
            file(4, "1.2", "MAIN", 1),
            file(5, "9.0", "mystery", 9),
        ];
        let sorted = sort_candidates(&files, SortOrder::NewestFirst, &DEFAULT_CATEGORY_ORDER);
        assert_eq!(ids(&sorted), vec![4, 3, 1, 2, 5]);
    }

    #[test]
    fn oldest_first_keeps_category_grouping() {
        let files = vec![
            file(1, "1.0", "main", 1),
            file(2, "1.1", "main", 2),
            file(3, "0.1", "update", 3),
            file(4, "0.2", "update", 4),
        ];
        let sorted = sort_candidates(&files, SortOrder::OldestFirst, &DEFAULT_CATEGORY_ORDER);
        assert_eq!(ids(&sorted), vec![1, 2, 3, 4]);
    }

    #[test]
    fn ties_fall_back_to_upload_time_then_file_id() {
        let files = vec![
            file(10, "Final", "main", 1),
            file(11, "Final", "main", 5),
            file(12, "1.0", "main", 1),
            file(13, "1.0", "main", 1),
        ];
        let sorted = sort_candidates(&files, SortOrder::NewestFirst, &DEFAULT_CATEGORY_ORDER);
        assert_eq!(ids(&sorted), vec![13, 12, 11, 10]);
    }

    #[test]
    fn effective_version_falls_back_to_mod_version() {
        let mut f = file(1, "", "main", 1);
        f.version = None;
        f.mod_version = Some("3.1".to_string());
        assert_eq!(f.effective_version(), "3.1");
        f.mod_version = None;
        assert_eq!(f.effective_version(), "");
    }

    #[test]
    fn newest_candidate_filters_by_category() {
        let files = vec![
            file(1, "1.0", "main", 1),
            file(2, "5.0", "optional", 1),
            file(3, "1.5", "main", 1),
        ];
        assert_eq!(newest_candidate(&files, None).map(|f| f.file_id), Some(3));
        assert_eq!(newest_candidate(&files, Some("Optional")).map(|f| f.file_id), Some(2));
        assert!(newest_candidate(&files, Some("old")).is_none());
        assert!(newest_candidate(&[], None).is_none());
    }
}
