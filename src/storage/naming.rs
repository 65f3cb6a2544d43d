//! Sibling-unique naming.

use chrono::{DateTime, Local};
use log::warn;
use std::collections::HashSet;

/// Upper bound of `_vNNN` candidates probed before the time-based fallback.
pub const MAX_VERSION_PROBES: u32 = 999;

/// Name comparison used for every lookup: case-insensitive, storage keeps case.
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Returns `base` when no taken name matches it, otherwise the first free
/// `base_v001` .. `base_v999`, otherwise `base_v<HHMMSS>`.
pub fn unique_name<'a, I>(taken: I, base: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    unique_name_at(taken, base, Local::now())
}

pub(crate) fn unique_name_at<'a, I>(taken: I, base: &str, now: DateTime<Local>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<String> = taken.into_iter().map(str::to_lowercase).collect();
    if !taken.contains(&base.to_lowercase()) {
        return base.to_string();
    }

    for version in 1..=MAX_VERSION_PROBES {
        let candidate = format!("{}_v{:03}", base, version);
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
    }

    let fallback = format!("{}_v{}", base, now.format("%H%M%S"));
    warn!(
        "all {} versioned names of '{}' are taken, falling back to '{}'",
        MAX_VERSION_PROBES, base, fallback
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unused_base_is_returned_unchanged() {
        assert_eq!(unique_name(["other"], "5k"), "5k");
        assert_eq!(unique_name(Vec::<&str>::new(), "5k"), "5k");
    }

    #[test]
    fn test_first_free_version() {
        let taken = ["5k", "5k_v001", "5k_v002", "5k_v003", "5k_v004", "5k_v005"];
        assert_eq!(unique_name(taken, "5k"), "5k_v006");
    }

    #[test]
    fn test_probe_fills_gaps() {
        assert_eq!(unique_name(["5k", "5k_v002"], "5k"), "5k_v001");
    }

    #[test]
    fn test_collision_is_case_insensitive() {
        assert_eq!(unique_name(["CLUSTERS"], "Clusters"), "Clusters_v001");
    }

    #[test]
    fn test_time_fallback_after_all_probes() {
        let mut taken = vec!["run".to_string()];
        taken.extend((1..=MAX_VERSION_PROBES).map(|v| format!("run_v{:03}", v)));
        let now = Local.with_ymd_and_hms(2024, 10, 4, 13, 5, 9).unwrap();

        let name = unique_name_at(taken.iter().map(String::as_str), "run", now);
        assert_eq!(name, "run_v130509");
    }
}
