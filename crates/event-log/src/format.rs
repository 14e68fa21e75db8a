//! Pure helpers that turn request-time state into log field text.
//!
//! Nothing in here performs I/O. Tallies and score maps arrive as unordered
//! hash maps, so every map is rendered with its keys sorted to keep the
//! output identical across runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::BuildHasher;

use chrono::{DateTime, Local};

/// Layout used for the leading timestamp field of every record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `now` as `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(now: &DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Annotate `user` with its group, yielding `user(group)`.
///
/// An absent or empty group leaves the user name unchanged.
pub fn format_user(user: &str, group: Option<&str>) -> String {
    match group {
        Some(group) if !group.is_empty() => format!("{user}({group})"),
        _ => user.to_string(),
    }
}

/// Render a rule tally as `key count, key count, ...` with keys sorted by
/// their display text.
///
/// Distinct rules that display identically are merged and their counts
/// summed.
pub fn format_tally<K, S>(tally: &HashMap<K, i64, S>) -> String
where
    K: Display,
    S: BuildHasher,
{
    let mut sorted: BTreeMap<String, i64> = BTreeMap::new();
    for (rule, count) in tally {
        let total = sorted.entry(rule.to_string()).or_insert(0);
        *total = total.saturating_add(*count);
    }

    sorted
        .iter()
        .map(|(rule, count)| format!("{rule} {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render per-category scores. Same layout as [`format_tally`].
pub fn format_scores<S: BuildHasher>(scores: &HashMap<String, i64, S>) -> String {
    format_tally(scores)
}

/// Stringify any field value using its `Display` form.
pub fn coerce_to_text(value: impl Display) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(PartialEq, Eq, Hash)]
    struct Rule {
        category: &'static str,
        pattern: &'static str,
    }

    impl Display for Rule {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{} {}", self.category, self.pattern)
        }
    }

    #[test]
    fn timestamp_has_second_resolution() {
        let ts = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-07 09:05:02");
    }

    #[test]
    fn user_with_group_is_annotated() {
        assert_eq!(format_user("alice", Some("staff")), "alice(staff)");
    }

    #[test]
    fn user_without_group_is_unchanged() {
        assert_eq!(format_user("alice", None), "alice");
        assert_eq!(format_user("alice", Some("")), "alice");
    }

    #[test]
    fn tally_is_sorted_by_key() {
        let mut tally = HashMap::new();
        tally.insert("zeta".to_string(), 1);
        tally.insert("alpha".to_string(), 3);
        tally.insert("mid".to_string(), 2);
        assert_eq!(format_tally(&tally), "alpha 3, mid 2, zeta 1");
    }

    #[test]
    fn tally_ignores_insertion_order() {
        let pairs = [("b", 2), ("a", 1), ("d", 4), ("c", 3)];

        let mut forward = HashMap::new();
        for (k, v) in pairs {
            forward.insert(k, v);
        }
        let mut backward = HashMap::new();
        for (k, v) in pairs.iter().rev() {
            backward.insert(*k, *v);
        }

        assert_eq!(format_tally(&forward), format_tally(&backward));
        assert_eq!(format_tally(&forward), "a 1, b 2, c 3, d 4");
    }

    #[test]
    fn tally_uses_rule_display_text() {
        let mut tally = HashMap::new();
        tally.insert(
            Rule {
                category: "domain",
                pattern: "example.com",
            },
            2,
        );
        tally.insert(
            Rule {
                category: "content",
                pattern: "casino",
            },
            5,
        );
        assert_eq!(format_tally(&tally), "content casino 5, domain example.com 2");
    }

    #[test]
    fn colliding_display_keys_are_summed() {
        #[derive(PartialEq, Eq, Hash)]
        struct Tagged(u8, &'static str);

        impl Display for Tagged {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.1)
            }
        }

        let mut tally = HashMap::new();
        tally.insert(Tagged(1, "dup"), 2);
        tally.insert(Tagged(2, "dup"), 3);
        assert_eq!(format_tally(&tally), "dup 5");
    }

    #[test]
    fn colliding_counts_saturate() {
        #[derive(PartialEq, Eq, Hash)]
        struct Tagged(u8);

        impl Display for Tagged {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("dup")
            }
        }

        let mut tally = HashMap::new();
        tally.insert(Tagged(1), i64::MAX);
        tally.insert(Tagged(2), 1);
        assert_eq!(format_tally(&tally), format!("dup {}", i64::MAX));
    }

    #[test]
    fn empty_maps_render_empty() {
        let tally: HashMap<String, i64> = HashMap::new();
        assert_eq!(format_tally(&tally), "");
        assert_eq!(format_scores(&HashMap::new()), "");
    }

    #[test]
    fn scores_render_like_tallies() {
        let mut scores = HashMap::new();
        scores.insert("gambling".to_string(), 120);
        scores.insert("adult".to_string(), -5);
        assert_eq!(format_scores(&scores), "adult -5, gambling 120");
    }

    #[test]
    fn coerce_uses_display() {
        assert_eq!(coerce_to_text(404), "404");
        assert_eq!(coerce_to_text("GET"), "GET");
        assert_eq!(coerce_to_text(-1i64), "-1");
    }
}
