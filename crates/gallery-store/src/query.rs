use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Profile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSort {
    #[default]
    Newest,
    Name,
    Likes,
    Views,
    Rating,
    Subscribers,
}

/// Filter shared by both storage backends.
#[derive(Debug, Clone, Default)]
pub struct ProfileQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub include_inactive: bool,
    pub sort: ProfileSort,
}

impl ProfileQuery {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn matches(&self, profile: &Profile) -> bool {
        if !self.include_inactive && !profile.is_active {
            return false;
        }

        if let Some(category) = self.category.as_deref().map(category_key).filter(|c| !c.is_empty()) {
            let same = profile
                .category
                .as_deref()
                .is_some_and(|c| category_key(c) == category);
            if !same {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
                hit(Some(&profile.name))
                    || hit(profile.title.as_deref())
                    || hit(profile.description.as_deref())
                    || hit(profile.location.as_deref())
                    || profile.tag_list().into_iter().any(|t| hit(Some(t)))
            }
            None => true,
        }
    }

    pub fn sort(&self, profiles: &mut [Profile]) {
        fn by_counter(field: fn(&Profile) -> Option<&str>) -> impl Fn(&Profile, &Profile) -> Ordering {
            move |a: &Profile, b: &Profile| {
                parse_counter(field(b).unwrap_or_default())
                    .cmp(&parse_counter(field(a).unwrap_or_default()))
            }
        }

        match self.sort {
            ProfileSort::Newest => profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProfileSort::Name => profiles.sort_by_key(|p| p.name.to_lowercase()),
            ProfileSort::Likes => profiles.sort_by(by_counter(|p| p.likes_count.as_deref())),
            ProfileSort::Views => profiles.sort_by(by_counter(|p| p.views_count.as_deref())),
            ProfileSort::Subscribers => profiles.sort_by(by_counter(|p| p.subscribers_count.as_deref())),
            ProfileSort::Rating => profiles.sort_by(|a, b| {
                let rating = |p: &Profile| {
                    p.rating
                        .as_deref()
                        .and_then(|r| r.trim().parse::<f64>().ok())
                        .unwrap_or(0.0)
                };
                rating(b).partial_cmp(&rating(a)).unwrap_or(Ordering::Equal)
            }),
        }
    }

    /// Filters and sorts in one pass.
    pub fn apply(&self, profiles: Vec<Profile>) -> Vec<Profile> {
        let mut matching: Vec<_> = profiles.into_iter().filter(|p| self.matches(p)).collect();
        self.sort(&mut matching);
        matching
    }
}

/// Parses counters such as `"12,345"`, `"1.2K"` or `"3M"`. Anything that
/// does not parse counts as zero.
pub fn parse_counter(raw: &str) -> u64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '+'))
        .collect();

    let (number, multiplier) = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    match number.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => (n * multiplier).round() as u64,
        _ => 0,
    }
}

/// Case-folded form used both for filtering and for merging counts.
fn category_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Distinct categories with profile counts, most populated first. Categories
/// that differ only by case are merged under the first spelling seen.
pub fn category_counts(profiles: &[Profile]) -> Vec<CategoryCount> {
    let mut counts: HashMap<String, CategoryCount> = HashMap::new();
    for category in profiles
        .iter()
        .filter_map(|p| p.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        counts
            .entry(category_key(category))
            .or_insert_with(|| CategoryCount { category: category.to_string(), count: 0 })
            .count += 1;
    }

    let mut out: Vec<_> = counts.into_values().collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProfile;
    use chrono::{Duration, Utc};

    fn profile(id: &str, name: &str, category: &str, likes: &str, age_secs: i64) -> Profile {
        let mut p = NewProfile {
            name: name.into(),
            category: Some(category.into()),
            likes_count: Some(likes.into()),
            tags: vec!["outdoor".into()],
            ..Default::default()
        }
        .into_profile(id.into(), Utc::now() - Duration::seconds(age_secs));
        p.description = Some(format!("{name} shares travel photos"));
        p
    }

    #[test]
    fn counters_parse_suffixes_and_separators() {
        assert_eq!(parse_counter("12,345"), 12_345);
        assert_eq!(parse_counter("1.2K"), 1_200);
        assert_eq!(parse_counter("3m"), 3_000_000);
        assert_eq!(parse_counter(" 7 "), 7);
        assert_eq!(parse_counter("n/a"), 0);
        assert_eq!(parse_counter(""), 0);
        assert_eq!(parse_counter("-5"), 0);
    }

    #[test]
    fn inactive_profiles_are_hidden_by_default() {
        let mut p = profile("a", "Ann", "Art", "1", 0);
        p.is_active = false;

        assert!(!ProfileQuery::active().matches(&p));
        let admin = ProfileQuery { include_inactive: true, ..Default::default() };
        assert!(admin.matches(&p));
    }

    #[test]
    fn search_covers_name_description_and_tags() {
        let p = profile("a", "Ann", "Art", "1", 0);
        let search = |s: &str| ProfileQuery { search: Some(s.into()), ..Default::default() };

        assert!(search("ANN").matches(&p));
        assert!(search("travel").matches(&p));
        assert!(search("outdo").matches(&p));
        assert!(!search("cooking").matches(&p));
        assert!(search("   ").matches(&p));
    }

    #[test]
    fn category_match_is_case_insensitive_and_exact() {
        let p = profile("a", "Ann", "Fitness", "1", 0);
        let q = |c: &str| ProfileQuery { category: Some(c.into()), ..Default::default() };
        assert!(q("fitness").matches(&p));
        assert!(!q("fit").matches(&p));
    }

    #[test]
    fn counted_categories_can_be_filtered_by_any_spelling() {
        let profiles = vec![
            profile("a", "Ann", "Ébène", "0", 0),
            profile("b", "Bob", "ébène ", "0", 0),
        ];
        let counts = category_counts(&profiles);
        assert_eq!(counts, vec![CategoryCount { category: "Ébène".into(), count: 2 }]);

        for spelling in ["ébène", "ÉBÈNE", " Ébène"] {
            let q = ProfileQuery { category: Some(spelling.into()), ..Default::default() };
            assert_eq!(q.apply(profiles.clone()).len(), 2, "{spelling}");
        }
    }

    #[test]
    fn sorts_by_counter_value_not_string() {
        let profiles = vec![
            profile("a", "Ann", "Art", "900", 0),
            profile("b", "Bob", "Art", "1.5K", 0),
            profile("c", "Cid", "Art", "20K", 0),
        ];
        let q = ProfileQuery { sort: ProfileSort::Likes, ..Default::default() };
        let ids: Vec<_> = q.apply(profiles).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn newest_first_by_default() {
        let profiles = vec![
            profile("old", "Old", "Art", "0", 100),
            profile("new", "New", "Art", "0", 1),
        ];
        let ids: Vec<_> = ProfileQuery::active().apply(profiles).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn categories_are_counted_case_insensitively() {
        let profiles = vec![
            profile("a", "Ann", "Art", "0", 0),
            profile("b", "Bob", "art", "0", 0),
            profile("c", "Cid", "Music", "0", 0),
        ];
        let counts = category_counts(&profiles);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].category, "Art");
        assert_eq!(counts[1], CategoryCount { category: "Music".into(), count: 1 });
    }
}
