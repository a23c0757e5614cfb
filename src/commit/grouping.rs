//! Deterministic partitioning of changed paths into commit batches.
//!
//! Batches come out in four tiers:
//! 1. one batch per matched category (docs, test, style, refactor);
//! 2. one batch per parent directory, ordered by smallest path;
//! 3. root-level files, one batch per extension, ordered by extension;
//! 4. root-level files without an extension, one batch each.
//!
//! Paths inside a batch are always sorted, and the same input always
//! produces the same output.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::commit::category::Category;

/// Path patterns per category, in priority order.
///
/// Fix and feat have no path patterns: a `feature/` directory says nothing
/// about the kind of change.
pub const PATH_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::Docs,
        &["docs/", "doc/", ".md", ".rst", "readme", "license", "changelog"],
    ),
    (
        Category::Test,
        &["tests/", "test/", "test_", "_test", ".test.", ".spec.", "conftest"],
    ),
    (
        Category::Style,
        &[
            ".editorconfig",
            ".prettierrc",
            ".eslintrc",
            "ruff",
            "lint",
            "prettier",
            "eslint",
            "style",
            "format",
        ],
    ),
    (Category::Refactor, &["refactor"]),
];

/// Category whose path patterns match `path`, if any.
pub fn path_category(path: &str) -> Option<Category> {
    let lowered = path.to_lowercase();
    PATH_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| lowered.contains(p)))
        .map(|(category, _)| *category)
}

/// Split `paths` into ordered batches.
///
/// `max_non_type_groups` caps the number of batches outside tier 1 by
/// repeatedly merging the two smallest ones (size, then first path). A cap
/// of zero is treated as one.
pub fn group_changed_files<I, S>(paths: I, max_non_type_groups: Option<usize>) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut remaining: BTreeSet<String> = paths
        .into_iter()
        .map(|p| normalize(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();

    // Tier 1: category buckets
    let mut type_groups = Vec::new();
    for (category, _) in PATH_PATTERNS {
        let matched: Vec<String> = remaining
            .iter()
            .filter(|p| path_category(p) == Some(*category))
            .cloned()
            .collect();
        if matched.is_empty() {
            continue;
        }
        for path in &matched {
            remaining.remove(path);
        }
        type_groups.push(matched);
    }

    // Tiers 2-4
    let mut by_dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut by_ext: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut singletons = Vec::new();

    for path in remaining {
        if let Some(dir) = parent_dir(&path) {
            by_dir.entry(dir.to_string()).or_default().push(path);
        } else if let Some(ext) = extension(&path) {
            by_ext.entry(ext).or_default().push(path);
        } else {
            singletons.push(vec![path]);
        }
    }

    let mut dir_groups: Vec<Vec<String>> = by_dir.into_values().collect();
    dir_groups.sort_by(|a, b| a[0].cmp(&b[0]));

    let mut other_groups = dir_groups;
    other_groups.extend(by_ext.into_values());
    other_groups.extend(singletons);

    if let Some(cap) = max_non_type_groups {
        merge_smallest(&mut other_groups, cap.max(1));
    }

    type_groups.extend(other_groups);
    type_groups
}

fn normalize(path: &str) -> String {
    path.trim().trim_start_matches("./").to_string()
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Merge the two smallest batches until at most `cap` remain.
fn merge_smallest(groups: &mut Vec<Vec<String>>, cap: usize) {
    while groups.len() > cap {
        let mut order: Vec<usize> = (0..groups.len()).collect();
        order.sort_by(|&a, &b| {
            groups[a]
                .len()
                .cmp(&groups[b].len())
                .then_with(|| groups[a][0].cmp(&groups[b][0]))
        });

        let (keep, absorb) = if order[0] < order[1] {
            (order[0], order[1])
        } else {
            (order[1], order[0])
        };

        let absorbed = groups.remove(absorb);
        groups[keep].extend(absorbed);
        groups[keep].sort();
    }
}
