// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Line merge and projection
//!
//! Pure line surgery over artifact contents. The pipeline treats all
//! intermediate data as opaque line-oriented text; the only operations
//! are trim, blank-strip, substring filter, whitespace-column projection,
//! and sorted dedup.

use std::collections::BTreeSet;

use crate::pipeline::MergeRecipe;

/// Apply a merge recipe to already-concatenated source lines.
///
/// Lines are trimmed and blanks dropped first. With `sorted`, the result
/// is lexicographically sorted with exact duplicates removed, giving a
/// stable artifact across runs; without it, input order and duplicates
/// are preserved.
pub fn combine(lines: impl IntoIterator<Item = String>, recipe: &MergeRecipe) -> Vec<String> {
    let cleaned = lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .filter(|line| recipe.filter.map_or(true, |needle| line.contains(needle)))
        .filter_map(|line| match recipe.fields {
            Some(fields) => project(&line, fields),
            None => Some(line),
        });

    if recipe.sorted {
        cleaned.collect::<BTreeSet<_>>().into_iter().collect()
    } else {
        cleaned.collect()
    }
}

/// Select zero-based whitespace-separated columns from a line, joined by
/// a single space. Columns past the end of the line are dropped; a line
/// with none of the requested columns is dropped entirely.
fn project(line: &str, fields: &[usize]) -> Option<String> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    let selected: Vec<&str> = fields
        .iter()
        .filter_map(|&i| columns.get(i).copied())
        .collect();

    if selected.is_empty() {
        None
    } else {
        Some(selected.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_sorts_and_dedups() {
        // two sources concatenated in order: ["b","a","a"] then ["c"]
        let input = lines(&["b", "a", "a", "c"]);
        let result = combine(input, &MergeRecipe::sorted());
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_strips_blanks_and_whitespace() {
        let input = lines(&["  host.example.com  ", "", "   ", "host.example.com"]);
        let result = combine(input, &MergeRecipe::sorted());
        assert_eq!(result, vec!["host.example.com"]);
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let input = lines(&["Host.example.com", "host.example.com"]);
        let result = combine(input, &MergeRecipe::sorted());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_first_column_projection() {
        let input = lines(&[
            "a.example.com [A] [1.2.3.4]",
            "b.example.com [A] [5.6.7.8]",
            "a.example.com [AAAA] [::1]",
        ]);
        let recipe = MergeRecipe {
            filter: None,
            fields: Some(&[0]),
            sorted: true,
        };
        assert_eq!(combine(input, &recipe), vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_filter_with_field_pairs_preserves_order() {
        let input = lines(&[
            "z.example.com [CNAME] x y cdn.example.net",
            "a.example.com [A] [1.2.3.4]",
            "m.example.com [CNAME] x y legacy.example.org",
        ]);
        let recipe = MergeRecipe {
            filter: Some("CNAME"),
            fields: Some(&[0, 4]),
            sorted: false,
        };
        assert_eq!(
            combine(input, &recipe),
            vec![
                "z.example.com cdn.example.net",
                "m.example.com legacy.example.org"
            ]
        );
    }

    #[test]
    fn test_short_lines_drop_missing_columns() {
        let input = lines(&["only-one-column CNAME"]);
        let recipe = MergeRecipe {
            filter: Some("CNAME"),
            fields: Some(&[0, 4]),
            sorted: false,
        };
        // column 4 does not exist; the line keeps its first column
        assert_eq!(combine(input, &recipe), vec!["only-one-column"]);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let result = combine(Vec::<String>::new(), &MergeRecipe::sorted());
        assert!(result.is_empty());
    }
}
