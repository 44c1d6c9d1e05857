use std::cmp::Reverse;

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// How a candidate name relates to the query, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchClass {
    Exact,
    Prefix,
    Contains,
    Words,
}

fn classify(query: &str, name: &str) -> (MatchClass, Reverse<usize>) {
    if name == query {
        (MatchClass::Exact, Reverse(0))
    } else if name.starts_with(query) {
        (MatchClass::Prefix, Reverse(0))
    } else if name.contains(query) {
        (MatchClass::Contains, Reverse(0))
    } else {
        let hits = query
            .split(common::naming::SEPARATOR)
            .filter(|word| !word.is_empty() && name.contains(word))
            .count();
        (MatchClass::Words, Reverse(hits))
    }
}

/// Order candidates by relevance to a normalized query.
///
/// Exact matches come first, then prefix matches, then substring matches,
/// then partial word matches by number of words hit. Ties go to the shorter
/// name, then alphabetical order.
pub fn rank_matches<T>(query: &str, mut items: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let query = query.to_lowercase();
    items.sort_by_cached_key(|item| {
        let candidate = name(item).to_lowercase();
        let (class, hits) = classify(&query, &candidate);
        (class, hits, candidate.len(), candidate)
    });
    items
}
