//! Similarity-ratio matching with a three-way outcome.
//!
//! The score is `2 * matched_chars / (len(a) + len(b))` over a character diff,
//! so identical strings score 1.0 and disjoint ones 0.0.

use similar::TextDiff;

/// Result of a fuzzy lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuzzyMatch<'a> {
    /// Exactly one candidate qualified.
    Single(&'a str),
    /// Several candidates qualified and none is a clear winner; the caller
    /// must disambiguate.
    Ambiguous(Vec<&'a str>),
    /// Nothing cleared the cutoff.
    NotFound,
}

impl<'a> FuzzyMatch<'a> {
    /// The single match, if there is one.
    pub fn single(&self) -> Option<&'a str> {
        match self {
            Self::Single(s) => Some(s),
            _ => None,
        }
    }
}

/// How query and candidates are folded before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Lower-case, spaces treated as underscores. For names.
    Key,
    /// Lower-case only. For free-text values, which are later split on spaces.
    Lowercase,
}

impl Normalize {
    pub fn apply(self, s: &str) -> String {
        match self {
            Self::Key => s.trim().to_lowercase().replace(' ', "_"),
            Self::Lowercase => s.trim().to_lowercase(),
        }
    }
}

/// Similarity ratio in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Find the candidates closest to `query`.
///
/// Candidates scoring below `cutoff` are discarded and the best `limit` are
/// kept, plus any candidate tied with the last one kept so that a tie is
/// never broken silently. A candidate equal to the query after
/// normalization wins outright.
pub fn close_matches<'a, I>(
    query: &str,
    candidates: I,
    cutoff: f32,
    limit: usize,
    normalize: Normalize,
) -> FuzzyMatch<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = normalize.apply(query);
    let limit = limit.max(1);

    let mut scored: Vec<(f32, &'a str)> = Vec::new();
    for candidate in candidates {
        let folded = normalize.apply(candidate);
        if folded == query {
            return FuzzyMatch::Single(candidate);
        }
        let score = similarity(&query, &folded);
        if score >= cutoff {
            scored.push((score, candidate));
        }
    }

    // Stable sort keeps catalog order among equal scores.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let Some(&(threshold, _)) = scored.get(limit - 1).or(scored.last()) else {
        return FuzzyMatch::NotFound;
    };

    let mut matches: Vec<&'a str> = scored
        .iter()
        .take_while(|(score, _)| *score >= threshold)
        .map(|(_, c)| *c)
        .collect();

    match matches.len() {
        0 => FuzzyMatch::NotFound,
        1 => FuzzyMatch::Single(matches.remove(0)),
        _ => FuzzyMatch::Ambiguous(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        let s = similarity("areas", "area");
        assert!(s > 0.8 && s < 1.0, "got {s}");
    }

    #[test]
    fn exact_match_wins_outright() {
        let candidates = ["Areas", "Area Types", "Arena"];
        let m = close_matches("areas", candidates, 0.4, 1, Normalize::Key);
        assert_eq!(m, FuzzyMatch::Single("Areas"));
    }

    #[test]
    fn best_candidate_returned() {
        let candidates = ["BusinessType", "ProcessType", "Areas"];
        let m = close_matches("business type", candidates, 0.4, 1, Normalize::Key);
        assert_eq!(m, FuzzyMatch::Single("BusinessType"));
    }

    #[test]
    fn ties_are_ambiguous() {
        let candidates = ["abcx", "abcy", "zzzz"];
        let m = close_matches("abc", candidates, 0.4, 1, Normalize::Key);
        assert_eq!(m, FuzzyMatch::Ambiguous(vec!["abcx", "abcy"]));
    }

    #[test]
    fn limit_above_one_lists_all_qualifiers() {
        let candidates = ["load forecast", "load actual", "price"];
        let m = close_matches("load", candidates, 0.4, 2, Normalize::Lowercase);
        assert!(matches!(m, FuzzyMatch::Ambiguous(ref v) if v.len() == 2));
    }

    #[test]
    fn nothing_above_cutoff() {
        let candidates = ["Denmark (DK)", "Sweden (SE)"];
        let m = close_matches("germany", candidates, 0.9, 1, Normalize::Lowercase);
        assert_eq!(m, FuzzyMatch::NotFound);
    }

    #[test]
    fn empty_candidates() {
        let m = close_matches("x", Vec::<&str>::new(), 0.0, 1, Normalize::Key);
        assert_eq!(m, FuzzyMatch::NotFound);
    }

    #[test]
    fn case_is_ignored() {
        let candidates = ["Actual Total Load", "Day-ahead Prices"];
        let a = close_matches("actual total load", candidates, 0.4, 1, Normalize::Key);
        let b = close_matches("ACTUAL TOTAL LOAD", candidates, 0.4, 1, Normalize::Key);
        assert_eq!(a, b);
        assert_eq!(a, FuzzyMatch::Single("Actual Total Load"));
    }
}
