//! Origin/destination pair expansion.

use std::fmt;

/// A resolved origin area and optional destination area, as codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AreaPair {
    pub origin: String,
    pub destination: Option<String>,
}

impl AreaPair {
    pub fn new(origin: impl Into<String>, destination: Option<String>) -> Self {
        Self {
            origin: origin.into(),
            destination,
        }
    }

    pub fn directed(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(origin, Some(destination.into()))
    }

    fn reversed(&self) -> Option<Self> {
        self.destination
            .as_ref()
            .map(|d| Self::directed(d.clone(), self.origin.clone()))
    }
}

impl fmt::Display for AreaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(d) => write!(f, "{} -> {}", self.origin, d),
            None => f.write_str(&self.origin),
        }
    }
}

/// Expand pairs for a dataset.
///
/// When the dataset needs a destination, a pair without one becomes the
/// origin against every other known area in both directions, and a directed
/// pair is followed by its reverse. The result holds each pair once, in
/// first-seen order.
pub fn expand_pairs(pairs: &[AreaPair], requires_destination: bool, areas: &[&str]) -> Vec<AreaPair> {
    let mut expanded: Vec<AreaPair> = Vec::new();
    let mut push = |pair: AreaPair| {
        if !expanded.contains(&pair) {
            expanded.push(pair);
        }
    };

    for pair in pairs {
        if !requires_destination {
            push(pair.clone());
            continue;
        }
        match pair.reversed() {
            Some(reverse) => {
                push(pair.clone());
                push(reverse);
            }
            None => {
                let others = areas.iter().filter(|a| **a != pair.origin);
                for other in others.clone() {
                    push(AreaPair::directed(pair.origin.as_str(), *other));
                }
                for other in others {
                    push(AreaPair::directed(*other, pair.origin.as_str()));
                }
            }
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREAS: &[&str] = &["DK1", "DK2", "SE3", "NO1"];

    #[test]
    fn missing_destination_expands_both_ways() {
        let pairs = expand_pairs(&[AreaPair::new("DK1", None)], true, AREAS);

        assert_eq!(pairs.len(), 6);
        for other in ["DK2", "SE3", "NO1"] {
            let out = AreaPair::directed("DK1", other);
            let back = AreaPair::directed(other, "DK1");
            assert_eq!(pairs.iter().filter(|p| **p == out).count(), 1);
            assert_eq!(pairs.iter().filter(|p| **p == back).count(), 1);
        }
        assert!(pairs.iter().all(|p| p.destination.is_some()));
    }

    #[test]
    fn directed_pair_gets_reverse() {
        let pairs = expand_pairs(&[AreaPair::directed("DK1", "SE3")], true, AREAS);
        assert_eq!(
            pairs,
            vec![
                AreaPair::directed("DK1", "SE3"),
                AreaPair::directed("SE3", "DK1")
            ]
        );
    }

    #[test]
    fn reverse_already_listed_is_not_duplicated() {
        let pairs = expand_pairs(
            &[
                AreaPair::directed("DK1", "SE3"),
                AreaPair::directed("SE3", "DK1"),
                AreaPair::new("DK2", None),
            ],
            true,
            AREAS,
        );
        assert_eq!(pairs.len(), 2 + 6);
        let unique: std::collections::HashSet<_> = pairs.iter().collect();
        assert_eq!(unique.len(), pairs.len());
    }

    #[test]
    fn no_destination_needed_keeps_pairs() {
        let input = [AreaPair::new("DK1", None), AreaPair::new("DK1", None)];
        let pairs = expand_pairs(&input, false, AREAS);
        assert_eq!(pairs, vec![AreaPair::new("DK1", None)]);
    }
}
