//! Parent resolution from link text
//!
//! Menus do not nest children under their parents in a way the markup makes
//! explicit, so a child is attached to the parent whose name appears in the
//! child's link (`/bebidas/sucos` belongs under `bebidas`).

use crate::ordered::OrderedMap;

/// First candidate, in insertion order, whose case-folded key is a substring
/// of the lower-cased link.
///
/// This is first-match, not best-match: with candidates `a` then `ab`, a link
/// containing `ab` resolves to `a`. `None` means the child has no parent and
/// must be dropped.
pub fn resolve_parent<'a, P>(link: &str, candidates: &'a OrderedMap<P>) -> Option<&'a P> {
    let link = link.to_lowercase();
    candidates
        .iter()
        .find(|(name, _)| link.contains(*name))
        .map(|(_, parent)| parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> OrderedMap<String> {
        names
            .iter()
            .map(|n| (n.to_string(), n.to_uppercase()))
            .collect()
    }

    #[test]
    fn test_single_substring_match() {
        let parents = candidates(&["bebidas", "mercearia", "limpeza"]);
        assert_eq!(
            resolve_parent("https://shop.example/Mercearia/graos", &parents),
            Some(&"MERCEARIA".to_string())
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let parents = candidates(&["bebidas", "mercearia"]);
        assert_eq!(resolve_parent("/hortifruti/frutas", &parents), None);
        assert_eq!(resolve_parent("/anything", &OrderedMap::<String>::new()), None);
    }

    #[test]
    fn test_first_inserted_candidate_wins_over_longer_match() {
        let parents = candidates(&["a", "ab"]);
        assert_eq!(resolve_parent("/ab/c", &parents), Some(&"A".to_string()));

        let reversed = candidates(&["ab", "a"]);
        assert_eq!(resolve_parent("/ab/c", &reversed), Some(&"AB".to_string()));
    }
}
