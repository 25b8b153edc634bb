use std::sync::OnceLock;

use rg_primitives::{merge_hash, Element};

use crate::TREE_DEPTH;

/// The hash of an empty subtree whose leaves sit at the given level
///
/// Defined recursively:
///  - `empty_hash_at(0) = Element::ZERO` (the protocol's zero leaf)
///  - `empty_hash_at(n) = merge_hash(empty_hash_at(n - 1), empty_hash_at(n - 1))`
///
/// The ladder is computed once and cached, so calls are essentially free.
///
/// # Panics
///
/// Panics if `level > TREE_DEPTH`; no deeper subtree exists.
#[inline]
#[must_use]
pub fn empty_hash_at(level: usize) -> Element {
    assert!(level <= TREE_DEPTH, "no subtree deeper than the tree");
    cache()[level]
}

fn cache() -> &'static [Element; TREE_DEPTH + 1] {
    static CACHE: OnceLock<[Element; TREE_DEPTH + 1]> = OnceLock::new();

    CACHE.get_or_init(|| {
        let mut ladder = [Element::ZERO; TREE_DEPTH + 1];
        for level in 1..=TREE_DEPTH {
            let child = ladder[level - 1];
            ladder[level] = merge_hash(child, child);
        }
        ladder
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_consistent() {
        assert_eq!(empty_hash_at(0), Element::ZERO);

        for level in 1..=TREE_DEPTH {
            assert_eq!(
                empty_hash_at(level),
                merge_hash(empty_hash_at(level - 1), empty_hash_at(level - 1))
            );
        }
    }
}
