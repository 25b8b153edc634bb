use borsh::{BorshDeserialize, BorshSerialize};

/// The wallet's scan cursor, persisted encrypted
///
/// `tree_scanned_heights[tree]` is the next unscanned leaf index of that
/// tree. `primary_height`/`change_height` are the highest derivation indices
/// at which a received note has ever been found; the sweep looks
/// `gap_limit` indices past them.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WalletDetails {
    pub tree_scanned_heights: Vec<u64>,
    pub primary_height: u64,
    pub change_height: u64,
}

impl WalletDetails {
    #[must_use]
    pub fn height(&self, change: bool) -> u64 {
        match change {
            false => self.primary_height,
            true => self.change_height,
        }
    }

    pub fn raise_height(&mut self, change: bool, height: u64) {
        let slot = match change {
            false => &mut self.primary_height,
            true => &mut self.change_height,
        };
        *slot = (*slot).max(height);
    }

    /// Make sure a scan cursor exists for every tree up to `latest_tree`
    pub fn extend_trees(&mut self, latest_tree: u64) {
        let len = (latest_tree + 1) as usize;
        if self.tree_scanned_heights.len() < len {
            self.tree_scanned_heights.resize(len, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_are_monotone() {
        let mut details = WalletDetails::default();

        details.raise_height(false, 4);
        details.raise_height(false, 2);
        assert_eq!(details.height(false), 4);

        details.raise_height(true, 1);
        assert_eq!(details.height(true), 1);
        assert_eq!(details.height(false), 4);
    }

    #[test]
    fn extend_trees_never_shrinks() {
        let mut details = WalletDetails {
            tree_scanned_heights: vec![10, 20],
            ..Default::default()
        };

        details.extend_trees(3);
        assert_eq!(details.tree_scanned_heights, vec![10, 20, 0, 0]);

        details.extend_trees(0);
        assert_eq!(details.tree_scanned_heights.len(), 4);
    }
}
