//! The persisted-state key layout
//!
//! Keys are path segments joined by `:`. Numeric segments are lowercase hex,
//! left-padded with zeroes to a fixed width so lexicographic key order
//! matches numeric order and prefix scans stay cheap.

/// Width of a padded numeric key segment
const SEGMENT_WIDTH: usize = 32;

/// Join key path segments with `:`
#[must_use]
pub fn join(segments: &[&str]) -> Vec<u8> {
    segments.join(":").into_bytes()
}

/// Lowercase hex of `value`, left-padded with zeroes to `width`
#[must_use]
pub fn pad_hex(value: u64, width: usize) -> String {
    format!("{value:0>width$x}")
}

/// Left-pad a string with zeroes to `width`
#[must_use]
pub fn pad_str(value: &str, width: usize) -> String {
    format!("{value:0>width$}")
}

/// Key of the encrypted wallet-details blob
#[must_use]
pub fn wallet_details_key(wallet_id: &str) -> Vec<u8> {
    let zeros = "0".repeat(64);
    join(&["wallet", &pad_str(wallet_id, 64), &zeros])
}

/// Key of the encrypted mnemonic blob
#[must_use]
pub fn mnemonic_key(wallet_id: &str) -> Vec<u8> {
    join(&["wallet", wallet_id])
}

/// Key of a TXO record
#[must_use]
pub fn txo_key(wallet_id: &str, chain_id: u64, tree: u64, position: u64) -> Vec<u8> {
    join(&[
        "txo",
        wallet_id,
        &pad_hex(chain_id, SEGMENT_WIDTH),
        &pad_hex(tree, SEGMENT_WIDTH),
        &pad_hex(position, SEGMENT_WIDTH),
    ])
}

/// Prefix under which all of a wallet's TXO records for one chain live
#[must_use]
pub fn txo_prefix(wallet_id: &str, chain_id: u64) -> Vec<u8> {
    let mut prefix = join(&["txo", wallet_id, &pad_hex(chain_id, SEGMENT_WIDTH)]);
    prefix.push(b':');
    prefix
}

/// Key of the adapter's replay cursor for one chain
#[must_use]
pub fn last_synced_block_key(chain_id: u64) -> Vec<u8> {
    join(&["sync", &pad_hex(chain_id, SEGMENT_WIDTH)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(pad_hex(0x2a, 4), "002a");
        assert_eq!(pad_hex(0, 2), "00");
        assert_eq!(pad_str("abc", 6), "000abc");
    }

    #[test]
    fn txo_keys_sort_by_position() {
        let a = txo_key("w", 1, 0, 9);
        let b = txo_key("w", 1, 0, 10);
        let c = txo_key("w", 1, 1, 0);

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn txo_prefix_covers_only_the_chain() {
        let prefix = txo_prefix("w", 1);

        assert!(txo_key("w", 1, 0, 0).starts_with(&prefix));
        assert!(txo_key("w", 1, 200, 5000).starts_with(&prefix));
        assert!(!txo_key("w", 2, 0, 0).starts_with(&prefix));
    }

    #[test]
    fn wallet_keys_are_distinct() {
        assert_ne!(wallet_details_key("abc"), mnemonic_key("abc"));
    }
}
