//! Checksummed bech32 addresses
//!
//! An address is `bech32(prefix, VERSION || packed_pubkey)`. The prefix
//! identifies the network the address was created for; `rgany` is the
//! wildcard used when the chain is unknown.

use bech32::{FromBase32, ToBase32, Variant};

use crate::{Error, Result};

/// The current address format version
pub const ADDRESS_VERSION: u8 = 1;

const PREFIXES: &[(u64, &str)] = &[
    (1, "rgeth"),
    (3, "rgtestropsten"),
    (5, "rgtestgoerli"),
    (56, "rgbsc"),
    (137, "rgpoly"),
];

const ANY_PREFIX: &str = "rgany";

/// A decoded address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub pubkey: Vec<u8>,
    pub chain_id: Option<u64>,
}

/// Encode a public key as a bech32 address
///
/// Unknown chain ids (and `None`) encode under the `rgany` prefix.
#[must_use]
pub fn encode(pubkey: &[u8], chain_id: Option<u64>) -> String {
    let hrp = chain_id
        .and_then(|id| {
            PREFIXES
                .iter()
                .find(|(chain, _)| *chain == id)
                .map(|(_, prefix)| *prefix)
        })
        .unwrap_or(ANY_PREFIX);

    let mut data = vec![ADDRESS_VERSION];
    data.extend_from_slice(pubkey);

    // the hrp is a static lowercase string, so this cannot fail
    bech32::encode(hrp, data.to_base32(), Variant::Bech32).expect("static hrp is valid")
}

/// Decode a bech32 address back into `(pubkey, chain_id)`
///
/// Fails with [`Error::UnknownPrefix`] for a prefix that is neither in the
/// chain table nor `rgany`, and with [`Error::WrongVersion`] if the leading
/// version byte differs from [`ADDRESS_VERSION`].
pub fn decode(addr: &str) -> Result<Address> {
    let (hrp, data, variant) = bech32::decode(addr)?;
    if variant != Variant::Bech32 {
        return Err(Error::Bech32(bech32::Error::InvalidChecksum));
    }

    let chain_id = match PREFIXES.iter().find(|(_, prefix)| *prefix == hrp) {
        Some((chain, _)) => Some(*chain),
        None if hrp == ANY_PREFIX => None,
        None => return Err(Error::UnknownPrefix(hrp)),
    };

    let bytes = Vec::<u8>::from_base32(&data)?;
    let (&version, pubkey) = bytes
        .split_first()
        .ok_or(Error::Bech32(bech32::Error::InvalidLength))?;

    if version != ADDRESS_VERSION {
        return Err(Error::WrongVersion(version));
    }

    Ok(Address {
        pubkey: pubkey.to_vec(),
        chain_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let addr = encode(&[0, 0, 0, 0], Some(1));
        assert_eq!(addr, "rgeth1qyqqqqqqqz8wnw");

        let decoded = decode(&addr).unwrap();
        assert_eq!(decoded.pubkey, vec![0, 0, 0, 0]);
        assert_eq!(decoded.chain_id, Some(1));
    }

    #[test]
    fn roundtrip_all_prefixes() {
        let pubkey = [0x5a; 32];

        for chain_id in [Some(1), Some(3), Some(5), Some(56), Some(137), None] {
            let addr = encode(&pubkey, chain_id);
            let decoded = decode(&addr).unwrap();

            assert_eq!(decoded.pubkey, pubkey);
            assert_eq!(decoded.chain_id, chain_id);
        }
    }

    #[test]
    fn unknown_chain_encodes_as_any() {
        let addr = encode(&[1, 2, 3], Some(424242));
        assert!(addr.starts_with("rgany1"));
        assert_eq!(decode(&addr).unwrap().chain_id, None);
    }

    #[test]
    fn unknown_prefix_rejected() {
        let addr =
            "rgunknown1q8hxknrs97q8pjxaagwthzc0df99rzmhl2xnlxmgv9akv32sua0kf8kjxv0uzkrc";
        assert!(matches!(decode(addr), Err(Error::UnknownPrefix(_))));
    }

    #[test]
    fn version_mismatch_rejected() {
        // re-encode the same payload with a flipped version byte
        let mut data = vec![ADDRESS_VERSION + 1];
        data.extend_from_slice(&[0u8; 32]);
        let addr = bech32::encode("rgeth", data.to_base32(), Variant::Bech32).unwrap();

        assert!(matches!(decode(&addr), Err(Error::WrongVersion(2))));
    }
}
