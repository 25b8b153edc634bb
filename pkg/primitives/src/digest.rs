use sha2::{Digest, Sha256};

use crate::Element;

/// sha256 of a byte slice
#[must_use]
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// sha256 of a byte slice, reduced into the proving field
///
/// Off-circuit digests are always reduced modulo [`Element::MODULUS`] before
/// being used as field elements.
#[must_use]
pub fn sha256_to_element(bytes: &[u8]) -> Element {
    Element::from_be_bytes(sha256(bytes)).reduce()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_vector() {
        // sha256 of the empty string
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_element_is_canonical() {
        let e = sha256_to_element(b"some bytes");
        assert!(e.is_canonical());
    }
}
