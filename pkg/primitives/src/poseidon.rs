use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::Element;

/// Hash a sequence of field elements with the circuit's Poseidon
/// parameterization
///
/// Inputs are reduced modulo [`Element::MODULUS`] before hashing, so this is
/// a total function over any sequence of 1 to 12 elements.
///
/// ```rust
/// # use rg_primitives::*;
/// let a = poseidon(&[Element::new(1), Element::new(2)]);
/// let b = poseidon(&[Element::new(2), Element::new(1)]);
///
/// // the hash is not symmetric
/// assert_ne!(a, b);
/// ```
///
/// # Panics
///
/// Panics if called with 0 or more than 12 inputs (arities with no circom
/// parameter set).
#[must_use]
pub fn poseidon(inputs: &[Element]) -> Element {
    let frs = inputs.iter().map(|e| e.to_fr()).collect::<Vec<_>>();

    let mut hasher =
        Poseidon::<Fr>::new_circom(frs.len()).expect("arity in the circom parameter range");

    // the input length always matches the arity the hasher was built with
    let hash = hasher.hash(&frs).expect("input length matches arity");
    Element::from_fr(hash)
}

/// Hash two elements together
///
/// This is the Merkle tree's internal-node hash:
/// `parent = merge_hash(left, right)`.
///
/// ```rust
/// # use rg_primitives::*;
/// let ab = merge_hash(Element::new(1), Element::new(2));
/// assert_eq!(ab, poseidon(&[Element::new(1), Element::new(2)]));
/// ```
#[inline]
#[must_use]
pub fn merge_hash(left: Element, right: Element) -> Element {
    poseidon(&[left, right])
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use ark_bn254::Fr;

    use super::*;

    #[test]
    fn matches_circom_vector() {
        // circomlib: poseidon([1, 2])
        let expected = Fr::from_str(
            "7853200120776062878684798364095072458815029376092732009249414926327459813530",
        )
        .unwrap();

        let hash = poseidon(&[Element::new(1), Element::new(2)]);
        assert_eq!(hash, Element::from_fr(expected));
    }

    #[test]
    fn deterministic() {
        let inputs = [Element::new(5), Element::new(6), Element::new(7)];
        assert_eq!(poseidon(&inputs), poseidon(&inputs));
    }

    #[test]
    fn distinct_inputs_distinct_hashes() {
        let a = merge_hash(Element::ZERO, Element::ZERO);
        let b = merge_hash(Element::ZERO, Element::ONE);
        let c = merge_hash(Element::ONE, Element::ZERO);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn reduces_noncanonical_inputs() {
        let a = poseidon(&[Element::new(3)]);
        let b = poseidon(&[Element::MODULUS + 3u64]);
        assert_eq!(a, b);
    }
}
