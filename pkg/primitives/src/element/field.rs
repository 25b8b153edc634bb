use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ethnum::{uint, U256};

use crate::Element;

impl Element {
    /// The modulus of the proving field (the BN254 scalar field)
    ///
    /// Decimal:
    /// `21888242871839275222246405745257275088548364400416034343698204186575808495617`
    pub const MODULUS: Element = Element(uint!(
        "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001"
    ));

    /// Convert this [`Element`] to its field representation, reducing modulo
    /// [`Element::MODULUS`] on the way in
    #[inline]
    #[must_use]
    pub fn to_fr(self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.to_be_bytes())
    }

    /// Create an [`Element`] from a field value
    ///
    /// The result is always canonical.
    #[inline]
    #[must_use]
    pub fn from_fr(fr: Fr) -> Element {
        let bytes = fr.into_bigint().to_bytes_be();
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(&bytes);
        Self(U256::from_be_bytes(padded))
    }

    /// Reduce this element to its canonical form (the value mod the field
    /// prime)
    ///
    /// Elements in canonical form are guaranteed to be unchanged when
    /// converting to/from a field value.
    #[inline]
    #[must_use]
    pub fn reduce(self) -> Self {
        Self(self.0 % Self::MODULUS.0)
    }

    /// Whether this [`Element`] is in its canonical form
    #[inline]
    #[must_use]
    pub fn is_canonical(self) -> bool {
        self == self.reduce()
    }
}

impl From<Fr> for Element {
    fn from(value: Fr) -> Self {
        Element::from_fr(value)
    }
}

impl From<Element> for Fr {
    fn from(value: Element) -> Self {
        value.to_fr()
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;

    #[proptest]
    fn to_from_fr_biject(element: Element) {
        let element = element.reduce();

        let fr = element.to_fr();
        let element_again = Element::from_fr(fr);

        assert_eq!(element, element_again);
    }

    #[test]
    fn modulus_reduces_to_zero() {
        assert_eq!(Element::MODULUS.reduce(), Element::ZERO);
        assert_eq!((Element::MODULUS + 5u64).reduce(), Element::new(5));
    }
}
