use ethnum::U256;

mod arith;
mod borsh_impls;
mod convert;
mod field;
mod fmt;
mod serde;

/// A 256-bit unsigned integer
///
/// This type is a wrapper around a [`U256`], so can represent any value in the
/// range `0..=(2^256 - 1)`. Circuit-facing code converts it to an
/// [`ark_bn254::Fr`], an integer modulo the SNARK prime, which restricts the
/// set of usable values to something approximating a `u254`. See
/// [`Element::MODULUS`] and [`Element::reduce`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[serde(transparent)]
pub struct Element(#[serde(with = "serde")] pub(crate) U256);

impl Element {
    /// The zero element (also the Merkle tree's null leaf)
    pub const ZERO: Self = Self(U256::ZERO);

    /// The one element
    pub const ONE: Self = Self(U256::ONE);

    /// The largest possible element (note that this is not canonical)
    pub const MAX: Self = Self(U256::MAX);

    /// Create a new [`Element`] from a u64
    ///
    /// This is largely provided to help type inference in simple cases
    #[inline]
    #[must_use]
    pub fn new(i: u64) -> Self {
        Self(U256::from(i))
    }

    /// Convert this [`Element`] to the underlying U256
    #[inline]
    #[must_use]
    pub fn to_u256(self) -> U256 {
        self.0
    }

    /// Convert this [`Element`] to a hex string (no `0x` prefix)
    #[inline]
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.to_be_bytes())
    }

    /// If this element is zero, returns true
    #[inline]
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

macro_rules! partial_eq_impl {
    ($int:ty) => {
        impl PartialEq<$int> for Element {
            fn eq(&self, other: &$int) -> bool {
                *self == Element::from(*other)
            }
        }
    };
}

partial_eq_impl!(bool);
partial_eq_impl!(u8);
partial_eq_impl!(u16);
partial_eq_impl!(u32);
partial_eq_impl!(u64);
partial_eq_impl!(u128);

#[cfg(any(test, feature = "proptest"))]
mod proptest_impls {
    use super::Element;
    use ::proptest::{arbitrary::StrategyFor, prelude::*, strategy::Map};
    use ethnum::U256;

    impl Arbitrary for Element {
        type Strategy = Map<StrategyFor<[u8; 32]>, fn([u8; 32]) -> Self>;
        type Parameters = ();

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            any::<[u8; 32]>().prop_map(|array| Self(U256::from_be_bytes(array)))
        }
    }
}

#[cfg(test)]
mod test {
    use super::Element;

    #[test]
    fn syntax_test() {
        let element = Element::new(123);

        assert_eq!(element + 1u64, Element::new(124));
        assert_eq!(element - 2u64, Element::new(121));
        assert_eq!(element + Element::ONE, Element::new(124));

        assert_eq!(Element::new(1).to_string(), "1");
        assert_eq!(Element::new(100).to_string(), "64");

        assert_eq!(
            (1..=10).map(Element::new).sum::<Element>(),
            Element::new(55)
        );
    }
}
