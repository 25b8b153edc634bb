use ethereum_types::{H160, H256, U256};
use rg_primitives::Element;

pub fn element_to_h256(element: Element) -> H256 {
    H256::from_slice(&element.to_be_bytes())
}

pub fn element_to_u256(element: Element) -> U256 {
    U256::from_big_endian(&element.to_be_bytes())
}

pub fn u256_to_element(value: U256) -> Element {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Element::from_be_bytes(bytes)
}

pub fn h256_to_element(value: H256) -> Element {
    Element::from_be_bytes(value.0)
}

pub fn h160_to_element(value: H160) -> Element {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(&value.0);
    Element::from_be_bytes(bytes)
}

/// The low 20 bytes of an element, as an address
pub fn element_to_h160(element: Element) -> H160 {
    H160::from_slice(&element.to_be_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_roundtrip() {
        let element = Element::new(123_456);
        assert_eq!(u256_to_element(element_to_u256(element)), element);
    }

    #[test]
    fn h160_roundtrip_through_element() {
        let address = H160::from_low_u64_be(0xdead_beef);
        assert_eq!(element_to_h160(h160_to_element(address)), address);
    }
}
