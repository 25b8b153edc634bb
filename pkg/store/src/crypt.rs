use rg_primitives::aes::{self, Ciphertext};

use crate::{Error, Result};

/// Encrypt a value for storage: `iv(16) || ciphertext`
#[must_use]
pub fn seal_value(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let Ciphertext { iv, data } = aes::encrypt(plaintext, key);

    let mut sealed = Vec::with_capacity(16 + data.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&data);
    sealed
}

/// Decrypt a stored value produced by [`seal_value`]
///
/// CTR mode is unauthenticated, so a wrong key yields garbage rather than an
/// error here; callers detect that when the decoded payload fails to parse.
pub fn open_value(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < 16 {
        return Err(Error::DbCorruption("sealed value shorter than its iv"));
    }

    let (iv, data) = sealed.split_at(16);
    let ciphertext = Ciphertext {
        iv: iv.try_into().expect("split at 16"),
        data: data.to_vec(),
    };

    Ok(aes::decrypt(&ciphertext, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = [11u8; 32];
        let sealed = seal_value(&key, b"wallet details");

        assert_eq!(open_value(&key, &sealed).unwrap(), b"wallet details");
    }

    #[test]
    fn wrong_key_gives_garbage_not_error() {
        let sealed = seal_value(&[1u8; 32], b"payload");
        let opened = open_value(&[2u8; 32], &sealed).unwrap();
        assert_ne!(opened, b"payload");
    }

    #[test]
    fn truncated_value_is_corruption() {
        assert!(matches!(
            open_value(&[0u8; 32], &[1, 2, 3]),
            Err(Error::DbCorruption(_))
        ));
    }
}
