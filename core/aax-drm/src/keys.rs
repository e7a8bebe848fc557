use crate::error::{DrmError, Result};
use aax_container::{AdrmBlob, ActivationValue};
use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use sha1::{Digest, Sha1};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Process-wide 16-byte constant used throughout key derivation.
const FIXED_KEY: [u8; 16] = hex_to_bytes_16(*b"77214d4b196a87cd520045fd20a51d67");

/// Decodes a 32-character hex literal into 16 bytes at compile time.
const fn hex_to_bytes_16(hex: [u8; 32]) -> [u8; 16] {
    const fn nibble(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => panic!("FIXED_KEY literal contains a non-hex character"),
        }
    }
    let mut out = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        out[i] = (nibble(hex[i * 2]) << 4) | nibble(hex[i * 2 + 1]);
        i += 1;
    }
    out
}

/// The derived per-file `(aes_key_16B, aes_iv_16B)` pair used to decrypt
/// every audio sample in a given file.
#[derive(Debug, Clone)]
pub struct FileKeys {
    pub key: [u8; 16],
    pub iv: [u8; 16],
}

/// Intermediate derivation from a 4-byte activation value: two SHA-1 passes
/// seeded with `FIXED_KEY`, per §4.E.
fn intermediate_key_iv(activation: &[u8; 4]) -> ([u8; 16], [u8; 16]) {
    let mut ik_hasher = Sha1::new();
    ik_hasher.update(FIXED_KEY);
    ik_hasher.update(activation);
    let ik_full = ik_hasher.finalize();

    let mut iv_hasher = Sha1::new();
    iv_hasher.update(FIXED_KEY);
    iv_hasher.update(ik_full);
    iv_hasher.update(activation);
    let iv_full = iv_hasher.finalize();

    let mut ik = [0u8; 16];
    let mut iv = [0u8; 16];
    ik.copy_from_slice(&ik_full[0..16]);
    iv.copy_from_slice(&iv_full[0..16]);
    (ik, iv)
}

/// Validates `activation` against the checksum embedded in `adrm`. Never
/// fails on a well-formed 4-byte activation: structural problems with
/// `adrm` (too short) simply make this return `false`, since it is a
/// predicate consulted speculatively, not a fallible operation.
pub fn validate(adrm: &AdrmBlob, activation: &ActivationValue) -> bool {
    let Some(checksum) = adrm.checksum() else {
        return false;
    };
    let (ik, iv) = intermediate_key_iv(activation.as_bytes());

    let mut hasher = Sha1::new();
    hasher.update(ik);
    hasher.update(iv);
    let computed = hasher.finalize();

    computed.as_slice() == checksum
}

/// Derives the per-file key/IV pair. Only meaningful after `validate`
/// returns `true` for the same `(adrm, activation)` pair; the post-condition
/// (`dec[0..4] == reverse(activation)`) is asserted here and surfaced as
/// `DrmError::CorruptDrmPayload` if it fails.
pub fn derive_keys(adrm: &AdrmBlob, activation: &ActivationValue) -> Result<FileKeys> {
    let enc = adrm
        .encrypted_payload()
        .ok_or(DrmError::ActivationMismatch)?;
    let (ik, iv) = intermediate_key_iv(activation.as_bytes());

    let mut dec = enc.to_vec();
    let decryptor = Aes128CbcDec::new(&ik.into(), &iv.into());
    decryptor
        .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut dec)
        .map_err(|_| DrmError::CorruptDrmPayload)?;

    if dec.len() < 42 || dec[0..4] != activation.reversed() {
        return Err(DrmError::CorruptDrmPayload);
    }

    let mut file_key = [0u8; 16];
    file_key.copy_from_slice(&dec[8..24]);

    let mut iv_hasher = Sha1::new();
    iv_hasher.update(&dec[26..42]);
    iv_hasher.update(file_key);
    iv_hasher.update(FIXED_KEY);
    let file_iv_full = iv_hasher.finalize();
    let mut file_iv = [0u8; 16];
    file_iv.copy_from_slice(&file_iv_full[0..16]);

    Ok(FileKeys {
        key: file_key,
        iv: file_iv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn hex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    const ADRM_HEX: &str = "000000000000000010c109d2da6e22f3c7448de5a85c840c9405c34b1fcd73847e6439822dfcb987eae9e75efd98a411f7d90934872c78640000000000000000000000007b19e237cd6eef8770b30a93fe165070ab199e54";

    #[test]
    fn fixed_key_decodes_correctly() {
        assert_eq!(FIXED_KEY.to_vec(), hex("77214d4b196a87cd520045fd20a51d67"));
    }

    #[test]
    fn validate_accepts_correct_activation() {
        let adrm = AdrmBlob(hex(ADRM_HEX));
        let activation = ActivationValue::from_str("1CEB00DA").unwrap();
        assert!(validate(&adrm, &activation));
    }

    #[test]
    fn validate_rejects_wrong_activation() {
        let adrm = AdrmBlob(hex(ADRM_HEX));
        let activation = ActivationValue::from_str("00000000").unwrap();
        assert!(!validate(&adrm, &activation));
    }

    #[test]
    fn validate_is_false_not_err_on_short_adrm() {
        let adrm = AdrmBlob(vec![0u8; 10]);
        let activation = ActivationValue::from_str("1CEB00DA").unwrap();
        assert!(!validate(&adrm, &activation));
    }

    #[test]
    fn derive_keys_matches_known_vector() {
        let adrm = AdrmBlob(hex(ADRM_HEX));
        let activation = ActivationValue::from_str("1CEB00DA").unwrap();
        assert!(validate(&adrm, &activation));

        let keys = derive_keys(&adrm, &activation).unwrap();
        assert_eq!(keys.key.to_vec(), hex("00112233445566778899aabbccddeeff"));
        assert_eq!(keys.iv.to_vec(), hex("49055b8817d9eb7277872c131dfffb1c"));
    }

    #[test]
    fn derive_keys_fails_cleanly_on_garbage_adrm() {
        let adrm = AdrmBlob(vec![0u8; 88]);
        let activation = ActivationValue::from_str("1CEB00DA").unwrap();
        // A zeroed adrm won't satisfy the post-decryption check; derive_keys
        // must return an error rather than panic.
        assert!(derive_keys(&adrm, &activation).is_err());
    }
}
