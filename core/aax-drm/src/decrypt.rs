use crate::keys::FileKeys;
use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decrypts one sample's ciphertext under the file's key/IV. The IV is the
/// same for every sample — each sample is independently encrypted, starting
/// afresh from `file_iv` — per §4.F.
///
/// Trailing bytes that do not form a full 16-byte block are not encrypted in
/// AAX and are passed through verbatim. Output length always equals input
/// length.
pub fn decrypt_sample(ciphertext: &[u8], keys: &FileKeys) -> Vec<u8> {
    let n = ciphertext.len();
    let aligned = n - (n % 16);
    if aligned == 0 {
        return ciphertext.to_vec();
    }

    let mut buf = ciphertext[..aligned].to_vec();
    let decryptor = Aes128CbcDec::new(&keys.key.into(), &keys.iv.into());
    decryptor
        .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
        .expect("aligned block-multiple input never fails NoPadding decryption");

    buf.extend_from_slice(&ciphertext[aligned..]);
    buf
}
