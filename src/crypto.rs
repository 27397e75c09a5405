use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{self, Argon2, Params};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::storage::{KeyValueStore, StorageError};

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// Prefix of every plaintext; finding it after decryption proves the passphrase.
const MAGIC: &[u8] = b"LENSTRK1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted record")]
    Decryption,
    #[error("record too short to be encrypted data")]
    InvalidFormat,
}

/// Argon2id, 64 MiB, 3 passes.
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let params = Params::new(65536, 3, 1, Some(KEY_LEN)).map_err(|_| CryptoError::KeyDerivation)?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(key)
}

fn cipher_for(passphrase: &str, salt: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    let key = derive_key(passphrase, salt)?;
    Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::KeyDerivation)
}

/// Encrypt a record. Output layout: `salt || nonce || ciphertext`.
pub fn encrypt(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(passphrase, &salt)?;

    let mut payload = Zeroizing::new(Vec::with_capacity(MAGIC.len() + plaintext.len()));
    payload.extend_from_slice(MAGIC);
    payload.extend_from_slice(plaintext);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), payload.as_slice())
        .map_err(|_| CryptoError::Encryption)?;

    let mut record = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    record.extend_from_slice(&salt);
    record.extend_from_slice(&nonce_bytes);
    record.extend_from_slice(&ciphertext);
    Ok(record)
}

/// Reverse of [`encrypt`].
pub fn decrypt(passphrase: &str, record: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if record.len() < SALT_LEN + NONCE_LEN + MAGIC.len() {
        return Err(CryptoError::InvalidFormat);
    }
    let (salt, rest) = record.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = cipher_for(passphrase, salt)?;
    let mut decrypted = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    let plaintext = match decrypted.strip_prefix(MAGIC) {
        Some(body) => Ok(body.to_vec()),
        None => Err(CryptoError::Decryption),
    };
    decrypted.zeroize();
    plaintext
}

/// Store decorator that encrypts every record with a passphrase.
///
/// Keys stay in the clear; only values are encrypted. A wrong passphrase
/// surfaces as [`StorageError::Crypto`] on read.
pub struct EncryptedStore<S> {
    inner: S,
    passphrase: Zeroizing<String>,
}

impl<S: KeyValueStore> EncryptedStore<S> {
    pub fn new(inner: S, passphrase: impl Into<String>) -> Self {
        Self {
            inner,
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: KeyValueStore> KeyValueStore for EncryptedStore<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.inner.get(key)? {
            Some(encrypted) => Ok(Some(decrypt(&self.passphrase, &encrypted)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let encrypted = encrypt(&self.passphrase, value)?;
        self.inner.set(key, &encrypted)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}
