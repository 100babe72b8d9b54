//! Streaming encryption and decryption of document content.
//!
//! [`CryptoVault`] runs AES-256-CBC with PKCS#7 padding as a streaming
//! transform: memory use is bounded by the chunk size no matter how large
//! the document is. The key and IV always come from the caller.
//!
//! ## Formats
//!
//! - [`CipherSuite::Aes256Cbc`]: raw CBC ciphertext, nothing else. Corruption
//!   is only detected when it breaks the padding.
//! - [`CipherSuite::Aes256CbcBlake3`]: CBC ciphertext followed by a 32-byte
//!   keyed BLAKE3 tag over `iv || ciphertext` (encrypt-then-MAC). The tag is
//!   verified in a first pass before any plaintext is produced.

use std::io::{self, Read, Seek, SeekFrom, Write};

use aes::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut,
    KeyIvInit,
};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::keys::KeyMaterial;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Length of the BLAKE3 authentication tag.
pub const TAG_LEN: usize = 32;

/// Default streaming chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const MAC_CONTEXT: &str = "paper-vault v1 aes-256-cbc blake3 mac";

/// Which cipher construction the vault uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherSuite {
    /// AES-256-CBC, PKCS#7 padding, no integrity protection.
    #[default]
    Aes256Cbc,
    /// AES-256-CBC with an appended keyed BLAKE3 tag.
    Aes256CbcBlake3,
}

impl CipherSuite {
    /// Bytes appended after the ciphertext.
    pub const fn trailer_len(&self) -> usize {
        match self {
            CipherSuite::Aes256Cbc => 0,
            CipherSuite::Aes256CbcBlake3 => TAG_LEN,
        }
    }
}

/// Streaming encryptor/decryptor configured with an explicit cipher suite.
#[derive(Debug, Clone)]
pub struct CryptoVault {
    suite: CipherSuite,
    chunk_size: usize,
}

impl CryptoVault {
    pub fn new(suite: CipherSuite) -> Self {
        Self {
            suite,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size. Rounded down to a whole number of blocks,
    /// never below one block.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = (chunk_size / BLOCK_LEN).max(1) * BLOCK_LEN;
        self
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Encrypt everything readable from `src` into `dst`.
    ///
    /// Returns the number of bytes written to `dst`.
    pub fn encrypt<R: Read, W: Write>(
        &self,
        mut src: R,
        mut dst: W,
        keys: &KeyMaterial,
    ) -> Result<u64, CryptoError> {
        let mut cipher = Aes256CbcEnc::new(
            GenericArray::from_slice(keys.key.as_bytes()),
            GenericArray::from_slice(keys.iv.as_bytes()),
        );
        let mut mac = self.mac_for(keys);
        let mut buf = vec![0u8; self.chunk_size + BLOCK_LEN];
        let mut written = 0u64;

        loop {
            let n = read_full(&mut src, &mut buf[..self.chunk_size])?;
            if n < self.chunk_size {
                // Final chunk: pad (a full padding block when n is aligned).
                let out = cipher
                    .encrypt_padded_mut::<Pkcs7>(&mut buf, n)
                    .map_err(|_| CryptoError::Corrupt("padding buffer too small".into()))?;
                emit(&mut dst, &mut mac, out)?;
                written += out.len() as u64;
                break;
            }
            for block in buf[..n].chunks_exact_mut(BLOCK_LEN) {
                cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            emit(&mut dst, &mut mac, &buf[..n])?;
            written += n as u64;
        }

        if let Some(mac) = mac {
            dst.write_all(mac.finalize().as_bytes())?;
            written += TAG_LEN as u64;
        }
        dst.flush()?;
        Ok(written)
    }

    /// Decrypt everything readable from `src` into `dst`.
    ///
    /// For the authenticated suite the whole input is verified before the
    /// first plaintext byte reaches `dst`. Returns the plaintext length.
    pub fn decrypt<R: Read + Seek, W: Write>(
        &self,
        mut src: R,
        mut dst: W,
        keys: &KeyMaterial,
    ) -> Result<u64, CryptoError> {
        let start = src.stream_position()?;
        let total = src.seek(SeekFrom::End(0))? - start;
        src.seek(SeekFrom::Start(start))?;

        let trailer = self.suite.trailer_len() as u64;
        if total < trailer + BLOCK_LEN as u64 {
            return Err(CryptoError::Corrupt(format!(
                "ciphertext too short: {} bytes",
                total
            )));
        }
        let body_len = total - trailer;
        if body_len % BLOCK_LEN as u64 != 0 {
            return Err(CryptoError::Corrupt(format!(
                "ciphertext length {} is not a multiple of the block size",
                body_len
            )));
        }

        if let Some(mut mac) = self.mac_for(keys) {
            self.verify_tag(&mut src, &mut mac, body_len)?;
            src.seek(SeekFrom::Start(start))?;
        }

        self.decrypt_body(src.take(body_len), &mut dst, keys)
    }

    fn decrypt_body<R: Read, W: Write>(
        &self,
        mut src: R,
        dst: &mut W,
        keys: &KeyMaterial,
    ) -> Result<u64, CryptoError> {
        let mut cipher = Aes256CbcDec::new(
            GenericArray::from_slice(keys.key.as_bytes()),
            GenericArray::from_slice(keys.iv.as_bytes()),
        );

        // One chunk is always held back so the last block can be unpadded.
        let mut current = vec![0u8; self.chunk_size];
        let mut next = vec![0u8; self.chunk_size];
        let mut current_len = read_full(&mut src, &mut current)?;
        let mut written = 0u64;

        loop {
            let next_len = read_full(&mut src, &mut next)?;
            if next_len == 0 {
                let plain = cipher
                    .decrypt_padded_mut::<Pkcs7>(&mut current[..current_len])
                    .map_err(|_| CryptoError::Corrupt("invalid padding".into()))?;
                dst.write_all(plain)?;
                written += plain.len() as u64;
                break;
            }
            for block in current[..current_len].chunks_exact_mut(BLOCK_LEN) {
                cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            dst.write_all(&current[..current_len])?;
            written += current_len as u64;

            std::mem::swap(&mut current, &mut next);
            current_len = next_len;
        }

        dst.flush()?;
        Ok(written)
    }

    fn verify_tag<R: Read>(
        &self,
        src: &mut R,
        mac: &mut blake3::Hasher,
        body_len: u64,
    ) -> Result<(), CryptoError> {
        let mut body = src.by_ref().take(body_len);
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = body.read(&mut buf)?;
            if n == 0 {
                break;
            }
            mac.update(&buf[..n]);
        }

        let mut tag = [0u8; TAG_LEN];
        src.read_exact(&mut tag)?;
        // blake3::Hash equality is constant time.
        if mac.finalize() != blake3::Hash::from(tag) {
            return Err(CryptoError::IntegrityCheckFailed);
        }
        Ok(())
    }

    fn mac_for(&self, keys: &KeyMaterial) -> Option<blake3::Hasher> {
        match self.suite {
            CipherSuite::Aes256Cbc => None,
            CipherSuite::Aes256CbcBlake3 => {
                let mac_key = blake3::derive_key(MAC_CONTEXT, keys.key.as_bytes());
                let mut hasher = blake3::Hasher::new_keyed(&mac_key);
                hasher.update(keys.iv.as_bytes());
                Some(hasher)
            }
        }
    }
}

impl Default for CryptoVault {
    fn default() -> Self {
        Self::new(CipherSuite::default())
    }
}

fn emit<W: Write>(dst: &mut W, mac: &mut Option<blake3::Hasher>, bytes: &[u8]) -> io::Result<()> {
    if let Some(mac) = mac.as_mut() {
        mac.update(bytes);
    }
    dst.write_all(bytes)
}

/// Read until `buf` is full or the source is exhausted.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
