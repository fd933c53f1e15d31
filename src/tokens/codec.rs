use base64ct::{Base64UrlUnpadded, Encoding};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Random bytes behind every issued token.
pub const TOKEN_BYTES: usize = 16;

/// Length of the transport form of a [`TOKEN_BYTES`] secret.
pub const PLAINTEXT_LEN: usize = 22;

/// Freshly generated secret and the hash under which it is stored.
#[derive(Debug, Clone)]
pub struct Minted {
    pub plaintext: String,
    pub hash: Vec<u8>,
}

/// Generates `byte_len` random bytes and encodes them URL-safe.
///
/// Panics if the OS random source fails.
pub fn mint(byte_len: usize) -> Minted {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = Base64UrlUnpadded::encode_string(&bytes);
    let hash = hash_of(&plaintext);
    Minted { plaintext, hash }
}

/// SHA-256 of the plaintext; the only form a token is stored in.
pub fn hash_of(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

pub fn is_well_formed(plaintext: &str) -> bool {
    lazy_static! {
        static ref TOKEN_RE: Regex =
            Regex::new(&format!(r"^[A-Za-z0-9_-]{{{PLAINTEXT_LEN}}}$")).unwrap();
    }
    TOKEN_RE.is_match(plaintext)
}
