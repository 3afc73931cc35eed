//! Client transaction id synthesis.
//!
//! The web client attaches an `x-client-transaction-id` header to every
//! call. The value is a base64 blob that changes on every request. The
//! layout produced here is:
//!
//! ```text
//! [key][random x16][time LE x4][digest x16][3]
//! ```
//!
//! where `time` is seconds since the client epoch, `digest` is the leading
//! bytes of `SHA-256("{method}!{path}!{time}")` (random bytes for unbound
//! tags), and every byte after `key` is XOR-ed with `key`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use ring::digest::{SHA256, digest};

/// Offset subtracted from the Unix time, in seconds.
pub const TAG_EPOCH_OFFSET: i64 = 1_682_924_400;

const RANDOM_LEN: usize = 16;
const DIGEST_LEN: usize = 16;
const TRAILER: u8 = 3;

/// Decoded length of a tag.
pub const TAG_BYTES: usize = 1 + RANDOM_LEN + 4 + DIGEST_LEN + 1;

fn client_time(unix_secs: i64) -> u32 {
    u32::try_from((unix_secs - TAG_EPOCH_OFFSET).max(0)).unwrap_or(u32::MAX)
}

fn encode(key: u8, random: &[u8; RANDOM_LEN], time: u32, tail: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(TAG_BYTES);
    bytes.push(key);
    bytes.extend_from_slice(random);
    bytes.extend_from_slice(&time.to_le_bytes());
    bytes.extend_from_slice(&tail[..DIGEST_LEN]);
    bytes.push(TRAILER);

    for byte in bytes.iter_mut().skip(1) {
        *byte ^= key;
    }
    STANDARD_NO_PAD.encode(bytes)
}

/// Generates a tag that is not bound to a request.
pub fn generate_tag() -> String {
    let mut rng = rand::thread_rng();
    let mut random = [0u8; RANDOM_LEN];
    let mut tail = [0u8; DIGEST_LEN];
    rng.fill_bytes(&mut random);
    rng.fill_bytes(&mut tail);
    let mut key = [0u8; 1];
    rng.fill_bytes(&mut key);
    encode(key[0], &random, client_time(Utc::now().timestamp()), &tail)
}

/// Generates a tag bound to an HTTP method and URL path.
pub fn generate_tag_for(method: &str, path: &str) -> String {
    generate_tag_at(method, path, Utc::now().timestamp())
}

fn generate_tag_at(method: &str, path: &str, unix_secs: i64) -> String {
    let time = client_time(unix_secs);
    let input = format!("{}!{path}!{time}", method.to_ascii_uppercase());
    let hash = digest(&SHA256, input.as_bytes());

    let mut rng = rand::thread_rng();
    let mut random = [0u8; RANDOM_LEN];
    rng.fill_bytes(&mut random);
    let mut key = [0u8; 1];
    rng.fill_bytes(&mut key);
    encode(key[0], &random, time, hash.as_ref())
}
