//! Object-Store Client (L2): content-addressed key layout, CDN Type-A
//! signed URLs, and multipart upload for large audio files (spec.md §4.1,
//! §4.4, §6).
//!
//! Key layout is grounded on `original_source/local/cos_service.py`'s
//! `upload_segments_json` (`segments/{channel}/{date}/{id}.json`), widened
//! to also cover the audio key. CDN signing follows spec.md §4.4's Type-A
//! formula bit-for-bit.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use rand::Rng;

/// Characters CDN-signed `rand` tokens are drawn from.
const RAND_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RAND_MIN_LEN: usize = 10;
const RAND_MAX_LEN: usize = 20;

/// Audio larger than this uses multipart upload (spec.md §4.1).
pub const MULTIPART_THRESHOLD_BYTES: u64 = 20 * 1024 * 1024;
pub const MULTIPART_PART_BYTES: u64 = 10 * 1024 * 1024;
pub const MULTIPART_MAX_PARALLEL: usize = 5;

/// Replaces path-hostile characters in a channel name with `_`, matching
/// `cos_service.py`'s `safe_channel` substitution (extended to spaces per
/// spec.md §4.1).
#[must_use]
pub fn safe_channel(channel: &str) -> String {
    channel.replace(['/', '\\', ' '], "_")
}

/// `audio/{safeChannel}/{UTC YYYY-MM-DD}/{episodeID}.{ext}` (spec.md §4.1).
#[must_use]
pub fn audio_key(channel: &str, timestamp_sec: i64, episode_id: &str, extension: &str) -> String {
    format!(
        "audio/{}/{}/{episode_id}.{extension}",
        safe_channel(channel),
        utc_date(timestamp_sec),
    )
}

/// `segments/{safeChannel}/{UTC YYYY-MM-DD}/{episodeID}.json` (spec.md §4.1).
#[must_use]
pub fn segments_key(channel: &str, timestamp_sec: i64, episode_id: &str) -> String {
    format!(
        "segments/{}/{}/{episode_id}.json",
        safe_channel(channel),
        utc_date(timestamp_sec),
    )
}

fn utc_date(timestamp_sec: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp_sec, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is valid"))
        .format("%Y-%m-%d")
        .to_string()
}

/// Builds a CDN Type-A signed URL per spec.md §4.4's exact formula:
/// `uri = "/" + key`, `t = now + expiresSeconds`, `md5hash =
/// MD5_hex(uri + "-" + t + "-" + rand + "-" + uid + "-" + auth_key)`,
/// `url = base + uri + "?sign=" + t + "-" + rand + "-" + uid + "-" + md5hash`.
#[must_use]
pub fn sign_url(base: &str, key: &str, expires_seconds: u32, auth_key: &str, now_unix: i64) -> String {
    let rand_token = random_token();
    sign_url_with_rand(base, key, expires_seconds, auth_key, now_unix, &rand_token)
}

fn sign_url_with_rand(
    base: &str,
    key: &str,
    expires_seconds: u32,
    auth_key: &str,
    now_unix: i64,
    rand_token: &str,
) -> String {
    const UID: &str = "0";
    let uri = format!("/{}", key.trim_start_matches('/'));
    let expires_at = now_unix + i64::from(expires_seconds);
    let to_hash = format!("{uri}-{expires_at}-{rand_token}-{UID}-{auth_key}");
    let md5hash = hex::encode(Md5::digest(to_hash.as_bytes()));
    format!("{base}{uri}?sign={expires_at}-{rand_token}-{UID}-{md5hash}")
}

fn random_token() -> String {
    let len = rand::thread_rng().gen_range(RAND_MIN_LEN..=RAND_MAX_LEN);
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| RAND_ALPHABET[rng.gen_range(0..RAND_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_channel_replaces_path_hostile_characters() {
        assert_eq!(safe_channel("NPR/News Hour\\x"), "NPR_News_Hour_x");
    }

    #[test]
    fn audio_and_segment_keys_follow_layout() {
        let ts = 1_714_550_400; // 2024-05-01T12:00:00Z
        assert_eq!(audio_key("ch", ts, "abc", "mp3"), "audio/ch/2024-05-01/abc.mp3");
        assert_eq!(segments_key("ch", ts, "abc"), "segments/ch/2024-05-01/abc.json");
    }

    #[test]
    fn cdn_signing_matches_spec_vector() {
        let url = sign_url_with_rand(
            "https://cdn.example.com",
            "audio/ch/2024-05-01/abc.mp3",
            0,
            "k",
            1_714_550_400,
            "abc12",
        );
        let expected_hash = hex::encode(Md5::digest(b"/audio/ch/2024-05-01/abc.mp3-1714550400-abc12-0-k"));
        assert_eq!(
            url,
            format!("https://cdn.example.com/audio/ch/2024-05-01/abc.mp3?sign=1714550400-abc12-0-{expected_hash}")
        );
    }
}
