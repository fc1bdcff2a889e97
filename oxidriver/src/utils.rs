use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use semver::Version;

use crate::error::{Result, WebDriverError};

/// Parses a browser version string tolerantly, the way drivers actually
/// report them: `"101.10.55"`, `"99.0"`, and `"115.0.5790.170"` all parse,
/// trailing segments beyond the patch level are ignored, and missing
/// segments default to zero.
pub fn parse_version(v: &str) -> Result<Version> {
    let parts: Vec<&str> = v.split('.').collect();
    for end in (1..=parts.len()).rev() {
        if let Some(version) = parse_parts(&parts[..end]) {
            return Ok(version);
        }
    }
    Err(WebDriverError::invalid_argument(format!(
        "cannot parse browser version {v:?}"
    )))
}

fn parse_parts(parts: &[&str]) -> Option<Version> {
    let mut nums = [0u64; 3];
    for (i, part) in parts.iter().take(3).enumerate() {
        nums[i] = part.trim().parse().ok()?;
    }
    Some(Version::new(nums[0], nums[1], nums[2]))
}

/// Rounds half away from zero, matching how element rect coordinates are
/// reduced to whole pixels: 0.5 -> 1, -0.6 -> -1, -0.4 -> 0.
pub fn round(f: f64) -> i64 {
    if f < 0.0 {
        (f - 0.5).trunc() as i64
    } else {
        (f + 0.5).trunc() as i64
    }
}

/// Decodes a base64 screenshot payload into raw image bytes.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(data.trim())?)
}

/// Encodes raw bytes for payloads the protocol carries as base64 strings,
/// such as uploaded file archives.
pub fn encode_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// The User-Agent this client identifies itself with, e.g.
/// `oxidriver/0.4.2 (linux)`. Apple platforms are reported as `mac`.
pub fn user_agent() -> String {
    let os = match std::env::consts::OS {
        "macos" | "darwin" => "mac",
        other => other,
    };
    format!("oxidriver/{} ({os})", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsing_is_tolerant() {
        assert_eq!(parse_version("101.10.55").unwrap().major, 101);
        assert_eq!(parse_version("99.0").unwrap().major, 99);
        assert_eq!(parse_version("99.0").unwrap(), Version::new(99, 0, 0));
        assert_eq!(
            parse_version("115.0.5790.170").unwrap(),
            Version::new(115, 0, 5790)
        );
        assert!(parse_version("broken").is_err());
        assert!(parse_version("").is_err());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round(0.4), 0);
        assert_eq!(round(0.5), 1);
        assert_eq!(round(1.49), 1);
        assert_eq!(round(-0.4), 0);
        assert_eq!(round(-0.6), -1);
    }

    #[test]
    fn base64_decoding() {
        assert_eq!(decode_base64("aGVsbG8gd29ybGQ=").unwrap(), b"hello world");
        assert!(decode_base64("!!!").is_err());
    }

    #[test]
    fn base64_round_trip() {
        assert_eq!(encode_base64(b"hello world"), "aGVsbG8gd29ybGQ=");
        assert_eq!(
            decode_base64(&encode_base64(b"\x00\x01\x02")).unwrap(),
            b"\x00\x01\x02"
        );
    }

    #[test]
    fn user_agent_names_library_and_os() {
        let ua = user_agent();
        assert!(ua.starts_with("oxidriver/"));
        assert!(ua.ends_with(')'));
        assert!(!ua.contains("darwin"));
    }
}
