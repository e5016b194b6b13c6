use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::Sha1;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;

/// Verifies fetched bytes against a subresource-integrity style assertion.
///
/// `expected` has the shape `<algorithm>-<base64Digest>`. An empty or absent
/// assertion means no check was intended and the bytes are trusted. A
/// mismatch is not fatal to a batch; callers drop only the offending item.
pub fn is_valid(bytes: &[u8], expected: Option<&str>) -> bool {
  let Some(expected) = expected.filter(|expected| !expected.is_empty()) else {
    return true;
  };

  let Some((algorithm, expected_digest)) = expected.split_once('-') else {
    tracing::warn!(%expected, "Malformed integrity assertion");
    return false;
  };

  let digest = match algorithm {
    "sha1" => STANDARD.encode(Sha1::digest(bytes)),
    "sha256" => STANDARD.encode(Sha256::digest(bytes)),
    "sha384" => STANDARD.encode(Sha384::digest(bytes)),
    "sha512" => STANDARD.encode(Sha512::digest(bytes)),
    _ => {
      tracing::warn!(%algorithm, "Unsupported integrity algorithm");
      return false;
    }
  };

  if digest != expected_digest {
    tracing::warn!(
      %algorithm,
      %expected_digest,
      actual_digest = %digest,
      "Integrity mismatch, dropping resource"
    );
    return false;
  }

  true
}
