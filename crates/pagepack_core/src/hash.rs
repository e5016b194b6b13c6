use xxhash_rust::xxh3::xxh3_64;

// Identifier hashes don't need to be cryptographic, but they must be stable
// across runs, machines, platforms and versions, since they end up in bundle
// file names and persisted records.

pub fn hash_string(s: &str) -> String {
  hash_bytes(s.as_bytes())
}

pub fn hash_bytes(s: &[u8]) -> String {
  let res = xxh3_64(s);
  format!("{:016x}", res)
}

/// Deterministic fingerprint of a set of resource URIs.
///
/// The input order never matters: URIs are sorted and deduplicated before
/// hashing, so any permutation of the same set yields the same hash.
pub fn aggregated_hash<S: AsRef<str>>(uris: &[S]) -> String {
  let mut uris: Vec<&str> = uris.iter().map(|uri| uri.as_ref()).collect();
  uris.sort_unstable();
  uris.dedup();
  hash_string(&uris.join("\n"))
}

/// Stable identifier for one page, used to key `PageMapping` records.
pub fn page_hash(page_id: &str) -> String {
  hash_string(page_id)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn aggregated_hash_is_permutation_invariant() {
    assert_eq!(
      aggregated_hash(&["a.js", "b.js"]),
      aggregated_hash(&["b.js", "a.js"])
    );
  }

  #[test]
  fn aggregated_hash_deduplicates() {
    assert_eq!(
      aggregated_hash(&["a.js", "a.js", "b.js"]),
      aggregated_hash(&["b.js", "a.js"])
    );
  }

  #[test]
  fn aggregated_hash_distinguishes_sets() {
    assert_ne!(aggregated_hash(&["a.js"]), aggregated_hash(&["b.js"]));
  }

  #[test]
  fn hash_is_sixteen_hex_digits() {
    let hash = aggregated_hash(&["styles/main.css"]);
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
