//! Path-set fingerprints for convergence tracking.

use std::fmt;

/// XXH3-128 digest of a canonical, newline-joined record list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContentHash(u128);

impl ContentHash {
    /// Hashes `records` in the order given; callers sort them first.
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = String::new();
        for record in records {
            buf.push_str(record.as_ref());
            buf.push('\n');
        }
        Self(xxhash_rust::xxh3::xxh3_128(buf.as_bytes()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0 >> 96)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_records_same_hash() {
        let a = ContentHash::from_records(["INPUT|mod:reg_a[2]|-0.050"]);
        let b = ContentHash::from_records(vec!["INPUT|mod:reg_a[2]|-0.050".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn record_order_and_boundaries_matter() {
        assert_ne!(
            ContentHash::from_records(["a", "b"]),
            ContentHash::from_records(["b", "a"])
        );
        assert_ne!(
            ContentHash::from_records(["ab", "c"]),
            ContentHash::from_records(["a", "bc"])
        );
    }

    #[test]
    fn display_is_a_short_prefix() {
        let s = ContentHash::from_records(["x"]).to_string();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
