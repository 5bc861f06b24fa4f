use std::collections::BTreeMap;

use crate::request::RequestToken;

/// Per-key request sequencing.
///
/// Every load issues a fresh token for its key; only the most recently issued
/// token for a key is current. Responses carrying any other token are stale and
/// must be dropped, so the last request issued wins regardless of completion
/// order.
#[derive(Debug, Clone)]
pub struct LoadSequencer<K: Ord + Copy> {
    next: u64,
    latest: BTreeMap<K, RequestToken>,
}

impl<K: Ord + Copy> Default for LoadSequencer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Copy> LoadSequencer<K> {
    pub fn new() -> Self {
        Self {
            next: 1,
            latest: BTreeMap::new(),
        }
    }

    /// Issues a new token for `key`, superseding any outstanding one.
    pub fn issue(&mut self, key: K) -> RequestToken {
        let token = RequestToken(self.next);
        self.next = self.next.wrapping_add(1);
        self.latest.insert(key, token);
        token
    }

    pub fn is_current(&self, key: K, token: RequestToken) -> bool {
        self.latest.get(&key) == Some(&token)
    }

    pub fn latest(&self, key: K) -> Option<RequestToken> {
        self.latest.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::LoadSequencer;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_issued_wins_regardless_of_completion_order() {
        let mut seq = LoadSequencer::new();
        let first = seq.issue("floodDamage");
        let second = seq.issue("floodDamage");

        assert!(seq.is_current("floodDamage", second));
        assert!(!seq.is_current("floodDamage", first));
        assert_eq!(seq.latest("floodDamage"), Some(second));
    }

    #[test]
    fn keys_are_sequenced_independently() {
        let mut seq = LoadSequencer::new();
        let a = seq.issue("simd");
        let b = seq.issue("postcode");

        assert_ne!(a, b);
        assert!(seq.is_current("simd", a));
        assert!(seq.is_current("postcode", b));
        assert!(!seq.is_current("simd", b));
        assert_eq!(seq.latest("greenspaces"), None);
    }
}
