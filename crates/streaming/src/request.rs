use std::fmt;

/// Identifies one issued backend request.
///
/// Tokens are handed out by a [`crate::LoadSequencer`] and compared on
/// completion to decide whether the response is still wanted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
