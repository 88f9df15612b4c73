//! Stream positions and optimistic concurrency expectations.

use serde::{Deserialize, Serialize};

/// Position of an event inside one aggregate stream.
///
/// `Version::INITIAL` (0) means "no events yet". The first event of a stream
/// is always `Version(1)` and every following event is exactly one higher.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// True when no event has been recorded at this position yet.
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Optimistic concurrency expectation for an append.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking. Batch contiguity is still enforced by the log.
    Any,
    /// Require the stream to be empty.
    NoStream,
    /// Require the stream to be at an exact version.
    Exact(Version),
}

impl ExpectedVersion {
    /// Expectation matching a writer that last observed `version`.
    pub fn after(version: Version) -> Self {
        if version.is_initial() {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn matches(self, actual: Version) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual.is_initial(),
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_version_means_empty_stream() {
        assert!(Version::INITIAL.is_initial());
        assert_eq!(Version::INITIAL.next(), Version::new(1));
        assert!(!Version::new(1).is_initial());
    }

    #[test]
    fn after_initial_expects_no_stream() {
        assert_eq!(ExpectedVersion::after(Version::INITIAL), ExpectedVersion::NoStream);
        assert_eq!(
            ExpectedVersion::after(Version::new(3)),
            ExpectedVersion::Exact(Version::new(3))
        );
    }

    #[test]
    fn matches_follows_expectation() {
        assert!(ExpectedVersion::Any.matches(Version::new(7)));
        assert!(ExpectedVersion::NoStream.matches(Version::INITIAL));
        assert!(!ExpectedVersion::NoStream.matches(Version::new(1)));
        assert!(ExpectedVersion::Exact(Version::new(2)).matches(Version::new(2)));
        assert!(!ExpectedVersion::Exact(Version::new(2)).matches(Version::new(3)));
    }

    #[test]
    fn version_serializes_as_plain_number() {
        let json = serde_json::to_string(&Version::new(4)).unwrap();
        assert_eq!(json, "4");
    }
}
