//! Linking tags
//!
//! Implements key-image derivation for double-spend detection.
//!
//! ```text
//! J = x·Hp(x·G)
//! ```
//!
//! Once a linking tag appears in an input, the output it belongs to cannot be
//! spent again.

use std::fmt;

use serde::{Deserialize, Serialize};
use tenebra_primitives::{Point, Primitives, Scalar};

use crate::error::PrivacyError;

/// A linking tag (32 bytes) - unique per one-time secret key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkingTag(pub Point);

impl LinkingTag {
    /// Derive the tag of a one-time secret key
    pub fn generate(p: &dyn Primitives, one_time_secret: &Scalar) -> Result<Self, PrivacyError> {
        Ok(Self(p.linking_tag(one_time_secret)?))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Point(bytes))
    }

    pub fn as_point(&self) -> &Point {
        &self.0
    }
}

impl AsRef<[u8]> for LinkingTag {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for LinkingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkingTag({})", self)
    }
}

impl fmt::Display for LinkingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex()[..16])
    }
}
