//! Component identifiers.
//!
//! ULID を使うので、生成順にソートでき、プロセス内で調整なしに発行できる。

use std::fmt;

use ulid::Ulid;

/// Identity of a node in the component tree.
///
/// Issued once at construction and never reused, so it stays meaningful in
/// logs after the component itself is gone.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Ulid);

impl ComponentId {
    pub(crate) fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component-{}", self.0)
    }
}
