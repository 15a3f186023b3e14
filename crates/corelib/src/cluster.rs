//! Cluster identity.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name of a logical group of instances sharing one load-balancing policy.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClusterId(Arc<str>);

impl ClusterId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets `DashMap<ClusterId, _>` be queried with a plain `&str`.
impl Borrow<str> for ClusterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClusterId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&ClusterId> for ClusterId {
    fn from(id: &ClusterId) -> Self {
        id.clone()
    }
}
