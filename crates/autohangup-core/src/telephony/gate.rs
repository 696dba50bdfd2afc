use std::collections::HashSet;

use super::{Capability, PermissionGate};

/// Fixed set of granted capabilities, usually read from config.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionGate {
    granted: HashSet<Capability>,
}

impl StaticPermissionGate {
    pub fn new(granted: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    pub fn grant(&mut self, capability: Capability) {
        self.granted.insert(capability);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.granted.remove(&capability);
    }
}

impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn is_granted(&self, _capability: Capability) -> bool {
        true
    }
}
