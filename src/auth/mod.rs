use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::AdminId;

/// Boolean capabilities an administrator account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ChangeServerSettings,
    EditPhpSettings,
    CustomersSeeAll,
    DomainsSeeAll,
    TicketsSeeAll,
}

/// Identity of the caller, already authenticated by the transport layer.
/// The lifecycle evaluates this once per operation; no identity details
/// leak further down.
pub trait AuthContext: Send + Sync {
    fn is_administrator(&self) -> bool;
    fn current_admin_id(&self) -> AdminId;
    fn has_capability(&self, capability: Capability) -> bool;
}

/// Plain-data caller identity, the shape a session token resolves into.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin_id: AdminId,
    pub is_administrator: bool,
    pub capabilities: HashSet<Capability>,
}

impl AdminSession {
    pub fn new(admin_id: AdminId) -> Self {
        Self {
            admin_id,
            is_administrator: true,
            capabilities: HashSet::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }
}

impl AuthContext for AdminSession {
    fn is_administrator(&self) -> bool {
        self.is_administrator
    }

    fn current_admin_id(&self) -> AdminId {
        self.admin_id
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn session_grants_only_listed_capabilities() {
        let session =
            AdminSession::new(Uuid::new_v4()).with_capability(Capability::ChangeServerSettings);
        assert!(session.is_administrator());
        assert!(session.has_capability(Capability::ChangeServerSettings));
        assert!(!session.has_capability(Capability::CustomersSeeAll));
    }
}
