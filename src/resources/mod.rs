// Resource kinds and the limit/usage vectors attached to every
// administrator account.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw column value standing for "no limit".
pub const UNLIMITED_RAW: i64 = -1;

/// KiB per user-facing MiB (disk space input unit).
pub const KIB_PER_MIB: i64 = 1024;

/// KiB per user-facing GiB (traffic input unit).
pub const KIB_PER_GIB: i64 = 1024 * 1024;

/// The fixed set of quota categories tracked per administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Customers,
    Domains,
    Subdomains,
    Mailboxes,
    MailAccounts,
    MailForwarders,
    MailQuota,
    FtpAccounts,
    Tickets,
    Databases,
    DiskSpace,
    Traffic,
}

pub const KIND_COUNT: usize = 12;

impl ResourceKind {
    pub const ALL: [ResourceKind; KIND_COUNT] = [
        ResourceKind::Customers,
        ResourceKind::Domains,
        ResourceKind::Subdomains,
        ResourceKind::Mailboxes,
        ResourceKind::MailAccounts,
        ResourceKind::MailForwarders,
        ResourceKind::MailQuota,
        ResourceKind::FtpAccounts,
        ResourceKind::Tickets,
        ResourceKind::Databases,
        ResourceKind::DiskSpace,
        ResourceKind::Traffic,
    ];

    /// Canonical name, also the limit column in the admins table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Customers => "customers",
            ResourceKind::Domains => "domains",
            ResourceKind::Subdomains => "subdomains",
            ResourceKind::Mailboxes => "mailboxes",
            ResourceKind::MailAccounts => "mail_accounts",
            ResourceKind::MailForwarders => "mail_forwarders",
            ResourceKind::MailQuota => "mail_quota",
            ResourceKind::FtpAccounts => "ftp_accounts",
            ResourceKind::Tickets => "tickets",
            ResourceKind::Databases => "databases",
            ResourceKind::DiskSpace => "disk_space",
            ResourceKind::Traffic => "traffic",
        }
    }

    /// Usage counter column in the admins table.
    pub fn used_column(&self) -> &'static str {
        match self {
            ResourceKind::Customers => "customers_used",
            ResourceKind::Domains => "domains_used",
            ResourceKind::Subdomains => "subdomains_used",
            ResourceKind::Mailboxes => "mailboxes_used",
            ResourceKind::MailAccounts => "mail_accounts_used",
            ResourceKind::MailForwarders => "mail_forwarders_used",
            ResourceKind::MailQuota => "mail_quota_used",
            ResourceKind::FtpAccounts => "ftp_accounts_used",
            ResourceKind::Tickets => "tickets_used",
            ResourceKind::Databases => "databases_used",
            ResourceKind::DiskSpace => "disk_space_used",
            ResourceKind::Traffic => "traffic_used",
        }
    }

    /// Human form for error and audit messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Customers => "customers",
            ResourceKind::Domains => "domains",
            ResourceKind::Subdomains => "subdomains",
            ResourceKind::Mailboxes => "mailboxes",
            ResourceKind::MailAccounts => "mail accounts",
            ResourceKind::MailForwarders => "mail forwarders",
            ResourceKind::MailQuota => "mail quota",
            ResourceKind::FtpAccounts => "ftp accounts",
            ResourceKind::Tickets => "tickets",
            ResourceKind::Databases => "databases",
            ResourceKind::DiskSpace => "disk space",
            ResourceKind::Traffic => "traffic",
        }
    }

    /// KiB stored per caller-facing unit. Callers hand disk space in MiB
    /// and traffic in GiB; everything else counts objects 1:1. Conversion
    /// happens at the lifecycle boundary, never inside the ledger.
    pub fn storage_scale(&self) -> i64 {
        match self {
            ResourceKind::DiskSpace => KIB_PER_MIB,
            ResourceKind::Traffic => KIB_PER_GIB,
            _ => 1,
        }
    }

    fn index(&self) -> usize {
        // discriminants follow declaration order, which ALL mirrors
        *self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocated ceiling for one resource kind. The raw column encoding keeps
/// the historical `-1` sentinel for "unlimited"; a sentinel never mixes
/// with literal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    Unlimited,
    Limited(i64),
}

impl ResourceLimit {
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            ResourceLimit::Unlimited
        } else {
            ResourceLimit::Limited(raw)
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            ResourceLimit::Unlimited => UNLIMITED_RAW,
            ResourceLimit::Limited(value) => value,
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, ResourceLimit::Unlimited)
    }

    /// Scale a finite limit by the kind's storage factor; unlimited stays
    /// the sentinel, it is never multiplied.
    pub fn scaled(self, factor: i64) -> Self {
        match self {
            ResourceLimit::Unlimited => ResourceLimit::Unlimited,
            ResourceLimit::Limited(value) => ResourceLimit::Limited(value * factor),
        }
    }
}

impl Default for ResourceLimit {
    fn default() -> Self {
        ResourceLimit::Limited(0)
    }
}

impl Serialize for ResourceLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_raw())
    }
}

impl<'de> Deserialize<'de> for ResourceLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(ResourceLimit::from_raw(raw))
    }
}

/// One allocated limit per resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLimits([ResourceLimit; KIND_COUNT]);

impl ResourceLimits {
    pub fn get(&self, kind: ResourceKind) -> ResourceLimit {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: ResourceKind, value: ResourceLimit) {
        self.0[kind.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, ResourceLimit)> + '_ {
        ResourceKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl Serialize for ResourceLimits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(KIND_COUNT))?;
        for (kind, limit) in self.iter() {
            map.serialize_entry(kind.as_str(), &limit.to_raw())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResourceLimits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LimitsVisitor;

        impl<'de> Visitor<'de> for LimitsVisitor {
            type Value = ResourceLimits;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of resource kind to raw limit")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut limits = ResourceLimits::default();
                while let Some((kind, raw)) = access.next_entry::<ResourceKind, i64>()? {
                    limits.set(kind, ResourceLimit::from_raw(raw));
                }
                Ok(limits)
            }
        }

        deserializer.deserialize_map(LimitsVisitor)
    }
}

/// Current consumption per resource kind, owned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUsage([i64; KIND_COUNT]);

impl ResourceUsage {
    pub fn get(&self, kind: ResourceKind) -> i64 {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: ResourceKind, value: i64) {
        self.0[kind.index()] = value;
    }

    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|v| *v == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, i64)> + '_ {
        ResourceKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl Serialize for ResourceUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(KIND_COUNT))?;
        for (kind, used) in self.iter() {
            map.serialize_entry(kind.used_column(), &used)?;
        }
        map.end()
    }
}

/// Caller-supplied limit changes, keyed by kind. Absent kinds keep their
/// stored value. Finite disk/traffic entries are still in user units until
/// [`ResourceLimitPatch::to_storage_units`] runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLimitPatch(pub BTreeMap<ResourceKind, ResourceLimit>);

impl ResourceLimitPatch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn with(mut self, kind: ResourceKind, limit: ResourceLimit) -> Self {
        self.0.insert(kind, limit);
        self
    }

    /// Convert finite disk/traffic entries from user units (MiB / GiB)
    /// into the stored KiB base unit.
    pub fn to_storage_units(&self) -> Self {
        let converted = self
            .0
            .iter()
            .map(|(kind, limit)| (*kind, limit.scaled(kind.storage_scale())))
            .collect();
        ResourceLimitPatch(converted)
    }

    pub fn apply(&self, base: &ResourceLimits) -> ResourceLimits {
        let mut merged = base.clone();
        for (kind, limit) in &self.0 {
            merged.set(*kind, *limit);
        }
        merged
    }
}
