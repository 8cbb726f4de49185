//! Staff permission flags
//!
//! Stored as BIGINT per (organization, user) staff row.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// What a staff member may do inside one organization
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StaffPermissions: u64 {
        /// Enter redemption codes presented by consumers
        const VALIDATE_REDEMPTIONS = 1 << 0;
        /// Create, edit and archive coupons
        const MANAGE_COUPONS       = 1 << 1;
        /// Organization owner, passes every check
        const OWNER                = 1 << 2;

        const ALL = Self::VALIDATE_REDEMPTIONS.bits()
            | Self::MANAGE_COUPONS.bits()
            | Self::OWNER.bits();
    }
}

impl StaffPermissions {
    /// Owners pass every check
    #[inline]
    pub fn has(&self, permission: StaffPermissions) -> bool {
        self.contains(StaffPermissions::OWNER) || self.contains(permission)
    }

    #[inline]
    pub fn to_i64(self) -> i64 {
        self.bits() as i64
    }

    #[inline]
    pub fn from_i64(bits: i64) -> Self {
        StaffPermissions::from_bits_truncate(bits as u64)
    }

    /// Names of the set flags, used in error messages and logs
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl Default for StaffPermissions {
    fn default() -> Self {
        StaffPermissions::empty()
    }
}

impl fmt::Display for StaffPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("|"))
    }
}

impl Serialize for StaffPermissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

impl<'de> Deserialize<'de> for StaffPermissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = StaffPermissions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("permission bits as string or integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<StaffPermissions, E> {
                Ok(StaffPermissions::from_bits_truncate(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<StaffPermissions, E> {
                Ok(StaffPermissions::from_i64(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<StaffPermissions, E> {
                value
                    .parse::<u64>()
                    .map(StaffPermissions::from_bits_truncate)
                    .map_err(|_| de::Error::custom("invalid permission bits"))
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}
