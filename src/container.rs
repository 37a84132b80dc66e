//! Container-level attributes: access policy, location and metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access policy recorded per container. It is a side attribute only and
/// never changes filesystem permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerAccess {
    Private,
    PublicRead,
}

impl Default for ContainerAccess {
    fn default() -> Self {
        ContainerAccess::Private
    }
}

impl ContainerAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAccess::Private => "private",
            ContainerAccess::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for ContainerAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(ContainerAccess::Private),
            "public-read" | "public_read" | "public" => Ok(ContainerAccess::PublicRead),
            _ => Err(format!("Unknown container access: {}", s)),
        }
    }
}

/// Geographic placement reported for containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub description: String,
}

/// Supplies the location reported for containers
pub trait LocationSupplier: Send + Sync {
    fn location(&self) -> Option<Location>;
}

/// A local filesystem has no regions, so containers report no location.
#[derive(Debug, Default, Clone)]
pub struct NoLocation;

impl LocationSupplier for NoLocation {
    fn location(&self) -> Option<Location> {
        None
    }
}

/// Reports the same location for every container
#[derive(Debug, Clone)]
pub struct FixedLocation(pub Location);

impl LocationSupplier for FixedLocation {
    fn location(&self) -> Option<Location> {
        Some(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerMetadata {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub access: ContainerAccess,
}
