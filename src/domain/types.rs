//! Shared domain enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six primary content kinds a subunit publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    News,
    Events,
    Documents,
    Videos,
    Images,
    Messages,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::News,
        ContentKind::Events,
        ContentKind::Documents,
        ContentKind::Videos,
        ContentKind::Images,
        ContentKind::Messages,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Events => "events",
            ContentKind::Documents => "documents",
            ContentKind::Videos => "videos",
            ContentKind::Images => "images",
            ContentKind::Messages => "messages",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ContentKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "news" => Ok(ContentKind::News),
            "events" => Ok(ContentKind::Events),
            "documents" => Ok(ContentKind::Documents),
            "videos" => Ok(ContentKind::Videos),
            "images" => Ok(ContentKind::Images),
            "messages" => Ok(ContentKind::Messages),
            _ => Err(()),
        }
    }
}

/// Auxiliary lookup collections shared by every subunit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Users,
    Groups,
    WorkLocations,
    Positions,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Users,
        ReferenceKind::Groups,
        ReferenceKind::WorkLocations,
        ReferenceKind::Positions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Users => "users",
            ReferenceKind::Groups => "groups",
            ReferenceKind::WorkLocations => "work-locations",
            ReferenceKind::Positions => "positions",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubunitKind {
    Sector,
    Subsector,
}
