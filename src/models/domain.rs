//! Domain classification data.
//!
//! `DomainLabel` is what a curator or user can assign; `Classification` is what the classifier
//! answers, which additionally covers domains nobody labelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DomainLabel {
    LockedIn,
    Distracting,
}

impl DomainLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainLabel::LockedIn => "locked_in",
            DomainLabel::Distracting => "distracting",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "locked_in" => Some(DomainLabel::LockedIn),
            "distracting" => Some(DomainLabel::Distracting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    LockedIn,
    Distracting,
    Unknown,
}

impl Classification {
    pub fn is_locked_in(&self) -> bool {
        matches!(self, Classification::LockedIn)
    }
}

impl From<DomainLabel> for Classification {
    fn from(label: DomainLabel) -> Self {
        match label {
            DomainLabel::LockedIn => Classification::LockedIn,
            DomainLabel::Distracting => Classification::Distracting,
        }
    }
}

/// Globally curated entry; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MasterDomainEntry {
    pub domain: String,
    pub classification: DomainLabel,
}

/// Per-user reclassification; at most one per (user, domain).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainOverride {
    pub user_id: String,
    pub domain: String,
    pub classification: DomainLabel,
}
