use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainResult, Entity, LocationId, require_text};

const NAME_MAX: usize = 100;

/// A site hosting one or more machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> LocationId {
        self.id
    }
}

impl Location {
    pub fn apply(&mut self, patch: LocationPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(name) => require_text("name", &name, NAME_MAX)?,
            None => self.name.clone(),
        };
        self.name = name;
        if let Some(address) = patch.address {
            self.address = address.trim().to_string();
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDraft {
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl LocationDraft {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    pub fn into_location(self, id: LocationId, now: DateTime<Utc>) -> DomainResult<Location> {
        Ok(Location {
            id,
            name: require_text("name", &self.name, NAME_MAX)?,
            address: self.address.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl From<LocationDraft> for LocationPatch {
    fn from(d: LocationDraft) -> Self {
        Self {
            name: Some(d.name),
            address: Some(d.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_patch() {
        let mut loc = LocationDraft::new(" Office ", "1 Main St")
            .into_location(LocationId::new(), Utc::now())
            .unwrap();
        assert_eq!(loc.name, "Office");

        assert!(loc.apply(LocationPatch { name: Some(" ".into()), address: None }, Utc::now()).is_err());
        assert_eq!(loc.name, "Office");

        loc.apply(LocationPatch { name: None, address: Some("2 Side St".into()) }, Utc::now())
            .unwrap();
        assert_eq!(loc.address, "2 Side St");
    }
}
