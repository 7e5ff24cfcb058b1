use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainResult, Entity, LocationId, MachineId, optional_text, require_text};

const NAME_MAX: usize = 100;
const MODEL_MAX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MachineType {
    Snack,
    Soda,
    Combo,
}

impl MachineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Snack => "Snack",
            MachineType::Soda => "Soda",
            MachineType::Combo => "Combo",
        }
    }
}

/// A vending machine installed at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub location_id: LocationId,
    pub machine_type: MachineType,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Machine {
    type Id = MachineId;

    fn id(&self) -> MachineId {
        self.id
    }
}

impl Machine {
    /// `"{name} - {type} at {location}"`.
    pub fn label(&self, location_name: &str) -> String {
        format!("{} - {} at {}", self.name, self.machine_type.as_str(), location_name)
    }

    /// Short description used by reports: `"{type} {model}"`.
    pub fn short_label(&self) -> String {
        match self.model.as_deref() {
            Some(model) if !model.is_empty() => format!("{} {}", self.machine_type.as_str(), model),
            _ => self.machine_type.as_str().to_string(),
        }
    }

    /// Case-insensitive match over type, model and the location's name.
    pub fn matches_search(&self, term: &str, location_name: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.machine_type.as_str().to_lowercase().contains(&term)
            || self
                .model
                .as_deref()
                .is_some_and(|m| m.to_lowercase().contains(&term))
            || location_name.to_lowercase().contains(&term)
    }

    pub fn apply(&mut self, patch: MachinePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = require_text("name", &name, NAME_MAX)?;
        }
        if let Some(location) = patch.location {
            next.location_id = location;
        }
        if let Some(machine_type) = patch.machine_type {
            next.machine_type = machine_type;
        }
        if let Some(model) = patch.model {
            next.model = normalize_model(Some(model))?;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDraft {
    pub name: String,
    pub location: LocationId,
    pub machine_type: MachineType,
    #[serde(default)]
    pub model: Option<String>,
}

impl MachineDraft {
    pub fn into_machine(self, id: MachineId, now: DateTime<Utc>) -> DomainResult<Machine> {
        Ok(Machine {
            id,
            name: require_text("name", &self.name, NAME_MAX)?,
            location_id: self.location,
            machine_type: self.machine_type,
            model: normalize_model(self.model)?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<LocationId>,
    #[serde(default)]
    pub machine_type: Option<MachineType>,
    #[serde(default)]
    pub model: Option<String>,
}

impl From<MachineDraft> for MachinePatch {
    fn from(d: MachineDraft) -> Self {
        Self {
            name: Some(d.name),
            location: Some(d.location),
            machine_type: Some(d.machine_type),
            model: Some(d.model.unwrap_or_default()),
        }
    }
}

fn normalize_model(raw: Option<String>) -> DomainResult<Option<String>> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let model = optional_text("model", &raw, MODEL_MAX)?;
            Ok((!model.is_empty()).then_some(model))
        }
    }
}
