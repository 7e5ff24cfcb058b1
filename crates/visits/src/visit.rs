use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainResult, Entity, LocationId, UserId, VisitId};

/// One service trip to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub location_id: LocationId,
    pub user_id: Option<UserId>,
    pub visit_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Visit {
    type Id = VisitId;

    fn id(&self) -> VisitId {
        self.id
    }
}

impl Visit {
    /// `"Visit to {location} on {YYYY-MM-DD HH:MM}"`.
    pub fn describe(&self, location_name: &str) -> String {
        format!(
            "Visit to {} on {}",
            location_name,
            self.visit_date.format("%Y-%m-%d %H:%M")
        )
    }

    pub fn apply(&mut self, patch: VisitPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(location) = patch.location {
            self.location_id = location;
        }
        if let Some(user) = patch.user {
            self.user_id = Some(user);
        }
        if let Some(date) = patch.visit_date {
            self.visit_date = date;
        }
        if let Some(notes) = patch.notes {
            self.notes = normalize_notes(Some(notes));
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitDraft {
    pub location: LocationId,
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
}

impl VisitDraft {
    pub fn new(location: LocationId, visit_date: DateTime<Utc>) -> Self {
        Self {
            location,
            visit_date: Some(visit_date),
            notes: None,
            user: None,
        }
    }

    pub fn into_visit(self, id: VisitId, now: DateTime<Utc>) -> DomainResult<Visit> {
        Ok(Visit {
            id,
            location_id: self.location,
            user_id: self.user,
            visit_date: self.visit_date.unwrap_or(now),
            notes: normalize_notes(self.notes),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitPatch {
    pub location: Option<LocationId>,
    pub visit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user: Option<UserId>,
}

impl From<VisitDraft> for VisitPatch {
    fn from(d: VisitDraft) -> Self {
        Self {
            location: Some(d.location),
            visit_date: d.visit_date,
            notes: Some(d.notes.unwrap_or_default()),
            user: d.user,
        }
    }
}

pub(crate) fn normalize_notes(raw: Option<String>) -> Option<String> {
    raw.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn describe_formats_date_and_time() {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        let visit = VisitDraft::new(LocationId::new(), at)
            .into_visit(VisitId::new(), at)
            .unwrap();
        assert_eq!(visit.describe("HQ"), "Visit to HQ on 2025-01-15 10:30");
    }

    #[test]
    fn blank_notes_are_dropped() {
        let mut draft = VisitDraft::new(LocationId::new(), Utc::now());
        draft.notes = Some("   ".into());
        let visit = draft.into_visit(VisitId::new(), Utc::now()).unwrap();
        assert_eq!(visit.notes, None);
    }
}
