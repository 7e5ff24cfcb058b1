use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainError, DomainResult, Entity, SupplierId, optional_text};

const NAME_MAX: usize = 100;
const CONTACT_MAX: usize = 100;
const PHONE_MAX: usize = 20;
const EMAIL_MAX: usize = 254;

/// A wholesale source of products (e.g. a cash-and-carry store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

impl Supplier {
    /// Case-insensitive match over name, contact person and email.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.contact_person.to_lowercase().contains(&term)
            || self.email.to_lowercase().contains(&term)
    }

    pub fn toggle_active(&mut self, now: DateTime<Utc>) {
        self.is_active = !self.is_active;
        self.updated_at = now;
    }

    pub fn apply(&mut self, patch: SupplierPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = validate_name(&name)?;
        }
        if let Some(v) = patch.contact_person {
            next.contact_person = optional_text("contact_person", &v, CONTACT_MAX)?;
        }
        if let Some(v) = patch.phone {
            next.phone = optional_text("phone", &v, PHONE_MAX)?;
        }
        if let Some(v) = patch.email {
            next.email = validate_email(&v)?;
        }
        if let Some(v) = patch.address {
            next.address = v.trim().to_string();
        }
        if let Some(v) = patch.notes {
            next.notes = v.trim().to_string();
        }
        if let Some(v) = patch.is_active {
            next.is_active = v;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierDraft {
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
    pub is_active: Option<bool>,
}

impl SupplierDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_supplier(self, id: SupplierId, now: DateTime<Utc>) -> DomainResult<Supplier> {
        Ok(Supplier {
            id,
            name: validate_name(&self.name)?,
            contact_person: optional_text("contact_person", &self.contact_person, CONTACT_MAX)?,
            phone: optional_text("phone", &self.phone, PHONE_MAX)?,
            email: validate_email(&self.email)?,
            address: self.address.trim().to_string(),
            notes: self.notes.trim().to_string(),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl From<SupplierDraft> for SupplierPatch {
    fn from(d: SupplierDraft) -> Self {
        Self {
            name: Some(d.name),
            contact_person: Some(d.contact_person),
            phone: Some(d.phone),
            email: Some(d.email),
            address: Some(d.address),
            notes: Some(d.notes),
            is_active: d.is_active,
        }
    }
}

fn validate_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::field("name", "Supplier name cannot be empty."));
    }
    if name.chars().count() > NAME_MAX {
        return Err(DomainError::field(
            "name",
            format!("Ensure this field has no more than {NAME_MAX} characters."),
        ));
    }
    Ok(name.to_string())
}

fn validate_email(raw: &str) -> DomainResult<String> {
    let email = optional_text("email", raw, EMAIL_MAX)?;
    if email.is_empty() {
        return Ok(email);
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::field("email", "Enter a valid email address."));
    }
    Ok(email)
}

/// Supplier names are unique ignoring case. `exclude` skips the supplier being updated.
pub fn ensure_supplier_name_unique<'a, I>(
    name: &str,
    exclude: Option<SupplierId>,
    existing: I,
) -> DomainResult<()>
where
    I: IntoIterator<Item = &'a Supplier>,
{
    let key = name.trim().to_lowercase();
    let taken = existing
        .into_iter()
        .filter(|s| Some(s.id) != exclude)
        .any(|s| s.name.to_lowercase() == key);
    if taken {
        return Err(DomainError::field("name", "A supplier with this name already exists."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(name: &str) -> Supplier {
        SupplierDraft::named(name)
            .into_supplier(SupplierId::new(), Utc::now())
            .unwrap()
    }

    #[test]
    fn defaults_active_and_trims() {
        let s = supplier("  Costco ");
        assert_eq!(s.name, "Costco");
        assert!(s.is_active);
    }

    #[test]
    fn rejects_empty_name() {
        let err = SupplierDraft::named("  ")
            .into_supplier(SupplierId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::field("name", "Supplier name cannot be empty."));
    }

    #[test]
    fn email_shape() {
        let mut d = SupplierDraft::named("Sams");
        d.email = "orders@sams.example".into();
        assert!(d.clone().into_supplier(SupplierId::new(), Utc::now()).is_ok());
        d.email = "not-an-email".into();
        assert!(d.into_supplier(SupplierId::new(), Utc::now()).is_err());
    }

    #[test]
    fn name_uniqueness_ignores_case_and_self() {
        let costco = supplier("Costco");
        let all = vec![costco.clone()];
        assert!(ensure_supplier_name_unique("COSTCO", None, &all).is_err());
        assert!(ensure_supplier_name_unique("costco", Some(costco.id), &all).is_ok());
        assert!(ensure_supplier_name_unique("Walmart", None, &all).is_ok());
    }

    #[test]
    fn toggle_flips() {
        let mut s = supplier("Costco");
        s.toggle_active(Utc::now());
        assert!(!s.is_active);
        s.toggle_active(Utc::now());
        assert!(s.is_active);
    }

    #[test]
    fn search() {
        let mut s = supplier("Costco");
        s.contact_person = "Jordan".into();
        assert!(s.matches_search("jor"));
        assert!(s.matches_search("cost"));
        assert!(!s.matches_search("walmart"));
    }
}
