use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainError, DomainResult, Entity, ProductId, optional_text, require_text};

const NAME_MAX: usize = 100;
const UNIT_TYPE_MAX: usize = 50;
const IMAGE_URL_MAX: usize = 255;
const DEFAULT_UNIT_TYPE: &str = "unit";

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ProductType {
    #[default]
    Soda,
    Snack,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Soda => "Soda",
            ProductType::Snack => "Snack",
        }
    }
}

/// A catalog product.
///
/// `inventory_quantity` is the warehouse stock (units not yet loaded into a
/// machine). It only moves through purchases and restock reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub product_type: ProductType,
    pub unit_type: String,
    pub image_url: Option<String>,
    pub inventory_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

impl Product {
    /// Case-insensitive match over name and unit type.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.unit_type.to_lowercase().contains(&term)
    }

    /// Apply a partial update. Either the whole patch applies or nothing does.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = require_text("name", &name, NAME_MAX)?;
        }
        if let Some(product_type) = patch.product_type {
            next.product_type = product_type;
        }
        if let Some(unit_type) = patch.unit_type {
            next.unit_type = normalize_unit_type(&unit_type)?;
        }
        if let Some(image_url) = patch.image_url {
            next.image_url = normalize_image_url(Some(image_url))?;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            name: name.into(),
            product_type,
            unit_type: None,
            image_url: None,
        }
    }

    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> DomainResult<Product> {
        Ok(Product {
            id,
            name: require_text("name", &self.name, NAME_MAX)?,
            product_type: self.product_type,
            unit_type: normalize_unit_type(self.unit_type.as_deref().unwrap_or_default())?,
            image_url: normalize_image_url(self.image_url)?,
            inventory_quantity: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial product update. Warehouse stock is deliberately not patchable.
///
/// An empty `image_url` clears the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<ProductDraft> for ProductPatch {
    fn from(d: ProductDraft) -> Self {
        Self {
            name: Some(d.name),
            product_type: Some(d.product_type),
            unit_type: Some(d.unit_type.unwrap_or_default()),
            image_url: Some(d.image_url.unwrap_or_default()),
        }
    }
}

fn normalize_unit_type(raw: &str) -> DomainResult<String> {
    let unit = optional_text("unit_type", raw, UNIT_TYPE_MAX)?;
    if unit.is_empty() {
        Ok(DEFAULT_UNIT_TYPE.to_string())
    } else {
        Ok(unit)
    }
}

fn normalize_image_url(raw: Option<String>) -> DomainResult<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let url = optional_text("image_url", &raw, IMAGE_URL_MAX)?;
    if url.is_empty() {
        return Ok(None);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(DomainError::field("image_url", "Enter a valid URL."));
    }
    Ok(Some(url))
}
