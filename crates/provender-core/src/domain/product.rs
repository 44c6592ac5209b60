use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Grade, ValidationError};

/// Naming and classification facts for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIdentity {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Product imagery; an empty string means no image is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMedia {
    #[serde(default)]
    pub front_image: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Published quality grades, each `?` when the source does not grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGrades {
    #[serde(default)]
    pub nutri_score: Grade,
    #[serde(default)]
    pub eco_score: Grade,
    #[serde(default)]
    pub processing_score: Grade,
}

/// Taste descriptors, where a source publishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensoryProfile {
    #[serde(default)]
    pub flavors: Vec<String>,
}

/// One entry of a product's ordered ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl Ingredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            percent: None,
        }
    }
}

/// The canonical product record exchanged between every pipeline component.
///
/// Records are immutable once produced by a normalizer; enrichment passes
/// return an updated copy via [`CanonicalProduct::with_media`] instead of
/// mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: String,
    pub identity: ProductIdentity,
    #[serde(default)]
    pub media: ProductMedia,
    #[serde(default)]
    pub grades: ProductGrades,
    #[serde(default)]
    pub nutrition: BTreeMap<String, f64>,
    #[serde(default)]
    pub sensory_profile: SensoryProfile,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl CanonicalProduct {
    /// Construct a record, rejecting empty ids and empty names.
    pub fn new(id: impl Into<String>, identity: ProductIdentity) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyProductId);
        }
        if identity.name.trim().is_empty() {
            return Err(ValidationError::EmptyProductName);
        }

        Ok(Self {
            id,
            identity,
            media: ProductMedia::default(),
            grades: ProductGrades::default(),
            nutrition: BTreeMap::new(),
            sensory_profile: SensoryProfile::default(),
            ingredients: Vec::new(),
        })
    }

    pub fn with_media(mut self, media: ProductMedia) -> Self {
        self.media = media;
        self
    }

    pub fn with_grades(mut self, grades: ProductGrades) -> Self {
        self.grades = grades;
        self
    }

    pub fn with_nutrition(mut self, nutrition: BTreeMap<String, f64>) -> Self {
        self.nutrition = nutrition;
        self
    }

    pub fn with_flavors(mut self, flavors: Vec<String>) -> Self {
        self.sensory_profile = SensoryProfile { flavors };
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    /// Content key for deduplication: lowercased trimmed name joined with
    /// the first comma-segment of the lowercased brand. An empty brand still
    /// contributes its (empty) segment, so unbranded records collide only
    /// with other unbranded records of the same name.
    pub fn fingerprint(&self) -> String {
        let name = self.identity.name.trim().to_lowercase();
        let brand = self.identity.brand.to_lowercase();
        let brand_head = brand.split(',').next().unwrap_or("").trim().to_owned();
        format!("{name}::{brand_head}")
    }
}
