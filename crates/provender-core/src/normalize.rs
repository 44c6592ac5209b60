//! Per-provider normalization into the canonical product record.
//!
//! One pure function per upstream schema, each returning
//! `Option<CanonicalProduct>`: `None` means the raw record was rejected
//! (empty or sentinel name, unusable payload) and must never reach the
//! deduplicator. Malformed sibling records in the same batch are unaffected;
//! adapters call these per item.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::data_source::{WebContext, WebHit};
use crate::enrich::is_suspicious_image_url;
use crate::{
    Barcode, CanonicalProduct, Grade, Ingredient, ProductGrades, ProductIdentity, ProductMedia,
};

/// Placeholder name some upstreams emit for records they could not identify.
pub const UNKNOWN_PRODUCT_SENTINEL: &str = "Unknown Product";

fn rejected_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN_PRODUCT_SENTINEL)
}

/// Lowercase hyphen-joined key derived from free text, used for generated
/// record ids.
pub fn slug(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut last_was_dash = true;

    for ch in input.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            output.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            output.push('-');
            last_was_dash = true;
        }
    }

    while output.ends_with('-') {
        output.pop();
    }
    output
}

// ---------------------------------------------------------------------------
// Structured catalog schema
// ---------------------------------------------------------------------------

/// Raw item as served by the structured product catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub generic_name: String,
    #[serde(default)]
    pub brands: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub image_front_url: String,
    #[serde(default)]
    pub image_front_small_url: String,
    #[serde(default)]
    pub nutriscore_grade: String,
    #[serde(default)]
    pub ecoscore_grade: String,
    #[serde(default)]
    pub nova_group: Option<u8>,
    #[serde(default)]
    pub nutriments: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ingredients: Vec<CatalogIngredient>,
    #[serde(default)]
    pub ingredients_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogIngredient {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub percent_estimate: Option<f64>,
}

/// Map a catalog item into the canonical record, or reject it.
pub fn normalize_catalog(item: &CatalogItem) -> Option<CanonicalProduct> {
    if rejected_name(&item.product_name) {
        return None;
    }

    let name = item.product_name.trim().to_owned();
    let id = if item.code.trim().is_empty() {
        slug(&name)
    } else {
        item.code.trim().to_owned()
    };

    let identity = ProductIdentity {
        name,
        brand: item.brands.trim().to_owned(),
        barcode: item.code.trim().to_owned(),
        category: first_segment(&item.categories),
        description: item.generic_name.trim().to_owned(),
    };

    let media = ProductMedia {
        front_image: item.image_front_url.clone(),
        thumbnail: if item.image_front_small_url.is_empty() {
            item.image_front_url.clone()
        } else {
            item.image_front_small_url.clone()
        },
    };

    let grades = ProductGrades {
        nutri_score: Grade::parse(&item.nutriscore_grade),
        eco_score: Grade::parse(&item.ecoscore_grade),
        processing_score: item
            .nova_group
            .map(|group| Grade::parse(&group.to_string()))
            .unwrap_or_default(),
    };

    let nutrition = item
        .nutriments
        .iter()
        .filter_map(|(key, value)| value.as_f64().map(|number| (key.clone(), number)))
        .collect();

    let ingredients = if item.ingredients.is_empty() {
        split_ingredient_text(&item.ingredients_text)
    } else {
        item.ingredients
            .iter()
            .filter(|entry| !entry.text.trim().is_empty())
            .map(|entry| Ingredient {
                name: entry.text.trim().to_owned(),
                percent: entry.percent_estimate,
            })
            .collect()
    };

    CanonicalProduct::new(id, identity)
        .ok()
        .map(|product| {
            product
                .with_media(media)
                .with_grades(grades)
                .with_nutrition(nutrition)
                .with_ingredients(ingredients)
        })
}

// ---------------------------------------------------------------------------
// Regulatory database schema
// ---------------------------------------------------------------------------

/// Raw item as served by the regulatory food database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegulatoryItem {
    pub fdc_id: Option<i64>,
    pub description: String,
    pub brand_owner: String,
    pub gtin_upc: String,
    pub food_category: String,
    pub ingredients: String,
    pub food_nutrients: Vec<RegulatoryNutrient>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegulatoryNutrient {
    pub nutrient_name: String,
    pub value: Option<f64>,
    pub unit_name: String,
}

/// Map a regulatory item into the canonical record, or reject it.
///
/// The regulatory source publishes no grading, so all grades stay unknown.
pub fn normalize_regulatory(item: &RegulatoryItem) -> Option<CanonicalProduct> {
    if rejected_name(&item.description) {
        return None;
    }

    let name = item.description.trim().to_owned();
    let id = if !item.gtin_upc.trim().is_empty() {
        item.gtin_upc.trim().to_owned()
    } else if let Some(fdc_id) = item.fdc_id {
        format!("fdc-{fdc_id}")
    } else {
        slug(&name)
    };

    let identity = ProductIdentity {
        name,
        brand: item.brand_owner.trim().to_owned(),
        barcode: item.gtin_upc.trim().to_owned(),
        category: item.food_category.trim().to_owned(),
        description: String::new(),
    };

    let nutrition = item
        .food_nutrients
        .iter()
        .filter_map(|nutrient| {
            let name = nutrient.nutrient_name.trim();
            match (name.is_empty(), nutrient.value) {
                (false, Some(value)) => Some((name.to_owned(), value)),
                _ => None,
            }
        })
        .collect();

    CanonicalProduct::new(id, identity)
        .ok()
        .map(|product| {
            product
                .with_nutrition(nutrition)
                .with_ingredients(split_ingredient_text(&item.ingredients))
        })
}

// ---------------------------------------------------------------------------
// Synthesis schema
// ---------------------------------------------------------------------------

/// Product-shaped JSON object produced by the generative source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynthesizedItem {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub image: String,
    pub flavors: Vec<String>,
    pub ingredients: Vec<String>,
    pub nutrition: BTreeMap<String, f64>,
    pub nutri_score: String,
    pub eco_score: String,
    pub processing_score: String,
}

/// Map a synthesized item into the canonical record, or reject it.
///
/// Generated records get a deterministic `synth:` id so regenerating the
/// same product yields a stable identifier. When the generator produced no
/// image, the vetted context image (if any) fills the media slots.
pub fn normalize_synthesized(
    item: &SynthesizedItem,
    context: Option<&WebContext>,
) -> Option<CanonicalProduct> {
    if rejected_name(&item.name) {
        return None;
    }

    let name = item.name.trim().to_owned();
    let id = format!("synth:{}", slug(&name));

    let identity = ProductIdentity {
        name,
        brand: item.brand.trim().to_owned(),
        barcode: String::new(),
        category: item.category.trim().to_owned(),
        description: item.description.trim().to_owned(),
    };

    let image = if !item.image.is_empty() {
        item.image.clone()
    } else {
        context.map(|ctx| ctx.image.clone()).unwrap_or_default()
    };
    let media = ProductMedia {
        front_image: image.clone(),
        thumbnail: image,
    };

    let grades = ProductGrades {
        nutri_score: Grade::parse(&item.nutri_score),
        eco_score: Grade::parse(&item.eco_score),
        processing_score: Grade::parse(&item.processing_score),
    };

    let ingredients = item
        .ingredients
        .iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| Ingredient::named(entry.trim()))
        .collect();

    CanonicalProduct::new(id, identity)
        .ok()
        .map(|product| {
            product
                .with_media(media)
                .with_grades(grades)
                .with_nutrition(item.nutrition.clone())
                .with_flavors(
                    item.flavors
                        .iter()
                        .filter(|flavor| !flavor.trim().is_empty())
                        .map(|flavor| flavor.trim().to_owned())
                        .collect(),
                )
                .with_ingredients(ingredients)
        })
}

// ---------------------------------------------------------------------------
// Web-hit fallback
// ---------------------------------------------------------------------------

/// Split a web-result title into `(brand, name)`.
///
/// When the title contains `" - "`, the segment before it is the brand and
/// the rest is the name. Otherwise, a title of two or more words keeps its
/// first word as the brand and the full title as the name. A single-word
/// title yields no brand. Coarse by design of the upstream data; no brand
/// list exists to validate against.
pub fn split_web_title(title: &str) -> (String, String) {
    let trimmed = title.trim();

    if let Some((brand, name)) = trimmed.split_once(" - ") {
        return (brand.trim().to_owned(), name.trim().to_owned());
    }

    let mut words = trimmed.split_whitespace();
    match (words.next(), words.next()) {
        (Some(first), Some(_)) => (first.to_owned(), trimmed.to_owned()),
        _ => (String::new(), trimmed.to_owned()),
    }
}

/// Build a canonical record from a web hit during barcode fallback.
///
/// Image selection is inline here: the hit's own imagery is used only when
/// it passes the suspicious-URL check.
pub fn product_from_web_hit(barcode: &Barcode, hit: &WebHit) -> Option<CanonicalProduct> {
    let (brand, name) = split_web_title(&hit.title);
    if rejected_name(&name) {
        return None;
    }

    let identity = ProductIdentity {
        name,
        brand,
        barcode: barcode.as_str().to_owned(),
        category: String::new(),
        description: hit.snippet.trim().to_owned(),
    };

    let front_image = accept_image(&hit.image);
    let thumbnail = match accept_image(&hit.thumbnail) {
        thumb if thumb.is_empty() => front_image.clone(),
        thumb => thumb,
    };

    CanonicalProduct::new(barcode.as_str(), identity)
        .ok()
        .map(|product| {
            product.with_media(ProductMedia {
                front_image,
                thumbnail,
            })
        })
}

fn accept_image(url: &str) -> String {
    if url.is_empty() || is_suspicious_image_url(url) {
        String::new()
    } else {
        url.to_owned()
    }
}

fn first_segment(list: &str) -> String {
    list.split(',')
        .next()
        .map(|segment| segment.trim().to_owned())
        .unwrap_or_default()
}

fn split_ingredient_text(text: &str) -> Vec<Ingredient> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Ingredient::named)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_sentinel_name_is_rejected() {
        let item = CatalogItem {
            product_name: String::from("Unknown Product"),
            code: String::from("123456789"),
            ..CatalogItem::default()
        };
        assert!(normalize_catalog(&item).is_none());

        let empty = CatalogItem::default();
        assert!(normalize_catalog(&empty).is_none());
    }

    #[test]
    fn catalog_item_maps_grades_and_numeric_nutriments() {
        let item = CatalogItem {
            code: String::from("3017620422003"),
            product_name: String::from("Hazelnut Spread"),
            brands: String::from("Nutella, Ferrero"),
            categories: String::from("Spreads, Sweet spreads"),
            nutriscore_grade: String::from("e"),
            nova_group: Some(4),
            nutriments: BTreeMap::from([
                (String::from("energy-kcal_100g"), serde_json::json!(539.0)),
                (String::from("sugars_unit"), serde_json::json!("g")),
            ]),
            ingredients_text: String::from("sugar, palm oil, hazelnuts"),
            ..CatalogItem::default()
        };

        let product = normalize_catalog(&item).expect("must normalize");
        assert_eq!(product.id, "3017620422003");
        assert_eq!(product.identity.category, "Spreads");
        assert_eq!(product.grades.nutri_score.as_char(), 'E');
        assert_eq!(product.grades.processing_score.as_char(), '4');
        assert_eq!(product.nutrition.get("energy-kcal_100g"), Some(&539.0));
        assert!(!product.nutrition.contains_key("sugars_unit"));
        assert_eq!(product.ingredients.len(), 3);
    }

    #[test]
    fn regulatory_item_keeps_grades_unknown() {
        let item = RegulatoryItem {
            fdc_id: Some(534358),
            description: String::from("GRANOLA BAR, PEANUT BUTTER"),
            brand_owner: String::from("Acme Snacks Inc."),
            gtin_upc: String::from("00012345678905"),
            food_nutrients: vec![
                RegulatoryNutrient {
                    nutrient_name: String::from("Protein"),
                    value: Some(9.4),
                    unit_name: String::from("G"),
                },
                RegulatoryNutrient {
                    nutrient_name: String::from("Sodium"),
                    value: None,
                    unit_name: String::from("MG"),
                },
            ],
            ..RegulatoryItem::default()
        };

        let product = normalize_regulatory(&item).expect("must normalize");
        assert_eq!(product.id, "00012345678905");
        assert!(!product.grades.nutri_score.is_known());
        assert_eq!(product.nutrition.get("Protein"), Some(&9.4));
        assert!(!product.nutrition.contains_key("Sodium"));
    }

    #[test]
    fn synthesized_item_gets_stable_generated_id() {
        let item = SynthesizedItem {
            name: String::from("Maple Oat Clusters"),
            ..SynthesizedItem::default()
        };

        let first = normalize_synthesized(&item, None).expect("must normalize");
        let second = normalize_synthesized(&item, None).expect("must normalize");
        assert_eq!(first.id, "synth:maple-oat-clusters");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn synthesized_item_falls_back_to_context_image() {
        let item = SynthesizedItem {
            name: String::from("Maple Oat Clusters"),
            ..SynthesizedItem::default()
        };
        let context = WebContext {
            title: String::from("Maple Oat Clusters"),
            image: String::from("https://images.example.com/clusters.jpg"),
            ..WebContext::default()
        };

        let product = normalize_synthesized(&item, Some(&context)).expect("must normalize");
        assert_eq!(
            product.media.front_image,
            "https://images.example.com/clusters.jpg"
        );
    }

    #[test]
    fn web_title_splits_on_dash_separator() {
        let (brand, name) = split_web_title("Acme - Widget Deluxe");
        assert_eq!(brand, "Acme");
        assert_eq!(name, "Widget Deluxe");
    }

    #[test]
    fn web_title_without_separator_uses_first_word_as_brand() {
        let (brand, name) = split_web_title("Alpine Spring Water 500ml");
        assert_eq!(brand, "Alpine");
        assert_eq!(name, "Alpine Spring Water 500ml");
    }

    #[test]
    fn single_word_web_title_has_no_brand() {
        let (brand, name) = split_web_title("Granola");
        assert_eq!(brand, "");
        assert_eq!(name, "Granola");
    }

    #[test]
    fn web_hit_product_rejects_suspicious_imagery() {
        let barcode = Barcode::parse("0000000000000").expect("valid barcode");
        let hit = WebHit {
            title: String::from("Acme - Widget Deluxe"),
            snippet: String::from("A deluxe widget."),
            image: String::from("https://cdn.example.com/brand-logo.png"),
            thumbnail: String::from("https://cdn.example.com/assets/thumb.png"),
            ..WebHit::default()
        };

        let product = product_from_web_hit(&barcode, &hit).expect("must build");
        assert_eq!(product.identity.brand, "Acme");
        assert_eq!(product.identity.name, "Widget Deluxe");
        assert!(product.media.front_image.is_empty());
        assert!(product.media.thumbnail.is_empty());
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("Maple  Oat -- Clusters!"), "maple-oat-clusters");
    }
}
