//! Canonical domain types for product identity resolution.
//!
//! All models validate their invariants at construction time: a
//! [`CanonicalProduct`] cannot exist with an empty name, a [`Barcode`] is
//! always 8–14 digits, and a [`Grade`] is always exactly one character (or
//! the `?` unknown marker). Everything serializes with serde.

mod barcode;
mod grade;
mod product;
mod timestamp;

pub use barcode::Barcode;
pub use grade::Grade;
pub use product::{
    CanonicalProduct, Ingredient, ProductGrades, ProductIdentity, ProductMedia, SensoryProfile,
};
pub use timestamp::UtcDateTime;
