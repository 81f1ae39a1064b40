//! Canonical recipe values produced by the payload parser
//!
//! These are plain immutable records. Storage identifiers and join rows are
//! the database layer's concern; nothing here carries a back-pointer.

use serde::{Deserialize, Serialize};

/// One rendition of an image at a specific width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub width: i64,
}

/// A normalized ingredient within one recipe
///
/// `name` is lowercased and unique within the recipe. `amount` is a
/// free-form quantity string; merged duplicates encode combined amounts
/// such as `"8ml + 15ml"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
    pub images: Vec<ImageRef>,
}

/// A single cooking instruction step
///
/// `order` is upstream's display sequence, preserved verbatim; it is not
/// guaranteed contiguous or zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionStep {
    pub order: i64,
    pub description: String,
    pub images: Vec<ImageRef>,
}

/// The canonical, storage-ready representation of one upstream recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub gousto_uid: String,
    pub images: Vec<ImageRef>,
    pub rating: Option<f64>,
    pub prep_time_minutes: Option<i64>,
    pub ingredients: Vec<Ingredient>,
    pub instruction_steps: Vec<InstructionStep>,
    /// Pantry staples the recipe assumes but does not ship
    pub basic_ingredients: Vec<String>,
}
