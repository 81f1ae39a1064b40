//! Payload parser: raw upstream JSON to canonical recipe values
//!
//! A pure, stateless transform. The upstream API duplicates ingredients,
//! omits identifying fields on true duplicates, and encodes amounts inside
//! the display label, so most of this module is the normalization and
//! deduplication rules for ingredients. The duplicate handling is
//! deliberately strict: a combination the rules do not cover raises
//! `MalformedPayload` instead of guessing, because a silently merged or
//! dropped amount would corrupt recipe data invisibly.

use serde_json::Value;

use crate::gousto::error::GoustoError;
use crate::gousto::models::{ImageRef, Ingredient, InstructionStep, Recipe};

/// Substrings that mark an amount as unit-bearing
const UNIT_MARKERS: [&str; 4] = ["g", "ml", "tsp", "tbsp"];

/// Parse a raw recipe payload (the full API response, including the
/// `data.entry` envelope) into a canonical recipe
pub fn parse_recipe(payload: &Value) -> Result<Recipe, GoustoError> {
    let entry = payload
        .pointer("/data/entry")
        .ok_or_else(|| malformed("payload missing data.entry"))?;

    let title = require_str(entry, "title")?;
    let gousto_uid = require_str(entry, "gousto_uid")?;

    // Absent or null rating parses as None, never an error
    let rating = entry.pointer("/rating/average").and_then(Value::as_f64);

    // Prep time is the "for two people" figure specifically; other serving
    // sizes are ignored
    let prep_time_minutes = entry.pointer("/prep_times/for_2").and_then(Value::as_i64);

    let ingredients_data = entry
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("payload missing ingredients list"))?;
    let ingredients = parse_all_ingredients(ingredients_data)?;

    let steps_data = entry
        .get("cooking_instructions")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("payload missing cooking_instructions list"))?;
    let instruction_steps = parse_all_instruction_steps(steps_data)?;

    let basic_ingredients = entry
        .get("basics")
        .and_then(Value::as_array)
        .map(|basics| {
            basics
                .iter()
                .filter_map(|basic| basic.get("title").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(Recipe {
        title,
        gousto_uid,
        images: parse_images(entry),
        rating,
        prep_time_minutes,
        ingredients,
        instruction_steps,
        basic_ingredients,
    })
}

/// Parse and deduplicate the raw ingredient list
///
/// Entries are grouped by lowercased name; groups larger than one are
/// resolved by [`resolve_duplicates`]. Output order follows first
/// appearance in the payload, so parsing is deterministic.
fn parse_all_ingredients(entries: &[Value]) -> Result<Vec<Ingredient>, GoustoError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<Ingredient>> =
        std::collections::HashMap::new();

    for entry in entries {
        if let Some(ingredient) = parse_ingredient_entry(entry) {
            let group = groups.entry(ingredient.name.clone()).or_default();
            if group.is_empty() {
                order.push(ingredient.name.clone());
            }
            group.push(ingredient);
        }
    }

    order
        .into_iter()
        .map(|name| {
            let group = groups.remove(&name).unwrap_or_default();
            resolve_duplicates(&name, group)
        })
        .collect()
}

/// Parse one raw ingredient entry, or None if it should be ignored
///
/// Upstream omits `name`/`label` on true duplicates and ships
/// zero-quantity placeholder entries; both are skipped silently rather
/// than treated as errors.
fn parse_ingredient_entry(entry: &Value) -> Option<Ingredient> {
    let name = entry.get("name").and_then(Value::as_str)?.to_lowercase();
    let label = entry.get("label").and_then(Value::as_str)?;

    // The label is "name amount" in some order; removing the name leaves
    // the quantity string
    let mut amount = label.to_lowercase().replace(&name, "").trim().to_string();

    // Strip one layer of enclosing parentheses
    if amount.starts_with('(') && amount.ends_with(')') && amount.len() >= 2 {
        amount = amount[1..amount.len() - 1].trim().to_string();
    }

    // Empty amount means one implicit unit
    if amount.is_empty() {
        amount = "1".to_string();
    }

    // Zero-quantity placeholders are not real ingredients
    if amount == "0" || amount.ends_with("x0") {
        return None;
    }

    Some(Ingredient {
        name,
        amount,
        images: parse_images(entry),
    })
}

/// Collapse a group of same-named ingredient entries into one record
///
/// Priority order:
/// 1. all amounts identical: keep one
/// 2. exactly one unit-bearing and one bare-number amount: keep the unit
/// 3. no bare numbers, all unit-bearing: merge amounts with `" + "`
/// 4. anything else: `MalformedPayload` naming the conflict
fn resolve_duplicates(name: &str, mut group: Vec<Ingredient>) -> Result<Ingredient, GoustoError> {
    if group.is_empty() {
        return Err(malformed(format!("empty ingredient group for '{}'", name)));
    }
    if group.len() == 1 {
        return Ok(group.remove(0));
    }

    let amounts: Vec<String> = group.iter().map(|i| i.amount.clone()).collect();

    // Rule 1: textually identical amounts
    if amounts.iter().all(|a| *a == amounts[0]) {
        return Ok(group.remove(0));
    }

    let unit_count = amounts.iter().filter(|a| is_unit_bearing(a)).count();
    let bare_count = amounts.iter().filter(|a| is_bare_number(a)).count();

    // Rule 2: one real quantity plus one ambiguous bare number; the bare
    // number is discarded
    if unit_count == 1 && bare_count == 1 {
        let index = group
            .iter()
            .position(|i| is_unit_bearing(&i.amount))
            .unwrap_or(0);
        return Ok(group.remove(index));
    }

    // Rule 3: several concrete quantities; combine them
    if bare_count == 0 && unit_count == group.len() {
        let merged = amounts.join(" + ");
        let first = group.remove(0);
        return Ok(Ingredient {
            name: first.name,
            amount: merged,
            images: first.images,
        });
    }

    // Rule 4: an upstream shape these rules do not cover. Raise rather
    // than guess.
    Err(malformed(format!(
        "unresolvable duplicate ingredient '{}' with amounts {:?}",
        name, amounts
    )))
}

fn is_unit_bearing(amount: &str) -> bool {
    UNIT_MARKERS.iter().any(|unit| amount.contains(unit))
}

fn is_bare_number(amount: &str) -> bool {
    !amount.is_empty() && amount.chars().all(|c| c.is_ascii_digit())
}

/// Parse the raw instruction step list; no deduplication
fn parse_all_instruction_steps(entries: &[Value]) -> Result<Vec<InstructionStep>, GoustoError> {
    entries
        .iter()
        .map(|entry| {
            // Order is display sequence from upstream, preserved verbatim
            let order = entry
                .get("order")
                .and_then(Value::as_i64)
                .ok_or_else(|| malformed("instruction step missing order"))?;
            let description = entry
                .get("instruction")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("instruction step missing instruction text"))?
                .to_string();
            Ok(InstructionStep {
                order,
                description,
                images: parse_images(entry),
            })
        })
        .collect()
}

/// Read `media.images` from any payload node; a missing list is empty
fn parse_images(node: &Value) -> Vec<ImageRef> {
    node.pointer("/media/images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| {
                    let url = image.get("image").and_then(Value::as_str)?;
                    let width = image.get("width").and_then(Value::as_i64)?;
                    Some(ImageRef {
                        url: url.to_string(),
                        width,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn require_str(entry: &Value, field: &str) -> Result<String, GoustoError> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| malformed(format!("payload missing {}", field)))
}

fn malformed(reason: impl Into<String>) -> GoustoError {
    GoustoError::MalformedPayload(reason.into())
}
