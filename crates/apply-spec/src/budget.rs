//! Budget table arithmetic: per-item values, the grand total and the CSV breakdown.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::expr::Formula;
use crate::repr::csv_row;
use crate::spec::lenient::{coerce_number, display_value, is_truthy, lenient, number_text};

pub const BUDGET_HEADER: &str = r#""Item","Price","Quantity","Total""#;
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

/// Step table used by the `range` calculation method.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RangeTable {
    #[serde(default, deserialize_with = "lenient")]
    pub input: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub output: Vec<Value>,
}

impl RangeTable {
    /// Output paired with the last input that is `<= key`.
    pub fn lookup(&self, key: f64) -> f64 {
        let Some(index) = self
            .input
            .iter()
            .rposition(|bound| key >= coerce_number(bound))
        else {
            return 0.0;
        };
        let value = self.output.get(index).map_or(f64::NAN, coerce_number);
        if value.is_nan() { 0.0 } else { value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationMethod {
    Default,
    Custom,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMethod {
    None,
    Round,
    Floor,
    Ceil,
}

/// One row of a budget answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub calculation_method: Option<String>,
    #[serde(default)]
    pub default_price: Value,
    #[serde(default)]
    pub default_quantity: Value,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_formula: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub range_table: Option<RangeTable>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub rounding_method: Option<String>,
    #[serde(default)]
    pub rounding_decimal_places: Value,
}

impl BudgetItem {
    pub fn price(&self) -> f64 {
        coerce_number(&self.default_price)
    }

    pub fn quantity(&self) -> f64 {
        coerce_number(&self.default_quantity)
    }

    /// Unrecognized methods calculate like `default`.
    pub fn method(&self) -> CalculationMethod {
        match self.calculation_method.as_deref() {
            Some("custom") => CalculationMethod::Custom,
            Some("range") => CalculationMethod::Range,
            _ => CalculationMethod::Default,
        }
    }

    pub fn rounding(&self) -> RoundingMethod {
        match self.rounding_method.as_deref() {
            Some("round") => RoundingMethod::Round,
            Some("floor") => RoundingMethod::Floor,
            Some("ceil") => RoundingMethod::Ceil,
            _ => RoundingMethod::None,
        }
    }

    fn formula(&self) -> &str {
        self.custom_formula.as_deref().unwrap_or("")
    }

    fn apply_rounding(&self, value: f64) -> f64 {
        let multiplier = 10f64.powf(coerce_number(&self.rounding_decimal_places));
        match self.rounding() {
            RoundingMethod::None => value,
            RoundingMethod::Round => round_half_up(value * multiplier) / multiplier,
            RoundingMethod::Floor => (value * multiplier).floor() / multiplier,
            RoundingMethod::Ceil => (value * multiplier).ceil() / multiplier,
        }
    }
}

/// Rounds to the nearest integer with halves going towards positive infinity.
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Reads budget items from a raw answer payload: a list of items or an
/// object whose values are items. Rows of the wrong shape read as empty items.
pub fn items_from_value(raw: &Value) -> Vec<BudgetItem> {
    let rows: Vec<&Value> = match raw {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(rows) => rows.values().collect(),
        _ => Vec::new(),
    };
    rows.into_iter()
        .map(|row| serde_json::from_value(row.clone()).unwrap_or_default())
        .collect()
}

/// Evaluates a custom formula. Unparseable formulas and `NaN` results are `0`.
pub fn formula_value(formula: &str, items: &[BudgetItem]) -> f64 {
    if formula.trim().is_empty() {
        return 0.0;
    }
    match Formula::parse(formula) {
        Ok(parsed) => {
            let value = parsed.evaluate(items);
            if value.is_nan() { 0.0 } else { value }
        }
        Err(error) => {
            warn!(formula, %error, "budget formula could not be parsed");
            0.0
        }
    }
}

/// Value of the item at `index` after its calculation method and rounding.
pub fn item_value(items: &[BudgetItem], index: usize) -> f64 {
    let Some(item) = items.get(index) else {
        return 0.0;
    };
    let value = match item.method() {
        CalculationMethod::Default => item.price() * item.quantity(),
        CalculationMethod::Custom => formula_value(item.formula(), items),
        CalculationMethod::Range => {
            let key = formula_value(item.formula(), items);
            item.range_table.as_ref().map_or(0.0, |table| table.lookup(key))
        }
    };
    item.apply_rounding(value)
}

/// Sum of every item, or `None` when any item is not a finite number.
pub fn total_of(items: &[BudgetItem]) -> Option<f64> {
    let mut total = 0.0;
    let mut failed = false;
    for index in 0..items.len() {
        let value = item_value(items, index);
        if value.is_finite() {
            total += value;
        } else {
            failed = true;
        }
    }
    (!failed).then_some(total)
}

/// Grand total text: `"ERROR"` if any item failed, `"0"` for an empty budget.
pub fn budget_total_text(items: &[BudgetItem]) -> String {
    match total_of(items) {
        Some(total) => number_text(total),
        None => "ERROR".to_string(),
    }
}

/// CSV breakdown of the non-zero items followed by a grand total row.
///
/// Items that are zero or not finite are left out; no remaining item gives `""`.
pub fn budget_csv_block(items: &[BudgetItem]) -> String {
    let mut rows = Vec::new();
    let mut grand_total = 0.0;

    for (index, item) in items.iter().enumerate() {
        let value = item_value(items, index);
        if value == 0.0 || !value.is_finite() {
            continue;
        }
        let name = match item.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Item {}", index + 1),
        };
        let price = raw_or_zero(&item.default_price);
        let quantity = raw_or_zero(&item.default_quantity);
        let total = number_text(value);
        rows.push(csv_row(&[
            name.as_str(),
            price.as_str(),
            quantity.as_str(),
            total.as_str(),
        ]));
        grand_total += value;
    }

    if rows.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(BUDGET_HEADER.to_string());
    lines.extend(rows);
    let grand_total = number_text(grand_total);
    lines.push(csv_row(&[GRAND_TOTAL_LABEL, "", "", grand_total.as_str()]));
    lines.join("\n")
}

/// Total for a raw budget payload.
pub fn budget_total(raw: &Value) -> String {
    if !is_truthy(raw) {
        return "0".to_string();
    }
    budget_total_text(&items_from_value(raw))
}

/// CSV breakdown for a raw budget payload.
pub fn budget_csv(raw: &Value) -> String {
    if !is_truthy(raw) {
        return String::new();
    }
    budget_csv_block(&items_from_value(raw))
}

fn raw_or_zero(value: &Value) -> String {
    if is_truthy(value) {
        display_value(value)
    } else {
        "0".to_string()
    }
}
