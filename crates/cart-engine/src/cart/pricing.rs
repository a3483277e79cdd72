//! Cart totals and number formatting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cart::{CartContent, Fee};
use crate::config::FormatConfig;

/// Fees keyed by id, in insertion order.
pub type Fees = IndexMap<String, Fee>;

/// Aggregate amounts of a cart.
///
/// Plain `f64` arithmetic; nothing is rounded here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of quantity × price.
    pub subtotal: f64,
    /// Sum of quantity × unit tax.
    pub tax: f64,
    /// Sum of all fee contributions.
    pub fee_total: f64,
    /// Sum of quantity × price with tax, plus fees.
    pub total: f64,
}

impl CartTotals {
    /// Compute totals for the given content and fees.
    pub fn calculate(content: &CartContent, fees: &Fees) -> Self {
        let subtotal = subtotal(content);
        let fee_total = fee_total(fees, subtotal);
        let items_total: f64 = content.values().map(|item| item.total()).sum();

        Self {
            subtotal,
            tax: content.values().map(|item| item.tax_total()).sum(),
            fee_total,
            total: items_total + fee_total,
        }
    }
}

pub(crate) fn subtotal(content: &CartContent) -> f64 {
    content.values().map(|item| item.subtotal()).sum()
}

/// Every fee is computed against the same subtotal; fees never compound.
pub(crate) fn fee_total(fees: &Fees, subtotal: f64) -> f64 {
    fees.values().map(|fee| fee.amount(subtotal)).sum()
}

/// Format a number with fixed decimals and custom separators.
pub fn format_number(value: f64, format: &FormatConfig) -> String {
    let fixed = format!("{:.*}", format.decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(&format.thousand_separator);
        }
        grouped.push(*digit);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac_part) = frac_part {
        out.push_str(&format.decimal_point);
        out.push_str(frac_part);
    }
    out
}
