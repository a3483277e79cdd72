//! Fees: named surcharges or discounts applied against the subtotal.

use serde::{Deserialize, Serialize};

use crate::CartError;

/// Raw fee value as given by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeValue {
    /// String form, e.g. `"5"`, `"10%"`, `"-2.50"`.
    Text(String),
    /// Plain number.
    Number(f64),
}

impl FeeValue {
    fn into_raw(self) -> String {
        match self {
            FeeValue::Text(s) => s,
            FeeValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for FeeValue {
    fn from(v: &str) -> Self {
        FeeValue::Text(v.to_string())
    }
}

impl From<String> for FeeValue {
    fn from(v: String) -> Self {
        FeeValue::Text(v)
    }
}

impl From<f64> for FeeValue {
    fn from(v: f64) -> Self {
        FeeValue::Number(v)
    }
}

impl From<i64> for FeeValue {
    fn from(v: i64) -> Self {
        FeeValue::Number(v as f64)
    }
}

impl From<i32> for FeeValue {
    fn from(v: i32) -> Self {
        FeeValue::Number(f64::from(v))
    }
}

/// A named percentage or absolute adjustment.
///
/// Classified once from the string form of its value: a leading `-` marks a
/// discount, a trailing `%` marks a percentage of the subtotal. The discount
/// flag is informational; a negative value already subtracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    id: String,
    title: String,
    raw: String,
    value: f64,
    percentage: bool,
    discount: bool,
}

impl Fee {
    /// Parse a fee.
    ///
    /// # Example
    ///
    /// ```
    /// use cart_engine::Fee;
    ///
    /// let fee = Fee::new("vip", "VIP discount", "-10%").unwrap();
    /// assert!(fee.is_percentage());
    /// assert!(fee.is_discount());
    /// assert_eq!(fee.value(), -10.0);
    /// ```
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        value: impl Into<FeeValue>,
    ) -> Result<Self, CartError> {
        let raw = value.into().into_raw();
        let trimmed = raw.trim();

        let discount = trimmed.starts_with('-');
        let (number, percentage) = match trimmed.strip_suffix('%') {
            Some(number) => (number.trim(), true),
            None => (trimmed, false),
        };

        let value = number
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CartError::InvalidFeeValue(raw.clone()))?;

        Ok(Self {
            id: id.into(),
            title: title.into(),
            raw,
            value,
            percentage,
            discount,
        })
    }

    /// Fee identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The value exactly as given.
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    /// Numeric value (percent for percentage fees).
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the value is a percentage of the subtotal.
    pub fn is_percentage(&self) -> bool {
        self.percentage
    }

    /// Whether the value was given with a leading `-`.
    pub fn is_discount(&self) -> bool {
        self.discount
    }

    /// Contribution of this fee for the given subtotal.
    pub fn amount(&self, subtotal: f64) -> f64 {
        if self.percentage {
            subtotal * self.value / 100.0
        } else {
            self.value
        }
    }
}
