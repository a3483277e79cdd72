//! Line items and the shapes used to add or change them.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Selected options of a line item (size, colour, engraving, ...).
///
/// Ordered so the row id derived from them is stable.
pub type CartItemOptions = BTreeMap<String, serde_json::Value>;

/// Cart content keyed by row id, in insertion order.
pub type CartContent = IndexMap<String, CartItem>;

/// Derive the row id of a product with the given options.
///
/// Two lines with the same product id and options share a row id and are
/// merged into one.
pub fn row_id(id: &str, options: &CartItemOptions) -> String {
    let encoded = serde_json::Value::Object(
        options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    format!("{:x}", md5::compute(format!("{id}{encoded}")))
}

/// An entity that can be put in the cart directly.
pub trait Buyable {
    /// Product identifier for the given options.
    fn buyable_identifier(&self, options: &CartItemOptions) -> String;

    /// Display name for the given options.
    fn buyable_description(&self, options: &CartItemOptions) -> String;

    /// Unit price for the given options.
    fn buyable_price(&self, options: &CartItemOptions) -> f64;

    /// Registered model name the line should be associated with.
    fn buyable_model(&self) -> Option<String> {
        None
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Identity key derived from `id` and `options`.
    pub row_id: String,
    /// Product identifier.
    pub id: String,
    /// Product name (denormalized for display).
    pub name: String,
    /// Quantity.
    pub qty: i64,
    /// Unit price before tax.
    pub price: f64,
    /// Tax rate in percent.
    pub tax_rate: f64,
    /// Selected options.
    #[serde(default)]
    pub options: CartItemOptions,
    /// Name of the associated model, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_model: Option<String>,
}

impl CartItem {
    /// Create a line item with no options and no tax.
    pub fn new(id: impl Into<String>, name: impl Into<String>, qty: i64, price: f64) -> Self {
        Self::from_attributes(ItemAttributes::new(id, name, qty, price), 0.0)
    }

    /// Build a line from attributes, using `default_tax` when no rate is given.
    pub fn from_attributes(attributes: ItemAttributes, default_tax: f64) -> Self {
        let ItemAttributes {
            id,
            name,
            qty,
            price,
            options,
            tax_rate,
            associated_model,
        } = attributes;

        Self {
            row_id: row_id(&id, &options),
            id,
            name,
            qty,
            price,
            tax_rate: tax_rate.unwrap_or(default_tax),
            options,
            associated_model,
        }
    }

    /// Unit price including tax.
    pub fn price_tax(&self) -> f64 {
        self.price + self.price * self.tax_rate / 100.0
    }

    /// Tax per unit.
    pub fn tax(&self) -> f64 {
        self.price_tax() - self.price
    }

    /// Quantity times unit price.
    pub fn subtotal(&self) -> f64 {
        self.qty as f64 * self.price
    }

    /// Quantity times unit tax.
    pub fn tax_total(&self) -> f64 {
        self.qty as f64 * self.tax()
    }

    /// Quantity times unit price including tax.
    pub fn total(&self) -> f64 {
        self.qty as f64 * self.price_tax()
    }

    /// Replace id, name, quantity, price and options. The tax rate and
    /// association change only when the attributes carry one.
    pub fn replace(&mut self, attributes: ItemAttributes) {
        self.id = attributes.id;
        self.name = attributes.name;
        self.qty = attributes.qty;
        self.price = attributes.price;
        self.options = attributes.options;
        if let Some(rate) = attributes.tax_rate {
            self.tax_rate = rate;
        }
        if attributes.associated_model.is_some() {
            self.associated_model = attributes.associated_model;
        }
        self.row_id = row_id(&self.id, &self.options);
    }

    /// Change only the fields present in the patch.
    pub fn apply_patch(&mut self, patch: ItemPatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(qty) = patch.qty {
            self.qty = qty;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(options) = patch.options {
            self.options = options;
        }
        if let Some(rate) = patch.tax_rate {
            self.tax_rate = rate;
        }
        self.row_id = row_id(&self.id, &self.options);
    }
}

/// Everything needed to build a line item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAttributes {
    /// Product identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Quantity.
    pub qty: i64,
    /// Unit price.
    pub price: f64,
    /// Selected options.
    pub options: CartItemOptions,
    /// Tax rate in percent; `None` uses the configured default.
    pub tax_rate: Option<f64>,
    /// Registered model name.
    pub associated_model: Option<String>,
}

impl ItemAttributes {
    /// Attributes with no options, default tax and no association.
    pub fn new(id: impl Into<String>, name: impl Into<String>, qty: i64, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            qty,
            price,
            options: CartItemOptions::new(),
            tax_rate: None,
            associated_model: None,
        }
    }

    /// Attributes taken from a buyable entity.
    pub fn from_buyable(item: &impl Buyable, qty: i64, options: CartItemOptions) -> Self {
        Self {
            id: item.buyable_identifier(&options),
            name: item.buyable_description(&options),
            qty,
            price: item.buyable_price(&options),
            tax_rate: None,
            associated_model: item.buyable_model(),
            options,
        }
    }

    /// Add a single option.
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Replace all options.
    pub fn with_options(mut self, options: CartItemOptions) -> Self {
        self.options = options;
        self
    }

    /// Set an explicit tax rate.
    pub fn with_tax_rate(mut self, rate: f64) -> Self {
        self.tax_rate = Some(rate);
        self
    }
}

/// A partial change to a line item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    /// New product identifier.
    pub id: Option<String>,
    /// New display name.
    pub name: Option<String>,
    /// New quantity.
    pub qty: Option<i64>,
    /// New unit price.
    pub price: Option<f64>,
    /// New options (replaces all options).
    pub options: Option<CartItemOptions>,
    /// New tax rate.
    pub tax_rate: Option<f64>,
}

impl ItemPatch {
    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the quantity.
    pub fn qty(mut self, qty: i64) -> Self {
        self.qty = Some(qty);
        self
    }

    /// Set the unit price.
    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Replace the options.
    pub fn options(mut self, options: CartItemOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the tax rate.
    pub fn tax_rate(mut self, rate: f64) -> Self {
        self.tax_rate = Some(rate);
        self
    }
}

/// What to add to the cart.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSpec {
    /// Build a new line from attributes.
    Attributes(ItemAttributes),
    /// Add several specs in order.
    Bulk(Vec<ItemSpec>),
    /// Add a ready-made line as-is.
    Existing(CartItem),
}

impl From<ItemAttributes> for ItemSpec {
    fn from(attributes: ItemAttributes) -> Self {
        ItemSpec::Attributes(attributes)
    }
}

impl From<CartItem> for ItemSpec {
    fn from(item: CartItem) -> Self {
        ItemSpec::Existing(item)
    }
}

impl<T: Into<ItemSpec>> From<Vec<T>> for ItemSpec {
    fn from(specs: Vec<T>) -> Self {
        ItemSpec::Bulk(specs.into_iter().map(Into::into).collect())
    }
}

/// How to change an existing line.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    /// Replace the quantity.
    Quantity(i64),
    /// Replace the line's attributes (identity is recomputed).
    Replace(ItemAttributes),
    /// Change only some fields (identity is recomputed).
    Patch(ItemPatch),
}

impl ItemUpdate {
    /// Take id, name and price from a buyable entity, keeping the line's
    /// quantity and options.
    pub fn from_buyable(item: &impl Buyable, options: &CartItemOptions) -> Self {
        ItemUpdate::Patch(ItemPatch {
            id: Some(item.buyable_identifier(options)),
            name: Some(item.buyable_description(options)),
            price: Some(item.buyable_price(options)),
            ..ItemPatch::default()
        })
    }
}

impl From<i64> for ItemUpdate {
    fn from(qty: i64) -> Self {
        ItemUpdate::Quantity(qty)
    }
}

impl From<i32> for ItemUpdate {
    fn from(qty: i32) -> Self {
        ItemUpdate::Quantity(i64::from(qty))
    }
}

impl From<ItemAttributes> for ItemUpdate {
    fn from(attributes: ItemAttributes) -> Self {
        ItemUpdate::Replace(attributes)
    }
}

impl From<ItemPatch> for ItemUpdate {
    fn from(patch: ItemPatch) -> Self {
        ItemUpdate::Patch(patch)
    }
}

/// Result of [`Cart::add`](crate::Cart::add): one line, or one result per
/// spec of a bulk add.
#[derive(Debug, Clone, PartialEq)]
pub enum Added {
    /// The resulting line.
    Item(CartItem),
    /// Results of a bulk add, in order.
    Bulk(Vec<Added>),
}

impl Added {
    /// The line, if this was a single add.
    pub fn into_item(self) -> Option<CartItem> {
        match self {
            Added::Item(item) => Some(item),
            Added::Bulk(_) => None,
        }
    }

    /// Every resulting line, bulk adds flattened.
    pub fn items(&self) -> Vec<&CartItem> {
        match self {
            Added::Item(item) => vec![item],
            Added::Bulk(added) => added.iter().flat_map(Added::items).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Book;

    impl Buyable for Book {
        fn buyable_identifier(&self, options: &CartItemOptions) -> String {
            match options.get("format").and_then(|v| v.as_str()) {
                Some(format) => format!("BOOK-{format}"),
                None => "BOOK".to_string(),
            }
        }

        fn buyable_description(&self, _options: &CartItemOptions) -> String {
            "The Rust Book".to_string()
        }

        fn buyable_price(&self, _options: &CartItemOptions) -> f64 {
            39.5
        }

        fn buyable_model(&self) -> Option<String> {
            Some("book".to_string())
        }
    }

    #[test]
    fn test_row_id_is_stable_and_hex() {
        let a = row_id("SKU1", &CartItemOptions::new());
        let b = row_id("SKU1", &CartItemOptions::new());
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_row_id_depends_on_options() {
        let plain = row_id("SKU1", &CartItemOptions::new());
        let mut options = CartItemOptions::new();
        options.insert("size".into(), "L".into());
        assert_ne!(plain, row_id("SKU1", &options));
    }

    #[test]
    fn test_row_id_ignores_option_insertion_order() {
        let a = ItemAttributes::new("SKU1", "Shirt", 1, 10.0)
            .with_option("size", "L")
            .with_option("color", "red");
        let b = ItemAttributes::new("SKU1", "Shirt", 1, 10.0)
            .with_option("color", "red")
            .with_option("size", "L");
        assert_eq!(
            CartItem::from_attributes(a, 0.0).row_id,
            CartItem::from_attributes(b, 0.0).row_id
        );
    }

    #[test]
    fn test_derived_prices() {
        let item = CartItem::from_attributes(
            ItemAttributes::new("SKU1", "Widget", 3, 10.0).with_tax_rate(21.0),
            0.0,
        );
        assert!((item.price_tax() - 12.1).abs() < 1e-9);
        assert!((item.tax() - 2.1).abs() < 1e-9);
        assert!((item.subtotal() - 30.0).abs() < 1e-9);
        assert!((item.tax_total() - 6.3).abs() < 1e-9);
        assert!((item.total() - 36.3).abs() < 1e-9);
    }

    #[test]
    fn test_default_tax_applies_only_without_rate() {
        let defaulted = CartItem::from_attributes(ItemAttributes::new("A", "A", 1, 1.0), 19.0);
        let explicit = CartItem::from_attributes(
            ItemAttributes::new("A", "A", 1, 1.0).with_tax_rate(7.0),
            19.0,
        );
        assert!((defaulted.tax_rate - 19.0).abs() < f64::EPSILON);
        assert!((explicit.tax_rate - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_recomputes_row_id() {
        let mut item = CartItem::new("SKU1", "Shirt", 1, 10.0);
        let before = item.row_id.clone();

        let mut options = CartItemOptions::new();
        options.insert("size".into(), "M".into());
        item.apply_patch(ItemPatch::default().options(options.clone()).qty(4));

        assert_ne!(item.row_id, before);
        assert_eq!(item.row_id, row_id("SKU1", &options));
        assert_eq!(item.qty, 4);
        assert_eq!(item.name, "Shirt");
    }

    #[test]
    fn test_replace_keeps_tax_without_rate() {
        let mut item = CartItem::from_attributes(
            ItemAttributes::new("SKU1", "Shirt", 1, 10.0).with_tax_rate(10.0),
            0.0,
        );
        item.replace(ItemAttributes::new("SKU2", "Pants", 2, 20.0));

        assert_eq!(item.id, "SKU2");
        assert_eq!(item.qty, 2);
        assert!((item.tax_rate - 10.0).abs() < f64::EPSILON);
        assert_eq!(item.row_id, row_id("SKU2", &CartItemOptions::new()));
    }

    #[test]
    fn test_from_buyable() {
        let mut options = CartItemOptions::new();
        options.insert("format".into(), "epub".into());
        let attributes = ItemAttributes::from_buyable(&Book, 2, options);

        assert_eq!(attributes.id, "BOOK-epub");
        assert_eq!(attributes.name, "The Rust Book");
        assert!((attributes.price - 39.5).abs() < f64::EPSILON);
        assert_eq!(attributes.associated_model.as_deref(), Some("book"));
    }

    #[test]
    fn test_update_from_buyable_is_patch() {
        let update = ItemUpdate::from_buyable(&Book, &CartItemOptions::new());
        let ItemUpdate::Patch(patch) = update else {
            panic!("expected a patch");
        };
        assert_eq!(patch.id.as_deref(), Some("BOOK"));
        assert!(patch.qty.is_none());
    }

    #[test]
    fn test_vec_into_bulk_spec() {
        let spec: ItemSpec = vec![
            ItemAttributes::new("A", "A", 1, 1.0),
            ItemAttributes::new("B", "B", 1, 1.0),
        ]
        .into();
        assert!(matches!(spec, ItemSpec::Bulk(ref specs) if specs.len() == 2));
    }

    #[test]
    fn test_added_items_flattens() {
        let a = CartItem::new("A", "A", 1, 1.0);
        let b = CartItem::new("B", "B", 1, 1.0);
        let added = Added::Bulk(vec![
            Added::Item(a.clone()),
            Added::Bulk(vec![Added::Item(b.clone())]),
        ]);
        assert_eq!(added.items(), vec![&a, &b]);
        assert!(added.into_item().is_none());
    }
}
