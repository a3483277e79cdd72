//! The session-backed cart.

use cart_db::Db;
use cart_session::Session;
use serde_json::Value;
use tracing::{debug, info};

use crate::cart::metadata::{self, Metadata};
use crate::cart::pricing::{self, CartTotals, Fees};
use crate::cart::{Added, CartContent, CartItem, Fee, FeeValue, ItemSpec, ItemUpdate};
use crate::config::CartConfig;
use crate::events::{CartEvent, EventDispatcher, NullDispatcher};
use crate::models::ModelRegistry;
use crate::storage::SnapshotRepository;
use crate::CartError;

/// Instance used when none was selected.
pub const DEFAULT_INSTANCE: &str = "default";

/// A shopping cart living in the user's session.
///
/// Nothing is cached on the handle: every operation reads the collection it
/// needs from the session and every mutation writes it back whole.
///
/// Session layout for identifier `cart`:
///
/// | key              | value                         |
/// |------------------|-------------------------------|
/// | `cart.<name>`    | line items of instance `name` |
/// | `cart._instance` | active instance key           |
/// | `cart._fees`     | fees                          |
/// | `cart._metadata` | metadata object               |
pub struct Cart {
    config: CartConfig,
    session: Session,
    storage: SnapshotRepository,
    events: Box<dyn EventDispatcher>,
    models: ModelRegistry,
    /// Full session key of the active instance (`"<identifier>.<name>"`).
    instance: String,
}

impl Cart {
    /// Open the cart for a session.
    ///
    /// Creates the snapshot table if needed and resumes the instance that was
    /// last active in this session.
    pub fn new(config: CartConfig, session: Session, db: Db) -> Result<Self, CartError> {
        let storage = SnapshotRepository::new(db, config.database.table.clone())?;
        storage.ensure_table()?;

        let prefix = format!("{}.", config.identifier);
        let instance = session
            .get::<String>(&format!("{}._instance", config.identifier))?
            .filter(|key| key.starts_with(&prefix))
            .unwrap_or_else(|| format!("{prefix}{DEFAULT_INSTANCE}"));

        debug!(session = %session.id(), instance = %instance, "cart opened");

        Ok(Self {
            config,
            session,
            storage,
            events: Box::new(NullDispatcher),
            models: ModelRegistry::new(),
            instance,
        })
    }

    /// Use `dispatcher` for cart events.
    pub fn with_events(mut self, dispatcher: impl EventDispatcher + 'static) -> Self {
        self.events = Box::new(dispatcher);
        self
    }

    /// Use `models` to validate and resolve associations.
    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    /// Switch to another instance. Other instances keep their content.
    ///
    /// Names starting with `_` share the session namespace with fees,
    /// metadata and the active-instance marker, so they are rejected.
    pub fn set_instance(&mut self, name: &str) -> Result<(), CartError> {
        if name.is_empty() || name.starts_with('_') {
            return Err(CartError::InvalidInstance(name.to_string()));
        }
        self.instance = self.instance_key(name);
        self.session.put(&self.reserved_key("_instance"), &self.instance)?;
        debug!(instance = %self.instance, "instance switched");
        Ok(())
    }

    /// Name of the active instance, without the identifier prefix.
    pub fn instance(&self) -> &str {
        self.instance
            .strip_prefix(self.config.identifier.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(self.instance.as_str())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Add one line, or several in order.
    ///
    /// A line whose row id is already in the cart is merged by summing
    /// quantities; the merged line is returned. Quantities must be positive.
    pub fn add(&self, spec: impl Into<ItemSpec>) -> Result<Added, CartError> {
        match spec.into() {
            ItemSpec::Bulk(specs) => specs
                .into_iter()
                .map(|spec| self.add(spec))
                .collect::<Result<Vec<_>, _>>()
                .map(Added::Bulk),
            ItemSpec::Attributes(attributes) => self
                .add_line(CartItem::from_attributes(attributes, self.config.tax))
                .map(Added::Item),
            ItemSpec::Existing(mut item) => {
                item.row_id = super::row_id(&item.id, &item.options);
                self.add_line(item).map(Added::Item)
            }
        }
    }

    /// Add a line without options at the default tax rate.
    pub fn add_item(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        qty: i64,
        price: f64,
    ) -> Result<CartItem, CartError> {
        let attributes = super::ItemAttributes::new(id, name, qty, price);
        self.add_line(CartItem::from_attributes(attributes, self.config.tax))
    }

    fn add_line(&self, item: CartItem) -> Result<CartItem, CartError> {
        if item.qty <= 0 {
            return Err(CartError::InvalidQuantity(item.qty));
        }

        let mut content = self.content()?;

        let item = match content.get_mut(&item.row_id) {
            Some(existing) => {
                existing.qty = merge_qty(existing.qty, item.qty)?;
                existing.clone()
            }
            None => {
                content.insert(item.row_id.clone(), item.clone());
                item
            }
        };

        self.save_content(&self.instance, &content)?;
        debug!(row_id = %item.row_id, qty = item.qty, instance = %self.instance, "item added");
        self.events.dispatch(&CartEvent::Added(item.clone()));
        Ok(item)
    }

    /// Change a line.
    ///
    /// When the change alters the row id, the line moves to the new id and
    /// merges with a line already there. A resulting quantity of zero or less
    /// removes the line and returns `None`.
    pub fn update(
        &self,
        row_id: &str,
        update: impl Into<ItemUpdate>,
    ) -> Result<Option<CartItem>, CartError> {
        let mut content = self.content()?;
        let (index, _, current) = content
            .get_full(row_id)
            .ok_or_else(|| CartError::InvalidRowIdentifier(row_id.to_string()))?;
        let mut item = current.clone();

        match update.into() {
            ItemUpdate::Quantity(qty) => item.qty = qty,
            ItemUpdate::Replace(attributes) => item.replace(attributes),
            ItemUpdate::Patch(patch) => item.apply_patch(patch),
        }

        if item.row_id != row_id {
            content.shift_remove(row_id);
            if let Some(existing) = content.get(&item.row_id) {
                item.qty = merge_qty(item.qty, existing.qty)?;
            }
        }

        if item.qty <= 0 {
            content.shift_remove(&item.row_id);
            self.save_content(&self.instance, &content)?;
            debug!(row_id = %item.row_id, "item removed by update");
            self.events.dispatch(&CartEvent::Removed(item));
            return Ok(None);
        }

        if content.contains_key(&item.row_id) {
            content.insert(item.row_id.clone(), item.clone());
        } else {
            let at = index.min(content.len());
            content.shift_insert(at, item.row_id.clone(), item.clone());
        }

        self.save_content(&self.instance, &content)?;
        debug!(row_id = %item.row_id, qty = item.qty, "item updated");
        self.events.dispatch(&CartEvent::Updated(item.clone()));
        Ok(Some(item))
    }

    /// Remove a line.
    pub fn remove(&self, row_id: &str) -> Result<(), CartError> {
        let mut content = self.content()?;
        let item = content
            .shift_remove(row_id)
            .ok_or_else(|| CartError::InvalidRowIdentifier(row_id.to_string()))?;

        self.save_content(&self.instance, &content)?;
        debug!(row_id, "item removed");
        self.events.dispatch(&CartEvent::Removed(item));
        Ok(())
    }

    /// Fetch a line.
    pub fn get(&self, row_id: &str) -> Result<CartItem, CartError> {
        self.content()?
            .get(row_id)
            .cloned()
            .ok_or_else(|| CartError::InvalidRowIdentifier(row_id.to_string()))
    }

    /// Whether a line with this row id is in the cart.
    pub fn exists(&self, row_id: &str) -> Result<bool, CartError> {
        Ok(self.content()?.contains_key(row_id))
    }

    /// All lines of the active instance, in insertion order.
    pub fn content(&self) -> Result<CartContent, CartError> {
        self.load_content(&self.instance)
    }

    /// Total quantity across lines.
    pub fn count(&self) -> Result<i64, CartError> {
        self.content()?
            .values()
            .try_fold(0_i64, |total, item| merge_qty(total, item.qty))
    }

    /// Number of distinct lines.
    pub fn unique_count(&self) -> Result<usize, CartError> {
        Ok(self.content()?.len())
    }

    /// Whether the total quantity is zero.
    pub fn is_empty(&self) -> Result<bool, CartError> {
        Ok(self.count()? == 0)
    }

    /// Lines matching `predicate`. The cart is not modified.
    pub fn search(
        &self,
        predicate: impl Fn(&CartItem) -> bool,
    ) -> Result<Vec<CartItem>, CartError> {
        Ok(self
            .content()?
            .into_values()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Associate a line with a registered model.
    pub fn associate(&self, row_id: &str, model: &str) -> Result<(), CartError> {
        self.modify(
            row_id,
            |item| item.associated_model = Some(model.to_string()),
            || {
                if self.models.contains(model) {
                    Ok(())
                } else {
                    Err(CartError::UnknownModel(model.to_string()))
                }
            },
        )
    }

    /// Look up the entity a line is associated with.
    pub fn model_for(&self, row_id: &str) -> Result<Option<Value>, CartError> {
        let item = self.get(row_id)?;
        Ok(item
            .associated_model
            .as_deref()
            .and_then(|model| self.models.find(model, &item.id)))
    }

    /// Set the tax rate (percent) of a line.
    pub fn set_tax(&self, row_id: &str, rate: f64) -> Result<(), CartError> {
        self.modify(row_id, |item| item.tax_rate = rate, || Ok(()))
    }

    /// Change a line in place after `check` passes. Row ids are unaffected.
    fn modify(
        &self,
        row_id: &str,
        change: impl FnOnce(&mut CartItem),
        check: impl FnOnce() -> Result<(), CartError>,
    ) -> Result<(), CartError> {
        let mut content = self.content()?;
        let item = content
            .get_mut(row_id)
            .ok_or_else(|| CartError::InvalidRowIdentifier(row_id.to_string()))?;
        check()?;
        change(item);
        self.save_content(&self.instance, &content)
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Sum of quantity × price.
    pub fn subtotal(&self) -> Result<f64, CartError> {
        Ok(pricing::subtotal(&self.content()?))
    }

    /// Sum of quantity × unit tax.
    pub fn tax(&self) -> Result<f64, CartError> {
        Ok(self.content()?.values().map(|item| item.tax_total()).sum())
    }

    /// Sum of all fees, each computed against the subtotal.
    pub fn total_fee(&self) -> Result<f64, CartError> {
        Ok(pricing::fee_total(&self.fees()?, self.subtotal()?))
    }

    /// Sum of quantity × price with tax, plus fees.
    pub fn total(&self) -> Result<f64, CartError> {
        Ok(self.totals()?.total)
    }

    /// All totals from one read of the session.
    pub fn totals(&self) -> Result<CartTotals, CartError> {
        Ok(CartTotals::calculate(&self.content()?, &self.fees()?))
    }

    /// Render an amount with the configured number format.
    pub fn formatted(&self, value: f64) -> String {
        pricing::format_number(value, &self.config.format)
    }

    // -------------------------------------------------------------------------
    // Fees
    // -------------------------------------------------------------------------

    /// Add a fee, replacing any fee with the same id in place.
    pub fn add_fee(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
        value: impl Into<FeeValue>,
    ) -> Result<Fee, CartError> {
        let fee = Fee::new(id, title, value)?;
        let mut fees = self.fees()?;
        fees.insert(fee.id().to_string(), fee.clone());
        self.session.put(&self.reserved_key("_fees"), &fees)?;
        debug!(fee = fee.id(), "fee added");
        Ok(fee)
    }

    /// Remove one fee, or all fees when `id` is `None`.
    pub fn remove_fee(&self, id: Option<&str>) -> Result<(), CartError> {
        let key = self.reserved_key("_fees");
        match id {
            Some(id) => {
                let mut fees = self.fees()?;
                if fees.shift_remove(id).is_some() {
                    self.session.put(&key, &fees)?;
                }
            }
            None => self.session.remove(&key)?,
        }
        Ok(())
    }

    /// Fees in insertion order.
    pub fn fees(&self) -> Result<Fees, CartError> {
        Ok(self
            .session
            .get::<Fees>(&self.reserved_key("_fees"))?
            .unwrap_or_default())
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    /// The whole metadata object.
    pub fn metadata(&self) -> Result<Metadata, CartError> {
        Ok(self
            .session
            .get::<Metadata>(&self.reserved_key("_metadata"))?
            .unwrap_or_default())
    }

    /// Value at a dotted path.
    pub fn metadata_for(&self, path: &str) -> Result<Option<Value>, CartError> {
        Ok(metadata::get_path(&self.metadata()?, path).cloned())
    }

    /// Set the value at a dotted path, creating intermediate objects.
    pub fn set_metadata(&self, path: &str, value: impl Into<Value>) -> Result<(), CartError> {
        let mut meta = self.metadata()?;
        metadata::set_path(&mut meta, path, value.into());
        self.session.put(&self.reserved_key("_metadata"), &meta)?;
        Ok(())
    }

    /// Remove the value at a dotted path, or all metadata when `path` is `None`.
    pub fn remove_metadata(&self, path: Option<&str>) -> Result<(), CartError> {
        let key = self.reserved_key("_metadata");
        match path {
            Some(path) => {
                let mut meta = self.metadata()?;
                if metadata::remove_path(&mut meta, path).is_some() {
                    self.session.put(&key, &meta)?;
                }
            }
            None => self.session.remove(&key)?,
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Clear every instance, fee and metadata entry of this cart from the
    /// session, keeping the metadata at the `preserve` paths.
    pub fn destroy(&self, preserve: &[&str]) -> Result<(), CartError> {
        let meta = self.metadata()?;
        let mut kept = Metadata::new();
        for path in preserve {
            if let Some(value) = metadata::get_path(&meta, path) {
                metadata::set_path(&mut kept, path, value.clone());
            }
        }

        let keys = self
            .session
            .keys_with_prefix(&format!("{}.", self.config.identifier))?;
        for key in &keys {
            self.session.remove(key)?;
        }

        if !kept.is_empty() {
            self.session.put(&self.reserved_key("_metadata"), &kept)?;
        }

        info!(
            identifier = %self.config.identifier,
            removed = keys.len(),
            preserved = kept.len(),
            "cart destroyed"
        );
        Ok(())
    }

    /// Clear the cart on logout when `destroy_on_logout` is set.
    ///
    /// Returns whether anything was cleared.
    pub fn handle_logout(&self) -> Result<bool, CartError> {
        if !self.config.destroy_on_logout {
            return Ok(false);
        }
        self.destroy(&[])?;
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Stored snapshots
    // -------------------------------------------------------------------------

    /// Write the active instance to the database under `identifier`.
    ///
    /// An earlier snapshot of the same instance is replaced, unless
    /// `database.overwrite` is off, in which case it is an error.
    pub fn store(&self, identifier: &str) -> Result<(), CartError> {
        let instance = self.instance();

        if !self.config.database.overwrite && self.storage.exists(identifier, instance)? {
            return Err(CartError::AlreadyStored {
                identifier: identifier.to_string(),
                instance: instance.to_string(),
            });
        }

        let content = self.content()?;
        self.storage.delete(identifier, instance)?;
        self.storage.insert(identifier, instance, &content)?;

        info!(identifier, instance, lines = content.len(), "cart stored");
        self.events.dispatch(&CartEvent::Stored {
            identifier: identifier.to_string(),
            instance: instance.to_string(),
        });
        Ok(())
    }

    /// Merge the snapshot stored under `identifier` for the active instance
    /// back into the session. Quantities of matching lines are summed.
    ///
    /// Does nothing when no snapshot exists. The snapshot is kept.
    pub fn restore(&self, identifier: &str) -> Result<(), CartError> {
        let Some(stored) = self.storage.find(identifier, self.instance())? else {
            debug!(identifier, instance = self.instance(), "no stored cart");
            return Ok(());
        };

        let key = self.instance_key(&stored.instance);
        let mut content = self.load_content(&key)?;
        for item in stored.items()? {
            match content.get_mut(&item.row_id) {
                Some(existing) => existing.qty = merge_qty(existing.qty, item.qty)?,
                None => {
                    content.insert(item.row_id.clone(), item);
                }
            }
        }
        self.save_content(&key, &content)?;

        info!(identifier, instance = %stored.instance, lines = content.len(), "cart restored");
        self.events.dispatch(&CartEvent::Restored {
            identifier: identifier.to_string(),
            instance: stored.instance,
        });
        Ok(())
    }

    /// Delete the snapshot stored under `identifier` for the active instance.
    pub fn erase_stored(&self, identifier: &str) -> Result<(), CartError> {
        self.storage.delete(identifier, self.instance())
    }

    // -------------------------------------------------------------------------
    // Session keys
    // -------------------------------------------------------------------------

    fn instance_key(&self, name: &str) -> String {
        format!("{}.{}", self.config.identifier, name)
    }

    fn reserved_key(&self, suffix: &str) -> String {
        format!("{}.{}", self.config.identifier, suffix)
    }

    fn load_content(&self, key: &str) -> Result<CartContent, CartError> {
        Ok(self.session.get::<CartContent>(key)?.unwrap_or_default())
    }

    fn save_content(&self, key: &str, content: &CartContent) -> Result<(), CartError> {
        self.session.put(key, content)?;
        Ok(())
    }
}

fn merge_qty(a: i64, b: i64) -> Result<i64, CartError> {
    a.checked_add(b).ok_or(CartError::Overflow)
}

impl std::fmt::Debug for Cart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cart")
            .field("session", self.session.id())
            .field("instance", &self.instance)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{ItemAttributes, ItemPatch};
    use crate::events::RecordingDispatcher;
    use cart_session::{MemoryStore, SessionId};
    use serde_json::json;

    fn cart_with(config: CartConfig) -> Cart {
        let session = Session::new(SessionId::new("test"), MemoryStore::new());
        Cart::new(config, session, Db::connect(None).unwrap()).unwrap()
    }

    fn cart() -> Cart {
        cart_with(CartConfig::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_add_merges_same_identity() {
        let cart = cart();
        cart.add_item("SKU1", "Widget", 2, 9.99).unwrap();
        let merged = cart.add_item("SKU1", "Widget", 3, 9.99).unwrap();

        assert_eq!(merged.qty, 5);
        assert_eq!(cart.unique_count().unwrap(), 1);
        assert_eq!(cart.count().unwrap(), 5);
        assert!(approx(cart.subtotal().unwrap(), 49.95));
    }

    #[test]
    fn test_add_different_options_are_separate_lines() {
        let cart = cart();
        let medium = ItemAttributes::new("SKU1", "Shirt", 1, 10.0).with_option("size", "M");
        let large = ItemAttributes::new("SKU1", "Shirt", 1, 10.0).with_option("size", "L");
        cart.add(medium).unwrap();
        cart.add(large).unwrap();
        assert_eq!(cart.unique_count().unwrap(), 2);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let cart = cart();
        cart.add_item("A", "A", 2, 1.0).unwrap();

        assert!(matches!(
            cart.add_item("A", "A", -5, 1.0),
            Err(CartError::InvalidQuantity(-5))
        ));
        assert!(matches!(
            cart.add_item("B", "B", 0, 1.0),
            Err(CartError::InvalidQuantity(0))
        ));

        assert_eq!(cart.count().unwrap(), 2);
        assert_eq!(cart.unique_count().unwrap(), 1);
        assert!(approx(cart.subtotal().unwrap(), 2.0));
    }

    #[test]
    fn test_add_overflow_is_an_error() {
        let cart = cart();
        let item = cart.add_item("A", "A", i64::MAX, 1.0).unwrap();

        assert!(matches!(cart.add_item("A", "A", 1, 1.0), Err(CartError::Overflow)));
        assert_eq!(cart.get(&item.row_id).unwrap().qty, i64::MAX);
    }

    #[test]
    fn test_update_merge_overflow_leaves_content() {
        let cart = cart();
        let medium = ItemAttributes::new("SKU1", "Shirt", i64::MAX, 1.0).with_option("size", "M");
        let large = ItemAttributes::new("SKU1", "Shirt", 1, 1.0).with_option("size", "L");
        let medium = cart.add(medium).unwrap().into_item().unwrap();
        let large = cart.add(large).unwrap().into_item().unwrap();

        let patch = ItemPatch::default().options(large.options.clone());
        assert!(matches!(cart.update(&medium.row_id, patch), Err(CartError::Overflow)));
        assert_eq!(cart.unique_count().unwrap(), 2);
    }

    #[test]
    fn test_count_overflow_is_an_error() {
        let cart = cart();
        cart.add_item("A", "A", i64::MAX, 1.0).unwrap();
        cart.add_item("B", "B", 1, 1.0).unwrap();
        assert!(matches!(cart.count(), Err(CartError::Overflow)));
    }

    #[test]
    fn test_restore_overflow_is_an_error() {
        let cart = cart();
        let item = cart.add_item("A", "A", i64::MAX, 1.0).unwrap();
        cart.store("user-1").unwrap();

        assert!(matches!(cart.restore("user-1"), Err(CartError::Overflow)));
        assert_eq!(cart.get(&item.row_id).unwrap().qty, i64::MAX);
    }

    #[test]
    fn test_get_keeps_content() {
        let cart = cart();
        let a = cart.add_item("A", "A", 1, 1.0).unwrap();
        cart.add_item("B", "B", 1, 1.0).unwrap();

        cart.get(&a.row_id).unwrap();
        let ids: Vec<String> = cart.content().unwrap().values().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_add_bulk_returns_each_line() {
        let cart = cart();
        let added = cart
            .add(vec![
                ItemAttributes::new("A", "A", 1, 1.0),
                ItemAttributes::new("B", "B", 2, 2.0),
            ])
            .unwrap();
        assert_eq!(added.items().len(), 2);
        assert_eq!(cart.count().unwrap(), 3);
    }

    #[test]
    fn test_add_existing_item_recomputes_row_id() {
        let cart = cart();
        let mut item = CartItem::new("A", "A", 1, 1.0);
        item.row_id = "bogus".into();
        let added = cart.add(item).unwrap().into_item().unwrap();
        assert_eq!(added.row_id, crate::cart::row_id("A", &Default::default()));
    }

    #[test]
    fn test_default_tax_from_config() {
        let config = CartConfig {
            tax: 21.0,
            ..CartConfig::default()
        };
        let cart = cart_with(config);
        let item = cart.add_item("A", "A", 1, 100.0).unwrap();
        assert!(approx(item.tax_rate, 21.0));
        assert!(approx(cart.tax().unwrap(), 21.0));
        assert!(approx(cart.total().unwrap(), 121.0));
    }

    #[test]
    fn test_update_quantity_and_remove_on_zero() {
        let cart = cart();
        let item = cart.add_item("A", "A", 2, 5.0).unwrap();

        let updated = cart.update(&item.row_id, 7).unwrap().unwrap();
        assert_eq!(updated.qty, 7);

        assert!(cart.update(&item.row_id, 0).unwrap().is_none());
        assert!(!cart.exists(&item.row_id).unwrap());
    }

    #[test]
    fn test_update_unknown_row() {
        let cart = cart();
        assert!(matches!(
            cart.update("nope", 1),
            Err(CartError::InvalidRowIdentifier(_))
        ));
    }

    #[test]
    fn test_update_identity_change_merges() {
        let cart = cart();
        let medium = cart
            .add(ItemAttributes::new("SKU1", "Shirt", 1, 10.0).with_option("size", "M"))
            .unwrap()
            .into_item()
            .unwrap();
        let large = cart
            .add(ItemAttributes::new("SKU1", "Shirt", 2, 10.0).with_option("size", "L"))
            .unwrap()
            .into_item()
            .unwrap();

        let updated = cart
            .update(
                &medium.row_id,
                ItemPatch::default().options(large.options.clone()),
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.row_id, large.row_id);
        assert_eq!(updated.qty, 3);
        assert_eq!(cart.unique_count().unwrap(), 1);
        assert!(!cart.exists(&medium.row_id).unwrap());
    }

    #[test]
    fn test_update_keeps_position() {
        let cart = cart();
        let a = cart.add_item("A", "A", 1, 1.0).unwrap();
        cart.add_item("B", "B", 1, 1.0).unwrap();

        let renamed = cart
            .update(&a.row_id, ItemPatch { id: Some("Z".into()), ..ItemPatch::default() })
            .unwrap()
            .unwrap();

        let ids: Vec<String> = cart.content().unwrap().values().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["Z", "B"]);
        assert_ne!(renamed.row_id, a.row_id);
    }

    #[test]
    fn test_remove_and_get() {
        let cart = cart();
        let item = cart.add_item("A", "A", 1, 1.0).unwrap();
        assert_eq!(cart.get(&item.row_id).unwrap(), item);

        cart.remove(&item.row_id).unwrap();
        assert!(matches!(cart.get(&item.row_id), Err(CartError::InvalidRowIdentifier(_))));
        assert!(matches!(cart.remove(&item.row_id), Err(CartError::InvalidRowIdentifier(_))));
        assert!(cart.is_empty().unwrap());
    }

    #[test]
    fn test_search() {
        let cart = cart();
        cart.add_item("A", "Apple", 1, 1.0).unwrap();
        cart.add_item("B", "Banana", 1, 2.0).unwrap();

        let found = cart.search(|item| item.price > 1.5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Banana");
        assert_eq!(cart.unique_count().unwrap(), 2);
    }

    #[test]
    fn test_associate_requires_registered_model() {
        let cart = cart().with_models(
            ModelRegistry::new().register("product", |id| Some(json!({ "id": id }))),
        );
        let item = cart.add_item("SKU1", "Widget", 1, 1.0).unwrap();

        assert!(matches!(
            cart.associate(&item.row_id, "unicorn"),
            Err(CartError::UnknownModel(_))
        ));
        assert!(matches!(
            cart.associate("nope", "product"),
            Err(CartError::InvalidRowIdentifier(_))
        ));

        cart.associate(&item.row_id, "product").unwrap();
        assert_eq!(
            cart.get(&item.row_id).unwrap().associated_model.as_deref(),
            Some("product")
        );
        assert_eq!(cart.model_for(&item.row_id).unwrap(), Some(json!({ "id": "SKU1" })));
    }

    #[test]
    fn test_set_tax() {
        let cart = cart();
        let item = cart.add_item("A", "A", 2, 10.0).unwrap();
        cart.set_tax(&item.row_id, 50.0).unwrap();
        assert!(approx(cart.tax().unwrap(), 10.0));
        assert!(matches!(cart.set_tax("nope", 1.0), Err(CartError::InvalidRowIdentifier(_))));
    }

    #[test]
    fn test_fees() {
        let cart = cart();
        cart.add_item("A", "A", 1, 100.0).unwrap();
        cart.add_fee("ship", "Shipping", 5).unwrap();
        cart.add_fee("service", "Service", "10%").unwrap();
        assert!(approx(cart.total_fee().unwrap(), 15.0));
        assert!(approx(cart.total().unwrap(), 115.0));

        cart.add_fee("ship", "Express", 20).unwrap();
        let fees = cart.fees().unwrap();
        assert_eq!(fees.keys().collect::<Vec<_>>(), vec!["ship", "service"]);
        assert_eq!(fees["ship"].title(), "Express");

        cart.remove_fee(Some("ship")).unwrap();
        assert!(approx(cart.total_fee().unwrap(), 10.0));
        cart.remove_fee(None).unwrap();
        assert!(cart.fees().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_fee() {
        let cart = cart();
        assert!(matches!(
            cart.add_fee("x", "X", "ten"),
            Err(CartError::InvalidFeeValue(_))
        ));
        assert!(cart.fees().unwrap().is_empty());
    }

    #[test]
    fn test_metadata_paths() {
        let cart = cart();
        cart.set_metadata("shipping.city", "Porto").unwrap();
        cart.set_metadata("shipping.zip", "4000").unwrap();
        assert_eq!(
            cart.metadata_for("shipping").unwrap(),
            Some(json!({ "city": "Porto", "zip": "4000" }))
        );

        cart.remove_metadata(Some("shipping.zip")).unwrap();
        assert_eq!(cart.metadata_for("shipping.zip").unwrap(), None);

        cart.remove_metadata(None).unwrap();
        assert!(cart.metadata().unwrap().is_empty());
    }

    #[test]
    fn test_reserved_instance_names_rejected() {
        let mut cart = cart();
        cart.add_fee("ship", "Shipping", 5).unwrap();

        for name in ["_fees", "_metadata", "_instance", ""] {
            assert!(matches!(
                cart.set_instance(name),
                Err(CartError::InvalidInstance(_))
            ));
        }

        assert_eq!(cart.instance(), DEFAULT_INSTANCE);
        cart.add_item("A", "A", 1, 1.0).unwrap();
        assert_eq!(cart.fees().unwrap().len(), 1);
    }

    #[test]
    fn test_instances_are_isolated() {
        let mut cart = cart();
        cart.add_item("A", "A", 1, 1.0).unwrap();
        assert_eq!(cart.instance(), "default");

        cart.set_instance("wishlist").unwrap();
        assert_eq!(cart.instance(), "wishlist");
        assert!(cart.content().unwrap().is_empty());
        cart.add_item("B", "B", 1, 1.0).unwrap();

        cart.set_instance(DEFAULT_INSTANCE).unwrap();
        let ids: Vec<String> = cart.content().unwrap().values().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["A"]);
    }

    #[test]
    fn test_events_emitted() {
        let recorder = RecordingDispatcher::new();
        let cart = cart().with_events(recorder.clone());

        let item = cart.add_item("A", "A", 1, 1.0).unwrap();
        cart.update(&item.row_id, 2).unwrap();
        cart.remove(&item.row_id).unwrap();
        cart.store("user-1").unwrap();

        assert_eq!(
            recorder.names(),
            vec!["cart.added", "cart.updated", "cart.removed", "cart.stored"]
        );
    }

    #[test]
    fn test_store_without_overwrite() {
        let mut config = CartConfig::default();
        config.database.overwrite = false;
        let cart = cart_with(config);
        cart.add_item("A", "A", 1, 1.0).unwrap();

        cart.store("user-1").unwrap();
        assert!(matches!(
            cart.store("user-1"),
            Err(CartError::AlreadyStored { .. })
        ));

        cart.erase_stored("user-1").unwrap();
        cart.store("user-1").unwrap();
    }

    #[test]
    fn test_destroy_preserves_listed_metadata() {
        let cart = cart();
        cart.add_item("A", "A", 1, 1.0).unwrap();
        cart.add_fee("ship", "Shipping", 5).unwrap();
        cart.set_metadata("k", "keep").unwrap();
        cart.set_metadata("other", "drop").unwrap();

        cart.destroy(&["k"]).unwrap();

        assert!(cart.content().unwrap().is_empty());
        assert!(cart.fees().unwrap().is_empty());
        assert_eq!(cart.metadata_for("k").unwrap(), Some(json!("keep")));
        assert_eq!(cart.metadata_for("other").unwrap(), None);
    }

    #[test]
    fn test_handle_logout() {
        let cart = cart();
        cart.add_item("A", "A", 1, 1.0).unwrap();
        assert!(!cart.handle_logout().unwrap());
        assert!(!cart.is_empty().unwrap());

        let config = CartConfig {
            destroy_on_logout: true,
            ..CartConfig::default()
        };
        let cart = cart_with(config);
        cart.add_item("A", "A", 1, 1.0).unwrap();
        assert!(cart.handle_logout().unwrap());
        assert!(cart.is_empty().unwrap());
    }

    #[test]
    fn test_formatted() {
        let cart = cart();
        assert_eq!(cart.formatted(1234.5), "1,234.50");
    }
}
