//! Registry of models a line item may be associated with.

use std::collections::HashMap;
use std::fmt;

type Resolver = Box<dyn Fn(&str) -> Option<serde_json::Value>>;

/// Known model names and how to look an entity up by product id.
///
/// The cart only keeps the model name on a line; the entity itself is looked
/// up on demand and never owned by the cart.
///
/// # Example
///
/// ```
/// use cart_engine::ModelRegistry;
/// use serde_json::json;
///
/// let models = ModelRegistry::new()
///     .register("product", |id| Some(json!({ "sku": id })));
///
/// assert!(models.contains("product"));
/// assert_eq!(models.find("product", "SKU1"), Some(json!({ "sku": "SKU1" })));
/// ```
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Resolver>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model with its lookup function.
    pub fn register(
        mut self,
        name: impl Into<String>,
        resolver: impl Fn(&str) -> Option<serde_json::Value> + 'static,
    ) -> Self {
        self.models.insert(name.into(), Box::new(resolver));
        self
    }

    /// Whether `name` is a registered model.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Look up the entity `id` of model `name`.
    pub fn find(&self, name: &str, id: &str) -> Option<serde_json::Value> {
        self.models.get(name).and_then(|resolve| resolve(id))
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.models.keys().collect();
        names.sort();
        f.debug_struct("ModelRegistry").field("models", &names).finish()
    }
}
