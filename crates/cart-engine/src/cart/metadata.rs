//! Dotted-path access into the metadata object (`"shipping.address.city"`).

use serde_json::{Map, Value};

/// Cart metadata: a free-form JSON object.
pub type Metadata = Map<String, Value>;

/// Look up a dotted path.
pub fn get_path<'a>(root: &'a Metadata, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn get_path_mut<'a>(root: &'a mut Metadata, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let mut current = root.get_mut(segments.next()?)?;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Set a dotted path, creating intermediate objects.
///
/// A non-object value in the way is replaced by an object.
pub fn set_path(root: &mut Metadata, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Remove a dotted path, returning the removed value.
pub fn remove_path(root: &mut Metadata, path: &str) -> Option<Value> {
    match path.rsplit_once('.') {
        Some((parent, last)) => get_path_mut(root, parent)?.as_object_mut()?.remove(last),
        None => root.remove(path),
    }
}
