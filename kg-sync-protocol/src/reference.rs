//! Internal references and the visitor used to walk them.
//!
//! Target documents link to each other through [`InternalReference`] values
//! nested at arbitrary depth. Rather than discovering them reflectively, every
//! document type exposes them through [`HasReferences`]. Containers forward to
//! their elements, so a document implementation only lists its own fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// A link from one target document to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalReference {
    /// Target document id. Cleared when the target is not known to exist.
    pub reference: Option<String>,

    /// Display label, kept even when the target id is cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ReferenceContext>,
}

/// Where in the target document the link should land.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl InternalReference {
    pub fn new(reference: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            value: Some(value.into()),
            context: None,
        }
    }

    pub fn with_context(mut self, context: ReferenceContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Anything that may contain internal references.
pub trait HasReferences {
    /// Calls `visit` once for every internal reference reachable from `self`.
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference));
}

impl HasReferences for InternalReference {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        visit(self);
    }
}

impl<T: HasReferences> HasReferences for Option<T> {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        if let Some(inner) = self {
            inner.visit_references(visit);
        }
    }
}

impl<T: HasReferences> HasReferences for Vec<T> {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        for item in self.iter_mut() {
            item.visit_references(visit);
        }
    }
}

impl<T: HasReferences> HasReferences for [T] {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        for item in self.iter_mut() {
            item.visit_references(visit);
        }
    }
}

impl<T: HasReferences + ?Sized> HasReferences for Box<T> {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        (**self).visit_references(visit);
    }
}

impl<K, T: HasReferences> HasReferences for BTreeMap<K, T> {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        for item in self.values_mut() {
            item.visit_references(visit);
        }
    }
}

impl<K, T: HasReferences, S> HasReferences for HashMap<K, T, S> {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        for item in self.values_mut() {
            item.visit_references(visit);
        }
    }
}

/// Untyped documents: any object with a string or null `reference` member is
/// treated as an internal reference; everything else is walked recursively.
impl HasReferences for Value {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        match self {
            Value::Array(items) => items.visit_references(visit),
            Value::Object(map) if is_reference_object(map) => visit_reference_object(map, visit),
            Value::Object(map) => {
                for item in map.values_mut() {
                    item.visit_references(visit);
                }
            }
            _ => {}
        }
    }
}

fn is_reference_object(map: &Map<String, Value>) -> bool {
    matches!(map.get("reference"), Some(Value::String(_)) | Some(Value::Null))
}

fn visit_reference_object(
    map: &mut Map<String, Value>,
    visit: &mut dyn FnMut(&mut InternalReference),
) {
    let reference = map
        .get("reference")
        .and_then(Value::as_str)
        .map(str::to_string);
    let value = map.get("value").and_then(Value::as_str).map(str::to_string);
    let mut visited = InternalReference {
        reference: reference.clone(),
        value: value.clone(),
        context: map
            .get("context")
            .cloned()
            .and_then(|c| serde_json::from_value(c).ok()),
    };

    visit(&mut visited);

    // Members the visitor left alone keep their original JSON form.
    if visited.reference != reference {
        map.insert(
            "reference".to_string(),
            visited.reference.map(Value::String).unwrap_or(Value::Null),
        );
    }
    if visited.value != value {
        match visited.value {
            Some(label) => {
                map.insert("value".to_string(), Value::String(label));
            }
            None => {
                map.remove("value");
            }
        }
    }
}
