//! Reactive Property Store.
//!
//! Entity classes declare their properties once with a
//! [`PropertyDefinition`]. Each mounted entity gets a [`PropertyStore`]: one
//! `spark_signals::Signal` per declared property, created at mount.
//!
//! # Write Pipeline
//!
//! ```text
//! set(value)
//!   → write transform     (Suppress stops everything here)
//!   → equality check
//!   → store + mirror      (only when changed)
//!   → side effect         (always; an error aborts the rest)
//!   → stage persistence   (changed + persistent)
//!   → schedule render     (reactive, and changed or always_render)
//! ```
//!
//! The pipeline itself runs in [`Runtime`](crate::pipeline::Runtime), which
//! owns the scheduler, the host and the storage it touches.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spark_signals::{signal, Signal};

use crate::error::{BoxError, Result};
use crate::pipeline::Entity;
use crate::types::Value;

// =============================================================================
// PropertyValue
// =============================================================================

/// Value stored in a reactive property.
///
/// Serializes as plain JSON (`null`, `true`, `3`, `1.5`, `"x"`, `[..]`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Null => false,
            PropertyValue::Bool(b) => *b,
            PropertyValue::Int(i) => *i != 0,
            PropertyValue::Float(f) => *f != 0.0 && !f.is_nan(),
            PropertyValue::Str(s) => !s.is_empty(),
            PropertyValue::List(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(value: Vec<T>) -> Self {
        PropertyValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl From<&PropertyValue> for Value {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Value::Nothing,
            PropertyValue::Bool(b) => Value::from(*b),
            PropertyValue::Int(i) => Value::from(*i),
            PropertyValue::Float(x) => Value::from(*x),
            PropertyValue::Str(s) => Value::from(s.as_str()),
            PropertyValue::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        Value::from(&value)
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Result of a write transform.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Continue the write with this value.
    Accept(PropertyValue),
    /// Drop the write: no state change, no side effect, no render.
    Suppress,
}

/// `(entity, new, previous)`; an error aborts the rest of the write.
pub type SideEffect = Rc<dyn Fn(&Entity, &PropertyValue, &PropertyValue) -> std::result::Result<(), BoxError>>;
/// `(entity, incoming, previous)`.
pub type WriteTransform = Rc<dyn Fn(&Entity, PropertyValue, &PropertyValue) -> WriteOutcome>;
/// `(entity, stored)`, recomputed on every read.
pub type ReadTransform = Rc<dyn Fn(&Entity, &PropertyValue) -> PropertyValue>;
/// Maps a value to attribute text; `None` removes the attribute.
pub type AttributeMap = Rc<dyn Fn(&PropertyValue) -> Option<String>>;

/// Reflects a property onto an attribute of the entity element.
#[derive(Clone)]
pub struct AttributeMirror {
    pub name: String,
    pub map: Option<AttributeMap>,
}

impl AttributeMirror {
    /// Attribute text for `value`. Without a mapping, truthy values are
    /// written as text (`true` as an empty attribute) and falsy ones remove
    /// the attribute.
    pub fn text_for(&self, value: &PropertyValue) -> Option<String> {
        match &self.map {
            Some(map) => map(value),
            None if !value.is_truthy() => None,
            None if value.as_bool() == Some(true) => Some(String::new()),
            None => Some(value.to_string()),
        }
    }
}

/// Declaration of one reactive property.
#[derive(Clone)]
pub struct PropertyDefinition {
    pub(crate) initial: PropertyValue,
    pub(crate) persistent: bool,
    pub(crate) storage_key: Option<String>,
    pub(crate) side_effect: Option<SideEffect>,
    pub(crate) write_transform: Option<WriteTransform>,
    pub(crate) read_transform: Option<ReadTransform>,
    pub(crate) mirror_class: Option<String>,
    pub(crate) mirror_attribute: Option<AttributeMirror>,
    pub(crate) always_render: bool,
    pub(crate) reactive: bool,
}

impl PropertyDefinition {
    pub fn new(initial: impl Into<PropertyValue>) -> Self {
        Self {
            initial: initial.into(),
            persistent: false,
            storage_key: None,
            side_effect: None,
            write_transform: None,
            read_transform: None,
            mirror_class: None,
            mirror_attribute: None,
            always_render: false,
            reactive: true,
        }
    }

    pub fn initial(&self) -> &PropertyValue {
        &self.initial
    }

    /// Load at mount and write back on change.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Persist under `key` instead of `{class}.{name}`.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.persistent = true;
        self.storage_key = Some(key.into());
        self
    }

    pub fn side_effect(
        mut self,
        f: impl Fn(&Entity, &PropertyValue, &PropertyValue) -> std::result::Result<(), BoxError> + 'static,
    ) -> Self {
        self.side_effect = Some(Rc::new(f));
        self
    }

    pub fn write_transform(
        mut self,
        f: impl Fn(&Entity, PropertyValue, &PropertyValue) -> WriteOutcome + 'static,
    ) -> Self {
        self.write_transform = Some(Rc::new(f));
        self
    }

    pub fn read_transform(mut self, f: impl Fn(&Entity, &PropertyValue) -> PropertyValue + 'static) -> Self {
        self.read_transform = Some(Rc::new(f));
        self
    }

    /// Toggle `class` on the entity element by truthiness.
    pub fn mirror_class(mut self, class: impl Into<String>) -> Self {
        self.mirror_class = Some(class.into());
        self
    }

    pub fn mirror_attribute(mut self, name: impl Into<String>) -> Self {
        self.mirror_attribute = Some(AttributeMirror {
            name: name.into(),
            map: None,
        });
        self
    }

    pub fn mirror_attribute_with(
        mut self,
        name: impl Into<String>,
        map: impl Fn(&PropertyValue) -> Option<String> + 'static,
    ) -> Self {
        self.mirror_attribute = Some(AttributeMirror {
            name: name.into(),
            map: Some(Rc::new(map)),
        });
        self
    }

    /// Render even when a write leaves the value unchanged.
    pub fn always_render(mut self) -> Self {
        self.always_render = true;
        self
    }

    /// Writes never schedule a render.
    pub fn non_reactive(mut self) -> Self {
        self.reactive = false;
        self
    }

    pub(crate) fn has_mirror(&self) -> bool {
        self.mirror_class.is_some() || self.mirror_attribute.is_some()
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("initial", &self.initial)
            .field("persistent", &self.persistent)
            .field("storage_key", &self.storage_key)
            .field("side_effect", &self.side_effect.is_some())
            .field("write_transform", &self.write_transform.is_some())
            .field("read_transform", &self.read_transform.is_some())
            .field("mirror_class", &self.mirror_class)
            .field("mirror_attribute", &self.mirror_attribute.as_ref().map(|m| &m.name))
            .field("always_render", &self.always_render)
            .field("reactive", &self.reactive)
            .finish()
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The write transform rejected the value.
    Suppressed,
    Committed {
        changed: bool,
        /// A render of the owning entity was requested.
        scheduled: bool,
    },
}

// =============================================================================
// Store
// =============================================================================

/// Per-entity property state, one signal per declared property.
pub(crate) struct PropertyStore {
    values: IndexMap<String, Signal<PropertyValue>>,
}

impl PropertyStore {
    pub(crate) fn new(values: impl IntoIterator<Item = (String, PropertyValue)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(name, value)| (name, signal(value)))
                .collect(),
        }
    }

    pub(crate) fn signal(&self, name: &str) -> Option<Signal<PropertyValue>> {
        self.values.get(name).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

// =============================================================================
// Property handle
// =============================================================================

/// Explicit reactive-field wrapper for one property of one entity.
///
/// ```ignore
/// let count = entity.property("count")?;
/// count.set(count.get()?.as_int().unwrap_or(0) + 1)?;
/// ```
#[derive(Clone)]
pub struct Property {
    entity: Entity,
    name: Rc<str>,
}

impl Property {
    pub(crate) fn new(entity: Entity, name: &str) -> Self {
        Self {
            entity,
            name: Rc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn get(&self) -> Result<PropertyValue> {
        self.entity.get(&self.name)
    }

    pub fn set(&self, value: impl Into<PropertyValue>) -> Result<SetOutcome> {
        self.entity.set(&self.name, value)
    }

    /// The backing signal. Reading it inside `spark_signals::effect` tracks
    /// committed writes; read transforms are not applied.
    pub fn signal(&self) -> Result<Signal<PropertyValue>> {
        self.entity.signal(&self.name)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("entity", &self.entity.id())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_json_shape() {
        let value = PropertyValue::List(vec![
            PropertyValue::Null,
            true.into(),
            3.into(),
            1.5.into(),
            "x".into(),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[null,true,3,1.5,"x"]"#);
        let back: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_truthiness_and_display() {
        assert!(!PropertyValue::Null.is_truthy());
        assert!(!PropertyValue::from(0).is_truthy());
        assert!(PropertyValue::from("on").is_truthy());
        assert_eq!(PropertyValue::from(vec!["a", "b"]).to_string(), "a b");
        assert_eq!(PropertyValue::Null.to_string(), "");
    }

    #[test]
    fn test_attribute_mirror_defaults() {
        let mirror = AttributeMirror {
            name: "level".into(),
            map: None,
        };
        assert_eq!(mirror.text_for(&3.into()), Some("3".to_string()));
        assert_eq!(mirror.text_for(&true.into()), Some(String::new()));
        assert_eq!(mirror.text_for(&false.into()), None);

        let mapped = AttributeMirror {
            name: "mode".into(),
            map: Some(Rc::new(|v: &PropertyValue| v.as_int().map(|i| format!("m{i}")))),
        };
        assert_eq!(mapped.text_for(&2.into()), Some("m2".to_string()));
    }

    #[test]
    fn test_into_value() {
        assert!(Value::from(&PropertyValue::Null).is_nothing());
        assert!(matches!(Value::from(PropertyValue::from(vec![1, 2])), Value::List(items) if items.len() == 2));
    }

    #[test]
    fn test_store_signals_track_values() {
        let store = PropertyStore::new([("a".to_string(), PropertyValue::from(1))]);
        let sig = store.signal("a").unwrap();
        assert_eq!(sig.get(), PropertyValue::from(1));
        sig.set(PropertyValue::from(2));
        assert_eq!(store.signal("a").unwrap().get(), PropertyValue::from(2));
        assert!(store.signal("b").is_none());
        assert_eq!(store.len(), 1);
    }
}
