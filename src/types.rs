//! Core types for spark-template.
//!
//! These types flow from template functions into the engine: the
//! [`TemplateResult`] a template produces, the [`Value`] sum type every
//! dynamic slot receives, sequence [`Key`]s, and event [`Listener`]s.

use std::fmt;
use std::rc::{Rc, Weak};

// =============================================================================
// Node handles
// =============================================================================

/// Handle to a node owned by a [`HostTree`](crate::host::HostTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Primitive
// =============================================================================

/// A scalar that is written into the tree as text.
///
/// Primitives compare by value: committing an equal primitive twice is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

impl Primitive {
    /// Truthiness used by boolean attributes and mirroring.
    pub fn is_truthy(&self) -> bool {
        match self {
            Primitive::Bool(b) => *b,
            Primitive::Int(i) => *i != 0,
            Primitive::Float(f) => *f != 0.0 && !f.is_nan(),
            Primitive::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::Float(x) => write!(f, "{x}"),
            Primitive::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value as i64)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Str(Rc::from(value))
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Str(Rc::from(value))
    }
}

// =============================================================================
// Sequence keys
// =============================================================================

/// Stable identity of one item in a keyed sequence.
///
/// Unkeyed lists use [`Key::Index`], which makes reconciliation positional.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Rc::from(value))
    }
}

// =============================================================================
// Events
// =============================================================================

bitflags::bitflags! {
    /// Listener registration options.
    ///
    /// Two registrations with the same handler but different options are
    /// distinct listeners, so a change here forces a remove + add.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListenerOptions: u8 {
        const CAPTURE = 1 << 0;
        const ONCE = 1 << 1;
        const PASSIVE = 1 << 2;
    }
}

/// Event delivered to a listener by the host tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name (e.g. "click").
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Optional payload.
    pub detail: Option<Primitive>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Primitive>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Shared event handler (Rc so the same handler can be re-supplied every render).
pub type Handler = Rc<dyn Fn(&Event)>;

/// An event handler bound with its registration options.
#[derive(Clone)]
pub struct Listener {
    pub handler: Handler,
    pub options: ListenerOptions,
}

impl Listener {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            options: ListenerOptions::empty(),
        }
    }

    pub fn from_handler(handler: Handler) -> Self {
        Self {
            handler,
            options: ListenerOptions::empty(),
        }
    }

    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    /// Identity comparison: same handler object and same options.
    pub fn same_as(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.handler, &other.handler) && self.options == other.options
    }

    pub fn call(&self, event: &Event) {
        (self.handler)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("handler", &Rc::as_ptr(&self.handler))
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// Static fragments
// =============================================================================

/// The static text fragments of a template.
///
/// Fragment lists are compared by identity first (one `'static` list per
/// `html!` call site) and by content second, so textually identical
/// templates built elsewhere still share one compiled descriptor.
#[derive(Debug, Clone)]
pub struct Strings(StringsRepr);

#[derive(Debug, Clone)]
enum StringsRepr {
    Static(&'static [&'static str]),
    Owned(Rc<[String]>),
}

/// Identity of a fragment list (address, length, ownership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StringsId {
    addr: usize,
    len: usize,
    owned: bool,
}

/// Non-owning reference that reports whether an identity is still live.
#[derive(Debug, Clone)]
pub(crate) enum StringsRef {
    Static,
    Owned(Weak<[String]>),
}

impl StringsRef {
    /// True while the referenced list is alive and is exactly `strings`.
    pub(crate) fn refers_to(&self, strings: &Strings) -> bool {
        match (self, &strings.0) {
            (StringsRef::Static, StringsRepr::Static(_)) => true,
            (StringsRef::Owned(weak), StringsRepr::Owned(rc)) => weak
                .upgrade()
                .is_some_and(|live| Rc::ptr_eq(&live, rc)),
            _ => false,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            StringsRef::Static => true,
            StringsRef::Owned(weak) => weak.strong_count() > 0,
        }
    }
}

impl Strings {
    /// Fragment list with `'static` identity (used by `html!`).
    pub const fn from_static(strings: &'static [&'static str]) -> Self {
        Strings(StringsRepr::Static(strings))
    }

    /// Fragment list built at runtime. An empty input becomes one empty fragment.
    pub fn owned<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = strings.into_iter().map(Into::into).collect();
        if list.is_empty() {
            list.push(String::new());
        }
        Strings(StringsRepr::Owned(Rc::from(list)))
    }

    pub fn len(&self) -> usize {
        match &self.0 {
            StringsRepr::Static(s) => s.len(),
            StringsRepr::Owned(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        match &self.0 {
            StringsRepr::Static(s) => s.get(index).copied(),
            StringsRepr::Owned(s) => s.get(index).map(String::as_str),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Content key used when identity lookup misses.
    pub(crate) fn content_key(&self) -> Box<[String]> {
        self.iter().map(str::to_owned).collect()
    }

    pub(crate) fn identity(&self) -> StringsId {
        match &self.0 {
            StringsRepr::Static(s) => StringsId {
                addr: s.as_ptr() as usize,
                len: s.len(),
                owned: false,
            },
            StringsRepr::Owned(s) => StringsId {
                addr: Rc::as_ptr(s) as *const String as usize,
                len: s.len(),
                owned: true,
            },
        }
    }

    pub(crate) fn downgrade(&self) -> StringsRef {
        match &self.0 {
            StringsRepr::Static(_) => StringsRef::Static,
            StringsRepr::Owned(s) => StringsRef::Owned(Rc::downgrade(s)),
        }
    }
}

// =============================================================================
// Template Result
// =============================================================================

/// One evaluation of a template: static fragments plus the dynamic values
/// that fill the gaps between them.
///
/// `strings.len() == values.len() + 1` for well-formed results; a mismatch
/// is reported as a binding error when the result is applied.
#[derive(Debug, Clone)]
pub struct TemplateResult {
    strings: Strings,
    values: Vec<Value>,
}

impl TemplateResult {
    pub fn new(strings: Strings, values: Vec<Value>) -> Self {
        Self { strings, values }
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_parts(self) -> (Strings, Vec<Value>) {
        (self.strings, self.values)
    }
}

// =============================================================================
// Value
// =============================================================================

/// Everything a dynamic slot can receive.
#[derive(Debug, Clone)]
pub enum Value {
    /// Renders nothing; removes a single-value attribute.
    Nothing,
    Primitive(Primitive),
    Template(TemplateResult),
    /// A live node placed directly into a node slot.
    Node(NodeId),
    /// Unkeyed iterable; reconciled by position.
    List(Vec<Value>),
    /// Keyed iterable; reconciled move-aware by key.
    Keyed(Vec<(Key, Value)>),
    Listener(Listener),
    /// Keep detached instances of previous templates at this site for reuse.
    Cached(Box<Value>),
}

impl Value {
    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nothing => "nothing",
            Value::Primitive(_) => "primitive",
            Value::Template(_) => "template",
            Value::Node(_) => "node",
            Value::List(_) => "list",
            Value::Keyed(_) => "keyed sequence",
            Value::Listener(_) => "listener",
            Value::Cached(_) => "cached",
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Primitive(p) => p.is_truthy(),
            Value::Cached(inner) => inner.is_truthy(),
            _ => true,
        }
    }

    /// Change detection used by attribute-like parts.
    ///
    /// Primitives, nodes and listeners compare by value or identity. Composite
    /// values lose identity when cloned, so they always count as changed.
    pub(crate) fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Listener(a), Value::Listener(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Stringify for attribute interpolation. Lists concatenate their items.
    pub(crate) fn attribute_text(&self, slot: &'static str) -> Result<String, crate::BindingError> {
        match self {
            Value::Nothing => Ok(String::new()),
            Value::Primitive(p) => Ok(p.to_string()),
            Value::List(items) => {
                let mut out = String::new();
                for item in items {
                    out.push_str(&item.attribute_text(slot)?);
                }
                Ok(out)
            }
            other => Err(crate::BindingError::UnsupportedValue {
                slot,
                value: other.kind_name(),
            }),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nothing
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::Primitive(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Primitive(Primitive::Int(value as i64))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Primitive(Primitive::Int(value as i64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Primitive(value.into())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Primitive(value.as_str().into())
    }
}

impl From<TemplateResult> for Value {
    fn from(value: TemplateResult) -> Self {
        Value::Template(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Node(value)
    }
}

impl From<Listener> for Value {
    fn from(value: Listener) -> Self {
        Value::Listener(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Vec<TemplateResult>> for Value {
    fn from(value: Vec<TemplateResult>) -> Self {
        Value::List(value.into_iter().map(Value::Template).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nothing, Into::into)
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// Value that renders nothing.
pub fn nothing() -> Value {
    Value::Nothing
}

/// Wrap a value so that switching templates at its site detaches the previous
/// instance into a per-site cache instead of discarding it.
pub fn cache(value: impl Into<Value>) -> Value {
    Value::Cached(Box::new(value.into()))
}

/// Build a keyed sequence from items.
///
/// Items keep their live state across reorders as long as their key is stable.
/// Keys must be unique; a duplicate is rejected when the sequence is committed.
pub fn repeat<T, K, V>(
    items: impl IntoIterator<Item = T>,
    key_fn: impl Fn(&T) -> K,
    template_fn: impl Fn(T) -> V,
) -> Value
where
    K: Into<Key>,
    V: Into<Value>,
{
    Value::Keyed(
        items
            .into_iter()
            .map(|item| {
                let key = key_fn(&item).into();
                (key, template_fn(item).into())
            })
            .collect(),
    )
}

/// Build a [`TemplateResult`] from alternating fragments and values.
///
/// Each call site owns one `'static` fragment list, so repeated evaluations
/// hit the identity cache.
///
/// ```ignore
/// let name = "world";
/// let result = html!("<p class=\"greeting\">Hello ", name, "!</p>");
/// ```
#[macro_export]
macro_rules! html {
    ($first:literal $(, $value:expr, $rest:literal)*) => {{
        static STRINGS: &[&str] = &[$first $(, $rest)*];
        $crate::TemplateResult::new(
            $crate::Strings::from_static(STRINGS),
            vec![$($crate::Value::from($value)),*],
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nothing.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(3).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    fn test_same_as_uses_identity_for_listeners() {
        let a = Listener::new(|_| {});
        let b = a.clone();
        let c = Listener::new(|_| {});

        assert!(Value::from(a.clone()).same_as(&Value::from(b)));
        assert!(!Value::from(a.clone()).same_as(&Value::from(c)));
        assert!(
            !Value::from(a.clone()).same_as(&Value::from(a.with_options(ListenerOptions::ONCE))),
            "options are part of listener identity"
        );
    }

    #[test]
    fn test_composites_always_differ() {
        let list = Value::List(vec![Value::from(1)]);
        assert!(!list.same_as(&list.clone()));
    }

    #[test]
    fn test_attribute_text_joins_lists() {
        let v = Value::List(vec![Value::from("a"), Value::from(1), Value::Nothing]);
        assert_eq!(v.attribute_text("attribute").unwrap(), "a1");

        let err = Value::Node(NodeId(3)).attribute_text("attribute").unwrap_err();
        assert_eq!(
            err,
            crate::BindingError::UnsupportedValue {
                slot: "attribute",
                value: "node"
            }
        );
    }

    #[test]
    fn test_html_macro_shares_static_identity() {
        fn make(x: i32) -> TemplateResult {
            html!("<b>", x, "</b>")
        }
        let a = make(1);
        let b = make(2);
        assert_eq!(a.strings().identity(), b.strings().identity());
        assert_eq!(a.strings().len(), 2);
        assert_eq!(a.values().len(), 1);
    }

    #[test]
    fn test_owned_strings_identity_dies_with_list() {
        let strings = Strings::owned(["<i>", "</i>"]);
        let weak = strings.downgrade();
        assert!(weak.refers_to(&strings));

        let other = Strings::owned(["<i>", "</i>"]);
        assert!(!weak.refers_to(&other), "identity is per list, not per content");

        drop(strings);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_repeat_builds_keyed_sequence() {
        let v = repeat(vec![(1, "a"), (2, "b")], |(id, _)| *id, |(_, label)| label);
        match v {
            Value::Keyed(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].0, Key::Int(1));
                assert_eq!(items[1].0, Key::Int(2));
            }
            other => panic!("expected keyed sequence, got {other:?}"),
        }
    }
}
