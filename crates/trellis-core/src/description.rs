//! Description trees.
//!
//! A [`Description`] is the caller-supplied, not-yet-committed blueprint
//! of desired output. It is plain data: it can be cloned, compared and
//! serialized, which is what allows it to cross the channel to the
//! background reconciler.
//!
//! ## Example
//!
//! ```
//! use trellis_core::description::{Description, Kind};
//!
//! let view = Description::element("div")
//!     .prop("class", "container")
//!     .on("click", "counter.increment")
//!     .child(Description::text("Hello"));
//!
//! assert_eq!(view.kind, Some(Kind::Element("div".to_string())));
//! assert_eq!(view.children.len(), 1);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved prop key for child descriptions.
///
/// Children are carried in [`Description::children`], never in props; the
/// key is excluded from attribute and event application.
pub const CHILDREN_KEY: &str = "children";

/// Prop key carrying the content of a [`Kind::Text`] node.
pub const TEXT_KEY: &str = "text";

/// Ordered mapping of attribute and event keys to values.
pub type Props = IndexMap<String, PropValue>;

/// The type of unit being rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum Kind {
	/// A primitive element with the given tag.
	Element(String),
	/// A text node. Content lives in the `text` prop.
	Text,
	/// A composite unit resolved by name on the reconciler side.
	Component(String),
}

impl Kind {
	/// Returns true for composite kinds.
	pub fn is_component(&self) -> bool {
		matches!(self, Kind::Component(_))
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Kind::Element(tag) => write!(f, "<{}>", tag),
			Kind::Text => write!(f, "#text"),
			Kind::Component(name) => write!(f, "{}", name),
		}
	}
}

/// Name of an event handler registered with the reconciler.
///
/// Handlers themselves never cross the channel; only this name does, so a
/// handler's identity is preserved through any number of round trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(pub String);

impl HandlerRef {
	/// Creates a new handler reference.
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Returns the handler name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for HandlerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A single prop value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum PropValue {
	Str(String),
	Int(i64),
	Float(f64),
	Bool(bool),
	Null,
	/// An event binding.
	Handler(HandlerRef),
}

impl PropValue {
	/// Renders the value as an attribute string.
	///
	/// Returns `None` for values that produce no attribute (`false`, `null`
	/// and handlers).
	pub fn to_attr_value(&self) -> Option<String> {
		match self {
			PropValue::Str(s) => Some(s.clone()),
			PropValue::Int(i) => Some(i.to_string()),
			PropValue::Float(v) => Some(v.to_string()),
			PropValue::Bool(true) => Some(String::new()),
			PropValue::Bool(false) | PropValue::Null | PropValue::Handler(_) => None,
		}
	}

	/// Returns the handler reference if this value is an event binding.
	pub fn as_handler(&self) -> Option<&HandlerRef> {
		match self {
			PropValue::Handler(handler) => Some(handler),
			_ => None,
		}
	}

	/// Returns the string payload, if any.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropValue::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns true when the value is a truthy flag (`true` or a non-empty string).
	pub fn is_truthy(&self) -> bool {
		match self {
			PropValue::Bool(b) => *b,
			PropValue::Str(s) => !s.is_empty() && s != "false",
			PropValue::Int(i) => *i != 0,
			PropValue::Float(v) => *v != 0.0,
			PropValue::Null | PropValue::Handler(_) => false,
		}
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		PropValue::Str(value.to_string())
	}
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		PropValue::Str(value)
	}
}

impl From<i64> for PropValue {
	fn from(value: i64) -> Self {
		PropValue::Int(value)
	}
}

impl From<i32> for PropValue {
	fn from(value: i32) -> Self {
		PropValue::Int(i64::from(value))
	}
}

impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		PropValue::Float(value)
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		PropValue::Bool(value)
	}
}

impl From<HandlerRef> for PropValue {
	fn from(value: HandlerRef) -> Self {
		PropValue::Handler(value)
	}
}

/// Returns true if `key` follows the event-name convention (`on` followed
/// by an uppercase letter, e.g. `onClick`).
pub fn is_event_key(key: &str) -> bool {
	key.strip_prefix("on")
		.and_then(|rest| rest.chars().next())
		.is_some_and(|c| c.is_ascii_uppercase())
}

/// Returns the event name for an event key (`onMouseDown` → `mousedown`).
pub fn event_name(key: &str) -> Option<String> {
	if !is_event_key(key) {
		return None;
	}
	Some(key[2..].to_ascii_lowercase())
}

/// Returns the event key for an event name (`click` → `onClick`).
pub fn event_key(event: &str) -> String {
	let mut chars = event.chars();
	match chars.next() {
		Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
		None => "on".to_string(),
	}
}

/// Returns true if `key` is a plain attribute (neither an event binding nor
/// the reserved `children` key).
pub fn is_attribute_key(key: &str) -> bool {
	key != CHILDREN_KEY && !is_event_key(key)
}

/// A description of one rendered unit and its children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Description {
	/// `None` models a malformed description.
	pub kind: Option<Kind>,
	/// Optional stable key used by the keyed diff pass.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	#[serde(default)]
	pub props: Props,
	#[serde(default)]
	pub children: Vec<Description>,
	/// Retained but not committed to the output tree.
	#[serde(default)]
	pub offscreen: bool,
}

impl Description {
	fn with_kind(kind: Kind) -> Self {
		Self {
			kind: Some(kind),
			..Self::default()
		}
	}

	/// Creates an element description.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::with_kind(Kind::Element(tag.into()))
	}

	/// Creates a text description.
	pub fn text(content: impl Into<String>) -> Self {
		Self::with_kind(Kind::Text).prop(TEXT_KEY, PropValue::Str(content.into()))
	}

	/// Creates a component description.
	pub fn component(name: impl Into<String>) -> Self {
		Self::with_kind(Kind::Component(name.into()))
	}

	/// Creates a description with no kind.
	pub fn malformed() -> Self {
		Self::default()
	}

	/// Sets a prop. Setting the reserved `children` key is ignored.
	pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
		let key = key.into();
		if key != CHILDREN_KEY {
			self.props.insert(key, value.into());
		}
		self
	}

	/// Binds an event (`"click"`) to a registered handler.
	pub fn on(self, event: &str, handler: impl Into<String>) -> Self {
		let key = event_key(event);
		self.prop(key, PropValue::Handler(HandlerRef::new(handler)))
	}

	/// Appends a child description.
	pub fn child(mut self, child: Description) -> Self {
		self.children.push(child);
		self
	}

	/// Appends several child descriptions.
	pub fn children(mut self, children: impl IntoIterator<Item = Description>) -> Self {
		self.children.extend(children);
		self
	}

	/// Sets the stable key.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Marks the description as offscreen.
	pub fn offscreen(mut self, offscreen: bool) -> Self {
		self.offscreen = offscreen;
		self
	}

	/// Returns true if the description has no kind.
	pub fn is_malformed(&self) -> bool {
		self.kind.is_none()
	}

	/// Total number of descriptions in this subtree, including itself.
	pub fn node_count(&self) -> usize {
		1 + self
			.children
			.iter()
			.map(Description::node_count)
			.sum::<usize>()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("onClick", true)]
	#[case("onMouseDown", true)]
	#[case("on", false)]
	#[case("online", false)]
	#[case("class", false)]
	#[case("children", false)]
	fn test_is_event_key(#[case] key: &str, #[case] expected: bool) {
		assert_eq!(is_event_key(key), expected);
	}

	#[rstest]
	fn test_event_name_and_key_are_inverse() {
		assert_eq!(event_name("onClick").as_deref(), Some("click"));
		assert_eq!(event_name("onKeyDown").as_deref(), Some("keydown"));
		assert_eq!(event_key("click"), "onClick");
		assert_eq!(event_name(&event_key("submit")).as_deref(), Some("submit"));
	}

	#[rstest]
	fn test_children_key_is_never_stored_in_props() {
		// Arrange & Act
		let desc = Description::element("div").prop(CHILDREN_KEY, "ignored");

		// Assert
		assert!(desc.props.is_empty());
		assert!(!is_attribute_key(CHILDREN_KEY));
	}

	#[rstest]
	fn test_builder_preserves_prop_order() {
		// Arrange & Act
		let desc = Description::element("a")
			.prop("href", "/")
			.prop("class", "link")
			.on("click", "nav.go");

		// Assert
		let keys: Vec<&str> = desc.props.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["href", "class", "onClick"]);
		assert_eq!(
			desc.props["onClick"].as_handler(),
			Some(&HandlerRef::new("nav.go"))
		);
	}

	#[rstest]
	fn test_attr_values() {
		assert_eq!(PropValue::from("x").to_attr_value().as_deref(), Some("x"));
		assert_eq!(PropValue::Bool(true).to_attr_value().as_deref(), Some(""));
		assert_eq!(PropValue::Bool(false).to_attr_value(), None);
		assert_eq!(PropValue::Int(7).to_attr_value().as_deref(), Some("7"));
		assert_eq!(
			PropValue::Handler(HandlerRef::new("h")).to_attr_value(),
			None
		);
	}

	#[rstest]
	fn test_node_count_covers_subtree() {
		let desc = Description::element("ul").children([
			Description::element("li").child(Description::text("a")),
			Description::element("li"),
		]);
		assert_eq!(desc.node_count(), 4);
		assert!(Description::malformed().is_malformed());
	}
}
