//! Applying mutation lists to the live output tree.
//!
//! Mutations are applied strictly in list order. Each one resolves its
//! paths against the tree as it stands after the previous mutation, so the
//! positional indices emitted by the diff engine line up. A mutation whose
//! path does not resolve is skipped and reported; the rest of the list
//! still applies.
//!
//! Ownership markers are written on [`CommitMode::Render`] commits only.
//! Hydrating commits are additive and never touch markers.

use crate::error::CommitError;
use crate::tree::{BoundListener, OutputId, OutputNodeKind, OutputTree};
use std::collections::BTreeSet;
use trellis_core::description::{HandlerRef, Props, TEXT_KEY, event_name, is_attribute_key};
use trellis_core::ids::NodeId;
use trellis_core::markers::{NODE_MARKER, listener_marker};
use trellis_core::mutation::{Mutation, OutputKind, Path};

/// How a commit treats the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
	/// Regular commit: writes ownership markers.
	Render,
	/// Adoption of server-rendered markup: additive, no markers.
	Hydrate,
}

/// Result of applying one mutation list.
#[derive(Debug, Default)]
pub struct CommitOutcome {
	pub applied: usize,
	pub skipped: Vec<CommitError>,
	/// Event types that received an ownership marker.
	pub marked_events: BTreeSet<String>,
}

/// Differences between two prop maps, split the way they are applied.
#[derive(Debug, Default, PartialEq)]
pub struct PropDiff {
	pub attributes_removed: Vec<String>,
	pub attributes_set: Vec<(String, String)>,
	/// Event types whose binding was removed or changed.
	pub events_removed: Vec<String>,
	/// Event types newly bound or rebound.
	pub events_added: Vec<(String, HandlerRef)>,
}

impl PropDiff {
	pub fn is_empty(&self) -> bool {
		self.attributes_removed.is_empty()
			&& self.attributes_set.is_empty()
			&& self.events_removed.is_empty()
			&& self.events_added.is_empty()
	}
}

fn attribute_value(props: &Props, key: &str) -> Option<String> {
	props.get(key).and_then(|value| value.to_attr_value())
}

fn handler_for<'a>(props: &'a Props, key: &str) -> Option<&'a HandlerRef> {
	props.get(key).and_then(|value| value.as_handler())
}

/// Computes the four change sets between `previous` and `next`.
///
/// On a text node `text` holds the content and is not an attribute; on an
/// element it is an ordinary attribute.
pub fn diff_props(previous: &Props, next: &Props, text_node: bool) -> PropDiff {
	let mut diff = PropDiff::default();
	for key in previous.keys() {
		if text_node && key == TEXT_KEY {
			continue;
		}
		if let Some(event) = event_name(key) {
			if handler_for(previous, key).is_some() && handler_for(previous, key) != handler_for(next, key) {
				diff.events_removed.push(event);
			}
		} else if is_attribute_key(key)
			&& attribute_value(previous, key).is_some()
			&& attribute_value(next, key).is_none()
		{
			diff.attributes_removed.push(key.clone());
		}
	}
	for key in next.keys() {
		if text_node && key == TEXT_KEY {
			continue;
		}
		if let Some(event) = event_name(key) {
			if let Some(handler) = handler_for(next, key)
				&& handler_for(previous, key) != Some(handler)
			{
				diff.events_added.push((event, handler.clone()));
			}
		} else if is_attribute_key(key)
			&& let Some(value) = attribute_value(next, key)
			&& attribute_value(previous, key).as_ref() != Some(&value)
		{
			diff.attributes_set.push((key.clone(), value));
		}
	}
	diff
}

/// Applies `mutations` in order.
pub fn apply(tree: &mut OutputTree, mutations: &[Mutation], mode: CommitMode) -> CommitOutcome {
	let mut outcome = CommitOutcome::default();
	for mutation in mutations {
		match apply_mutation(tree, mutation, mode, &mut outcome.marked_events) {
			Ok(()) => outcome.applied += 1,
			Err(err) => {
				tracing::warn!(mutation = %mutation, error = %err, "skipping mutation");
				outcome.skipped.push(err);
			}
		}
	}
	outcome
}

/// Applies a single mutation.
pub fn apply_mutation(
	tree: &mut OutputTree,
	mutation: &Mutation,
	mode: CommitMode,
	marked_events: &mut BTreeSet<String>,
) -> Result<(), CommitError> {
	let op = mutation.op();
	let unresolved = |path: &Path| CommitError::UnresolvedPath {
		op,
		path: path.clone(),
	};
	match mutation {
		Mutation::Insert {
			parent_path,
			target_path,
			node,
			output,
			props,
		} => {
			let parent = tree.resolve(parent_path).ok_or_else(|| unresolved(parent_path))?;
			let index = target_path.last().ok_or_else(|| unresolved(target_path))?;
			let child = match output {
				OutputKind::Element(tag) => tree.create_element(tag.clone()),
				OutputKind::Text => {
					let text = props.get(TEXT_KEY).and_then(|v| v.to_attr_value()).unwrap_or_default();
					tree.create_text(text)
				}
			};
			if !tree.insert_child(parent, index, child) {
				return Err(unresolved(target_path));
			}
			tree.set_owner(child, *node);
			let diff = diff_props(&Props::new(), props, *output == OutputKind::Text);
			apply_diff(tree, child, *node, &diff, mode, marked_events);
			Ok(())
		}
		Mutation::Update {
			target_path,
			node,
			props,
			previous_props,
			..
		} => {
			let target = tree.resolve(target_path).ok_or_else(|| unresolved(target_path))?;
			if target == tree.container() {
				return Err(unresolved(target_path));
			}
			if let Some(text) = props.get(TEXT_KEY).and_then(|v| v.to_attr_value())
				&& previous_props.get(TEXT_KEY) != props.get(TEXT_KEY)
			{
				tree.set_text(target, text);
			}
			tree.set_owner(target, *node);
			let text_node = tree.get(target).is_some_and(|node| node.is_text());
			let diff = diff_props(previous_props, props, text_node);
			apply_diff(tree, target, *node, &diff, mode, marked_events);
			Ok(())
		}
		Mutation::Delete {
			parent_path,
			target_path,
		} => {
			let parent = tree.resolve(parent_path).ok_or_else(|| unresolved(parent_path))?;
			let index = target_path.last().ok_or_else(|| unresolved(target_path))?;
			tree.remove_child(parent, index)
				.map(|_| ())
				.ok_or_else(|| unresolved(target_path))
		}
		Mutation::Hydrate {
			target_path,
			node,
			output,
			props,
			..
		} => {
			let target = tree.resolve(target_path).ok_or_else(|| unresolved(target_path))?;
			check_structure(tree, target, target_path, output)?;
			tree.set_owner(target, *node);
			let additive = diff_props(&Props::new(), props, *output == OutputKind::Text);
			apply_diff(tree, target, *node, &additive, CommitMode::Hydrate, marked_events);
			Ok(())
		}
		Mutation::Move {
			parent_path,
			from,
			to,
		} => {
			let parent = tree.resolve(parent_path).ok_or_else(|| unresolved(parent_path))?;
			if tree.move_child(parent, *from, *to) {
				Ok(())
			} else {
				Err(unresolved(&parent_path.child(*from)))
			}
		}
	}
}

fn check_structure(
	tree: &OutputTree,
	target: OutputId,
	path: &Path,
	expected: &OutputKind,
) -> Result<(), CommitError> {
	let found = tree.get(target).map(|node| node.kind().clone());
	let matches = match (expected, &found) {
		(OutputKind::Element(tag), Some(OutputNodeKind::Element(found))) => tag.eq_ignore_ascii_case(found),
		(OutputKind::Text, Some(OutputNodeKind::Text(_))) => true,
		_ => false,
	};
	if matches {
		return Ok(());
	}
	let describe = |kind: Option<&OutputNodeKind>| match kind {
		Some(OutputNodeKind::Element(tag)) => format!("<{}>", tag),
		Some(OutputNodeKind::Text(_)) => "text".to_string(),
		Some(OutputNodeKind::Container) => "container".to_string(),
		None => "nothing".to_string(),
	};
	let expected = match expected {
		OutputKind::Element(tag) => format!("<{}>", tag),
		OutputKind::Text => "text".to_string(),
	};
	Err(CommitError::StructureMismatch {
		path: path.clone(),
		expected,
		found: describe(found.as_ref()),
	})
}

/// Applies a prop diff to an output node. Hydrating applications only add.
fn apply_diff(
	tree: &mut OutputTree,
	target: OutputId,
	owner: NodeId,
	diff: &PropDiff,
	mode: CommitMode,
	marked_events: &mut BTreeSet<String>,
) {
	let is_text = tree.get(target).is_some_and(|node| node.is_text());
	let markers = mode == CommitMode::Render && !is_text;
	if mode == CommitMode::Render {
		for name in &diff.attributes_removed {
			tree.remove_attribute(target, name);
		}
		for event in &diff.events_removed {
			tree.unbind_listener(target, event);
			tree.remove_attribute(target, &listener_marker(event));
		}
	}
	for (name, value) in &diff.attributes_set {
		tree.set_attribute(target, name.clone(), value.clone());
	}
	for (event, handler) in &diff.events_added {
		tree.bind_listener(
			target,
			event.clone(),
			BoundListener {
				handler: handler.clone(),
				owner,
			},
		);
		if markers {
			tree.set_attribute(target, listener_marker(event), owner.to_string());
			marked_events.insert(event.clone());
		}
	}
	if markers {
		tree.set_attribute(target, NODE_MARKER, owner.to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use trellis_core::description::{PropValue, event_key};
	use trellis_core::mutation::MutationOp;

	fn props(entries: &[(&str, PropValue)]) -> Props {
		entries
			.iter()
			.map(|(key, value)| (key.to_string(), value.clone()))
			.collect()
	}

	fn handler(name: &str) -> PropValue {
		PropValue::Handler(HandlerRef::new(name))
	}

	fn insert(path: &[usize], node: u64, output: OutputKind, props: Props) -> Mutation {
		let target_path = Path(path.to_vec());
		Mutation::Insert {
			parent_path: target_path.parent().unwrap_or_default(),
			target_path,
			node: NodeId(node),
			output,
			props,
		}
	}

	#[rstest]
	fn test_diff_props_splits_four_sets() {
		// Arrange
		let previous = props(&[
			("class", "a".into()),
			("title", "t".into()),
			(event_key("click").as_str(), handler("old")),
			(event_key("focus").as_str(), handler("keep")),
		]);
		let next = props(&[
			("class", "b".into()),
			(event_key("click").as_str(), handler("new")),
			(event_key("focus").as_str(), handler("keep")),
			(event_key("input").as_str(), handler("typed")),
		]);

		// Act
		let diff = diff_props(&previous, &next, false);

		// Assert
		assert_eq!(diff.attributes_removed, vec!["title".to_string()]);
		assert_eq!(diff.attributes_set, vec![("class".to_string(), "b".to_string())]);
		assert_eq!(diff.events_removed, vec!["click".to_string()]);
		assert_eq!(
			diff.events_added,
			vec![
				("click".to_string(), HandlerRef::new("new")),
				("input".to_string(), HandlerRef::new("typed")),
			]
		);
	}

	#[rstest]
	fn test_false_flag_removes_attribute() {
		let previous = props(&[("disabled", true.into())]);
		let next = props(&[("disabled", false.into())]);
		assert_eq!(diff_props(&previous, &next, false).attributes_removed, vec!["disabled".to_string()]);
	}

	#[rstest]
	fn test_text_prop_is_an_attribute_on_elements() {
		// Arrange
		let mut tree = OutputTree::new();
		let ops = vec![
			insert(
				&[0],
				0,
				OutputKind::Element("abbr".into()),
				props(&[(TEXT_KEY, "full title".into())]),
			),
			insert(&[0, 0], 1, OutputKind::Text, props(&[(TEXT_KEY, "ft".into())])),
		];
		apply(&mut tree, &ops, CommitMode::Render);
		let update = Mutation::Update {
			parent_path: Path::root(),
			target_path: Path(vec![0]),
			node: NodeId(0),
			props: Props::new(),
			previous_props: props(&[(TEXT_KEY, "full title".into())]),
		};

		// Act
		let inserted = tree.to_html_stripped();
		let outcome = apply(&mut tree, &[update], CommitMode::Render);

		// Assert
		assert_eq!(inserted, "<abbr text=\"full title\">ft</abbr>");
		assert_eq!(outcome.applied, 1);
		assert_eq!(tree.to_html_stripped(), "<abbr>ft</abbr>");
		assert!(diff_props(&props(&[(TEXT_KEY, "a".into())]), &Props::new(), true).is_empty());
	}

	#[rstest]
	fn test_render_commit_writes_markers() {
		// Arrange
		let mut tree = OutputTree::new();
		let ops = vec![
			insert(
				&[0],
				0,
				OutputKind::Element("button".into()),
				props(&[(event_key("click").as_str(), handler("inc"))]),
			),
			insert(&[0, 0], 1, OutputKind::Text, props(&[(TEXT_KEY, "+".into())])),
		];

		// Act
		let outcome = apply(&mut tree, &ops, CommitMode::Render);

		// Assert
		assert_eq!(outcome.applied, 2);
		assert!(outcome.skipped.is_empty());
		assert!(outcome.marked_events.contains("click"));
		assert_eq!(
			tree.to_html(),
			"<button data-tr-node=\"0\" data-tr-on-click=\"0\">+</button>"
		);
		let button = tree.resolve(&Path(vec![0])).unwrap();
		assert_eq!(
			tree.get(button).unwrap().listener("click").unwrap().handler,
			HandlerRef::new("inc")
		);
	}

	#[rstest]
	fn test_unresolved_path_skips_only_that_mutation() {
		// Arrange
		let mut tree = OutputTree::new();
		let ops = vec![
			insert(&[0, 3], 5, OutputKind::Element("p".into()), Props::new()),
			insert(&[0], 0, OutputKind::Element("div".into()), Props::new()),
		];

		// Act
		let outcome = apply(&mut tree, &ops, CommitMode::Render);

		// Assert
		assert_eq!(outcome.applied, 1);
		assert_eq!(outcome.skipped.len(), 1);
		assert!(matches!(
			outcome.skipped[0],
			CommitError::UnresolvedPath { op: MutationOp::Insert, .. }
		));
		assert_eq!(tree.to_html_stripped(), "<div></div>");
	}

	#[rstest]
	fn test_hydrate_is_additive_and_unmarked() {
		// Arrange
		let mut tree = OutputTree::new();
		let button = tree.append_element(tree.container(), "button").unwrap();
		tree.set_attribute(button, "data-server", "1");
		let op = Mutation::Hydrate {
			parent_path: Path::root(),
			target_path: Path(vec![0]),
			node: NodeId(0),
			output: OutputKind::Element("button".into()),
			props: props(&[("class", "btn".into()), (event_key("click").as_str(), handler("inc"))]),
		};

		// Act
		let outcome = apply(&mut tree, &[op], CommitMode::Hydrate);

		// Assert
		assert_eq!(outcome.applied, 1);
		assert!(outcome.marked_events.is_empty());
		let node = tree.get(button).unwrap();
		assert_eq!(node.attribute("data-server"), Some("1"));
		assert_eq!(node.attribute("class"), Some("btn"));
		assert_eq!(node.attribute(NODE_MARKER), None);
		assert_eq!(node.owner(), Some(NodeId(0)));
		assert!(node.listener("click").is_some());
	}

	#[rstest]
	fn test_hydrate_reports_structure_mismatch() {
		// Arrange
		let mut tree = OutputTree::new();
		tree.append_element(tree.container(), "span").unwrap();
		let op = Mutation::Hydrate {
			parent_path: Path::root(),
			target_path: Path(vec![0]),
			node: NodeId(0),
			output: OutputKind::Element("button".into()),
			props: Props::new(),
		};

		// Act
		let outcome = apply(&mut tree, &[op], CommitMode::Hydrate);

		// Assert
		assert_eq!(
			outcome.skipped,
			vec![CommitError::StructureMismatch {
				path: Path(vec![0]),
				expected: "<button>".to_string(),
				found: "<span>".to_string(),
			}]
		);
	}

	#[rstest]
	fn test_update_rebinds_changed_listener() {
		// Arrange
		let mut tree = OutputTree::new();
		let initial = props(&[(event_key("click").as_str(), handler("a"))]);
		apply(
			&mut tree,
			&[insert(&[0], 2, OutputKind::Element("button".into()), initial.clone())],
			CommitMode::Render,
		);
		let update = Mutation::Update {
			parent_path: Path::root(),
			target_path: Path(vec![0]),
			node: NodeId(2),
			props: props(&[(event_key("click").as_str(), handler("b"))]),
			previous_props: initial,
		};

		// Act
		apply(&mut tree, &[update], CommitMode::Render);

		// Assert
		let button = tree.resolve(&Path(vec![0])).unwrap();
		let node = tree.get(button).unwrap();
		assert_eq!(node.listener("click").unwrap().handler, HandlerRef::new("b"));
		assert_eq!(node.attribute("data-tr-on-click"), Some("2"));
	}
}
