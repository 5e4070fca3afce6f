//! Property tests for the diff engine.

use proptest::prelude::*;
use std::sync::Arc;
use trellis_core::description::Description;
use trellis_core::mutation::{Mutation, MutationOp};
use trellis_reconciler::{ComponentRegistry, MutationKind, Reconciler};

fn arb_description() -> impl Strategy<Value = Description> {
	let leaf = prop_oneof![
		"[a-c]{1,2}".prop_map(|content| Description::text(content)),
		prop::sample::select(vec!["div", "p", "span"]).prop_map(|tag| Description::element(tag)),
	];
	leaf.prop_recursive(3, 24, 4, |inner| {
		(
			prop::sample::select(vec!["div", "p", "ul"]),
			prop::option::of(prop::sample::select(vec!["x", "y"])),
			prop::collection::vec(inner, 0..4),
		)
			.prop_map(|(tag, class, children)| {
				let element = Description::element(tag).children(children);
				match class {
					Some(class) => element.prop("class", class),
					None => element,
				}
			})
	})
}

fn reconciler() -> Reconciler {
	Reconciler::new(Arc::new(ComponentRegistry::new()))
}

proptest! {
	#[test]
	fn identical_trees_produce_no_mutations(tree in arb_description()) {
		let mut reconciler = reconciler();
		reconciler.reconcile(&tree);

		let mutations = reconciler.reconcile(&tree.clone());

		prop_assert!(mutations.is_empty(), "unexpected mutations: {:?}", mutations);
	}

	#[test]
	fn parent_mutations_precede_child_inserts(first in arb_description(), second in arb_description()) {
		let mut reconciler = reconciler();
		reconciler.reconcile(&first);

		let mutations = reconciler.reconcile(&second);

		for (position, mutation) in mutations.iter().enumerate() {
			let Mutation::Insert { parent_path, .. } = mutation else {
				continue;
			};
			if parent_path.depth() == 0 {
				continue;
			}
			let later_parent = mutations[position + 1..].iter().any(|other| {
				matches!(other.op(), MutationOp::Insert | MutationOp::Update)
					&& &other.target_path() == parent_path
			});
			prop_assert!(!later_parent, "parent of {} mutated after it", mutation);
		}
	}

	#[test]
	fn mutation_kinds_are_cleared_after_every_pass(first in arb_description(), second in arb_description()) {
		let mut reconciler = reconciler();
		reconciler.reconcile(&first);
		reconciler.reconcile(&second);

		if let Some(root) = reconciler.root() {
			for id in reconciler.arena().subtree(root) {
				prop_assert_eq!(reconciler.node(id).unwrap().mutation_kind(), MutationKind::None);
			}
		}
	}
}
