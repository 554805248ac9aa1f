// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resolve a stored [`NodeRef`] back to the node it names.

use std::any::Any;

use crate::ownership::{ensure_same_root, NodeRef, Owned};
use crate::Result;

/// Child lookup by schema coordinates.
///
/// Wrappers implement one arm per nested field. Reference fields are not
/// navigable; a reference always points at a node owned somewhere else.
pub trait Navigate: Any {
    /// Child owned at `(field_id, index)`, if present.
    ///
    /// A child that has not been decoded yet is loaded first, so the lookup
    /// can fail with a read or decode error.
    fn child(&self, field_id: u32, index: usize) -> Result<Option<&dyn Navigate>>;

    /// Upcast for the final downcast in [`resolve`].
    fn as_any(&self) -> &dyn Any;
}

/// Walk `target`'s coordinates from `root`.
///
/// Returns `Ok(None)` when the path no longer names a node of type `T`
/// (slot emptied, out-of-range coordinates, or a type mismatch). A handle
/// minted under another root is an
/// [`OwnershipError`](crate::error::OwnershipError).
pub fn resolve<'a, R, T>(root: &'a R, target: &NodeRef<T>) -> Result<Option<&'a T>>
where
    R: Navigate + Owned,
    T: Navigate,
{
    ensure_same_root(root.root_id(), target.root_id())?;
    let mut node: &dyn Navigate = root;
    for (field_id, index) in target.path().steps() {
        let (Ok(field_id), Ok(index)) = (u32::try_from(field_id), usize::try_from(index)) else {
            return Ok(None);
        };
        match node.child(field_id, index)? {
            Some(next) => node = next,
            None => return Ok(None),
        }
    }
    Ok(node.as_any().downcast_ref::<T>())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ownership::Stamp;
    use crate::slots::OwningIndex;

    struct Tree {
        stamp: Stamp,
        leaves: OwningIndex<Leaf>,
    }

    struct Leaf {
        stamp: Stamp,
        label: &'static str,
    }

    impl Owned for Tree {
        fn stamp(&self) -> &Stamp {
            &self.stamp
        }
    }

    impl Owned for Leaf {
        fn stamp(&self) -> &Stamp {
            &self.stamp
        }
    }

    impl Navigate for Tree {
        fn child(&self, field_id: u32, index: usize) -> Result<Option<&dyn Navigate>> {
            Ok(match field_id {
                1 => self.leaves.get(index).map(|leaf| leaf as &dyn Navigate),
                _ => None,
            })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Navigate for Leaf {
        fn child(&self, _field_id: u32, _index: usize) -> Result<Option<&dyn Navigate>> {
            Ok(None)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn tree(labels: &[&'static str]) -> Tree {
        let stamp = Stamp::new_root();
        let mut leaves = OwningIndex::new();
        for (index, label) in labels.iter().enumerate() {
            leaves.set(
                index,
                Leaf {
                    stamp: stamp.child(1, index),
                    label: *label,
                },
            );
        }
        Tree { stamp, leaves }
    }

    #[test]
    fn resolves_owned_leaf() {
        let tree = tree(&["a", "b"]);
        let handle = tree.leaves.get(1).unwrap().node_ref();

        let leaf = resolve(&tree, &handle).unwrap().unwrap();
        assert_eq!(leaf.label, "b");
    }

    #[test]
    fn dangling_path_resolves_to_none() {
        let mut tree = tree(&["a", "b"]);
        let handle = tree.leaves.get(1).unwrap().node_ref();
        drop(tree.leaves.take(1));

        assert!(resolve(&tree, &handle).unwrap().is_none());
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let mine = tree(&["a"]);
        let theirs = tree(&["a"]);
        let handle = theirs.leaves.get(0).unwrap().node_ref();

        assert!(resolve(&mine, &handle).is_err());
    }

    #[test]
    fn oversized_field_id_resolves_to_none() {
        let tree = tree(&["a"]);
        let descriptor = crate::ownership::LocalMessageDescriptor {
            coordinate: vec![u64::from(u32::MAX) + 2, 0],
        };
        let handle: NodeRef<Leaf> = NodeRef::from_descriptor(tree.root_id(), &descriptor);

        assert!(resolve(&tree, &handle).unwrap().is_none());
    }

    #[test]
    fn wrong_type_resolves_to_none() {
        let tree = tree(&["a"]);
        let handle: NodeRef<Leaf> = NodeRef::new(tree.root_id(), tree.stamp().path().clone());

        assert!(resolve(&tree, &handle).unwrap().is_none());
    }
}
