// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Root identity stamps and the cross-root attach check.
//!
//! Every wrapper node is stamped at construction with a [`Stamp`]: the
//! [`RootId`] of the aggregate that owns it plus the node's [`Coordinates`]
//! inside that aggregate. Stamps never change afterwards.
//!
//! Children built in place inherit the parent's root and always succeed.
//! Nodes attached *by reference* go through [`attach`], which refuses a node
//! stamped with a different root. A reference is stored as a [`NodeRef`]
//! (root + coordinates), never as a second owner, so the owning tree stays a
//! strict tree.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::OwnershipError;

static NEXT_ROOT: AtomicU64 = AtomicU64::new(1);

/// Opaque identity shared by every node of one root aggregate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RootId(u64);

impl RootId {
    /// Mint a process-unique identity.
    pub fn mint() -> Self {
        Self(NEXT_ROOT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value (diagnostics only).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// Wire form of a node address: root-first `(field_id, index)` pairs.
#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct LocalMessageDescriptor {
    /// Flattened `(field_id, index)` pairs.
    #[prost(uint64, repeated, tag = "1")]
    pub coordinate: Vec<u64>,
}

/// Path of a node inside its root aggregate.
///
/// Stored as flattened `(field_id, index)` pairs, root first. Non-repeated
/// fields use index `0`. The root has the empty path. Entries are 64 bits
/// wide so every `usize` index is stored without loss.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coordinates(Vec<u64>);

impl Coordinates {
    /// Path of a root node.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the child at `(field_id, index)` below `self`.
    pub fn child(&self, field_id: u32, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 2);
        path.extend_from_slice(&self.0);
        path.push(u64::from(field_id));
        path.push(index as u64);
        Self(path)
    }

    /// `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `(field_id, index)` steps.
    pub fn depth(&self) -> usize {
        self.0.len() / 2
    }

    /// Raw `(field_id, index)` steps from the root down to the node.
    ///
    /// A dangling odd coordinate is ignored.
    pub fn steps(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.0.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Flattened coordinates.
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for (field_id, index) in self.steps() {
            write!(f, "/{field_id}:{index}")?;
        }
        Ok(())
    }
}

impl From<&LocalMessageDescriptor> for Coordinates {
    fn from(descriptor: &LocalMessageDescriptor) -> Self {
        Self(descriptor.coordinate.clone())
    }
}

impl From<&Coordinates> for LocalMessageDescriptor {
    fn from(path: &Coordinates) -> Self {
        Self {
            coordinate: path.0.clone(),
        }
    }
}

/// Construction-time identity of a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stamp {
    root: RootId,
    path: Coordinates,
}

impl Stamp {
    /// Stamp for a new root aggregate (or a standalone node).
    pub fn new_root() -> Self {
        Self {
            root: RootId::mint(),
            path: Coordinates::root(),
        }
    }

    /// Stamp for a child built in place at `(field_id, index)` below `self`.
    pub fn child(&self, field_id: u32, index: usize) -> Self {
        Self {
            root: self.root,
            path: self.path.child(field_id, index),
        }
    }

    /// Owning root.
    pub fn root_id(&self) -> RootId {
        self.root
    }

    /// Position inside the owning root.
    pub fn path(&self) -> &Coordinates {
        &self.path
    }
}

/// Implemented by every wrapper node.
pub trait Owned {
    /// The stamp assigned at construction.
    fn stamp(&self) -> &Stamp;

    /// Owning root.
    fn root_id(&self) -> RootId {
        self.stamp().root_id()
    }

    /// Non-owning handle to this node, suitable for reference fields.
    fn node_ref(&self) -> NodeRef<Self>
    where
        Self: Sized,
    {
        NodeRef::new(self.root_id(), self.stamp().path().clone())
    }
}

/// Typed, non-owning handle to a node: its root plus its coordinates.
pub struct NodeRef<T> {
    root: RootId,
    path: Coordinates,
    _target: PhantomData<fn() -> T>,
}

impl<T> NodeRef<T> {
    /// Handle to the node at `path` inside `root`.
    pub fn new(root: RootId, path: Coordinates) -> Self {
        Self {
            root,
            path,
            _target: PhantomData,
        }
    }

    /// Rebuild a handle from its wire form, bound to `root`.
    pub fn from_descriptor(root: RootId, descriptor: &LocalMessageDescriptor) -> Self {
        Self::new(root, Coordinates::from(descriptor))
    }

    /// Wire form of this handle.
    pub fn descriptor(&self) -> LocalMessageDescriptor {
        LocalMessageDescriptor::from(&self.path)
    }

    /// Root the target belongs to.
    pub fn root_id(&self) -> RootId {
        self.root
    }

    /// Coordinates of the target.
    pub fn path(&self) -> &Coordinates {
        &self.path
    }

    /// `true` when both handles name the same position, whatever their roots.
    pub fn same_target(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self::new(self.root, self.path.clone())
    }
}

impl<T> PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.path == other.path
    }
}

impl<T> Eq for NodeRef<T> {}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("root", &self.root)
            .field("path", &self.path.as_slice())
            .finish()
    }
}

/// Fail unless `found` equals `expected`.
pub fn ensure_same_root(expected: RootId, found: RootId) -> Result<(), OwnershipError> {
    if expected == found {
        return Ok(());
    }
    debug!(%expected, %found, "attach rejected across roots");
    Err(OwnershipError { expected, found })
}

/// Validate that `child` may be referenced from `parent`.
///
/// On success returns the handle to store in the parent's field. On failure
/// nothing is stored and the caller's tree is untouched.
pub fn attach<P, T>(parent: &P, child: &NodeRef<T>) -> Result<NodeRef<T>, OwnershipError>
where
    P: Owned + ?Sized,
{
    ensure_same_root(parent.root_id(), child.root_id())?;
    Ok(child.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Leaf {
        stamp: Stamp,
    }

    impl Owned for Leaf {
        fn stamp(&self) -> &Stamp {
            &self.stamp
        }
    }

    #[test]
    fn minted_roots_are_unique() {
        let a = RootId::mint();
        let b = RootId::mint();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("root#"));
    }

    #[test]
    fn child_stamp_inherits_root_and_extends_path() {
        let root = Stamp::new_root();
        let child = root.child(1, 2).child(2, 0);

        assert_eq!(child.root_id(), root.root_id());
        assert_eq!(child.path().as_slice(), &[1, 2, 2, 0]);
        assert_eq!(child.path().depth(), 2);
        assert_eq!(child.path().steps().collect::<Vec<_>>(), vec![(1, 2), (2, 0)]);
    }

    #[test]
    fn attach_same_root_succeeds() {
        let root = Stamp::new_root();
        let parent = Leaf {
            stamp: root.child(1, 0),
        };
        let target = Leaf {
            stamp: root.child(1, 1),
        };

        let stored = attach(&parent, &target.node_ref()).unwrap();
        assert_eq!(stored, target.node_ref());
    }

    #[test]
    fn attach_across_roots_fails() {
        let parent = Leaf {
            stamp: Stamp::new_root().child(1, 0),
        };
        let foreign = Leaf {
            stamp: Stamp::new_root().child(1, 0),
        };

        let err = attach(&parent, &foreign.node_ref()).unwrap_err();
        assert_eq!(err.expected, parent.root_id());
        assert_eq!(err.found, foreign.root_id());
    }

    #[test]
    fn descriptor_round_trips_coordinates() {
        let path = Coordinates::root().child(1, 7).child(4, 3);
        let handle: NodeRef<Leaf> = NodeRef::new(RootId::mint(), path.clone());
        let rebound: NodeRef<Leaf> = NodeRef::from_descriptor(RootId::mint(), &handle.descriptor());

        assert_eq!(rebound.path(), &path);
        assert!(rebound.same_target(&handle));
        assert_ne!(rebound, handle);
    }

    #[test]
    fn large_indices_keep_distinct_paths() {
        let past_u32 = u32::MAX as usize + 1;
        let a = Coordinates::root().child(1, u32::MAX as usize);
        let b = Coordinates::root().child(1, past_u32);

        assert_ne!(a, b);
        assert_eq!(b.as_slice(), &[1, u64::from(u32::MAX) + 1]);
        let rebound = Coordinates::from(&LocalMessageDescriptor::from(&b));
        assert_eq!(rebound, b);
    }

    #[test]
    fn coordinates_display_as_steps() {
        assert_eq!(Coordinates::root().to_string(), "/");
        assert_eq!(Coordinates::root().child(1, 2).child(2, 0).to_string(), "/1:2/2:0");
    }

    #[test]
    fn odd_descriptor_tail_is_ignored() {
        let descriptor = LocalMessageDescriptor {
            coordinate: vec![1, 0, 2],
        };
        let path = Coordinates::from(&descriptor);
        assert_eq!(path.steps().collect::<Vec<_>>(), vec![(1, 0)]);
    }
}
