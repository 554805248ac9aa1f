// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Data` wrapper: nested identities plus identity references.
//!
//! `identification` and `secret_identity` are owned children. `approver` and
//! `reviewers` are references to identities owned elsewhere in the same
//! document; they go through [`attach`] and are rejected across documents.
//!
//! Children of an entry opened from a stream are decoded on first access, so
//! the child getters return `Result`.

use std::any::Any;
use std::fmt::{self, Display};
use std::io::Write;

use protoz_runtime::{
    attach, FormatTree, FrameSink, Lazy, Navigate, NodeRef, Origin, Owned, OwnershipError,
    OwningIndex, Rendered, Result, Stamp, TreeFormatter,
};

use crate::header::DataHeader;
use crate::identity::Identity;

/// Slot used by non-repeated children.
const SINGULAR: usize = 0;

/// Loader for the identity child at `field_id` of the entry stamped `stamp`.
fn identity_at(
    stamp: &Stamp,
    field_id: u32,
) -> impl FnOnce(Option<&Origin>) -> Result<Identity> + '_ {
    move |origin: Option<&Origin>| Identity::load(origin, stamp.child(field_id, SINGULAR))
}

/// One entry of a [`Document`](crate::Document).
#[derive(Debug)]
pub struct Data {
    stamp: Stamp,
    identification: Lazy<Identity>,
    secret_identity: OwningIndex<Lazy<Identity>>,
    approver: Option<NodeRef<Identity>>,
    reviewers: Vec<NodeRef<Identity>>,
}

impl Data {
    /// Field number of `identification`.
    pub const IDENTIFICATION: u32 = 1;
    /// Field number of `secret_identity`.
    pub const SECRET_IDENTITY: u32 = 2;
    /// Field number of `approver`.
    pub const APPROVER: u32 = 3;
    /// Field number of `reviewers`.
    pub const REVIEWERS: u32 = 4;

    /// Standalone entry with its own root.
    pub fn new() -> Self {
        Self::with_stamp(Stamp::new_root())
    }

    pub(crate) fn with_stamp(stamp: Stamp) -> Self {
        Self {
            stamp,
            identification: Lazy::empty(),
            secret_identity: OwningIndex::new(),
            approver: None,
            reviewers: Vec::new(),
        }
    }

    /// The required identity, created unset on first access.
    pub fn identification(&self) -> Result<&Identity> {
        self.identification
            .get_or_load(identity_at(&self.stamp, Self::IDENTIFICATION))
    }

    /// Mutable access to the required identity.
    pub fn identification_mut(&mut self) -> Result<&mut Identity> {
        self.identification
            .get_mut_or_load(identity_at(&self.stamp, Self::IDENTIFICATION))
    }

    /// Create the secret identity in place, or return the existing one.
    pub fn add_secret_identity(&mut self) -> Result<&mut Identity> {
        self.secret_identity
            .get_or_insert_with(SINGULAR, Lazy::empty)
            .get_mut_or_load(identity_at(&self.stamp, Self::SECRET_IDENTITY))
    }

    /// The secret identity, if one was added.
    pub fn secret_identity(&self) -> Result<Option<&Identity>> {
        self.secret_identity
            .get(SINGULAR)
            .map(|slot| slot.get_or_load(identity_at(&self.stamp, Self::SECRET_IDENTITY)))
            .transpose()
    }

    /// Mutable access to the secret identity.
    pub fn secret_identity_mut(&mut self) -> Result<Option<&mut Identity>> {
        let stamp = &self.stamp;
        self.secret_identity
            .get_mut(SINGULAR)
            .map(|slot| slot.get_mut_or_load(identity_at(stamp, Self::SECRET_IDENTITY)))
            .transpose()
    }

    /// Whether a secret identity is present. Does not load it.
    pub fn has_secret_identity(&self) -> bool {
        self.secret_identity.get(SINGULAR).is_some()
    }

    /// Drop the secret identity.
    ///
    /// References to it elsewhere in the document stop resolving.
    pub fn clear_secret_identity(&mut self) {
        self.secret_identity.clear();
    }

    /// Point `approver` at an identity of the same document.
    pub fn set_approver(&mut self, identity: &NodeRef<Identity>) -> Result<(), OwnershipError> {
        let approver = attach(&*self, identity)?;
        self.approver = Some(approver);
        Ok(())
    }

    /// The approver reference, if set.
    pub fn approver(&self) -> Option<&NodeRef<Identity>> {
        self.approver.as_ref()
    }

    /// Whether an approver is set.
    pub fn has_approver(&self) -> bool {
        self.approver.is_some()
    }

    /// Unset the approver.
    pub fn clear_approver(&mut self) {
        self.approver = None;
    }

    /// Append a reviewer reference.
    pub fn add_reviewers(&mut self, identity: &NodeRef<Identity>) -> Result<(), OwnershipError> {
        let reviewer = attach(&*self, identity)?;
        self.reviewers.push(reviewer);
        Ok(())
    }

    /// Remove every reviewer entry naming `identity`. Returns how many were removed.
    pub fn remove_reviewers(&mut self, identity: &NodeRef<Identity>) -> usize {
        let before = self.reviewers.len();
        self.reviewers.retain(|reviewer| reviewer != identity);
        before - self.reviewers.len()
    }

    /// Reviewer reference at `index`.
    pub fn get_reviewers(&self, index: usize) -> Option<&NodeRef<Identity>> {
        self.reviewers.get(index)
    }

    /// Number of reviewer references.
    pub fn reviewers_count(&self) -> usize {
        self.reviewers.len()
    }

    /// All reviewer references in insertion order.
    pub fn reviewers_list(&self) -> &[NodeRef<Identity>] {
        &self.reviewers
    }

    /// Decode every child that has not been read yet.
    pub fn load_all(&mut self) -> Result<()> {
        self.identification_mut()?;
        self.secret_identity_mut()?;
        Ok(())
    }

    pub(crate) fn write_nested<W: Write>(&self, sink: &mut FrameSink<'_, W>) -> Result<u64> {
        let identification = self.identification()?.write_nested(sink)?;
        let secret_identity = self
            .secret_identity()?
            .map(|identity| identity.write_nested(sink))
            .transpose()?;
        let header = DataHeader {
            identification,
            secret_identity,
            approver: self.approver.as_ref().map(NodeRef::descriptor),
            reviewers: self.reviewers.iter().map(NodeRef::descriptor).collect(),
        };
        sink.write_nested(&header)
    }

    /// Decode the entry header at `origin`, or build an empty entry.
    ///
    /// Only the header is read; the identity children stay in the stream
    /// until accessed. Stored references are rebound to `stamp`'s root.
    pub(crate) fn load(origin: Option<&Origin>, stamp: Stamp) -> Result<Self> {
        let Some(origin) = origin else {
            return Ok(Self::with_stamp(stamp));
        };
        let header: DataHeader = origin.read()?;
        let source = origin.source();
        let root = stamp.root_id();
        let mut secret_identity = OwningIndex::new();
        if let Some(position) = header.secret_identity {
            secret_identity.set(SINGULAR, Lazy::stored(source.clone(), position));
        }
        Ok(Self {
            identification: Lazy::stored(source.clone(), header.identification),
            secret_identity,
            approver: header
                .approver
                .as_ref()
                .map(|descriptor| NodeRef::from_descriptor(root, descriptor)),
            reviewers: header
                .reviewers
                .iter()
                .map(|descriptor| NodeRef::from_descriptor(root, descriptor))
                .collect(),
            stamp,
        })
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

fn same_targets(a: &[NodeRef<Identity>], b: &[NodeRef<Identity>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_target(y))
}

impl PartialEq for Data {
    /// Compares decoded contents. A child that fails to load makes the
    /// entries unequal.
    fn eq(&self, other: &Self) -> bool {
        let approvers_match = match (&self.approver, &other.approver) {
            (Some(a), Some(b)) => a.same_target(b),
            (None, None) => true,
            _ => false,
        };
        let children_match = match (
            self.identification(),
            other.identification(),
            self.secret_identity(),
            other.secret_identity(),
        ) {
            (Ok(a), Ok(b), Ok(x), Ok(y)) => a == b && x == y,
            _ => false,
        };
        children_match && approvers_match && same_targets(&self.reviewers, &other.reviewers)
    }
}

impl Owned for Data {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}

impl Navigate for Data {
    fn child(&self, field_id: u32, _index: usize) -> Result<Option<&dyn Navigate>> {
        Ok(match field_id {
            Self::IDENTIFICATION => Some(self.identification()? as &dyn Navigate),
            Self::SECRET_IDENTITY => self
                .secret_identity()?
                .map(|identity| identity as &dyn Navigate),
            _ => None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FormatTree for Data {
    fn format_fields(&self, out: &mut TreeFormatter<'_, '_>) -> fmt::Result {
        out.nested("identification", self.identification().map(Some))?;
        out.nested("secret_identity", self.secret_identity())?;
        if let Some(approver) = &self.approver {
            out.reference("approver", approver.path())?;
        }
        for reviewer in &self.reviewers {
            out.reference("reviewers", reviewer.path())?;
        }
        Ok(())
    }
}

impl Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&Rendered::new("Data", self), f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn children_inherit_root_and_coordinates() {
        let mut data = Data::new();
        let root = data.root_id();
        let secret = data.add_secret_identity().unwrap();

        assert_eq!(secret.root_id(), root);
        assert_eq!(
            secret.stamp().path().as_slice(),
            &[u64::from(Data::SECRET_IDENTITY), 0]
        );
        assert_eq!(
            data.identification().unwrap().stamp().path().as_slice(),
            &[u64::from(Data::IDENTIFICATION), 0]
        );
    }

    #[test]
    fn add_secret_identity_is_idempotent() {
        let mut data = Data::new();
        data.add_secret_identity().unwrap().set_first_name("Batman");
        let again = data.add_secret_identity().unwrap();
        assert_eq!(again.first_name(), "Batman");
    }

    #[test]
    fn secret_identity_lives_in_a_single_slot() {
        let mut data = Data::new();
        assert!(!data.has_secret_identity());
        assert!(data.secret_identity().unwrap().is_none());

        data.add_secret_identity().unwrap();
        assert!(data.has_secret_identity());
        data.clear_secret_identity();
        assert!(!data.has_secret_identity());
        assert!(data.secret_identity_mut().unwrap().is_none());
    }

    #[test]
    fn same_root_references_are_accepted() {
        let mut data = Data::new();
        let me = data.identification().unwrap().node_ref();

        data.set_approver(&me).unwrap();
        data.add_reviewers(&me).unwrap();
        data.add_reviewers(&me).unwrap();

        assert!(data.has_approver());
        assert_eq!(data.reviewers_count(), 2);
        assert_eq!(data.remove_reviewers(&me), 2);
        assert_eq!(data.reviewers_count(), 0);
    }

    #[test]
    fn foreign_references_leave_entry_untouched() {
        let mut data = Data::new();
        let foreign = Identity::new();

        let err = data.set_approver(&foreign.node_ref()).unwrap_err();
        assert_eq!(err.found, foreign.root_id());
        assert!(data.add_reviewers(&foreign.node_ref()).is_err());
        assert!(!data.has_approver());
        assert_eq!(data.reviewers_count(), 0);
    }

    #[test]
    fn secret_identity_is_navigable_by_field() {
        let mut data = Data::new();
        assert!(data.child(Data::SECRET_IDENTITY, 0).unwrap().is_none());
        data.add_secret_identity().unwrap();
        assert!(data.child(Data::SECRET_IDENTITY, 0).unwrap().is_some());
        assert!(data.child(Data::APPROVER, 0).unwrap().is_none());
    }

    #[test]
    fn display_nests_children_and_prints_references() {
        let mut data = Data::new();
        data.identification_mut().unwrap().set_first_name("Bruce");
        let me = data.identification().unwrap().node_ref();
        data.set_approver(&me).unwrap();

        assert_eq!(
            data.to_string(),
            "Data {\n  identification {\n    first_name: \"Bruce\"\n  }\n  approver: -> /1:0\n}\n"
        );
    }
}
