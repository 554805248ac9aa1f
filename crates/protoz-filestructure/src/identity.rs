// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Identity` wrapper (scalar fields only).

use std::any::Any;
use std::fmt::{self, Debug, Display};
use std::io::Write;

use protoz_runtime::{
    FormatTree, FrameSink, Navigate, Origin, Owned, Rendered, Result, Stamp, TreeFormatter,
};

use crate::header::IdentityHeader;

/// A person: first name and optional birth year.
#[derive(Debug)]
pub struct Identity {
    stamp: Stamp,
    header: IdentityHeader,
}

impl Identity {
    /// Field number of `first_name`.
    pub const FIRST_NAME: u32 = 1;
    /// Field number of `birth_year`.
    pub const BIRTH_YEAR: u32 = 2;

    /// Standalone identity with its own root.
    ///
    /// A standalone identity cannot be referenced from a document; only
    /// identities created inside that document can.
    pub fn new() -> Self {
        Self::with_stamp(Stamp::new_root())
    }

    pub(crate) fn with_stamp(stamp: Stamp) -> Self {
        Self {
            stamp,
            header: IdentityHeader::default(),
        }
    }

    /// Given name, or `""` when unset.
    pub fn first_name(&self) -> &str {
        self.header.first_name.as_deref().unwrap_or_default()
    }

    /// Set the given name.
    pub fn set_first_name(&mut self, value: impl Into<String>) {
        self.header.first_name = Some(value.into());
    }

    /// Whether a given name is set.
    pub fn has_first_name(&self) -> bool {
        self.header.first_name.is_some()
    }

    /// Unset the given name.
    pub fn clear_first_name(&mut self) {
        self.header.first_name = None;
    }

    /// Birth year, or `0` when unset.
    pub fn birth_year(&self) -> i32 {
        self.header.birth_year.unwrap_or_default()
    }

    /// Set the birth year.
    pub fn set_birth_year(&mut self, value: i32) {
        self.header.birth_year = Some(value);
    }

    /// Whether a birth year is set.
    pub fn has_birth_year(&self) -> bool {
        self.header.birth_year.is_some()
    }

    /// Unset the birth year.
    pub fn clear_birth_year(&mut self) {
        self.header.birth_year = None;
    }

    pub(crate) fn write_nested<W: Write>(&self, sink: &mut FrameSink<'_, W>) -> Result<u64> {
        sink.write_nested(&self.header)
    }

    /// Decode the identity stored at `origin`, or build an unset one.
    pub(crate) fn load(origin: Option<&Origin>, stamp: Stamp) -> Result<Self> {
        match origin {
            Some(origin) => Ok(Self {
                stamp,
                header: origin.read()?,
            }),
            None => Ok(Self::with_stamp(stamp)),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
    }
}

impl Owned for Identity {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}

impl Navigate for Identity {
    fn child(&self, _field_id: u32, _index: usize) -> Result<Option<&dyn Navigate>> {
        Ok(None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FormatTree for Identity {
    fn format_fields(&self, out: &mut TreeFormatter<'_, '_>) -> fmt::Result {
        out.scalar("first_name", self.header.first_name.as_ref().map(|v| v as &dyn Debug))?;
        out.scalar("birth_year", self.header.birth_year.as_ref().map(|v| v as &dyn Debug))
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&Rendered::new("Identity", self), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_report_defaults() {
        let identity = Identity::new();
        assert_eq!(identity.first_name(), "");
        assert_eq!(identity.birth_year(), 0);
        assert!(!identity.has_first_name());
        assert!(!identity.has_birth_year());
    }

    #[test]
    fn set_and_clear_scalars() {
        let mut identity = Identity::new();
        identity.set_first_name("Babbage");
        identity.set_birth_year(1791);
        assert!(identity.has_birth_year());
        assert_eq!(identity.first_name(), "Babbage");

        identity.clear_birth_year();
        assert!(!identity.has_birth_year());
        assert!(identity.has_first_name());
    }

    #[test]
    fn display_lists_set_fields_only() {
        let mut identity = Identity::new();
        assert_eq!(identity.to_string(), "Identity {\n}\n");

        identity.set_birth_year(1989);
        assert_eq!(identity.to_string(), "Identity {\n  birth_year: 1989\n}\n");
    }

    #[test]
    fn equality_ignores_stamp() {
        let mut a = Identity::new();
        let mut b = Identity::new();
        a.set_first_name("Bruce");
        b.set_first_name("Bruce");
        assert_ne!(a.root_id(), b.root_id());
        assert_eq!(a, b);
    }
}
