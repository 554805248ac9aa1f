// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! On-wire headers for the FileStructure messages.
//!
//! Nested children are stored as the absolute stream position of their own
//! frame. Reference fields are stored as a [`LocalMessageDescriptor`].

use protoz_runtime::LocalMessageDescriptor;

/// Header of an [`Identity`](crate::Identity).
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct IdentityHeader {
    /// Given name.
    #[prost(string, optional, tag = "1")]
    pub first_name: Option<String>,
    /// Year of birth.
    #[prost(int32, optional, tag = "2")]
    pub birth_year: Option<i32>,
}

/// Header of a [`Data`](crate::Data) entry.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DataHeader {
    /// Frame position of the required `identification` child.
    #[prost(uint64, tag = "1")]
    pub identification: u64,
    /// Frame position of the optional `secret_identity` child.
    #[prost(uint64, optional, tag = "2")]
    pub secret_identity: Option<u64>,
    /// Reference to the approving identity.
    #[prost(message, optional, tag = "3")]
    pub approver: Option<LocalMessageDescriptor>,
    /// References to reviewing identities.
    #[prost(message, repeated, tag = "4")]
    pub reviewers: Vec<LocalMessageDescriptor>,
}

/// Header of the root [`Document`](crate::Document).
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DocumentHeader {
    /// Frame positions of the `data` entries, in slot order.
    #[prost(uint64, repeated, tag = "1")]
    pub data: Vec<u64>,
}
