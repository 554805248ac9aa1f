// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Builder wrappers for the `FileStructure` schema.
//!
//! ```text
//! message Identity { optional string firstName = 1; optional int32 birthYear = 2; }
//! message Data {
//!   required Identity identification = 1;
//!   optional Identity secretIdentity = 2;
//!   optional ref Identity approver = 3;
//!   repeated ref Identity reviewers = 4;
//! }
//! root message Document { repeated Data data = 1; }
//! ```
//!
//! Each message gets a wrapper that owns its nested children, keeps its scalar
//! fields in the on-wire header type, and stores reference fields as
//! [`NodeRef`](protoz_runtime::NodeRef)s validated against the document's root.
//! Nested children of a document opened with [`Document::open`] are decoded on
//! first access, which is why their getters return `Result`. Every wrapper
//! implements `Display` as an indented dump of its set fields.
//!
//! ```rust
//! use protoz_filestructure::Document;
//! use protoz_runtime::{FrameCodec, Owned};
//!
//! # fn main() -> protoz_runtime::Result<()> {
//! let codec = FrameCodec::default();
//! let mut doc = Document::new();
//! let entry = doc.add_data();
//! entry.identification_mut()?.set_first_name("Babbage");
//! let me = entry.identification()?.node_ref();
//! entry.set_approver(&me)?;
//!
//! let bytes = doc.write_to_bytes(&codec)?;
//! let back = Document::open(std::io::Cursor::new(bytes), &codec)?;
//! assert!(!back.is_data_loaded(0));
//! assert_eq!(back, doc);
//! assert!(back.to_string().contains("first_name: \"Babbage\""));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod data;
mod document;
pub mod header;
mod identity;

pub use data::Data;
pub use document::Document;
pub use identity::Identity;
