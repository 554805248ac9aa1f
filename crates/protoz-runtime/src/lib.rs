// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime support for protoz builder wrappers.
//!
//! Generated wrapper types (one per schema message) sit on top of three pieces:
//!
//! - [`OwningIndex`]: a sparse, slot-addressed container that owns at most one
//!   child per slot. Wrappers keep their repeated and optional children here.
//! - [`FrameCodec`]: length-delimited framing of a single [`prost::Message`].
//!   Root frames carry a 4-byte little-endian trailer so the most recent root
//!   can be located by seeking from the end of the stream.
//! - The [`ownership`] module: every node is stamped with the [`RootId`] of
//!   the aggregate that built it, and attaching a node by reference is rejected
//!   unless both sides share that root.
//! - [`Lazy`]: a child slot that is decoded from its [`ContentSource`] the
//!   first time it is accessed, so opening a stream only reads the root frame.
//! - [`TreeFormatter`]: indented text rendering behind the wrappers' `Display`.
//!
//! # Stream layout
//!
//! ```text
//! frame   := varint(len) || payload[len] || (root only) u32_le(len)
//! stream  := nested-frame* || root-frame
//! ```
//!
//! Nested frames are written children-first; a parent header records the
//! absolute stream position of each child frame. The root header is always the
//! tail of the stream.
//!
//! # Concurrency
//!
//! Everything here is synchronous and unsynchronised. A tree must be built and
//! persisted from one thread at a time. Wrappers hold their source stream
//! through an `Rc`, so trees are not `Send`.
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod lazy;
pub mod navigate;
pub mod ownership;
pub mod slots;

pub use config::{CodecConfig, ConfigError};
pub use error::{Error, ErrorKind, MalformedFrame, OwnershipError};
pub use format::{FormatTree, Rendered, TreeFormatter};
pub use frame::{FrameCodec, FrameKind, FrameSink, MIN_ROOT_FRAME_LEN, TRAILER_LEN};
pub use lazy::{ContentSource, Lazy, Origin, ReadSeek};
pub use navigate::{resolve, Navigate};
pub use ownership::{
    attach, ensure_same_root, Coordinates, LocalMessageDescriptor, NodeRef, Owned, RootId, Stamp,
};
pub use slots::OwningIndex;

/// Convenience result alias used throughout the runtime.
pub type Result<T, E = Error> = std::result::Result<T, E>;
