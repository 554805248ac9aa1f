// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types shared by the codec and the ownership checks.
//!
//! Every failure is reported to the immediate caller; nothing here retries.
//! [`Error::kind`] collapses the variants into the four outcome classes callers
//! usually branch on.

use std::io;

use thiserror::Error;

use crate::ownership::RootId;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The sink or source failed to read, write, or seek.
    Io,
    /// Frame structure is invalid (bad varint, truncated payload, bad trailer).
    MalformedFrame,
    /// Payload bytes do not encode/decode as the expected message type.
    SchemaViolation,
    /// A node was attached across two different roots.
    OwnershipViolation,
}

/// Structural framing failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedFrame {
    /// Stream ended in the middle of a varint length prefix.
    #[error("truncated varint length prefix")]
    TruncatedVarint,
    /// Varint longer than 10 bytes or larger than a frame length can be.
    #[error("varint length prefix overflows u32")]
    VarintOverflow,
    /// Fewer payload bytes were available than the length prefix announced.
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload {
        /// Length announced by the prefix.
        expected: u32,
        /// Bytes actually available.
        actual: u64,
    },
    /// Stream cannot hold a root frame at all.
    #[error("stream too short for a root frame: {len} bytes, minimum {minimum}")]
    StreamTooShort {
        /// Stream length in bytes.
        len: u64,
        /// Smallest possible root frame (trailer plus one-byte varint).
        minimum: u64,
    },
    /// Trailer claims a frame larger than the bytes preceding it.
    #[error("root trailer announces {trailer} bytes but stream holds {stream_len}")]
    TrailerOutOfRange {
        /// Length decoded from the trailer.
        trailer: u32,
        /// Total stream length.
        stream_len: u64,
    },
    /// Trailer and varint prefix of the root frame disagree.
    #[error("root trailer announces {trailer} bytes but prefix announces {prefix}")]
    TrailerMismatch {
        /// Length decoded from the trailer.
        trailer: u32,
        /// Length decoded from the varint prefix.
        prefix: u32,
    },
    /// Frame is larger than the configured limit (or than `u32::MAX`).
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Payload length.
        len: u64,
        /// Configured maximum.
        max: u32,
    },
}

/// Attach rejected because the node belongs to a different root aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("[PZ_OWNERSHIP] node owned by {found} cannot be attached under {expected}")]
pub struct OwnershipError {
    /// Root of the node receiving the reference.
    pub expected: RootId,
    /// Root that owns the node being attached.
    pub found: RootId,
}

/// Errors produced by framing, decoding, and attach operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure on the underlying sink or source.
    #[error("[PZ_IO] {0}")]
    Io(#[from] io::Error),
    /// Invalid frame structure.
    #[error("[PZ_MALFORMED_FRAME] {0}")]
    Malformed(#[from] MalformedFrame),
    /// Payload did not parse as the expected message.
    #[error("[PZ_SCHEMA] payload does not decode: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Message could not be encoded.
    #[error("[PZ_SCHEMA] message does not encode: {0}")]
    Encode(#[from] prost::EncodeError),
    /// Cross-root attach.
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

impl Error {
    /// Outcome class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Malformed(_) => ErrorKind::MalformedFrame,
            Self::Decode(_) | Self::Encode(_) => ErrorKind::SchemaViolation,
            Self::Ownership(_) => ErrorKind::OwnershipViolation,
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// Only interrupted or would-block I/O qualifies. Ownership violations are
    /// usage errors and never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
