// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Length-delimited message framing.
//!
//! Frame layout:
//!
//! ```text
//! LENGTH(varint) || PAYLOAD(LENGTH bytes) || [TRAILER(u32 LE) = LENGTH]
//! ```
//!
//! The trailer is present only on root frames. A reader locates the last root
//! frame of a stream by reading the trailer at `end - 4` and stepping back
//! `varint_len(LENGTH) + LENGTH` bytes. Writer and reader both size the varint
//! with [`prost::encoding::encoded_len_varint`]; the backward seek depends on
//! that computation matching exactly.
//!
//! Nested frames have no trailer. They are located by absolute stream
//! position, recorded in the parent's header when the tree is written.

use std::io::{Read, Seek, SeekFrom, Write};

use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};
use prost::Message;
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{Error, MalformedFrame};
use crate::Result;

/// Width of the root trailer in bytes.
pub const TRAILER_LEN: u64 = 4;
/// Smallest possible root frame: one-byte varint plus the trailer.
pub const MIN_ROOT_FRAME_LEN: u64 = TRAILER_LEN + 1;
/// Longest varint the reader accepts.
const MAX_VARINT_LEN: usize = 10;
/// `SeekFrom::End` offset of the trailer.
const TRAILER_FROM_END: i64 = -4;

/// Whether a frame is the outermost (root) frame of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Located by position; no trailer.
    Nested,
    /// Tail of the stream; carries the trailer.
    Root,
}

impl FrameKind {
    /// `true` for [`FrameKind::Root`].
    pub fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Reads and writes single delimited frames.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: CodecConfig,
}

impl FrameCodec {
    /// Codec with the given limits.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Total on-wire size of a frame carrying `payload_len` bytes.
    pub fn frame_len(payload_len: u32, kind: FrameKind) -> u64 {
        let prefix = encoded_len_varint(u64::from(payload_len)) as u64;
        let trailer = if kind.is_root() { TRAILER_LEN } else { 0 };
        prefix + u64::from(payload_len) + trailer
    }

    /// Encode `message` as a complete frame.
    pub fn encode_frame<M: Message>(&self, message: &M, kind: FrameKind) -> Result<Vec<u8>> {
        let len = self.checked_len(message.encoded_len())?;
        let capacity = usize::try_from(Self::frame_len(len, kind)).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        encode_varint(u64::from(len), &mut buf);
        message.encode(&mut buf)?;
        if kind.is_root() {
            buf.extend_from_slice(&len.to_le_bytes());
        }
        Ok(buf)
    }

    /// Write `message` as one frame and return the number of bytes written.
    ///
    /// The frame is staged in memory first and handed to `sink` in a single
    /// `write_all`, so an encode failure never reaches the sink.
    pub fn write_delimited<M, W>(&self, message: &M, sink: &mut W, kind: FrameKind) -> Result<u64>
    where
        M: Message,
        W: Write + ?Sized,
    {
        let frame = self.encode_frame(message, kind)?;
        sink.write_all(&frame)?;
        trace!(bytes = frame.len(), ?kind, "frame written");
        Ok(frame.len() as u64)
    }

    /// Read one frame of the given kind.
    ///
    /// A root read seeks to the last root frame of `source` first; a nested
    /// read starts at the current position.
    pub fn read_delimited<M, R>(&self, source: &mut R, kind: FrameKind) -> Result<M>
    where
        M: Message + Default,
        R: Read + Seek + ?Sized,
    {
        match kind {
            FrameKind::Nested => self.read_nested(source),
            FrameKind::Root => self.read_root(source),
        }
    }

    /// Read a nested frame at the current position. Needs no seeking.
    pub fn read_nested<M, R>(&self, source: &mut R) -> Result<M>
    where
        M: Message + Default,
        R: Read + ?Sized,
    {
        let len = read_varint_len(source)?;
        self.decode_payload(source, len)
    }

    /// Seek to absolute `position` and read the nested frame found there.
    pub fn read_nested_at<M, R>(&self, source: &mut R, position: u64) -> Result<M>
    where
        M: Message + Default,
        R: Read + Seek + ?Sized,
    {
        source.seek(SeekFrom::Start(position))?;
        self.read_nested(source)
    }

    /// Locate the root frame from the end of `source` and decode it.
    pub fn read_root<M, R>(&self, source: &mut R) -> Result<M>
    where
        M: Message + Default,
        R: Read + Seek + ?Sized,
    {
        let trailer = seek_root_frame(source)?;
        let prefix = read_varint_len(source)?;
        if self.config.verify_trailer && prefix != trailer {
            return Err(MalformedFrame::TrailerMismatch { trailer, prefix }.into());
        }
        self.decode_payload(source, prefix)
    }

    fn decode_payload<M, R>(&self, source: &mut R, len: u32) -> Result<M>
    where
        M: Message + Default,
        R: Read + ?Sized,
    {
        if len > self.config.max_frame_len {
            return Err(MalformedFrame::FrameTooLarge {
                len: u64::from(len),
                max: self.config.max_frame_len,
            }
            .into());
        }
        // Grown by `read_to_end`; the prefix alone does not size the buffer.
        let mut payload = Vec::new();
        let read = source.take(u64::from(len)).read_to_end(&mut payload)? as u64;
        if read < u64::from(len) {
            return Err(MalformedFrame::TruncatedPayload {
                expected: len,
                actual: read,
            }
            .into());
        }
        trace!(bytes = len, "frame read");
        Ok(M::decode(payload.as_slice())?)
    }

    fn checked_len(&self, len: usize) -> Result<u32> {
        let max = self.config.max_frame_len;
        u32::try_from(len)
            .ok()
            .filter(|len| *len <= max)
            .ok_or_else(|| {
                Error::from(MalformedFrame::FrameTooLarge {
                    len: len as u64,
                    max,
                })
            })
    }
}

/// Position `source` at the start of the last root frame; return the trailer length.
fn seek_root_frame<R>(source: &mut R) -> Result<u32>
where
    R: Read + Seek + ?Sized,
{
    let stream_len = source.seek(SeekFrom::End(0))?;
    if stream_len < MIN_ROOT_FRAME_LEN {
        return Err(MalformedFrame::StreamTooShort {
            len: stream_len,
            minimum: MIN_ROOT_FRAME_LEN,
        }
        .into());
    }
    source.seek(SeekFrom::End(TRAILER_FROM_END))?;
    let mut raw = [0u8; 4];
    source.read_exact(&mut raw)?;
    let trailer = u32::from_le_bytes(raw);

    let frame_len = FrameCodec::frame_len(trailer, FrameKind::Root);
    let start = stream_len
        .checked_sub(frame_len)
        .ok_or(MalformedFrame::TrailerOutOfRange {
            trailer,
            stream_len,
        })?;
    source.seek(SeekFrom::Start(start))?;
    debug!(start, bytes = trailer, "located root frame");
    Ok(trailer)
}

/// Read a varint frame length byte by byte.
fn read_varint_len<R>(source: &mut R) -> Result<u32>
where
    R: Read + ?Sized,
{
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut used = 0;
    while used < MAX_VARINT_LEN {
        if let Err(err) = source.read_exact(&mut buf[used..=used]) {
            return Err(match err.kind() {
                std::io::ErrorKind::UnexpectedEof => MalformedFrame::TruncatedVarint.into(),
                _ => err.into(),
            });
        }
        used += 1;
        if buf[used - 1] & 0x80 == 0 {
            let value =
                decode_varint(&mut &buf[..used]).map_err(|_| MalformedFrame::VarintOverflow)?;
            return u32::try_from(value).map_err(|_| MalformedFrame::VarintOverflow.into());
        }
    }
    Err(MalformedFrame::VarintOverflow.into())
}

/// Writes a tree of frames children-first and tracks where each one starts.
///
/// Wrapper code calls [`write_nested`](Self::write_nested) for every
/// descendant (recording the returned positions in the parent header) and
/// ends with [`finish`](Self::finish), which writes the root frame.
#[derive(Debug)]
pub struct FrameSink<'a, W> {
    codec: &'a FrameCodec,
    inner: W,
    start: u64,
    position: u64,
    frames: usize,
}

impl<'a, W: Write + Seek> FrameSink<'a, W> {
    /// Sink appending at the end of `inner`; positions are absolute offsets.
    ///
    /// Frames always land at the end, so the sink seeks there first. A file
    /// opened in append mode reports position 0 until its first write.
    pub fn new(codec: &'a FrameCodec, mut inner: W) -> Result<Self> {
        let position = inner.seek(SeekFrom::End(0))?;
        Ok(Self::starting_at(codec, inner, position))
    }
}

impl<'a, W: Write> FrameSink<'a, W> {
    /// Sink for a non-seekable writer that is known to be at `position`.
    pub fn starting_at(codec: &'a FrameCodec, inner: W, position: u64) -> Self {
        Self {
            codec,
            inner,
            start: position,
            position,
            frames: 0,
        }
    }

    /// Offset at which the next frame will start.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Write a nested frame and return the position it starts at.
    pub fn write_nested<M: Message>(&mut self, message: &M) -> Result<u64> {
        let at = self.position;
        self.position += self
            .codec
            .write_delimited(message, &mut self.inner, FrameKind::Nested)?;
        self.frames += 1;
        Ok(at)
    }

    /// Write the root frame and return the total bytes written through this sink.
    pub fn finish<M: Message>(mut self, root: &M) -> Result<u64> {
        self.position += self
            .codec
            .write_delimited(root, &mut self.inner, FrameKind::Root)?;
        self.frames += 1;
        self.inner.flush()?;
        let total = self.position - self.start;
        debug!(frames = self.frames, bytes = total, "tree written");
        Ok(total)
    }
}
