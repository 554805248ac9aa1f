// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! On-access loading of nested frames.
//!
//! A tree opened from a stream only decodes its root header up front. Every
//! child the header points at becomes a [`Lazy`] slot holding the child's
//! frame position; the frame is read through the shared [`ContentSource`] the
//! first time the child is touched.
//!
//! A slot with neither a value nor a stored position is an unset child that
//! the loader builds in memory on first access. That is how required nested
//! fields come into existence.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::io::{self, Read, Seek};
use std::rc::Rc;

use prost::Message;
use tracing::trace;

use crate::frame::FrameCodec;
use crate::Result;

/// Byte source that can be read and repositioned.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Shared handle on the stream a tree was opened from.
///
/// Clones share the same underlying stream. Reads are serialised by a
/// `RefCell`; the handle is single-threaded like the trees that hold it.
#[derive(Clone)]
pub struct ContentSource {
    stream: Rc<RefCell<dyn ReadSeek>>,
    codec: FrameCodec,
}

impl ContentSource {
    /// Take ownership of `stream`; frames are decoded with `codec`.
    pub fn new<R: Read + Seek + 'static>(stream: R, codec: FrameCodec) -> Self {
        Self {
            stream: Rc::new(RefCell::new(stream)),
            codec,
        }
    }

    /// Codec used for every read.
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Decode the last root frame of the stream.
    pub fn read_root<M: Message + Default>(&self) -> Result<M> {
        self.with_stream(|stream| self.codec.read_root(stream))
    }

    /// Decode the nested frame starting at absolute `position`.
    pub fn read_at<M: Message + Default>(&self, position: u64) -> Result<M> {
        self.with_stream(|stream| self.codec.read_nested_at(stream, position))
    }

    fn with_stream<T>(&self, read: impl FnOnce(&mut dyn ReadSeek) -> Result<T>) -> Result<T> {
        let mut stream = self.stream.try_borrow_mut().map_err(|_| {
            io::Error::new(io::ErrorKind::ResourceBusy, "content source is already being read")
        })?;
        read(&mut *stream)
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSource")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

/// Where a stored child's frame lives.
#[derive(Clone, Debug)]
pub struct Origin {
    source: ContentSource,
    position: u64,
}

impl Origin {
    /// Stream holding the frame.
    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Absolute position of the frame.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Decode the frame as `M`.
    pub fn read<M: Message + Default>(&self) -> Result<M> {
        trace!(position = self.position, "loading child frame");
        self.source.read_at(self.position)
    }
}

/// A child that is decoded the first time it is accessed.
///
/// Shared access fills an internal once-cell; mutable access moves the value
/// into owned storage. Either way the frame is read at most once.
#[derive(Debug)]
pub struct Lazy<T> {
    owned: Option<T>,
    shared: OnceCell<T>,
    origin: Option<Origin>,
}

impl<T> Lazy<T> {
    /// Slot already holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            owned: Some(value),
            shared: OnceCell::new(),
            origin: None,
        }
    }

    /// Unset slot; the loader builds its value on first access.
    pub fn empty() -> Self {
        Self {
            owned: None,
            shared: OnceCell::new(),
            origin: None,
        }
    }

    /// Slot whose value is the frame at `position` of `source`.
    pub fn stored(source: ContentSource, position: u64) -> Self {
        Self {
            owned: None,
            shared: OnceCell::new(),
            origin: Some(Origin { source, position }),
        }
    }

    /// Stored frame location, if the slot came from a stream.
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Whether the value has been built or decoded.
    pub fn is_loaded(&self) -> bool {
        self.peek().is_some()
    }

    /// The value, without loading it.
    pub fn peek(&self) -> Option<&T> {
        self.owned.as_ref().or_else(|| self.shared.get())
    }

    /// The value, loading it through `load` on first access.
    ///
    /// A failed load leaves the slot unloaded; a later access tries again.
    pub fn get_or_load<F>(&self, load: F) -> Result<&T>
    where
        F: FnOnce(Option<&Origin>) -> Result<T>,
    {
        if let Some(value) = self.peek() {
            return Ok(value);
        }
        let value = load(self.origin.as_ref())?;
        Ok(self.shared.get_or_init(|| value))
    }

    /// Mutable access, loading through `load` on first access.
    pub fn get_mut_or_load<F>(&mut self, load: F) -> Result<&mut T>
    where
        F: FnOnce(Option<&Origin>) -> Result<T>,
    {
        match self.owned {
            Some(ref mut value) => Ok(value),
            None => {
                let value = match self.shared.take() {
                    Some(value) => value,
                    None => load(self.origin.as_ref())?,
                };
                Ok(self.owned.insert(value))
            }
        }
    }

    /// Replace the contents with `value` and return it.
    pub fn insert(&mut self, value: T) -> &mut T {
        self.shared = OnceCell::new();
        self.owned.insert(value)
    }
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::empty()
    }
}
