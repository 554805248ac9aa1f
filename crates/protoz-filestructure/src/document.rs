// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Document`: the root aggregate of the FileStructure schema.
//!
//! # Persisted layout
//!
//! [`Document::write_to`] walks the tree children-first. Every `Identity` and
//! `Data` becomes a nested frame; each parent header records the positions of
//! its children's frames. The document header is written last as the root
//! frame, so a reader finds it from the end of the stream.
//!
//! # Loading
//!
//! [`Document::open`] keeps the stream and reads only the root frame. Each
//! entry, and each identity below it, is decoded the first time it is
//! accessed. [`Document::read_from`] decodes everything up front.

use std::any::Any;
use std::fmt::{self, Display};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use protoz_runtime::{
    resolve, ContentSource, FormatTree, FrameCodec, FrameSink, Lazy, Navigate, NodeRef, Origin,
    Owned, OwningIndex, Rendered, Result, Stamp, TreeFormatter,
};
use tracing::{debug, instrument};

use crate::data::Data;
use crate::header::DocumentHeader;
use crate::identity::Identity;

/// Loader for the entry at `index` of the document stamped `stamp`.
fn entry_at(stamp: &Stamp, index: usize) -> impl FnOnce(Option<&Origin>) -> Result<Data> + '_ {
    move |origin: Option<&Origin>| Data::load(origin, stamp.child(Document::DATA, index))
}

/// Root aggregate: an ordered list of [`Data`] entries.
#[derive(Debug)]
pub struct Document {
    stamp: Stamp,
    data: OwningIndex<Lazy<Data>>,
}

impl Document {
    /// Field number of `data`.
    pub const DATA: u32 = 1;

    /// Empty document with a fresh root identity.
    pub fn new() -> Self {
        Self {
            stamp: Stamp::new_root(),
            data: OwningIndex::new(),
        }
    }

    /// Append a new entry built in place and return it.
    pub fn add_data(&mut self) -> &mut Data {
        let index = self.data.size();
        let entry = Data::with_stamp(self.stamp.child(Self::DATA, index));
        self.data.emplace(index, Lazy::empty()).insert(entry)
    }

    /// Entry at `index`, decoding it on first access.
    pub fn get_data(&self, index: usize) -> Result<Option<&Data>> {
        self.data
            .get(index)
            .map(|slot| slot.get_or_load(entry_at(&self.stamp, index)))
            .transpose()
    }

    /// Mutable entry at `index`.
    pub fn get_data_mut(&mut self, index: usize) -> Result<Option<&mut Data>> {
        let stamp = &self.stamp;
        self.data
            .get_mut(index)
            .map(|slot| slot.get_mut_or_load(entry_at(stamp, index)))
            .transpose()
    }

    /// Number of entries.
    pub fn data_count(&self) -> usize {
        self.data.size()
    }

    /// Whether the entry at `index` has been decoded (or was built in memory).
    pub fn is_data_loaded(&self, index: usize) -> bool {
        self.data.get(index).is_some_and(Lazy::is_loaded)
    }

    /// Entries in slot order, decoding any not yet read.
    pub fn data_list(&self) -> Result<Vec<&Data>> {
        self.data
            .iter()
            .map(|(index, slot)| slot.get_or_load(entry_at(&self.stamp, index)))
            .collect()
    }

    /// Resolve an identity reference stored somewhere in this document.
    ///
    /// `Ok(None)` means the referenced identity no longer exists.
    pub fn resolve_identity(&self, identity: &NodeRef<Identity>) -> Result<Option<&Identity>> {
        resolve(self, identity)
    }

    /// Decode every entry and identity still held in the source stream.
    pub fn load_all(&mut self) -> Result<()> {
        let stamp = &self.stamp;
        for (index, slot) in self.data.iter_mut() {
            slot.get_mut_or_load(entry_at(stamp, index))?.load_all()?;
        }
        Ok(())
    }

    /// Persist the whole tree at the end of `sink`, ending with the root frame.
    ///
    /// Entries not yet decoded are read from their source first. Returns the
    /// number of bytes written.
    #[instrument(skip_all, fields(data = self.data_count()))]
    pub fn write_to<W: Write + Seek>(&self, sink: W, codec: &FrameCodec) -> Result<u64> {
        let mut frames = FrameSink::new(codec, sink)?;
        let mut positions = Vec::with_capacity(self.data.occupied());
        for (index, slot) in self.data.iter() {
            let entry = slot.get_or_load(entry_at(&self.stamp, index))?;
            positions.push(entry.write_nested(&mut frames)?);
        }
        frames.finish(&DocumentHeader { data: positions })
    }

    /// Persist into a fresh byte buffer.
    pub fn write_to_bytes(&self, codec: &FrameCodec) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.write_to(&mut buf, codec)?;
        Ok(buf.into_inner())
    }

    /// Open the last document written to `source`, reading only its root frame.
    ///
    /// The document keeps `source` and decodes children from it on access, so
    /// corruption below the root surfaces from the accessor that reaches it.
    /// The opened tree gets a fresh root identity; stored references are
    /// rebound to it.
    #[instrument(skip_all)]
    pub fn open<R: Read + Seek + 'static>(source: R, codec: &FrameCodec) -> Result<Self> {
        let source = ContentSource::new(source, codec.clone());
        let header: DocumentHeader = source.read_root()?;
        let stamp = Stamp::new_root();
        let mut data = OwningIndex::new();
        for (index, position) in header.data.iter().enumerate() {
            data.set(index, Lazy::stored(source.clone(), *position));
        }
        debug!(root = %stamp.root_id(), entries = data.size(), "document opened");
        Ok(Self { stamp, data })
    }

    /// Load the last document written to `source`, decoding the whole tree.
    ///
    /// The stream is copied into memory first; `source` is not retained.
    #[instrument(skip_all)]
    pub fn read_from<R: Read + Seek + ?Sized>(source: &mut R, codec: &FrameCodec) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let mut doc = Self::open(Cursor::new(bytes), codec)?;
        doc.load_all()?;
        debug!(root = %doc.root_id(), entries = doc.data_count(), "document loaded");
        Ok(doc)
    }

    /// Load from an in-memory buffer.
    pub fn from_bytes(bytes: &[u8], codec: &FrameCodec) -> Result<Self> {
        Self::read_from(&mut Cursor::new(bytes), codec)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.data_list(), other.data_list()) {
            (Ok(mine), Ok(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

impl Owned for Document {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}

impl Navigate for Document {
    fn child(&self, field_id: u32, index: usize) -> Result<Option<&dyn Navigate>> {
        Ok(match field_id {
            Self::DATA => self.get_data(index)?.map(|entry| entry as &dyn Navigate),
            _ => None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FormatTree for Document {
    fn format_fields(&self, out: &mut TreeFormatter<'_, '_>) -> fmt::Result {
        for (index, slot) in self.data.iter() {
            let entry = slot.get_or_load(entry_at(&self.stamp, index));
            out.nested("data", entry.map(Some))?;
        }
        Ok(())
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&Rendered::new("Document", self), f)
    }
}
