// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Indented text rendering of wrapper trees.
//!
//! ```text
//! Document {
//!   data {
//!     identification {
//!       first_name: "Babbage"
//!     }
//!     approver: -> /1:0/1:0
//!   }
//! }
//! ```
//!
//! Unset fields are skipped. A child that fails to load is printed as
//! `name: <unreadable: ...>` instead of aborting the whole rendering.

use std::fmt::{self, Debug, Display, Write};

use crate::ownership::Coordinates;
use crate::Result;

const INDENT: &str = "  ";

/// Implemented by wrappers that render through [`TreeFormatter`].
pub trait FormatTree {
    /// Emit one line (or block) per set field.
    fn format_fields(&self, out: &mut TreeFormatter<'_, '_>) -> fmt::Result;
}

/// Writes nested `name { ... }` blocks with two-space indentation.
pub struct TreeFormatter<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
    depth: usize,
}

impl<'a, 'b> TreeFormatter<'a, 'b> {
    /// Formatter writing into `out` at depth zero.
    pub fn new(out: &'a mut fmt::Formatter<'b>) -> Self {
        Self { out, depth: 0 }
    }

    /// Render `node` as a `title { ... }` block.
    pub fn message<T: FormatTree + ?Sized>(&mut self, title: &str, node: &T) -> fmt::Result {
        self.line(format_args!("{title} {{"))?;
        self.depth += 1;
        let fields = node.format_fields(self);
        self.depth -= 1;
        fields?;
        self.line(format_args!("}}"))
    }

    /// Scalar field; `None` means unset and prints nothing.
    pub fn scalar(&mut self, name: &str, value: Option<&dyn Debug>) -> fmt::Result {
        match value {
            Some(value) => self.line(format_args!("{name}: {value:?}")),
            None => Ok(()),
        }
    }

    /// Nested child; absent children print nothing.
    pub fn nested<T: FormatTree + ?Sized>(
        &mut self,
        name: &str,
        child: Result<Option<&T>>,
    ) -> fmt::Result {
        match child {
            Ok(Some(node)) => self.message(name, node),
            Ok(None) => Ok(()),
            Err(err) => self.line(format_args!("{name}: <unreadable: {err}>")),
        }
    }

    /// Reference field, printed as the target's coordinates.
    pub fn reference(&mut self, name: &str, target: &Coordinates) -> fmt::Result {
        self.line(format_args!("{name}: -> {target}"))
    }

    fn line(&mut self, text: fmt::Arguments<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            self.out.write_str(INDENT)?;
        }
        self.out.write_fmt(text)?;
        self.out.write_char('\n')
    }
}

/// Adapter giving any [`FormatTree`] node a `Display` impl under `title`.
pub struct Rendered<'a, T: ?Sized> {
    title: &'a str,
    node: &'a T,
}

impl<'a, T: FormatTree + ?Sized> Rendered<'a, T> {
    /// Render `node` as a top-level `title { ... }` block.
    pub fn new(title: &'a str, node: &'a T) -> Self {
        Self { title, node }
    }
}

impl<T: FormatTree + ?Sized> Display for Rendered<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TreeFormatter::new(f).message(self.title, self.node)
    }
}
