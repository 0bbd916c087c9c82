// Source locations
//
//  Copyright (C) 2024 wixrs contributors.
//
//  This file is part of wixrs.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Mapping of IR entities back to source input.
//!
//! A [`Span`] records the file and line from which some IR entity
//!   originated.
//! This underpins the diagnostic system,
//!   giving the user a location to look at when something goes wrong.
//!
//! A span's file is a [`Context`],
//!   which is cheap to clone since many thousands of spans share a
//!   handful of source files.
//!
//! ```
//! use wixrs::span::{Context, Span};
//!
//! let ctx: Context = "src/product.wxs".into();
//! let span = Span::new(ctx.clone(), 12);
//!
//! assert_eq!(&ctx, span.context());
//! assert_eq!(12, span.line());
//! assert_eq!("src/product.wxs(12)", span.to_string());
//! ```
//!
//! Spans are ordered first by [`Context`] and then by line,
//!   so sorting a collection of spans groups them by file.

use std::fmt::{self, Display};
use std::sync::Arc;

/// The source file of a [`Span`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context(Arc<str>);

impl Context {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Context {
    fn from(path: &str) -> Self {
        Self(path.into())
    }
}

impl From<String> for Context {
    fn from(path: String) -> Self {
        Self(path.into())
    }
}

impl From<&std::path::Path> for Context {
    fn from(path: &std::path::Path) -> Self {
        Self(path.to_string_lossy().into())
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A line within a source file.
///
/// Lines are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    ctx: Context,
    line: u32,
}

impl Span {
    pub fn new<C: Into<Context>>(ctx: C, line: u32) -> Self {
        Self {
            ctx: ctx.into(),
            line,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ctx, self.line)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spans_group_by_context() {
        let a: Context = "a.wxs".into();
        let b: Context = "b.wxs".into();

        let mut spans = vec![
            Span::new(b.clone(), 1),
            Span::new(a.clone(), 30),
            Span::new(a.clone(), 2),
        ];
        spans.sort();

        assert_eq!(
            spans,
            vec![Span::new(a.clone(), 2), Span::new(a, 30), Span::new(b, 1)]
        );
    }

    #[test]
    fn contexts_compare_by_path() {
        let a: Context = String::from("x/y.wxs").into();
        let b: Context = "x/y.wxs".into();

        assert_eq!(a, b);
        assert_eq!("x/y.wxs", a.as_str());
    }
}
