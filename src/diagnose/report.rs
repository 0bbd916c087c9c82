// Diagnostic rendering
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

//! Rendering of diagnostic information.

// NB: `write!` together with `\n` is preferred to `writeln!` so that there
//   is only a single sequence of characters to search for while tracking
//   down newlines,
//     rather than using both.

use super::{AnnotatedSpan, Level, Message};
use crate::span::Span;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::fmt::Write;
use std::fs;

pub trait Reporter {
    /// Render a message for display to the user.
    ///
    /// This never fails;
    ///   problems retrieving source lines are reflected in the report
    ///   itself rather than hiding the message that was requested.
    ///
    /// The full report is returned as a single string so that it can be
    ///   written at once,
    ///     avoiding interleaving with the output of concurrent processes.
    fn render(&self, message: &Message) -> String;
}

/// Retrieve the text of a source line referenced by a [`Span`].
pub trait LineResolver {
    /// Retrieve the line,
    ///   or [`None`] if the source is unavailable.
    fn line(&self, span: &Span) -> Option<String>;
}

/// Resolve lines by reading source files from the filesystem.
///
/// Each file is read at most once.
#[derive(Debug, Default)]
pub struct FsLineResolver {
    cache: Mutex<FxHashMap<String, Option<Vec<String>>>>,
}

impl LineResolver for FsLineResolver {
    fn line(&self, span: &Span) -> Option<String> {
        let path = span.context().as_str();
        let mut cache = self.cache.lock();

        let lines = cache.entry(path.to_string()).or_insert_with(|| {
            fs::read_to_string(path)
                .ok()
                .map(|src| src.lines().map(String::from).collect())
        });

        let index = (span.line() as usize).checked_sub(1)?;
        lines.as_ref()?.get(index).cloned()
    }
}

/// A resolver that never has source available.
impl LineResolver for () {
    fn line(&self, _span: &Span) -> Option<String> {
        None
    }
}

/// Render diagnostic reports in a visual way resembling Rust's own
///   compiler output:
///
/// ```text
/// error[WIX0094]: unresolved reference to symbol `Component:Missing`
///   --> product.wxs(12)
///    |
/// 12 |       <ComponentRef Id="Missing" />
///    = error: referenced here
/// ```
pub struct VisualReporter<R: LineResolver> {
    resolver: R,
}

impl<R: LineResolver> VisualReporter<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    fn render_span(
        &self,
        out: &mut String,
        prev: &mut Option<Span>,
        aspan: &AnnotatedSpan,
    ) {
        if let Some(span) = aspan.span() {
            // Consecutive annotations on the same line share a header.
            if prev.as_ref() != Some(span) {
                let _ = write!(out, "  --> {span}\n");

                if let Some(src) = self.resolver.line(span) {
                    let num = span.line().to_string();
                    let gutter = " ".repeat(num.len());

                    let _ = write!(out, " {gutter} |\n");
                    let _ = write!(out, " {num} | {src}\n");
                }

                *prev = Some(span.clone());
            }
        }

        if let Some(label) = aspan.label() {
            let _ = write!(out, "   = {}: {label}\n", aspan.level());
        }
    }
}

impl<R: LineResolver> Reporter for VisualReporter<R> {
    fn render(&self, message: &Message) -> String {
        let mut out = String::new();

        let _ = write!(
            out,
            "{}[{}]: {}\n",
            message.level(),
            message.code(),
            message.text()
        );

        let mut prev = None;
        for aspan in message.annotations() {
            self.render_span(&mut out, &mut prev, aspan);
        }

        out
    }
}
