// Linker errors
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

use crate::diagnose::{Annotate, AnnotatedSpan, Diagnostic, MessageCode};
use crate::ir::{IntermediateLevel, SymbolKey};
use crate::span::Span;
use thiserror::Error;

/// Error during linking.
///
/// Every variant is recoverable in the sense that linking continues to
///   surface as many errors as it can before the stage is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error(
        "intermediate `{id}` is {level}; only compiled intermediates and \
         libraries can be linked"
    )]
    InvalidIntermediateLevel {
        id: String,
        level: IntermediateLevel,
    },

    /// Two units publicly define the same symbol.
    #[error("duplicate symbol `{table}:{id}`")]
    DuplicateSymbol {
        span: Option<Span>,
        first: Option<Span>,
        table: String,
        id: String,
    },

    /// A reference that must resolve does not.
    #[error("unresolved reference to symbol `{table}:{id}`{}", from_desc(.from))]
    UnresolvedReference {
        span: Option<Span>,
        from: Option<SymbolKey>,
        table: String,
        id: String,
    },

    /// More than one section could serve as the entry section.
    #[error("multiple entry sections (`{first}` and `{second}`)")]
    MultipleEntrySections {
        span: Option<Span>,
        first_span: Option<Span>,
        first: String,
        second: String,
    },

    /// Groups that contain themselves,
    ///   in the order in which they reference one another.
    #[error("group reference loop: {}", .cycle.join(" -> "))]
    ReferenceLoop { span: Option<Span>, cycle: Vec<String> },
}

fn from_desc(from: &Option<SymbolKey>) -> String {
    match from {
        Some(key) => format!(" from symbol `{key}`"),
        None => String::new(),
    }
}

impl Diagnostic for LinkError {
    fn code(&self) -> MessageCode {
        use LinkError::*;

        MessageCode(match self {
            ReferenceLoop { .. } => 86,
            MultipleEntrySections { .. } => 89,
            DuplicateSymbol { .. } => 91,
            UnresolvedReference { .. } => 94,
            InvalidIntermediateLevel { .. } => 95,
        })
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        use LinkError::*;

        match self {
            InvalidIntermediateLevel { .. } => vec![],

            DuplicateSymbol { span, first, .. } => vec![
                span.as_ref().error("duplicate definition"),
                first.as_ref().note("first defined here"),
            ],

            UnresolvedReference { span, table, .. } => span
                .as_ref()
                .error("referenced here")
                .with_help(format!(
                    "define this `{table}` symbol or link the library that \
                     provides it"
                ))
                .into(),

            MultipleEntrySections {
                span, first_span, ..
            } => vec![
                span.as_ref().error("second entry section"),
                first_span.as_ref().note("first entry section"),
            ],

            ReferenceLoop { span, .. } => {
                span.as_ref().error("loop includes this group").into()
            }
        }
    }
}
