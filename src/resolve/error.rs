// Resolver errors
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
use crate::ir::IntermediateLevel;
use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("intermediate `{id}` is {level}; only linked intermediates can be resolved")]
    InvalidIntermediateLevel {
        id: String,
        level: IntermediateLevel,
    },

    #[error("unknown variable `!({name})`")]
    UnknownVariable { span: Option<Span>, name: String },

    #[error("duplicate localized string `{id}` for culture `{culture}`")]
    DuplicateLocalizedString {
        span: Option<Span>,
        first: Option<Span>,
        culture: String,
        id: String,
    },

    #[error("invalid variable syntax in `{text}`: {reason}")]
    BadSyntax {
        span: Option<Span>,
        text: String,
        reason: &'static str,
    },

    #[error("localized control `{key}` does not exist")]
    LocalizedControlMissing { span: Option<Span>, key: String },

    #[error("duplicate localized control `{key}` for culture `{culture}`")]
    DuplicateLocalizedControl {
        span: Option<Span>,
        first: Option<Span>,
        culture: String,
        key: String,
    },
}

impl Diagnostic for ResolveError {
    fn code(&self) -> MessageCode {
        use ResolveError::*;

        MessageCode(match self {
            InvalidIntermediateLevel { .. } => 95,
            UnknownVariable { .. } => 100,
            DuplicateLocalizedString { .. } => 101,
            BadSyntax { .. } => 102,
            LocalizedControlMissing { .. } => 103,
            DuplicateLocalizedControl { .. } => 104,
        })
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        use ResolveError::*;

        match self {
            InvalidIntermediateLevel { .. } => vec![],

            UnknownVariable { span, name } => {
                let help = match name.split_once('.') {
                    Some(("loc", _)) => {
                        "define this string in a localization file"
                    }
                    _ => "define this variable or provide a default with `=`",
                };

                span.as_ref().error("used here").with_help(help).into()
            }

            DuplicateLocalizedString { span, first, .. }
            | DuplicateLocalizedControl { span, first, .. } => vec![
                span.as_ref().error("duplicate definition"),
                first.as_ref().note("first defined here"),
            ],

            BadSyntax { span, .. } => span.as_ref().mark_error().into(),

            LocalizedControlMissing { span, .. } => span
                .as_ref()
                .error("localized here")
                .with_help("no dialog or control with this name was linked")
                .into(),
        }
    }
}
