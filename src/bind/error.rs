// Binder errors
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

use super::OutputType;
use crate::diagnose::{Annotate, AnnotatedSpan, Diagnostic, MessageCode};
use crate::ir::IntermediateLevel;
use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("intermediate `{id}` is {level}; only resolved intermediates can be bound")]
    InvalidIntermediateLevel {
        id: String,
        level: IntermediateLevel,
    },

    #[error("cannot find file `{path}`")]
    FileNotFound { span: Option<Span>, path: String },

    #[error("unknown output type; specify the type or use a recognized file extension")]
    UnknownOutputType,

    /// A deferred value survived to the point at which output is written,
    ///   or could not be computed.
    #[error("unable to compute {what} for `{table}:{id}`")]
    UnresolvedDeferred {
        span: Option<Span>,
        table: String,
        id: String,
        what: String,
    },

    #[error("invalid value in `{table}:{id}`: {violation}")]
    Validation {
        span: Option<Span>,
        table: String,
        id: String,
        violation: String,
    },

    #[error("duplicate primary key `{key}` in table `{table}`")]
    DuplicatePrimaryKey {
        span: Option<Span>,
        first: Option<Span>,
        table: String,
        key: String,
    },

    #[error("`{table}:{id}` refers to missing `{target}` row `{value}` in column `{column}`")]
    ForeignKey {
        span: Option<Span>,
        table: String,
        id: String,
        column: String,
        target: String,
        value: String,
    },

    #[error("no backend can produce {output} output")]
    NoBackend { output: OutputType },

    #[error("unable to {action} `{}`: {reason}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl BindError {
    pub fn io<P: Into<PathBuf>>(action: &'static str, path: P, e: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            reason: e.to_string(),
        }
    }
}

impl Diagnostic for BindError {
    fn code(&self) -> MessageCode {
        use BindError::*;

        MessageCode(match self {
            InvalidIntermediateLevel { .. } => 95,
            FileNotFound { .. } => 200,
            UnknownOutputType => 201,
            UnresolvedDeferred { .. } => 202,
            Validation { .. } => 203,
            DuplicatePrimaryKey { .. } => 204,
            ForeignKey { .. } => 205,
            NoBackend { .. } => 206,
            Io { .. } => 207,
        })
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        use BindError::*;

        match self {
            InvalidIntermediateLevel { .. }
            | UnknownOutputType
            | NoBackend { .. }
            | Io { .. } => vec![],

            FileNotFound { span, .. } => span
                .as_ref()
                .error("referenced here")
                .with_help("add the directory containing it as a bind path")
                .into(),

            UnresolvedDeferred { span, .. } | Validation { span, .. } => {
                span.as_ref().mark_error().into()
            }

            DuplicatePrimaryKey { span, first, .. } => vec![
                span.as_ref().error("duplicate row"),
                first.as_ref().note("first row"),
            ],

            ForeignKey { span, .. } => span.as_ref().error("row defined here").into(),
        }
    }
}
