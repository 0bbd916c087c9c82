// Diagnostic system
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

//! Diagnostic system for error reporting.
//!
//! Errors that describe problems with the user's input implement
//!   [`Diagnostic`],
//!     which describes the event as a message code and a series of
//!     [`AnnotatedSpan`]s pointing back into source files.
//!
//! Diagnostics are not returned up the call stack one at a time;
//!   every stage instead writes them to a shared [`Messaging`] sink so
//!   that as many problems as possible are surfaced in a single run.
//! A stage then checks whether it contributed any errors
//!   (see [`StageSink`])
//!   and refuses to hand its output to the next stage if it did.

mod messaging;
mod report;

pub use messaging::{
    Message, Messaging, MessagingConfig, MessagingConfigError, StageSink,
};
pub use report::{FsLineResolver, LineResolver, Reporter, VisualReporter};

use crate::span::Span;
use std::{borrow::Cow, error::Error, fmt, fmt::Display};

/// Diagnostic report.
///
/// This describes an error condition or other special event using a
///   numeric code and a series of [`AnnotatedSpan`]s describing the
///   source, cause, and circumstances around the event.
/// The [`Display`] of the diagnostic is its primary message.
pub trait Diagnostic: Error {
    /// Stable numeric identifier of this kind of event.
    ///
    /// Codes are what users pass to suppress or escalate warnings.
    fn code(&self) -> MessageCode;

    /// Severity of the event before any user configuration is applied.
    fn level(&self) -> Level {
        Level::Error
    }

    /// Produce a series of [`AnnotatedSpan`]s describing the source and
    ///   circumstances of the diagnostic event.
    fn describe(&self) -> Vec<AnnotatedSpan>;
}

/// A stage halted after recording errors to the [`Messaging`] sink.
///
/// The errors themselves have already been reported;
///   this exists only to halt forward progress.
/// Any partial output of the stage must be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed with {errors} error(s)")]
pub struct Aborted {
    pub stage: &'static str,
    pub errors: usize,
}

/// Numeric identifier of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageCode(pub u32);

impl Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WIX{:04}", self.0)
    }
}

/// Diagnostic severity level.
///
/// Levels are used both for entire messages and for styling of individual
///   [`AnnotatedSpan`]s.
///
/// Lower levels are more severe
///   (e.g. level 1 is the worst).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[repr(u8)]
pub enum Level {
    /// An error internal to the toolset that the user cannot resolve,
    ///   but may be able to work around.
    InternalError = 1,

    /// A user-resolvable error.
    #[default]
    Error,

    /// A recoverable problem.
    ///
    /// Warnings never halt a build unless the user escalates them.
    Warning,

    /// Useful information that supplements other messages.
    Note,

    /// Additional advice to the user that may help in fixing a problem.
    Help,
}

impl Level {
    /// Whether this level causes a build to fail.
    pub fn is_error(self) -> bool {
        self <= Level::Error
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::InternalError => write!(f, "internal error"),
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
            Level::Help => write!(f, "help"),
        }
    }
}

/// A label associated with a [`Span`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Label(Cow<'static, str>);

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl From<&'static str> for Label {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

/// A span with an associated severity level and optional label.
///
/// The span itself is optional since some events
///   (e.g. a missing input file)
///   have no location in any source file.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AnnotatedSpan(Option<Span>, Level, Option<Label>);

impl AnnotatedSpan {
    pub fn span(&self) -> Option<&Span> {
        self.0.as_ref()
    }

    pub fn level(&self) -> Level {
        self.1
    }

    pub fn label(&self) -> Option<&Label> {
        self.2.as_ref()
    }

    pub fn with_help<L: Into<Label>>(self, label: L) -> [AnnotatedSpan; 2] {
        let span = self.0.clone();
        [self, span.help(label)]
    }
}

impl From<AnnotatedSpan> for Vec<AnnotatedSpan> {
    fn from(x: AnnotatedSpan) -> Self {
        vec![x]
    }
}

pub trait Annotate: Sized {
    /// Annotate a location with a severity [`Level`] and an optional
    ///   [`Label`] to display alongside of it.
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan;

    /// Annotate a location as an internal error that the user is not
    ///   expected to be able to resolve.
    fn internal_error<L: Into<Label>>(self, label: L) -> AnnotatedSpan {
        self.annotate(Level::InternalError, Some(label.into()))
    }

    /// Annotate a location with a clarifying label styled as an error.
    fn error<L: Into<Label>>(self, label: L) -> AnnotatedSpan {
        self.annotate(Level::Error, Some(label.into()))
    }

    /// Style a location as an error without attaching a label.
    fn mark_error(self) -> AnnotatedSpan {
        self.annotate(Level::Error, None)
    }

    fn warning<L: Into<Label>>(self, label: L) -> AnnotatedSpan {
        self.annotate(Level::Warning, Some(label.into()))
    }

    /// Supplemental location providing additional context for another
    ///   location.
    ///
    /// For example,
    ///   the first definition of a duplicated symbol.
    fn note<L: Into<Label>>(self, label: L) -> AnnotatedSpan {
        self.annotate(Level::Note, Some(label.into()))
    }

    fn help<L: Into<Label>>(self, label: L) -> AnnotatedSpan {
        self.annotate(Level::Help, Some(label.into()))
    }
}

impl Annotate for Span {
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan {
        AnnotatedSpan(Some(self), level, label)
    }
}

impl Annotate for &Span {
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan {
        AnnotatedSpan(Some(self.clone()), level, label)
    }
}

impl Annotate for Option<Span> {
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan {
        AnnotatedSpan(self, level, label)
    }
}

impl Annotate for Option<&Span> {
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan {
        AnnotatedSpan(self.cloned(), level, label)
    }
}
