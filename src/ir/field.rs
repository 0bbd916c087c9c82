// Symbol field values
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

//! Symbol field values.
//!
//! A value is either a literal or a [`Deferred`] placeholder.
//! Placeholders are rewritten in place by later stages:
//!
//!   - [`Deferred::Template`] is substituted by the resolver,
//!       unless it references a bind variable,
//!       in which case the binder substitutes it;
//!   - [`Deferred::SourcePath`] is located using bind paths by the
//!       resolver or,
//!         failing that,
//!       by the binder;
//!   - [`Deferred::EmbeddedFile`] is extracted by the binder; and
//!   - [`Deferred::GeneratedId`] and [`Deferred::Guid`] are computed by the
//!       binder.
//!
//! A placeholder that survives to the final write of an output is an
//!   error.

use std::fmt::{self, Display};

/// A value that cannot be determined at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Deferred {
    /// Text containing `!(...)` variable references.
    Template(String),

    /// Path to a source file,
    ///   relative to some bind path.
    SourcePath(String),

    /// File stored inside of an intermediate.
    EmbeddedFile { uri: String, index: usize },

    /// Identifier computed by
    ///   [`create_identifier`](super::create_identifier).
    ///
    /// Arguments may themselves contain `!(...)` references,
    ///   which are substituted before hashing.
    GeneratedId { prefix: String, args: Vec<String> },

    /// GUID computed by [`create_guid`](super::create_guid).
    Guid { args: Vec<String> },
}

impl Deferred {
    /// Stable name of the kind of placeholder.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Template(_) => "tpl",
            Self::SourcePath(_) => "path",
            Self::EmbeddedFile { .. } => "embed",
            Self::GeneratedId { .. } => "id",
            Self::Guid { .. } => "guid",
        }
    }
}

impl Display for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(text) => write!(f, "template `{text}`"),
            Self::SourcePath(path) => write!(f, "source path `{path}`"),
            Self::EmbeddedFile { uri, index } => {
                write!(f, "embedded file {index} of `{uri}`")
            }
            Self::GeneratedId { prefix, args } => {
                write!(f, "generated identifier `{prefix}` of ({})", args.join(", "))
            }
            Self::Guid { args } => {
                write!(f, "generated GUID of ({})", args.join(", "))
            }
        }
    }
}

/// Value of a single symbol field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Str(String),
    Number(i64),
    Deferred(Deferred),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of this field,
    ///   parsing text if necessary.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        match self {
            Self::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Literal text of this value,
    ///   if it is a literal.
    pub fn literal(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Text containing a variable reference becomes a
///   [`Deferred::Template`].
impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        if s.contains("!(") {
            Self::Deferred(Deferred::Template(s.into()))
        } else {
            Self::Str(s.into())
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        if s.contains("!(") {
            Self::Deferred(Deferred::Template(s))
        } else {
            Self::Str(s)
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<Deferred> for FieldValue {
    fn from(d: Deferred) -> Self {
        Self::Deferred(d)
    }
}
