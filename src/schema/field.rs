// Field definitions
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

use std::fmt::{self, Display};

/// Type of the value held by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Literal text.
    String,

    /// Text that may be replaced by a localized string for the culture
    ///   being built.
    LocalizableString,

    /// A signed integer.
    Integer,

    /// Reference to or definition of a symbol identifier.
    Identifier,

    /// Text evaluated by the installer engine at install time.
    Formatted,

    /// A path to a source file,
    ///   located using bind paths.
    Path,
}

impl FieldType {
    /// Stable name used by the persisted format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::LocalizableString => "localizable",
            Self::Integer => "integer",
            Self::Identifier => "identifier",
            Self::Formatted => "formatted",
            Self::Path => "path",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of another table that a field references.
///
/// Columns are 1-indexed;
///   column 1 of a table keyed by symbol identifier is that identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: usize,
}

/// Definition of a single typed field of a [`SymbolDefinition`].
///
/// Fields are not nullable unless declared otherwise.
///
/// [`SymbolDefinition`]: super::SymbolDefinition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    ty: FieldType,
    nullable: bool,
    primary_key: bool,
    foreign_key: Option<ForeignKey>,
    max_length: Option<usize>,
    range: Option<(i64, i64)>,
}

impl FieldDefinition {
    pub fn new<S: Into<String>>(name: S, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            primary_key: false,
            foreign_key: None,
            max_length: None,
            range: None,
        }
    }

    pub fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Mark this field as a component of the primary key of a table that
    ///   is not keyed by symbol identifier.
    pub fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    pub fn foreign_key<S: Into<String>>(self, table: S, column: usize) -> Self {
        Self {
            foreign_key: Some(ForeignKey {
                table: table.into(),
                column,
            }),
            ..self
        }
    }

    pub fn max_length(self, max: usize) -> Self {
        Self {
            max_length: Some(max),
            ..self
        }
    }

    /// Inclusive range of permitted integer values.
    pub fn range(self, min: i64, max: i64) -> Self {
        Self {
            range: Some((min, max)),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> FieldType {
        self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn references(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    pub fn length_limit(&self) -> Option<usize> {
        self.max_length
    }

    pub fn value_range(&self) -> Option<(i64, i64)> {
        self.range
    }
}
