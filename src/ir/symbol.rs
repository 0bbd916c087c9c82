// Symbols
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

use super::{AccessModifier, FieldValue, Identifier};
use crate::schema::SymbolDefinition;
use crate::span::Span;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Lookup key of a symbol:
///   its table and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub table: String,
    pub id: String,
}

impl SymbolKey {
    pub fn new<T: Into<String>, I: Into<String>>(table: T, id: I) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
        }
    }
}

impl Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}

/// A row of a table described by a [`SymbolDefinition`].
///
/// `fields` always has exactly one value per field of the definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    definition: Arc<SymbolDefinition>,
    id: Identifier,
    span: Option<Span>,
    fields: Vec<FieldValue>,
}

impl Symbol {
    /// New symbol with all fields null.
    pub fn new(
        definition: Arc<SymbolDefinition>,
        id: Identifier,
        span: Option<Span>,
    ) -> Self {
        let fields = vec![FieldValue::Null; definition.fields().len()];

        Self {
            definition,
            id,
            span,
            fields,
        }
    }

    /// Symbol with the provided field values.
    ///
    /// Returns the values back if their number does not match the
    ///   definition.
    pub fn with_fields(
        definition: Arc<SymbolDefinition>,
        id: Identifier,
        span: Option<Span>,
        fields: Vec<FieldValue>,
    ) -> Result<Self, Vec<FieldValue>> {
        if fields.len() != definition.fields().len() {
            return Err(fields);
        }

        Ok(Self {
            definition,
            id,
            span,
            fields,
        })
    }

    pub fn definition(&self) -> &Arc<SymbolDefinition> {
        &self.definition
    }

    pub fn table(&self) -> &str {
        self.definition.name()
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Identifier string,
    ///   or the empty string for an invalid identifier.
    pub fn id_str(&self) -> &str {
        self.id.id().unwrap_or("")
    }

    pub fn access(&self) -> AccessModifier {
        self.id.access()
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(self.table(), self.id_str())
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldValue] {
        &mut self.fields
    }

    pub fn field(&self, index: usize) -> &FieldValue {
        &self.fields[index]
    }

    /// Value of the named field,
    ///   or [`None`] if the definition has no such field.
    pub fn field_named(&self, name: &str) -> Option<&FieldValue> {
        self.definition.field_index(name).map(|i| &self.fields[i])
    }

    pub fn set(&mut self, index: usize, value: FieldValue) {
        self.fields[index] = value;
    }

    /// Set the named field.
    ///
    /// Field names are fixed by the definitions that the toolset itself
    ///   registers,
    ///     so an unknown name is a bug.
    pub fn set_named<V: Into<FieldValue>>(&mut self, name: &str, value: V) {
        let index = self.definition.field_index(name).unwrap_or_else(|| {
            panic!(
                "internal error: table `{}` has no field `{name}`",
                self.definition.name()
            )
        });

        self.fields[index] = value.into();
    }
}
