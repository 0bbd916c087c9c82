// Symbol definitions
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

use super::{FieldDefinition, FieldType};
use crate::ir::{is_legal_identifier, FieldValue};
use thiserror::Error;

/// The shape of a table of [`Symbol`](crate::ir::Symbol)s.
///
/// A definition is immutable once registered with a
///   [`SchemaRegistry`](super::SchemaRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDefinition {
    name: String,
    id_column: Option<String>,
    extension: Option<String>,
    version: u32,
    fields: Vec<FieldDefinition>,
    allow_duplicates: bool,
    unreal: bool,
    optional_references: bool,
}

impl SymbolDefinition {
    /// Define a core table.
    ///
    /// If `id_column` is provided,
    ///   the symbol identifier is materialized as the first column of
    ///   each row under that name,
    ///     preceding `fields`.
    /// Otherwise the identifier exists only for linking and the row
    ///   consists of `fields` alone.
    pub fn new<S: Into<String>>(
        name: S,
        id_column: Option<&str>,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            id_column: id_column.map(String::from),
            extension: None,
            version: 1,
            fields,
            allow_duplicates: false,
            unreal: false,
            optional_references: false,
        }
    }

    /// Mark this definition as belonging to the named extension at the
    ///   given schema version.
    pub fn with_extension<S: Into<String>>(self, ext: S, version: u32) -> Self {
        Self {
            extension: Some(ext.into()),
            version,
            ..self
        }
    }

    pub fn with_version(self, version: u32) -> Self {
        Self { version, ..self }
    }

    /// Permit more than one symbol with the same identifier in a
    ///   section and across sections.
    pub fn allow_duplicates(self) -> Self {
        Self {
            allow_duplicates: true,
            ..self
        }
    }

    /// Symbols of this definition carry linker bookkeeping only and are
    ///   never written to an output database.
    pub fn unreal(self) -> Self {
        Self {
            unreal: true,
            ..self
        }
    }

    /// Optional references to symbols of this definition are dropped when
    ///   no definition exists.
    pub fn optional_references(self) -> Self {
        Self {
            optional_references: true,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDefinition> {
        self.fields.get(index)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    pub fn is_unreal(&self) -> bool {
        self.unreal
    }

    pub fn permits_optional_references(&self) -> bool {
        self.optional_references
    }

    /// Names of the columns of a materialized row,
    ///   including the identifier column if any.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.id_column
            .as_deref()
            .into_iter()
            .chain(self.fields.iter().map(FieldDefinition::name))
    }

    /// Check field values against the rules of this definition.
    ///
    /// Deferred values cannot be checked until they have been resolved
    ///   and are skipped.
    pub fn validate(&self, values: &[FieldValue]) -> Vec<FieldViolation> {
        if values.len() != self.fields.len() {
            return vec![FieldViolation::Arity {
                table: self.name.clone(),
                expected: self.fields.len(),
                found: values.len(),
            }];
        }

        self.fields
            .iter()
            .zip(values)
            .filter_map(|(def, value)| Self::validate_field(def, value))
            .collect()
    }

    fn validate_field(
        def: &FieldDefinition,
        value: &FieldValue,
    ) -> Option<FieldViolation> {
        let field = || def.name().to_string();

        let int = match value {
            FieldValue::Null if def.is_nullable() => return None,
            FieldValue::Null => {
                return Some(FieldViolation::Null { field: field() })
            }
            FieldValue::Deferred(_) => return None,
            FieldValue::Number(n) => Some(*n),
            FieldValue::Str(s) if def.ty() == FieldType::Integer => {
                match s.trim().parse::<i64>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        return Some(FieldViolation::NotAnInteger {
                            field: field(),
                            value: s.clone(),
                        })
                    }
                }
            }
            FieldValue::Str(s) => {
                if let Some(max) = def.length_limit() {
                    let len = s.chars().count();
                    if len > max {
                        return Some(FieldViolation::TooLong {
                            field: field(),
                            max,
                            len,
                        });
                    }
                }

                if def.ty() == FieldType::Identifier && !is_legal_identifier(s)
                {
                    return Some(FieldViolation::IllegalIdentifier {
                        field: field(),
                        value: s.clone(),
                    });
                }

                None
            }
        };

        match (int, def.value_range()) {
            (Some(value), Some((min, max))) if value < min || value > max => {
                Some(FieldViolation::OutOfRange {
                    field: field(),
                    min,
                    max,
                    value,
                })
            }
            _ => None,
        }
    }
}

/// A field value that does not satisfy the rules of its definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldViolation {
    #[error("table `{table}` expects {expected} field(s) but {found} were provided")]
    Arity {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("field `{field}` must not be null")]
    Null { field: String },

    #[error("field `{field}` value `{value}` is not an integer")]
    NotAnInteger { field: String, value: String },

    #[error("field `{field}` value {value} is outside of range {min}..={max}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("field `{field}` is {len} characters long, exceeding limit of {max}")]
    TooLong { field: String, max: usize, len: usize },

    #[error("field `{field}` value `{value}` is not a legal identifier")]
    IllegalIdentifier { field: String, value: String },
}
