// Symbol schema registry
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

use super::{core_definitions, FieldViolation, SymbolDefinition};
use crate::diagnose::{AnnotatedSpan, Diagnostic, MessageCode};
use crate::ir::Symbol;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Lookup of [`SymbolDefinition`]s by table name.
///
/// Iteration is ordered by table name so that anything derived from the
///   registry is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: BTreeMap<String, Arc<SymbolDefinition>>,
}

impl SchemaRegistry {
    /// A registry containing no definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry containing the core definitions.
    pub fn with_core() -> Self {
        let mut registry = Self::new();

        for def in core_definitions() {
            registry
                .register(def)
                .expect("internal error: core table names collide");
        }

        registry
    }

    /// Register a definition.
    ///
    /// Registering a definition identical to one already present is a
    ///   no-op,
    ///     which allows extensions that share a dependency to each
    ///     contribute it.
    pub fn register(
        &mut self,
        def: SymbolDefinition,
    ) -> Result<Arc<SymbolDefinition>, SchemaError> {
        match self.definitions.get(def.name()) {
            Some(existing) if **existing == def => Ok(existing.clone()),
            Some(existing) => Err(SchemaError::Collision {
                name: def.name().into(),
                existing: existing.extension().map(String::from),
                new: def.extension().map(String::from),
            }),
            None => {
                let def = Arc::new(def);
                self.definitions.insert(def.name().into(), def.clone());
                Ok(def)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SymbolDefinition>> {
        self.definitions.get(name)
    }

    /// Look up a definition that must exist.
    pub fn require(
        &self,
        name: &str,
    ) -> Result<Arc<SymbolDefinition>, SchemaError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownDefinition(name.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SymbolDefinition>> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate the fields of `symbol` against the rules of its
    ///   definition.
    pub fn validate_row(&self, symbol: &Symbol) -> Vec<FieldViolation> {
        symbol.definition().validate(symbol.fields())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two definitions claim the same table name.
    #[error(
        "table `{name}` from {} collides with the definition from {}",
        describe_origin(new),
        describe_origin(existing)
    )]
    Collision {
        name: String,
        existing: Option<String>,
        new: Option<String>,
    },

    #[error("no definition for table `{0}`")]
    UnknownDefinition(String),
}

fn describe_origin(ext: &Option<String>) -> String {
    match ext {
        Some(name) => format!("extension `{name}`"),
        None => "the core schema".into(),
    }
}

impl Diagnostic for SchemaError {
    fn code(&self) -> MessageCode {
        match self {
            Self::Collision { .. } => MessageCode(70),
            Self::UnknownDefinition(_) => MessageCode(71),
        }
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        Vec::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{FieldDefinition, FieldType};

    fn ext_def(ext: &str) -> SymbolDefinition {
        SymbolDefinition::new(
            "UtilUser",
            Some("User"),
            vec![FieldDefinition::new("Name", FieldType::Formatted)],
        )
        .with_extension(ext, 2)
    }

    #[test]
    fn core_is_registered() {
        let sut = SchemaRegistry::with_core();

        for name in ["Component", "File", "Directory", "WixGroup"] {
            assert!(sut.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut sut = SchemaRegistry::new();

        let first = sut.register(ext_def("util")).unwrap();
        let second = sut.register(ext_def("util")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, sut.len());
    }

    #[test]
    fn collision_across_extensions() {
        let mut sut = SchemaRegistry::new();
        sut.register(ext_def("util")).unwrap();

        let err = sut.register(ext_def("other")).unwrap_err();

        assert_eq!(
            SchemaError::Collision {
                name: "UtilUser".into(),
                existing: Some("util".into()),
                new: Some("other".into()),
            },
            err
        );
        assert_eq!(
            "table `UtilUser` from extension `other` collides with the \
               definition from extension `util`",
            err.to_string()
        );
    }

    #[test]
    fn collision_with_core() {
        let mut sut = SchemaRegistry::with_core();
        let def =
            SymbolDefinition::new("Property", Some("Property"), Vec::new())
                .with_extension("util", 1);

        assert!(matches!(
            sut.register(def),
            Err(SchemaError::Collision { existing: None, .. })
        ));
    }

    #[test]
    fn require_unknown() {
        assert_eq!(
            Err(SchemaError::UnknownDefinition("Nope".into())),
            SchemaRegistry::new().require("Nope").map(|_| ())
        );
    }
}
