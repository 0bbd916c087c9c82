// Symbol schema
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

//! Symbol schema registry.
//!
//! Every [`Symbol`](crate::ir::Symbol) is an instance of a
//!   [`SymbolDefinition`],
//!     which describes the ordered, typed fields of a row and the rules
//!     that values of those fields must satisfy.
//! Definitions are pure data:
//!   the registry exposes lookup and validation only.
//!
//! Core definitions and those contributed by extensions share a single
//!   namespace of table names;
//!     a collision is a configuration error caught by
//!     [`SchemaRegistry::register`].
//! The registry is populated before any compilation begins and is
//!   read-only thereafter,
//!     so it may be freely shared between parallel workers.
//!
//! ```
//! use wixrs::schema::{FieldDefinition, FieldType, SchemaRegistry, SymbolDefinition};
//!
//! let mut registry = SchemaRegistry::with_core();
//!
//! let def = SymbolDefinition::new(
//!     "FirewallRule",
//!     Some("Name"),
//!     vec![FieldDefinition::new("Port", FieldType::Integer).range(1, 65535)],
//! )
//! .with_extension("firewall", 1);
//!
//! registry.register(def).unwrap();
//! assert!(registry.get("FirewallRule").is_some());
//!
//! // The table name `File` is owned by the core schema.
//! let dup = SymbolDefinition::new("File", Some("File"), vec![])
//!     .with_extension("firewall", 1);
//! assert!(registry.register(dup).is_err());
//! ```

mod definition;
mod field;
mod registry;
mod standard;

pub use definition::{FieldViolation, SymbolDefinition};
pub use field::{FieldDefinition, FieldType, ForeignKey};
pub use registry::{SchemaError, SchemaRegistry};
pub use standard::{core_definitions, tables, COMPONENT_ATTRIBUTE_64BIT};
