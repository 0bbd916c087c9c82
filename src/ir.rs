// Intermediate document model
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

//! Intermediate document model.
//!
//! An [`Intermediate`] is the unit exchanged between stages of the
//!   toolset:
//!     the compiler produces one per source file,
//!     the librarian bundles many into a library,
//!     and the linker merges many into one.
//!
//! An intermediate is a list of [`Section`]s,
//!   each holding [`Symbol`]s
//!     (rows of a table described by a
//!       [`SymbolDefinition`](crate::schema::SymbolDefinition))
//!   and [`Reference`]s to symbols that may live in any other section.
//! References are symbolic;
//!   they are resolved by lookup of `(table, id)` at link time and never
//!   hold pointers,
//!     so reference cycles between sections are representable without
//!     issue.
//!
//! Field values that cannot be known at compile time are held as
//!   [`Deferred`] placeholders that later stages rewrite in place.
//! See [`FieldValue`] for the lifecycle of a value.

mod field;
mod identifier;
mod intermediate;
mod localization;
mod section;
mod symbol;

pub use field::{Deferred, FieldValue};
pub use identifier::{
    create_guid, create_identifier, is_legal_identifier, AccessModifier,
    Identifier,
};
pub use intermediate::{
    EmbeddedFile, Intermediate, IntermediateError, IntermediateLevel,
};
pub use localization::{LocString, Localization, LocalizedControl};
pub use section::{Reference, ReferenceKind, Section, SectionType};
pub use symbol::{Symbol, SymbolKey};
