// Standard library of well-known symbols
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

//! Library of well-known symbols linked into every output.
//!
//! The root of every directory tree is [`TARGETDIR`],
//!   and the standard system folders beneath it may be referenced
//!   without being authored.
//! Each folder lives in its own section so that only those referenced
//!   survive the link.

use super::Extension;
use crate::global::TARGETDIR;
use crate::ir::{
    Identifier, Intermediate, IntermediateLevel, Reference, ReferenceKind,
    Section, SectionType, Symbol, SymbolKey,
};
use crate::schema::{tables, SchemaRegistry};

/// Identifier of the standard library intermediate.
pub const STANDARD_LIBRARY_ID: &str = "wixstd";

/// Well-known folders that may appear as children of [`TARGETDIR`].
pub const STANDARD_DIRECTORIES: &[&str] = &[
    "ProgramFilesFolder",
    "ProgramFiles64Folder",
    "CommonFilesFolder",
    "CommonFiles64Folder",
    "SystemFolder",
    "System64Folder",
    "WindowsFolder",
    "DesktopFolder",
    "StartMenuFolder",
    "ProgramMenuFolder",
    "AppDataFolder",
    "LocalAppDataFolder",
    "TempFolder",
    "FontsFolder",
    "PersonalFolder",
];

pub fn is_standard_directory(id: &str) -> bool {
    STANDARD_DIRECTORIES.contains(&id)
}

/// Extension providing the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardLibrary;

impl StandardLibrary {
    fn directory(
        registry: &SchemaRegistry,
        id: &str,
        parent: Option<&str>,
        name: &str,
    ) -> Symbol {
        let def = registry
            .get(tables::DIRECTORY)
            .unwrap_or_else(|| {
                panic!("internal error: missing core table `{}`", tables::DIRECTORY)
            })
            .clone();

        let mut sym = Symbol::new(def, Identifier::public(id), None);
        sym.set_named("Directory_Parent", parent);
        sym.set_named("DefaultDir", name);
        sym
    }
}

impl Extension for StandardLibrary {
    fn name(&self) -> &str {
        STANDARD_LIBRARY_ID
    }

    fn library(&self, registry: &SchemaRegistry) -> Option<Intermediate> {
        let mut lib =
            Intermediate::new(STANDARD_LIBRARY_ID, IntermediateLevel::Library);

        let root = lib.push_section(
            Section::new(SectionType::Fragment, None)
                .with_compilation_id(STANDARD_LIBRARY_ID),
        );
        root.push_symbol(Self::directory(
            registry,
            TARGETDIR,
            None,
            "SourceDir",
        ));

        for &id in STANDARD_DIRECTORIES {
            let section = lib.push_section(
                Section::new(SectionType::Fragment, None)
                    .with_compilation_id(STANDARD_LIBRARY_ID),
            );

            section.push_symbol(Self::directory(
                registry,
                id,
                Some(TARGETDIR),
                id,
            ));
            section.push_reference(
                Reference::new(
                    tables::DIRECTORY,
                    TARGETDIR,
                    ReferenceKind::Simple,
                )
                .from_symbol(SymbolKey::new(tables::DIRECTORY, id)),
            );
        }

        Some(lib)
    }
}
