// Core symbol definitions
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

//! Definitions of the tables understood by the core toolset.

use super::{FieldDefinition as F, FieldType::*, SymbolDefinition as D};

/// Names of core tables.
pub mod tables {
    pub const DIRECTORY: &str = "Directory";
    pub const COMPONENT: &str = "Component";
    pub const FILE: &str = "File";
    pub const FEATURE: &str = "Feature";
    pub const FEATURE_COMPONENTS: &str = "FeatureComponents";
    pub const PROPERTY: &str = "Property";
    pub const CUSTOM_ACTION: &str = "CustomAction";
    pub const BINARY: &str = "Binary";
    pub const INSTALL_EXECUTE_SEQUENCE: &str = "InstallExecuteSequence";
    pub const DIALOG: &str = "Dialog";
    pub const CONTROL: &str = "Control";
    pub const MODULE_SIGNATURE: &str = "ModuleSignature";
    pub const BUNDLE: &str = "WixBundle";
    pub const COMPONENT_GROUP: &str = "WixComponentGroup";
    pub const GROUP: &str = "WixGroup";
}

use tables::*;

/// Component attribute bit marking a 64-bit component.
pub const COMPONENT_ATTRIBUTE_64BIT: i64 = 0x100;

/// Definitions of all core tables.
pub fn core_definitions() -> Vec<D> {
    vec![
        D::new(
            DIRECTORY,
            Some("Directory"),
            vec![
                F::new("Directory_Parent", Identifier)
                    .nullable()
                    .foreign_key(DIRECTORY, 1),
                F::new("DefaultDir", LocalizableString).max_length(255),
            ],
        ),
        D::new(
            COMPONENT,
            Some("Component"),
            vec![
                F::new("ComponentId", String).nullable().max_length(38),
                F::new("Directory_", Identifier).foreign_key(DIRECTORY, 1),
                F::new("Attributes", Integer),
                F::new("Condition", Formatted).nullable(),
                F::new("KeyPath", Identifier).nullable(),
            ],
        ),
        D::new(
            FILE,
            Some("File"),
            vec![
                F::new("Component_", Identifier).foreign_key(COMPONENT, 1),
                F::new("FileName", LocalizableString).max_length(255),
                F::new("FileSize", Integer).nullable().range(0, i32::MAX as i64),
                F::new("Version", String).nullable().max_length(72),
                F::new("Language", String).nullable(),
                F::new("Attributes", Integer).nullable().range(0, 32767),
                F::new("Sequence", Integer).nullable().range(1, 32767),
                F::new("Source", Path),
            ],
        ),
        D::new(
            FEATURE,
            Some("Feature"),
            vec![
                F::new("Feature_Parent", Identifier)
                    .nullable()
                    .foreign_key(FEATURE, 1),
                F::new("Title", LocalizableString).nullable().max_length(64),
                F::new("Description", LocalizableString)
                    .nullable()
                    .max_length(255),
                F::new("Display", Integer).nullable().range(0, 32767),
                F::new("Level", Integer).range(0, 32767),
                F::new("Directory_", Identifier)
                    .nullable()
                    .foreign_key(DIRECTORY, 1),
                F::new("Attributes", Integer).nullable(),
            ],
        ),
        D::new(
            FEATURE_COMPONENTS,
            None,
            vec![
                F::new("Feature_", Identifier)
                    .primary_key()
                    .foreign_key(FEATURE, 1),
                F::new("Component_", Identifier)
                    .primary_key()
                    .foreign_key(COMPONENT, 1),
            ],
        ),
        D::new(
            PROPERTY,
            Some("Property"),
            vec![F::new("Value", LocalizableString)],
        ),
        D::new(
            CUSTOM_ACTION,
            Some("Action"),
            vec![
                F::new("Type", Integer).range(0, 32767),
                F::new("Source", String).nullable().max_length(72),
                F::new("Target", Formatted).nullable(),
            ],
        ),
        D::new(BINARY, Some("Name"), vec![F::new("Data", Path)]),
        D::new(
            INSTALL_EXECUTE_SEQUENCE,
            Some("Action"),
            vec![
                F::new("Condition", Formatted).nullable(),
                F::new("Sequence", Integer).nullable().range(-4, 32767),
                F::new("After", Identifier).nullable(),
                F::new("Before", Identifier).nullable(),
            ],
        )
        .allow_duplicates(),
        D::new(
            DIALOG,
            Some("Dialog"),
            vec![
                F::new("HCentering", Integer).range(0, 100),
                F::new("VCentering", Integer).range(0, 100),
                F::new("Width", Integer).range(0, 32767),
                F::new("Height", Integer).range(0, 32767),
                F::new("Attributes", Integer).nullable(),
                F::new("Title", LocalizableString).nullable().max_length(128),
            ],
        ),
        D::new(
            CONTROL,
            None,
            vec![
                F::new("Dialog_", Identifier)
                    .primary_key()
                    .foreign_key(DIALOG, 1),
                F::new("Control", Identifier).primary_key(),
                F::new("Type", String).max_length(20),
                F::new("X", Integer).range(0, 32767),
                F::new("Y", Integer).range(0, 32767),
                F::new("Width", Integer).range(0, 32767),
                F::new("Height", Integer).range(0, 32767),
                F::new("Attributes", Integer).nullable(),
                F::new("Text", LocalizableString).nullable(),
            ],
        ),
        D::new(
            MODULE_SIGNATURE,
            Some("ModuleID"),
            vec![
                F::new("Language", Integer).range(0, 65535),
                F::new("Version", String).max_length(32),
            ],
        ),
        D::new(
            BUNDLE,
            None,
            vec![
                F::new("Version", String),
                F::new("Name", LocalizableString).nullable(),
                F::new("Manufacturer", LocalizableString).nullable(),
                F::new("UpgradeCode", String).max_length(38),
            ],
        ),
        D::new(COMPONENT_GROUP, Some("WixComponentGroup"), Vec::new())
            .unreal(),
        D::new(
            GROUP,
            None,
            vec![
                F::new("ParentType", String),
                F::new("ParentId", Identifier),
                F::new("ChildType", String),
                F::new("ChildId", Identifier),
            ],
        )
        .unreal(),
    ]
}
