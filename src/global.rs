// System-wide static configuration
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

//! System-wide static configuration.
//!
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities as requirements change.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature.

/// Version marker written to the root of every persisted
///   [`Intermediate`](crate::ir::Intermediate).
///
/// Readers reject files carrying a version greater than this value,
///   since they may contain constructs this version cannot represent.
pub const INTERMEDIATE_VERSION: u32 = 4;

/// Oldest persisted intermediate version that can still be read.
pub const MIN_INTERMEDIATE_VERSION: u32 = 4;

/// Maximum length of an identifier in the installer database.
pub const MAX_IDENTIFIER_LENGTH: usize = 72;

/// Number of characters of an encoded digest used for generated
///   identifiers,
///     before truncation to [`MAX_IDENTIFIER_LENGTH`].
pub const GENERATED_ID_TOKEN_LENGTH: usize = 32;

/// Namespace of core source elements.
pub const SOURCE_NAMESPACE: &str = "http://wixtoolset.org/schemas/v4/wxs";

/// Namespace of localization files.
pub const LOCALIZATION_NAMESPACE: &str =
    "http://wixtoolset.org/schemas/v4/wxl";

/// Namespace written to persisted intermediates.
pub const INTERMEDIATE_NAMESPACE: &str =
    "http://wixtoolset.org/schemas/v4/wixobj";

/// Namespace written to database archives.
pub const DATABASE_NAMESPACE: &str =
    "http://wixtoolset.org/schemas/v4/wixdb";

/// Identifier of the root directory of every product.
pub const TARGETDIR: &str = "TARGETDIR";
