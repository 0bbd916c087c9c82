// Symbol identifiers
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

//! Symbol identifiers and deterministic identifier generation.

use crate::global::{GENERATED_ID_TOKEN_LENGTH, MAX_IDENTIFIER_LENGTH};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::str::FromStr;
use uuid::Uuid;

/// Visibility of a symbol to the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessModifier {
    /// Visible to every section being linked.
    #[default]
    Public,

    /// Visible only to references within the section that defines it.
    Private,

    /// Visible to every section;
    ///   distinguished from [`Public`](Self::Public) only for the
    ///   benefit of tooling that inspects intermediates.
    Global,
}

impl AccessModifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Global => "global",
        }
    }

    /// Whether symbols with this access are visible outside of their own
    ///   section.
    pub fn is_linkable(self) -> bool {
        !matches!(self, Self::Private)
    }
}

impl FromStr for AccessModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "global" => Ok(Self::Global),
            _ => Err(s.into()),
        }
    }
}

impl Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a symbol along with its visibility.
///
/// The identifier string is [`None`] only for [`Identifier::INVALID`],
///   which is produced in place of an identifier that could not be
///   determined
///     (e.g. a required attribute is missing)
///   so that compilation may continue and report further errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identifier {
    access: AccessModifier,
    id: Option<String>,
}

impl Identifier {
    pub const INVALID: Identifier = Identifier {
        access: AccessModifier::Public,
        id: None,
    };

    pub fn new<S: Into<String>>(access: AccessModifier, id: S) -> Self {
        Self {
            access,
            id: Some(id.into()),
        }
    }

    pub fn public<S: Into<String>>(id: S) -> Self {
        Self::new(AccessModifier::Public, id)
    }

    pub fn private<S: Into<String>>(id: S) -> Self {
        Self::new(AccessModifier::Private, id)
    }

    pub fn access(&self) -> AccessModifier {
        self.access
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => f.write_str(id),
            None => f.write_str("<invalid>"),
        }
    }
}

/// Whether `id` is valid in the identifier grammar of the installer
///   database.
///
/// An identifier begins with an ASCII letter or underscore,
///   continues with ASCII letters,
///     digits,
///     underscores,
///     or periods,
///   and is at most [`MAX_IDENTIFIER_LENGTH`] characters long.
pub fn is_legal_identifier(id: &str) -> bool {
    let mut chars = id.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    id.len() <= MAX_IDENTIFIER_LENGTH
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Each argument is length-prefixed so that no two argument lists share an
///   encoding.
fn encode_args<S: AsRef<str>>(args: &[S]) -> Vec<u8> {
    let mut buf = Vec::new();

    for arg in args {
        let bytes = arg.as_ref().as_bytes();
        buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        buf.extend_from_slice(bytes);
    }

    buf
}

fn digest<S: AsRef<str>>(args: &[S]) -> [u8; 32] {
    Sha256::digest(encode_args(args)).into()
}

/// Generate a stable identifier from a prefix and hash inputs.
///
/// Identical `(prefix, args)` always produce the same identifier,
///   so unchanged inputs produce identical output across builds.
/// The result is a legal identifier provided that `prefix` is a legal
///   identifier no longer than
///   [`MAX_IDENTIFIER_LENGTH`] - [`GENERATED_ID_TOKEN_LENGTH`].
///
/// ```
/// use wixrs::ir::{create_identifier, is_legal_identifier};
///
/// let a = create_identifier("fil", &["INSTALLFOLDER", "app.exe"]);
/// let b = create_identifier("fil", &["INSTALLFOLDER", "app.exe"]);
/// let c = create_identifier("fil", &["INSTALLFOLDER", "app.dll"]);
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert!(a.starts_with("fil"));
/// assert!(is_legal_identifier(&a));
/// ```
pub fn create_identifier<S: AsRef<str>>(prefix: &str, args: &[S]) -> String {
    let token = URL_SAFE_NO_PAD.encode(digest(args)).replace('-', ".");

    let mut id = String::with_capacity(prefix.len() + GENERATED_ID_TOKEN_LENGTH);
    id.push_str(prefix);
    id.push_str(&token[..GENERATED_ID_TOKEN_LENGTH]);
    id.truncate(MAX_IDENTIFIER_LENGTH);
    id
}

/// Namespace of name-based GUIDs generated by [`create_guid`].
const GUID_NAMESPACE: Uuid =
    Uuid::from_u128(0x3064e5c6_b3bd_4b1c_8c33_a2e9a6c4f1d7);

/// Generate a stable, registry-formatted GUID from hash inputs.
pub fn create_guid<S: AsRef<str>>(args: &[S]) -> String {
    format!(
        "{{{}}}",
        Uuid::new_v5(&GUID_NAMESPACE, &encode_args(args))
            .hyphenated()
            .to_string()
            .to_uppercase()
    )
}
