// Source compiler
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

//! Compile source documents into intermediates.
//!
//! The compiler walks a normalized source document
//!   (the output of any preprocessing)
//!   and produces one [`Intermediate`] per document.
//! Each `Package`, `Module`, `Fragment` or `Bundle` element becomes a
//!   [`Section`](crate::ir::Section) holding the symbols authored within
//!   it and the references those symbols make to symbols that may be
//!   defined elsewhere.
//!
//! Elements and attributes in the core source namespace
//!   ([`SOURCE_NAMESPACE`](crate::global::SOURCE_NAMESPACE))
//!   are handled by the compiler itself;
//!     everything else is dispatched by namespace to registered
//!     [`CompilerExtension`](crate::ext::CompilerExtension)s,
//!       along with [`ContextValues`] identifying the logical parent of
//!       the element.
//!
//! Malformed XML aborts compilation of the document immediately.
//! Every other problem is recorded with the [`Messaging`] sink and
//!   compilation continues,
//!     so that all problems in a document are reported at once;
//!   the intermediate is discarded afterward if any error was recorded.
//!
//! ```
//! use wixrs::compile::{CompileOptions, Compiler};
//! use wixrs::diagnose::Messaging;
//! use wixrs::ext::ExtensionRegistry;
//! use wixrs::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::with_core();
//! let extensions = ExtensionRegistry::with_standard();
//! let compiler = Compiler::new(&registry, &extensions, CompileOptions::default());
//! let messaging = Messaging::default();
//!
//! let src = r#"<Wix xmlns="http://wixtoolset.org/schemas/v4/wxs">
//!   <Fragment>
//!     <Property Id="GREETING" Value="hello" />
//!   </Fragment>
//! </Wix>"#;
//!
//! let intermediate = compiler.compile("greeting.wxs", src, &messaging).unwrap();
//! assert_eq!(1, intermediate.sections().len());
//! assert!(!messaging.encountered_error());
//! ```

mod action;
mod component;
mod context;
mod directory;
mod error;
mod feature;
mod loc;
mod package;
mod ui;

pub use context::CompileContext;
pub use error::CompileError;
pub use loc::parse_localization;

use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::ext::ExtensionRegistry;
use crate::ir::{Intermediate, IntermediateLevel};
use crate::schema::SchemaRegistry;
use crate::span::Span;
use roxmltree::Document;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Processor architecture targeted by a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    #[default]
    X86,
    X64,
    Arm64,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }

    pub fn is_64bit(self) -> bool {
        matches!(self, Self::X64 | Self::Arm64)
    }

    /// Suffix of platform-specific custom action names.
    pub fn action_suffix(self) -> &'static str {
        match self {
            Self::X86 => "X86",
            Self::X64 => "X64",
            Self::Arm64 => "A64",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "intel" => Ok(Self::X86),
            "x64" | "intel64" => Ok(Self::X64),
            "arm64" => Ok(Self::Arm64),
            _ => Err(format!("unknown platform `{s}`")),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`Platform`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Platforms(u8);

impl Platforms {
    pub const NONE: Self = Self(0);
    pub const X86: Self = Self(1);
    pub const X64: Self = Self(2);
    pub const ARM64: Self = Self(4);
    pub const ALL: Self = Self(7);

    pub fn contains(self, platform: Platform) -> bool {
        self.0 & Self::from(platform).0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Platform> for Platforms {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::X86 => Self::X86,
            Platform::X64 => Self::X64,
            Platform::Arm64 => Self::ARM64,
        }
    }
}

impl std::ops::BitOr for Platforms {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub platform: Platform,
}

/// Identifiers inherited from the logical parents of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    DirectoryId,
    ComponentId,
    FileId,
    FeatureId,
    ComponentGroupId,
    Win64,
}

/// Values inherited by nested elements,
///   so that elements handled by extensions can refer to their logical
///   parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextValues(BTreeMap<ContextKey, String>);

impl ContextValues {
    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Copy of these values with `key` set to `value`.
    pub fn with<S: Into<String>>(&self, key: ContextKey, value: S) -> Self {
        let mut values = self.clone();
        values.0.insert(key, value.into());
        values
    }

    /// Copy of these values without `key`.
    pub fn without(&self, key: ContextKey) -> Self {
        let mut values = self.clone();
        values.0.remove(&key);
        values
    }

    pub fn is_win64(&self) -> bool {
        self.get(ContextKey::Win64) == Some("yes")
    }
}

/// What a component's key path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPathType {
    File,
    Directory,
    Registry,
}

/// Key path of a component provided by one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentKeyPath {
    pub id: String,
    pub ty: KeyPathType,

    /// Whether the child was explicitly marked as the key path,
    ///   as opposed to being chosen by default.
    pub explicit: bool,
}

/// Source document compiler.
pub struct Compiler<'a> {
    registry: &'a SchemaRegistry,
    extensions: &'a ExtensionRegistry,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        extensions: &'a ExtensionRegistry,
        options: CompileOptions,
    ) -> Self {
        Self {
            registry,
            extensions,
            options,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile the source document `text` read from `path`.
    pub fn compile(
        &self,
        path: &str,
        text: &str,
        messaging: &Messaging,
    ) -> Result<Intermediate, Aborted> {
        let _span = tracing::debug_span!("compile", path).entered();

        let mut sink = StageSink::new(messaging, "compile");

        let doc = match Document::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                sink.emit(&CompileError::XmlSyntax {
                    span: Span::new(path, e.pos().row),
                    reason: e.to_string(),
                });
                return Err(sink.abort());
            }
        };

        let mut intermediate =
            Intermediate::with_unique_id(IntermediateLevel::Compiled);
        intermediate.add_source(path);

        let mut ctx = CompileContext::new(
            self.registry,
            self.extensions,
            sink,
            intermediate,
            self.options.platform,
            path,
        );

        package::compile_root(&mut ctx, doc.root_element());

        let (intermediate, sink) = ctx.finish();

        tracing::debug!(
            sections = intermediate.sections().len(),
            errors = sink.errors(),
            "compiled"
        );

        sink.finish(intermediate)
    }
}

#[cfg(test)]
mod test;
