// Intermediates
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

use super::{Deferred, Localization, Section, Symbol};
use crate::diagnose::{AnnotatedSpan, Diagnostic, MessageCode};
use crate::obj::wixobj;
use crate::schema::SchemaRegistry;
use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// How far an [`Intermediate`] has progressed through the toolset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntermediateLevel {
    /// Output of the compiler.
    Compiled,

    /// Output of the librarian:
    ///   compiled sections that have intentionally not been linked.
    Library,

    /// Output of the linker.
    Linked,

    /// Output of the resolver.
    Resolved,
}

impl IntermediateLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compiled => "compiled",
            Self::Library => "library",
            Self::Linked => "linked",
            Self::Resolved => "resolved",
        }
    }
}

impl FromStr for IntermediateLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compiled" => Ok(Self::Compiled),
            "library" => Ok(Self::Library),
            "linked" => Ok(Self::Linked),
            "resolved" => Ok(Self::Resolved),
            _ => Err(s.into()),
        }
    }
}

impl Display for IntermediateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file stored within an intermediate,
///   referenced by fields as [`Deferred::EmbeddedFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// Id of the intermediate that embedded the file.
    pub uri: String,
    pub index: usize,

    /// Original file name,
    ///   used when the file is extracted.
    pub name: String,
    pub data: Vec<u8>,
}

/// The unit exchanged between stages of the toolset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intermediate {
    id: String,
    level: IntermediateLevel,
    sources: Vec<String>,
    sections: Vec<Section>,
    localizations: Vec<Localization>,
    embedded_files: Vec<EmbeddedFile>,
}

impl Intermediate {
    pub fn new<S: Into<String>>(id: S, level: IntermediateLevel) -> Self {
        Self {
            id: id.into(),
            level,
            sources: Vec::new(),
            sections: Vec::new(),
            localizations: Vec::new(),
            embedded_files: Vec::new(),
        }
    }

    /// New intermediate with a unique id.
    pub fn with_unique_id(level: IntermediateLevel) -> Self {
        Self::new(Uuid::new_v4().simple().to_string(), level)
    }

    /// Load a persisted intermediate.
    ///
    /// Definitions used by the intermediate must be known to `registry`
    ///   at a version no older than the one the file was written with.
    pub fn load<P: AsRef<Path>>(
        path: P,
        registry: &SchemaRegistry,
    ) -> Result<Self, IntermediateError> {
        let path = path.as_ref();
        let src = fs::read(path)?;

        let text = std::str::from_utf8(&src).map_err(|e| {
            IntermediateError::corrupt(format!("invalid UTF-8: {e}"))
        });

        text.and_then(|text| wixobj::read(text, registry))
            .map_err(|e| e.at(path))
    }

    /// Persist this intermediate to `path`.
    ///
    /// The file is written to a temporary location and moved into place
    ///   only once complete,
    ///     so a failure never leaves a partial file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IntermediateError> {
        crate::fs::persist_atomic(path.as_ref(), |dest| {
            wixobj::write(self, dest)
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn level(&self) -> IntermediateLevel {
        self.level
    }

    pub fn set_level(&mut self, level: IntermediateLevel) {
        self.level = level;
    }

    /// Source files from which this intermediate was produced.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn add_source<S: Into<String>>(&mut self, source: S) {
        let source = source.into();

        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }

    pub fn push_section(&mut self, section: Section) -> &mut Section {
        self.sections.push(section);

        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// All symbols of all sections,
    ///   in order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.sections.iter().flat_map(Section::symbols)
    }

    pub fn localizations(&self) -> &[Localization] {
        &self.localizations
    }

    pub fn add_localization(&mut self, localization: Localization) {
        self.localizations.push(localization);
    }

    pub fn embedded_files(&self) -> &[EmbeddedFile] {
        &self.embedded_files
    }

    /// Embed a file,
    ///   returning the placeholder by which fields refer to it.
    pub fn embed_file<S: Into<String>>(
        &mut self,
        name: S,
        data: Vec<u8>,
    ) -> Deferred {
        let index = self.embedded_files.len();

        self.embedded_files.push(EmbeddedFile {
            uri: self.id.clone(),
            index,
            name: name.into(),
            data,
        });

        Deferred::EmbeddedFile {
            uri: self.id.clone(),
            index,
        }
    }

    /// Add a file embedded by some other intermediate,
    ///   preserving its identity.
    pub fn add_embedded_file(&mut self, file: EmbeddedFile) {
        self.embedded_files.push(file);
    }

    /// Decompose into sections,
    ///   localizations,
    ///   and embedded files.
    pub fn into_parts(
        self,
    ) -> (Vec<Section>, Vec<Localization>, Vec<EmbeddedFile>) {
        (self.sections, self.localizations, self.embedded_files)
    }
}

#[derive(Debug, Error)]
pub enum IntermediateError {
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The container could not be parsed or is structurally invalid.
    #[error("corrupt intermediate{}: {reason}", describe_path(path))]
    CorruptFile {
        path: Option<PathBuf>,
        reason: String,
    },

    /// The container is intact but was produced by an incompatible
    ///   version of the toolset or for an unknown schema.
    #[error("unexpected file format{}: {reason}", describe_path(path))]
    UnexpectedFileFormat {
        path: Option<PathBuf>,
        reason: String,
    },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" `{}`", path.display()),
        None => String::new(),
    }
}

impl IntermediateError {
    pub fn corrupt<S: Into<String>>(reason: S) -> Self {
        Self::CorruptFile {
            path: None,
            reason: reason.into(),
        }
    }

    pub fn unexpected_format<S: Into<String>>(reason: S) -> Self {
        Self::UnexpectedFileFormat {
            path: None,
            reason: reason.into(),
        }
    }

    /// Associate this error with the file being processed.
    pub fn at<P: AsRef<Path>>(self, at: P) -> Self {
        let at = Some(at.as_ref().to_path_buf());

        match self {
            Self::CorruptFile { reason, .. } => {
                Self::CorruptFile { path: at, reason }
            }
            Self::UnexpectedFileFormat { reason, .. } => {
                Self::UnexpectedFileFormat { path: at, reason }
            }
            io @ Self::Io(_) => io,
        }
    }
}

impl From<quick_xml::Error> for IntermediateError {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            quick_xml::Error::Io(e) => Self::Io(io::Error::new(e.kind(), e)),
            e => Self::corrupt(e.to_string()),
        }
    }
}

impl Diagnostic for IntermediateError {
    fn code(&self) -> MessageCode {
        match self {
            Self::Io(_) => MessageCode(8),
            Self::CorruptFile { .. } => MessageCode(2),
            Self::UnexpectedFileFormat { .. } => MessageCode(3),
        }
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        Vec::new()
    }
}
