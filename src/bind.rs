// Binder
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

//! Binding of resolved intermediates into final output.
//!
//! Binding happens in two passes:
//!
//!   1. Every [`DelayedField`](crate::resolve::DelayedField) left by the
//!        resolver is computed and written back into its symbol
//!        (see [`delayed`]).
//!      Files are located,
//!        `!(bind.*)` variables are substituted,
//!        and generated identifiers and GUIDs are derived from their
//!        inputs.
//!   2. A [`Backend`] chosen by [`OutputType`] writes the output and
//!        lists the files that must accompany it as [`FileTransfer`]s.
//!
//! Backends contributed by extensions are preferred over those built
//!   into the toolset.
//! The binder does not clean up after a failed backend;
//!   any error means that the output as a whole must be discarded.
//!
//! File transfers are carried out separately by [`FsLayout`].

mod backend;
pub mod database;
pub mod delayed;
mod error;
pub mod layout;


pub use backend::{DatabaseBackend, IntermediateBackend};
pub use error::BindError;
pub use layout::FsLayout;

use crate::bindpath::BindPaths;
use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::ext::ExtensionRegistry;
use crate::ir::{Intermediate, IntermediateLevel, SectionType};
use crate::resolve::{ExpectedEmbeddedFile, ResolveResult};
use crate::schema::SchemaRegistry;
use crate::span::Span;
use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of output produced by binding.
///
/// [`OutputType::Unknown`] is never bound;
///   it exists so that an unrecognized type can be reported rather than
///   silently replaced by some default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputType {
    #[default]
    Unknown,
    Library,
    Wixout,
    Bundle,
    Product,
    Module,
    Patch,
    Transform,
    IntermediatePostLink,
}

impl OutputType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Library => "library",
            Self::Wixout => "wixout",
            Self::Bundle => "bundle",
            Self::Product => "product",
            Self::Module => "module",
            Self::Patch => "patch",
            Self::Transform => "transform",
            Self::IntermediatePostLink => "intermediatepostlink",
        }
    }

    /// Output type conventionally produced at `path`,
    ///   judged by its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_ascii_lowercase().as_str() {
                "wixlib" => Self::Library,
                "wixout" => Self::Wixout,
                "exe" => Self::Bundle,
                "msi" => Self::Product,
                "msm" => Self::Module,
                "msp" => Self::Patch,
                "mst" => Self::Transform,
                "wixipl" => Self::IntermediatePostLink,
                _ => Self::Unknown,
            })
            .unwrap_or_default()
    }

    /// Output type produced from an entry section of type `ty`.
    pub fn for_section(ty: SectionType) -> Self {
        match ty {
            SectionType::Product => Self::Product,
            SectionType::Module => Self::Module,
            SectionType::Bundle => Self::Bundle,
            SectionType::Patch => Self::Patch,
            SectionType::PatchCreation | SectionType::Fragment => Self::Unknown,
        }
    }
}

impl FromStr for OutputType {
    type Err = BindError;

    /// Parse either the name of an output type or a file extension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();

        let ty = match lower.as_str() {
            "library" => Self::Library,
            "wixout" => Self::Wixout,
            "bundle" => Self::Bundle,
            "product" | "package" => Self::Product,
            "module" => Self::Module,
            "patch" => Self::Patch,
            "transform" => Self::Transform,
            "intermediatepostlink" => Self::IntermediatePostLink,
            ext => Self::from_path(format!("out.{ext}")),
        };

        match ty {
            Self::Unknown => Err(BindError::UnknownOutputType),
            ty => Ok(ty),
        }
    }
}

impl Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Copy,
    Move,
}

/// A file that must be placed alongside or within the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: TransferKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindResult {
    /// Files written by the backend.
    pub outputs: Vec<PathBuf>,

    pub file_transfers: Vec<FileTransfer>,

    /// Every file that the output depends upon.
    pub content_files: Vec<PathBuf>,
}

/// What a [`Backend`] is given to write its output.
pub struct BackendContext<'a> {
    pub intermediate: &'a Intermediate,
    pub registry: &'a SchemaRegistry,
    pub output_type: OutputType,
    pub output_path: &'a Path,
    pub codepage: Option<u32>,

    /// Validation rules that the backend should not apply.
    pub suppress_ices: &'a [String],
}

/// Writer of some kind of final output.
///
/// A backend reports every problem through `sink`.
pub trait Backend: Send + Sync {
    fn bind(&self, context: &BackendContext, sink: &mut StageSink, result: &mut BindResult);
}

#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    pub output_path: PathBuf,
    pub output_type: OutputType,
    pub bind_paths: BindPaths,

    /// Where embedded files are extracted.
    pub intermediate_folder: PathBuf,

    pub suppress_ices: Vec<String>,
}

pub struct Binder<'a> {
    registry: &'a SchemaRegistry,
    extensions: &'a ExtensionRegistry,
    options: BindOptions,
}

impl<'a> Binder<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        extensions: &'a ExtensionRegistry,
        options: BindOptions,
    ) -> Self {
        Self {
            registry,
            extensions,
            options,
        }
    }

    pub fn bind(&self, resolved: ResolveResult, messaging: &Messaging) -> Result<BindResult, Aborted> {
        let output_type = self.options.output_type;
        let _span = tracing::info_span!("bind", %output_type).entered();

        let mut sink = StageSink::new(messaging, "bind");

        let ResolveResult {
            mut intermediate,
            mut delayed_fields,
            expected_embedded_files,
            codepage,
        } = resolved;

        if intermediate.level() != IntermediateLevel::Resolved {
            sink.emit(&BindError::InvalidIntermediateLevel {
                id: intermediate.id().into(),
                level: intermediate.level(),
            });
            return Err(sink.abort());
        }

        if output_type == OutputType::Unknown {
            sink.emit(&BindError::UnknownOutputType);
            return Err(sink.abort());
        }

        for ext in self.extensions.binders() {
            ext.pre_bind(&mut intermediate, &mut delayed_fields);
        }

        // Anything a hook dropped is still deferred,
        //   which the backend reports.
        delayed_fields.retain(|field| field.get(&intermediate).is_some());

        extract_embedded(&intermediate, &expected_embedded_files, &mut sink);

        delayed::apply(
            &mut intermediate,
            &delayed_fields,
            &self.options.bind_paths,
            self.extensions,
            &mut sink,
        );

        // Backends must never see values that failed to compute.
        if sink.has_errors() {
            return Err(sink.abort());
        }

        let Some(backend) = self
            .extensions
            .backend(output_type)
            .or_else(|| builtin_backend(output_type))
        else {
            sink.emit(&BindError::NoBackend {
                output: output_type,
            });
            return Err(sink.abort());
        };

        let context = BackendContext {
            intermediate: &intermediate,
            registry: self.registry,
            output_type,
            output_path: &self.options.output_path,
            codepage,
            suppress_ices: &self.options.suppress_ices,
        };

        let mut result = BindResult::default();
        backend.bind(&context, &mut sink, &mut result);

        for ext in self.extensions.binders() {
            ext.post_bind(&result);
        }

        tracing::info!(
            outputs = result.outputs.len(),
            transfers = result.file_transfers.len(),
            "bound"
        );

        sink.finish(result)
    }
}

fn builtin_backend(output_type: OutputType) -> Option<&'static dyn Backend> {
    match output_type {
        OutputType::Product | OutputType::Module => Some(&DatabaseBackend),
        OutputType::Library | OutputType::Wixout | OutputType::IntermediatePostLink => {
            Some(&IntermediateBackend)
        }
        _ => None,
    }
}

/// Write each embedded file to the path at which the resolver expects it.
fn extract_embedded(
    intermediate: &Intermediate,
    expected: &[ExpectedEmbeddedFile],
    sink: &mut StageSink,
) {
    for file in expected {
        let Some(embedded) = intermediate
            .embedded_files()
            .iter()
            .find(|e| e.uri == file.uri && e.index == file.index)
        else {
            sink.emit(&BindError::FileNotFound {
                span: None,
                path: format!("{}#{}", file.uri, file.index),
            });
            continue;
        };

        tracing::debug!(path = %file.path.display(), "extracting embedded file");

        let written = file
            .path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&file.path, &embedded.data));

        if let Err(e) = written {
            sink.emit(&BindError::io("extract", &file.path, e));
        }
    }
}
