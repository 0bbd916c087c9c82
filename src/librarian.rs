// Librarian
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

//! Combine intermediates into libraries.
//!
//! A library is an intermediate whose sections are left unlinked so that
//!   they can be shipped and reused.
//! When a library is later linked,
//!   only those of its sections that are referenced survive.
//!
//! The librarian may also embed the files referenced by its symbols
//!   (see [`LibraryOptions::bind_files`]),
//!     so that a library can be linked without access to the files from
//!     which it was built.

use crate::bindpath::{BindPaths, BindStage};
use crate::diagnose::{
    Aborted, Annotate, AnnotatedSpan, Diagnostic, MessageCode, Messaging,
    StageSink,
};
use crate::ext::ExtensionRegistry;
use crate::ir::{Deferred, Intermediate, IntermediateLevel, Localization};
use crate::span::Span;
use fxhash::FxHashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct LibraryOptions {
    /// Embed files referenced by symbols into the library.
    pub bind_files: bool,

    /// Where to find those files.
    pub bind_paths: BindPaths,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error(
        "intermediate `{id}` is {level}; only compiled intermediates and \
         libraries may be combined into a library"
    )]
    InvalidIntermediateLevel {
        id: String,
        level: IntermediateLevel,
    },

    #[error("cannot find file `{path}` to embed into library")]
    FileNotFound { span: Option<Span>, path: String },

    #[error("unable to read `{}`: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

impl Diagnostic for LibraryError {
    fn code(&self) -> MessageCode {
        match self {
            Self::InvalidIntermediateLevel { .. } => MessageCode(95),
            Self::FileNotFound { .. } => MessageCode(200),
            Self::Io { .. } => MessageCode(8),
        }
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        match self {
            Self::FileNotFound { span, .. } => vec![
                span.as_ref().error("referenced here"),
                span.as_ref().help("add the directory containing it as a bind path"),
            ],
            _ => vec![],
        }
    }
}

pub struct Librarian<'a> {
    extensions: &'a ExtensionRegistry,
    options: LibraryOptions,
}

impl<'a> Librarian<'a> {
    pub fn new(extensions: &'a ExtensionRegistry, options: LibraryOptions) -> Self {
        Self {
            extensions,
            options,
        }
    }

    /// Combine `intermediates` and `localizations` into a library.
    pub fn combine(
        &self,
        intermediates: Vec<Intermediate>,
        localizations: Vec<Localization>,
        messaging: &Messaging,
    ) -> Result<Intermediate, Aborted> {
        let _span = tracing::info_span!("library").entered();

        let mut sink = StageSink::new(messaging, "library");
        let mut library = Intermediate::with_unique_id(IntermediateLevel::Library);
        let mut sections = Vec::new();

        for intermediate in intermediates {
            match intermediate.level() {
                IntermediateLevel::Compiled | IntermediateLevel::Library => (),
                level => {
                    sink.emit(&LibraryError::InvalidIntermediateLevel {
                        id: intermediate.id().into(),
                        level,
                    });
                    continue;
                }
            }

            for source in intermediate.sources() {
                library.add_source(source.as_str());
            }

            let (parts, locs, embedded) = intermediate.into_parts();
            sections.extend(parts);
            locs.into_iter().for_each(|loc| library.add_localization(loc));
            embedded
                .into_iter()
                .for_each(|file| library.add_embedded_file(file));
        }

        localizations
            .into_iter()
            .for_each(|loc| library.add_localization(loc));

        for ext in self.extensions.librarians() {
            ext.pre_combine(&mut sections);
        }

        library.sections_mut().extend(sections);

        if self.options.bind_files {
            self.bind_files(&mut library, &mut sink);
        }

        for ext in self.extensions.librarians() {
            ext.post_combine(&mut library);
        }

        tracing::info!(
            sections = library.sections().len(),
            embedded = library.embedded_files().len(),
            "combined library"
        );

        sink.finish(library)
    }

    fn locate(&self, source: &str) -> Option<PathBuf> {
        self.options
            .bind_paths
            .resolve(source, BindStage::Normal)
            .or_else(|| {
                self.extensions
                    .librarians()
                    .find_map(|ext| ext.resolve_file(source))
            })
    }

    /// Replace source paths with files embedded into `library`.
    ///
    /// A file referenced by several symbols is embedded once.
    fn bind_files(&self, library: &mut Intermediate, sink: &mut StageSink) {
        let mut pending = Vec::new();

        for (si, section) in library.sections().iter().enumerate() {
            for (yi, sym) in section.symbols().iter().enumerate() {
                for (fi, value) in sym.fields().iter().enumerate() {
                    if let Some(Deferred::SourcePath(source)) = value.deferred() {
                        pending.push((si, yi, fi, source.clone(), sym.span().cloned()));
                    }
                }
            }
        }

        let mut embedded = FxHashMap::<String, Deferred>::default();

        for (si, yi, fi, source, span) in pending {
            let placeholder = match embedded.get(&source) {
                Some(placeholder) => placeholder.clone(),
                None => {
                    let Some(path) = self.locate(&source) else {
                        sink.emit(&LibraryError::FileNotFound { span, path: source });
                        continue;
                    };

                    let data = match fs::read(&path) {
                        Ok(data) => data,
                        Err(e) => {
                            sink.emit(&LibraryError::Io {
                                path,
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    };

                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| source.clone());

                    tracing::debug!(%source, path = %path.display(), "embedding");

                    let placeholder = library.embed_file(name, data);
                    embedded.insert(source, placeholder.clone());
                    placeholder
                }
            };

            library.sections_mut()[si].symbols_mut()[yi].set(fi, placeholder.into());
        }
    }
}
