// Resolver
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

//! Resolution of variables and files in a linked intermediate.
//!
//! The resolver rewrites [`Deferred`] field values in place:
//!
//!   - [`Deferred::Template`] text has its placeholders substituted
//!       (see [`variables`]);
//!   - [`Deferred::SourcePath`] is located using bind paths and resolver
//!       extensions;
//!   - [`Deferred::EmbeddedFile`] is assigned the path to which the binder
//!       will extract it; and
//!   - localized dialogs and controls are applied.
//!
//! Anything that cannot be known until binding
//!   (generated identifiers and GUIDs,
//!     `!(bind.*)` variables,
//!     and files that could not yet be found)
//!   is left deferred and recorded as a [`DelayedField`].
//! This is not an error;
//!   the binder gets its own chance to resolve those values.

mod error;
pub mod variables;

pub use error::ResolveError;
pub use variables::{Resolution, VariableResolver};

use crate::bindpath::{BindPaths, BindStage};
use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::ext::ExtensionRegistry;
use crate::ir::{
    Deferred, FieldValue, Intermediate, IntermediateLevel, Localization,
    LocalizedControl, Symbol,
};
use crate::ld::CultureFilter;
use crate::schema::tables;
use crate::span::Span;
use fxhash::FxHashSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub bind_paths: BindPaths,

    /// Values of `!(wix.NAME)` variables.
    pub variables: BTreeMap<String, String>,

    /// Cultures of the localizations to consult,
    ///   in order of preference.
    pub cultures: CultureFilter,

    /// Leave unknown variables in place rather than failing.
    pub allow_unknown_variables: bool,

    /// Directory beneath which embedded files will be extracted.
    pub intermediate_folder: PathBuf,
}

/// A field whose value can only be computed by the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedField {
    pub section: usize,
    pub symbol: usize,
    pub field: usize,
}

impl DelayedField {
    pub fn target<'a>(&self, intermediate: &'a Intermediate) -> &'a Symbol {
        &intermediate.sections()[self.section].symbols()[self.symbol]
    }

    pub fn value<'a>(&self, intermediate: &'a Intermediate) -> &'a FieldValue {
        self.target(intermediate).field(self.field)
    }

    /// Like [`value`](Self::value),
    ///   but [`None`] if `intermediate` has no such field.
    pub fn get<'a>(&self, intermediate: &'a Intermediate) -> Option<&'a FieldValue> {
        intermediate
            .sections()
            .get(self.section)?
            .symbols()
            .get(self.symbol)?
            .fields()
            .get(self.field)
    }
}

/// An embedded file that the binder must extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedEmbeddedFile {
    pub uri: String,
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    pub intermediate: Intermediate,
    pub delayed_fields: Vec<DelayedField>,
    pub expected_embedded_files: Vec<ExpectedEmbeddedFile>,

    /// Codepage of the most preferred localization declaring one.
    pub codepage: Option<u32>,
}

pub struct Resolver<'a> {
    extensions: &'a ExtensionRegistry,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(extensions: &'a ExtensionRegistry, options: ResolveOptions) -> Self {
        Self {
            extensions,
            options,
        }
    }

    /// Resolve a linked intermediate.
    ///
    /// `localizations` supplement those carried by the intermediate,
    ///   which are preferred.
    pub fn resolve(
        &self,
        mut intermediate: Intermediate,
        localizations: Vec<Localization>,
        messaging: &Messaging,
    ) -> Result<ResolveResult, Aborted> {
        let _span = tracing::info_span!("resolve").entered();
        let mut sink = StageSink::new(messaging, "resolve");

        if intermediate.level() != IntermediateLevel::Linked {
            sink.emit(&ResolveError::InvalidIntermediateLevel {
                id: intermediate.id().into(),
                level: intermediate.level(),
            });
            return Err(sink.abort());
        }

        for ext in self.extensions.resolvers() {
            ext.pre_resolve(&mut intermediate);
        }

        let mut variables = VariableResolver::new();

        for (name, value) in &self.options.variables {
            variables.add_variable("wix", name, value.as_str());
        }

        let all_locs = intermediate
            .localizations()
            .iter()
            .cloned()
            .chain(localizations)
            .collect::<Vec<_>>();
        variables.add_localizations(&self.options.cultures.apply(all_locs), &mut sink);

        let mut state = ResolveState {
            resolver: self,
            variables: &variables,
            sink: &mut sink,
            delayed: Vec::new(),
            expected: Vec::new(),
        };

        // Localized text may itself contain placeholders.
        state.apply_localized_controls(&mut intermediate);
        state.resolve_fields(&mut intermediate);

        let ResolveState {
            delayed, expected, ..
        } = state;

        tracing::info!(delayed = delayed.len(), embedded = expected.len(), "resolved");

        intermediate.set_level(IntermediateLevel::Resolved);

        let mut result = ResolveResult {
            intermediate,
            delayed_fields: delayed,
            expected_embedded_files: expected,
            codepage: variables.codepage(),
        };

        for ext in self.extensions.resolvers() {
            ext.post_resolve(&mut result);
        }

        sink.finish(result)
    }

    fn locate(&self, source: &str, table: &str) -> Option<PathBuf> {
        self.options
            .bind_paths
            .resolve(source, BindStage::Normal)
            .or_else(|| {
                self.extensions
                    .resolvers()
                    .find_map(|ext| ext.resolve_file(source, table, BindStage::Normal))
            })
    }
}

struct ResolveState<'r, 's, 'm> {
    resolver: &'r Resolver<'r>,
    variables: &'r VariableResolver,
    sink: &'s mut StageSink<'m>,
    delayed: Vec<DelayedField>,
    expected: Vec<ExpectedEmbeddedFile>,
}

impl<'r, 's, 'm> ResolveState<'r, 's, 'm> {
    fn resolve_fields(&mut self, intermediate: &mut Intermediate) {
        let names = intermediate
            .embedded_files()
            .iter()
            .map(|f| ((f.uri.clone(), f.index), f.name.clone()))
            .collect::<BTreeMap<_, _>>();

        let mut extracted = FxHashSet::default();

        for (si, section) in intermediate.sections_mut().iter_mut().enumerate() {
            for (yi, sym) in section.symbols_mut().iter_mut().enumerate() {
                let span = sym.span().cloned();
                let table = sym.table().to_string();

                for fi in 0..sym.fields().len() {
                    let Some(deferred) = sym.field(fi).deferred().cloned() else {
                        continue;
                    };

                    let here = DelayedField {
                        section: si,
                        symbol: yi,
                        field: fi,
                    };

                    match deferred {
                        Deferred::Template(text) => {
                            match self.variables.resolve(
                                span.as_ref(),
                                &text,
                                false,
                                !self.resolver.options.allow_unknown_variables,
                            ) {
                                Ok(r) if r.delayed => {
                                    sym.set(fi, Deferred::Template(r.value).into());
                                    self.delayed.push(here);
                                }
                                Ok(r) => sym.set(fi, FieldValue::Str(r.value)),
                                Err(e) => self.sink.emit(&e),
                            }
                        }

                        Deferred::SourcePath(source) => {
                            let source = match self.variables.resolve(
                                span.as_ref(),
                                &source,
                                false,
                                !self.resolver.options.allow_unknown_variables,
                            ) {
                                Ok(r) => r.value,
                                Err(e) => {
                                    self.sink.emit(&e);
                                    continue;
                                }
                            };

                            match self.resolver.locate(&source, &table) {
                                Some(path) => {
                                    sym.set(fi, path_value(&path));
                                }
                                None => {
                                    tracing::debug!(%source, "file not yet found");
                                    sym.set(fi, Deferred::SourcePath(source).into());
                                    self.delayed.push(here);
                                }
                            }
                        }

                        Deferred::EmbeddedFile { uri, index } => {
                            let name = names
                                .get(&(uri.clone(), index))
                                .cloned()
                                .unwrap_or_else(|| index.to_string());
                            let path = self.extraction_path(&uri, index, &name);

                            if extracted.insert((uri.clone(), index)) {
                                self.expected.push(ExpectedEmbeddedFile {
                                    uri,
                                    index,
                                    path: path.clone(),
                                });
                            }

                            sym.set(fi, path_value(&path));
                        }

                        Deferred::GeneratedId { prefix, args } => {
                            if let Some(args) = self.resolve_args(span.as_ref(), &args) {
                                sym.set(fi, Deferred::GeneratedId { prefix, args }.into());
                                self.delayed.push(here);
                            }
                        }

                        Deferred::Guid { args } => {
                            if let Some(args) = self.resolve_args(span.as_ref(), &args) {
                                sym.set(fi, Deferred::Guid { args }.into());
                                self.delayed.push(here);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Substitute the hash inputs of a generated value.
    ///
    /// `bind` placeholders are left for the binder.
    fn resolve_args(&mut self, span: Option<&Span>, args: &[String]) -> Option<Vec<String>> {
        let error_on_unknown = !self.resolver.options.allow_unknown_variables;
        let mut resolved = Vec::with_capacity(args.len());

        for arg in args {
            match self.variables.resolve(span, arg, false, error_on_unknown) {
                Ok(r) => resolved.push(r.value),
                Err(e) => {
                    self.sink.emit(&e);
                    return None;
                }
            }
        }

        Some(resolved)
    }

    fn extraction_path(&self, uri: &str, index: usize, name: &str) -> PathBuf {
        let dir = uri.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "_");

        self.resolver
            .options
            .intermediate_folder
            .join(dir)
            .join(index.to_string())
            .join(name)
    }

    /// Override the position,
    ///   size,
    ///   and text of dialogs and controls.
    fn apply_localized_controls(&mut self, intermediate: &mut Intermediate) {
        let mut used = FxHashSet::default();

        for section in intermediate.sections_mut() {
            for sym in section.symbols_mut() {
                let fields = match sym.table() {
                    tables::DIALOG => ["HCentering", "VCentering", "Width", "Height", "Title"],
                    tables::CONTROL => ["X", "Y", "Width", "Height", "Text"],
                    _ => continue,
                };

                let key = sym.id_str().to_string();
                let Some(control) = self.variables.localized_control(&key) else {
                    continue;
                };

                apply_control(sym, control, fields);
                used.insert(key);
            }
        }

        let mut unused = self
            .variables
            .localized_controls()
            .filter(|(key, _)| !used.contains(*key))
            .collect::<Vec<_>>();
        unused.sort_by_key(|(key, _)| *key);

        for (key, control) in unused {
            self.sink.emit(&ResolveError::LocalizedControlMissing {
                span: control.span.clone(),
                key: key.into(),
            });
        }
    }
}

fn apply_control(sym: &mut Symbol, control: &LocalizedControl, fields: [&str; 5]) {
    let [x, y, width, height, text] = fields;

    let numbers = [(x, control.x), (y, control.y), (width, control.width), (height, control.height)];

    for (name, value) in numbers {
        if let Some(value) = value {
            sym.set_named(name, value);
        }
    }

    if let Some(value) = &control.text {
        sym.set_named(text, value.as_str());
    }
}

fn path_value(path: &Path) -> FieldValue {
    FieldValue::Str(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod test;
