// Extension capabilities
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

//! Extension capabilities.
//!
//! An [`Extension`] contributes behavior to any number of stages of the
//!   toolset.
//! Rather than a plugin discovering mechanism,
//!   extensions are registered explicitly with an [`ExtensionRegistry`],
//!     which each stage queries for the capability it needs.
//!
//! Every hook has a default that does nothing
//!   (or reports that it did not handle the request),
//!   so that an extension implements only what it needs and the core
//!   falls back to its built-in behavior otherwise.
//!
//! Compiler extensions are selected by XML namespace:
//!   elements and attributes in a namespace other than that of the core
//!   source schema are dispatched to each compiler extension declaring
//!   that namespace,
//!     in registration order,
//!     until one of them reports that it handled the node.

mod stdlib;

pub use stdlib::{
    is_standard_directory, StandardLibrary, STANDARD_DIRECTORIES,
    STANDARD_LIBRARY_ID,
};

use crate::bind::{Backend, BindResult, OutputType};
use crate::bindpath::BindStage;
use crate::compile::{CompileContext, ComponentKeyPath, ContextValues};
use crate::ir::{Intermediate, Section};
use crate::resolve::{DelayedField, ResolveResult};
use crate::schema::{SchemaError, SchemaRegistry, SymbolDefinition};
use roxmltree::{Attribute, Node};
use std::io;
use std::path::{Path, PathBuf};

/// Whether an extension hook handled a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T = ()> {
    NotHandled,
    Handled(T),
}

/// Capabilities provided by an extension.
pub trait Extension: Send + Sync {
    /// Name used in diagnostics and to attribute symbol definitions.
    fn name(&self) -> &str;

    /// Definitions of tables introduced by this extension.
    fn symbol_definitions(&self) -> Vec<SymbolDefinition> {
        Vec::new()
    }

    fn compiler(&self) -> Option<&dyn CompilerExtension> {
        None
    }

    fn librarian(&self) -> Option<&dyn LibrarianExtension> {
        None
    }

    fn linker(&self) -> Option<&dyn LinkerExtension> {
        None
    }

    fn resolver(&self) -> Option<&dyn ResolverExtension> {
        None
    }

    fn binder(&self) -> Option<&dyn BinderExtension> {
        None
    }

    /// Library of sections that the linker merges into every link.
    ///
    /// Sections of the library that are not referenced are pruned like
    ///   those of any other library.
    fn library(&self, _registry: &SchemaRegistry) -> Option<Intermediate> {
        None
    }

    /// Backend able to produce output of the given type.
    fn backend(&self, _output: OutputType) -> Option<&dyn Backend> {
        None
    }
}

/// Compile elements and attributes of an extension's namespace.
#[allow(unused_variables)]
pub trait CompilerExtension: Send + Sync {
    /// XML namespace handled by this extension.
    fn namespace(&self) -> &str;

    /// Process an attribute of a core element.
    fn parse_attribute(
        &self,
        ctx: &mut CompileContext,
        element: Node,
        attribute: Attribute,
        values: &ContextValues,
    ) -> ParseOutcome {
        ParseOutcome::NotHandled
    }

    /// Process an element whose parent is `parent`.
    fn parse_element(
        &self,
        ctx: &mut CompileContext,
        parent: Node,
        element: Node,
        values: &ContextValues,
    ) -> ParseOutcome {
        ParseOutcome::NotHandled
    }

    /// Process a child element of a `Component` that may provide the key
    ///   path of that component.
    ///
    /// Defaults to [`parse_element`](Self::parse_element),
    ///   providing no key path.
    fn parse_possible_key_path_element(
        &self,
        ctx: &mut CompileContext,
        parent: Node,
        element: Node,
        values: &ContextValues,
    ) -> ParseOutcome<Option<ComponentKeyPath>> {
        match self.parse_element(ctx, parent, element, values) {
            ParseOutcome::Handled(()) => ParseOutcome::Handled(None),
            ParseOutcome::NotHandled => ParseOutcome::NotHandled,
        }
    }
}

/// Hooks into the creation of libraries.
#[allow(unused_variables)]
pub trait LibrarianExtension: Send + Sync {
    fn pre_combine(&self, sections: &mut Vec<Section>) {}

    fn post_combine(&self, library: &mut Intermediate) {}

    /// Locate a file to be embedded into a library.
    fn resolve_file(&self, source: &str) -> Option<PathBuf> {
        None
    }
}

/// Hooks into linking.
#[allow(unused_variables)]
pub trait LinkerExtension: Send + Sync {
    /// Inspect or modify all collected sections before they are indexed.
    fn pre_combine(&self, sections: &mut Vec<Section>) {}

    /// Inspect or modify the linked output.
    fn post_combine(&self, output: &mut Intermediate) {}
}

/// Hooks into resolution.
#[allow(unused_variables)]
pub trait ResolverExtension: Send + Sync {
    fn pre_resolve(&self, intermediate: &mut Intermediate) {}

    fn post_resolve(&self, result: &mut ResolveResult) {}

    /// Locate a source file that bind paths could not.
    fn resolve_file(
        &self,
        source: &str,
        table: &str,
        stage: BindStage,
    ) -> Option<PathBuf> {
        None
    }
}

/// Hooks into binding and layout.
#[allow(unused_variables)]
pub trait BinderExtension: Send + Sync {
    /// Adjust the intermediate before delayed fields are computed.
    ///
    /// `delayed` locates fields by position;
    ///   a hook that moves or removes symbols must update it to match.
    fn pre_bind(&self, intermediate: &mut Intermediate, delayed: &mut Vec<DelayedField>) {}

    fn post_bind(&self, result: &BindResult) {}

    /// Locate a source file that bind paths could not.
    fn resolve_file(
        &self,
        source: &str,
        table: &str,
        stage: BindStage,
    ) -> Option<PathBuf> {
        None
    }

    /// Compare two files,
    ///   or [`None`] to use the built-in comparison.
    fn compare_files(&self, target: &Path, updated: &Path) -> Option<bool> {
        None
    }

    /// Copy a file,
    ///   returning `false` if the built-in copy should be used instead.
    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<bool> {
        Ok(false)
    }

    /// Move a file,
    ///   returning `false` if the built-in move should be used instead.
    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<bool> {
        Ok(false)
    }
}

/// Ordered collection of extensions queried by capability.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the extensions built into the toolset.
    pub fn with_standard() -> Self {
        let mut registry = Self::new();
        registry.add(Box::new(StandardLibrary));
        registry
    }

    pub fn add(&mut self, extension: Box<dyn Extension>) {
        tracing::debug!(extension = extension.name(), "registered extension");
        self.extensions.push(extension);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Extension> {
        self.extensions.iter().map(AsRef::as_ref)
    }

    /// Register the symbol definitions of every extension.
    ///
    /// This must happen before any stage runs;
    ///   the schema registry is read-only thereafter.
    pub fn register_definitions(
        &self,
        registry: &mut SchemaRegistry,
    ) -> Result<(), SchemaError> {
        for ext in self.iter() {
            for def in ext.symbol_definitions() {
                registry.register(def)?;
            }
        }

        Ok(())
    }

    /// Compiler extensions handling `namespace`,
    ///   in registration order.
    pub fn compilers_for<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a dyn CompilerExtension> {
        self.iter()
            .filter_map(Extension::compiler)
            .filter(move |c| c.namespace() == namespace)
    }

    pub fn librarians(&self) -> impl Iterator<Item = &dyn LibrarianExtension> {
        self.iter().filter_map(Extension::librarian)
    }

    pub fn linkers(&self) -> impl Iterator<Item = &dyn LinkerExtension> {
        self.iter().filter_map(Extension::linker)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &dyn ResolverExtension> {
        self.iter().filter_map(Extension::resolver)
    }

    pub fn binders(&self) -> impl Iterator<Item = &dyn BinderExtension> {
        self.iter().filter_map(Extension::binder)
    }

    /// Libraries contributed by extensions.
    pub fn libraries(&self, registry: &SchemaRegistry) -> Vec<Intermediate> {
        self.iter().filter_map(|ext| ext.library(registry)).collect()
    }

    /// First extension backend able to produce `output`.
    pub fn backend(&self, output: OutputType) -> Option<&dyn Backend> {
        self.iter().find_map(|ext| ext.backend(output))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{FieldDefinition, FieldType};

    struct StubCompiler(&'static str);

    impl CompilerExtension for StubCompiler {
        fn namespace(&self) -> &str {
            self.0
        }
    }

    struct StubExtension {
        name: &'static str,
        compiler: StubCompiler,
    }

    impl Extension for StubExtension {
        fn name(&self) -> &str {
            self.name
        }

        fn symbol_definitions(&self) -> Vec<SymbolDefinition> {
            vec![SymbolDefinition::new(
                "StubRow",
                Some("Id"),
                vec![FieldDefinition::new("Value", FieldType::String)],
            )
            .with_extension(self.name, 1)]
        }

        fn compiler(&self) -> Option<&dyn CompilerExtension> {
            Some(&self.compiler)
        }
    }

    fn stub(name: &'static str, ns: &'static str) -> Box<dyn Extension> {
        Box::new(StubExtension {
            name,
            compiler: StubCompiler(ns),
        })
    }

    #[test]
    fn compilers_selected_by_namespace_in_order() {
        let mut sut = ExtensionRegistry::new();
        sut.add(stub("a", "urn:a"));
        sut.add(stub("b", "urn:b"));
        sut.add(stub("c", "urn:a"));

        let found = sut
            .compilers_for("urn:a")
            .map(|c| c.namespace().to_string())
            .collect::<Vec<_>>();

        assert_eq!(vec!["urn:a", "urn:a"], found);
        assert_eq!(0, sut.compilers_for("urn:none").count());
    }

    #[test]
    fn definitions_are_registered() {
        let mut sut = ExtensionRegistry::new();
        sut.add(stub("a", "urn:a"));

        let mut registry = SchemaRegistry::with_core();
        sut.register_definitions(&mut registry).unwrap();

        assert_eq!(Some("a"), registry.get("StubRow").unwrap().extension());
    }

    #[test]
    fn colliding_extension_definitions_are_rejected() {
        let mut sut = ExtensionRegistry::new();
        sut.add(stub("a", "urn:a"));
        sut.add(stub("b", "urn:b"));

        let mut registry = SchemaRegistry::with_core();

        assert!(matches!(
            sut.register_definitions(&mut registry),
            Err(SchemaError::Collision { .. })
        ));
    }

    #[test]
    fn default_hooks_do_not_handle() {
        struct Bare;
        impl BinderExtension for Bare {}

        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");

        assert_eq!(None, Bare.compare_files(&a, &a));
        assert!(!Bare.copy_file(&a, &a).unwrap());
        assert!(!Bare.move_file(&a, &a).unwrap());
        assert_eq!(None, Bare.resolve_file("a", "File", BindStage::Normal));
    }

    #[test]
    fn standard_registry_provides_library() {
        let sut = ExtensionRegistry::with_standard();
        let registry = SchemaRegistry::with_core();

        assert_eq!(1, sut.libraries(&registry).len());
    }
}
