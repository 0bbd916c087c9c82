// Build pipeline
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


//! Build pipeline.
//!
//! A build proceeds through a fixed series of stages,
//!   each represented by its own type so that stages cannot be run out of
//!   order:
//!
//! ```text
//!   Build --compile--> Compiled --link--> Linked --resolve--> Resolved
//!                         |                                      |
//!                         `--library--> Intermediate           bind
//!                                                                |
//!                                          BindResult <--layout-- Bound
//! ```
//!
//! Every stage reports to a single shared [`Messaging`] sink.
//! Before a stage begins,
//!   the sink is checked for errors recorded by any earlier stage
//!   (including errors escalated from warnings);
//!     if there are any,
//!       the build stops with [`Aborted`].
//!
//! Source documents are independent of one another and are compiled in
//!   parallel;
//!     everything after compilation operates on the complete set of
//!     intermediates and is sequential.
//!
//! ```
//! use wixrs::diagnose::Messaging;
//! use wixrs::ext::ExtensionRegistry;
//! use wixrs::pipeline::{Build, SourceFile, Verbatim};
//! use wixrs::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::with_core();
//! let extensions = ExtensionRegistry::with_standard();
//! let messaging = Messaging::default();
//!
//! let sources = vec![SourceFile::new(
//!     "greeting.wxs",
//!     r#"<Wix xmlns="http://wixtoolset.org/schemas/v4/wxs">
//!          <Fragment><Property Id="GREETING" Value="hello" /></Fragment>
//!        </Wix>"#,
//! )];
//!
//! let linked = Build::new(&registry, &extensions, &messaging)
//!     .compile(&sources, &Verbatim, Default::default())
//!     .and_then(|compiled| compiled.link(vec![], Default::default()))
//!     .unwrap();
//!
//! assert_eq!(1, linked.intermediate().symbols().count());
//! ```

use crate::bind::{BindOptions, BindResult, Binder, FsLayout};
use crate::compile::{CompileOptions, Compiler};
use crate::diagnose::{Aborted, Messaging};
use crate::ext::ExtensionRegistry;
use crate::ir::{Intermediate, Localization};
use crate::ld::{LinkOptions, Linker};
use crate::librarian::{Librarian, LibraryOptions};
use crate::resolve::{ResolveOptions, ResolveResult, Resolver};
use crate::schema::SchemaRegistry;
use rayon::prelude::*;
use std::borrow::Cow;

/// A source document to be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new<P: Into<String>, T: Into<String>>(path: P, text: T) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Normalization of a source document before it is compiled.
///
/// Implementations must be safe to call from many threads at once.
pub trait Preprocessor: Sync {
    fn preprocess<'s>(&self, path: &str, text: &'s str) -> Cow<'s, str>;
}

/// Preprocessor that leaves documents untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Preprocessor for Verbatim {
    fn preprocess<'s>(&self, _path: &str, text: &'s str) -> Cow<'s, str> {
        Cow::Borrowed(text)
    }
}

/// Shared state of a build,
///   carried through each stage.
#[derive(Clone, Copy)]
pub struct Build<'a> {
    registry: &'a SchemaRegistry,
    extensions: &'a ExtensionRegistry,
    messaging: &'a Messaging,
}

impl<'a> Build<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        extensions: &'a ExtensionRegistry,
        messaging: &'a Messaging,
    ) -> Self {
        Self {
            registry,
            extensions,
            messaging,
        }
    }

    pub fn messaging(&self) -> &'a Messaging {
        self.messaging
    }

    /// Stop before `stage` if any error has been recorded.
    fn proceed(&self, stage: &'static str) -> Result<(), Aborted> {
        match self.messaging.error_count() {
            0 => Ok(()),
            errors => {
                tracing::debug!(stage, errors, "not proceeding");
                Err(Aborted { stage, errors })
            }
        }
    }

    /// Compile each of `sources` in parallel.
    ///
    /// Every document is compiled even if another fails,
    ///   so that all problems are reported at once.
    pub fn compile(
        self,
        sources: &[SourceFile],
        preprocessor: &dyn Preprocessor,
        options: CompileOptions,
    ) -> Result<Compiled<'a>, Aborted> {
        self.proceed("compile")?;

        let compiler = Compiler::new(self.registry, self.extensions, options);

        let results = sources
            .par_iter()
            .map(|src| {
                let text = preprocessor.preprocess(&src.path, &src.text);
                compiler.compile(&src.path, &text, self.messaging)
            })
            .collect::<Vec<_>>();

        let intermediates = results.into_iter().collect::<Result<Vec<_>, _>>();

        // Report the totals for the stage as a whole,
        //   not only those of the first failed document.
        self.proceed("compile")?;

        Ok(Compiled {
            build: self,
            intermediates: intermediates?,
        })
    }

    /// Begin from intermediates that have already been compiled,
    ///   such as those loaded from object files.
    pub fn compiled(self, intermediates: Vec<Intermediate>) -> Compiled<'a> {
        Compiled {
            build: self,
            intermediates,
        }
    }
}

pub struct Compiled<'a> {
    build: Build<'a>,
    intermediates: Vec<Intermediate>,
}

impl<'a> Compiled<'a> {
    pub fn intermediates(&self) -> &[Intermediate] {
        &self.intermediates
    }

    pub fn into_intermediates(self) -> Vec<Intermediate> {
        self.intermediates
    }

    /// Combine the compiled intermediates into a library.
    pub fn library(
        self,
        localizations: Vec<Localization>,
        options: LibraryOptions,
    ) -> Result<Intermediate, Aborted> {
        let Self {
            build,
            intermediates,
        } = self;

        build.proceed("library")?;

        Librarian::new(build.extensions, options).combine(
            intermediates,
            localizations,
            build.messaging,
        )
    }

    pub fn link(
        self,
        libraries: Vec<Intermediate>,
        options: LinkOptions,
    ) -> Result<Linked<'a>, Aborted> {
        let Self {
            build,
            intermediates,
        } = self;

        build.proceed("link")?;

        let intermediate = Linker::new(build.registry, build.extensions, options).link(
            intermediates,
            libraries,
            build.messaging,
        )?;

        Ok(Linked {
            build,
            intermediate,
        })
    }
}

pub struct Linked<'a> {
    build: Build<'a>,
    intermediate: Intermediate,
}

impl<'a> Linked<'a> {
    pub fn intermediate(&self) -> &Intermediate {
        &self.intermediate
    }

    pub fn into_intermediate(self) -> Intermediate {
        self.intermediate
    }

    pub fn resolve(
        self,
        localizations: Vec<Localization>,
        options: ResolveOptions,
    ) -> Result<Resolved<'a>, Aborted> {
        let Self {
            build,
            intermediate,
        } = self;

        build.proceed("resolve")?;

        let result =
            Resolver::new(build.extensions, options).resolve(intermediate, localizations, build.messaging)?;

        Ok(Resolved { build, result })
    }
}

pub struct Resolved<'a> {
    build: Build<'a>,
    result: ResolveResult,
}

impl<'a> Resolved<'a> {
    pub fn result(&self) -> &ResolveResult {
        &self.result
    }

    pub fn bind(self, options: BindOptions) -> Result<Bound<'a>, Aborted> {
        let Self { build, result } = self;

        build.proceed("bind")?;

        let result = Binder::new(build.registry, build.extensions, options)
            .bind(result, build.messaging)?;

        Ok(Bound { build, result })
    }
}

pub struct Bound<'a> {
    build: Build<'a>,
    result: BindResult,
}

impl<'a> Bound<'a> {
    pub fn result(&self) -> &BindResult {
        &self.result
    }

    /// Transfer the files accompanying the output into place.
    pub fn layout(self) -> Result<BindResult, Aborted> {
        let Self { build, result } = self;

        build.proceed("layout")?;

        FsLayout::new(build.extensions).execute(&result.file_transfers, build.messaging)?;

        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bind::OutputType;
    use crate::diagnose::MessageCode;
    use crate::global::SOURCE_NAMESPACE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Sut {
        registry: SchemaRegistry,
        extensions: ExtensionRegistry,
        messaging: Messaging,
    }

    impl Sut {
        fn new() -> Self {
            Self {
                registry: SchemaRegistry::with_core(),
                extensions: ExtensionRegistry::with_standard(),
                messaging: Messaging::default(),
            }
        }

        fn build(&self) -> Build {
            Build::new(&self.registry, &self.extensions, &self.messaging)
        }
    }

    fn fragment(path: &str, body: &str) -> SourceFile {
        SourceFile::new(
            path,
            format!(r#"<Wix xmlns="{SOURCE_NAMESPACE}"><Fragment>{body}</Fragment></Wix>"#),
        )
    }

    #[test]
    fn compiles_every_source_before_failing() {
        let sut = Sut::new();

        let sources = vec![
            fragment("a.wxs", r#"<Property Id="1bad" Value="a" />"#),
            fragment("b.wxs", r#"<Property Id="Good" Value="b" />"#),
            fragment("c.wxs", r#"<Property Id="2bad" Value="c" />"#),
        ];

        let result = sut.build().compile(&sources, &Verbatim, CompileOptions::default());

        assert!(matches!(
            result.map(|_| ()),
            Err(Aborted { stage: "compile", errors }) if errors >= 2
        ));
        assert!(sut.messaging.messages().iter().any(|m| m.text().contains("2bad")));
    }

    /// Counts the documents that it is given.
    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl Preprocessor for Counting {
        fn preprocess<'s>(&self, _path: &str, text: &'s str) -> Cow<'s, str> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Cow::Owned(text.replace("$(Name)", "Replaced"))
        }
    }

    #[test]
    fn preprocesses_each_source() {
        let sut = Sut::new();
        let preprocessor = Counting::default();

        let sources = vec![
            fragment("a.wxs", r#"<Property Id="A" Value="$(Name)" />"#),
            fragment("b.wxs", r#"<Property Id="B" Value="b" />"#),
        ];

        let linked = sut
            .build()
            .compile(&sources, &preprocessor, CompileOptions::default())
            .and_then(|c| c.link(vec![], LinkOptions::default()))
            .unwrap();

        assert_eq!(2, preprocessor.0.load(Ordering::SeqCst));
        assert!(linked
            .intermediate()
            .symbols()
            .any(|s| s.field_named("Value").and_then(|v| v.as_str()) == Some("Replaced")));
    }

    #[test]
    fn stops_before_stage_after_earlier_errors() {
        let sut = Sut::new();

        let compiled = sut
            .build()
            .compile(
                &[fragment("a.wxs", r#"<Property Id="A" Value="a" />"#)],
                &Verbatim,
                CompileOptions::default(),
            )
            .unwrap();

        // recorded by the caller between stages
        sut.messaging.emit(&crate::bind::BindError::UnknownOutputType);

        assert_eq!(
            Err(Aborted {
                stage: "link",
                errors: 1
            }),
            compiled.link(vec![], LinkOptions::default()).map(|_| ())
        );
        assert_eq!(Some(MessageCode(201)), sut.messaging.last_error_code());
    }

    #[test]
    fn library_from_compiled_sources() {
        let sut = Sut::new();

        let library = sut
            .build()
            .compile(
                &[fragment("a.wxs", r#"<Property Id="A" Value="a" />"#)],
                &Verbatim,
                CompileOptions::default(),
            )
            .and_then(|c| c.library(vec![], LibraryOptions::default()))
            .unwrap();

        assert_eq!(crate::ir::IntermediateLevel::Library, library.level());
    }

    #[test]
    fn builds_library_output_through_every_stage() {
        let sut = Sut::new();
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("out.wixout");

        let result = sut
            .build()
            .compile(
                &[fragment("a.wxs", r#"<Property Id="A" Value="!(wix.Greeting)" />"#)],
                &Verbatim,
                CompileOptions::default(),
            )
            .and_then(|c| c.link(vec![], LinkOptions::default()))
            .and_then(|l| {
                let mut options = ResolveOptions::default();
                options.variables.insert("Greeting".into(), "hi".into());
                l.resolve(vec![], options)
            })
            .and_then(|r| {
                r.bind(BindOptions {
                    output_path: output_path.clone(),
                    output_type: OutputType::Wixout,
                    ..Default::default()
                })
            })
            .and_then(Bound::layout)
            .unwrap_or_else(|e| panic!("{e}: {:?}", sut.messaging.messages()));

        assert_eq!(vec![output_path.clone()], result.outputs);

        let written = Intermediate::load(&output_path, &sut.registry).unwrap();
        assert!(written
            .symbols()
            .any(|s| s.field_named("Value").and_then(|v| v.as_str()) == Some("hi")));
    }
}
