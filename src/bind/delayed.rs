// Bind-time computation of delayed fields
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

//! Computation of values that could not be known before binding.
//!
//! Fields are processed in dependency order:
//!   files are located first,
//!     so that `!(bind.*)` variables describing those files can then be
//!     computed,
//!   followed by generated identifiers and GUIDs.
//!
//! Bind variables take the form `!(bind.KIND.ID)`:
//!
//! | Kind            | Value                                          |
//! |-----------------|------------------------------------------------|
//! | `fileHash`      | SHA-256 of the source of `File` `ID`, as hex   |
//! | `fileSize`      | Size in bytes of that same source              |
//! | `fileName`      | `FileName` of `File` `ID`                      |
//! | `directoryPath` | Path of `Directory` `ID` relative to `TARGETDIR` |
//! | `property`      | `Value` of `Property` `ID`                     |

use super::BindError;
use crate::bindpath::{BindPaths, BindStage};
use crate::diagnose::StageSink;
use crate::ext::ExtensionRegistry;
use crate::ir::{
    create_guid, create_identifier, Deferred, FieldValue, Intermediate,
    Symbol, SymbolKey,
};
use crate::resolve::DelayedField;
use crate::schema::tables;
use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::Path;

const BIND_PREFIX: &str = "!(bind.";

/// Limit on the depth of directory nesting followed by `directoryPath`.
const MAX_DIRECTORY_DEPTH: usize = 128;

/// Hex-encoded SHA-256 digest of the file at `path`.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;

    Ok(hex::encode(hasher.finalize()))
}

/// Compute every delayed field of `intermediate`,
///   reporting those that cannot be computed.
pub fn apply(
    intermediate: &mut Intermediate,
    delayed: &[DelayedField],
    bind_paths: &BindPaths,
    extensions: &ExtensionRegistry,
    sink: &mut StageSink,
) {
    locate_files(intermediate, delayed, bind_paths, extensions, sink);

    let updates = {
        let vars = BindVariables::new(intermediate);

        delayed
            .iter()
            .filter_map(|field| {
                let sym = field.target(intermediate);

                let value = match field.value(intermediate).deferred()? {
                    Deferred::Template(text) => substitute(text, &vars).map_err(|what| (sym, what)),
                    Deferred::GeneratedId { prefix, args } => substitute_all(args, &vars)
                        .map(|args| create_identifier(prefix, &args))
                        .map_err(|what| (sym, what)),
                    Deferred::Guid { args } => substitute_all(args, &vars)
                        .map(|args| create_guid(&args))
                        .map_err(|what| (sym, what)),
                    // already reported while locating files
                    Deferred::SourcePath(_) => return None,
                    other => Err((sym, other.to_string())),
                };

                Some((*field, value.map_err(|(sym, what)| unresolved(sym, what))))
            })
            .collect::<Vec<_>>()
    };

    for (field, value) in updates {
        match value {
            Ok(value) => {
                intermediate.sections_mut()[field.section].symbols_mut()[field.symbol]
                    .set(field.field, FieldValue::Str(value));
            }
            Err(e) => sink.emit(&e),
        }
    }
}

fn unresolved(sym: &Symbol, what: String) -> BindError {
    BindError::UnresolvedDeferred {
        span: sym.span().cloned(),
        table: sym.table().into(),
        id: sym.id_str().into(),
        what,
    }
}

/// Locate source files that the resolver could not.
fn locate_files(
    intermediate: &mut Intermediate,
    delayed: &[DelayedField],
    bind_paths: &BindPaths,
    extensions: &ExtensionRegistry,
    sink: &mut StageSink,
) {
    for field in delayed {
        let sym = &mut intermediate.sections_mut()[field.section].symbols_mut()[field.symbol];

        let Some(Deferred::SourcePath(source)) = sym.field(field.field).deferred().cloned() else {
            continue;
        };

        let found = bind_paths.resolve(&source, BindStage::Normal).or_else(|| {
            extensions
                .binders()
                .find_map(|ext| ext.resolve_file(&source, sym.table(), BindStage::Normal))
        });

        match found {
            Some(path) => {
                tracing::trace!(%source, path = %path.display(), "located");
                sym.set(field.field, FieldValue::Str(path.to_string_lossy().into_owned()));
            }
            None => sink.emit(&BindError::FileNotFound {
                span: sym.span().cloned(),
                path: source,
            }),
        }
    }
}

/// Substitute every `!(bind.KIND.ID)` of `text`.
///
/// On failure,
///   returns a description of the variable that could not be computed.
fn substitute(text: &str, vars: &BindVariables) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(BIND_PREFIX) {
        out.push_str(&rest[..start]);

        let after = &rest[start + BIND_PREFIX.len()..];
        let end = after
            .find(')')
            .ok_or_else(|| format!("unterminated variable in `{text}`"))?;
        let expr = &after[..end];

        let value = expr
            .split_once('.')
            .and_then(|(kind, id)| vars.value(kind, id))
            .ok_or_else(|| format!("`!(bind.{expr})`"))?;

        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn substitute_all(args: &[String], vars: &BindVariables) -> Result<Vec<String>, String> {
    args.iter().map(|arg| substitute(arg, vars)).collect()
}

/// Values of bind variables,
///   computed from the intermediate being bound.
pub struct BindVariables<'i> {
    symbols: FxHashMap<SymbolKey, &'i Symbol>,
}

impl<'i> BindVariables<'i> {
    pub fn new(intermediate: &'i Intermediate) -> Self {
        let mut symbols = FxHashMap::default();

        for sym in intermediate.symbols() {
            symbols.entry(sym.key()).or_insert(sym);
        }

        Self { symbols }
    }

    /// Value of `!(bind.KIND.ID)`,
    ///   or [`None`] if it is unknown or cannot be computed.
    pub fn value(&self, kind: &str, id: &str) -> Option<String> {
        match kind {
            "fileHash" => hash_file(Path::new(self.file_source(id)?)).ok(),
            "fileSize" => fs::metadata(self.file_source(id)?)
                .ok()
                .map(|meta| meta.len().to_string()),
            "fileName" => self.literal(tables::FILE, id, "FileName"),
            "directoryPath" => self.directory_path(id),
            "property" => self.literal(tables::PROPERTY, id, "Value"),
            _ => None,
        }
    }

    fn get(&self, table: &str, id: &str) -> Option<&'i Symbol> {
        self.symbols.get(&SymbolKey::new(table, id)).copied()
    }

    fn literal(&self, table: &str, id: &str, field: &str) -> Option<String> {
        self.get(table, id)?.field_named(field)?.literal()
    }

    fn file_source(&self, id: &str) -> Option<&'i str> {
        self.get(tables::FILE, id)?.field_named("Source")?.as_str()
    }

    /// Path of a directory relative to the root of the installation.
    ///
    /// Only the long form of a `short|long` name is used,
    ///   and `.` or `SourceDir` contribute nothing.
    fn directory_path(&self, id: &str) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = Some(id.to_string());

        for _ in 0..MAX_DIRECTORY_DEPTH {
            let Some(id) = current.take() else {
                parts.reverse();
                return Some(parts.join("\\"));
            };

            let dir = self.get(tables::DIRECTORY, &id)?;
            let name = dir.field_named("DefaultDir")?.literal()?;
            let name = name.rsplit('|').next().unwrap_or_default();

            if !matches!(name, "" | "." | "SourceDir") {
                parts.push(name.to_string());
            }

            current = dir.field_named("Directory_Parent")?.literal();
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::{MessageCode, Messaging};
    use crate::ir::{Identifier, IntermediateLevel, Section, SectionType};
    use crate::schema::SchemaRegistry;

    struct Sut {
        registry: SchemaRegistry,
        intermediate: Intermediate,
    }

    impl Sut {
        fn new() -> Self {
            let mut intermediate = Intermediate::new("out", IntermediateLevel::Resolved);
            intermediate.push_section(Section::new(SectionType::Product, None));

            Self {
                registry: SchemaRegistry::with_core(),
                intermediate,
            }
        }

        fn add(&mut self, table: &str, id: &str, fields: &[(&str, FieldValue)]) -> DelayedField {
            let def = self.registry.get(table).unwrap().clone();
            let section = &mut self.intermediate.sections_mut()[0];
            let sym = section.push_symbol(Symbol::new(def.clone(), Identifier::public(id), None));

            for (name, value) in fields {
                sym.set_named(name, value.clone());
            }

            DelayedField {
                section: 0,
                symbol: section.symbols().len() - 1,
                field: fields
                    .first()
                    .and_then(|(name, _)| def.field_index(name))
                    .unwrap_or(0),
            }
        }

        fn dir(&mut self, id: &str, parent: Option<&str>, name: &str) {
            self.add(
                tables::DIRECTORY,
                id,
                &[
                    ("Directory_Parent", parent.into()),
                    ("DefaultDir", name.into()),
                ],
            );
        }

        fn apply(&mut self, delayed: &[DelayedField], bind_paths: &BindPaths) -> Messaging {
            let messaging = Messaging::default();
            let mut sink = StageSink::new(&messaging, "bind");

            apply(
                &mut self.intermediate,
                delayed,
                bind_paths,
                &ExtensionRegistry::new(),
                &mut sink,
            );

            messaging
        }

        fn value(&self, field: DelayedField) -> &FieldValue {
            field.value(&self.intermediate)
        }
    }

    #[test]
    fn hash_is_sha256_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();

        assert_eq!(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            hash_file(&path).unwrap()
        );
    }

    #[test]
    fn file_variables_after_locating_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.exe"), "abc").unwrap();

        let mut bind_paths = BindPaths::new();
        bind_paths.add(BindStage::Normal, crate::bindpath::BindPath::unnamed(dir.path()));

        let mut sut = Sut::new();
        let source = sut.add(
            tables::FILE,
            "App",
            &[
                ("Source", Deferred::SourcePath("app.exe".into()).into()),
                ("FileName", "app.exe".into()),
            ],
        );
        let desc = sut.add(
            tables::PROPERTY,
            "Desc",
            &[(
                "Value",
                "!(bind.fileName.App):!(bind.fileSize.App):!(bind.fileHash.App)".into(),
            )],
        );

        let messaging = sut.apply(&[source, desc], &bind_paths);

        assert!(messaging.messages().is_empty(), "{:?}", messaging.messages());
        assert_eq!(
            &FieldValue::Str(
                "app.exe:3:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".into()
            ),
            sut.value(desc)
        );
        assert_eq!(
            &FieldValue::Str(dir.path().join("app.exe").to_string_lossy().into_owned()),
            sut.value(source)
        );
    }

    #[test]
    fn directory_path_and_property() {
        let mut sut = Sut::new();
        sut.dir("TARGETDIR", None, "SourceDir");
        sut.dir("ProgramFilesFolder", Some("TARGETDIR"), "PFiles");
        sut.dir("INSTALLDIR", Some("ProgramFilesFolder"), "APP|My App");
        sut.add(tables::PROPERTY, "Company", &[("Value", "Acme".into())]);

        let field = sut.add(
            tables::PROPERTY,
            "Where",
            &[("Value", "!(bind.property.Company) in !(bind.directoryPath.INSTALLDIR)".into())],
        );

        let messaging = sut.apply(&[field], &BindPaths::new());

        assert!(messaging.messages().is_empty());
        assert_eq!(&FieldValue::Str("Acme in PFiles\\My App".into()), sut.value(field));
    }

    #[test]
    fn generated_values_are_deterministic() {
        let mut sut = Sut::new();

        let guid = Deferred::Guid {
            args: vec!["INSTALLDIR".into(), "App".into()],
        };
        let id = Deferred::GeneratedId {
            prefix: "fil".into(),
            args: vec!["INSTALLDIR".into(), "app.exe".into()],
        };

        let a = sut.add(tables::COMPONENT, "A", &[("ComponentId", guid.clone().into())]);
        let b = sut.add(tables::COMPONENT, "B", &[("ComponentId", guid.into())]);
        let c = sut.add(tables::PROPERTY, "C", &[("Value", id.into())]);

        sut.apply(&[a, b, c], &BindPaths::new());

        let expected_guid = create_guid(&["INSTALLDIR", "App"]);
        assert_eq!(&FieldValue::Str(expected_guid.clone()), sut.value(a));
        assert_eq!(&FieldValue::Str(expected_guid), sut.value(b));
        assert_eq!(
            &FieldValue::Str(create_identifier("fil", &["INSTALLDIR", "app.exe"])),
            sut.value(c)
        );
    }

    #[test]
    fn generated_values_hash_bind_variables() {
        let generate = |content: &str| {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("app.exe"), content).unwrap();

            let mut bind_paths = BindPaths::new();
            bind_paths.add(BindStage::Normal, crate::bindpath::BindPath::unnamed(dir.path()));

            let mut sut = Sut::new();
            let source = sut.add(
                tables::FILE,
                "F",
                &[("Source", Deferred::SourcePath("app.exe".into()).into())],
            );
            let id = sut.add(
                tables::PROPERTY,
                "Id",
                &[(
                    "Value",
                    Deferred::GeneratedId {
                        prefix: "id".into(),
                        args: vec!["!(bind.fileHash.F)".into()],
                    }
                    .into(),
                )],
            );
            let guid = sut.add(
                tables::COMPONENT,
                "C",
                &[(
                    "ComponentId",
                    Deferred::Guid {
                        args: vec!["!(bind.fileHash.F)".into()],
                    }
                    .into(),
                )],
            );

            let messaging = sut.apply(&[source, id, guid], &bind_paths);
            assert!(messaging.messages().is_empty(), "{:?}", messaging.messages());

            (sut.value(id).clone(), sut.value(guid).clone())
        };

        let (id_a, guid_a) = generate("aaa");
        let (id_b, guid_b) = generate("bbb");

        assert_ne!(id_a, id_b);
        assert_ne!(guid_a, guid_b);
        assert_eq!((id_a, guid_a), generate("aaa"));
    }

    #[test]
    fn generated_value_with_unknown_bind_variable() {
        let mut sut = Sut::new();
        let id = sut.add(
            tables::PROPERTY,
            "Id",
            &[(
                "Value",
                Deferred::GeneratedId {
                    prefix: "id".into(),
                    args: vec!["!(bind.fileHash.Missing)".into()],
                }
                .into(),
            )],
        );

        let messaging = sut.apply(&[id], &BindPaths::new());

        assert_eq!(Some(MessageCode(202)), messaging.last_error_code());
        assert!(messaging.messages()[0].text().contains("!(bind.fileHash.Missing)"));
    }

    #[test]
    fn unknown_bind_variable_and_missing_file() {
        let mut sut = Sut::new();

        let missing = sut.add(
            tables::FILE,
            "Gone",
            &[("Source", Deferred::SourcePath("gone.exe".into()).into())],
        );
        let unknown = sut.add(tables::PROPERTY, "P", &[("Value", "!(bind.nope.X)".into())]);

        let messaging = sut.apply(&[missing, unknown], &BindPaths::new());
        let codes = messaging
            .messages()
            .iter()
            .map(|m| m.code())
            .collect::<Vec<_>>();

        assert_eq!(vec![MessageCode(200), MessageCode(202)], codes);
        assert!(messaging.messages()[1].text().contains("!(bind.nope.X)"));
    }
}
