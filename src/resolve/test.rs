// Tests for the resolver
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

use super::*;
use crate::bindpath::BindPath;
use crate::diagnose::MessageCode;
use crate::ext::{Extension, ResolverExtension};
use crate::ir::{Identifier, LocString, Section, SectionType};
use crate::schema::SchemaRegistry;
use crate::span::Span;
use std::fs;

struct Sut {
    registry: SchemaRegistry,
    extensions: ExtensionRegistry,
    options: ResolveOptions,
    messaging: Messaging,
}

impl Sut {
    fn new() -> Self {
        Self {
            registry: SchemaRegistry::with_core(),
            extensions: ExtensionRegistry::new(),
            options: ResolveOptions::default(),
            messaging: Messaging::default(),
        }
    }

    fn linked(&self) -> Intermediate {
        let mut linked = Intermediate::new("linked", IntermediateLevel::Linked);
        linked.push_section(Section::new(SectionType::Product, None));
        linked
    }

    /// Add a symbol to the only section of `linked`.
    fn add<'i>(&self, linked: &'i mut Intermediate, table: &str, id: &str) -> &'i mut Symbol {
        let def = self.registry.get(table).unwrap().clone();
        let span = Some(Span::new("product.wxs", 10));

        linked.sections_mut()[0].push_symbol(Symbol::new(def, Identifier::public(id), span))
    }

    fn resolve(&self, linked: Intermediate, locs: Vec<Localization>) -> Result<ResolveResult, Aborted> {
        Resolver::new(&self.extensions, self.options.clone()).resolve(linked, locs, &self.messaging)
    }

    fn resolve_ok(&self, linked: Intermediate, locs: Vec<Localization>) -> ResolveResult {
        self.resolve(linked, locs)
            .unwrap_or_else(|e| panic!("{e}: {:?}", self.messaging.messages()))
    }
}

fn field<'a>(result: &'a ResolveResult, table: &str, id: &str, name: &str) -> &'a FieldValue {
    result
        .intermediate
        .symbols()
        .find(|s| s.table() == table && s.id_str() == id)
        .and_then(|s| s.field_named(name))
        .unwrap()
}

fn string(value: &str) -> LocString {
    LocString {
        value: value.into(),
        overridable: false,
        span: None,
    }
}

#[test]
fn substitutes_variables_and_localized_strings() {
    let mut sut = Sut::new();
    sut.options.variables.insert("Ver".into(), "2.0".into());

    let mut linked = sut.linked();
    sut.add(&mut linked, "Property", "P")
        .set_named("Value", "!(loc.Greeting), version !(wix.Ver)");

    let mut loc = Localization::new("en-US", Some(1252));
    loc.add_string("Greeting", string("Hello")).unwrap();
    linked.add_localization(loc);

    let result = sut.resolve_ok(linked, vec![]);

    assert_eq!(IntermediateLevel::Resolved, result.intermediate.level());
    assert_eq!(
        &FieldValue::Str("Hello, version 2.0".into()),
        field(&result, "Property", "P", "Value")
    );
    assert!(result.delayed_fields.is_empty());
    assert_eq!(Some(1252), result.codepage);
}

#[test]
fn given_localizations_follow_carried_ones() {
    let sut = Sut::new();

    let mut linked = sut.linked();
    sut.add(&mut linked, "Property", "P").set_named("Value", "!(loc.S)");

    let mut carried = Localization::new("en-US", None);
    carried.add_string("S", string("carried")).unwrap();
    linked.add_localization(carried);

    let mut given = Localization::new("en-US", Some(65001));
    given.add_string("T", string("given")).unwrap();

    let result = sut.resolve_ok(linked, vec![given]);

    assert_eq!(&FieldValue::Str("carried".into()), field(&result, "Property", "P", "Value"));
    assert_eq!(Some(65001), result.codepage);
}

#[test]
fn culture_preference_applies_to_given_localizations() {
    let mut sut = Sut::new();
    sut.options.cultures = CultureFilter::new(["de-DE"]);

    let mut linked = sut.linked();
    sut.add(&mut linked, "Property", "P").set_named("Value", "!(loc.S)");

    let mut neutral = Localization::new("", None);
    neutral.add_string("S", string("neutral")).unwrap();
    let mut german = Localization::new("de-DE", None);
    german.add_string("S", string("deutsch")).unwrap();
    let mut french = Localization::new("fr-FR", None);
    french.add_string("S", string("francais")).unwrap();

    let result = sut.resolve_ok(linked, vec![neutral, french, german]);

    assert_eq!(&FieldValue::Str("deutsch".into()), field(&result, "Property", "P", "Value"));
}

#[test]
fn unknown_variable_is_an_error_unless_allowed() {
    let mut sut = Sut::new();

    let mut linked = sut.linked();
    sut.add(&mut linked, "Property", "P").set_named("Value", "x!(wix.Nope)");

    assert!(sut.resolve(linked.clone(), vec![]).is_err());
    assert_eq!(Some(MessageCode(100)), sut.messaging.last_error_code());
    assert_eq!(Some(&Span::new("product.wxs", 10)), sut.messaging.messages()[0].span());

    sut.options.allow_unknown_variables = true;
    sut.messaging = Messaging::default();

    let result = sut.resolve_ok(linked, vec![]);
    assert_eq!(&FieldValue::Str("x!(wix.Nope)".into()), field(&result, "Property", "P", "Value"));
}

#[test]
fn generated_value_inputs_are_substituted_before_binding() {
    let mut sut = Sut::new();
    sut.options.variables.insert("Ver".into(), "2.0".into());

    let mut linked = sut.linked();
    sut.add(&mut linked, "Property", "P").set_named(
        "Value",
        Deferred::GeneratedId {
            prefix: "id".into(),
            args: vec!["!(loc.Name)-!(wix.Ver)".into(), "!(bind.fileHash.F)".into()],
        },
    );

    let mut loc = Localization::new("en-US", None);
    loc.add_string("Name", string("App")).unwrap();

    let result = sut.resolve_ok(linked, vec![loc]);

    assert_eq!(
        &FieldValue::Deferred(Deferred::GeneratedId {
            prefix: "id".into(),
            args: vec!["App-2.0".into(), "!(bind.fileHash.F)".into()],
        }),
        field(&result, "Property", "P", "Value")
    );
    assert_eq!(1, result.delayed_fields.len());
}

#[test]
fn unknown_variable_in_generated_value_inputs() {
    let sut = Sut::new();

    let mut linked = sut.linked();
    sut.add(&mut linked, "Component", "C").set_named(
        "ComponentId",
        Deferred::Guid {
            args: vec!["!(wix.Nope)".into()],
        },
    );

    assert!(sut.resolve(linked, vec![]).is_err());
    assert_eq!(Some(MessageCode(100)), sut.messaging.last_error_code());
}

#[test]
fn bind_time_values_are_delayed() {
    let sut = Sut::new();

    let mut linked = sut.linked();

    let component = sut.add(&mut linked, "Component", "C");
    component.set_named("ComponentId", Deferred::Guid { args: vec!["dir".into(), "F".into()] });
    component.set_named("Directory_", "INSTALLDIR");

    sut.add(&mut linked, "File", "F")
        .set_named("Source", Deferred::SourcePath("nowhere/app.exe".into()));

    sut.add(&mut linked, "Property", "Hash")
        .set_named("Value", "!(bind.fileHash.F)");

    let result = sut.resolve_ok(linked, vec![]);

    let delayed = result
        .delayed_fields
        .iter()
        .map(|d| (d.target(&result.intermediate).id_str(), d.value(&result.intermediate).clone()))
        .collect::<Vec<_>>();

    let expected: Vec<(&str, FieldValue)> = vec![
        ("C", Deferred::Guid { args: vec!["dir".into(), "F".into()] }.into()),
        ("F", Deferred::SourcePath("nowhere/app.exe".into()).into()),
        ("Hash", Deferred::Template("!(bind.fileHash.F)".into()).into()),
    ];

    assert_eq!(expected, delayed);
    assert!(sut.messaging.messages().is_empty());
}

#[test]
fn sources_found_through_bind_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.exe"), b"MZ").unwrap();

    let mut sut = Sut::new();
    sut.options.bind_paths.add(BindStage::Normal, BindPath::named("bin", dir.path()));
    sut.options.variables.insert("Name".into(), "app".into());

    let mut linked = sut.linked();
    sut.add(&mut linked, "File", "F")
        .set_named("Source", Deferred::SourcePath("!(bindpath.bin)/!(wix.Name).exe".into()));

    let result = sut.resolve_ok(linked, vec![]);

    assert_eq!(
        &path_value(&dir.path().join("app.exe")),
        field(&result, "File", "F", "Source")
    );
    assert!(result.delayed_fields.is_empty());
}

struct Locator(PathBuf);

impl ResolverExtension for Locator {
    fn resolve_file(&self, source: &str, table: &str, _stage: BindStage) -> Option<PathBuf> {
        (source == "virtual.dll" && table == "Binary").then(|| self.0.clone())
    }

    fn post_resolve(&self, result: &mut ResolveResult) {
        result.codepage = Some(932);
    }
}

impl Extension for Locator {
    fn name(&self) -> &str {
        "locator"
    }

    fn resolver(&self) -> Option<&dyn ResolverExtension> {
        Some(self)
    }
}

#[test]
fn resolver_extensions_locate_files() {
    let mut sut = Sut::new();
    sut.extensions.add(Box::new(Locator(PathBuf::from("/opt/virtual.dll"))));

    let mut linked = sut.linked();
    sut.add(&mut linked, "Binary", "B")
        .set_named("Data", Deferred::SourcePath("virtual.dll".into()));

    let result = sut.resolve_ok(linked, vec![]);

    assert_eq!(
        &path_value(Path::new("/opt/virtual.dll")),
        field(&result, "Binary", "B", "Data")
    );
    assert_eq!(Some(932), result.codepage);
}

#[test]
fn embedded_files_are_expected() {
    let mut sut = Sut::new();
    sut.options.intermediate_folder = PathBuf::from("obj");

    let mut linked = sut.linked();
    let placeholder = linked.embed_file("readme.txt", b"hi".to_vec());

    sut.add(&mut linked, "File", "A").set_named("Source", placeholder.clone());
    sut.add(&mut linked, "File", "B").set_named("Source", placeholder);

    let result = sut.resolve_ok(linked, vec![]);
    let path = PathBuf::from("obj").join("linked").join("0").join("readme.txt");

    assert_eq!(
        vec![ExpectedEmbeddedFile {
            uri: "linked".into(),
            index: 0,
            path: path.clone(),
        }],
        result.expected_embedded_files
    );
    assert_eq!(&path_value(&path), field(&result, "File", "A", "Source"));
    assert_eq!(&path_value(&path), field(&result, "File", "B", "Source"));
}

#[test]
fn localized_controls_override_dialogs_and_controls() {
    let sut = Sut::new();

    let mut linked = sut.linked();
    let dialog = sut.add(&mut linked, "Dialog", "Welcome");
    dialog.set_named("Width", 370i64);
    dialog.set_named("Height", 270i64);

    let def = sut.registry.get("Control").unwrap().clone();
    let control = linked.sections_mut()[0].push_symbol(Symbol::new(
        def,
        Identifier::private("Welcome/Title"),
        None,
    ));
    control.set_named("Text", "Welcome");

    let mut loc = Localization::new("", None);
    loc.add_control(
        Localization::control_key("Welcome", None),
        LocalizedControl {
            width: Some(400),
            ..Default::default()
        },
    )
    .unwrap();
    loc.add_control(
        Localization::control_key("Welcome", Some("Title")),
        LocalizedControl {
            text: Some("Willkommen".into()),
            x: Some(5),
            ..Default::default()
        },
    )
    .unwrap();
    linked.add_localization(loc);

    let result = sut.resolve_ok(linked, vec![]);

    assert_eq!(&FieldValue::Number(400), field(&result, "Dialog", "Welcome", "Width"));
    assert_eq!(&FieldValue::Number(270), field(&result, "Dialog", "Welcome", "Height"));
    assert_eq!(
        &FieldValue::Str("Willkommen".into()),
        field(&result, "Control", "Welcome/Title", "Text")
    );
    assert_eq!(&FieldValue::Number(5), field(&result, "Control", "Welcome/Title", "X"));
}

#[test]
fn localized_control_without_target() {
    let sut = Sut::new();

    let mut loc = Localization::new("", None);
    loc.add_control(
        Localization::control_key("Ghost", Some("Button")),
        LocalizedControl {
            span: Some(Span::new("ui.wxl", 3)),
            ..Default::default()
        },
    )
    .unwrap();

    let mut linked = sut.linked();
    linked.add_localization(loc);

    assert!(sut.resolve(linked, vec![]).is_err());

    let messages = sut.messaging.messages();
    assert_eq!(MessageCode(103), messages[0].code());
    assert_eq!(Some(&Span::new("ui.wxl", 3)), messages[0].span());
}

#[test]
fn rejects_unlinked_input() {
    let sut = Sut::new();

    let err = sut
        .resolve(Intermediate::new("obj", IntermediateLevel::Compiled), vec![])
        .unwrap_err();

    assert_eq!("resolve", err.stage);
    assert_eq!(Some(MessageCode(95)), sut.messaging.last_error_code());
}
