// Tests for source compiler
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
use crate::diagnose::{Level, Message, MessageCode};
use crate::ext::{CompilerExtension, Extension, ParseOutcome};
use crate::global::{SOURCE_NAMESPACE, TARGETDIR};
use crate::ir::{
    create_identifier, Deferred, FieldValue, Identifier, ReferenceKind,
    SectionType, Symbol, SymbolKey,
};
use crate::schema::{
    FieldDefinition, FieldType, SymbolDefinition, COMPONENT_ATTRIBUTE_64BIT,
};
use roxmltree::Node;

const TEST_NS: &str = "urn:test";

struct TestCompiler;

impl CompilerExtension for TestCompiler {
    fn namespace(&self) -> &str {
        TEST_NS
    }

    fn parse_attribute(
        &self,
        _ctx: &mut CompileContext,
        _element: Node,
        attribute: roxmltree::Attribute,
        _values: &ContextValues,
    ) -> ParseOutcome {
        match attribute.name() {
            "Flag" => ParseOutcome::Handled(()),
            _ => ParseOutcome::NotHandled,
        }
    }

    fn parse_element(
        &self,
        ctx: &mut CompileContext,
        _parent: Node,
        element: Node,
        values: &ContextValues,
    ) -> ParseOutcome {
        match element.tag_name().name() {
            "Row" => {
                let span = ctx.span(element);
                let id = element.attribute("Id").unwrap_or("row");
                let sym =
                    ctx.add_symbol("TestRow", Identifier::public(id), Some(span));
                sym.set_named("Component_", values.get(ContextKey::ComponentId));
                ParseOutcome::Handled(())
            }
            _ => ParseOutcome::NotHandled,
        }
    }

    fn parse_possible_key_path_element(
        &self,
        ctx: &mut CompileContext,
        parent: Node,
        element: Node,
        values: &ContextValues,
    ) -> ParseOutcome<Option<ComponentKeyPath>> {
        match element.tag_name().name() {
            "Key" => ParseOutcome::Handled(Some(ComponentKeyPath {
                id: element.attribute("Id").unwrap_or("key").into(),
                ty: KeyPathType::Registry,
                explicit: element.attribute("KeyPath") == Some("yes"),
            })),
            _ => match self.parse_element(ctx, parent, element, values) {
                ParseOutcome::Handled(()) => ParseOutcome::Handled(None),
                ParseOutcome::NotHandled => ParseOutcome::NotHandled,
            },
        }
    }
}

struct TestExtension(TestCompiler);

impl Extension for TestExtension {
    fn name(&self) -> &str {
        "test"
    }

    fn symbol_definitions(&self) -> Vec<SymbolDefinition> {
        vec![SymbolDefinition::new(
            "TestRow",
            Some("Id"),
            vec![FieldDefinition::new("Component_", FieldType::Identifier)
                .nullable()],
        )
        .with_extension("test", 1)]
    }

    fn compiler(&self) -> Option<&dyn CompilerExtension> {
        Some(&self.0)
    }
}

struct Sut {
    registry: SchemaRegistry,
    extensions: ExtensionRegistry,
}

impl Sut {
    fn new() -> Self {
        let mut extensions = ExtensionRegistry::with_standard();
        extensions.add(Box::new(TestExtension(TestCompiler)));

        let mut registry = SchemaRegistry::with_core();
        extensions.register_definitions(&mut registry).unwrap();

        Self {
            registry,
            extensions,
        }
    }

    fn compile_for(
        &self,
        platform: Platform,
        body: &str,
    ) -> (Result<Intermediate, Aborted>, Vec<Message>) {
        let compiler = Compiler::new(
            &self.registry,
            &self.extensions,
            CompileOptions { platform },
        );
        let messaging = Messaging::default();

        let result = compiler.compile("test.wxs", &wxs(body), &messaging);
        (result, messaging.take_messages())
    }

    fn compile(&self, body: &str) -> (Result<Intermediate, Aborted>, Vec<Message>) {
        self.compile_for(Platform::X86, body)
    }
}

/// Wrap `body` in a root element.
///
/// The root occupies the first line so that line numbers of `body`
///   begin at 1.
fn wxs(body: &str) -> String {
    format!(r#"<Wix xmlns="{SOURCE_NAMESPACE}" xmlns:t="{TEST_NS}">{body}</Wix>"#)
}

fn compile_ok(body: &str) -> Intermediate {
    let (result, messages) = Sut::new().compile(body);

    match result {
        Ok(intermediate) => intermediate,
        Err(e) => panic!("{e}: {messages:#?}"),
    }
}

fn codes(messages: &[Message]) -> Vec<u32> {
    messages.iter().map(|m| m.code().0).collect()
}

fn find<'a>(i: &'a Intermediate, table: &str, id: &str) -> &'a Symbol {
    i.symbols()
        .find(|s| s.table() == table && s.id_str() == id)
        .unwrap_or_else(|| panic!("missing {table}:{id}"))
}

fn field<'a>(sym: &'a Symbol, name: &str) -> &'a FieldValue {
    sym.field_named(name).unwrap()
}

fn text(value: &str) -> FieldValue {
    FieldValue::Str(value.into())
}

#[test]
fn fragment_property() {
    let i = compile_ok(r#"<Fragment Id="Props"><Property Id="A" Value="1" /></Fragment>"#);

    assert_eq!(1, i.sections().len());
    assert_eq!(SectionType::Fragment, i.sections()[0].ty());
    assert_eq!(Some("Props"), i.sections()[0].id());
    assert!(i.sections()[0].compilation_id().is_some());

    assert_eq!(&text("1"), field(find(&i, "Property", "A"), "Value"));
    assert_eq!(IntermediateLevel::Compiled, i.level());
    assert_eq!(&["test.wxs".to_string()], i.sources());
}

#[test]
fn each_section_element_is_a_section() {
    let i = compile_ok(
        r#"<Fragment><Property Id="A" Value="1" /></Fragment>
           <Fragment><Property Id="B" Value="2" /></Fragment>"#,
    );

    assert_eq!(2, i.sections().len());
    assert_eq!(
        i.sections()[0].compilation_id(),
        i.sections()[1].compilation_id()
    );
}

#[test]
fn package_properties() {
    let i = compile_ok(
        r#"<Package Name="App" Version="1.0.0" Manufacturer="Acme"
                    UpgradeCode="6f330b47-2577-43ad-9095-1861ba25889b" />"#,
    );

    assert_eq!(SectionType::Product, i.sections()[0].ty());
    assert_eq!(&text("App"), field(find(&i, "Property", "ProductName"), "Value"));
    assert_eq!(&text("0"), field(find(&i, "Property", "ProductLanguage"), "Value"));
    assert_eq!(&text("Acme"), field(find(&i, "Property", "Manufacturer"), "Value"));
    assert_eq!(
        &text("{6F330B47-2577-43AD-9095-1861BA25889B}"),
        field(find(&i, "Property", "UpgradeCode"), "Value")
    );

    assert!(matches!(
        field(find(&i, "Property", "ProductCode"), "Value"),
        FieldValue::Deferred(Deferred::Guid { .. })
    ));
}

#[test]
fn package_requires_name_and_version() {
    let (result, messages) = Sut::new().compile("<Package />");

    assert_eq!(2, result.unwrap_err().errors);
    assert_eq!(vec![10, 10], codes(&messages));
}

#[test]
fn directory_tree() {
    let i = compile_ok(
        r#"<Fragment>
             <StandardDirectory Id="ProgramFilesFolder">
               <Directory Id="INSTALLFOLDER" Name="App">
                 <Directory Name="bin" />
               </Directory>
             </StandardDirectory>
             <Directory Id="DATA" Name="Data" />
           </Fragment>"#,
    );

    let install = find(&i, "Directory", "INSTALLFOLDER");
    assert_eq!(&text("ProgramFilesFolder"), field(install, "Directory_Parent"));
    assert_eq!(&text("App"), field(install, "DefaultDir"));

    let bin_id = create_identifier("dir", &["INSTALLFOLDER", "bin"]);
    let bin = find(&i, "Directory", &bin_id);
    assert_eq!(&text("INSTALLFOLDER"), field(bin, "Directory_Parent"));

    // Top-level directories are rooted at TARGETDIR.
    assert_eq!(&text(TARGETDIR), field(find(&i, "Directory", "DATA"), "Directory_Parent"));

    let targets: Vec<_> = i.sections()[0]
        .references()
        .iter()
        .map(|r| r.target())
        .collect();
    assert_eq!(
        vec![
            SymbolKey::new("Directory", "ProgramFilesFolder"),
            SymbolKey::new("Directory", TARGETDIR),
        ],
        targets
    );
}

#[test]
fn targetdir_and_standard_folders_are_references() {
    let i = compile_ok(
        r#"<Fragment>
             <Directory Id="TARGETDIR" Name="SourceDir">
               <Directory Id="TempFolder">
                 <Directory Id="T" Name="t" />
               </Directory>
             </Directory>
           </Fragment>"#,
    );

    assert_eq!(1, i.symbols().count());
    assert_eq!(&text("TempFolder"), field(find(&i, "Directory", "T"), "Directory_Parent"));
    assert_eq!(2, i.sections()[0].references().len());
}

#[test]
fn targetdir_must_be_source_dir() {
    let (_, messages) = Sut::new().compile(
        r#"<Fragment><Directory Id="TARGETDIR" Name="Elsewhere" /></Fragment>"#,
    );

    assert_eq!(vec![21], codes(&messages));
}

#[test]
fn neutral_standard_directory_follows_platform() {
    let (result, _) = Sut::new().compile_for(
        Platform::X64,
        r#"<Fragment><StandardDirectory Id="ProgramFiles6432Folder" /></Fragment>"#,
    );

    let i = result.unwrap();
    assert_eq!(
        SymbolKey::new("Directory", "ProgramFiles64Folder"),
        i.sections()[0].references()[0].target()
    );
}

#[test]
fn unknown_standard_directory() {
    let (_, messages) = Sut::new()
        .compile(r#"<Fragment><StandardDirectory Id="MyFolder" /></Fragment>"#);

    assert_eq!(vec![21], codes(&messages));
}

const COMPONENT: &str = r#"<Fragment>
  <DirectoryRef Id="INSTALLFOLDER">
    <Component Id="Main">
      <File Source="bin\app.exe" />
      <File Id="Readme" Source="docs/readme.txt" Name="README.txt" />
    </Component>
  </DirectoryRef>
</Fragment>"#;

#[test]
fn component_files_and_key_path() {
    let i = compile_ok(COMPONENT);

    let file_id = create_identifier("fil", &["INSTALLFOLDER", "app.exe"]);
    let file = find(&i, "File", &file_id);
    assert_eq!(&text("Main"), field(file, "Component_"));
    assert_eq!(&text("app.exe"), field(file, "FileName"));
    assert_eq!(
        &FieldValue::Deferred(Deferred::SourcePath("bin\\app.exe".into())),
        field(file, "Source")
    );

    assert_eq!(&text("README.txt"), field(find(&i, "File", "Readme"), "FileName"));

    let component = find(&i, "Component", "Main");
    assert_eq!(&text("INSTALLFOLDER"), field(component, "Directory_"));
    assert_eq!(&text(&file_id), field(component, "KeyPath"));
    assert_eq!(&FieldValue::Number(0), field(component, "Attributes"));
    assert_eq!(
        &FieldValue::Deferred(Deferred::Guid {
            args: vec!["INSTALLFOLDER".into(), file_id.clone()]
        }),
        field(component, "ComponentId")
    );

    // The component precedes its files.
    assert_eq!("Component", i.sections()[0].symbols()[0].table());
}

#[test]
fn file_ids_are_stable_across_compilations() {
    let a = compile_ok(COMPONENT);
    let b = compile_ok(COMPONENT);

    let ids = |i: &Intermediate| {
        i.symbols()
            .filter(|s| s.table() == "File")
            .map(|s| s.id_str().to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(ids(&a), ids(&b));
    assert_ne!(a.id(), b.id());
}

#[test]
fn component_id_defaults_to_key_path_file() {
    let i = compile_ok(
        r#"<Fragment><DirectoryRef Id="D">
             <Component><File Id="Other" Source="a" /><File Id="Key" Source="b" KeyPath="yes" /></Component>
           </DirectoryRef></Fragment>"#,
    );

    let component = find(&i, "Component", "Key");
    assert_eq!(&text("Key"), field(component, "KeyPath"));
}

#[test]
fn literal_guid_and_unmanaged_component() {
    let i = compile_ok(
        r#"<Fragment><DirectoryRef Id="D">
             <Component Id="A" Guid="{c4f1e1a2-3b4c-4d5e-8f90-123456789abc}"><File Source="a" /></Component>
             <Component Id="B" Guid=""><File Source="b" /></Component>
           </DirectoryRef></Fragment>"#,
    );

    assert_eq!(
        &text("{C4F1E1A2-3B4C-4D5E-8F90-123456789ABC}"),
        field(find(&i, "Component", "A"), "ComponentId")
    );
    assert!(field(find(&i, "Component", "B"), "ComponentId").is_null());
}

#[test]
fn component_without_key_path_warns() {
    let (result, messages) = Sut::new().compile(
        r#"<Fragment><DirectoryRef Id="D"><Component Id="Empty" Guid="{c4f1e1a2-3b4c-4d5e-8f90-123456789abc}" /></DirectoryRef></Fragment>"#,
    );

    assert!(result.is_ok());
    assert_eq!(vec![1008], codes(&messages));
    assert_eq!(Level::Warning, messages[0].level());
}

#[test]
fn generated_guid_requires_file_key_path() {
    let (result, messages) = Sut::new().compile(
        r#"<Fragment><DirectoryRef Id="D"><Component Id="Dir" KeyPath="yes" /></DirectoryRef></Fragment>"#,
    );

    assert!(result.is_err());
    assert_eq!(vec![21], codes(&messages));
}

#[test]
fn component_bitness_follows_platform() {
    let body = r#"<Fragment><DirectoryRef Id="D">
        <Component Id="Native"><File Source="a" /></Component>
        <Component Id="Wow" Bitness="always32"><File Source="b" /></Component>
      </DirectoryRef></Fragment>"#;

    let (result, _) = Sut::new().compile_for(Platform::X64, body);
    let i = result.unwrap();

    assert_eq!(
        &FieldValue::Number(COMPONENT_ATTRIBUTE_64BIT),
        field(find(&i, "Component", "Native"), "Attributes")
    );
    assert_eq!(
        &FieldValue::Number(0),
        field(find(&i, "Component", "Wow"), "Attributes")
    );
}

#[test]
fn component_requires_directory() {
    let (_, messages) =
        Sut::new().compile(r#"<Fragment><Component Id="C"><File Source="a" /></Component></Fragment>"#);

    assert_eq!(vec![10], codes(&messages));
}

#[test]
fn duplicate_symbol_in_unit() {
    let (result, messages) = Sut::new().compile(
        "<Fragment>\n<Property Id=\"A\" Value=\"1\" />\n</Fragment>\n\
         <Fragment>\n<Property Id=\"A\" Value=\"2\" />\n</Fragment>",
    );

    assert_eq!(1, result.unwrap_err().errors);
    assert_eq!(vec![30], codes(&messages));

    let annotations = messages[0].annotations();
    assert_eq!(5, annotations[0].span().unwrap().line());
    assert_eq!(2, annotations[1].span().unwrap().line());
    assert_eq!(Level::Note, annotations[1].level());
}

#[test]
fn sequence_rows_may_repeat() {
    let i = compile_ok(
        r#"<Fragment><InstallExecuteSequence>
             <Custom Action="CA" After="InstallFiles" />
             <Custom Action="CA" Before="InstallFinalize">NOT Installed</Custom>
           </InstallExecuteSequence></Fragment>"#,
    );

    let rows: Vec<_> = i
        .symbols()
        .filter(|s| s.table() == "InstallExecuteSequence")
        .collect();
    assert_eq!(2, rows.len());
    assert_eq!(&text("NOT Installed"), field(rows[1], "Condition"));
    assert_eq!(&text("InstallFinalize"), field(rows[1], "Before"));

    let refs = i.sections()[0].references();
    assert_eq!(SymbolKey::new("CustomAction", "CA"), refs[0].target());
    assert_eq!(
        Some(SymbolKey::new("InstallExecuteSequence", "CA")),
        refs[0].from
    );
}

#[test]
fn custom_without_scheduling() {
    let (_, messages) = Sut::new().compile(
        r#"<Fragment><InstallExecuteSequence><Custom Action="CA" /></InstallExecuteSequence></Fragment>"#,
    );

    assert_eq!(vec![11], codes(&messages));
}

#[test]
fn errors_accumulate() {
    let (result, messages) = Sut::new().compile(
        "<Fragment Bogus=\"1\">\n<Nope />\n<Property Value=\"x\" />\n<Property Id=\"9bad\" Value=\"y\" />\n</Fragment>",
    );

    assert_eq!(4, result.unwrap_err().errors);
    assert_eq!(vec![4, 5, 10, 14], codes(&messages));

    let lines: Vec<_> = messages
        .iter()
        .map(|m| m.span().unwrap().line())
        .collect();
    assert_eq!(vec![1, 2, 3, 4], lines);
}

#[test]
fn malformed_xml_aborts() {
    let messaging = Messaging::default();
    let sut = Sut::new();
    let compiler =
        Compiler::new(&sut.registry, &sut.extensions, CompileOptions::default());

    let err = compiler
        .compile("bad.wxs", "<Wix>\n<Fragment>\n</Wix>", &messaging)
        .unwrap_err();

    assert_eq!("compile", err.stage);
    assert_eq!(1, err.errors);

    let messages = messaging.messages();
    assert_eq!(vec![31], codes(&messages));
    assert_eq!(3, messages[0].span().unwrap().line());
}

#[test]
fn invalid_root() {
    let messaging = Messaging::default();
    let sut = Sut::new();
    let compiler =
        Compiler::new(&sut.registry, &sut.extensions, CompileOptions::default());

    assert!(compiler.compile("a.wxs", "<Wix />", &messaging).is_err());
    assert!(compiler
        .compile("b.wxs", r#"<Product xmlns="http://wixtoolset.org/schemas/v4/wxs" />"#, &messaging)
        .is_err());

    assert_eq!(vec![32, 32], codes(&messaging.messages()));
}

#[test]
fn templates_are_deferred() {
    let i = compile_ok(r#"<Fragment><Property Id="P" Value="!(loc.Greeting), !(wix.User)" /></Fragment>"#);

    assert_eq!(
        &FieldValue::Deferred(Deferred::Template(
            "!(loc.Greeting), !(wix.User)".into()
        )),
        field(find(&i, "Property", "P"), "Value")
    );
}

#[test]
fn feature_membership() {
    let i = compile_ok(
        r#"<Fragment>
             <Feature Id="Main" Title="Main" Level="1">
               <ComponentRef Id="A" />
               <ComponentGroupRef Id="G" />
               <Feature Id="Sub" Display="hidden" AllowAbsent="no" />
             </Feature>
             <ComponentGroup Id="G" Directory="INSTALLFOLDER">
               <Component Id="B"><File Source="b" /></Component>
             </ComponentGroup>
           </Fragment>"#,
    );

    let groups: Vec<_> = i
        .symbols()
        .filter(|s| s.table() == "WixGroup")
        .map(|s| {
            s.fields()
                .iter()
                .map(|f| f.as_str().unwrap().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    assert_eq!(
        vec![
            "Feature Main Component A",
            "Feature Main WixComponentGroup G",
            "WixComponentGroup G Component B",
        ],
        groups
    );

    let sub = find(&i, "Feature", "Sub");
    assert_eq!(&text("Main"), field(sub, "Feature_Parent"));
    assert_eq!(&FieldValue::Number(0), field(sub, "Display"));
    assert_eq!(&FieldValue::Number(0x10), field(sub, "Attributes"));
    assert_eq!(&FieldValue::Number(1), field(find(&i, "Feature", "Main"), "Level"));

    assert_eq!(
        &text("INSTALLFOLDER"),
        field(find(&i, "Component", "B"), "Directory_")
    );
    assert!(find(&i, "WixComponentGroup", "G").fields().is_empty());
}

#[test]
fn feature_ref_children() {
    let i = compile_ok(
        r#"<Fragment><FeatureRef Id="Main"><ComponentRef Id="A" /></FeatureRef></Fragment>"#,
    );

    let refs: Vec<_> = i.sections()[0]
        .references()
        .iter()
        .map(|r| r.target())
        .collect();

    assert_eq!(
        vec![
            SymbolKey::new("Feature", "Main"),
            SymbolKey::new("Component", "A")
        ],
        refs
    );
    assert_eq!(1, i.symbols().filter(|s| s.table() == "WixGroup").count());
}

#[test]
fn module_signature_and_no_features() {
    let (result, messages) = Sut::new().compile(
        r#"<Module Id="Shared" Language="1033" Version="1.0"><Feature Id="F" /></Module>"#,
    );

    assert_eq!(vec![5], codes(&messages));
    assert!(result.is_err());

    let i = compile_ok(r#"<Module Id="Shared" Language="1033" Version="1.0" />"#);
    let sig = find(&i, "ModuleSignature", "Shared");
    assert_eq!(SectionType::Module, i.sections()[0].ty());
    assert_eq!(&FieldValue::Number(1033), field(sig, "Language"));
}

#[test]
fn bundle_section() {
    let i = compile_ok(
        r#"<Bundle Name="B" Version="2.0" UpgradeCode="6f330b47-2577-43ad-9095-1861ba25889b" />"#,
    );

    assert_eq!(SectionType::Bundle, i.sections()[0].ty());
    assert_eq!(&text("2.0"), field(find(&i, "WixBundle", "WixBundle"), "Version"));
}

#[test]
fn custom_action_types() {
    let i = compile_ok(
        r#"<Fragment>
             <Binary Id="Helper" SourceFile="helper.dll" />
             <CustomAction Id="Dll" BinaryRef="Helper" DllEntry="Run"
                           Execute="deferred" Impersonate="no" Return="ignore" />
             <CustomAction Id="Exe" FileRef="App" ExeCommand="/quiet" />
             <CustomAction Id="SetProp" Property="P" Value="[X]" />
             <CustomAction Id="SetDir" Directory="D" Value="[X]" Execute="rollback" />
           </Fragment>"#,
    );

    let ty = |id| field(find(&i, "CustomAction", id), "Type").as_number();

    assert_eq!(Some(1 | 0x400 | 0x800 | 0x40), ty("Dll"));
    assert_eq!(Some(18), ty("Exe"));
    assert_eq!(Some(51), ty("SetProp"));
    assert_eq!(Some(35 | 0x500), ty("SetDir"));

    assert_eq!(&text("Run"), field(find(&i, "CustomAction", "Dll"), "Target"));
    assert_eq!(
        &FieldValue::Deferred(Deferred::SourcePath("helper.dll".into())),
        field(find(&i, "Binary", "Helper"), "Data")
    );

    let refs: Vec<_> = i.sections()[0]
        .references()
        .iter()
        .map(|r| r.target())
        .collect();
    assert_eq!(
        vec![
            SymbolKey::new("Binary", "Helper"),
            SymbolKey::new("File", "App"),
            SymbolKey::new("Directory", "D"),
        ],
        refs
    );
}

#[test]
fn custom_action_requires_source() {
    let (_, messages) =
        Sut::new().compile(r#"<Fragment><CustomAction Id="CA" /></Fragment>"#);

    assert_eq!(vec![11], codes(&messages));
}

#[test]
fn platform_scoped_custom_action_reference() {
    let body = r#"<Fragment><CustomActionRef Id="QuietExec" Platforms="x86 x64" /></Fragment>"#;

    let (result, _) = Sut::new().compile_for(Platform::X64, body);
    let i = result.unwrap();
    let reference = &i.sections()[0].references()[0];

    assert_eq!(SymbolKey::new("CustomAction", "QuietExec_X64"), reference.target());
    assert_eq!(ReferenceKind::Simple, reference.kind);

    let (result, messages) = Sut::new().compile_for(Platform::Arm64, body);
    assert!(result.is_err());
    assert_eq!(vec![40], codes(&messages));
}

#[test]
fn dialog_and_controls() {
    let i = compile_ok(
        r#"<Fragment><UI>
             <Dialog Id="Welcome" Width="370" Height="270" Title="!(loc.Title)">
               <Control Id="Next" Type="PushButton" X="236" Y="243" Width="56" Height="17" Text="Next" />
             </Dialog>
           </UI></Fragment>"#,
    );

    let dialog = find(&i, "Dialog", "Welcome");
    assert_eq!(&FieldValue::Number(50), field(dialog, "HCentering"));
    assert!(matches!(
        field(dialog, "Title"),
        FieldValue::Deferred(Deferred::Template(_))
    ));

    let control = find(&i, "Control", "Welcome/Next");
    assert_eq!(&text("Welcome"), field(control, "Dialog_"));
    assert_eq!(&FieldValue::Number(236), field(control, "X"));
}

#[test]
fn symbols_carry_source_lines() {
    let i = compile_ok("<Fragment>\n\n<Property Id=\"A\" Value=\"1\" />\n</Fragment>");

    let span = find(&i, "Property", "A").span().unwrap();
    assert_eq!("test.wxs", span.context().as_str());
    assert_eq!(3, span.line());
}

#[test]
fn extension_elements_receive_context() {
    let i = compile_ok(
        r#"<Fragment><DirectoryRef Id="D">
             <Component Id="C"><File Source="a" /><t:Row Id="R" /></Component>
           </DirectoryRef>
           <t:Row Id="Top" /></Fragment>"#,
    );

    assert_eq!(&text("C"), field(find(&i, "TestRow", "R"), "Component_"));
    assert!(field(find(&i, "TestRow", "Top"), "Component_").is_null());
}

#[test]
fn extension_key_path() {
    let i = compile_ok(
        r#"<Fragment><DirectoryRef Id="D">
             <Component Id="C" Guid=""><File Source="a" /><t:Key Id="Reg" KeyPath="yes" /></Component>
           </DirectoryRef></Fragment>"#,
    );

    assert_eq!(&text("Reg"), field(find(&i, "Component", "C"), "KeyPath"));
}

#[test]
fn extension_attributes() {
    let (result, messages) = Sut::new().compile(
        r#"<Fragment><Property Id="A" Value="1" t:Flag="yes" t:Other="no" /></Fragment>"#,
    );

    assert!(result.is_err());
    assert_eq!(vec![7], codes(&messages));
}

#[test]
fn unhandled_extension_namespace() {
    let (result, messages) = Sut::new().compile(
        r#"<Fragment xmlns:u="urn:unknown"><u:Thing /><t:Unknown /></Fragment>"#,
    );

    assert_eq!(2, result.unwrap_err().errors);
    assert_eq!(vec![6, 6], codes(&messages));
    assert_eq!(MessageCode(6), messages[0].code());
}
