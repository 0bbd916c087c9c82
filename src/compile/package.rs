// Root and section elements
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

use super::context::GuidValue;
use super::{
    action, component, directory, feature, ui, CompileContext, CompileError,
    ContextKey, ContextValues,
};
use crate::global::SOURCE_NAMESPACE;
use crate::ir::{Deferred, FieldValue, Identifier, SectionType};
use crate::schema::tables;
use crate::span::Span;
use roxmltree::Node;

pub(super) fn compile_root(ctx: &mut CompileContext, root: Node) {
    let tag = root.tag_name();

    if tag.name() != "Wix" || tag.namespace() != Some(SOURCE_NAMESPACE) {
        let span = ctx.span(root);
        ctx.emit(CompileError::InvalidRoot {
            span,
            expected: "Wix",
            found: match tag.namespace() {
                Some(ns) => format!("{{{ns}}}{}", tag.name()),
                None => tag.name().into(),
            },
        });
        return;
    }

    let win64 = if ctx.platform().is_64bit() { "yes" } else { "no" };
    let values = ContextValues::default().with(ContextKey::Win64, win64);

    ctx.check_attributes(root, &[], &values);

    ctx.each_child(root, &values, |ctx, child, name| {
        match name {
            "Package" => compile_package(ctx, child, &values),
            "Module" => compile_module(ctx, child, &values),
            "Fragment" => compile_fragment(ctx, child, &values),
            "Bundle" => compile_bundle(ctx, child, &values),
            _ => return false,
        }

        ctx.end_section();
        true
    });
}

/// Compile a child of a `Package`, `Module` or `Fragment`,
///   returning `false` if the element is not permitted there.
pub(super) fn compile_section_child(
    ctx: &mut CompileContext,
    node: Node,
    name: &str,
    values: &ContextValues,
) -> bool {
    match name {
        "Directory" => directory::compile_directory(ctx, node, values),
        "DirectoryRef" => directory::compile_directory_ref(ctx, node, values),
        "StandardDirectory" => {
            directory::compile_standard_directory(ctx, node, values)
        }
        "Component" => component::compile_component(ctx, node, values),
        "ComponentGroup" => {
            component::compile_component_group(ctx, node, values)
        }
        "ComponentGroupRef" => {
            component::compile_component_group_ref(ctx, node, values)
        }
        "Feature" => feature::compile_feature(ctx, node, values),
        "FeatureRef" => feature::compile_feature_ref(ctx, node, values),
        "Property" => compile_property(ctx, node, values),
        "PropertyRef" => compile_property_ref(ctx, node, values),
        "CustomAction" => action::compile_custom_action(ctx, node, values),
        "CustomActionRef" => {
            action::compile_custom_action_ref(ctx, node, values)
        }
        "Binary" => action::compile_binary(ctx, node, values),
        "InstallExecuteSequence" => action::compile_sequence(ctx, node, values),
        "UI" => ui::compile_ui(ctx, node, values),
        _ => return false,
    }

    true
}

fn compile_package(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(
        node,
        &[
            "Name",
            "Version",
            "Manufacturer",
            "Language",
            "UpgradeCode",
            "ProductCode",
        ],
        values,
    );

    let span = ctx.span(node);
    let name = ctx.required_attr(node, "Name");
    let version = ctx.required_attr(node, "Version");
    let language = match node.attribute("Language") {
        Some(_) => ctx.integer_attr(node, "Language", 0, 65535),
        None => Some(0),
    };
    let upgrade_code = ctx.guid_attr(node, "UpgradeCode", false);
    let product_code = ctx.guid_attr(node, "ProductCode", true);

    ctx.begin_section(SectionType::Product, None);

    let product_code = match product_code {
        Some(GuidValue::Literal(guid)) => FieldValue::Str(guid),
        _ => Deferred::Guid {
            args: vec![
                "ProductCode".into(),
                name.unwrap_or_default().into(),
                version.unwrap_or_default().into(),
                guid_text(&upgrade_code),
            ],
        }
        .into(),
    };

    add_property(ctx, "ProductCode", product_code, &span);
    add_property(ctx, "ProductName", name.into(), &span);
    add_property(ctx, "ProductVersion", version.into(), &span);
    add_property(
        ctx,
        "ProductLanguage",
        language.map(|l| l.to_string()).into(),
        &span,
    );

    if let Some(manufacturer) = node.attribute("Manufacturer") {
        add_property(ctx, "Manufacturer", manufacturer.into(), &span);
    }

    if upgrade_code.is_some() {
        add_property(ctx, "UpgradeCode", guid_text(&upgrade_code).into(), &span);
    }

    ctx.each_child(node, values, |ctx, child, name| {
        compile_section_child(ctx, child, name, values)
    });
}

fn guid_text(guid: &Option<GuidValue>) -> String {
    match guid {
        Some(GuidValue::Literal(guid)) => guid.clone(),
        _ => String::new(),
    }
}

fn compile_module(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(node, &["Id", "Language", "Version"], values);

    let span = ctx.span(node);
    let id = ctx.required_identifier_attr(node, "Id");
    let language = match ctx.required_attr(node, "Language") {
        Some(_) => ctx.integer_attr(node, "Language", 0, 65535),
        None => None,
    };
    let version = ctx.required_attr(node, "Version");

    ctx.begin_section(SectionType::Module, id.map(String::from));

    if let Some(id) = id {
        let sym = ctx.add_symbol(
            tables::MODULE_SIGNATURE,
            Identifier::public(id),
            Some(span),
        );
        sym.set_named("Language", language);
        sym.set_named("Version", version);
    }

    // Features belong to the product consuming the module.
    ctx.each_child(node, values, |ctx, child, name| {
        !matches!(name, "Feature" | "FeatureRef")
            && compile_section_child(ctx, child, name, values)
    });
}

fn compile_fragment(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let id = ctx.identifier_attr(node, "Id");
    ctx.begin_section(SectionType::Fragment, id.map(String::from));

    ctx.each_child(node, values, |ctx, child, name| {
        compile_section_child(ctx, child, name, values)
    });
}

fn compile_bundle(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(
        node,
        &["Name", "Version", "Manufacturer", "UpgradeCode"],
        values,
    );

    let span = ctx.span(node);
    let version = ctx.required_attr(node, "Version");
    let upgrade_code = match ctx.required_attr(node, "UpgradeCode") {
        Some(_) => ctx.guid_attr(node, "UpgradeCode", false),
        None => None,
    };

    ctx.begin_section(SectionType::Bundle, None);

    let sym = ctx.add_row(tables::BUNDLE, &["WixBundle"], Some(span));
    sym.set_named("Version", version);
    sym.set_named("Name", node.attribute("Name"));
    sym.set_named("Manufacturer", node.attribute("Manufacturer"));
    sym.set_named("UpgradeCode", guid_text(&upgrade_code));

    // Bundle content is provided entirely by extensions.
    no_children(ctx, node, values);
}

fn add_property(
    ctx: &mut CompileContext,
    id: &str,
    value: FieldValue,
    span: &Span,
) {
    let sym =
        ctx.add_symbol(tables::PROPERTY, Identifier::public(id), Some(span.clone()));
    sym.set_named("Value", value);
}

fn compile_property(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id", "Value"], values);

    let span = ctx.span(node);
    let id = ctx.required_identifier_attr(node, "Id");
    let value = ctx.required_attr(node, "Value");

    if let (Some(id), Some(value)) = (id, value) {
        add_property(ctx, id, value.into(), &span);
    }

    no_children(ctx, node, values);
}

fn compile_property_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        ctx.add_simple_reference(tables::PROPERTY, id, None, Some(span));
    }

    no_children(ctx, node, values);
}

/// Process an element that permits no core children.
pub(super) fn no_children(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.each_child(node, values, |_, _, _| false);
}
