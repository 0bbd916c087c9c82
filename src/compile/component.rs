// Component and file elements
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
    CompileContext, CompileError, ComponentKeyPath, ContextKey, ContextValues,
    KeyPathType,
};
use crate::global::SOURCE_NAMESPACE;
use crate::ir::{Deferred, FieldValue, Identifier, SymbolKey};
use crate::schema::{tables, COMPONENT_ATTRIBUTE_64BIT};
use crate::span::Span;
use roxmltree::Node;

/// Record that `child` is a member of the feature or component group
///   being compiled,
///     if any.
pub(super) fn add_group_membership(
    ctx: &mut CompileContext,
    values: &ContextValues,
    child_type: &str,
    child_id: &str,
    span: &Span,
) {
    let parent = match (
        values.get(ContextKey::FeatureId),
        values.get(ContextKey::ComponentGroupId),
    ) {
        (Some(feature), _) => (tables::FEATURE, feature),
        (None, Some(group)) => (tables::COMPONENT_GROUP, group),
        (None, None) => return,
    };

    let sym = ctx.add_row(
        tables::GROUP,
        &[parent.0, parent.1, child_type, child_id],
        Some(span.clone()),
    );
    sym.set_named("ParentType", parent.0);
    sym.set_named("ParentId", parent.1);
    sym.set_named("ChildType", child_type);
    sym.set_named("ChildId", child_id);
}

/// Name of the file installed by a `File` element.
fn file_name<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute("Name").or_else(|| {
        node.attribute("Source")
            .and_then(|src| src.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
    })
}

/// Identifier of a `File` element,
///   generated from its directory and name if not provided.
fn file_id(ctx: &CompileContext, node: Node, directory: &str) -> Option<String> {
    match node.attribute("Id") {
        Some(id) => Some(id.into()),
        None => file_name(node)
            .map(|name| ctx.create_identifier("fil", &[directory, name])),
    }
}

/// File child that will become the key path of a component by default.
fn key_path_file<'a, 'i>(node: Node<'a, 'i>) -> Option<Node<'a, 'i>> {
    let files = || {
        node.children().filter(|c| {
            c.is_element()
                && c.tag_name().namespace() == Some(SOURCE_NAMESPACE)
                && c.tag_name().name() == "File"
        })
    };

    files()
        .find(|f| f.attribute("KeyPath") == Some("yes"))
        .or_else(|| files().find(|f| f.attribute("KeyPath") != Some("no")))
}

pub(super) fn compile_component(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(
        node,
        &["Id", "Guid", "Directory", "Condition", "KeyPath", "Bitness"],
        values,
    );

    let span = ctx.span(node);

    let directory = match ctx.identifier_attr(node, "Directory") {
        Some(dir) => {
            ctx.add_simple_reference(
                tables::DIRECTORY,
                dir,
                None,
                Some(span.clone()),
            );
            Some(dir.to_string())
        }
        None => values.get(ContextKey::DirectoryId).map(String::from),
    };

    let Some(directory) = directory else {
        ctx.required_attr(node, "Directory");
        return;
    };

    let id = match ctx.identifier_attr(node, "Id") {
        Some(id) => id.to_string(),
        None => match key_path_file(node).and_then(|f| file_id(ctx, f, &directory))
        {
            Some(id) => id,
            None => {
                ctx.required_attr(node, "Id");
                return;
            }
        },
    };

    let guid = ctx.guid_attr(node, "Guid", true).unwrap_or(GuidValue::Generate);
    let win64 = match ctx.enum_attr(
        node,
        "Bitness",
        &["default", "always32", "always64"],
    ) {
        Some("always64") => true,
        Some("always32") => false,
        _ => values.is_win64(),
    };

    let directory_key_path = ctx.yes_no_attr(node, "KeyPath") == Some(true);

    let index = ctx.section_mut().symbols().len();
    let sym = ctx.add_symbol(
        tables::COMPONENT,
        Identifier::public(&id),
        Some(span.clone()),
    );
    sym.set_named("Directory_", directory.as_str());
    sym.set_named(
        "Attributes",
        if win64 { COMPONENT_ATTRIBUTE_64BIT } else { 0 },
    );
    sym.set_named("Condition", node.attribute("Condition"));

    add_group_membership(ctx, values, tables::COMPONENT, &id, &span);

    let child_values = values
        .with(ContextKey::DirectoryId, &directory)
        .with(ContextKey::ComponentId, &id)
        .with(ContextKey::Win64, if win64 { "yes" } else { "no" });

    let mut keypath = directory_key_path.then(|| ComponentKeyPath {
        id: directory.clone(),
        ty: KeyPathType::Directory,
        explicit: true,
    });

    for child in node.children().filter(Node::is_element) {
        let found = match child.tag_name().namespace() {
            Some(SOURCE_NAMESPACE) if child.tag_name().name() == "File" => {
                compile_file(ctx, child, &child_values)
            }
            Some(ns) if ns != SOURCE_NAMESPACE => {
                ctx.dispatch_key_path_element(ns, node, child, &child_values)
            }
            _ => {
                ctx.unexpected_element(node, child);
                None
            }
        };

        keypath = match (keypath, found) {
            (Some(current), Some(found)) if current.explicit && found.explicit => {
                let span = ctx.span(child);
                ctx.emit(CompileError::IllegalAttributeValue {
                    span,
                    element: child.tag_name().name().into(),
                    attribute: "KeyPath".into(),
                    value: "yes".into(),
                    expected: format!(
                        "a single key path; `{}` is already the key path",
                        current.id
                    ),
                });
                Some(current)
            }
            (Some(current), Some(found)) if found.explicit && !current.explicit => {
                Some(found)
            }
            (None, found) => found,
            (current, _) => current,
        };
    }

    let component_id: FieldValue = match (&guid, &keypath) {
        (GuidValue::Literal(guid), _) => guid.as_str().into(),
        (GuidValue::Empty, _) => FieldValue::Null,
        (
            GuidValue::Generate,
            Some(ComponentKeyPath {
                id: keypath,
                ty: KeyPathType::File,
                ..
            }),
        ) => Deferred::Guid {
            args: vec![directory.clone(), keypath.clone()],
        }
        .into(),
        (GuidValue::Generate, _) => {
            ctx.illegal_value(
                node,
                "Guid",
                node.attribute("Guid").unwrap_or("*"),
                "an explicit GUID for a component without a file key path",
            );
            FieldValue::Null
        }
    };

    if keypath.is_none() {
        ctx.emit(CompileError::ComponentWithoutKeyPath {
            span,
            component: id.clone(),
        });
    }

    let sym = &mut ctx.section_mut().symbols_mut()[index];
    sym.set_named("ComponentId", component_id);
    sym.set_named(
        "KeyPath",
        keypath
            .filter(|k| k.ty != KeyPathType::Directory)
            .map(|k| k.id),
    );
}

/// Compile a `File`,
///   returning the key path it provides to its component.
fn compile_file(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) -> Option<ComponentKeyPath> {
    ctx.check_attributes(node, &["Id", "Name", "Source", "KeyPath"], values);

    let span = ctx.span(node);
    let source = ctx.required_attr(node, "Source");
    let keypath = ctx.yes_no_attr(node, "KeyPath");

    let (Some(component), Some(directory)) = (
        values.get(ContextKey::ComponentId),
        values.get(ContextKey::DirectoryId),
    ) else {
        panic!("internal error: File compiled outside of a component");
    };

    let Some(name) = file_name(node) else {
        ctx.required_attr(node, "Name");
        return None;
    };

    ctx.identifier_attr(node, "Id");
    let id = file_id(ctx, node, directory)?;

    let sym = ctx.add_symbol(tables::FILE, Identifier::public(&id), Some(span));
    sym.set_named("Component_", component);
    sym.set_named("FileName", name);
    sym.set_named(
        "Source",
        source.map(|src| Deferred::SourcePath(src.into())),
    );

    ctx.each_child(node, values, |_, _, _| false);

    match keypath {
        Some(false) => None,
        explicit => Some(ComponentKeyPath {
            id,
            ty: KeyPathType::File,
            explicit: explicit == Some(true),
        }),
    }
}

pub(super) fn compile_component_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        add_group_membership(ctx, values, tables::COMPONENT, id, &span);
        ctx.add_simple_reference(tables::COMPONENT, id, None, Some(span));
    }

    ctx.each_child(node, values, |_, _, _| false);
}

pub(super) fn compile_component_group(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id", "Directory"], values);

    let span = ctx.span(node);
    let Some(id) = ctx.required_identifier_attr(node, "Id") else {
        return;
    };

    ctx.add_symbol(
        tables::COMPONENT_GROUP,
        Identifier::public(id),
        Some(span.clone()),
    );

    let mut values = values
        .without(ContextKey::FeatureId)
        .with(ContextKey::ComponentGroupId, id);

    if let Some(dir) = ctx.identifier_attr(node, "Directory") {
        ctx.add_simple_reference(
            tables::DIRECTORY,
            dir,
            Some(SymbolKey::new(tables::COMPONENT_GROUP, id)),
            Some(span),
        );
        values = values.with(ContextKey::DirectoryId, dir);
    }

    compile_group_children(ctx, node, &values);
}

/// Children permitted within features and component groups.
pub(super) fn compile_group_children(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.each_child(node, values, |ctx, child, name| {
        match name {
            "Component" => compile_component(ctx, child, values),
            "ComponentRef" => compile_component_ref(ctx, child, values),
            "ComponentGroupRef" => compile_component_group_ref(ctx, child, values),
            _ => return false,
        }
        true
    });
}

pub(super) fn compile_component_group_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        add_group_membership(ctx, values, tables::COMPONENT_GROUP, id, &span);
        ctx.add_simple_reference(
            tables::COMPONENT_GROUP,
            id,
            None,
            Some(span),
        );
    }

    ctx.each_child(node, values, |_, _, _| false);
}
