// Feature elements
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

use super::component::{
    compile_component, compile_component_group_ref, compile_component_ref,
};
use super::{CompileContext, ContextKey, ContextValues};
use crate::ir::{Identifier, SymbolKey};
use crate::schema::tables;
use roxmltree::Node;

/// Feature attribute bit preventing the user from making a feature
///   absent.
const FEATURE_DISALLOW_ABSENT: i64 = 0x10;

fn compile_feature_children(
    ctx: &mut CompileContext,
    node: Node,
    id: &str,
    values: &ContextValues,
) {
    let values = values
        .without(ContextKey::ComponentGroupId)
        .with(ContextKey::FeatureId, id);

    ctx.each_child(node, &values, |ctx, child, name| {
        match name {
            "Feature" => compile_feature(ctx, child, &values),
            "Component" => compile_component(ctx, child, &values),
            "ComponentRef" => compile_component_ref(ctx, child, &values),
            "ComponentGroupRef" => {
                compile_component_group_ref(ctx, child, &values)
            }
            _ => return false,
        }
        true
    });
}

pub(super) fn compile_feature(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(
        node,
        &[
            "Id",
            "Title",
            "Description",
            "Level",
            "Display",
            "ConfigurableDirectory",
            "AllowAbsent",
        ],
        values,
    );

    let span = ctx.span(node);
    let Some(id) = ctx.required_identifier_attr(node, "Id") else {
        return;
    };

    let level = ctx.integer_attr(node, "Level", 0, 32767).unwrap_or(1);
    let display: i64 = match ctx.enum_attr(
        node,
        "Display",
        &["collapse", "expand", "hidden"],
    ) {
        Some("hidden") => 0,
        Some("expand") => 1,
        _ => 2,
    };
    let attributes = match ctx.yes_no_attr(node, "AllowAbsent") {
        Some(false) => FEATURE_DISALLOW_ABSENT,
        _ => 0,
    };
    let directory = ctx.identifier_attr(node, "ConfigurableDirectory");

    let sym = ctx.add_symbol(
        tables::FEATURE,
        Identifier::public(id),
        Some(span.clone()),
    );
    sym.set_named("Feature_Parent", values.get(ContextKey::FeatureId));
    sym.set_named("Title", node.attribute("Title"));
    sym.set_named("Description", node.attribute("Description"));
    sym.set_named("Display", display);
    sym.set_named("Level", level);
    sym.set_named("Directory_", directory);
    sym.set_named("Attributes", attributes);

    if let Some(dir) = directory {
        ctx.add_simple_reference(
            tables::DIRECTORY,
            dir,
            Some(SymbolKey::new(tables::FEATURE, id)),
            Some(span),
        );
    }

    compile_feature_children(ctx, node, id, values);
}

pub(super) fn compile_feature_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        ctx.add_simple_reference(tables::FEATURE, id, None, Some(span));
        compile_feature_children(ctx, node, id, values);
    }
}
