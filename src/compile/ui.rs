// User interface elements
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

use super::package::no_children;
use super::{CompileContext, ContextValues};
use crate::ir::Identifier;
use crate::schema::tables;
use roxmltree::Node;

pub(super) fn compile_ui(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(node, &["Id"], values);
    ctx.identifier_attr(node, "Id");

    ctx.each_child(node, values, |ctx, child, name| {
        match name {
            "Dialog" => compile_dialog(ctx, child, values),
            "DialogRef" => compile_dialog_ref(ctx, child, values),
            _ => return false,
        }
        true
    });
}

fn compile_dialog_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        ctx.add_simple_reference(tables::DIALOG, id, None, Some(span));
    }

    no_children(ctx, node, values);
}

fn compile_dialog(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(
        node,
        &["Id", "X", "Y", "Width", "Height", "Title"],
        values,
    );

    let span = ctx.span(node);
    let id = ctx.required_identifier_attr(node, "Id");
    let x = ctx.integer_attr(node, "X", 0, 100).unwrap_or(50);
    let y = ctx.integer_attr(node, "Y", 0, 100).unwrap_or(50);
    let width = ctx
        .required_attr(node, "Width")
        .and_then(|_| ctx.integer_attr(node, "Width", 0, 32767));
    let height = ctx
        .required_attr(node, "Height")
        .and_then(|_| ctx.integer_attr(node, "Height", 0, 32767));

    let Some(id) = id else {
        return;
    };

    let sym = ctx.add_symbol(tables::DIALOG, Identifier::public(id), Some(span));
    sym.set_named("HCentering", x);
    sym.set_named("VCentering", y);
    sym.set_named("Width", width);
    sym.set_named("Height", height);
    sym.set_named("Attributes", 0i64);
    sym.set_named("Title", node.attribute("Title"));

    ctx.each_child(node, values, |ctx, child, name| {
        match name {
            "Control" => compile_control(ctx, child, id, values),
            _ => return false,
        }
        true
    });
}

fn compile_control(
    ctx: &mut CompileContext,
    node: Node,
    dialog: &str,
    values: &ContextValues,
) {
    ctx.check_attributes(
        node,
        &["Id", "Type", "X", "Y", "Width", "Height", "Text"],
        values,
    );

    let span = ctx.span(node);
    let id = ctx.required_identifier_attr(node, "Id");
    let ty = ctx.required_attr(node, "Type");

    let mut dimension = |name: &'static str| {
        ctx.required_attr(node, name)
            .and_then(|_| ctx.integer_attr(node, name, 0, 32767))
    };
    let (x, y) = (dimension("X"), dimension("Y"));
    let (width, height) = (dimension("Width"), dimension("Height"));

    let Some(id) = id else {
        return;
    };

    let sym = ctx.add_row(tables::CONTROL, &[dialog, id], Some(span));
    sym.set_named("Dialog_", dialog);
    sym.set_named("Control", id);
    sym.set_named("Type", ty);
    sym.set_named("X", x);
    sym.set_named("Y", y);
    sym.set_named("Width", width);
    sym.set_named("Height", height);
    sym.set_named("Text", node.attribute("Text"));

    no_children(ctx, node, values);
}
