// Custom action elements
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
use super::{CompileContext, ContextValues, Platform, Platforms};
use crate::ir::{Deferred, Identifier, SymbolKey};
use crate::schema::tables;
use roxmltree::Node;

/// Custom action type bits.
mod ty {
    pub const DLL_FROM_BINARY: i64 = 1;
    pub const EXE_FROM_FILE: i64 = 18;
    pub const SET_DIRECTORY: i64 = 35;
    pub const SET_PROPERTY: i64 = 51;

    pub const CONTINUE: i64 = 0x40;
    pub const ASYNC: i64 = 0x80;
    pub const IN_SCRIPT: i64 = 0x400;
    pub const ROLLBACK: i64 = 0x100;
    pub const COMMIT: i64 = 0x200;
    pub const NO_IMPERSONATE: i64 = 0x800;
}

pub(super) fn compile_custom_action(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(
        node,
        &[
            "Id",
            "BinaryRef",
            "DllEntry",
            "FileRef",
            "ExeCommand",
            "Property",
            "Directory",
            "Value",
            "Execute",
            "Impersonate",
            "Return",
        ],
        values,
    );

    let span = ctx.span(node);
    let Some(id) = ctx.required_identifier_attr(node, "Id") else {
        return;
    };
    let from = Some(SymbolKey::new(tables::CUSTOM_ACTION, id));

    let (base, source, target) =
        if let Some(binary) = ctx.identifier_attr(node, "BinaryRef") {
            ctx.add_simple_reference(
                tables::BINARY,
                binary,
                from.clone(),
                Some(span.clone()),
            );
            (ty::DLL_FROM_BINARY, binary, ctx.required_attr(node, "DllEntry"))
        } else if let Some(file) = ctx.identifier_attr(node, "FileRef") {
            ctx.add_simple_reference(
                tables::FILE,
                file,
                from.clone(),
                Some(span.clone()),
            );
            (ty::EXE_FROM_FILE, file, ctx.required_attr(node, "ExeCommand"))
        } else if let Some(prop) = ctx.identifier_attr(node, "Property") {
            (ty::SET_PROPERTY, prop, ctx.required_attr(node, "Value"))
        } else if let Some(dir) = ctx.identifier_attr(node, "Directory") {
            ctx.add_simple_reference(
                tables::DIRECTORY,
                dir,
                from.clone(),
                Some(span.clone()),
            );
            (ty::SET_DIRECTORY, dir, ctx.required_attr(node, "Value"))
        } else {
            ctx.expected_one_of(
                node,
                vec!["BinaryRef", "FileRef", "Property", "Directory"],
            );
            return;
        };

    let execute = match ctx.enum_attr(
        node,
        "Execute",
        &["immediate", "deferred", "rollback", "commit"],
    ) {
        Some("deferred") => ty::IN_SCRIPT,
        Some("rollback") => ty::IN_SCRIPT | ty::ROLLBACK,
        Some("commit") => ty::IN_SCRIPT | ty::COMMIT,
        _ => 0,
    };

    let impersonate = match ctx.yes_no_attr(node, "Impersonate") {
        Some(false) => ty::NO_IMPERSONATE,
        _ => 0,
    };

    let ret = match ctx.enum_attr(
        node,
        "Return",
        &["check", "ignore", "asyncWait", "asyncNoWait"],
    ) {
        Some("ignore") => ty::CONTINUE,
        Some("asyncWait") => ty::ASYNC,
        Some("asyncNoWait") => ty::ASYNC | ty::CONTINUE,
        _ => 0,
    };

    let sym = ctx.add_symbol(
        tables::CUSTOM_ACTION,
        Identifier::public(id),
        Some(span),
    );
    sym.set_named("Type", base | execute | impersonate | ret);
    sym.set_named("Source", source);
    sym.set_named("Target", target);

    no_children(ctx, node, values);
}

fn parse_platforms(list: &str) -> Result<Platforms, String> {
    list.split_whitespace().try_fold(Platforms::NONE, |acc, name| {
        name.parse::<Platform>().map(|p| acc | p.into())
    })
}

pub(super) fn compile_custom_action_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id", "Platforms"], values);

    let span = ctx.span(node);
    let Some(id) = ctx.required_identifier_attr(node, "Id") else {
        return;
    };

    match node.attribute("Platforms").map(parse_platforms) {
        None => {
            ctx.add_simple_reference(tables::CUSTOM_ACTION, id, None, Some(span))
        }
        Some(Ok(platforms)) if !platforms.is_empty() => {
            ctx.add_custom_action_reference(id, platforms, span)
        }
        Some(_) => ctx.illegal_value(
            node,
            "Platforms",
            node.attribute("Platforms").unwrap_or_default(),
            "a space-separated list of x86, x64 and arm64",
        ),
    }

    no_children(ctx, node, values);
}

pub(super) fn compile_binary(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id", "SourceFile"], values);

    let span = ctx.span(node);
    let id = ctx.required_identifier_attr(node, "Id");
    let source = ctx.required_attr(node, "SourceFile");

    if let (Some(id), Some(source)) = (id, source) {
        let sym =
            ctx.add_symbol(tables::BINARY, Identifier::public(id), Some(span));
        sym.set_named("Data", Deferred::SourcePath(source.into()));
    }

    no_children(ctx, node, values);
}

pub(super) fn compile_sequence(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &[], values);

    ctx.each_child(node, values, |ctx, child, name| {
        match name {
            "Custom" => compile_custom(ctx, child, values),
            _ => return false,
        }
        true
    });
}

/// Schedule a custom action.
fn compile_custom(ctx: &mut CompileContext, node: Node, values: &ContextValues) {
    ctx.check_attributes(
        node,
        &["Action", "Before", "After", "Sequence", "Condition"],
        values,
    );

    let span = ctx.span(node);
    let action = ctx.required_identifier_attr(node, "Action");
    let before = ctx.identifier_attr(node, "Before");
    let after = ctx.identifier_attr(node, "After");
    let sequence = ctx.integer_attr(node, "Sequence", -4, 32767);

    if before.is_none() && after.is_none() && node.attribute("Sequence").is_none()
    {
        ctx.expected_one_of(node, vec!["Before", "After", "Sequence"]);
    }

    // The condition may be given as text content.
    let condition = node.attribute("Condition").or_else(|| {
        node.text().map(str::trim).filter(|text| !text.is_empty())
    });

    let Some(action) = action else {
        return;
    };

    let sym = ctx.add_symbol(
        tables::INSTALL_EXECUTE_SEQUENCE,
        Identifier::public(action),
        Some(span.clone()),
    );
    sym.set_named("Condition", condition);
    sym.set_named("Sequence", sequence);
    sym.set_named("After", after);
    sym.set_named("Before", before);

    ctx.add_simple_reference(
        tables::CUSTOM_ACTION,
        action,
        Some(SymbolKey::new(tables::INSTALL_EXECUTE_SEQUENCE, action)),
        Some(span),
    );

    ctx.each_child(node, values, |_, _, _| false);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn platform_lists() {
        let all = parse_platforms("x86 x64 arm64").unwrap();
        assert!(all.contains(Platform::X86));
        assert!(all.contains(Platform::Arm64));

        let x64 = parse_platforms(" x64 ").unwrap();
        assert!(x64.contains(Platform::X64));
        assert!(!x64.contains(Platform::X86));

        assert!(parse_platforms("mips").is_err());
        assert!(parse_platforms("").unwrap().is_empty());
    }
}
