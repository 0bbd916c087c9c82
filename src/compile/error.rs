// Compiler diagnostics
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

use crate::diagnose::{Annotate, AnnotatedSpan, Diagnostic, Level, MessageCode};
use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with a source or localization document.
///
/// Apart from [`XmlSyntax`](Self::XmlSyntax) and [`Io`](Self::Io),
///   these are recoverable:
///     the compiler records them and continues so that every problem in
///     a document is surfaced in a single run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unable to read `{}`: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("malformed XML: {reason}")]
    XmlSyntax { span: Span, reason: String },

    #[error("expected root element `{expected}` but found `{found}`")]
    InvalidRoot {
        span: Span,
        expected: &'static str,
        found: String,
    },

    #[error("the {element} element contains an unexpected attribute `{attribute}`")]
    UnexpectedAttribute {
        span: Span,
        element: String,
        attribute: String,
    },

    #[error("the {parent} element contains an unexpected child element `{element}`")]
    UnexpectedElement {
        span: Span,
        parent: String,
        element: String,
    },

    #[error("no extension handles element `{element}` of namespace `{namespace}`")]
    UnhandledExtensionElement {
        span: Span,
        namespace: String,
        element: String,
    },

    #[error(
        "no extension handles attribute `{attribute}` of namespace \
         `{namespace}` on the {element} element"
    )]
    UnhandledExtensionAttribute {
        span: Span,
        namespace: String,
        element: String,
        attribute: String,
    },

    #[error("the {element} element requires the `{attribute}` attribute")]
    ExpectedAttribute {
        span: Span,
        element: String,
        attribute: &'static str,
    },

    #[error(
        "the {element} element requires one of the attributes {}",
        attributes.join(", ")
    )]
    ExpectedOneOf {
        span: Span,
        element: String,
        attributes: Vec<&'static str>,
    },

    #[error("the {element}/@{attribute} value `{value}` is not a legal identifier")]
    IllegalIdentifier {
        span: Span,
        element: String,
        attribute: String,
        value: String,
    },

    #[error("the {element}/@{attribute} value `{value}` is not valid; expected {expected}")]
    IllegalAttributeValue {
        span: Span,
        element: String,
        attribute: String,
        value: String,
        expected: String,
    },

    #[error("duplicate symbol `{table}:{id}`")]
    DuplicateSymbol {
        span: Option<Span>,
        first: Option<Span>,
        table: String,
        id: String,
    },

    #[error("custom action `{action}` is not available for platform {platform}")]
    UnsupportedPlatform {
        span: Span,
        action: String,
        platform: &'static str,
    },

    #[error("duplicate localized string `{id}` for culture `{culture}`")]
    DuplicateLocalizedString {
        span: Span,
        first: Option<Span>,
        culture: String,
        id: String,
    },

    #[error("duplicate localized control `{key}` for culture `{culture}`")]
    DuplicateLocalizedControl {
        span: Span,
        culture: String,
        key: String,
    },

    #[error("component `{component}` has no key path")]
    ComponentWithoutKeyPath { span: Span, component: String },
}

impl Diagnostic for CompileError {
    fn code(&self) -> MessageCode {
        use CompileError::*;

        MessageCode(match self {
            Io { .. } => 8,
            XmlSyntax { .. } => 31,
            InvalidRoot { .. } => 32,
            UnexpectedAttribute { .. } => 4,
            UnexpectedElement { .. } => 5,
            UnhandledExtensionElement { .. } => 6,
            UnhandledExtensionAttribute { .. } => 7,
            ExpectedAttribute { .. } => 10,
            ExpectedOneOf { .. } => 11,
            IllegalIdentifier { .. } => 14,
            IllegalAttributeValue { .. } => 21,
            DuplicateSymbol { .. } => 30,
            UnsupportedPlatform { .. } => 40,
            DuplicateLocalizedString { .. } => 101,
            DuplicateLocalizedControl { .. } => 104,
            ComponentWithoutKeyPath { .. } => 1008,
        })
    }

    fn level(&self) -> Level {
        match self {
            Self::ComponentWithoutKeyPath { .. } => Level::Warning,
            _ => Level::Error,
        }
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        use CompileError::*;

        match self {
            Io { .. } => vec![],

            XmlSyntax { span, .. } => span.mark_error().into(),

            InvalidRoot { span, expected, .. } => span
                .error(format!(
                    "source documents must begin with a `{expected}` element"
                ))
                .into(),

            UnexpectedAttribute { span, .. } | UnexpectedElement { span, .. } => {
                span.mark_error().into()
            }

            UnhandledExtensionElement { span, .. }
            | UnhandledExtensionAttribute { span, .. } => span
                .mark_error()
                .with_help("is the extension for this namespace registered?")
                .to_vec(),

            ExpectedAttribute { span, attribute, .. } => {
                span.error(format!("missing `{attribute}`")).into()
            }

            ExpectedOneOf { span, .. } => span.mark_error().into(),

            IllegalIdentifier { span, .. } => span
                .mark_error()
                .with_help(
                    "identifiers begin with a letter or underscore and contain \
                     only letters, digits, underscores and periods",
                )
                .to_vec(),

            IllegalAttributeValue { span, .. } => span.mark_error().into(),

            DuplicateSymbol { span, first, .. } => vec![
                span.as_ref().error("duplicate definition"),
                first.as_ref().note("first defined here"),
            ],

            UnsupportedPlatform { span, .. } => span.mark_error().into(),

            DuplicateLocalizedString { span, first, .. } => vec![
                span.error("duplicate definition"),
                first.as_ref().note("first defined here"),
            ],

            DuplicateLocalizedControl { span, .. } => span.mark_error().into(),

            ComponentWithoutKeyPath { span, .. } => span
                .warning("no File child or explicit KeyPath")
                .with_help("mark a child with KeyPath=\"yes\"")
                .to_vec(),
        }
    }
}
