// Compiler
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


//! This is the compiler.
//!
//! `wixc` compiles source documents into object files that are later
//!   linked and bound into final output using [`wixld`](../wixld).

extern crate wixrs;

mod common;

use getopts::{Fail, Options};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use wixrs::compile::{CompileError, CompileOptions, Platform};
use wixrs::diagnose::{Aborted, Messaging, MessagingConfig};
use wixrs::ext::ExtensionRegistry;
use wixrs::pipeline::{Build, Preprocessor, SourceFile};
use wixrs::schema::SchemaRegistry;

/// Types of commands
enum Command {
    Compile(CompileCommand),
    Usage,
}

struct CompileCommand {
    sources: Vec<String>,
    output: Output,
    platform: Platform,
    defines: Defines,
    config: MessagingConfig,
}

/// Where object files are written.
#[derive(Debug, PartialEq, Eq)]
enum Output {
    /// A single source compiled to the named file.
    File(PathBuf),

    /// Each source compiled to a file named after it in this directory.
    Directory(PathBuf),
}

impl Output {
    fn path_for(&self, source: &str) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Directory(dir) => {
                let stem = Path::new(source)
                    .file_stem()
                    .unwrap_or(source.as_ref());

                dir.join(stem).with_extension("wixobj")
            }
        }
    }
}

/// Substitution of `$(var.NAME)` preprocessor variables.
#[derive(Debug, Default, PartialEq, Eq)]
struct Defines(BTreeMap<String, String>);

impl Preprocessor for Defines {
    fn preprocess<'s>(&self, _path: &str, text: &'s str) -> Cow<'s, str> {
        self.0.iter().fold(Cow::Borrowed(text), |text, (name, value)| {
            let var = format!("$(var.{name})");

            match text.contains(&var) {
                true => Cow::Owned(text.replace(&var, value)),
                false => text,
            }
        })
    }
}

fn compile(command: CompileCommand, messaging: &Messaging) -> Result<usize, Aborted> {
    let registry = SchemaRegistry::with_core();
    let extensions = ExtensionRegistry::with_standard();

    let sources = command
        .sources
        .iter()
        .filter_map(|path| match fs::read_to_string(path) {
            Ok(text) => Some(SourceFile::new(path, text)),
            Err(e) => {
                messaging.emit(&CompileError::Io {
                    path: path.into(),
                    reason: e.to_string(),
                });
                None
            }
        })
        .collect::<Vec<_>>();

    let compiled = Build::new(&registry, &extensions, messaging).compile(
        &sources,
        &command.defines,
        CompileOptions {
            platform: command.platform,
        },
    )?;

    for (source, intermediate) in sources.iter().zip(compiled.intermediates()) {
        let dest = command.output.path_for(&source.path);

        tracing::debug!(source = %source.path, dest = %dest.display(), "writing object");

        if let Err(e) = intermediate.save(&dest) {
            messaging.emit(&CompileError::Io {
                path: dest,
                reason: e.to_string(),
            });
        }
    }

    match messaging.error_count() {
        0 => Ok(sources.len()),
        errors => Err(Aborted {
            stage: "compile",
            errors,
        }),
    }
}

/// Entrypoint for the compiler
pub fn main() {
    common::init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {program} [OPTIONS] SOURCE..."));

    match parse_options(opts, args) {
        Ok(Command::Compile(command)) => {
            let messaging = Messaging::new(command.config.clone());

            match compile(command, &messaging) {
                Ok(count) => {
                    common::report(&messaging);
                    tracing::info!(count, "compiled");
                }
                Err(e) => common::fail(&messaging, e, "compile"),
            }
        }
        Ok(Command::Usage) => {
            println!("{usage}");
            process::exit(exitcode::OK);
        }
        Err(e) => common::usage_error(e, &usage),
    }
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "o",
        "out",
        "output file, or directory when compiling many sources",
        "PATH",
    );
    opts.optopt("a", "arch", "target platform (x86, x64, arm64)", "ARCH");
    opts.optmulti("d", "define", "define preprocessor variable", "NAME=VALUE");
    opts.optflag("h", "help", "print this help menu");
    common::messaging_opts(&mut opts);

    opts
}

/// Option parser
fn parse_options(opts: Options, args: Vec<String>) -> Result<Command, Fail> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let sources = matches.free.clone();

    if sources.is_empty() {
        return Err(Fail::OptionMissing(String::from("SOURCE")));
    }

    let output = match matches.opt_str("o") {
        Some(path) if sources.len() == 1 && !path.ends_with(&['/', '\\'][..]) => {
            Output::File(path.into())
        }
        Some(dir) => Output::Directory(dir.into()),
        None => Output::Directory(PathBuf::from(".")),
    };

    let platform = match matches.opt_str("a") {
        Some(arch) => arch.parse().map_err(Fail::UnexpectedArgument)?,
        None => Platform::default(),
    };

    let defines = matches
        .opt_strs("d")
        .iter()
        .map(|d| common::parse_define(d))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(Command::Compile(CompileCommand {
        sources,
        output,
        platform,
        defines: Defines(defines),
        config: common::messaging_config(&matches)?,
    }))
}
