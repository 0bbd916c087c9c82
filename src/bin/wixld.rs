// Linker and binder
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


//! This is the linker,
//!   so named after the traditional `ld` Unix utility.
//!
//! `wixld` takes the object files produced by [`wixc`](../wixc) and
//!   either combines them into a library,
//!     or links,
//!     resolves,
//!     and binds them into final output,
//!       laying out the files that accompany it.
//!
//! For more information about the linker,
//!   see the [`wixrs::ld`] module.

extern crate wixrs;

mod common;

use getopts::{Fail, Options};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use wixrs::bind::{BindOptions, OutputType};
use wixrs::bindpath::{BindPath, BindPaths, BindStage};
use wixrs::compile::parse_localization;
use wixrs::diagnose::{Aborted, Messaging, MessagingConfig};
use wixrs::ext::ExtensionRegistry;
use wixrs::fs::{FsCanonicalizer, VisitOnce};
use wixrs::ir::{Intermediate, Localization};
use wixrs::ld::{CultureFilter, LinkOptions};
use wixrs::librarian::LibraryOptions;
use wixrs::pipeline::Build;
use wixrs::resolve::ResolveOptions;
use wixrs::schema::SchemaRegistry;

/// Types of commands
enum Command {
    Link(LinkCommand),
    Usage,
}

struct LinkCommand {
    inputs: Vec<String>,
    output: PathBuf,
    output_type: OutputType,
    localizations: Vec<String>,
    cultures: Vec<String>,
    bind_paths: Vec<BindPath>,
    variables: BTreeMap<String, String>,
    intermediate_folder: Option<PathBuf>,
    bind_files: bool,
    suppress_ices: Vec<String>,
    config: MessagingConfig,
}

impl LinkCommand {
    fn bind_paths(&self) -> BindPaths {
        let mut paths = BindPaths::new();

        for path in &self.bind_paths {
            paths.add(BindStage::Normal, path.clone());
        }

        paths
    }
}

/// Load each input once,
///   however many times (or by whatever relative path) it was named.
fn load_inputs(
    paths: &[String],
    registry: &SchemaRegistry,
    messaging: &Messaging,
) -> Vec<Intermediate> {
    let mut visited = VisitOnce::<FsCanonicalizer>::new();

    paths
        .iter()
        .filter(|path| match visited.visit(path) {
            Ok(first) => first.is_some(),
            // let the load report it
            Err(_) => true,
        })
        .filter_map(|path| {
            Intermediate::load(path, registry)
                .map_err(|e| messaging.emit(&e))
                .ok()
        })
        .collect()
}

fn load_localizations(paths: &[String], messaging: &Messaging) -> Vec<Localization> {
    paths
        .iter()
        .filter_map(|path| {
            let text = fs::read_to_string(path)
                .map_err(|e| {
                    messaging.emit(&wixrs::compile::CompileError::Io {
                        path: path.into(),
                        reason: e.to_string(),
                    })
                })
                .ok()?;

            parse_localization(path, &text, messaging).ok()
        })
        .collect()
}

fn link(command: LinkCommand, messaging: &Messaging) -> Result<Vec<PathBuf>, Aborted> {
    let extensions = ExtensionRegistry::with_standard();
    let mut registry = SchemaRegistry::with_core();

    if let Err(e) = extensions.register_definitions(&mut registry) {
        messaging.emit(&e);
    }

    let intermediates = load_inputs(&command.inputs, &registry, messaging);
    let localizations = load_localizations(&command.localizations, messaging);
    let build = Build::new(&registry, &extensions, messaging);

    if command.output_type == OutputType::Library {
        let library = build.compiled(intermediates).library(
            localizations,
            LibraryOptions {
                bind_files: command.bind_files,
                bind_paths: command.bind_paths(),
            },
        )?;

        return match library.save(&command.output) {
            Ok(()) => Ok(vec![command.output]),
            Err(e) => {
                messaging.emit(&e);
                Err(Aborted {
                    stage: "library",
                    errors: messaging.error_count(),
                })
            }
        };
    }

    // Embedded files must outlive binding;
    //   a temporary folder is removed once the build is complete.
    let scratch;
    let intermediate_folder = match &command.intermediate_folder {
        Some(dir) => dir.clone(),
        None => {
            scratch = tempfile::tempdir().map_err(|e| {
                messaging.emit(&wixrs::bind::BindError::io("create", env::temp_dir(), e));
                Aborted {
                    stage: "bind",
                    errors: messaging.error_count(),
                }
            })?;
            scratch.path().to_path_buf()
        }
    };

    let cultures = CultureFilter::new(&command.cultures);
    let bind_paths = command.bind_paths();

    let result = build
        .compiled(intermediates)
        .link(
            vec![],
            LinkOptions {
                cultures: cultures.clone(),
            },
        )?
        .resolve(
            localizations,
            ResolveOptions {
                bind_paths: bind_paths.clone(),
                variables: command.variables,
                cultures,
                allow_unknown_variables: false,
                intermediate_folder: intermediate_folder.clone(),
            },
        )?
        .bind(BindOptions {
            output_path: command.output,
            output_type: command.output_type,
            bind_paths,
            intermediate_folder,
            suppress_ices: command.suppress_ices,
        })?
        .layout()?;

    Ok(result.outputs)
}

/// Entrypoint for the linker
pub fn main() {
    common::init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {program} [OPTIONS] -o OUTPUT INPUT..."));

    match parse_options(opts, args) {
        Ok(Command::Link(command)) => {
            let messaging = Messaging::new(command.config.clone());

            match link(command, &messaging) {
                Ok(outputs) => {
                    common::report(&messaging);

                    for output in outputs {
                        tracing::info!(output = %output.display(), "wrote");
                    }
                }
                Err(e) => common::fail(&messaging, e, "link"),
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
    opts.optopt("o", "out", "output file", "PATH");
    opts.optopt(
        "t",
        "type",
        "output type (default: from output extension)",
        "TYPE",
    );
    opts.optmulti("l", "loc", "localization file", "WXL");
    opts.optmulti("c", "culture", "culture to build, in order of preference", "CULTURE");
    opts.optmulti("b", "bindpath", "directory in which to find files", "[NAME=]DIR");
    opts.optmulti("d", "define", "define !(wix.NAME) variable", "NAME=VALUE");
    opts.optopt("", "intermediate-folder", "where embedded files are extracted", "DIR");
    opts.optflag("", "bindfiles", "embed files into an output library");
    opts.optmulti("", "sice", "suppress validation rule", "ICE");
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

    if matches.free.is_empty() {
        return Err(Fail::OptionMissing(String::from("INPUT")));
    }

    let output = matches
        .opt_str("o")
        .map(PathBuf::from)
        .ok_or_else(|| Fail::OptionMissing(String::from("-o")))?;

    let output_type = match matches.opt_str("t") {
        Some(ty) => ty
            .parse::<OutputType>()
            .map_err(|e| Fail::UnexpectedArgument(format!("`{ty}`: {e}")))?,
        None => OutputType::from_path(&output),
    };

    let bind_paths = matches
        .opt_strs("b")
        .iter()
        .map(|b| b.parse::<BindPath>().map_err(Fail::UnexpectedArgument))
        .collect::<Result<Vec<_>, _>>()?;

    let variables = matches
        .opt_strs("d")
        .iter()
        .map(|d| common::parse_define(d))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(Command::Link(LinkCommand {
        inputs: matches.free.clone(),
        output,
        output_type,
        localizations: matches.opt_strs("l"),
        cultures: matches.opt_strs("c"),
        bind_paths,
        variables,
        intermediate_folder: matches.opt_str("intermediate-folder").map(PathBuf::from),
        bind_files: matches.opt_present("bindfiles"),
        suppress_ices: matches.opt_strs("sice"),
        config: common::messaging_config(&matches)?,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, Fail> {
        let args = std::iter::once("program")
            .chain(args.iter().copied())
            .map(String::from)
            .collect();

        parse_options(get_opts(), args)
    }

    fn command(args: &[&str]) -> LinkCommand {
        match parse(args) {
            Ok(Command::Link(command)) => command,
            Ok(Command::Usage) => panic!("unexpected usage"),
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn parse_options_help() {
        assert!(matches!(parse(&["--help"]), Ok(Command::Usage)));
    }

    #[test]
    fn parse_options_invalid() {
        assert!(matches!(parse(&["a.wixobj"]), Err(Fail::OptionMissing(_))));
        assert!(matches!(parse(&["-o", "out.msi"]), Err(Fail::OptionMissing(_))));
        assert!(matches!(
            parse(&["-o", "out.msi", "-t", "nonsense", "a.wixobj"]),
            Err(Fail::UnexpectedArgument(_))
        ));
        assert!(matches!(
            parse(&["-o", "out.msi", "-d", "=x", "a.wixobj"]),
            Err(Fail::UnexpectedArgument(_))
        ));
    }

    #[test]
    fn output_type_from_extension_unless_given() {
        assert_eq!(OutputType::Product, command(&["-o", "out.msi", "a.wixobj"]).output_type);
        assert_eq!(OutputType::Library, command(&["-o", "out.wixlib", "a.wixobj"]).output_type);
        assert_eq!(
            OutputType::Wixout,
            command(&["-o", "out.msi", "-t", "wixout", "a.wixobj"]).output_type
        );
        assert_eq!(OutputType::Unknown, command(&["-o", "out.bin", "a.wixobj"]).output_type);
    }

    #[test]
    fn bind_paths_and_variables() {
        let command = command(&[
            "-o", "out.msi", "-b", "files", "-b", "media=cd", "-d", "Ver=1.0", "a.wixobj",
        ]);

        assert_eq!(
            vec![BindPath::unnamed("files"), BindPath::named("media", "cd")],
            command.bind_paths
        );
        assert_eq!(Some(&"1.0".to_string()), command.variables.get("Ver"));
    }
}
