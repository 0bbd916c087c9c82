// Command-line support
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


//! Functionality shared by the command-line tools.

use getopts::{Fail, Matches, Options};
use std::process;
use tracing_subscriber::EnvFilter;
use wixrs::diagnose::{
    Aborted, FsLineResolver, Messaging, MessagingConfig, Reporter,
    VisualReporter,
};

/// Exit status of a build that failed after its arguments were accepted.
pub const EXIT_FAILURE: i32 = 1;

/// Log to standard error as directed by `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Add options configuring the treatment of warnings.
pub fn messaging_opts(opts: &mut Options) {
    opts.optmulti("", "sw", "suppress warning ID", "ID");
    opts.optflag("", "sw-all", "suppress all warnings");
    opts.optmulti("", "wx", "treat warning ID as an error", "ID");
    opts.optflag("", "wx-all", "treat all warnings as errors");
}

pub fn messaging_config(matches: &Matches) -> Result<MessagingConfig, Fail> {
    let mut config = MessagingConfig::default();

    config.set_suppress_all_warnings(matches.opt_present("sw-all"));
    config.set_warnings_as_errors(matches.opt_present("wx-all"));

    let invalid = |e: wixrs::diagnose::MessagingConfigError| {
        Fail::UnexpectedArgument(e.to_string())
    };

    for id in matches.opt_strs("sw") {
        config.suppress_warning(&id).map_err(invalid)?;
    }

    for id in matches.opt_strs("wx") {
        config.escalate_warning(&id).map_err(invalid)?;
    }

    Ok(config)
}

/// Render every message recorded so far.
pub fn report(messaging: &Messaging) {
    let reporter = VisualReporter::new(FsLineResolver::default());

    for message in messaging.take_messages() {
        // Rendering to a string ensures buffering so that we don't
        //   interleave output between processes.
        println!("{}", reporter.render(&message));
    }
}

/// Report all messages and exit after a failed build.
pub fn fail(messaging: &Messaging, aborted: Aborted, what: &str) -> ! {
    report(messaging);

    match messaging.last_error_code() {
        Some(code) => println!("fatal: failed to {what}: {aborted} (last error {code})"),
        None => println!("fatal: failed to {what}: {aborted}"),
    }

    process::exit(EXIT_FAILURE);
}

/// Report a problem with the arguments and exit.
pub fn usage_error(e: Fail, usage: &str) -> ! {
    eprintln!("{e}");
    println!("{usage}");
    process::exit(exitcode::USAGE);
}

/// Split `NAME=VALUE`.
pub fn parse_define(define: &str) -> Result<(String, String), Fail> {
    match define.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(Fail::UnexpectedArgument(format!(
            "expected NAME=VALUE but found `{define}`"
        ))),
    }
}
