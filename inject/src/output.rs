// Copyright (c) 2025 Elektrobit Automotive GmbH
//
// This program and the accompanying materials are made available under the
// terms of the Apache License, Version 2.0 which is available at
// https://www.apache.org/licenses/LICENSE-2.0.
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::Stylize;

// Everything user facing goes to stderr, stdout carries the manifests.
#[cfg(test)]
macro_rules! eprintln {
    ( $ ( $ arg : tt ) + ) => { $crate::output::mock_eprintln_fn ( format_args ! ( $ ( $ arg ) + ) ) }
}

#[cfg(test)]
fn mock_eprintln_fn(args: fmt::Arguments<'_>) {
    tests::TEST_PRINT_DATA
        .lock()
        .unwrap()
        .push_str(&format!("{args}\n"));
}

static VERBOSE: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_verbosity(verbose: bool, quiet: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Prints the message, if the CLI command is not called with `--quiet` flag
#[macro_export]
macro_rules! output {
    ( $ ( $ arg : tt ) + ) => { $crate::output::output_fn ( format_args ! ( $ ( $ arg ) + ) ) }
}

/// Prints the message prefixed with a yellow `warning:`, unless `--quiet` is given.
#[macro_export]
macro_rules! output_warn {
    ( $ ( $ arg : tt ) + ) => { $crate::output::output_warn_fn ( format_args ! ( $ ( $ arg ) + ) ) }
}

/// Prints the error message and immediately terminates the application with the exit code `1`.
#[macro_export]
macro_rules! output_and_error {
    ( $ ( $ arg : tt ) + ) => { $crate::output::output_and_error_fn ( format_args ! ( $ ( $ arg ) + ) ) }
}

/// This macro prints the message as a debug trace, if the CLI command is called with `--verbose` flag.
/// If the CLI command is called without the `--verbose` flag, the macro does nothing.
#[macro_export]
macro_rules! output_debug {
    ( $ ( $ arg : tt ) + ) => { $crate::output::output_debug_fn ( format_args ! ( $ ( $ arg ) + ) ) }
}

pub(crate) fn output_and_error_fn(args: fmt::Arguments<'_>) {
    eprintln!("{} {}", "error:".bold().red(), args);
    exit(1);
}

pub(crate) fn output_debug_fn(args: fmt::Arguments<'_>) {
    if is_verbose() {
        eprintln!("{} {}", "debug:".blue(), args);
    }
}

pub(crate) fn output_warn_fn(args: fmt::Arguments<'_>) {
    if !is_quiet() {
        eprintln!("{} {}", "warning:".yellow(), args);
    }
}

pub(crate) fn output_fn(args: fmt::Arguments<'_>) {
    if !is_quiet() {
        eprintln!("{}", args);
    }
}

fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed) && !is_quiet()
}

fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
