//! `mozjs-gen-bindings` entrypoint.
//!
//! Runs bindgen over `jsapi.h` with the historical arguments. The tool's own
//! output is passed straight through.

use clap::Parser;
use mozjs_updater::bindgen::{BindgenJob, generate_bindings};
use mozjs_updater::cli::BindgenCli;
use mozjs_updater::logging;
use mozjs_updater::output::exit_code_for_run_result;
use mozjs_updater::runner::SystemCommandRunner;

fn main() {
    let cli = BindgenCli::parse();
    logging::init(cli.verbosity);

    let mut stderr = std::io::stderr();
    let run_result = generate_bindings(&SystemCommandRunner::new(), &BindgenJob::default());
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
