//! `mozjs-update` entrypoint.
//!
//! Imports a SpiderMonkey tarball into `mozjs/`, strips its manifests and
//! vendored crates, applies the local patches and regenerates configure.

use clap::Parser;
use mozjs_updater::cli::UpdateCli;
use mozjs_updater::config::VendorTarget;
use mozjs_updater::{interrupt, logging};
use mozjs_updater::output::exit_code_for_run_result;
use mozjs_updater::pipeline::run_update;

fn main() {
    let cli = UpdateCli::parse();
    logging::init(cli.common.verbosity);

    let mut stderr = std::io::stderr();
    let run_result = interrupt::install_handler().and_then(|()| {
        run_update(VendorTarget::mozjs(), cli.plan(), &cli.common, &mut stderr)
    });
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
