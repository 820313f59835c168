//! `mozjs-sys-update` entrypoint.
//!
//! Merges a SpiderMonkey tarball into `mozjs-sys/mozjs/` through the rsync
//! filter rules, commits it and applies the local patches, keeping rejected
//! hunks for manual resolution.

use clap::Parser;
use mozjs_updater::cli::SysUpdateCli;
use mozjs_updater::config::VendorTarget;
use mozjs_updater::{interrupt, logging};
use mozjs_updater::output::exit_code_for_run_result;
use mozjs_updater::pipeline::run_update;

fn main() {
    let cli = SysUpdateCli::parse();
    logging::init(cli.common.verbosity);

    let mut stderr = std::io::stderr();
    let run_result = interrupt::install_handler().and_then(|()| {
        run_update(
            VendorTarget::mozjs_sys(),
            cli.plan(),
            &cli.common,
            &mut stderr,
        )
    });
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
