//! Clean Command

use anyhow::Result;
use clap::Args;
use plumbline_e2e::{CleanTarget, Cleaner, CleanupPlan};

use crate::output::{print_cleanup, print_info, print_success, print_warning};

#[derive(Args)]
pub struct CleanArgs {
    /// What to clean (reports, logs, build, cache, all)
    #[arg(default_value = "reports")]
    pub target: String,

    /// Show what would be removed without touching anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn execute(args: CleanArgs) -> Result<i32> {
    let target: CleanTarget = args.target.parse()?;
    let root = std::env::current_dir()?;

    if args.dry_run {
        print_info(&format!("Dry run: cleaning '{}' in {}", args.target, root.display()));
    }

    let stats = Cleaner::new(root, args.dry_run).run(&CleanupPlan::for_target(target));
    print_cleanup(&stats, args.dry_run);

    if stats.errors.is_empty() {
        print_success("Cleanup complete");
        Ok(0)
    } else {
        print_warning(&format!("Cleanup finished with {} error(s)", stats.errors.len()));
        Ok(1)
    }
}
