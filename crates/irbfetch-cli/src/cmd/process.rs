//! Process subcommand - validate, clean up and report on stored bulletins

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use irbfetch_bulletins::{Config, Inventory};

use super::print_summary;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Validate every stored PDF
    #[arg(long)]
    pub validate: bool,

    /// Delete invalid files
    #[arg(long)]
    pub cleanup: bool,

    /// With --cleanup, only list what would be deleted
    #[arg(long, requires = "cleanup")]
    pub dry_run: bool,

    /// Show bulletin statistics
    #[arg(long)]
    pub stats: bool,

    /// Print the inventory report, or save it to PATH
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    pub inventory: Option<Option<PathBuf>>,
}

pub fn run(args: ProcessArgs, config: &Config) -> Result<()> {
    let inventory = Inventory::new(&config.output_dir);

    if !(args.validate || args.cleanup || args.stats || args.inventory.is_some()) {
        log::warn!("Nothing to do: pass --validate, --cleanup, --stats or --inventory");
        return Ok(());
    }

    if args.validate {
        let results = inventory.validate_all();
        let valid = results.values().filter(|v| **v).count();
        println!("Validation complete: {valid}/{} files valid", results.len());
    }

    if args.cleanup {
        let report = inventory.cleanup(args.dry_run);
        if report.invalid.is_empty() {
            println!("No invalid files found");
        } else if args.dry_run {
            println!("Would delete {} invalid files", report.invalid.len());
        } else {
            println!("Deleted {} invalid files", report.deleted.len());
            for (name, e) in &report.failed {
                println!("  could not delete {name}: {e}");
            }
        }
    }

    if args.stats {
        let stats = inventory.statistics();
        print_summary(
            "Bulletin Statistics",
            &[
                ("Total files", stats.total_files.to_string()),
                ("Total size", format!("{:.2} MB", stats.total_size_mb)),
                ("Valid files", stats.valid_files.to_string()),
                ("Invalid files", stats.invalid_files.to_string()),
                ("Average size", format!("{:.2} MB", stats.average_size_mb)),
            ],
        );
    }

    if let Some(save_to) = &args.inventory {
        let report = inventory.inventory_report(save_to.as_deref());
        if save_to.is_none() {
            print!("{report}");
        }
    }
    Ok(())
}
