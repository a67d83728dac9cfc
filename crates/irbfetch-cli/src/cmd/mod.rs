//! Subcommands and shared table output

pub mod check;
pub mod download;
pub mod process;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

fn table(title: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    table
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = table(title);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Print the effective configuration
pub fn print_config(config: &irbfetch_bulletins::Config) {
    print_summary(
        "Setting",
        &[
            ("Output directory", config.output_dir.display().to_string()),
            ("Ledger", config.ledger_path.display().to_string()),
            ("Listing URL", config.listing_url.clone()),
            ("Site origin", config.site_origin.clone()),
            ("Workers", config.worker_count().to_string()),
            (
                "Max pages",
                config
                    .max_pages
                    .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
            ),
            ("Page delay", format!("{}ms", config.page_delay.as_millis())),
            ("Chunk size", format!("{} bytes", config.chunk_size)),
            ("Timeout", format!("{}s", config.http.timeout.as_secs())),
            ("Max retries", config.http.max_retries.to_string()),
        ],
    );
}
