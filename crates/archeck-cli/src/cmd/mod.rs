pub mod check;
pub mod status;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// `archeck config`
pub fn print_config(config: &Config) {
    let mut table = new_table(&["Setting", "Value"]);
    table.add_row(vec![
        "Verifier".to_string(),
        config.verifier.program.display().to_string(),
    ]);
    table.add_row(vec![
        "Verifier args".to_string(),
        config.verifier.args.join(" "),
    ]);
    table.add_row(vec![
        "Encryption markers".to_string(),
        config.verifier.encryption_markers.join(", "),
    ]);
    table.add_row(vec![
        "Include .exe".to_string(),
        config.scan.include_executables.to_string(),
    ]);
    table.add_row(vec![
        "Output directory".to_string(),
        config.output.dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Workers".to_string(),
        format!("{} (max: {})", config.workers.default, config.workers.max),
    ]);

    eprintln!("\n{table}");
}
