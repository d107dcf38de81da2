use super::storage::get_storage;
use crate::Result;
use crate::runner::{ChainOutcome, StepOutcome};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};

pub fn list_history(limit: usize) -> Result<()> {
    let storage = get_storage();
    let entries = storage.tail(limit)?;

    if entries.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Time", "Chain", "Env", "Outcome", "Steps", "Duration",
    ]);

    // 最新的在最上面
    for entry in entries.iter().rev() {
        let failed = entry.count(StepOutcome::Failed);
        let outcome_color = match entry.outcome {
            ChainOutcome::Aborted => Color::Red,
            ChainOutcome::Completed if failed > 0 => Color::Yellow,
            ChainOutcome::Completed => Color::Green,
        };

        let steps = format!(
            "{}✓ {}✗ {}⊘",
            entry.count(StepOutcome::Succeeded),
            failed,
            entry.count(StepOutcome::Skipped)
        );

        table.add_row(vec![
            Cell::new(entry.id.get(..8).unwrap_or(&entry.id)), // Short ID
            Cell::new(entry.timestamp.format("%m-%d %H:%M:%S")),
            Cell::new(&entry.chain_name),
            Cell::new(entry.environment.as_deref().unwrap_or("-")).add_attribute(Attribute::Dim),
            Cell::new(entry.outcome).fg(outcome_color),
            Cell::new(steps),
            Cell::new(format!("{}ms", entry.duration_ms)),
        ]);
    }

    println!("{}", table);

    Ok(())
}
