use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use policyforge::api::RunReport;
use policyforge::config::ParameterSpace;
use policyforge::core_types::Individual;
use std::cmp::Ordering;

/// Prints the first non-dominated front, best innovation first.
pub fn print_front(space: &ParameterSpace, report: &RunReport) {
    let mut front: Vec<&Individual> = report.population.front().collect();
    front.sort_by(|a, b| {
        a.objectives.values()[0]
            .partial_cmp(&b.objectives.values()[0])
            .unwrap_or(Ordering::Equal)
    });

    println!(
        "\n=== 🏆 PARETO FRONT ({} of {} survivors) ===",
        front.len(),
        report.population.len()
    );

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("#").add_attribute(Attribute::Bold)];
    header.extend(space.names().map(Cell::new));
    header.push(Cell::new("Innovation").fg(Color::Green));
    header.push(Cell::new("Diversity").fg(Color::Cyan));
    header.push(Cell::new("Gini").fg(Color::Red));
    table.set_header(header);

    for i in 1..=(space.len() + 3) {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for (rank, ind) in front.iter().enumerate() {
        let v = ind.objectives.values();
        let mut row = vec![Cell::new(rank + 1)];
        row.extend(ind.params.iter().map(|p| Cell::new(format!("{:.4}", p))));
        if ind.objectives.is_penalty() {
            row.extend((0..3).map(|_| Cell::new("penalty").fg(Color::DarkGrey)));
        } else {
            row.push(Cell::new(format!("{:.1}", -v[0])).fg(Color::Green));
            row.push(Cell::new(format!("{:.3}", -v[1])).fg(Color::Cyan));
            row.push(Cell::new(format!("{:.3}", v[2])).fg(Color::Red));
        }
        table.add_row(row);
    }

    println!("{table}");
    println!(
        "Evaluations: {} ({} penalized) | Checkpoint rows: {}",
        report.evaluations, report.failed_evaluations, report.checkpoint_rows
    );
}
