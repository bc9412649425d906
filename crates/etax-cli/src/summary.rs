use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use etax_cli::report::{FileStatus, ValidationRun};
use etax_model::{DocumentType, ErrorLevel};
use etax_validate::DoctorReport;

pub fn print_validation(run: &ValidationRun) {
    println!("Document type: {}", run.document_type);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Status"),
        header_cell("Errors"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for file in &run.files {
        let (status, errors, warnings) = match &file.status {
            FileStatus::Validated { result, .. } if result.is_valid() => (
                Cell::new("VALID").fg(Color::Green).add_attribute(Attribute::Bold),
                Some(result.errors().len()),
                Some(result.warnings().len()),
            ),
            FileStatus::Validated { result, .. } => (
                Cell::new("INVALID").fg(Color::Red).add_attribute(Attribute::Bold),
                Some(result.errors().len()),
                Some(result.warnings().len()),
            ),
            FileStatus::Failed { .. } => (
                Cell::new("FAILED").fg(Color::Magenta).add_attribute(Attribute::Bold),
                None,
                None,
            ),
        };
        table.add_row(vec![
            Cell::new(file.path.display()),
            status,
            count_cell(errors, Color::Red),
            count_cell(warnings, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell(format!("{} file(s)", run.files.len())),
        count_cell(Some(run.error_count()), Color::Red).add_attribute(Attribute::Bold),
        count_cell(Some(run.warning_count()), Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_finding_table(run);

    let failed: Vec<_> = run
        .files
        .iter()
        .filter_map(|file| match &file.status {
            FileStatus::Failed { error } => Some((file, error)),
            FileStatus::Validated { .. } => None,
        })
        .collect();
    if !failed.is_empty() {
        eprintln!("Errors:");
        for (file, error) in failed {
            eprintln!("- {}: {error}", file.path.display());
        }
    }
}

fn print_finding_table(run: &ValidationRun) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Level"),
        header_cell("Rule"),
        header_cell("Message"),
        header_cell("Location"),
    ]);
    apply_finding_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    let mut rows = 0usize;
    for file in &run.files {
        let FileStatus::Validated { result, .. } = &file.status else {
            continue;
        };
        let name = file
            .path
            .file_name()
            .map_or_else(|| file.path.display().to_string(), |name| name.to_string_lossy().into_owned());
        for finding in result.findings() {
            table.add_row(vec![
                Cell::new(&name),
                level_cell(finding.level()),
                Cell::new(if finding.rule_id().is_empty() { "-" } else { finding.rule_id() }),
                Cell::new(finding.message()),
                dim_cell(finding.location()),
            ]);
            rows += 1;
        }
    }
    if rows == 0 {
        return;
    }
    println!();
    println!("Findings:");
    println!("{table}");
}

pub fn print_types() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("Name"),
        header_cell("Prefix"),
        header_cell("Type codes"),
        header_cell("Rules"),
        header_cell("Ruleset"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);
    for doc_type in DocumentType::all() {
        table.add_row(vec![
            Cell::new(doc_type.as_str()).add_attribute(Attribute::Bold),
            Cell::new(doc_type.document_name()),
            Cell::new(doc_type.rule_prefix()),
            Cell::new(doc_type.type_codes().join(", ")),
            if doc_type.is_empty_ruleset() {
                dim_cell("none")
            } else {
                Cell::new("yes").fg(Color::Green)
            },
            dim_cell(doc_type.ruleset_path()),
        ]);
    }
    println!("{table}");
}

pub fn print_doctor(report: &DoctorReport) {
    println!("Rule source: {}", report.source);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("Status"),
        header_cell("Patterns"),
        header_cell("Rules"),
        header_cell("Assertions"),
        header_cell("SHA-256"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for column in 2..5 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for status in &report.bundles {
        let health = if status.healthy {
            Cell::new("OK").fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            Cell::new("FAIL").fg(Color::Red).add_attribute(Attribute::Bold)
        };
        let digest = match (&status.sha256, &status.error) {
            (Some(digest), _) => dim_cell(&digest[..12.min(digest.len())]),
            (None, Some(error)) => Cell::new(error).fg(Color::Red),
            (None, None) => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(status.document_type.as_str()),
            health,
            Cell::new(status.patterns),
            Cell::new(status.rules),
            Cell::new(status.assertions),
            digest,
        ]);
    }
    println!("{table}");
    println!(
        "{}/{} bundles healthy, {} rules, {} assertions",
        report.counts.healthy, report.counts.bundles, report.counts.rules, report.counts.assertions
    );
}

fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

fn level_cell(level: ErrorLevel) -> Cell {
    match level {
        ErrorLevel::Error => Cell::new(level.label())
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        ErrorLevel::Warning => Cell::new(level.label()).fg(Color::Yellow),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
            ColumnConstraint::LowerBoundary(Width::Fixed(9)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ]);
    }
}

fn apply_finding_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(200);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(15)),
            ColumnConstraint::UpperBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Fixed(30)),
            ColumnConstraint::UpperBoundary(Width::Percentage(45)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
