use std::path::Path;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::ContentArrangement;
use comfy_table::Table;
use tracing::info;
use tracing::info_span;

use typed_sheet::config::ProjectConfig;
use typed_sheet::config::DEFAULT_FALLBACK_KEY;
use typed_sheet::pipeline::convert_workbook;
use typed_sheet::pipeline::find_workbooks;
use typed_sheet::pipeline::generate_declaration;
use typed_sheet::pipeline::inspect_schemas;
use typed_sheet::pipeline::validate_directory;
use typed_sheet::pipeline::validate_workbook_path;
use typed_sheet::pipeline::workbook_status;
use typed_sheet::pipeline::BatchReport;
use typed_sheet::pipeline::ConvertOptions;
use typed_sheet::pipeline::FailureKind;
use typed_sheet::pipeline::StatusListing;
use typed_sheet::DeclarationTarget;
use typed_sheet::KeyPolicy;
use typed_sheet::SheetSelection;

use crate::cli::ConvertArgs;
use crate::cli::GenerateArgs;
use crate::cli::KeyPolicyArg;
use crate::cli::ListArgs;
use crate::cli::SchemaArgs;
use crate::cli::SourceArgs;
use crate::cli::TargetArg;

pub fn run_convert(args: &ConvertArgs, config: &ProjectConfig) -> Result<BatchReport> {
    let out_dir = required_dir(args.out_dir.as_deref(), config.paths.csv_dir.as_deref(), "--out-dir", "paths.csv_dir")?;
    validate_directory(&out_dir).context("CSV output directory")?;
    let workbooks = resolve_workbooks(&args.source, config)?;
    let selection = resolve_selection(&args.source.sheets, config)?;
    let options = ConvertOptions { key_policy: resolve_key_policy(args, config) };

    let mut report = BatchReport::default();
    for path in &workbooks {
        let workbook_report = convert_workbook(path, &selection, &out_dir, &options)
            .with_context(|| format!("convert {}", path.display()))?;
        report.merge(workbook_report);
    }
    info!(workbooks = workbooks.len(), files = report.written.len(), "Conversion finished");
    Ok(report)
}

pub fn run_generate(args: &GenerateArgs, config: &ProjectConfig) -> Result<BatchReport> {
    let out_dir = required_dir(args.out_dir.as_deref(), config.paths.struct_dir.as_deref(), "--out-dir", "paths.struct_dir")?;
    validate_directory(&out_dir).context("declaration output directory")?;
    let workbooks = resolve_workbooks(&args.source, config)?;
    let selection = resolve_selection(&args.source.sheets, config)?;
    let mut options = config.generate.declaration_options();
    if let Some(target) = args.target {
        options.target = declaration_target(target);
    }

    let mut report = BatchReport::default();
    for path in &workbooks {
        let workbook_report = generate_declaration(path, &selection, &out_dir, &options)
            .with_context(|| format!("generate {}", path.display()))?;
        report.merge(workbook_report);
    }
    Ok(report)
}

pub fn run_list(args: &ListArgs, config: &ProjectConfig) -> Result<StatusListing> {
    let excel_dir = required_dir(args.excel_dir.as_deref(), config.paths.excel_dir.as_deref(), "--excel-dir", "paths.excel_dir")?;
    let csv_dir = args.csv_dir.clone().or_else(|| config.paths.csv_dir.clone()).unwrap_or_default();
    let struct_dir = args.struct_dir.clone().or_else(|| config.paths.struct_dir.clone()).unwrap_or_default();
    let target = args.target.map(declaration_target).unwrap_or(config.generate.target);
    let selection = resolve_selection(&args.sheets, config)?;

    let span = info_span!("list", excel_dir = %excel_dir.display());
    let _guard = span.enter();
    let listing = workbook_status(&excel_dir, &csv_dir, &struct_dir, target, &selection).context("list workbooks")?;

    let mut table = Table::new();
    table.set_header(vec!["Workbook", "Sheet", "CSV", "Declaration"]);
    apply_table_style(&mut table);
    for status in &listing.sheets {
        table.add_row(vec![
            display_name(&status.workbook),
            status.sheet.clone(),
            mark(status.csv_exists).to_owned(),
            mark(status.declaration_exists).to_owned(),
        ]);
    }
    println!("{table}");
    print_failures(listing.failures.iter().map(|failure| (&failure.workbook, &failure.sheet, failure.message.as_str())));
    Ok(listing)
}

pub fn run_schema(args: &SchemaArgs, config: &ProjectConfig) -> Result<()> {
    let workbooks = resolve_workbooks(&args.source, config)?;
    let selection = resolve_selection(&args.source.sheets, config)?;
    let target = config.generate.target;

    for path in &workbooks {
        let schemas = inspect_schemas(path, &selection).with_context(|| format!("read {}", path.display()))?;
        for schema in schemas {
            println!("{} / {}", display_name(path), schema.sheet);
            let Some(header) = schema.header else {
                println!("  no typed header");
                continue;
            };
            let mut table = Table::new();
            table.set_header(vec!["Column", "Field", "Tag", "Type", "Key"]);
            apply_table_style(&mut table);
            for field in &schema.fields {
                table.add_row(vec![
                    typed_sheet::spreadsheet::reference::col_to_letters(field.col),
                    field.name.clone(),
                    field.tag.to_string(),
                    target.type_name(field.tag).to_owned(),
                    mark(header.key_col == Some(field.col)).to_owned(),
                ]);
            }
            println!("{table}");
            for problem in &schema.problems {
                println!("  problem: {problem}");
            }
        }
    }
    Ok(())
}

/// Prints the files written and every failure, problem and skipped sheet.
pub fn print_report(report: &BatchReport) {
    if !report.written.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Workbook", "Sheet", "Rows", "File"]);
        apply_table_style(&mut table);
        for file in &report.written {
            table.add_row(vec![
                display_name(&file.workbook),
                file.sheet.clone().unwrap_or_else(|| "-".to_owned()),
                file.rows.to_string(),
                file.path.display().to_string(),
            ]);
        }
        println!("{table}");
    }
    for skipped in &report.skipped {
        println!("skipped {} / {}: {}", display_name(&skipped.workbook), skipped.sheet, skipped.reason);
    }
    for problem in &report.problems {
        println!("problem {} / {}: {}", display_name(&problem.workbook), problem.sheet, problem.problem);
    }
    print_failures(report.failures.iter().map(|failure| {
        let message = match failure.kind {
            FailureKind::Parse => failure.message.clone(),
            FailureKind::Write => format!("write failed: {}", failure.message),
        };
        (&failure.workbook, &failure.sheet, message)
    }));
}

fn print_failures<'a, M: AsRef<str>>(failures: impl Iterator<Item = (&'a PathBuf, &'a Option<String>, M)>) {
    for (workbook, sheet, message) in failures {
        match sheet {
            Some(sheet) => eprintln!("error: {} / {}: {}", display_name(workbook), sheet, message.as_ref()),
            None => eprintln!("error: {}: {}", display_name(workbook), message.as_ref()),
        }
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

/// Named workbooks must all be valid before any is read.
fn resolve_workbooks(source: &SourceArgs, config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    if !source.workbooks.is_empty() {
        for path in &source.workbooks {
            validate_workbook_path(path)?;
        }
        return Ok(source.workbooks.clone());
    }
    let excel_dir = required_dir(source.excel_dir.as_deref(), config.paths.excel_dir.as_deref(), "--excel-dir", "paths.excel_dir")?;
    let workbooks = find_workbooks(&excel_dir).with_context(|| format!("search {}", excel_dir.display()))?;
    if workbooks.is_empty() {
        return Err(anyhow!("no workbooks found in {}", excel_dir.display()));
    }
    Ok(workbooks)
}

fn resolve_selection(patterns: &[String], config: &ProjectConfig) -> Result<SheetSelection> {
    let selection = if patterns.is_empty() {
        config.sheets.selection()
    } else {
        SheetSelection::from_patterns(patterns)
    };
    selection.context("sheet pattern")
}

fn resolve_key_policy(args: &ConvertArgs, config: &ProjectConfig) -> KeyPolicy {
    let configured = config.convert.key_policy();
    let fallback_key = args
        .fallback_key
        .clone()
        .or_else(|| config.convert.fallback_key.clone())
        .unwrap_or_else(|| DEFAULT_FALLBACK_KEY.to_owned());
    match args.key_policy {
        Some(KeyPolicyArg::Counter) => KeyPolicy::Counter,
        Some(KeyPolicyArg::Constant) => KeyPolicy::Constant(fallback_key),
        None => match configured {
            KeyPolicy::Constant(_) => KeyPolicy::Constant(fallback_key),
            KeyPolicy::Counter => KeyPolicy::Counter,
        },
    }
}

fn declaration_target(target: TargetArg) -> DeclarationTarget {
    match target {
        TargetArg::Unreal => DeclarationTarget::Unreal,
        TargetArg::Rust => DeclarationTarget::Rust,
    }
}

fn required_dir(cli: Option<&Path>, config: Option<&Path>, flag: &str, key: &str) -> Result<PathBuf> {
    cli.or(config)
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("no directory given: pass {flag} or set {key} in the config file"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn mark(present: bool) -> &'static str {
    if present { "yes" } else { "-" }
}
