//! `sheetfill` - fill a workbook template from a YAML configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use sheetfill_io_xlsx::{
    C_FILE_CONFIG_DEFAULT, ConfigDocument, FillError, N_ROW_LABEL_SCAN_END, N_ROW_LABEL_SCAN_START,
    ReportFill, SpecFillOptions, SpecLabelScanWindow, apply_form_fields, parse_field_assignment,
    run_fill,
};
use sheetfill_log::{EnumLogLevel, init_tracing};
use tracing::{debug, info, warn};

/// Populate the model template from a configuration document.
#[derive(Parser, Debug)]
#[command(name = "sheetfill")]
#[command(version)]
struct Cli {
    /// Configuration document
    #[arg(short, long, default_value = C_FILE_CONFIG_DEFAULT)]
    config: PathBuf,

    /// Template workbook (overrides `project.template`)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output workbook (overrides `project.output`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First row searched for budget labels
    #[arg(long, default_value_t = N_ROW_LABEL_SCAN_START)]
    label_row_start: u32,

    /// Last row (inclusive) searched for budget labels
    #[arg(long, default_value_t = N_ROW_LABEL_SCAN_END)]
    label_row_end: u32,

    /// Form field to merge into the config before the run, e.g.
    /// `budget::acquisition::Land Cost=500000`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_field_assignment)]
    fields: Vec<(String, String)>,

    /// Resolve and apply in memory, print the writes, save nothing
    #[arg(long)]
    dry_run: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,
}

fn merge_fields(cli: &Cli) -> Result<(), FillError> {
    if cli.fields.is_empty() {
        return Ok(());
    }
    let mut document = ConfigDocument::load_or_default(&cli.config)?;
    let cnt = apply_form_fields(&mut document, &cli.fields, true);
    debug!("Merged {cnt} field(s) into {}", cli.config.display());
    document.save(&cli.config)
}

fn run(cli: &Cli) -> Result<ReportFill, FillError> {
    merge_fields(cli)?;
    run_fill(&SpecFillOptions {
        path_file_config: cli.config.clone(),
        path_file_template: cli.template.clone(),
        path_file_out: cli.output.clone(),
        label_scan_window: SpecLabelScanWindow {
            row_start: cli.label_row_start,
            row_end: cli.label_row_end,
        },
        if_dry_run: cli.dry_run,
        ..SpecFillOptions::default()
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(EnumLogLevel::from_verbosity(cli.verbose, cli.quiet)) {
        eprintln!("{err}");
    }

    let report = match run(&cli) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!("{report}");
    for warning in &report.warnings {
        warn!("{warning}");
    }
    match &report.path_file_out {
        Some(path) => println!("Updated workbook saved to {}", path.display()),
        None => {
            for write in &report.writes {
                println!("{}!{} = {}", write.sheet_name, write.cell, write.value);
            }
            println!("Dry run: {} cell(s) would be written", report.cnt_written);
        }
    }
    ExitCode::SUCCESS
}
