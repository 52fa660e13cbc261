//! clickcheck CLI - check product export sheets
//!
//! ```bash
//! clickcheck check export.xlsx --out-dir report/   # Check and write CSV reports
//! clickcheck serve                                 # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! clickcheck parse export.csv       # Dump the parsed sheet as JSON
//! clickcheck default-rules          # Print the default rule settings
//! clickcheck enrich export.csv --lookup items.json --key-column Artikel --value-column Gewicht
//! ```

use clap::{Parser, Subcommand};
use clickcheck::enrich::AgreementCounts;
use clickcheck::{
    enrich_sheet, parse_file_auto, run_check, summary_lines, CheckResult, CollectingSink,
    CsvReportSink, HeaderMap, IngestOptions, RuleConfig, RuleSettings, StaticLookup,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const PORT_ENV: &str = "CLICKCHECK_PORT";
const DEFAULT_PORT: u16 = 3000;

#[derive(Parser)]
#[command(name = "clickcheck")]
#[command(about = "Check product export sheets for mandatory fields, codes and measurements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every row of a sheet
    Check {
        /// Input CSV or workbook
        input: PathBuf,

        /// Rules file (JSON); falls back to $CLICKCHECK_RULES, then defaults
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Title rows above the header row
        #[arg(long, default_value_t = clickcheck::parser::DEFAULT_SKIP_ROWS)]
        skip_rows: usize,

        /// Write passed/failed/summary CSV files into this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Write the full verdict report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Parse a sheet and output it as JSON
    Parse {
        /// Input CSV or workbook
        input: PathBuf,

        #[arg(long, default_value_t = clickcheck::parser::DEFAULT_SKIP_ROWS)]
        skip_rows: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default rule settings as JSON
    DefaultRules,

    /// Compare a sheet column against a lookup table
    Enrich {
        /// Input CSV or workbook
        input: PathBuf,

        /// Lookup table: JSON object of key → value
        #[arg(short, long)]
        lookup: PathBuf,

        /// Header of the key column
        #[arg(long)]
        key_column: String,

        /// Header of the column to compare
        #[arg(long)]
        value_column: String,

        #[arg(long, default_value_t = clickcheck::parser::DEFAULT_SKIP_ROWS)]
        skip_rows: usize,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $CLICKCHECK_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Rules file (JSON); falls back to $CLICKCHECK_RULES, then defaults
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            input,
            rules,
            skip_rows,
            out_dir,
            json,
        } => cmd_check(
            &input,
            rules.as_deref(),
            skip_rows,
            out_dir.as_deref(),
            json.as_deref(),
        ),

        Commands::Parse {
            input,
            skip_rows,
            output,
        } => cmd_parse(&input, skip_rows, output.as_deref()),

        Commands::DefaultRules => cmd_default_rules(),

        Commands::Enrich {
            input,
            lookup,
            key_column,
            value_column,
            skip_rows,
        } => cmd_enrich(&input, &lookup, &key_column, &value_column, skip_rows),

        Commands::Serve { port, rules } => cmd_serve(port, rules.as_deref()).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` means the command ran but found failing rows.
type CmdResult = Result<bool, Box<dyn std::error::Error>>;

fn cmd_check(
    input: &Path,
    rules: Option<&Path>,
    skip_rows: usize,
    out_dir: Option<&Path>,
    json_path: Option<&Path>,
) -> CmdResult {
    let config = RuleConfig::load(rules)?;
    eprintln!("📄 Checking: {}", input.display());

    let sheet = parse_file_auto(input, IngestOptions { skip_rows })?;
    eprintln!("   Rows: {}", sheet.rows.len());
    eprintln!("   Columns: {}", sheet.headers.len());

    let mut collected = CollectingSink::new();
    let summary = match out_dir {
        Some(dir) => {
            let header_map = HeaderMap::resolve(&sheet.headers, config.fields().needles());
            let csv = CsvReportSink::create(dir, &header_map)?;
            let mut sinks = (&mut collected, csv);
            let summary = run_check(&sheet, &config, &mut sinks)?;
            eprintln!("💾 Reports written to: {}", dir.display());
            summary
        }
        None => run_check(&sheet, &config, &mut collected)?,
    };

    if let Some(path) = json_path {
        let (verdicts, _) = collected.into_parts();
        let result = CheckResult {
            sheet_info: sheet.info(),
            verdicts,
            summary: summary.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&result)?)?;
        eprintln!("💾 Verdicts written to: {}", path.display());
    }

    for line in summary_lines(&summary) {
        println!("{:<36} {:>6} {:>8}", line.label, line.count, line.rate_text());
    }

    Ok(summary.invalid_rows == 0)
}

fn cmd_parse(input: &Path, skip_rows: usize, output: Option<&Path>) -> CmdResult {
    eprintln!("📄 Parsing: {}", input.display());

    let sheet = parse_file_auto(input, IngestOptions { skip_rows })?;
    if let Some(encoding) = &sheet.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = sheet.delimiter {
        eprintln!(
            "   Delimiter: '{}'",
            clickcheck::parser::format_delimiter(delimiter)
        );
    }
    eprintln!("   Columns: {}", sheet.headers.join(", "));
    eprintln!("✅ Parsed {} rows", sheet.rows.len());

    let json = serde_json::to_string_pretty(&sheet)?;
    write_output(&json, output)?;
    Ok(true)
}

fn cmd_default_rules() -> CmdResult {
    println!("{}", RuleSettings::default().to_json()?);
    Ok(true)
}

fn cmd_enrich(
    input: &Path,
    lookup_path: &Path,
    key_column: &str,
    value_column: &str,
    skip_rows: usize,
) -> CmdResult {
    let lookup = StaticLookup::from_json_file(lookup_path)?;
    eprintln!("📖 Lookup table: {} entries", lookup.len());

    let sheet = parse_file_auto(input, IngestOptions { skip_rows })?;
    let rows = enrich_sheet(&sheet, key_column, value_column, &lookup)?;
    let counts = AgreementCounts::from_rows(&rows);
    eprintln!(
        "📊 {} rows: {} match, {} mismatch, {} not found",
        counts.total, counts.matched, counts.mismatched, counts.not_found
    );

    let json = serde_json::to_string_pretty(&json!({
        "counts": counts,
        "rows": rows,
    }))?;
    println!("{}", json);
    Ok(true)
}

async fn cmd_serve(port: Option<u16>, rules: Option<&Path>) -> CmdResult {
    let port = match port {
        Some(p) => p,
        None => match std::env::var(PORT_ENV) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| format!("Invalid {}: '{}'", PORT_ENV, raw))?,
            Err(_) => DEFAULT_PORT,
        },
    };
    let config = RuleConfig::load(rules)?;
    clickcheck::server::start_server(port, config).await?;
    Ok(true)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
