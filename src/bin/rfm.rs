//! RFM CLI - Command-line interface for RFM Segment
//!
//! Commands:
//! - analyze: Score every customer in a transaction export
//! - lookup: Print a single customer's segment
//! - validate: Validate transaction records
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rfm_segment::encoder::{OutputFormat, ReportEncoder, REPORT_VERSION};
use rfm_segment::schema::{InputFormat, RawTransaction, TransactionAdapter, SCHEMA_VERSION};
use rfm_segment::{ComputeError, RfmAnalyzer, RfmConfig, ENGINE_VERSION, PRODUCER_NAME};

/// RFM - Customer segmentation from sales transactions
#[derive(Parser)]
#[command(name = "rfm")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score customers by recency, frequency and monetary value", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every customer in a transaction export
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormatArg,

        /// Analysis configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print a single customer's RFM record
    Lookup {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Customer identifier
        #[arg(short, long)]
        customer: String,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Analysis configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate transaction records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormatArg {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Json => InputFormat::Json,
            InputFormatArg::Ndjson => InputFormat::Ndjson,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormatArg {
    /// JSON array of records
    Json,
    /// Pretty-printed JSON array of records
    JsonPretty,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// CSV with a header row
    Csv,
    /// Full report with segment summary and bin edges
    Report,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::JsonPretty => OutputFormat::JsonPretty,
            OutputFormatArg::Ndjson => OutputFormat::Ndjson,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Report => OutputFormat::Report,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (rfm.transaction.v1)
    Input,
    /// Output schema (rfm.report.v1)
    Output,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RfmCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_analyze(
            &input,
            &output,
            input_format.into(),
            output_format.into(),
            config.as_deref(),
        ),

        Commands::Lookup {
            input,
            customer,
            input_format,
            config,
        } => cmd_lookup(&input, &customer, input_format.into(), config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format.into(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), RfmCliError> {
    let analyzer = load_analyzer(config)?;
    let records = read_records(input, input_format)?;

    if records.is_empty() {
        return Err(RfmCliError::NoRecords);
    }

    let table = analyzer.analyze_raw(&records)?;
    let output_data = ReportEncoder::new().render(&table, output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
        log::info!("wrote {} records to {}", table.len(), output.display());
    }

    Ok(())
}

fn cmd_lookup(
    input: &Path,
    customer: &str,
    input_format: InputFormat,
    config: Option<&Path>,
) -> Result<(), RfmCliError> {
    let analyzer = load_analyzer(config)?;
    let records = read_records(input, input_format)?;

    if records.is_empty() {
        return Err(RfmCliError::NoRecords);
    }

    let table = analyzer.analyze_raw(&records)?;
    match table.get(customer) {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(record)?);
            Ok(())
        }
        None => Err(RfmCliError::CustomerNotFound(customer.to_string())),
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), RfmCliError> {
    let records = read_records(input, input_format)?;

    // Validate each record
    let results = TransactionAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                customer_id: r.customer_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (customer {}): {}",
                    err.index,
                    err.customer_id.as_deref().unwrap_or("unknown"),
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(RfmCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), RfmCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("RFM engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}, output schema: {}", SCHEMA_VERSION, REPORT_VERSION),
    });

    // Check config file if provided
    if let Some(config_path) = config {
        if config_path.exists() {
            match RfmConfig::from_file(config_path) {
                Ok(cfg) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid ({} bins, {} segment rules, snapshot +{} days)",
                        cfg.bin_count,
                        cfg.segments.rules.len(),
                        cfg.snapshot_offset_days
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            });
        }
    } else {
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using default configuration".to_string(),
        });
    }

    // Check stdin (piped input for `-i -`)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass input files with -i)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for -i -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("RFM Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(RfmCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), RfmCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per sold order line:");
                println!();
                println!("- customer_id (alias CustomerKey): string or integer");
                println!("- order_date (alias OrderDate): YYYY-MM-DD, optional time part");
                println!("- line_id (alias SalesOrderLineKey): string or integer, counted distinct");
                println!("- amount (alias \"Sales Amount\"): signed decimal");
                println!();
                println!("All fields are required. Accepted formats: csv (with header), json, ndjson.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("One record per customer:");
                println!();
                println!("- customer_id");
                println!("- recency_days: days since last order, relative to the snapshot date");
                println!("- frequency: distinct order lines");
                println!("- monetary: total amount (decimal string)");
                println!("- r_score, f_score, m_score: 1-5 quantile scores");
                println!("- rfm_total: 3-15");
                println!("- segment: VIP | Loyal | Potential | At-risk / churned");
                println!();
                println!("The report format adds producer, snapshot_date, bins and segment summaries.");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_analyzer(config: Option<&Path>) -> Result<RfmAnalyzer, RfmCliError> {
    match config {
        Some(path) => Ok(RfmAnalyzer::with_config(RfmConfig::from_file(path)?)?),
        None => Ok(RfmAnalyzer::new()),
    }
}

fn read_records(input: &Path, format: InputFormat) -> Result<Vec<RawTransaction>, RfmCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = TransactionAdapter::parse(&input_data, format)?;
    log::debug!("read {} records from {}", records.len(), input.display());
    Ok(records)
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Sales order line for RFM analysis",
        "type": "object",
        "required": ["customer_id", "order_date", "line_id", "amount"],
        "properties": {
            "customer_id": { "type": ["string", "integer"] },
            "order_date": { "type": "string" },
            "line_id": { "type": ["string", "integer"] },
            "amount": { "type": ["string", "number"] }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REPORT_VERSION,
        "description": "RFM segmentation record",
        "type": "object",
        "required": [
            "customer_id", "recency_days", "frequency", "monetary",
            "r_score", "f_score", "m_score", "rfm_total", "segment"
        ],
        "properties": {
            "customer_id": { "type": "string" },
            "recency_days": { "type": "integer", "minimum": 0 },
            "frequency": { "type": "integer", "minimum": 1 },
            "monetary": { "type": "string" },
            "r_score": { "type": "integer", "minimum": 1, "maximum": 5 },
            "f_score": { "type": "integer", "minimum": 1, "maximum": 5 },
            "m_score": { "type": "integer", "minimum": 1, "maximum": 5 },
            "rfm_total": { "type": "integer", "minimum": 3, "maximum": 15 },
            "segment": {
                "type": "string",
                "enum": ["VIP", "Loyal", "Potential", "At-risk / churned"]
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum RfmCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoRecords,
    CustomerNotFound(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for RfmCliError {
    fn from(e: io::Error) -> Self {
        RfmCliError::Io(e)
    }
}

impl From<ComputeError> for RfmCliError {
    fn from(e: ComputeError) -> Self {
        RfmCliError::Compute(e)
    }
}

impl From<serde_json::Error> for RfmCliError {
    fn from(e: serde_json::Error) -> Self {
        RfmCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RfmCliError> for CliError {
    fn from(e: RfmCliError) -> Self {
        match e {
            RfmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RfmCliError::Compute(e) => compute_error(e),
            RfmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RfmCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No transaction records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RfmCliError::CustomerNotFound(id) => CliError {
                code: "CUSTOMER_NOT_FOUND".to_string(),
                message: format!("Customer {} has no transactions in the input", id),
                hint: None,
            },
            RfmCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            RfmCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::EmptyInput => ("EMPTY_INPUT", Some("Ensure input contains transactions")),
        ComputeError::MissingField { .. } | ComputeError::DateParseError { .. } => (
            "INVALID_RECORD",
            Some("Run 'rfm validate' for details"),
        ),
        ComputeError::InsufficientData { .. } => (
            "INSUFFICIENT_DATA",
            Some("Quantile scoring needs at least two customers"),
        ),
        ComputeError::InvalidConfig(_) => ("CONFIG_ERROR", Some("Run 'rfm doctor --config <path>'")),
        ComputeError::ParseError(_) | ComputeError::JsonError(_) | ComputeError::CsvError(_) => (
            "PARSE_ERROR",
            Some("Ensure input matches rfm.transaction.v1 schema"),
        ),
        ComputeError::EncodingError(_) => ("ENCODING_ERROR", None),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    customer_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
