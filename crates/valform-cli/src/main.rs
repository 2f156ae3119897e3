mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use valform_core::model::ApplicationType;

#[derive(Parser)]
#[command(
    name = "valform",
    version,
    about = "Field extraction for fixed-layout property valuation report PDFs"
)]
struct Cli {
    /// Log extractor decisions (debug level) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract report fields from a PDF or a JSON array of spans
    Extract {
        /// Path to PDF or spans JSON file
        input_file: PathBuf,

        /// Template variant: btl (default) or hpp
        #[arg(short = 't', long = "type", default_value = "btl")]
        application_type: ApplicationType,

        /// Predefined field set (default: valuation-report)
        #[arg(short, long, value_name = "NAME", default_value = "valuation-report")]
        preset: String,

        /// Custom JSON field set file (overrides --preset)
        #[arg(short, long = "fields", value_name = "FILE")]
        fields: Option<PathBuf>,

        /// Only extract the named group(s)
        #[arg(short, long = "group", value_name = "NAME")]
        group: Vec<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Also run the full-text fallback and include its text
        #[arg(long)]
        raw_text: bool,
    },
    /// Dump the positioned text spans of a PDF
    Spans {
        /// Path to PDF file
        pdf_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Group spans into visual rows
        #[arg(long)]
        rows: bool,

        /// Write spans to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Manage and inspect field sets
    Fields {
        #[command(subcommand)]
        action: FieldsAction,
    },
}

#[derive(Subcommand)]
enum FieldsAction {
    /// List predefined field sets
    List,
    /// Show the groups and fields of a field set
    Show {
        /// Preset name (e.g., "valuation-report")
        preset: String,
    },
    /// Print the JSON schema with field descriptions and example
    Schema,
    /// Validate a custom field set file
    Validate {
        /// Path to JSON field set file
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            input_file,
            application_type,
            preset,
            fields,
            group,
            output,
            raw_text,
        } => commands::extract::run(commands::extract::ExtractArgs {
            input_file,
            application_type,
            preset,
            fields,
            groups: group,
            output_format: output,
            raw_text,
        }),
        Commands::Spans {
            pdf_file,
            output,
            rows,
            out,
        } => commands::spans::run(pdf_file, &output, rows, out),
        Commands::Fields { action } => match action {
            FieldsAction::List => commands::fields::list(),
            FieldsAction::Show { preset } => commands::fields::show(&preset),
            FieldsAction::Schema => commands::fields::schema(),
            FieldsAction::Validate { file } => commands::fields::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
