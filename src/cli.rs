//! CLI argument definitions for `typed-sheet`.

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use clap_verbosity_flag::WarnLevel;

#[derive(Parser)]
#[command(
    name = "typed-sheet",
    version,
    about = "Convert typed spreadsheet sheets to CSV tables and row struct declarations",
    long_about = "Convert typed spreadsheet sheets to CSV tables and row struct declarations.\n\n\
                  A sheet declares its columns on a header row of `type=name` cells.\n\
                  Defaults for directories and options are read from typed-sheet.toml."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Project config file (default: ./typed-sheet.toml when present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write one CSV file per sheet.
    Convert(ConvertArgs),

    /// Write one struct declaration file per workbook.
    Generate(GenerateArgs),

    /// List workbooks and sheets with the state of their outputs.
    List(ListArgs),

    /// Print the schema of each sheet without writing anything.
    Schema(SchemaArgs),
}

/// Which workbooks and sheets a command works on.
#[derive(Args)]
pub struct SourceArgs {
    /// Workbook files. When omitted, every workbook under the Excel directory.
    #[arg(value_name = "WORKBOOK")]
    pub workbooks: Vec<PathBuf>,

    /// Directory searched for workbooks.
    #[arg(long = "excel-dir", value_name = "DIR")]
    pub excel_dir: Option<PathBuf>,

    /// Sheet name or glob pattern, may be repeated (default: every sheet).
    #[arg(long = "sheet", value_name = "PATTERN")]
    pub sheets: Vec<String>,
}

#[derive(Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output directory for CSV files.
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// How data rows are keyed when the header has no KEY column.
    #[arg(long = "key-policy", value_enum)]
    pub key_policy: Option<KeyPolicyArg>,

    /// Key written on every data row by the constant policy.
    #[arg(long = "fallback-key", value_name = "VALUE")]
    pub fallback_key: Option<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output directory for declaration files.
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Declaration language.
    #[arg(long = "target", value_enum)]
    pub target: Option<TargetArg>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Directory searched for workbooks.
    #[arg(long = "excel-dir", value_name = "DIR")]
    pub excel_dir: Option<PathBuf>,

    /// Directory holding converted CSV files.
    #[arg(long = "csv-dir", value_name = "DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Directory holding declaration files.
    #[arg(long = "struct-dir", value_name = "DIR")]
    pub struct_dir: Option<PathBuf>,

    /// Declaration language looked for in the struct directory.
    #[arg(long = "target", value_enum)]
    pub target: Option<TargetArg>,

    /// Sheet name or glob pattern, may be repeated (default: every sheet).
    #[arg(long = "sheet", value_name = "PATTERN")]
    pub sheets: Vec<String>,
}

#[derive(Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TargetArg {
    Unreal,
    Rust,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KeyPolicyArg {
    Counter,
    Constant,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_with_global_flags() {
        let cli = Cli::try_parse_from([
            "typed-sheet",
            "convert",
            "Data/Items.xlsx",
            "--out-dir",
            "Data/CSV",
            "--sheet",
            "Item*",
            "--key-policy",
            "constant",
            "--config",
            "project.toml",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("project.toml")));
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.source.workbooks, vec![PathBuf::from("Data/Items.xlsx")]);
                assert_eq!(args.source.sheets, vec!["Item*".to_owned()]);
                assert_eq!(args.out_dir, Some(PathBuf::from("Data/CSV")));
                assert!(matches!(args.key_policy, Some(KeyPolicyArg::Constant)));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn rejects_unknown_target() {
        assert!(Cli::try_parse_from(["typed-sheet", "generate", "--target", "cpp"]).is_err());
    }
}
