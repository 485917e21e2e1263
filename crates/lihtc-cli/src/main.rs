mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cashflow::CashFlowsArgs;
use commands::equity::EquityArgs;
use commands::returns::ReturnsArgs;
use commands::stack::CapitalStackArgs;
use commands::underwrite::UnderwriteArgs;

/// LIHTC affordable-housing underwriting
#[derive(Parser)]
#[command(
    name = "lihtc",
    version,
    about = "LIHTC affordable-housing underwriting",
    long_about = "Models the financial feasibility of a LIHTC development with \
                  decimal precision: tax-credit equity sizing, a DSCR/LTV \
                  constrained capital stack, hold-period cash flows with a \
                  terminal sale, and IRR/DSCR underwriting metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full underwriting pipeline on a deal
    Underwrite(UnderwriteArgs),
    /// Size the LIHTC equity raise
    Equity(EquityArgs),
    /// Assemble the capital stack for a deal
    CapitalStack(CapitalStackArgs),
    /// Project hold-period cash flows to equity
    CashFlows(CashFlowsArgs),
    /// Compute IRR and DSCR from cash flows
    Returns(ReturnsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Underwrite(args) => commands::underwrite::run_underwrite(args),
        Commands::Equity(args) => commands::equity::run_equity(args),
        Commands::CapitalStack(args) => commands::stack::run_capital_stack(args),
        Commands::CashFlows(args) => commands::cashflow::run_cash_flows(args),
        Commands::Returns(args) => commands::returns::run_returns(args),
        Commands::Version => {
            println!("lihtc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
