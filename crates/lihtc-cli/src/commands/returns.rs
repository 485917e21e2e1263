use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lihtc_core::metrics::{self, ReturnMetricsInput};

use crate::input;

/// Arguments for IRR / DSCR metrics
#[derive(Args)]
pub struct ReturnsArgs {
    /// Path to a ReturnMetricsInput file (JSON or YAML; overrides flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual cash flows to equity (comma-separated, e.g. "150000,150000,2500000")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Cash equity invested at closing
    #[arg(long)]
    pub equity: Option<Decimal>,

    /// Stabilized year-1 NOI
    #[arg(long)]
    pub noi: Option<Decimal>,

    /// Annual debt service
    #[arg(long)]
    pub debt_service: Option<Decimal>,
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let metrics_input: ReturnMetricsInput = if let Some(ref path) = args.input {
        input::file::read_inputs(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let cash_flows = args
            .cash_flows
            .ok_or("--cash-flows is required (or provide --input)")?;
        let equity_investment = args
            .equity
            .ok_or("--equity is required (or provide --input)")?;
        let noi_year_1 = args.noi.ok_or("--noi is required (or provide --input)")?;
        let annual_debt_service = args
            .debt_service
            .ok_or("--debt-service is required (or provide --input)")?;

        ReturnMetricsInput {
            cash_flows,
            equity_investment,
            noi_year_1,
            annual_debt_service,
        }
    };

    let result = metrics::compute_return_metrics(&metrics_input)?;
    Ok(serde_json::to_value(result)?)
}
