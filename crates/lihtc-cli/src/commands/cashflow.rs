use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use lihtc_core::cashflow::{self, CashFlowAssumptions};

use crate::input;

/// Arguments for the cash-flow projection
#[derive(Args)]
pub struct CashFlowsArgs {
    /// Path to a CashFlowAssumptions file (JSON or YAML; overrides flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Stabilized year-1 NOI
    #[arg(long)]
    pub initial_noi: Option<Decimal>,

    /// Annual NOI growth rate
    #[arg(long, default_value = "0.02")]
    pub growth: Decimal,

    /// Annual debt service on the permanent loan
    #[arg(long)]
    pub debt_service: Option<Decimal>,

    /// Holding period in years
    #[arg(long, default_value = "10")]
    pub hold_years: u32,

    /// Exit cap rate applied to final-year NOI
    #[arg(long, default_value = "0.05")]
    pub exit_cap: Decimal,

    /// Selling costs as a fraction of terminal value
    #[arg(long, default_value = "0.02")]
    pub selling_cost: Decimal,

    /// Model a terminal sale in the final year
    #[arg(long)]
    pub sale: bool,
}

pub fn run_cash_flows(args: CashFlowsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions: CashFlowAssumptions = if let Some(ref path) = args.input {
        input::file::read_inputs(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let initial_noi = args
            .initial_noi
            .ok_or("--initial-noi is required (or provide --input)")?;
        let annual_debt_service = args.debt_service.unwrap_or(dec!(0));

        CashFlowAssumptions {
            initial_noi,
            noi_growth_rate: args.growth,
            annual_debt_service,
            hold_period_years: args.hold_years,
            exit_cap_rate: args.exit_cap,
            selling_cost_percent: args.selling_cost,
            include_sale: args.sale,
        }
    };

    let result = cashflow::project_cash_flows(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}
