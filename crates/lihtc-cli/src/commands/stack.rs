use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lihtc_core::capital_stack;
use lihtc_core::equity::{self, EquityTerms};

use crate::input;

/// Arguments for capital stack assembly
#[derive(Args)]
pub struct CapitalStackArgs {
    /// Path to a ProjectInputs file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Run the built-in example deal
    #[arg(long)]
    pub example: bool,

    /// Net LIHTC equity to place in the stack (computed from the deal's
    /// credit terms when omitted)
    #[arg(long)]
    pub net_equity: Option<Decimal>,

    /// Path to an underwriting policy override (JSON or YAML)
    #[arg(long)]
    pub policy: Option<String>,
}

pub fn run_capital_stack(args: CapitalStackArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = input::resolve_project_inputs(args.input.as_deref(), args.example)?;
    let policy = input::resolve_policy(args.policy.as_deref())?;

    let net_equity = match args.net_equity {
        Some(amount) => amount,
        None => {
            let raise = equity::compute_equity(&EquityTerms::from_inputs(&inputs), &policy)?;
            raise.result.net_equity
        }
    };

    let result = capital_stack::build_capital_stack(&inputs, net_equity, &policy)?;
    Ok(serde_json::to_value(result)?)
}
