use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use lihtc_core::equity::{self, EquityTerms};
use lihtc_core::policy::UnderwritingPolicy;
use lihtc_core::types::CreditType;

use crate::input;

/// Arguments for the LIHTC equity raise
#[derive(Args)]
pub struct EquityArgs {
    /// Path to an EquityTerms file (JSON or YAML; overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Development cost eligible for credits
    #[arg(long)]
    pub eligible_basis: Option<Decimal>,

    /// Income-qualified fraction of units or floor area
    #[arg(long, default_value = "1.0")]
    pub applicable_fraction: Decimal,

    /// Annual credit percentage (0.09 for the 9% credit)
    #[arg(long, default_value = "0.09")]
    pub credit_rate: Decimal,

    /// Credit delivery period in years
    #[arg(long, default_value = "10")]
    pub credit_term: u32,

    /// Investor price per dollar of credit
    #[arg(long, default_value = "0.90")]
    pub pricing: Decimal,

    /// Syndication fee as a fraction of gross equity
    #[arg(long)]
    pub syndication_fee: Option<Decimal>,

    /// Bridge loan annual interest rate (sizes a bridge when set)
    #[arg(long)]
    pub bridge_interest: Option<Decimal>,

    /// Bridge loan term in years
    #[arg(long, default_value = "2")]
    pub bridge_term: u32,
}

pub fn run_equity(args: EquityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: EquityTerms = if let Some(ref path) = args.input {
        input::file::read_inputs(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let eligible_basis = args
            .eligible_basis
            .ok_or("--eligible-basis is required (or provide --input)")?;

        EquityTerms {
            eligible_basis,
            applicable_fraction: args.applicable_fraction,
            credit_rate: args.credit_rate,
            credit_term_years: args.credit_term,
            pricing: args.pricing,
            credit_type: if args.credit_rate <= dec!(0.05) {
                CreditType::FourPercent
            } else {
                CreditType::NinePercent
            },
            include_syndication_fee: args.syndication_fee.is_some(),
            syndication_fee_percent: args.syndication_fee.unwrap_or(Decimal::ZERO),
            use_bridge_loan: args.bridge_interest.is_some(),
            bridge_loan_interest: args.bridge_interest.unwrap_or(Decimal::ZERO),
            bridge_loan_term_years: args.bridge_term,
        }
    };

    let result = equity::compute_equity(&terms, &UnderwritingPolicy::default())?;
    Ok(serde_json::to_value(result)?)
}
