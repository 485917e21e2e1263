use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// LIHTC credit type. The 9% credit applies to new construction or
/// substantial rehab without tax-exempt bonds; the 4% credit applies when
/// bond financing is used. The tag travels with the equity result for the
/// report layer; the actual rate is supplied separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditType {
    #[serde(rename = "9%")]
    NinePercent,
    #[serde(rename = "4%")]
    FourPercent,
}

/// Full set of deal assumptions for one underwriting run.
///
/// One immutable value drives the whole pipeline; every stage validates the
/// fields it consumes and fails fast on out-of-range values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInputs {
    /// Total cost to complete the project (land, hard, soft, fees)
    pub total_development_cost: Money,
    /// Development cost eligible for credits (excludes land and other
    /// ineligible items)
    pub eligible_basis: Money,
    /// Smaller of income-qualified unit fraction and floor-area fraction
    pub applicable_fraction: Rate,
    /// Annual credit percentage applied to qualified basis
    pub credit_rate: Rate,
    /// Years over which the IRS distributes the credits
    #[serde(default = "default_credit_term")]
    pub credit_term_years: u32,
    /// Investor price per dollar of credit
    pub pricing: Rate,
    pub credit_type: CreditType,
    pub include_syndication_fee: bool,
    /// Syndicator's cut of gross equity, applied when the flag is set
    pub syndication_fee_percent: Rate,
    pub use_bridge_loan: bool,
    /// Annual simple interest rate on the bridge loan
    pub bridge_loan_interest: Rate,
    pub bridge_loan_term_years: u32,
    /// Annual interest rate on the permanent mortgage
    pub permanent_loan_rate: Rate,
    /// Permanent loan amortization term in years
    pub permanent_loan_term_years: u32,
    /// Lender-required debt service coverage ratio (e.g. 1.15)
    pub dscr_required: Decimal,
    /// Construction period covered by the interest reserve
    pub construction_period_years: u32,
    /// Stabilized year-1 net operating income
    pub noi_year_1: Money,
    /// Annual NOI growth rate, compounding from year 2
    pub noi_growth_rate: Rate,
    /// Investment holding period in years
    pub hold_period_years: u32,
    /// Capitalization rate applied to final-year NOI at sale
    pub exit_cap_rate: Rate,
    /// Transaction costs as a fraction of terminal value
    pub selling_cost_percent: Rate,
    /// Soft funding sources by program name (HOME, CDBG, trust funds)
    pub soft_subsidies: BTreeMap<String, Money>,
    /// Cap on how much developer fee can be deferred to fill the gap
    pub max_deferred_developer_fee: Money,
}

fn default_credit_term() -> u32 {
    10
}

impl ProjectInputs {
    /// Representative 9% deal used by the CLI when no input file is given:
    /// $12M development cost, $10M eligible basis, HOME and CDBG subsidy,
    /// 10-year hold with a terminal sale.
    pub fn example() -> Self {
        let mut soft_subsidies = BTreeMap::new();
        soft_subsidies.insert("HOME".to_string(), dec!(1000000));
        soft_subsidies.insert("CDBG".to_string(), dec!(750000));

        ProjectInputs {
            total_development_cost: dec!(12000000),
            eligible_basis: dec!(10000000),
            applicable_fraction: dec!(1.0),
            credit_rate: dec!(0.09),
            credit_term_years: 10,
            pricing: dec!(0.90),
            credit_type: CreditType::NinePercent,
            include_syndication_fee: true,
            syndication_fee_percent: dec!(0.05),
            use_bridge_loan: true,
            bridge_loan_interest: dec!(0.06),
            bridge_loan_term_years: 2,
            permanent_loan_rate: dec!(0.05),
            permanent_loan_term_years: 30,
            dscr_required: dec!(1.15),
            construction_period_years: 2,
            noi_year_1: dec!(600000),
            noi_growth_rate: dec!(0.02),
            hold_period_years: 10,
            exit_cap_rate: dec!(0.05),
            selling_cost_percent: dec!(0.02),
            soft_subsidies,
            max_deferred_developer_fee: dec!(500000),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
