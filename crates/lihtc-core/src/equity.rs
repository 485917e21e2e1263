use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LihtcError;
use crate::policy::UnderwritingPolicy;
use crate::types::{with_metadata, ComputationOutput, CreditType, Money, ProjectInputs, Rate};
use crate::LihtcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Credit and syndication terms for the equity raise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityTerms {
    /// Development cost eligible for credits
    pub eligible_basis: Money,
    /// Income-qualified fraction of units or floor area
    pub applicable_fraction: Rate,
    /// Annual credit percentage
    pub credit_rate: Rate,
    /// Credit delivery period in years
    #[serde(default = "default_credit_term")]
    pub credit_term_years: u32,
    /// Investor price per dollar of credit
    pub pricing: Rate,
    pub credit_type: CreditType,
    pub include_syndication_fee: bool,
    pub syndication_fee_percent: Rate,
    pub use_bridge_loan: bool,
    pub bridge_loan_interest: Rate,
    pub bridge_loan_term_years: u32,
}

fn default_credit_term() -> u32 {
    10
}

impl EquityTerms {
    pub fn from_inputs(inputs: &ProjectInputs) -> Self {
        EquityTerms {
            eligible_basis: inputs.eligible_basis,
            applicable_fraction: inputs.applicable_fraction,
            credit_rate: inputs.credit_rate,
            credit_term_years: inputs.credit_term_years,
            pricing: inputs.pricing,
            credit_type: inputs.credit_type,
            include_syndication_fee: inputs.include_syndication_fee,
            syndication_fee_percent: inputs.syndication_fee_percent,
            use_bridge_loan: inputs.use_bridge_loan,
            bridge_loan_interest: inputs.bridge_loan_interest,
            bridge_loan_term_years: inputs.bridge_loan_term_years,
        }
    }
}

/// Equity pay-in by milestone. Amounts sum to net equity up to rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisbursementSchedule {
    pub closing: Money,
    pub construction_completion: Money,
    pub stabilization: Money,
}

impl DisbursementSchedule {
    pub fn total(&self) -> Money {
        self.closing + self.construction_completion + self.stabilization
    }
}

/// Bridge financing sized against equity still outstanding after closing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeLoan {
    /// Average equity gap the bridge must cover
    pub principal: Money,
    /// Simple interest over the bridge term
    pub interest: Money,
    pub total_repayment: Money,
}

/// Result of the LIHTC equity raise calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LihtcEquityResult {
    pub qualified_basis: Money,
    pub annual_credit: Money,
    pub total_credit: Money,
    pub gross_equity: Money,
    pub syndication_fee: Money,
    /// Equity actually reaching the project after the syndicator's cut
    pub net_equity: Money,
    pub credit_type: CreditType,
    pub disbursement_schedule: DisbursementSchedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_loan: Option<BridgeLoan>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size the LIHTC equity raise: qualified basis through net syndication
/// proceeds, the milestone pay-in schedule, and optional bridge financing.
pub fn compute_equity(
    terms: &EquityTerms,
    policy: &UnderwritingPolicy,
) -> LihtcResult<ComputationOutput<LihtcEquityResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    policy.validate()?;
    validate_terms(terms, &mut warnings)?;

    let qualified_basis = terms.eligible_basis * terms.applicable_fraction;
    let annual_credit = qualified_basis * terms.credit_rate;
    let total_credit = annual_credit * Decimal::from(terms.credit_term_years);
    let gross_equity = total_credit * terms.pricing;

    let syndication_fee = if terms.include_syndication_fee {
        gross_equity * terms.syndication_fee_percent
    } else {
        Decimal::ZERO
    };
    let net_equity = gross_equity - syndication_fee;

    let split = &policy.disbursement_split;
    let disbursement_schedule = DisbursementSchedule {
        closing: (net_equity * split.closing).round_dp(2),
        construction_completion: (net_equity * split.construction_completion).round_dp(2),
        stabilization: (net_equity * split.stabilization).round_dp(2),
    };

    let bridge_loan = if terms.use_bridge_loan {
        Some(size_bridge_loan(terms, policy, net_equity))
    } else {
        None
    };

    let output = LihtcEquityResult {
        qualified_basis: qualified_basis.round_dp(2),
        annual_credit: annual_credit.round_dp(2),
        total_credit: total_credit.round_dp(2),
        gross_equity: gross_equity.round_dp(2),
        syndication_fee: syndication_fee.round_dp(2),
        net_equity: net_equity.round_dp(2),
        credit_type: terms.credit_type,
        disbursement_schedule,
        bridge_loan,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LIHTC Equity Sizing",
        terms,
        warnings,
        elapsed,
        output,
    ))
}

/// Equity arriving after closing is outstanding, on average, for half the
/// bridge term; the bridge principal covers that average gap.
fn size_bridge_loan(
    terms: &EquityTerms,
    policy: &UnderwritingPolicy,
    net_equity: Money,
) -> BridgeLoan {
    let post_closing_share = Decimal::ONE - policy.disbursement_split.closing;
    let average_equity_gap = net_equity * post_closing_share / dec!(2);
    let interest = average_equity_gap
        * terms.bridge_loan_interest
        * Decimal::from(terms.bridge_loan_term_years);

    BridgeLoan {
        principal: average_equity_gap.round_dp(2),
        interest: interest.round_dp(2),
        total_repayment: (average_equity_gap + interest).round_dp(2),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_terms(terms: &EquityTerms, warnings: &mut Vec<String>) -> LihtcResult<()> {
    if terms.eligible_basis < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "eligible_basis".into(),
            reason: "Eligible basis cannot be negative".into(),
        });
    }

    if terms.applicable_fraction < Decimal::ZERO || terms.applicable_fraction > Decimal::ONE {
        return Err(LihtcError::InvalidInput {
            field: "applicable_fraction".into(),
            reason: "Applicable fraction must be between 0 and 1".into(),
        });
    }

    if terms.pricing <= Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "pricing".into(),
            reason: "Credit pricing must be positive".into(),
        });
    }

    if terms.credit_rate < Decimal::ZERO || terms.credit_rate > Decimal::ONE {
        return Err(LihtcError::InvalidInput {
            field: "credit_rate".into(),
            reason: "Credit rate must be between 0 and 1".into(),
        });
    }

    if terms.credit_term_years == 0 {
        return Err(LihtcError::InvalidInput {
            field: "credit_term_years".into(),
            reason: "Credit term must be at least 1 year".into(),
        });
    }

    if terms.include_syndication_fee
        && (terms.syndication_fee_percent < Decimal::ZERO
            || terms.syndication_fee_percent > Decimal::ONE)
    {
        return Err(LihtcError::InvalidInput {
            field: "syndication_fee_percent".into(),
            reason: "Syndication fee percent must be between 0 and 1".into(),
        });
    }

    if terms.use_bridge_loan {
        if terms.bridge_loan_interest < Decimal::ZERO || terms.bridge_loan_interest >= Decimal::ONE
        {
            return Err(LihtcError::InvalidInput {
                field: "bridge_loan_interest".into(),
                reason: "Bridge loan interest must be in [0, 1)".into(),
            });
        }
        if terms.bridge_loan_term_years == 0 {
            return Err(LihtcError::InvalidInput {
                field: "bridge_loan_term_years".into(),
                reason: "Bridge loan term must be at least 1 year".into(),
            });
        }
    }

    // Typical investor pricing runs $0.80-$0.95 per credit dollar
    if terms.pricing > dec!(1.05) {
        warnings.push(format!(
            "Pricing {} exceeds $1.05 per credit dollar — above any observed market",
            terms.pricing
        ));
    } else if terms.pricing < dec!(0.70) {
        warnings.push(format!(
            "Pricing {} is below $0.70 per credit dollar — verify investor terms",
            terms.pricing
        ));
    }

    Ok(())
}
