use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::LihtcError;
use crate::policy::UnderwritingPolicy;
use crate::time_value::annuity_present_value;
use crate::types::{with_metadata, ComputationOutput, Money, ProjectInputs};
use crate::LihtcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which underwriting test sized the permanent loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingConstraint {
    Dscr,
    LoanToValue,
}

/// Sources and uses of funds for the deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalStackResult {
    /// Net LIHTC equity carried in from the equity raise
    pub lihtc_equity: Money,
    pub soft_subsidies: BTreeMap<String, Money>,
    pub soft_subsidies_total: Money,
    /// Permanent loan, the lesser of the DSCR and LTV limits
    pub loan: Money,
    pub binding_constraint: BindingConstraint,
    pub loan_limit_by_dscr: Money,
    pub loan_limit_by_ltv: Money,
    /// NOI divided by the required coverage ratio
    pub annual_debt_service_capacity: Money,
    /// Simple interest set aside for the construction period
    pub interest_reserve: Money,
    /// Developer fee deferred to fill the gap, up to the cap
    pub deferred_developer_fee: Money,
    /// Cash equity still required after all other sources
    pub equity_required: Money,
    /// Amount by which committed sources exceed uses, when over-funded
    pub funding_surplus: Money,
    pub total_sources: Money,
    pub total_uses: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assemble the capital stack around the net LIHTC equity: size the
/// permanent loan against both the DSCR and LTV limits, fund the interest
/// reserve, defer developer fee into any remaining gap, and back into the
/// cash equity requirement.
pub fn build_capital_stack(
    inputs: &ProjectInputs,
    net_lihtc_equity: Money,
    policy: &UnderwritingPolicy,
) -> LihtcResult<ComputationOutput<CapitalStackResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    policy.validate()?;
    validate_inputs(inputs, net_lihtc_equity, &mut warnings)?;

    let soft_subsidies_total: Money = inputs.soft_subsidies.values().copied().sum();

    // Loan sizing: the lender lends the lesser of what NOI can cover at the
    // required DSCR and the LTV ceiling on total cost.
    let annual_debt_service_capacity = inputs.noi_year_1 / inputs.dscr_required;
    let loan_limit_by_dscr = annuity_present_value(
        annual_debt_service_capacity,
        inputs.permanent_loan_rate,
        inputs.permanent_loan_term_years,
    )?;
    let loan_limit_by_ltv = policy.max_loan_to_value * inputs.total_development_cost;

    let (loan, binding_constraint) = if loan_limit_by_dscr <= loan_limit_by_ltv {
        (loan_limit_by_dscr, BindingConstraint::Dscr)
    } else {
        (loan_limit_by_ltv, BindingConstraint::LoanToValue)
    };

    if binding_constraint == BindingConstraint::LoanToValue {
        warnings.push("Permanent loan constrained by the LTV ceiling rather than DSCR".into());
    }

    let interest_reserve =
        loan * inputs.permanent_loan_rate * Decimal::from(inputs.construction_period_years);

    let used_sources = net_lihtc_equity + soft_subsidies_total + loan;
    let raw_gap = inputs.total_development_cost + interest_reserve - used_sources;

    // An over-funded stack would otherwise show up as a negative "deferred
    // fee"; clamp at zero and surface the excess instead.
    let funding_gap = raw_gap.max(Decimal::ZERO);
    let funding_surplus = (-raw_gap).max(Decimal::ZERO);
    if funding_surplus > Decimal::ZERO {
        warnings.push(format!(
            "Committed sources exceed uses by {} — no cash equity or deferred fee is needed",
            funding_surplus.round_dp(2)
        ));
    }

    let deferred_developer_fee = funding_gap.min(inputs.max_deferred_developer_fee);
    let equity_required = funding_gap - deferred_developer_fee;

    if deferred_developer_fee == inputs.max_deferred_developer_fee && equity_required > Decimal::ZERO
    {
        warnings.push(format!(
            "Deferred developer fee capped at {}; {} of cash equity remains",
            inputs.max_deferred_developer_fee,
            equity_required.round_dp(2)
        ));
    }

    let total_sources =
        used_sources + deferred_developer_fee + equity_required;
    let total_uses = inputs.total_development_cost + interest_reserve;

    // Balanced by construction; surplus accounts for any over-funding.
    debug_assert_eq!(total_sources, total_uses + funding_surplus);

    let output = CapitalStackResult {
        lihtc_equity: net_lihtc_equity.round_dp(2),
        soft_subsidies: inputs
            .soft_subsidies
            .iter()
            .map(|(name, amount)| (name.clone(), amount.round_dp(2)))
            .collect(),
        soft_subsidies_total: soft_subsidies_total.round_dp(2),
        loan: loan.round_dp(2),
        binding_constraint,
        loan_limit_by_dscr: loan_limit_by_dscr.round_dp(2),
        loan_limit_by_ltv: loan_limit_by_ltv.round_dp(2),
        annual_debt_service_capacity: annual_debt_service_capacity.round_dp(2),
        interest_reserve: interest_reserve.round_dp(2),
        deferred_developer_fee: deferred_developer_fee.round_dp(2),
        equity_required: equity_required.round_dp(2),
        funding_surplus: funding_surplus.round_dp(2),
        total_sources: total_sources.round_dp(2),
        total_uses: total_uses.round_dp(2),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capital Stack Assembly (DSCR & LTV constrained loan)",
        &serde_json::json!({
            "total_development_cost": inputs.total_development_cost.to_string(),
            "net_lihtc_equity": net_lihtc_equity.to_string(),
            "dscr_required": inputs.dscr_required.to_string(),
            "max_loan_to_value": policy.max_loan_to_value.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_inputs(
    inputs: &ProjectInputs,
    net_lihtc_equity: Money,
    warnings: &mut Vec<String>,
) -> LihtcResult<()> {
    if inputs.total_development_cost <= Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "total_development_cost".into(),
            reason: "Total development cost must be positive".into(),
        });
    }

    if net_lihtc_equity < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "net_lihtc_equity".into(),
            reason: "Net LIHTC equity cannot be negative".into(),
        });
    }

    if inputs.dscr_required <= Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "dscr_required".into(),
            reason: "Required DSCR must be positive".into(),
        });
    }

    if inputs.permanent_loan_term_years == 0 {
        return Err(LihtcError::InvalidInput {
            field: "permanent_loan_term_years".into(),
            reason: "Permanent loan term must be at least 1 year".into(),
        });
    }

    if inputs.permanent_loan_rate < Decimal::ZERO || inputs.permanent_loan_rate >= Decimal::ONE {
        return Err(LihtcError::InvalidInput {
            field: "permanent_loan_rate".into(),
            reason: "Permanent loan rate must be in [0, 1)".into(),
        });
    }

    if inputs.noi_year_1 < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "noi_year_1".into(),
            reason: "Year-1 NOI cannot be negative".into(),
        });
    }

    if inputs.max_deferred_developer_fee < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "max_deferred_developer_fee".into(),
            reason: "Deferred developer fee cap cannot be negative".into(),
        });
    }

    for (name, amount) in &inputs.soft_subsidies {
        if *amount < Decimal::ZERO {
            return Err(LihtcError::InvalidInput {
                field: format!("soft_subsidies.{name}"),
                reason: "Subsidy amount cannot be negative".into(),
            });
        }
    }

    if inputs.dscr_required < dec!(1.0) {
        warnings.push(format!(
            "Required DSCR {} is below 1.0 — the loan would not cover its own payments",
            inputs.dscr_required
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn scenario_inputs() -> ProjectInputs {
        // 12M cost, 600k NOI at 1.15x coverage, 5%/30y loan
        ProjectInputs::example()
    }

    #[test]
    fn test_dscr_constrained_loan() {
        let inputs = scenario_inputs();
        let result =
            build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        // 600,000 / 1.15 = 521,739.13 of annual capacity; annuity factor at
        // 5%/30y is 15.3724510, so the DSCR limit lands near 8.02M, below
        // the 9M LTV ceiling.
        assert_eq!(out.annual_debt_service_capacity, dec!(521739.13));
        assert_eq!(out.loan_limit_by_ltv, dec!(9000000.00));
        assert!((out.loan_limit_by_dscr - dec!(8020409.23)).abs() < dec!(1));
        assert_eq!(out.loan, out.loan_limit_by_dscr);
        assert_eq!(out.binding_constraint, BindingConstraint::Dscr);
    }

    #[test]
    fn test_ltv_constrained_loan() {
        let mut inputs = scenario_inputs();
        inputs.noi_year_1 = dec!(1500000);

        let result =
            build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        assert_eq!(out.loan, dec!(9000000.00));
        assert_eq!(out.binding_constraint, BindingConstraint::LoanToValue);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("LTV ceiling")));
    }

    #[test]
    fn test_overfunded_stack_clamps_deferred_fee() {
        // The example deal is over-sourced: equity and deferred fee stay at
        // zero and the excess is surfaced as a surplus.
        let inputs = scenario_inputs();
        let result =
            build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        assert_eq!(out.deferred_developer_fee, dec!(0.00));
        assert_eq!(out.equity_required, dec!(0.00));
        assert_eq!(out.funding_surplus, dec!(4663368.31));
        assert_eq!(out.interest_reserve, dec!(802040.92));
    }

    #[test]
    fn test_gap_fills_deferred_fee_then_equity() {
        // 25M deal with a genuine gap: fee defers to its 1.5M cap, the rest
        // is cash equity.
        let mut soft_subsidies = BTreeMap::new();
        soft_subsidies.insert("HOME".to_string(), dec!(750000));
        let inputs = ProjectInputs {
            total_development_cost: dec!(25000000),
            noi_year_1: dec!(1300000),
            dscr_required: dec!(1.25),
            permanent_loan_rate: dec!(0.065),
            permanent_loan_term_years: 30,
            construction_period_years: 2,
            max_deferred_developer_fee: dec!(1500000),
            soft_subsidies,
            ..scenario_inputs()
        };

        let result =
            build_capital_stack(&inputs, dec!(8667648), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        assert!((out.loan - dec!(13581022.94)).abs() < dec!(1));
        assert_eq!(out.deferred_developer_fee, dec!(1500000.00));
        assert!((out.equity_required - dec!(2266862.04)).abs() < dec!(1));
        assert_eq!(out.funding_surplus, dec!(0.00));
    }

    #[test]
    fn test_sources_equal_uses() {
        let mut inputs = scenario_inputs();
        inputs.total_development_cost = dec!(18000000);
        inputs.max_deferred_developer_fee = dec!(400000);

        let result =
            build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        let diff = (out.total_sources - out.total_uses).abs();
        assert!(diff <= dec!(0.01), "sources/uses off by {diff}");
    }

    #[test]
    fn test_zero_rate_loan_uses_straight_multiple() {
        let mut inputs = scenario_inputs();
        inputs.permanent_loan_rate = dec!(0);

        let result =
            build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).unwrap();
        let out = &result.result;

        // capacity * term: 521,739.13... * 30, capped by 9M LTV
        assert_eq!(out.loan, dec!(9000000.00));
        assert_eq!(out.interest_reserve, dec!(0.00));
        assert!((out.loan_limit_by_dscr - dec!(15652173.91)).abs() < dec!(1));
    }

    #[test]
    fn test_zero_dscr_rejected() {
        let mut inputs = scenario_inputs();
        inputs.dscr_required = dec!(0);
        assert!(build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).is_err());
    }

    #[test]
    fn test_zero_loan_term_rejected() {
        let mut inputs = scenario_inputs();
        inputs.permanent_loan_term_years = 0;
        assert!(build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).is_err());
    }

    #[test]
    fn test_negative_subsidy_rejected() {
        let mut inputs = scenario_inputs();
        inputs
            .soft_subsidies
            .insert("Trust Fund".to_string(), dec!(-5));
        assert!(build_capital_stack(&inputs, dec!(7695000), &UnderwritingPolicy::default()).is_err());
    }
}
