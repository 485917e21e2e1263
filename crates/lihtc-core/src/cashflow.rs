use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LihtcError;
use crate::types::{with_metadata, ComputationOutput, Money, ProjectInputs, Rate};
use crate::LihtcResult;

/// Operating and exit assumptions for the hold-period projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowAssumptions {
    pub initial_noi: Money,
    /// NOI growth rate, compounding from year 2
    pub noi_growth_rate: Rate,
    pub annual_debt_service: Money,
    pub hold_period_years: u32,
    pub exit_cap_rate: Rate,
    pub selling_cost_percent: Rate,
    /// Model a terminal sale in the final year
    pub include_sale: bool,
}

impl CashFlowAssumptions {
    pub fn from_inputs(inputs: &ProjectInputs, annual_debt_service: Money, include_sale: bool) -> Self {
        CashFlowAssumptions {
            initial_noi: inputs.noi_year_1,
            noi_growth_rate: inputs.noi_growth_rate,
            annual_debt_service,
            hold_period_years: inputs.hold_period_years,
            exit_cap_rate: inputs.exit_cap_rate,
            selling_cost_percent: inputs.selling_cost_percent,
            include_sale,
        }
    }
}

/// Year-indexed cash flows to equity. Index 0 is year 1; the final element
/// carries the net sale proceeds when a terminal sale is modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub annual_cash_flows: Vec<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_sale_proceeds: Option<Money>,
}

/// Project annual cash flow to equity (NOI less debt service) over the hold
/// period, adding net proceeds from a terminal sale to the final year when
/// requested.
pub fn project_cash_flows(
    assumptions: &CashFlowAssumptions,
) -> LihtcResult<ComputationOutput<CashFlowSeries>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_assumptions(assumptions, &mut warnings)?;

    let n = assumptions.hold_period_years as usize;
    let one_plus_g = Decimal::ONE + assumptions.noi_growth_rate;

    let mut flows: Vec<Money> = Vec::with_capacity(n);
    let mut noi = assumptions.initial_noi;
    for _ in 0..n {
        flows.push(noi - assumptions.annual_debt_service);
        noi *= one_plus_g;
    }

    let (terminal_value, net_sale_proceeds) = if assumptions.include_sale {
        // The loop has grown NOI one step past the final modeled year; back
        // it out before capitalizing.
        let final_year_noi = noi / one_plus_g;
        let terminal_value = final_year_noi / assumptions.exit_cap_rate;
        let net_proceeds = terminal_value * (Decimal::ONE - assumptions.selling_cost_percent);

        let last = flows
            .last_mut()
            .ok_or_else(|| LihtcError::InvalidInput {
                field: "hold_period_years".into(),
                reason: "Hold period must be at least 1 year".into(),
            })?;
        *last += net_proceeds;

        (Some(terminal_value), Some(net_proceeds))
    } else {
        (None, None)
    };

    let output = CashFlowSeries {
        annual_cash_flows: flows.iter().map(|cf| cf.round_dp(2)).collect(),
        terminal_value: terminal_value.map(|v| v.round_dp(2)),
        net_sale_proceeds: net_sale_proceeds.map(|v| v.round_dp(2)),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cash Flow Projection (NOI growth with terminal sale)",
        assumptions,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_assumptions(
    assumptions: &CashFlowAssumptions,
    warnings: &mut Vec<String>,
) -> LihtcResult<()> {
    if assumptions.hold_period_years == 0 {
        return Err(LihtcError::InvalidInput {
            field: "hold_period_years".into(),
            reason: "Hold period must be at least 1 year".into(),
        });
    }

    if assumptions.noi_growth_rate <= dec!(-1) || assumptions.noi_growth_rate >= Decimal::ONE {
        return Err(LihtcError::InvalidInput {
            field: "noi_growth_rate".into(),
            reason: "NOI growth rate must be between -100% and 100%".into(),
        });
    }

    if assumptions.annual_debt_service < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "annual_debt_service".into(),
            reason: "Annual debt service cannot be negative".into(),
        });
    }

    if assumptions.include_sale {
        if assumptions.exit_cap_rate <= Decimal::ZERO {
            return Err(LihtcError::InvalidInput {
                field: "exit_cap_rate".into(),
                reason: "Exit cap rate must be positive when a sale is modeled".into(),
            });
        }
        if assumptions.selling_cost_percent < Decimal::ZERO
            || assumptions.selling_cost_percent >= Decimal::ONE
        {
            return Err(LihtcError::InvalidInput {
                field: "selling_cost_percent".into(),
                reason: "Selling cost percent must be in [0, 1)".into(),
            });
        }
        if assumptions.exit_cap_rate < dec!(0.03) {
            warnings.push(format!(
                "Exit cap rate {} is below 3% — terminal value may be overstated",
                assumptions.exit_cap_rate
            ));
        }
    }

    if assumptions.noi_growth_rate > dec!(0.10) {
        warnings.push(format!(
            "NOI growth rate {} exceeds 10% per year — above typical market norms",
            assumptions.noi_growth_rate
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn base_assumptions() -> CashFlowAssumptions {
        CashFlowAssumptions {
            initial_noi: dec!(500000),
            noi_growth_rate: dec!(0.03),
            annual_debt_service: dec!(350000),
            hold_period_years: 5,
            exit_cap_rate: dec!(0.06),
            selling_cost_percent: dec!(0.03),
            include_sale: false,
        }
    }

    #[test]
    fn test_series_length_matches_hold_period() {
        for hold in [1u32, 5, 10, 30] {
            let mut assumptions = base_assumptions();
            assumptions.hold_period_years = hold;
            let result = project_cash_flows(&assumptions).unwrap();
            assert_eq!(result.result.annual_cash_flows.len(), hold as usize);
        }
    }

    #[test]
    fn test_growth_compounds_from_year_two() {
        let result = project_cash_flows(&base_assumptions()).unwrap();
        let flows = &result.result.annual_cash_flows;

        // noi_year_i = 500,000 * 1.03^(i-1), less 350,000 of debt service
        assert_eq!(flows[0], dec!(150000.00));
        assert_eq!(flows[1], dec!(165000.00));
        assert_eq!(flows[2], dec!(180450.00));
        assert_eq!(flows[3], dec!(196363.50));
    }

    #[test]
    fn test_no_sale_closed_form() {
        let assumptions = base_assumptions();
        let result = project_cash_flows(&assumptions).unwrap();

        let mut expected_noi = assumptions.initial_noi;
        for cf in &result.result.annual_cash_flows {
            let expected = (expected_noi - assumptions.annual_debt_service).round_dp(2);
            assert!((cf - expected).abs() <= dec!(0.01));
            expected_noi *= Decimal::ONE + assumptions.noi_growth_rate;
        }
        assert!(result.result.terminal_value.is_none());
        assert!(result.result.net_sale_proceeds.is_none());
    }

    #[test]
    fn test_sale_adds_net_proceeds_to_final_year() {
        let mut assumptions = base_assumptions();
        assumptions.include_sale = true;

        let result = project_cash_flows(&assumptions).unwrap();
        let out = &result.result;

        // Final-year NOI 562,754.40 capped at 6%, less 3% selling costs
        assert_eq!(out.terminal_value, Some(dec!(9379240.08)));
        assert_eq!(out.net_sale_proceeds, Some(dec!(9097862.88)));
        let last = *out.annual_cash_flows.last().unwrap();
        assert!((last - dec!(9310617.28)).abs() <= dec!(0.01));

        // The sale makes the final year strictly larger than operations alone
        let operations_only = project_cash_flows(&base_assumptions()).unwrap();
        assert!(last > *operations_only.result.annual_cash_flows.last().unwrap());
    }

    #[test]
    fn test_single_year_hold_with_sale() {
        let mut assumptions = base_assumptions();
        assumptions.hold_period_years = 1;
        assumptions.include_sale = true;

        let result = project_cash_flows(&assumptions).unwrap();
        let out = &result.result;

        // Year-1 NOI is never grown; terminal value caps year-1 NOI
        assert_eq!(out.terminal_value, Some(dec!(8333333.33)));
        assert_eq!(out.annual_cash_flows.len(), 1);
    }

    #[test]
    fn test_zero_exit_cap_with_sale_rejected() {
        let mut assumptions = base_assumptions();
        assumptions.include_sale = true;
        assumptions.exit_cap_rate = dec!(0);

        let err = project_cash_flows(&assumptions).unwrap_err();
        assert!(matches!(err, LihtcError::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_hold_period_rejected() {
        let mut assumptions = base_assumptions();
        assumptions.hold_period_years = 0;
        assert!(project_cash_flows(&assumptions).is_err());
    }

    #[test]
    fn test_zero_exit_cap_without_sale_allowed() {
        let mut assumptions = base_assumptions();
        assumptions.exit_cap_rate = dec!(0);
        assert!(project_cash_flows(&assumptions).is_ok());
    }
}
