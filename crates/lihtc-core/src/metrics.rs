use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LihtcError;
use crate::time_value;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LihtcResult;

/// Inputs for the deal-level return metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetricsInput {
    /// Annual cash flows to equity, year 1 onward
    pub cash_flows: Vec<Money>,
    /// Cash equity invested at closing
    pub equity_investment: Money,
    pub noi_year_1: Money,
    pub annual_debt_service: Money,
}

/// Standard underwriting metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetricsResult {
    /// Levered IRR on equity as a percentage; None when the series has no
    /// root in the search bracket (e.g. no cash equity, or debt service
    /// exceeding NOI in every year)
    pub irr_pct: Option<Rate>,
    /// Year-1 NOI over annual debt service
    pub dscr: Decimal,
}

/// Compute IRR and DSCR for an underwritten deal.
pub fn compute_return_metrics(
    input: &ReturnMetricsInput,
) -> LihtcResult<ComputationOutput<ReturnMetricsResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.equity_investment < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "equity_investment".into(),
            reason: "Equity investment cannot be negative".into(),
        });
    }
    if input.cash_flows.is_empty() {
        return Err(LihtcError::InvalidInput {
            field: "cash_flows".into(),
            reason: "At least one cash flow is required".into(),
        });
    }

    let irr_pct = match internal_rate_of_return(&input.cash_flows, input.equity_investment) {
        Ok(rate) => Some(rate),
        Err(e) => {
            warnings.push(format!("IRR is undefined for this deal: {e}"));
            None
        }
    };

    let dscr = debt_service_coverage(input.noi_year_1, input.annual_debt_service)?;

    let output = ReturnMetricsResult { irr_pct, dscr };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Return Metrics (IRR & DSCR)",
        &serde_json::json!({
            "equity_investment": input.equity_investment.to_string(),
            "periods": input.cash_flows.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Levered IRR on equity: prepend the equity outlay as a negative flow and
/// solve NPV(r) = 0. Returned as a percentage rounded to 2 decimals.
pub fn internal_rate_of_return(
    cash_flows: &[Money],
    equity_investment: Money,
) -> LihtcResult<Rate> {
    let mut flows = Vec::with_capacity(cash_flows.len() + 1);
    flows.push(-equity_investment);
    flows.extend_from_slice(cash_flows);

    let rate = time_value::irr(&flows, dec!(0.10))?;
    Ok((rate * dec!(100)).round_dp(2))
}

/// Debt service coverage ratio: NOI / annual debt service, 2 decimals.
pub fn debt_service_coverage(noi: Money, annual_debt_service: Money) -> LihtcResult<Decimal> {
    if annual_debt_service.is_zero() {
        return Err(LihtcError::DivisionByZero {
            context: "DSCR (annual debt service is zero)".into(),
        });
    }
    if annual_debt_service < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "annual_debt_service".into(),
            reason: "Annual debt service cannot be negative".into(),
        });
    }

    Ok((noi / annual_debt_service).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_irr_known_answer() {
        // -1000 then 400 x 3 => ~9.70%
        let flows = vec![dec!(400), dec!(400), dec!(400)];
        let irr = internal_rate_of_return(&flows, dec!(1000)).unwrap();
        assert!((irr - dec!(9.70)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_irr_with_terminal_sale_flow() {
        // 1.5M equity, nine years of 120k, then 120k + 2.5M of sale proceeds
        let mut flows = vec![dec!(120000); 9];
        flows.push(dec!(2620000));
        let irr = internal_rate_of_return(&flows, dec!(1500000)).unwrap();
        assert!((irr - dec!(11.83)).abs() <= dec!(0.02));
    }

    #[test]
    fn test_irr_deterministic() {
        let flows = vec![dec!(300000); 10];
        let first = internal_rate_of_return(&flows, dec!(2000000)).unwrap();
        let second = internal_rate_of_return(&flows, dec!(2000000)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, dec!(8.14));
    }

    #[test]
    fn test_irr_undefined_when_debt_swamps_noi() {
        let input = ReturnMetricsInput {
            cash_flows: vec![dec!(-50000); 10],
            equity_investment: dec!(1000000),
            noi_year_1: dec!(350000),
            annual_debt_service: dec!(400000),
        };
        let result = compute_return_metrics(&input).unwrap();
        assert_eq!(result.result.irr_pct, None);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("IRR is undefined")));
        assert_eq!(result.result.dscr, dec!(0.88));
    }

    #[test]
    fn test_dscr_known_answer() {
        let dscr = debt_service_coverage(dec!(600000), dec!(400000)).unwrap();
        assert_eq!(dscr, dec!(1.50));
    }

    #[test]
    fn test_dscr_zero_debt_service_is_division_error() {
        let err = debt_service_coverage(dec!(600000), dec!(0)).unwrap_err();
        assert!(matches!(err, LihtcError::DivisionByZero { .. }));
    }

    #[test]
    fn test_negative_equity_rejected() {
        let input = ReturnMetricsInput {
            cash_flows: vec![dec!(100)],
            equity_investment: dec!(-1),
            noi_year_1: dec!(100),
            annual_debt_service: dec!(50),
        };
        assert!(compute_return_metrics(&input).is_err());
    }
}
