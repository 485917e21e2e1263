use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capital_stack::{build_capital_stack, CapitalStackResult};
use crate::cashflow::{project_cash_flows, CashFlowAssumptions, CashFlowSeries};
use crate::equity::{compute_equity, EquityTerms, LihtcEquityResult};
use crate::metrics::{compute_return_metrics, ReturnMetricsInput, ReturnMetricsResult};
use crate::policy::UnderwritingPolicy;
use crate::types::{with_metadata, ComputationOutput, Money, ProjectInputs};
use crate::LihtcResult;

/// Complete underwriting run: every stage's result plus the derived annual
/// debt service, ready for the report layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingOutput {
    pub equity: LihtcEquityResult,
    pub capital_stack: CapitalStackResult,
    /// Interest-only payment on the sized loan
    pub annual_debt_service: Money,
    pub cash_flows: CashFlowSeries,
    pub metrics: ReturnMetricsResult,
}

/// Run the full pipeline: equity raise, capital stack, cash-flow projection
/// with a terminal sale, and return metrics. Each stage consumes the prior
/// stage's immutable result; warnings from all stages are merged.
pub fn underwrite(
    inputs: &ProjectInputs,
    policy: &UnderwritingPolicy,
) -> LihtcResult<ComputationOutput<UnderwritingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let equity_out = compute_equity(&EquityTerms::from_inputs(inputs), policy)?;
    warnings.extend(equity_out.warnings);
    let equity = equity_out.result;

    let stack_out = build_capital_stack(inputs, equity.net_equity, policy)?;
    warnings.extend(stack_out.warnings);
    let capital_stack = stack_out.result;

    let annual_debt_service = (capital_stack.loan * inputs.permanent_loan_rate).round_dp(2);

    let cashflow_out = project_cash_flows(&CashFlowAssumptions::from_inputs(
        inputs,
        annual_debt_service,
        true,
    ))?;
    warnings.extend(cashflow_out.warnings);
    let cash_flows = cashflow_out.result;

    let metrics_out = compute_return_metrics(&ReturnMetricsInput {
        cash_flows: cash_flows.annual_cash_flows.clone(),
        equity_investment: capital_stack.equity_required,
        noi_year_1: inputs.noi_year_1,
        annual_debt_service,
    })?;
    warnings.extend(metrics_out.warnings);
    let metrics = metrics_out.result;

    let output = UnderwritingOutput {
        equity,
        capital_stack,
        annual_debt_service,
        cash_flows,
        metrics,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LIHTC Underwriting Pipeline (equity, capital stack, cash flows, returns)",
        inputs,
        warnings,
        elapsed,
        output,
    ))
}
