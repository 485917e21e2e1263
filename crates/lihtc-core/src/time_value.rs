use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LihtcError;
use crate::types::{Money, Rate};
use crate::LihtcResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Root search bracket for IRR: -99% to 1000%. Rates outside this range are
/// not economically meaningful for a real-estate equity position.
const IRR_BRACKET_LOW: Decimal = dec!(-0.99);
const IRR_BRACKET_HIGH: Decimal = dec!(10.0);

/// Interval width at which bisection is considered converged. Far below the
/// two-decimal percentage the metrics layer reports.
const RATE_RESOLUTION: Decimal = dec!(0.000000001);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> LihtcResult<Money> {
    if rate <= dec!(-1) {
        return Err(LihtcError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(LihtcError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV that reports overflow as None instead of failing. Used while probing
/// extreme rates during bracketing, where deep-discount factors can exceed
/// Decimal range.
fn npv_checked(rate: Rate, cash_flows: &[Money]) -> Option<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        result = result.checked_add(cf.checked_div(discount)?)?;
    }

    Some(result)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from the supplied guess, falling back to bisection over
/// [-0.99, 10.0] when the derivative stalls or the iteration diverges. An
/// all-negative (or all-positive) series has no root in the bracket and
/// fails with `ConvergenceFailure`; callers decide whether that is an error
/// or an "undefined" metric.
pub fn irr(cash_flows: &[Money], guess: Rate) -> LihtcResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(LihtcError::InvalidInput {
            field: "cash_flows".into(),
            reason: "IRR requires at least 2 cash flows".into(),
        });
    }

    if let Some(rate) = newton_raphson(cash_flows, guess) {
        return Ok(rate);
    }

    bisect(cash_flows)
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let mut npv_val = Decimal::ZERO;
        let mut dnpv = Decimal::ZERO;
        let one_plus_r = Decimal::ONE + rate;

        for (t, cf) in cash_flows.iter().enumerate() {
            let t_dec = Decimal::from(t as i64);
            let discount = one_plus_r.checked_powd(t_dec)?;
            if discount.is_zero() {
                continue;
            }
            npv_val += cf.checked_div(discount)?;
            if t > 0 {
                dnpv -= t_dec
                    .checked_mul(*cf)?
                    .checked_div(one_plus_r.checked_powd(t_dec + Decimal::ONE)?)?;
            }
        }

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }

        if dnpv.is_zero() {
            return None;
        }

        rate -= npv_val.checked_div(dnpv)?;

        if rate < IRR_BRACKET_LOW {
            rate = IRR_BRACKET_LOW;
        } else if rate > IRR_BRACKET_HIGH {
            rate = IRR_BRACKET_HIGH;
        }
    }

    None
}

fn bisect(cash_flows: &[Money]) -> LihtcResult<Rate> {
    let (mut lo, mut hi, mut f_lo) = find_sign_change(cash_flows).ok_or_else(|| {
        LihtcError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: 0,
            last_delta: npv_checked(IRR_BRACKET_HIGH, cash_flows).unwrap_or(Decimal::MAX),
        }
    })?;

    let mut mid = (lo + hi) / dec!(2);
    for i in 0..MAX_IRR_ITERATIONS {
        mid = (lo + hi) / dec!(2);
        let f_mid = npv_checked(mid, cash_flows).ok_or(LihtcError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: i,
            last_delta: Decimal::MAX,
        })?;

        if f_mid.abs() < CONVERGENCE_THRESHOLD || hi - lo < RATE_RESOLUTION {
            return Ok(mid);
        }

        if (f_lo.is_sign_negative()) == (f_mid.is_sign_negative()) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    // Interval shrinks by half each pass; after 100 passes the midpoint is
    // exact to far more digits than any reported rate.
    Ok(mid)
}

/// Scan the bracket for two adjacent probe rates with opposite NPV signs.
/// Probes that overflow (deep discounting of long series) are skipped.
fn find_sign_change(cash_flows: &[Money]) -> Option<(Rate, Rate, Decimal)> {
    let mut probes = vec![
        IRR_BRACKET_LOW,
        dec!(-0.9),
        dec!(-0.75),
        dec!(-0.5),
        dec!(-0.25),
    ];
    let mut r = Decimal::ZERO;
    while r <= IRR_BRACKET_HIGH {
        probes.push(r);
        r += dec!(0.25);
    }

    let mut prev: Option<(Rate, Decimal)> = None;
    for probe in probes {
        let Some(value) = npv_checked(probe, cash_flows) else {
            continue;
        };
        if let Some((prev_rate, prev_value)) = prev {
            if prev_value.is_sign_negative() != value.is_sign_negative()
                || prev_value.is_zero()
                || value.is_zero()
            {
                return Some((prev_rate, probe, prev_value));
            }
        }
        prev = Some((probe, value));
    }

    None
}

/// Present value of a level annual payment over `years` at `rate`:
/// `payment * (1 - (1+r)^-n) / r`, degenerating to `payment * n` at r = 0.
pub fn annuity_present_value(payment: Money, rate: Rate, years: u32) -> LihtcResult<Money> {
    if years == 0 {
        return Err(LihtcError::InvalidInput {
            field: "years".into(),
            reason: "Annuity term must be at least 1 year".into(),
        });
    }
    if rate < Decimal::ZERO {
        return Err(LihtcError::InvalidInput {
            field: "rate".into(),
            reason: "Annuity rate cannot be negative".into(),
        });
    }

    if rate.is_zero() {
        return Ok(payment * Decimal::from(years));
    }

    let factor = (Decimal::ONE + rate).powd(Decimal::from(years));
    if factor.is_zero() {
        return Err(LihtcError::DivisionByZero {
            context: "annuity compounding factor".into(),
        });
    }

    Ok(payment * (Decimal::ONE - Decimal::ONE / factor) / rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_irr_known_answer() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_annuity_style_flows() {
        // -2,000,000 then ten years of 300,000 => IRR ~8.14%
        let mut cfs = vec![dec!(-2000000)];
        cfs.extend(std::iter::repeat(dec!(300000)).take(10));
        let result = irr(&cfs, dec!(0.10)).unwrap();
        assert!((result - dec!(0.0814)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_no_sign_change_fails() {
        let cfs = vec![dec!(-1000), dec!(-200), dec!(-200)];
        let err = irr(&cfs, dec!(0.10)).unwrap_err();
        assert!(matches!(err, LihtcError::ConvergenceFailure { .. }));
    }

    #[test]
    fn test_irr_too_few_flows() {
        assert!(irr(&[dec!(-1000)], dec!(0.10)).is_err());
    }

    #[test]
    fn test_annuity_pv_thirty_year() {
        // (1 - 1.05^-30) / 0.05 = 15.3724510...
        let result = annuity_present_value(dec!(1), dec!(0.05), 30).unwrap();
        assert!((result - dec!(15.37245103)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_annuity_pv_zero_rate() {
        let result = annuity_present_value(dec!(500), dec!(0), 30).unwrap();
        assert_eq!(result, dec!(15000));
    }

    #[test]
    fn test_annuity_pv_zero_term_rejected() {
        assert!(annuity_present_value(dec!(500), dec!(0.05), 0).is_err());
    }
}
