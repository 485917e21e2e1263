use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LihtcError;
use crate::types::Rate;
use crate::LihtcResult;

/// Underwriting policy constants that are conventions rather than deal
/// inputs. Kept in one place so a policy change never touches the formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingPolicy {
    /// Permanent loan ceiling as a fraction of total development cost
    pub max_loan_to_value: Rate,
    /// Equity pay-in schedule across the three milestones
    pub disbursement_split: DisbursementSplit,
}

/// Fractions of net equity paid in at each milestone. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisbursementSplit {
    pub closing: Rate,
    pub construction_completion: Rate,
    pub stabilization: Rate,
}

impl Default for UnderwritingPolicy {
    /// Standard affordable-housing conventions: 75% LTV ceiling and a
    /// 25/50/25 pay-in at closing / construction completion / stabilization.
    fn default() -> Self {
        UnderwritingPolicy {
            max_loan_to_value: dec!(0.75),
            disbursement_split: DisbursementSplit {
                closing: dec!(0.25),
                construction_completion: dec!(0.50),
                stabilization: dec!(0.25),
            },
        }
    }
}

impl UnderwritingPolicy {
    pub fn validate(&self) -> LihtcResult<()> {
        if self.max_loan_to_value <= Decimal::ZERO || self.max_loan_to_value > Decimal::ONE {
            return Err(LihtcError::InvalidInput {
                field: "max_loan_to_value".into(),
                reason: "LTV ceiling must be in (0, 1]".into(),
            });
        }

        let split = &self.disbursement_split;
        for (name, share) in [
            ("disbursement_split.closing", split.closing),
            (
                "disbursement_split.construction_completion",
                split.construction_completion,
            ),
            ("disbursement_split.stabilization", split.stabilization),
        ] {
            if share < Decimal::ZERO || share > Decimal::ONE {
                return Err(LihtcError::InvalidInput {
                    field: name.into(),
                    reason: "Pay-in share must be between 0 and 1".into(),
                });
            }
        }

        let total = split.closing + split.construction_completion + split.stabilization;
        if total != Decimal::ONE {
            return Err(LihtcError::InvalidInput {
                field: "disbursement_split".into(),
                reason: format!("Pay-in shares must sum to 1 (got {total})"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(UnderwritingPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_split_must_sum_to_one() {
        let mut policy = UnderwritingPolicy::default();
        policy.disbursement_split.closing = dec!(0.30);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_ltv_ceiling_bounds() {
        let mut policy = UnderwritingPolicy::default();
        policy.max_loan_to_value = dec!(0);
        assert!(policy.validate().is_err());
        policy.max_loan_to_value = dec!(1.25);
        assert!(policy.validate().is_err());
    }
}
