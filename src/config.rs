use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::{AllocationStart, FirstBillableMonth, OverpaymentPolicy, PaymentStatus};

/// ledger configuration
///
/// every knob here is a behavior divergence observed between the collection
/// desks it replaces; the presets pin down the two combinations actually in
/// use. anything else must pass `validate()` before reaching an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// which month opens a student's billable sequence
    pub first_billable_month: FirstBillableMonth,
    /// where the allocation scan begins
    pub allocation_start: AllocationStart,
    /// status stamped on entries the allocation creates
    pub initial_status: PaymentStatus,
    /// what happens to a remainder smaller than one monthly fee
    pub overpayment: OverpaymentPolicy,
    /// period summary window when no explicit range is given
    pub default_summary_months: u32,
}

impl LedgerConfig {
    /// one-step collection: entries land settled, remainders become credit
    pub fn direct() -> Self {
        Self {
            first_billable_month: FirstBillableMonth::EnrollmentMonth,
            allocation_start: AllocationStart::PaymentMonth,
            initial_status: PaymentStatus::Completed,
            overpayment: OverpaymentPolicy::CarryForward,
            default_summary_months: 12,
        }
    }

    /// two-step collection: front desk books pending entries, the back
    /// office approves them in batches
    pub fn front_desk() -> Self {
        Self {
            initial_status: PaymentStatus::Pending,
            ..Self::direct()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.initial_status {
            PaymentStatus::Pending | PaymentStatus::Completed => {}
            other => {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("initial_status must be pending or completed, got {other}"),
                })
            }
        }
        if self.default_summary_months == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "default_summary_months must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::direct()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(LedgerConfig::direct().validate().is_ok());
        assert!(LedgerConfig::front_desk().validate().is_ok());
    }

    #[test]
    fn test_default_is_direct() {
        let config = LedgerConfig::default();
        assert_eq!(config, LedgerConfig::direct());
        assert_eq!(config.initial_status, PaymentStatus::Completed);
        assert_eq!(config.overpayment, OverpaymentPolicy::CarryForward);
        assert_eq!(config.allocation_start, AllocationStart::PaymentMonth);
        assert_eq!(config.first_billable_month, FirstBillableMonth::EnrollmentMonth);
    }

    #[test]
    fn test_rejects_bad_initial_status() {
        let config = LedgerConfig {
            initial_status: PaymentStatus::Failed,
            ..LedgerConfig::direct()
        };
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_summary_window() {
        let config = LedgerConfig {
            default_summary_months: 0,
            ..LedgerConfig::direct()
        };
        assert!(config.validate().is_err());
    }
}
