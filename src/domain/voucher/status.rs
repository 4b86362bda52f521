//! Voucher status state machine.
//!
//! Defines all possible voucher states and valid transitions according to
//! the voucher lifecycle: created pending at purchase confirmation, active
//! only after successful router provisioning, then consumed, expired,
//! disabled, refunded, or transferred.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Voucher lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Created at purchase confirmation, not yet provisioned on a router.
    /// Provisioning failures leave the voucher here for the sweeper to retry.
    Pending,

    /// Provisioned on a router and usable. `activated_at`/`expires_at` set.
    Active,

    /// Fully consumed (uptime or data quota exhausted). Terminal.
    Used,

    /// Validity window elapsed; only the expiry sweeper moves vouchers here.
    /// Terminal.
    Expired,

    /// Explicitly deactivated by an operator. Terminal.
    Disabled,

    /// Payment reversed and access revoked. Terminal; nothing transitions
    /// out of refunded.
    Refunded,

    /// Consumed by a transfer; a replacement voucher exists for the new
    /// owner. Terminal.
    Transferred,
}

impl VoucherStatus {
    /// Returns true if a hotspot user for this voucher should exist on a
    /// router right now.
    pub fn is_provisioned(&self) -> bool {
        matches!(self, VoucherStatus::Active)
    }

    /// Returns true if the sweeper still has work to do for this status.
    pub fn is_sweepable(&self) -> bool {
        matches!(self, VoucherStatus::Pending | VoucherStatus::Active)
    }
}

impl StateMachine for VoucherStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use VoucherStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Disabled) // admin override before activation
            // From ACTIVE
                | (Active, Used)
                | (Active, Expired) // sweeper only
                | (Active, Disabled)
                | (Active, Refunded)
                | (Active, Transferred)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use VoucherStatus::*;
        match self {
            Pending => vec![Active, Disabled],
            Active => vec![Used, Expired, Disabled, Refunded, Transferred],
            Used | Expired | Disabled | Refunded | Transferred => vec![],
        }
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VoucherStatus::Pending => "pending",
            VoucherStatus::Active => "active",
            VoucherStatus::Used => "used",
            VoucherStatus::Expired => "expired",
            VoucherStatus::Disabled => "disabled",
            VoucherStatus::Refunded => "refunded",
            VoucherStatus::Transferred => "transferred",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [VoucherStatus; 7] = [
        VoucherStatus::Pending,
        VoucherStatus::Active,
        VoucherStatus::Used,
        VoucherStatus::Expired,
        VoucherStatus::Disabled,
        VoucherStatus::Refunded,
        VoucherStatus::Transferred,
    ];

    #[test]
    fn pending_can_activate() {
        assert_eq!(
            VoucherStatus::Pending.transition_to(VoucherStatus::Active),
            Ok(VoucherStatus::Active)
        );
    }

    #[test]
    fn pending_can_be_disabled_by_override() {
        assert!(VoucherStatus::Pending.can_transition_to(&VoucherStatus::Disabled));
    }

    #[test]
    fn pending_cannot_expire_directly() {
        assert!(VoucherStatus::Pending
            .transition_to(VoucherStatus::Expired)
            .is_err());
    }

    #[test]
    fn active_can_expire() {
        assert!(VoucherStatus::Active.can_transition_to(&VoucherStatus::Expired));
    }

    #[test]
    fn active_can_be_refunded() {
        assert!(VoucherStatus::Active.can_transition_to(&VoucherStatus::Refunded));
    }

    #[test]
    fn terminal_states_are_terminal() {
        for status in [
            VoucherStatus::Used,
            VoucherStatus::Expired,
            VoucherStatus::Disabled,
            VoucherStatus::Refunded,
            VoucherStatus::Transferred,
        ] {
            assert!(status.is_terminal(), "{:?} should be terminal", status);
        }
    }

    #[test]
    fn only_active_is_provisioned() {
        for status in ALL {
            assert_eq!(status.is_provisioned(), status == VoucherStatus::Active);
        }
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in ALL {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target));
            }
        }
    }

    fn any_status() -> impl Strategy<Value = VoucherStatus> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        /// Nothing ever transitions out of refunded (or any terminal state).
        #[test]
        fn refunded_admits_no_transition(target in any_status()) {
            prop_assert!(VoucherStatus::Refunded.transition_to(target).is_err());
        }

        /// Expired is reachable only from active.
        #[test]
        fn expired_only_reachable_from_active(from in any_status()) {
            if from.can_transition_to(&VoucherStatus::Expired) {
                prop_assert_eq!(from, VoucherStatus::Active);
            }
        }

        /// transition_to agrees with can_transition_to everywhere.
        #[test]
        fn transition_matches_predicate(from in any_status(), to in any_status()) {
            prop_assert_eq!(
                from.transition_to(to).is_ok(),
                from.can_transition_to(&to)
            );
        }
    }
}
