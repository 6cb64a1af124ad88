//! Listing lifecycle: `Available -> Claimed -> Expired`
use serde::{Deserialize, Serialize};

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
pub enum ListingStatus {
    #[n(0)]
    Available,
    #[n(1)]
    Claimed,
    #[n(2)]
    Expired,
}

impl ListingStatus {
    /// The only forward step allowed from this status. `Expired` is terminal.
    pub fn next(self) -> Option<ListingStatus> {
        match self {
            ListingStatus::Available => Some(ListingStatus::Claimed),
            ListingStatus::Claimed => Some(ListingStatus::Expired),
            ListingStatus::Expired => None,
        }
    }

    /// Staying put is allowed, otherwise only the single next step.
    pub fn can_advance_to(self, target: ListingStatus) -> bool {
        self == target || self.next() == Some(target)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// Checks the claim fields against the status: all absent while available,
/// all present once claimed, kept as an audit trail after expiry.
pub fn claim_fields_consistent(status: ListingStatus, present: [bool; 3]) -> bool {
    match status {
        ListingStatus::Available => present.iter().all(|set| !set),
        ListingStatus::Claimed | ListingStatus::Expired => present.iter().all(|set| *set),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_forward_steps() {
        use ListingStatus::*;

        assert!(Available.can_advance_to(Claimed));
        assert!(Claimed.can_advance_to(Expired));
        assert!(!Available.can_advance_to(Expired));
        assert!(!Claimed.can_advance_to(Available));
        assert!(!Expired.can_advance_to(Claimed));
        assert!(!Expired.can_advance_to(Available));
        assert!(Expired.is_terminal());
    }

    #[test]
    fn claim_fields_follow_status() {
        use ListingStatus::*;

        assert!(claim_fields_consistent(Available, [false; 3]));
        assert!(!claim_fields_consistent(Available, [true, false, false]));
        assert!(claim_fields_consistent(Claimed, [true; 3]));
        assert!(!claim_fields_consistent(Claimed, [true, true, false]));
        assert!(claim_fields_consistent(Expired, [true; 3]));
    }
}
