//! Stop types (derived view over delivery records)

use serde::Serialize;

use super::{Coordinates, DeliveryStatus, RecordId, StopKey};

/// Aggregate status of a stop, derived from its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    /// At least one member is still pending
    Pending,
    /// Mix of delivered and failed, nothing pending
    Partial,
    Delivered,
    Failed,
}

impl StopStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopStatus::Pending => "pending",
            StopStatus::Partial => "partial",
            StopStatus::Delivered => "delivered",
            StopStatus::Failed => "failed",
        }
    }

    /// A stop with remaining work is navigable and subject to sequencing.
    pub const fn has_remaining_work(self) -> bool {
        matches!(self, StopStatus::Pending)
    }
}

/// Member counts per delivery status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopProgress {
    pub pending: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl StopProgress {
    pub fn record(&mut self, status: DeliveryStatus) {
        match status {
            DeliveryStatus::Pending => self.pending += 1,
            DeliveryStatus::Delivered => self.delivered += 1,
            DeliveryStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.delivered + self.failed
    }

    pub fn status(&self) -> StopStatus {
        let total = self.total();
        if self.delivered == total {
            StopStatus::Delivered
        } else if self.failed == total {
            StopStatus::Failed
        } else if self.pending > 0 {
            StopStatus::Pending
        } else {
            StopStatus::Partial
        }
    }
}

/// One physical visit: every record sharing a stop key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub key: StopKey,
    /// Display name (first member's stop name, else its address)
    pub label: String,
    pub address: String,
    /// Representative position (first member's coordinates)
    pub coordinates: Coordinates,
    /// Member record ids in first-appearance order
    pub members: Vec<RecordId>,
    pub progress: StopProgress,
    pub status: StopStatus,
}

impl Stop {
    pub fn has_remaining_work(&self) -> bool {
        self.status.has_remaining_work()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(statuses: &[DeliveryStatus]) -> StopProgress {
        let mut p = StopProgress::default();
        for s in statuses {
            p.record(*s);
        }
        p
    }

    #[test]
    fn all_delivered_is_delivered() {
        use DeliveryStatus::*;
        assert_eq!(progress(&[Delivered, Delivered]).status(), StopStatus::Delivered);
    }

    #[test]
    fn all_failed_is_failed() {
        use DeliveryStatus::*;
        assert_eq!(progress(&[Failed]).status(), StopStatus::Failed);
    }

    #[test]
    fn mixed_terminal_is_partial() {
        use DeliveryStatus::*;
        assert_eq!(progress(&[Delivered, Failed]).status(), StopStatus::Partial);
    }

    #[test]
    fn any_pending_dominates() {
        use DeliveryStatus::*;
        assert_eq!(progress(&[Delivered, Pending]).status(), StopStatus::Pending);
        assert_eq!(progress(&[Failed, Delivered, Pending]).status(), StopStatus::Pending);
        assert!(StopStatus::Pending.has_remaining_work());
        assert!(!StopStatus::Partial.has_remaining_work());
    }
}
