/// Stages of a ticket purchase.
///
/// ```text
/// Validating -> CheckingAllowance -> ApprovingSmart | ApprovingLegacy | Skipped
///            -> Purchasing -> Settled
/// ```
///
/// `ApprovingSmart` may move on to `ApprovingLegacy` once. Any stage can end
/// in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseState {
    Validating,
    CheckingAllowance,
    ApprovingSmart,
    ApprovingLegacy,
    Skipped,
    Purchasing,
    Settled,
    Failed,
}

impl PurchaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseState::Settled | PurchaseState::Failed)
    }

    pub fn can_transition_to(&self, next: PurchaseState) -> bool {
        use PurchaseState::*;

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Validating, CheckingAllowance)
                | (CheckingAllowance, ApprovingSmart)
                | (CheckingAllowance, ApprovingLegacy)
                | (CheckingAllowance, Skipped)
                | (ApprovingSmart, ApprovingLegacy)
                | (ApprovingSmart, Purchasing)
                | (ApprovingLegacy, Purchasing)
                | (Skipped, Purchasing)
                | (Purchasing, Settled)
        )
    }
}

/// Transition log of a single purchase
#[derive(Debug, Clone)]
pub struct PurchaseTrace {
    states: Vec<PurchaseState>,
}

impl PurchaseTrace {
    pub fn new() -> Self {
        Self {
            states: vec![PurchaseState::Validating],
        }
    }

    pub fn current(&self) -> PurchaseState {
        self.states
            .last()
            .copied()
            .unwrap_or(PurchaseState::Validating)
    }

    pub fn advance(&mut self, next: PurchaseState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal purchase transition {:?} -> {:?}",
            current,
            next
        );
        tracing::debug!(from = ?current, to = ?next, "Purchase state");
        self.states.push(next);
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.advance(PurchaseState::Failed);
        }
    }

    pub fn states(&self) -> &[PurchaseState] {
        &self.states
    }
}

impl Default for PurchaseTrace {
    fn default() -> Self {
        Self::new()
    }
}
