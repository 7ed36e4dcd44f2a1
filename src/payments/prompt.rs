use crate::completion::Completion;

/// Fires the payment prompt once, on the rising edge of
/// `has_completed_all_votes`. Once fired it stays quiet; a session that
/// already saw or dismissed it starts spent.
#[derive(Debug, Clone, Default)]
pub struct PaymentPrompt {
    was_complete: bool,
    spent: bool,
}

impl PaymentPrompt {
    pub fn new(already_prompted: bool) -> Self {
        PaymentPrompt {
            was_complete: false,
            spent: already_prompted,
        }
    }

    /// Returns true exactly when the prompt should be shown now.
    pub fn observe(&mut self, completion: &Completion) -> bool {
        let now = completion.has_completed_all_votes;
        let rising = now && !self.was_complete;
        self.was_complete = now;
        if rising && !self.spent {
            self.spent = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_once_on_rising_edge() {
        let mut prompt = PaymentPrompt::new(false);
        assert!(!prompt.observe(&Completion::compute(3, 2)));
        assert!(prompt.observe(&Completion::compute(3, 3)));
        // recomputation ticks while complete do not re-prompt
        assert!(!prompt.observe(&Completion::compute(3, 3)));
        assert!(!prompt.observe(&Completion::compute(3, 3)));
    }

    #[test]
    fn does_not_re_prompt_after_falling_and_rising_again() {
        let mut prompt = PaymentPrompt::new(false);
        assert!(prompt.observe(&Completion::compute(2, 2)));
        // a new election appears, then gets voted
        assert!(!prompt.observe(&Completion::compute(3, 2)));
        assert!(!prompt.observe(&Completion::compute(3, 3)));
    }

    #[test]
    fn already_prompted_session_stays_quiet() {
        let mut prompt = PaymentPrompt::new(true);
        assert!(!prompt.observe(&Completion::compute(1, 1)));
    }
}
