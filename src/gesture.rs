use tracing::{debug, info};

/// Result of feeding a key release to the gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Key is not part of the gesture and no gesture was in progress
    Ignored,
    /// One required release matched; `remaining` are still outstanding
    Progress {
        /// Releases still needed
        remaining: usize,
    },
    /// A foreign key was released mid-gesture; state is back to full
    Interrupted,
    /// Every required key was released; state is back to full
    Commit,
}

/// Multi-key release gesture that commits the current prediction
///
/// The required keys form a multiset, so listing a code twice means it has to
/// be released twice. Only releases count: a held key cannot re-fire through
/// key repeat.
#[derive(Debug, Clone)]
pub struct AcceptanceGesture {
    sequence: Vec<u32>,
    remaining: Vec<u32>,
}

impl AcceptanceGesture {
    /// Create an armed gesture
    #[must_use]
    pub fn new(sequence: Vec<u32>) -> Self {
        Self {
            remaining: sequence.clone(),
            sequence,
        }
    }

    /// Feed a key release
    pub fn release(&mut self, keycode: u32) -> GestureOutcome {
        if !self.sequence.contains(&keycode) {
            if self.in_progress() {
                debug!(keycode, "foreign key released, acceptance gesture reset");
                self.reset();
                return GestureOutcome::Interrupted;
            }
            return GestureOutcome::Ignored;
        }

        if let Some(index) = self.remaining.iter().position(|&k| k == keycode) {
            self.remaining.swap_remove(index);
        }

        if self.remaining.is_empty() && !self.sequence.is_empty() {
            info!("acceptance gesture completed");
            self.reset();
            return GestureOutcome::Commit;
        }

        debug!(keycode, remaining = self.remaining.len(), "acceptance key released");
        GestureOutcome::Progress {
            remaining: self.remaining.len(),
        }
    }

    /// Re-arm with the full sequence
    fn reset(&mut self) {
        self.remaining.clone_from(&self.sequence);
    }

    /// True while some but not all required keys have been released
    fn in_progress(&self) -> bool {
        self.remaining.len() != self.sequence.len()
    }

    #[cfg(test)]
    fn remaining(&self) -> &[u32] {
        &self.remaining
    }
}
