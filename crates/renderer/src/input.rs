/// Counts Escape presses and reports when the exit threshold is crossed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EscapeCounter {
    limit: Option<u32>,
    presses: u32,
}

impl EscapeCounter {
    /// `None` disables escape-to-exit entirely.
    pub(crate) fn new(limit: Option<u32>) -> Self {
        Self { limit, presses: 0 }
    }

    /// Records one press; returns `true` once presses exceed the limit.
    pub(crate) fn register_press(&mut self) -> bool {
        let Some(limit) = self.limit else {
            return false;
        };
        self.presses = self.presses.saturating_add(1);
        self.presses > limit
    }

    pub(crate) fn presses(&self) -> u32 {
        self.presses
    }
}
