//! Round-robin selection for single-focus mode

/// Picks which city single-focus mode shows on each update.
///
/// The tick counter advances once per update whether or not anything was
/// selected, so the rotation keeps moving as cities are added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCursor {
    ticks: u64,
}

impl ViewCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index to show this tick for a store of `len` cities, then advance.
    ///
    /// Returns `None` for an empty store.
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        let selected = self.peek(len);
        self.ticks = self.ticks.wrapping_add(1);
        selected
    }

    /// Index `advance` would return, without advancing.
    pub fn peek(&self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some((self.ticks % len as u64) as usize)
        }
    }

    /// Updates seen so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}
