/// Free-running click counter. Never drops below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    value: u64,
}

impl Counter {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    /// Build from a stored value, which may predate the zero floor.
    pub fn from_stored(value: i64) -> Self {
        Self {
            value: value.max(0) as u64,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    /// Returns false when already at zero.
    pub fn decrement(&mut self) -> bool {
        if self.value == 0 {
            return false;
        }
        self.value -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}
