/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown is stopped; the tick was ignored.
    Idle,
    /// Time was consumed, nothing else happened.
    Counting,
    /// Remaining time entered the fade-out window.
    FadeOut,
    /// The interval elapsed and the cursor moved to the given item.
    Advanced(usize),
    /// The interval elapsed on the last item and the countdown stopped.
    Finished,
}

/// Per-item countdown driving auto-advance, one tick per second.
///
/// Pure state: the async controller owns the clock and feeds ticks in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    interval: u32,
    fade_lead: u32,
    remaining: u32,
    running: bool,
    index: usize,
    item_count: usize,
}

impl Countdown {
    /// Create a stopped countdown positioned at `index`.
    pub fn new(interval: u32, fade_lead: u32, item_count: usize, index: usize) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            fade_lead,
            remaining: interval,
            running: false,
            index: index.min(item_count.saturating_sub(1)),
            item_count,
        }
    }

    /// Reset the remaining time to a full interval and start counting.
    pub fn start(&mut self) {
        self.remaining = self.interval;
        self.running = self.item_count > 0;
    }

    /// Stop counting. The cursor is left where it is.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Consume one time unit.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if self.index + 1 < self.item_count {
                self.index += 1;
                self.remaining = self.interval;
                TickOutcome::Advanced(self.index)
            } else {
                self.running = false;
                TickOutcome::Finished
            }
        } else if self.remaining == self.fade_lead {
            TickOutcome::FadeOut
        } else {
            TickOutcome::Counting
        }
    }

    /// Move the cursor by hand. Restarts the interval when running.
    ///
    /// Returns `false` and changes nothing when `index` is out of range.
    pub fn skip_to(&mut self, index: usize) -> bool {
        if index >= self.item_count {
            return false;
        }
        self.index = index;
        if self.running {
            self.remaining = self.interval;
        }
        true
    }

    /// Seconds left on the current item.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Current item index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether ticks are being consumed.
    pub fn is_running(&self) -> bool {
        self.running
    }
}
