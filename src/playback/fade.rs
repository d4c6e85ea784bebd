use std::time::Duration;

/// A linear volume change approximated by discrete steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeRamp {
    from: u8,
    to: u8,
    steps: u32,
    duration: Duration,
}

impl FadeRamp {
    /// Ramp from `from` to `to` in `steps` volume commands spread over `duration`.
    ///
    /// A ramp always has at least one step.
    pub fn new(from: u8, to: u8, steps: u32, duration: Duration) -> Self {
        Self {
            from: from.min(100),
            to: to.min(100),
            steps: steps.max(1),
            duration,
        }
    }

    /// Wait between two consecutive volume commands.
    pub fn step_duration(&self) -> Duration {
        self.duration / self.steps
    }

    /// Target volume of every step, ending exactly at the ramp's target.
    pub fn levels(&self) -> impl Iterator<Item = u8> + use<> {
        let from = f64::from(self.from);
        let to = f64::from(self.to);
        let steps = self.steps;
        (1..=steps).map(move |step| {
            let level = from + (to - from) * f64::from(step) / f64::from(steps);
            level.round().clamp(0.0, 100.0) as u8
        })
    }
}
