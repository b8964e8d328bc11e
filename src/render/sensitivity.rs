use crate::config::SensitivityConfig;

/// Caller-side gain loop for Pass 2: backs off after frames that overshoot 1.0 and creeps back
/// up while the signal stays in range.
#[derive(Debug, Clone, Copy)]
pub struct AutoSensitivity {
    config: SensitivityConfig,
    value: f64,
}

impl AutoSensitivity {
    pub fn new(config: SensitivityConfig) -> Self {
        Self {
            value: config.initial.clamp(config.min, config.max),
            config,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Clamp one mapped frame into [0, 1] and adjust the sensitivity for the next frame.
    /// Returns whether the frame overshot.
    pub fn correct(&mut self, bars: &mut [f64]) -> bool {
        let overshoot = bars.iter().any(|&b| b > 1.0);
        let audible = bars.iter().any(|&b| b > 0.0);
        if overshoot {
            self.value *= self.config.decay;
        } else if audible {
            self.value *= self.config.recovery;
        }
        self.value = self.value.clamp(self.config.min, self.config.max);

        for bar in bars.iter_mut() {
            *bar = if bar.is_nan() { 0.0 } else { bar.clamp(0.0, 1.0) };
        }
        overshoot
    }
}
