use crate::process::{
    ActuatorState, ProcessState, FLOW_RATE_RANGE, PRESSURE_RANGE, TANK_LEVEL_RANGE,
    TEMPERATURE_RANGE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Inclusive bounds of a uniform draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    pub low: f64,
    pub high: f64,
}

impl Noise {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Rates are per second of simulated time except the two flow bands, which
/// are absolute values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseProfile {
    pub heating: Noise,
    pub cooling: Noise,
    pub pressurize: Noise,
    pub depressurize: Noise,
    pub flow_open: Noise,
    pub flow_closed: Noise,
    pub filling: Noise,
    pub draining: Noise,
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self {
            heating: Noise::new(0.1, 0.5),
            cooling: Noise::new(0.05, 0.2),
            pressurize: Noise::new(0.5, 2.0),
            depressurize: Noise::new(0.2, 1.0),
            flow_open: Noise::new(75.0, 85.0),
            flow_closed: Noise::new(0.0, 5.0),
            filling: Noise::new(0.1, 0.5),
            draining: Noise::new(0.2, 0.8),
        }
    }
}

/// Tank, pump, valve and heater with bounded random dynamics.
#[derive(Debug, Clone)]
pub struct ProcessModel {
    rng: StdRng,
    noise: NoiseProfile,
}

impl ProcessModel {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible noise sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            noise: NoiseProfile::default(),
        }
    }

    pub fn with_noise(mut self, noise: NoiseProfile) -> Self {
        self.noise = noise;
        self
    }

    fn draw(&mut self, noise: Noise) -> f64 {
        if noise.high > noise.low {
            self.rng.gen_range(noise.low..=noise.high)
        } else {
            noise.low
        }
    }

    /// Advance one step of `dt_s` seconds. Non-finite or negative steps are
    /// treated as zero elapsed time; flow is still resampled.
    pub fn advance(
        &mut self,
        state: &ProcessState,
        actuators: &ActuatorState,
        dt_s: f64,
    ) -> ProcessState {
        let dt = if dt_s.is_finite() && dt_s > 0.0 { dt_s } else { 0.0 };
        let noise = self.noise;

        let temperature = if actuators.heater_on {
            state.temperature + self.draw(noise.heating) * dt
        } else {
            state.temperature - self.draw(noise.cooling) * dt
        };

        let pressure = if actuators.pump_running {
            state.pressure + self.draw(noise.pressurize) * dt
        } else {
            state.pressure - self.draw(noise.depressurize) * dt
        };

        // Flow follows the valve directly; it is not integrated.
        let flow_rate = if actuators.valve_open {
            self.draw(noise.flow_open)
        } else {
            self.draw(noise.flow_closed)
        };

        let tank_level = match (actuators.pump_running, actuators.valve_open) {
            (true, false) => state.tank_level + self.draw(noise.filling) * dt,
            (false, true) => state.tank_level - self.draw(noise.draining) * dt,
            _ => state.tank_level,
        };

        ProcessState {
            temperature: TEMPERATURE_RANGE.clamp(temperature),
            pressure: PRESSURE_RANGE.clamp(pressure),
            flow_rate: FLOW_RATE_RANGE.clamp(flow_rate),
            tank_level: TANK_LEVEL_RANGE.clamp(tank_level),
        }
    }
}

impl Default for ProcessModel {
    fn default() -> Self {
        Self::new()
    }
}
