//! Scenario stepper - advances the sensor readings by one tick

use graintwin_logic::config::ScenarioTuning;
use graintwin_logic::environment::{EnvironmentState, PestPosition, ScenarioMode, SENSOR_MIDDLE};
use rand::Rng;

/// Uniform noise in [-amp, amp).
fn jitter(rng: &mut impl Rng, amp: f64) -> f64 {
    if amp <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-amp..amp)
}

/// Move `value` toward `target` by `step`, never past it.
fn relax_toward(value: f64, target: f64, step: f64) -> f64 {
    if value > target {
        (value - step).max(target)
    } else if value < target {
        (value + step).min(target)
    } else {
        value
    }
}

/// Produce the next readings from `prev` under `mode`.
///
/// Sensor noise is drawn first and applied in every mode. Normal mode
/// relaxes the noise-free readings toward baseline and adds the noise on
/// top, so readings at baseline keep fluctuating. Other modes apply their
/// perturbation to the noisy readings. The result is stamped with
/// `timestamp`. Total: every input state yields a consistent output state.
pub fn step_environment(
    prev: &EnvironmentState,
    mode: ScenarioMode,
    tuning: &ScenarioTuning,
    timestamp: u64,
    rng: &mut impl Rng,
) -> EnvironmentState {
    let mut temps = prev.temperatures;
    let mut humidity = prev.humidity;
    let mut pest_count = prev.pest_count;
    let mut pest_position = prev.pest_position;

    // Sensor noise
    let temp_noise = [(); 3].map(|_| jitter(rng, tuning.temperature_jitter));
    let humidity_noise = jitter(rng, tuning.humidity_jitter);

    if mode == ScenarioMode::Normal {
        for (t, noise) in temps.iter_mut().zip(temp_noise) {
            *t = relax_toward(*t, tuning.baseline_temperature, tuning.temperature_relax_step) + noise;
        }
        let relaxed = if humidity > tuning.baseline_humidity {
            (humidity - tuning.humidity_relax_down).max(tuning.baseline_humidity)
        } else {
            (humidity + tuning.humidity_relax_up).min(tuning.baseline_humidity)
        };
        humidity = relaxed + humidity_noise;
    } else {
        for (t, noise) in temps.iter_mut().zip(temp_noise) {
            *t += noise;
        }
        humidity += humidity_noise;
    }

    match mode {
        ScenarioMode::Normal => {
            pest_count = 0;
            pest_position = None;
        }
        ScenarioMode::HeatSpike => {
            let middle = &mut temps[SENSOR_MIDDLE];
            *middle = (*middle + tuning.heat_spike_step).min(tuning.heat_spike_max);
        }
        ScenarioMode::HighHumidity => {
            humidity = (humidity + tuning.humidity_rise_step).min(tuning.humidity_max);
        }
        ScenarioMode::PestInvasion => {
            let bound = tuning.pest_bound;
            let current = match pest_position {
                Some(pos) if pest_count > 0 => pos,
                _ => PestPosition::new(tuning.pest_spawn.0, tuning.pest_spawn.1),
            };
            pest_count = 1;
            pest_position = Some(PestPosition::new(
                (current.x + jitter(rng, tuning.pest_jitter)).clamp(-bound, bound),
                (current.y + jitter(rng, tuning.pest_jitter)).clamp(-bound, bound),
            ));
        }
    }

    EnvironmentState {
        temperatures: temps,
        humidity,
        pest_count,
        pest_position,
        last_updated: timestamp,
    }
}
