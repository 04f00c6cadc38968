use rand::Rng;

// -----------------------------------------------------------------------------
// SIMULATED INTRACELLULAR DATA
// -----------------------------------------------------------------------------

const RESTING_POTENTIAL: f64 = -0.06; // V
const NOISE_AMPLITUDE: f64 = 0.002;
const SPIKE_PEAK: f64 = 0.02;
const SPIKE_CHANCE_PERCENT: u32 = 1;
const SPIKE_RISE_SAMPLES: usize = 8;
const SPIKE_FALL_SAMPLES: usize = 20;
const REFRACTORY_MS: f64 = 50.0;

/// Generates a noisy intracellular-style voltage trace with occasional
/// spikes: slow membrane oscillation around the resting potential, a fast
/// depolarization to the peak, and a slower after-hyperpolarization.
pub fn synthetic_trace(n_samples: usize, period_ms: f64) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let refractory_samples = (REFRACTORY_MS / period_ms) as usize;

    let mut trace = Vec::with_capacity(n_samples);
    let mut spike_phase: Option<usize> = None;
    let mut since_spike = refractory_samples;

    for i in 0..n_samples {
        let time_ms = i as f64 * period_ms;
        let oscillation = 0.004 * (time_ms * 0.002 * std::f64::consts::TAU).sin();
        let noise = rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE);
        let baseline = RESTING_POTENTIAL + oscillation + noise;

        if spike_phase.is_none()
            && since_spike >= refractory_samples
            && rng.gen_range(0..1000) < SPIKE_CHANCE_PERCENT * 10
        {
            spike_phase = Some(0);
            since_spike = 0;
        }

        let v = match spike_phase {
            Some(phase) if phase < SPIKE_RISE_SAMPLES => {
                spike_phase = Some(phase + 1);
                let frac = phase as f64 / SPIKE_RISE_SAMPLES as f64;
                baseline + (SPIKE_PEAK - baseline) * frac
            }
            Some(phase) if phase < SPIKE_RISE_SAMPLES + SPIKE_FALL_SAMPLES => {
                spike_phase = Some(phase + 1);
                let frac =
                    (phase - SPIKE_RISE_SAMPLES) as f64 / SPIKE_FALL_SAMPLES as f64;
                SPIKE_PEAK + (baseline - 0.01 - SPIKE_PEAK) * frac
            }
            Some(_) => {
                spike_phase = None;
                baseline - 0.005 // trailing hyperpolarization
            }
            None => baseline,
        };

        since_spike += 1;
        trace.push(v);
    }

    trace
}
