use super::filter::{slope, weighted_filter};
use super::ring::RingBuffer;
use crate::config::Config;
use crate::utils::log::log_to_file;

// -----------------------------------------------------------------------------
// RUST CORE LOGIC
// -----------------------------------------------------------------------------

// SPIKE PREDICTOR COMPONENT ---------------------------------------------------

/// Slots in the recent-spike ring used for the 3-point sum-threshold average.
pub const SPIKE_MEMORY: usize = 10;

/// Sentinel below which the slope override is considered disabled.
pub const SLOPE_OVERRIDE_DISABLED: f64 = -1000.0;

/// Detection phase. A single tagged state instead of separate armed and
/// post-peak flags, so the transitions stay auditable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorState {
    /// Ready to detect a new upward crossing.
    Armed,
    /// Waiting for hyperpolarization below the firing threshold to re-arm.
    Refractory,
    /// Peak seen, counting samples until the delayed threshold freeze.
    PostPeak { t_after: usize },
}

/// The nine per-step outputs, in the wire order the host expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutput {
    pub filtered: f64,
    pub voltage_threshold: f64,
    pub slope_threshold: f64,
    pub sum_threshold: f64,
    pub slope: f64,
    pub sum: f64,
    pub sum_crossed: bool,
    pub voltage_crossed: bool,
    pub slope_crossed: bool,
}

impl StepOutput {
    /// Flat representation for FFI and CSV writers; booleans become 0/1.
    pub fn as_array(&self) -> [f64; 9] {
        [
            self.filtered,
            self.voltage_threshold,
            self.slope_threshold,
            self.sum_threshold,
            self.slope,
            self.sum,
            self.sum_crossed as u8 as f64,
            self.voltage_crossed as u8 as f64,
            self.slope_crossed as u8 as f64,
        ]
    }
}

/// Read-only state surfaced to the host between runs.
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub voltage_threshold: f64,
    pub slope_threshold: f64,
    pub sum_threshold: f64,
    pub sum_reset_reference: f64,
    pub sum_min: f64,
    pub sum: f64,
}

pub struct SpikePredictor {
    config: Config,
    cycle: usize,
    v_list: RingBuffer,
    sum_list: RingBuffer,
    state: DetectorState,
    updatable: bool,
    n_spikes: usize,
    th_sum_buff: [f64; SPIKE_MEMORY],
    sum: f64,
    sum_min: f64,
    sum_reset_param: f64,
    th_calculated: f64,
    sl_calculated: f64,
    th_sum_calculated: f64,
    curr_slope: f64,
}

impl SpikePredictor {
    pub fn new(config: Config) -> Result<Self, String> {
        validate(&config, config.processor.buffer_len)?;

        let buffer_len = config.processor.buffer_len;
        let sum_reset_param = config.predictor.sum_reset_voltage;
        Ok(SpikePredictor {
            config,
            cycle: 0,
            v_list: RingBuffer::new(buffer_len),
            sum_list: RingBuffer::new(buffer_len),
            state: DetectorState::Refractory,
            updatable: false,
            n_spikes: 0,
            th_sum_buff: [0.0; SPIKE_MEMORY],
            sum: 0.0,
            sum_min: 100.0,
            sum_reset_param,
            th_calculated: 0.0,
            sl_calculated: 0.0,
            th_sum_calculated: -0.05,
            curr_slope: 0.0,
        })
    }

    /// Replace the configuration on a live predictor, keeping buffer history.
    /// The ring length is fixed at construction and cannot change here.
    pub fn set_config(&mut self, config: Config) -> Result<(), String> {
        if config.processor.buffer_len != self.v_list.len() {
            return Err(format!(
                "buffer_len cannot change on a live predictor ({} != {})",
                config.processor.buffer_len,
                self.v_list.len()
            ));
        }
        validate(&config, self.v_list.len())?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn n_spikes(&self) -> usize {
        self.n_spikes
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            voltage_threshold: self.th_calculated,
            slope_threshold: self.sl_calculated,
            sum_threshold: self.th_sum_calculated,
            sum_reset_reference: self.sum_reset_param,
            sum_min: self.sum_min,
            sum: self.sum,
        }
    }

    fn time_from_peak_points(&self) -> isize {
        // Truncating division: partial periods do not count.
        (self.config.predictor.time_from_peak_ms / self.config.processor.period_ms) as isize
    }

    /// Process one raw sample. `sum_reset_input` is the reset-reference
    /// channel; 0 means "no override this step". Straight-line and
    /// allocation-free: invoked once per period by the host scheduler.
    pub fn step(&mut self, v: f64, sum_reset_input: f64) -> StepOutput {
        let pred = self.config.predictor.clone();
        let period = self.config.processor.period_ms;
        let tfp_points = self.time_from_peak_points();

        // Filter stage: smooth and store the new history sample.
        let v_filtered = weighted_filter(&self.v_list, self.cycle, v, pred.filter_points);
        self.v_list.set(self.cycle, v_filtered);

        // Slope stage, recomputed every step regardless of spike state.
        self.curr_slope = if pred.slope_points == 0 {
            0.0
        } else {
            let x1 = self.v_list.lagged(self.cycle, 0);
            let x2 = self.v_list.lagged(self.cycle, pred.slope_points as isize);
            slope(x1, x2, pred.slope_points as f64 * period)
        };

        // Detection stage. `recompute` is the one-shot freeze request.
        let mut recompute = false;
        match self.state {
            DetectorState::Armed => {
                // Above threshold and falling from a local max: the drop
                // against the sample 3 cycles back separates the peak from
                // sustained depolarization.
                if v > pred.firing_threshold && v < self.v_list.lagged(self.cycle, 3) {
                    self.n_spikes += 1;
                    if pred.time_from_peak_ms <= 0.0 {
                        recompute = true;
                    } else {
                        self.state = DetectorState::PostPeak { t_after: 0 };
                    }
                }
            }
            DetectorState::PostPeak { t_after } => {
                if (t_after as isize) < tfp_points {
                    self.state = DetectorState::PostPeak {
                        t_after: t_after + 1,
                    };
                } else {
                    recompute = true;
                }
            }
            DetectorState::Refractory => {}
        }

        if recompute {
            self.state = DetectorState::Refractory;
            self.recompute_thresholds(tfp_points, period);
        }

        // Hysteresis: hyperpolarization turns spike detection on again.
        if self.state == DetectorState::Refractory && v < pred.firing_threshold {
            self.state = DetectorState::Armed;
        }

        // Integration stage. A nonzero reference input latches the reset
        // voltage; the gate itself is evaluated every step.
        if sum_reset_input != 0.0 {
            self.sum_reset_param = sum_reset_input;
        }
        if (v - self.sum_reset_param).abs() < pred.sum_reset_tolerance {
            self.sum = 0.0;
        }
        self.sum += v;
        self.sum_list.set(self.cycle, self.sum);
        if self.sum < self.sum_min {
            self.sum_min = self.sum;
        }

        // Overrides replace the automatic thresholds entirely while active.
        if pred.sum_threshold_override >= 0.0 {
            self.th_sum_calculated = pred.sum_threshold_override;
        }
        if pred.slope_threshold_override > SLOPE_OVERRIDE_DISABLED {
            self.sl_calculated = pred.slope_threshold_override;
        }

        // Output composition. Crossing states are meaningless until the
        // first detection cycle has completed, so they are forced low.
        let output = StepOutput {
            filtered: v_filtered,
            voltage_threshold: self.th_calculated,
            slope_threshold: self.sl_calculated,
            sum_threshold: self.th_sum_calculated,
            slope: self.curr_slope,
            sum: self.sum,
            sum_crossed: self.updatable && self.sum < self.th_sum_calculated,
            voltage_crossed: self.updatable && v > self.th_calculated,
            slope_crossed: self.updatable && self.curr_slope > self.sl_calculated,
        };

        self.cycle = (self.cycle + 1) % self.v_list.len();
        output
    }

    /// Convenience wrapper for hosts that hand over buffered data instead of
    /// driving the predictor sample by sample.
    pub fn run_chunk(&mut self, data: &[f64], sum_reset_input: f64) -> Vec<StepOutput> {
        data.iter()
            .map(|&v| self.step(v, sum_reset_input))
            .collect()
    }

    /// Freeze the three thresholds from the history `tfp_points` samples
    /// back. By the time the delayed branch fires the rings already hold the
    /// values from the event cycle.
    fn recompute_thresholds(&mut self, tfp_points: isize, period: f64) {
        let slope_points = self.config.predictor.slope_points;

        self.th_calculated = self.v_list.lagged(self.cycle, tfp_points);

        self.sl_calculated = if slope_points == 0 {
            0.0
        } else {
            let x1 = self.v_list.lagged(self.cycle, tfp_points);
            let x2 = self
                .v_list
                .lagged(self.cycle, tfp_points + slope_points as isize);
            slope(x1, x2, slope_points as f64 * period)
        };

        // Sum threshold: raw value at the lag, then a 3-point average over
        // the recent-spike ring. For the first two spikes the average wraps
        // into zero-filled slots; that pre-steady-state behaviour is kept.
        let raw = self.sum_list.lagged(self.cycle, tfp_points);
        let slot = self.n_spikes % SPIKE_MEMORY;
        self.th_sum_buff[slot] = raw;
        let prev = self.th_sum_buff[(slot + SPIKE_MEMORY - 1) % SPIKE_MEMORY];
        let prev2 = self.th_sum_buff[(slot + SPIKE_MEMORY - 2) % SPIKE_MEMORY];
        self.th_sum_calculated = (raw + prev + prev2) / 3.0;

        self.updatable = true;

        if self.config.processor.verbose {
            let message = format!(
                "spike {} at cycle {} - th: {}, slope_th: {}, sum_th: {}",
                self.n_spikes,
                self.cycle,
                self.th_calculated,
                self.sl_calculated,
                self.th_sum_calculated
            );
            log_to_file("spike_predictor.log", &message).ok();
        }
    }
}

fn validate(config: &Config, buffer_len: usize) -> Result<(), String> {
    let processor = &config.processor;
    let pred = &config.predictor;

    if processor.period_ms <= 0.0 {
        return Err(format!(
            "period_ms must be positive, got {}",
            processor.period_ms
        ));
    }
    if buffer_len == 0 {
        return Err("buffer_len must be nonzero".to_string());
    }

    let tfp_points = (pred.time_from_peak_ms / processor.period_ms) as isize;
    let required = pred
        .filter_points
        .max(2 * pred.slope_points)
        .max(tfp_points.max(0) as usize + pred.slope_points)
        .max(4); // the local-max check looks 3 cycles back
    if buffer_len < required {
        return Err(format!(
            "buffer_len {} does not cover the longest lookback window ({} samples); \
             reads would alias onto stale cycles",
            buffer_len, required
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const EPS: f64 = 1e-12;

    fn config(buffer_len: usize) -> Config {
        let mut config = Config::default();
        config.processor.period_ms = 1.0;
        config.processor.buffer_len = buffer_len;
        config.predictor.firing_threshold = 0.5;
        config.predictor.slope_points = 1;
        // Keep the sum reset far away from the test signals.
        config.predictor.sum_reset_voltage = -100.0;
        config
    }

    #[test]
    fn rejects_undersized_buffer() {
        let mut cfg = config(8);
        cfg.predictor.slope_points = 10;
        assert!(SpikePredictor::new(cfg).is_err());
    }

    #[test]
    fn rejects_nonpositive_period() {
        let mut cfg = config(64);
        cfg.processor.period_ms = 0.0;
        assert!(SpikePredictor::new(cfg).is_err());
    }

    #[test]
    fn cycle_advances_by_one_modulo_len() {
        let mut predictor = SpikePredictor::new(config(16)).unwrap();
        for i in 0..40 {
            predictor.step(0.0, 0.0);
            assert_eq!(predictor.cycle(), (i + 1) % 16);
        }
    }

    #[test]
    fn no_spike_round_trip_accumulates_and_buffers() {
        let mut cfg = config(16);
        cfg.predictor.firing_threshold = 10.0; // never crossed
        let mut predictor = SpikePredictor::new(cfg).unwrap();

        let samples: Vec<f64> = (0..16).map(|i| 0.01 * i as f64 + 0.1).collect();
        let mut total = 0.0;
        for &v in &samples {
            predictor.step(v, 0.0);
            total += v;
        }

        assert!((predictor.snapshot().sum - total).abs() < EPS);
        // Buffer holds the last 16 filtered samples in cyclic order; with
        // filter_points = 0 those are the raw inputs.
        for (i, &v) in samples.iter().enumerate() {
            assert_eq!(predictor.v_list.lagged(predictor.cycle(), 16 - i as isize), v);
        }
        assert_eq!(predictor.n_spikes(), 0);
    }

    #[test]
    fn crossing_flags_forced_low_before_first_detection() {
        let mut cfg = config(64);
        cfg.predictor.firing_threshold = 10.0;
        let mut predictor = SpikePredictor::new(cfg).unwrap();

        // Drive the sum far below the initial -0.05 sum threshold; the
        // crossing would read true if it were not gated.
        for _ in 0..20 {
            let out = predictor.step(-1.0, 0.0);
            assert!(!out.sum_crossed);
            assert!(!out.voltage_crossed);
            assert!(!out.slope_crossed);
        }
    }

    #[test]
    fn overrides_take_effect_on_the_next_step() {
        let mut cfg = config(64);
        cfg.predictor.slope_threshold_override = 2.5;
        cfg.predictor.sum_threshold_override = 1.25;
        let mut predictor = SpikePredictor::new(cfg).unwrap();

        let out = predictor.step(0.0, 0.0);
        assert_eq!(out.slope_threshold, 2.5);
        assert_eq!(out.sum_threshold, 1.25);
    }

    #[test]
    fn hysteresis_blocks_retrigger_until_hyperpolarization() {
        let mut predictor = SpikePredictor::new(config(64)).unwrap();

        // Rise over the threshold, then fall past the local max.
        for v in [0.0, 0.6, 1.0, 0.9, 0.8, 0.55] {
            predictor.step(v, 0.0);
        }
        assert_eq!(predictor.n_spikes(), 1);
        assert_eq!(predictor.state(), DetectorState::Refractory);

        // Stay above threshold with falling stretches; no re-trigger.
        for v in [0.8, 0.9, 0.95, 0.7, 0.6, 0.55] {
            predictor.step(v, 0.0);
        }
        assert_eq!(predictor.n_spikes(), 1);
        assert_eq!(predictor.state(), DetectorState::Refractory);

        // Hyperpolarize, then a second peak fires again.
        predictor.step(0.4, 0.0);
        assert_eq!(predictor.state(), DetectorState::Armed);
        for v in [0.6, 1.0, 0.9, 0.8, 0.55] {
            predictor.step(v, 0.0);
        }
        assert_eq!(predictor.n_spikes(), 2);
    }

    #[test]
    fn delayed_update_freezes_lagged_thresholds() {
        let mut cfg = config(64);
        cfg.predictor.time_from_peak_ms = 2.0; // 2 samples at 1 ms period
        let mut predictor = SpikePredictor::new(cfg).unwrap();

        let trace = [0.0, 0.6, 1.0, 0.9, 0.8, 0.55, 0.4, 0.3, 0.2];
        let outputs: Vec<StepOutput> = trace.iter().map(|&v| predictor.step(v, 0.0)).collect();
        let last = outputs.last().unwrap();

        // Detection at v = 0.55; freeze fires 3 steps later and reads the
        // history 2 samples back, i.e. the 0.4 sample.
        assert_eq!(predictor.n_spikes(), 1);
        assert_eq!(last.voltage_threshold, 0.4);
        // Slope between the 0.4 and 0.55 taps, inverted sign.
        assert!((last.slope_threshold - -0.15).abs() < EPS);

        // First spike: the 3-point average wraps into zero-filled slots, so
        // the emitted sum threshold is one third of the raw lagged sum.
        let raw_lagged_sum: f64 = trace[..7].iter().sum(); // sum at the 0.4 step
        assert!((last.sum_threshold - raw_lagged_sum / 3.0).abs() < EPS);
    }

    #[test]
    fn sum_resets_at_reference_and_latches_input() {
        let mut cfg = config(64);
        cfg.predictor.firing_threshold = 10.0;
        cfg.predictor.sum_reset_voltage = -0.05;
        cfg.predictor.sum_reset_tolerance = 0.003;
        let mut predictor = SpikePredictor::new(cfg).unwrap();

        predictor.step(-0.3, 0.0);
        let out = predictor.step(-0.05, 0.0); // within tolerance: reset, then accumulate
        assert!((out.sum - -0.05).abs() < EPS);

        let out = predictor.step(-0.5, 0.0);
        assert!((out.sum - -0.55).abs() < EPS);
        assert!((predictor.snapshot().sum_min - -0.55).abs() < EPS);

        // A nonzero reference input latches a new reset voltage.
        predictor.step(-0.2, -0.5);
        assert_eq!(predictor.snapshot().sum_reset_reference, -0.5);
        let out = predictor.step(-0.5, 0.0);
        assert!((out.sum - -0.5).abs() < EPS);
    }

    #[test]
    fn nan_input_degrades_to_no_detection() {
        let mut predictor = SpikePredictor::new(config(64)).unwrap();
        for _ in 0..10 {
            let out = predictor.step(f64::NAN, 0.0);
            assert!(!out.voltage_crossed);
            assert!(!out.sum_crossed);
            assert!(!out.slope_crossed);
        }
        assert_eq!(predictor.n_spikes(), 0);
    }

    #[test]
    fn set_config_revalidates_and_keeps_buffer_len() {
        let mut predictor = SpikePredictor::new(config(64)).unwrap();

        let mut modified = config(64);
        modified.predictor.firing_threshold = -0.02;
        predictor.set_config(modified).unwrap();
        assert_eq!(predictor.config().predictor.firing_threshold, -0.02);

        let resized = config(128);
        assert!(predictor.set_config(resized).is_err());

        let mut oversized = config(64);
        oversized.predictor.slope_points = 200;
        assert!(predictor.set_config(oversized).is_err());
    }
}
