use crate::config::{Config, PredictorConfig, ProcessorConfig};
use crate::processing::predictor::SpikePredictor;

use std::collections::HashMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

#[pyclass]
pub struct PySpikePredictor {
    predictor: SpikePredictor,
}

#[pymethods]
impl PySpikePredictor {
    #[new]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        verbose: bool,
        period_ms: f64,
        buffer_len: usize,
        firing_threshold: f64,
        time_from_peak_ms: f64,
        filter_points: usize,
        slope_points: usize,
        sum_reset_voltage: f64,
        sum_reset_tolerance: f64,
        sum_threshold_override: f64,
        slope_threshold_override: f64,
    ) -> PyResult<Self> {
        let config = Config {
            processor: ProcessorConfig {
                verbose,
                period_ms,
                buffer_len,
            },
            predictor: PredictorConfig {
                firing_threshold,
                time_from_peak_ms,
                filter_points,
                slope_points,
                sum_reset_voltage,
                sum_reset_tolerance,
                sum_threshold_override,
                slope_threshold_override,
            },
        };
        let predictor = SpikePredictor::new(config).map_err(PyValueError::new_err)?;
        Ok(PySpikePredictor { predictor })
    }

    /// One sample in, the nine ordered outputs back.
    pub fn step(
        &mut self,
        v: f64,
        sum_reset: f64,
    ) -> (f64, f64, f64, f64, f64, f64, bool, bool, bool) {
        let out = self.predictor.step(v, sum_reset);
        (
            out.filtered,
            out.voltage_threshold,
            out.slope_threshold,
            out.sum_threshold,
            out.slope,
            out.sum,
            out.sum_crossed,
            out.voltage_crossed,
            out.slope_crossed,
        )
    }

    pub fn run_chunk(&mut self, data: Vec<f64>, sum_reset: f64) -> Vec<Vec<f64>> {
        self.predictor
            .run_chunk(&data, sum_reset)
            .iter()
            .map(|out| out.as_array().to_vec())
            .collect()
    }

    pub fn n_spikes(&self) -> usize {
        self.predictor.n_spikes()
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        let snapshot = self.predictor.snapshot();
        HashMap::from([
            ("voltage_threshold".to_string(), snapshot.voltage_threshold),
            ("slope_threshold".to_string(), snapshot.slope_threshold),
            ("sum_threshold".to_string(), snapshot.sum_threshold),
            (
                "sum_reset_reference".to_string(),
                snapshot.sum_reset_reference,
            ),
            ("sum_min".to_string(), snapshot.sum_min),
            ("sum".to_string(), snapshot.sum),
        ])
    }
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn spike_predictor(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySpikePredictor>()?;
    Ok(())
}
