use crate::config::{Config, PredictorConfig, ProcessorConfig};
use crate::processing::predictor::SpikePredictor;

use std::os::raw::c_void;

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn create_spike_predictor(
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
) -> *mut c_void {
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

    match SpikePredictor::new(config) {
        Ok(predictor) => Box::into_raw(Box::new(predictor)) as *mut c_void,
        Err(message) => {
            eprintln!("create_spike_predictor: {}", message);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn delete_spike_predictor(predictor_ptr: *mut c_void) {
    if !predictor_ptr.is_null() {
        unsafe {
            drop(Box::from_raw(predictor_ptr as *mut SpikePredictor));
        }
    }
}

/// Runs one sample and writes the nine ordered outputs into `out`
/// (booleans as 0/1). `out` must point at space for nine doubles.
#[no_mangle]
pub extern "C" fn spike_predictor_step(
    predictor_ptr: *mut c_void,
    v: f64,
    sum_reset: f64,
    out: *mut f64,
) -> bool {
    if predictor_ptr.is_null() || out.is_null() {
        return false;
    }
    let predictor = unsafe { &mut *(predictor_ptr as *mut SpikePredictor) };
    let output = predictor.step(v, sum_reset).as_array();
    let out_slice = unsafe { std::slice::from_raw_parts_mut(out, output.len()) };
    out_slice.copy_from_slice(&output);
    true
}

/// Writes the six state values into `out`: voltage threshold, slope
/// threshold, sum threshold, latched reset reference, minimum sum, sum.
#[no_mangle]
pub extern "C" fn spike_predictor_snapshot(predictor_ptr: *mut c_void, out: *mut f64) -> bool {
    if predictor_ptr.is_null() || out.is_null() {
        return false;
    }
    let predictor = unsafe { &*(predictor_ptr as *mut SpikePredictor) };
    let snapshot = predictor.snapshot();
    let values = [
        snapshot.voltage_threshold,
        snapshot.slope_threshold,
        snapshot.sum_threshold,
        snapshot.sum_reset_reference,
        snapshot.sum_min,
        snapshot.sum,
    ];
    let out_slice = unsafe { std::slice::from_raw_parts_mut(out, values.len()) };
    out_slice.copy_from_slice(&values);
    true
}

#[no_mangle]
pub extern "C" fn spike_predictor_n_spikes(predictor_ptr: *mut c_void) -> usize {
    if predictor_ptr.is_null() {
        return 0;
    }
    let predictor = unsafe { &*(predictor_ptr as *mut SpikePredictor) };
    predictor.n_spikes()
}
