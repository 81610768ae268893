//! Moving Average Convergence/Divergence (MACD).
//!
//! MACD line = EMA(fast) - EMA(slow); signal line = EMA(signal_period) of
//! the MACD line, seeded from the first index where the MACD line is
//! defined. First defined MACD value at `slow - 1`; first signal value at
//! `slow - 1 + signal_period - 1`.

use super::ema::ema;

/// MACD line plus its signal line, each the same length as the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

/// Compute MACD over `values` with the given fast/slow/signal periods.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    assert!(fast >= 1 && slow >= 1 && signal_period >= 1, "MACD periods must be >= 1");
    assert!(fast < slow, "MACD fast period must be shorter than slow");
    let n = values.len();

    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let macd_line: Vec<f64> = (0..n)
        .map(|i| {
            if fast_ema[i].is_nan() || slow_ema[i].is_nan() {
                f64::NAN
            } else {
                fast_ema[i] - slow_ema[i]
            }
        })
        .collect();

    // The MACD line starts with a NaN prefix where the slow EMA is unseeded;
    // the signal EMA runs over the defined suffix and is stitched back.
    let mut signal = vec![f64::NAN; n];
    if let Some(first_defined) = macd_line.iter().position(|v| !v.is_nan()) {
        let suffix_signal = ema(&macd_line[first_defined..], signal_period);
        for (offset, value) in suffix_signal.into_iter().enumerate() {
            signal[first_defined + offset] = value;
        }
    }

    MacdSeries {
        macd: macd_line,
        signal,
    }
}
