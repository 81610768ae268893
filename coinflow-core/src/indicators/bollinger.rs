//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Middle: SMA(period); upper/lower: middle ± mult * stddev(period).
//! Uses population stddev (divide by N). First valid value at `period - 1`.

/// All three bands, each the same length as the input.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Compute Bollinger Bands over `values`.
pub fn bollinger(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    assert!(period >= 1, "Bollinger period must be >= 1");
    let n = values.len();
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        lower: vec![f64::NAN; n],
    };

    if n < period {
        return bands;
    }

    for i in (period - 1)..n {
        let start = i + 1 - period;
        let window = &values[start..=i];

        // Check for NaN in window
        let mut has_nan = false;
        let mut sum = 0.0;
        for &v in window {
            if v.is_nan() {
                has_nan = true;
                break;
            }
            sum += v;
        }
        if has_nan {
            continue;
        }

        let mean = sum / period as f64;

        // Population stddev
        let variance: f64 = window
            .iter()
            .map(|&v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        bands.middle[i] = mean;
        bands.upper[i] = mean + multiplier * stddev;
        bands.lower[i] = mean - multiplier * stddev;
    }

    bands
}
