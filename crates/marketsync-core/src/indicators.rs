//! Rolling-mean columns over closing prices.

use serde::Serialize;

use crate::{PriceSeries, ValidationError};

/// Windows the sync command applies when none are given.
pub const DEFAULT_WINDOWS: [usize; 2] = [50, 200];

/// One rolling-mean column. `values[i]` is `None` until the window has
/// filled, then the arithmetic mean of the trailing `window` closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

/// A price series with rolling-mean columns attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    pub series: PriceSeries,
    pub moving_averages: Vec<MovingAverage>,
}

/// Trailing mean of `values` for every position, no lookahead.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, ValidationError> {
    if window == 0 {
        return Err(ValidationError::ZeroWindow);
    }

    let mut output = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (index, value) in values.iter().enumerate() {
        sum += value;
        if index >= window {
            sum -= values[index - window];
        }
        if index + 1 >= window {
            output.push(Some(sum / window as f64));
        } else {
            output.push(None);
        }
    }
    Ok(output)
}

/// Attach one rolling-mean column per window, computed over the close.
pub fn enrich(series: PriceSeries, windows: &[usize]) -> Result<EnrichedSeries, ValidationError> {
    let closes = series.closes();
    let mut moving_averages = Vec::with_capacity(windows.len());
    for &window in windows {
        moving_averages.push(MovingAverage {
            window,
            values: moving_average(&closes, window)?,
        });
    }
    Ok(EnrichedSeries {
        series,
        moving_averages,
    })
}
