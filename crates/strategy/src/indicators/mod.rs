pub mod ema;
pub mod rsi;

pub use ema::ema;
pub use rsi::rsi;

use common::Candle;

pub const EMA_PERIODS: [usize; 4] = [34, 50, 150, 200];
pub const RSI_PERIOD: usize = 14;

/// Indicator values aligned index-for-index with the candle sequence they were
/// computed from. `None` means the window is not full yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    pub ema34: Vec<Option<f64>>,
    pub ema50: Vec<Option<f64>>,
    pub ema150: Vec<Option<f64>>,
    pub ema200: Vec<Option<f64>>,
    pub rsi14: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Compute all series over the candles' closes. Pure and deterministic;
    /// an empty input yields empty series.
    pub fn compute(candles: &[Candle]) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let [p34, p50, p150, p200] = EMA_PERIODS;
        Self {
            ema34: ema(&closes, p34),
            ema50: ema(&closes, p50),
            ema150: ema(&closes, p150),
            ema200: ema(&closes, p200),
            rsi14: rsi(&closes, RSI_PERIOD),
        }
    }

    pub fn len(&self) -> usize {
        self.ema34.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ema34.is_empty()
    }

    /// Values at candle index `i`; all absent when `i` is out of range.
    pub fn at(&self, i: usize) -> IndicatorSnapshot {
        let get = |s: &[Option<f64>]| s.get(i).copied().flatten();
        IndicatorSnapshot {
            ema34: get(&self.ema34),
            ema50: get(&self.ema50),
            ema150: get(&self.ema150),
            ema200: get(&self.ema200),
            rsi14: get(&self.rsi14),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub ema34: Option<f64>,
    pub ema50: Option<f64>,
    pub ema150: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi14: Option<f64>,
}

/// A candle together with the indicator values at its index.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCandle {
    pub candle: Candle,
    pub indicators: IndicatorSnapshot,
}

/// Compute indicators and zip them onto the candles.
pub fn annotate(candles: &[Candle]) -> Vec<AnnotatedCandle> {
    let series = IndicatorSeries::compute(candles);
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| AnnotatedCandle {
            candle: c.clone(),
            indicators: series.at(i),
        })
        .collect()
}
