pub mod config;
pub mod indicators;
pub mod patterns;
pub mod signals;

pub use config::{RuleConfig, ScanConfig, StrategyFileConfig};
pub use indicators::{annotate, AnnotatedCandle, IndicatorSeries, IndicatorSnapshot};
pub use patterns::{is_bearish_engulfing, is_bullish_engulfing};
pub use signals::{Decision, Rule, SignalEvaluator};
