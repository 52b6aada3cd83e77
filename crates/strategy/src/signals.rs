use chrono::{DateTime, Utc};

use common::{Position, Signal};

use crate::config::RuleConfig;
use crate::indicators::AnnotatedCandle;
use crate::patterns::{is_bearish_engulfing, is_bullish_engulfing};

/// Entry rules, evaluated in this order for every candle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Engulfing pattern confirmed by close vs EMA34 and RSI14.
    Engulfing,
    /// Close crossing EMA50 between the two candles, filtered by RSI14.
    Ema50Cross,
}

impl Rule {
    pub const ALL: [Rule; 2] = [Rule::Engulfing, Rule::Ema50Cross];
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::Engulfing => write!(f, "engulfing"),
            Rule::Ema50Cross => write!(f, "ema50_cross"),
        }
    }
}

/// An actionable signal produced at a specific candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Index of the current candle of the transition.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub rule: Rule,
    pub signal: Signal,
    pub price: f64,
}

/// Decides whether a single candle transition opens a position.
///
/// The evaluator holds no position state of its own: the caller supplies the
/// current position for every rule, and must re-read it after acting on a
/// signal before evaluating the next rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalEvaluator {
    rules: RuleConfig,
}

impl SignalEvaluator {
    pub fn new(rules: RuleConfig) -> Self {
        Self { rules }
    }

    /// Evaluate one rule on the transition `prev -> curr`.
    pub fn evaluate(
        &self,
        rule: Rule,
        prev: &AnnotatedCandle,
        curr: &AnnotatedCandle,
        position: Position,
    ) -> Signal {
        match rule {
            Rule::Engulfing => self.engulfing(prev, curr, position),
            Rule::Ema50Cross => self.ema50_cross(prev, curr, position),
        }
    }

    fn engulfing(
        &self,
        prev: &AnnotatedCandle,
        curr: &AnnotatedCandle,
        position: Position,
    ) -> Signal {
        let close = curr.candle.close;
        let ema34 = curr.indicators.ema34;

        if position != Position::Long
            && is_bullish_engulfing(&prev.candle, &curr.candle)
            && ema34.is_some_and(|ema| close > ema)
            && self.rsi_allows_long(curr)
        {
            Signal::OpenLong
        } else if position != Position::Short
            && is_bearish_engulfing(&prev.candle, &curr.candle)
            && ema34.is_some_and(|ema| close < ema)
            && self.rsi_allows_short(curr)
        {
            Signal::OpenShort
        } else {
            Signal::Hold
        }
    }

    fn ema50_cross(
        &self,
        prev: &AnnotatedCandle,
        curr: &AnnotatedCandle,
        position: Position,
    ) -> Signal {
        let (Some(prev_ema), Some(curr_ema)) = (prev.indicators.ema50, curr.indicators.ema50)
        else {
            return Signal::Hold;
        };
        let (prev_close, curr_close) = (prev.candle.close, curr.candle.close);

        if position != Position::Long
            && prev_ema < prev_close
            && curr_ema > curr_close
            && self.rsi_allows_long(curr)
        {
            Signal::OpenLong
        } else if position != Position::Short
            && prev_ema > prev_close
            && curr_ema < curr_close
            && self.rsi_allows_short(curr)
        {
            Signal::OpenShort
        } else {
            Signal::Hold
        }
    }

    fn rsi_allows_long(&self, curr: &AnnotatedCandle) -> bool {
        curr.indicators.rsi14.is_some_and(|rsi| rsi < self.rules.overbought)
    }

    fn rsi_allows_short(&self, curr: &AnnotatedCandle) -> bool {
        curr.indicators.rsi14.is_some_and(|rsi| rsi > self.rules.oversold)
    }

    /// Walk every transition in order, applying each signal to the position
    /// as if the entry filled. Deterministic for identical inputs.
    pub fn replay(&self, bars: &[AnnotatedCandle], start: Position) -> Vec<Decision> {
        let mut position = start;
        let mut decisions = Vec::new();

        for (index, pair) in bars.windows(2).enumerate() {
            let (prev, curr) = (&pair[0], &pair[1]);
            for rule in Rule::ALL {
                let signal = self.evaluate(rule, prev, curr, position);
                if let Some(side) = signal.entry_side() {
                    position = Position::from_entry(side);
                    decisions.push(Decision {
                        index: index + 1,
                        timestamp: curr.candle.timestamp,
                        rule,
                        signal,
                        price: curr.candle.close,
                    });
                }
            }
        }
        decisions
    }
}
