//! Two-candle engulfing reversal patterns.
//!
//! Both detectors are total: a candle violating `low <= open, close <= high`
//! never matches.

use common::Candle;

/// Prior candle bearish, current bullish, and the current body engulfs the
/// prior body.
pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    well_formed(prev, curr)
        && prev.is_bearish()
        && curr.is_bullish()
        && curr.close > prev.open
        && curr.open < prev.close
}

/// Mirror of [`is_bullish_engulfing`].
pub fn is_bearish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    well_formed(prev, curr)
        && prev.is_bullish()
        && curr.is_bearish()
        && curr.close < prev.open
        && curr.open > prev.close
}

fn well_formed(prev: &Candle, curr: &Candle) -> bool {
    prev.is_well_formed() && curr.is_well_formed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn detects_bullish_engulfing() {
        let prev = candle(100.0, 98.0);
        let curr = candle(97.0, 101.0);
        assert!(is_bullish_engulfing(&prev, &curr));
        assert!(!is_bearish_engulfing(&prev, &curr));
    }

    #[test]
    fn detects_bearish_engulfing() {
        let prev = candle(98.0, 100.0);
        let curr = candle(101.0, 97.0);
        assert!(is_bearish_engulfing(&prev, &curr));
        assert!(!is_bullish_engulfing(&prev, &curr));
    }

    #[test]
    fn body_must_fully_engulf() {
        // curr closes above prev open but opens above prev close
        let prev = candle(100.0, 98.0);
        let curr = candle(98.5, 101.0);
        assert!(!is_bullish_engulfing(&prev, &curr));
        assert!(!is_bearish_engulfing(&prev, &curr));
    }

    #[test]
    fn doji_never_matches() {
        let doji = candle(100.0, 100.0);
        let bull = candle(97.0, 103.0);
        let bear = candle(103.0, 97.0);
        assert!(!is_bullish_engulfing(&doji, &bull));
        assert!(!is_bearish_engulfing(&doji, &bear));
        assert!(!is_bullish_engulfing(&bear, &doji));
        assert!(!is_bearish_engulfing(&bull, &doji));
    }

    #[test]
    fn malformed_candle_yields_false() {
        let prev = candle(100.0, 98.0);
        let mut curr = candle(97.0, 101.0);
        curr.high = 99.0; // close above high
        assert!(!is_bullish_engulfing(&prev, &curr));
        assert!(!is_bearish_engulfing(&prev, &curr));
    }
}
