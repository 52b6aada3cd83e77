/// Exponential Moving Average over a close series (oldest first).
///
/// Seeded with the SMA of the first `period` closes, then
/// `ema[i] = close[i] * k + ema[i-1] * (1 - k)` with `k = 2 / (period + 1)`.
/// The output has the same length as `closes`; indices before `period - 1`
/// are `None`.
pub fn ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema_val = closes[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema_val);

    for (i, &price) in closes.iter().enumerate().skip(period) {
        ema_val = price * k + ema_val * (1.0 - k);
        out[i] = Some(ema_val);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup_is_absent() {
        let series = ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(series.len(), 5);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert!(series[2..].iter().all(Option::is_some));
    }

    #[test]
    fn ema_seed_is_sma() {
        let series = ema(&[10.0, 20.0, 30.0], 3);
        let seed = series[2].unwrap();
        assert!((seed - 20.0).abs() < 1e-12);
    }

    #[test]
    fn ema_recursion_after_seed() {
        // k = 0.5 for period 3
        let series = ema(&[10.0, 20.0, 30.0, 40.0], 3);
        let expected = 40.0 * 0.5 + 20.0 * 0.5;
        assert!((series[3].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn ema_short_input_is_all_absent() {
        let series = ema(&[1.0, 2.0], 34);
        assert_eq!(series, vec![None, None]);
        assert!(ema(&[], 34).is_empty());
    }

    #[test]
    fn ema_of_zero_prices_is_present_zero() {
        let series = ema(&[0.0, 0.0, 0.0], 2);
        assert_eq!(series[0], None);
        assert_eq!(series[1], Some(0.0));
    }
}
