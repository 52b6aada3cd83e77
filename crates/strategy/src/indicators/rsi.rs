/// RSI (Relative Strength Index) series.
///
/// The first value sits at index `period - 1` and is seeded from the plain
/// averages of the `period - 1` changes inside the first window of `period`
/// closes. Later values use Wilder's smoothing. Earlier indices are `None`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period < 2 || closes.len() < period {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (initial, rest) = changes.split_at(period - 1);
    let seed_len = initial.len() as f64;

    let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / seed_len;
    let mut avg_loss =
        initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / seed_len;
    out[period - 1] = Some(rsi_value(avg_gain, avg_loss));

    // Wilder smoothing over remaining changes
    for (offset, &change) in rest.iter().enumerate() {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[period + offset] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
