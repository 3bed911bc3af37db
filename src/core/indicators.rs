use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::AnalysisConfig;
use crate::models::{CandleSeries, Momentum, VolumeTrend};

const NEUTRAL_RSI: f64 = 50.0;

/// Oscillator, momentum and volume snapshot at the last bar of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub volume_trend: VolumeTrend,
    pub momentum: Momentum,
}

impl TechnicalIndicators {
    pub fn neutral() -> Self {
        Self {
            rsi: NEUTRAL_RSI,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            volume_trend: VolumeTrend::Neutral,
            momentum: Momentum::Neutral,
        }
    }
}

impl Default for TechnicalIndicators {
    fn default() -> Self {
        Self::neutral()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// Histogram one bar earlier, when enough history exists
    pub prev_histogram: Option<f64>,
}

impl MacdResult {
    pub fn neutral() -> Self {
        Self {
            macd: 0.0,
            signal: 0.0,
            histogram: 0.0,
            prev_histogram: None,
        }
    }
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());
    if period == 0 || values.len() < period {
        result.resize(values.len(), None);
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    for _ in 0..period - 1 {
        result.push(None);
    }
    let mut current = values[..period].iter().sum::<f64>() / period as f64;
    result.push(Some(current));

    for &v in &values[period..] {
        current = (v - current) * multiplier + current;
        result.push(Some(current));
    }
    result
}

/// Wilder RSI of the last bar. Falls back to 50 without `period + 1` closes.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }

    let p = period as f64;
    let mut avg_gain = gain_sum / p;
    let mut avg_loss = loss_sum / p;

    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
    }

    let value = if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            NEUTRAL_RSI
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    value.clamp(0.0, 100.0)
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    if fast == 0 || slow <= fast || closes.len() < slow {
        return MacdResult::neutral();
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .filter_map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let last_macd = line.last().copied().unwrap_or(0.0);
    let signal_line: Vec<f64> = ema(&line, signal).into_iter().flatten().collect();
    let Some(&last_signal) = signal_line.last() else {
        return MacdResult {
            macd: last_macd,
            ..MacdResult::neutral()
        };
    };

    // signal_line[k] pairs with the last signal_line.len() values of the macd line
    let offset = line.len() - signal_line.len();
    let prev_histogram = (signal_line.len() >= 2).then(|| {
        let k = signal_line.len() - 2;
        line[offset + k] - signal_line[k]
    });

    MacdResult {
        macd: last_macd,
        signal: last_signal,
        histogram: last_macd - last_signal,
        prev_histogram,
    }
}

/// Wilder ATR per bar. Bars before `period` use the running mean of the true
/// range so the series never looks ahead.
pub fn atr_series(candles: &CandleSeries, period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut result = Vec::with_capacity(candles.len());
    let mut prev_close: Option<f64> = None;
    let mut sum = 0.0;
    let mut atr = 0.0;

    for (i, c) in candles.iter().enumerate() {
        let tr = c.true_range(prev_close);
        prev_close = Some(c.close);
        if i < period {
            sum += tr;
            atr = sum / (i + 1) as f64;
        } else {
            atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
        }
        result.push(atr);
    }
    result
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalyzer {
    pub recent_window: usize,
    pub baseline_window: usize,
    pub threshold: f64,
}

impl VolumeAnalyzer {
    pub fn new(recent_window: usize, baseline_window: usize, threshold: f64) -> Self {
        Self {
            recent_window,
            baseline_window,
            threshold,
        }
    }

    pub fn classify(&self, volumes: &[f64]) -> VolumeTrend {
        if self.recent_window == 0
            || self.baseline_window < self.recent_window
            || volumes.len() < self.baseline_window
        {
            return VolumeTrend::Neutral;
        }

        let recent = mean(&volumes[volumes.len() - self.recent_window..]);
        let baseline = mean(&volumes[volumes.len() - self.baseline_window..]);
        if baseline <= 0.0 {
            return VolumeTrend::Neutral;
        }

        let ratio = recent / baseline;
        if ratio >= self.threshold {
            VolumeTrend::Increasing
        } else if ratio <= 1.0 / self.threshold {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumAnalyzer {
    pub overbought: f64,
    pub oversold: f64,
}

impl MomentumAnalyzer {
    pub fn new(overbought: f64, oversold: f64) -> Self {
        Self {
            overbought,
            oversold,
        }
    }

    /// A rising histogram is bullish when positive or when it lifts out of
    /// oversold RSI; bearish is the mirror image.
    pub fn classify(&self, rsi: f64, macd: &MacdResult) -> Momentum {
        let Some(prev) = macd.prev_histogram else {
            return Momentum::Neutral;
        };
        let hist = macd.histogram;

        if hist > prev && (hist > 0.0 || rsi <= self.oversold) {
            Momentum::Bullish
        } else if hist < prev && (hist < 0.0 || rsi >= self.overbought) {
            Momentum::Bearish
        } else {
            Momentum::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume: VolumeAnalyzer,
    pub momentum: MomentumAnalyzer,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl IndicatorParams {
    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self {
            rsi_period: cfg.rsi_period,
            macd_fast: cfg.macd_fast,
            macd_slow: cfg.macd_slow,
            macd_signal: cfg.macd_signal,
            volume: VolumeAnalyzer::new(
                cfg.volume_recent_window,
                cfg.volume_baseline_window,
                cfg.volume_threshold,
            ),
            momentum: MomentumAnalyzer::new(cfg.rsi_overbought, cfg.rsi_oversold),
        }
    }

    fn key_parts(&self) -> [u64; 9] {
        [
            self.rsi_period as u64,
            self.macd_fast as u64,
            self.macd_slow as u64,
            self.macd_signal as u64,
            self.volume.recent_window as u64,
            self.volume.baseline_window as u64,
            self.volume.threshold.to_bits(),
            self.momentum.overbought.to_bits(),
            self.momentum.oversold.to_bits(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndicatorKey {
    fingerprint: u64,
    params: [u64; 9],
}

/// Memoized indicator snapshots keyed by (series fingerprint, parameter set).
/// Owned by the caller and passed in explicitly.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    entries: HashMap<IndicatorKey, TechnicalIndicators>,
    pub hits: usize,
    pub misses: usize,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorEngine {
    pub params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(IndicatorParams::from_config(cfg))
    }

    pub fn compute(&self, candles: &CandleSeries) -> TechnicalIndicators {
        if candles.is_empty() {
            return TechnicalIndicators::neutral();
        }
        let p = &self.params;
        let closes = candles.closes();

        let rsi_value = rsi(&closes, p.rsi_period);
        let macd_value = macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal);
        let volume_trend = p.volume.classify(&candles.volumes());
        let momentum = p.momentum.classify(rsi_value, &macd_value);

        TechnicalIndicators {
            rsi: rsi_value,
            macd: macd_value.macd,
            macd_signal: macd_value.signal,
            macd_histogram: macd_value.histogram,
            volume_trend,
            momentum,
        }
    }

    pub fn compute_cached(
        &self,
        candles: &CandleSeries,
        cache: &mut IndicatorCache,
    ) -> TechnicalIndicators {
        let key = IndicatorKey {
            fingerprint: candles.fingerprint(),
            params: self.params.key_parts(),
        };
        if let Some(hit) = cache.entries.get(&key) {
            cache.hits += 1;
            tracing::trace!("[INDICATORS] cache hit ({} bars)", candles.len());
            return *hit;
        }
        cache.misses += 1;
        let value = self.compute(candles);
        cache.entries.insert(key, value);
        value
    }
}
