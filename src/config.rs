use serde::{Deserialize, Serialize};

use crate::core::waves::WaveFamily;
use crate::error::{AnalysisError, Result};
use crate::strategies::signals::StopPreference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Window,
    Zigzag,
    Adaptive,
}

impl DetectorKind {
    pub fn from_str_loose(s: &str) -> Option<DetectorKind> {
        match s.trim().to_lowercase().as_str() {
            "window" => Some(DetectorKind::Window),
            "zigzag" => Some(DetectorKind::Zigzag),
            "adaptive" | "atr" => Some(DetectorKind::Adaptive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // Pivot detection
    pub detector: DetectorKind,
    pub window: usize,
    /// Percent move required between consecutive window pivots
    pub min_price_change: f64,
    /// Percent reversal for the ZigZag detector
    pub threshold_pct: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,

    // Wave counting
    pub wave_family: WaveFamily,

    // Indicators
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_recent_window: usize,
    pub volume_baseline_window: usize,
    /// Recent/baseline volume ratio that counts as a trend
    pub volume_threshold: f64,

    // Validation
    pub min_bars: usize,

    // Signal filtering
    pub min_confidence: f64,
    pub min_risk_reward: f64,
    pub stop_preference: StopPreference,

    // Multi-timeframe
    pub strategic_weight: f64,
    pub follow_threshold: f64,

    // Logging
    pub log_level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::Window,
            window: 5,
            min_price_change: 1.0,
            threshold_pct: 5.0,
            atr_period: 14,
            atr_multiplier: 2.0,
            wave_family: WaveFamily::Any,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_recent_window: 10,
            volume_baseline_window: 30,
            volume_threshold: 1.2,
            min_bars: 50,
            min_confidence: 60.0,
            min_risk_reward: 1.5,
            stop_preference: StopPreference::Invalidation,
            strategic_weight: 0.6,
            follow_threshold: 70.0,
            log_level: "INFO".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str| -> Option<String> { std::env::var(key).ok() };
        let d = AnalysisConfig::default();

        AnalysisConfig {
            detector: env("WAVE_DETECTOR")
                .and_then(|s| DetectorKind::from_str_loose(&s))
                .unwrap_or(d.detector),
            window: parse_or(env("WAVE_WINDOW"), d.window),
            min_price_change: parse_or(env("WAVE_MIN_PRICE_CHANGE"), d.min_price_change),
            threshold_pct: parse_or(env("WAVE_THRESHOLD_PCT"), d.threshold_pct),
            atr_period: parse_or(env("WAVE_ATR_PERIOD"), d.atr_period),
            atr_multiplier: parse_or(env("WAVE_ATR_MULTIPLIER"), d.atr_multiplier),
            wave_family: env("WAVE_FAMILY")
                .and_then(|s| WaveFamily::from_str_loose(&s))
                .unwrap_or(d.wave_family),
            rsi_period: parse_or(env("WAVE_RSI_PERIOD"), d.rsi_period),
            rsi_overbought: parse_or(env("WAVE_RSI_OVERBOUGHT"), d.rsi_overbought),
            rsi_oversold: parse_or(env("WAVE_RSI_OVERSOLD"), d.rsi_oversold),
            macd_fast: parse_or(env("WAVE_MACD_FAST"), d.macd_fast),
            macd_slow: parse_or(env("WAVE_MACD_SLOW"), d.macd_slow),
            macd_signal: parse_or(env("WAVE_MACD_SIGNAL"), d.macd_signal),
            volume_recent_window: parse_or(env("WAVE_VOLUME_RECENT"), d.volume_recent_window),
            volume_baseline_window: parse_or(
                env("WAVE_VOLUME_BASELINE"),
                d.volume_baseline_window,
            ),
            volume_threshold: parse_or(env("WAVE_VOLUME_THRESHOLD"), d.volume_threshold),
            min_bars: parse_or(env("WAVE_MIN_BARS"), d.min_bars),
            min_confidence: parse_or(env("WAVE_MIN_CONFIDENCE"), d.min_confidence),
            min_risk_reward: parse_or(env("WAVE_MIN_RISK_REWARD"), d.min_risk_reward),
            stop_preference: env("WAVE_STOP_PREFERENCE")
                .and_then(|s| StopPreference::from_str_loose(&s))
                .unwrap_or(d.stop_preference),
            strategic_weight: parse_or(env("WAVE_STRATEGIC_WEIGHT"), d.strategic_weight),
            follow_threshold: parse_or(env("WAVE_FOLLOW_THRESHOLD"), d.follow_threshold),
            log_level: env("WAVE_LOG_LEVEL").unwrap_or(d.log_level),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if self.window == 0 {
            return fail("window must be at least 1".into());
        }
        if self.threshold_pct <= 0.0 {
            return fail(format!("threshold_pct must be positive, got {}", self.threshold_pct));
        }
        if self.min_price_change < 0.0 {
            return fail(format!(
                "min_price_change must not be negative, got {}",
                self.min_price_change
            ));
        }
        if self.atr_period == 0 || self.atr_multiplier <= 0.0 {
            return fail("atr_period and atr_multiplier must be positive".into());
        }
        if self.rsi_period == 0 {
            return fail("rsi_period must be at least 1".into());
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return fail(format!(
                "rsi thresholds must satisfy 0 <= oversold < overbought <= 100, got {}/{}",
                self.rsi_oversold, self.rsi_overbought
            ));
        }
        if self.macd_fast == 0 || self.macd_signal == 0 || self.macd_fast >= self.macd_slow {
            return fail(format!(
                "macd periods must satisfy 0 < fast < slow and signal > 0, got {}/{}/{}",
                self.macd_fast, self.macd_slow, self.macd_signal
            ));
        }
        if self.volume_recent_window == 0
            || self.volume_recent_window > self.volume_baseline_window
        {
            return fail(format!(
                "volume windows must satisfy 0 < recent <= baseline, got {}/{}",
                self.volume_recent_window, self.volume_baseline_window
            ));
        }
        if self.volume_threshold < 1.0 {
            return fail(format!(
                "volume_threshold must be >= 1.0, got {}",
                self.volume_threshold
            ));
        }
        if self.min_bars < 2 * self.window + 1 {
            return fail(format!(
                "min_bars ({}) must cover the detection window ({})",
                self.min_bars,
                2 * self.window + 1
            ));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) || self.min_risk_reward < 0.0 {
            return fail("min_confidence must be in [0,100] and min_risk_reward >= 0".into());
        }
        if !(0.5..=1.0).contains(&self.strategic_weight) {
            return fail(format!(
                "strategic_weight must be in [0.5, 1.0], got {}",
                self.strategic_weight
            ));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
