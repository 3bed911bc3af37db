use crate::config::{AnalysisConfig, DetectorKind};
use crate::core::indicators::atr_series;
use crate::models::{CandleSeries, PivotKind, PivotPoint, PivotSet};

/// Finds local price extrema. Implementations hold no state between calls,
/// so detecting twice on the same series returns the same set.
pub trait PivotDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, candles: &CandleSeries) -> PivotSet;
}

pub fn detector_from_config(cfg: &AnalysisConfig) -> Box<dyn PivotDetector> {
    match cfg.detector {
        DetectorKind::Window => Box::new(WindowDetector::new(cfg.window, cfg.min_price_change)),
        DetectorKind::Zigzag => Box::new(ZigZagDetector::new(cfg.threshold_pct)),
        DetectorKind::Adaptive => {
            Box::new(AdaptiveDetector::new(cfg.atr_period, cfg.atr_multiplier))
        }
    }
}

pub struct WindowDetector {
    pub window: usize,
    pub min_price_change_pct: f64,
}

impl WindowDetector {
    pub fn new(window: usize, min_price_change_pct: f64) -> Self {
        Self {
            window: window.max(1),
            min_price_change_pct,
        }
    }

    fn find_raw(&self, candles: &CandleSeries) -> Vec<PivotPoint> {
        let w = self.window;
        let len = candles.len();
        let mut raw = Vec::new();
        if len < 2 * w + 1 {
            return raw;
        }

        for i in w..(len - w) {
            // An equal extreme earlier in the window claims the pivot
            let current_high = candles[i].high;
            let is_high = (i - w..i).all(|j| candles[j].high < current_high)
                && (i + 1..=i + w).all(|j| candles[j].high <= current_high);
            if is_high {
                raw.push(PivotPoint::high(candles, i));
            }

            let current_low = candles[i].low;
            let is_low = (i - w..i).all(|j| candles[j].low > current_low)
                && (i + 1..=i + w).all(|j| candles[j].low >= current_low);
            if is_low {
                raw.push(PivotPoint::low(candles, i));
            }
        }
        raw
    }

    fn filter_noise(&self, raw: Vec<PivotPoint>) -> Vec<PivotPoint> {
        if self.min_price_change_pct <= 0.0 {
            return raw;
        }
        let mut kept: Vec<PivotPoint> = Vec::with_capacity(raw.len());
        for p in raw {
            match kept.last() {
                Some(prev) if prev.price != 0.0 => {
                    let change = (p.price - prev.price).abs() / prev.price.abs() * 100.0;
                    if change >= self.min_price_change_pct {
                        kept.push(p);
                    }
                }
                _ => kept.push(p),
            }
        }
        kept
    }
}

impl PivotDetector for WindowDetector {
    fn name(&self) -> &'static str {
        "window"
    }

    fn detect(&self, candles: &CandleSeries) -> PivotSet {
        let raw = self.find_raw(candles);
        let raw_count = raw.len();
        let kept = self.filter_noise(raw);
        tracing::trace!(
            "[PIVOTS] window={} raw={} kept={}",
            self.window,
            raw_count,
            kept.len()
        );
        PivotSet::from_sequence(&kept)
    }
}

/// Reversal scan shared by the ZigZag and ATR detectors. `reversal(i, extreme)`
/// is the absolute move needed at bar `i` to confirm `extreme` as a pivot.
fn reversal_scan<F>(candles: &CandleSeries, reversal: F) -> PivotSet
where
    F: Fn(usize, f64) -> f64,
{
    let len = candles.len();
    let mut pivots = Vec::new();
    if len < 2 {
        return PivotSet::default();
    }

    // Until the first reversal, track both extremes
    let mut hi = (0usize, candles[0].high);
    let mut lo = (0usize, candles[0].low);
    let mut state: Option<(PivotKind, usize, f64)> = None;
    let mut start = len;

    for i in 1..len {
        if candles[i].high > hi.1 {
            hi = (i, candles[i].high);
        }
        if candles[i].low < lo.1 {
            lo = (i, candles[i].low);
        }
        if lo.0 < hi.0 && hi.1 - lo.1 >= reversal(i, lo.1) {
            pivots.push(PivotPoint::low(candles, lo.0));
            state = Some((PivotKind::High, hi.0, hi.1));
            start = i + 1;
            break;
        }
        if hi.0 < lo.0 && hi.1 - lo.1 >= reversal(i, hi.1) {
            pivots.push(PivotPoint::high(candles, hi.0));
            state = Some((PivotKind::Low, lo.0, lo.1));
            start = i + 1;
            break;
        }
    }

    let Some((mut tracking, mut cand_idx, mut cand_price)) = state else {
        return PivotSet::default();
    };

    for i in start..len {
        let c = &candles[i];
        match tracking {
            PivotKind::High => {
                if c.high > cand_price {
                    cand_idx = i;
                    cand_price = c.high;
                } else if cand_price - c.low >= reversal(i, cand_price) {
                    pivots.push(PivotPoint::high(candles, cand_idx));
                    tracking = PivotKind::Low;
                    cand_idx = i;
                    cand_price = c.low;
                }
            }
            PivotKind::Low => {
                if c.low < cand_price {
                    cand_idx = i;
                    cand_price = c.low;
                } else if c.high - cand_price >= reversal(i, cand_price) {
                    pivots.push(PivotPoint::low(candles, cand_idx));
                    tracking = PivotKind::High;
                    cand_idx = i;
                    cand_price = c.high;
                }
            }
        }
    }

    PivotSet::from_sequence(&pivots)
}

pub struct ZigZagDetector {
    pub threshold_pct: f64,
}

impl ZigZagDetector {
    pub fn new(threshold_pct: f64) -> Self {
        Self { threshold_pct }
    }
}

impl PivotDetector for ZigZagDetector {
    fn name(&self) -> &'static str {
        "zigzag"
    }

    fn detect(&self, candles: &CandleSeries) -> PivotSet {
        let pct = self.threshold_pct / 100.0;
        let set = reversal_scan(candles, |_, extreme| extreme.abs() * pct);
        tracing::trace!(
            "[PIVOTS] zigzag {}% -> {} pivots",
            self.threshold_pct,
            set.len()
        );
        set
    }
}

pub struct AdaptiveDetector {
    pub atr_period: usize,
    pub atr_multiplier: f64,
}

impl AdaptiveDetector {
    pub fn new(atr_period: usize, atr_multiplier: f64) -> Self {
        Self {
            atr_period: atr_period.max(1),
            atr_multiplier,
        }
    }
}

impl PivotDetector for AdaptiveDetector {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn detect(&self, candles: &CandleSeries) -> PivotSet {
        let atr = atr_series(candles, self.atr_period);
        let k = self.atr_multiplier;
        // A zero ATR would confirm every tick; require some movement
        let set = reversal_scan(candles, |i, _| (k * atr[i]).max(f64::EPSILON));
        tracing::trace!(
            "[PIVOTS] adaptive atr({})x{} -> {} pivots",
            self.atr_period,
            self.atr_multiplier,
            set.len()
        );
        set
    }
}
