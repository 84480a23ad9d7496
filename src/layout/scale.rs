//! Scales mapping data values to pixel positions.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Continuous domain to continuous range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn scale(&self, value: f64) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        // Halved so domains spanning most of f64 do not overflow.
        let half_span = d1 / 2.0 - d0 / 2.0;
        if !(half_span.abs() >= f64::EPSILON / 2.0) || !half_span.is_finite() {
            return (r0 + r1) / 2.0;
        }
        let t = (value / 2.0 - d0 / 2.0) / half_span;
        r0 + t as f32 * (r1 - r0)
    }

    pub fn invert(&self, px: f32) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if (r1 - r0).abs() < f32::EPSILON {
            return d0;
        }
        let t = ((px - r0) / (r1 - r0)) as f64;
        d0 * (1.0 - t) + d1 * t
    }

    /// Extends the domain outward to round tick-step multiples.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut start, mut stop) = self.domain;
        let reversed = stop < start;
        if reversed {
            std::mem::swap(&mut start, &mut stop);
        }
        if !start.is_finite() || !stop.is_finite() || stop <= start {
            return self;
        }
        let mut prestep: Option<f64> = None;
        for _ in 0..10 {
            let step = tick_increment(start, stop, count);
            if prestep == Some(step) {
                break;
            }
            let (next_start, next_stop) = if step > 0.0 {
                ((start / step).floor() * step, (stop / step).ceil() * step)
            } else if step < 0.0 {
                ((start * step).ceil() / step, (stop * step).floor() / step)
            } else {
                break;
            };
            if !next_start.is_finite() || !next_stop.is_finite() {
                break;
            }
            start = next_start;
            stop = next_stop;
            prestep = Some(step);
        }
        self.domain = if reversed { (stop, start) } else { (start, stop) };
        self
    }

    /// Round values inside the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (mut start, mut stop) = self.domain;
        if stop < start {
            std::mem::swap(&mut start, &mut stop);
        }
        if !start.is_finite() || !stop.is_finite() || count == 0 {
            return Vec::new();
        }
        if stop == start {
            return vec![start];
        }
        let step = tick_increment(start, stop, count);
        if step > 0.0 {
            let i0 = (start / step).ceil() as i64;
            let i1 = (stop / step).floor() as i64;
            (i0..=i1).map(|i| i as f64 * step).collect()
        } else if step < 0.0 {
            let inv = -step;
            let i0 = (start * inv).ceil() as i64;
            let i1 = (stop * inv).floor() as i64;
            (i0..=i1).map(|i| i as f64 / inv).collect()
        } else {
            Vec::new()
        }
    }
}

/// Positive: the step itself. Negative: `-1/step`, which keeps fractional
/// steps exact.
fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let step = stop / count - start / count;
    if step <= 0.0 || !step.is_finite() {
        return 0.0;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -10f64.powf(-power) / factor
    }
}

/// Formats a tick value without float noise (`0.30000000000000004`).
pub fn format_tick(value: f64) -> String {
    if value.abs() >= 1e15 {
        return format!("{value:e}");
    }
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        let text = format!("{:.6}", rounded);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Discrete domain split into evenly sized slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandScale {
    pub domain: Vec<String>,
    pub range: (f32, f32),
    pub step: f32,
    pub bandwidth: f32,
    start: f32,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl BandScale {
    /// Inner and outer padding are both `padding`; bands are centered.
    pub fn new(domain: Vec<String>, range: (f32, f32), padding: f32) -> Self {
        let padding = padding.clamp(0.0, 1.0);
        let n = domain.len() as f32;
        let (r0, r1) = range;
        let step = if domain.is_empty() {
            0.0
        } else {
            (r1 - r0) / (n - padding + 2.0 * padding).max(1.0)
        };
        let start = r0 + (r1 - r0 - step * (n - padding)) * 0.5;
        let bandwidth = step * (1.0 - padding);
        let index = domain
            .iter()
            .enumerate()
            .map(|(idx, key)| (key.clone(), idx))
            .collect();
        Self {
            domain,
            range,
            step,
            bandwidth,
            start,
            index,
        }
    }

    pub fn position(&self, key: &str) -> Option<f32> {
        self.index
            .get(key)
            .map(|idx| self.start + self.step * *idx as f32)
    }

    pub fn center(&self, key: &str) -> Option<f32> {
        self.position(key).map(|pos| pos + self.bandwidth / 2.0)
    }

    pub fn position_at(&self, idx: usize) -> f32 {
        self.start + self.step * idx as f32
    }
}

/// Distinct keys in first-seen order.
pub fn distinct_in_order<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for key in keys {
        if seen.insert(key) {
            out.push(key.to_string());
        }
    }
    out
}

/// Category to palette color, first-seen order, wrapping past the palette.
#[derive(Debug, Clone)]
pub struct OrdinalColors {
    palette: Vec<String>,
    assigned: Vec<(String, String)>,
}

impl OrdinalColors {
    pub fn new(palette: &[String]) -> Self {
        let palette = if palette.is_empty() {
            vec!["#888888".to_string()]
        } else {
            palette.to_vec()
        };
        Self {
            palette,
            assigned: Vec::new(),
        }
    }

    pub fn color(&mut self, key: &str) -> String {
        if let Some((_, color)) = self.assigned.iter().find(|(k, _)| k == key) {
            return color.clone();
        }
        let color = self.palette[self.assigned.len() % self.palette.len()].clone();
        self.assigned.push((key.to_string(), color.clone()));
        color
    }

    /// Every key seen so far with its color, in assignment order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.assigned
    }
}

/// Calendar-day time scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeScale {
    pub domain: (NaiveDate, NaiveDate),
    pub range: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickInterval {
    Days(i64),
    Weeks(i64),
    Months(u32),
    Years(i32),
}

impl TimeScale {
    pub fn new(domain: (NaiveDate, NaiveDate), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    fn linear(&self) -> LinearScale {
        LinearScale::new(
            (
                day_number(self.domain.0) as f64,
                day_number(self.domain.1) as f64,
            ),
            self.range,
        )
    }

    pub fn scale(&self, date: NaiveDate) -> f32 {
        let linear = self.linear();
        if self.domain.0 == self.domain.1 {
            return linear.range.0;
        }
        linear.scale(day_number(date) as f64)
    }

    pub fn span_days(&self) -> i64 {
        (self.domain.1 - self.domain.0).num_days()
    }

    /// Dates at a calendar-friendly interval with at most about `target` ticks.
    pub fn ticks(&self, target: usize) -> Vec<(NaiveDate, String)> {
        let (start, end) = self.domain;
        let span = self.span_days().max(1);
        let target = target.max(1) as i64;
        let candidates = [
            TickInterval::Days(1),
            TickInterval::Days(2),
            TickInterval::Weeks(1),
            TickInterval::Weeks(2),
            TickInterval::Months(1),
            TickInterval::Months(3),
            TickInterval::Months(6),
            TickInterval::Years(1),
        ];
        let interval = candidates
            .into_iter()
            .find(|interval| span / approx_days(*interval) <= target)
            .unwrap_or(TickInterval::Years(((span / 365) / target).max(1) as i32 + 1));

        let mut ticks = Vec::new();
        let mut current = first_tick(start, interval);
        while current <= end {
            ticks.push((current, format_tick_date(current, interval)));
            let Some(next) = advance(current, interval) else {
                break;
            };
            current = next;
        }
        ticks
    }
}

fn day_number(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}

fn approx_days(interval: TickInterval) -> i64 {
    match interval {
        TickInterval::Days(n) => n,
        TickInterval::Weeks(n) => n * 7,
        TickInterval::Months(n) => n as i64 * 30,
        TickInterval::Years(n) => n as i64 * 365,
    }
}

fn first_tick(start: NaiveDate, interval: TickInterval) -> NaiveDate {
    match interval {
        TickInterval::Days(_) => start,
        TickInterval::Weeks(_) => {
            let offset = (7 - start.weekday().num_days_from_sunday() as i64) % 7;
            start + Duration::days(offset)
        }
        TickInterval::Months(_) => {
            let first = start.with_day(1).unwrap_or(start);
            if first < start {
                first.checked_add_months(Months::new(1)).unwrap_or(start)
            } else {
                first
            }
        }
        TickInterval::Years(_) => {
            let first = NaiveDate::from_ymd_opt(start.year(), 1, 1).unwrap_or(start);
            if first < start {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).unwrap_or(start)
            } else {
                first
            }
        }
    }
}

fn advance(date: NaiveDate, interval: TickInterval) -> Option<NaiveDate> {
    match interval {
        TickInterval::Days(n) => date.checked_add_signed(Duration::days(n)),
        TickInterval::Weeks(n) => date.checked_add_signed(Duration::days(n * 7)),
        TickInterval::Months(n) => date.checked_add_months(Months::new(n)),
        TickInterval::Years(n) => NaiveDate::from_ymd_opt(date.year() + n, 1, 1),
    }
}

fn format_tick_date(date: NaiveDate, interval: TickInterval) -> String {
    match interval {
        TickInterval::Days(_) | TickInterval::Weeks(_) => date.format("%b %d").to_string(),
        TickInterval::Months(_) => date.format("%b %Y").to_string(),
        TickInterval::Years(_) => date.format("%Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_rounds_outward() {
        let scale = LinearScale::new((0.0, 30.0), (400.0, 0.0)).nice(10);
        assert_eq!(scale.domain, (0.0, 30.0));
        let scale = LinearScale::new((0.0, 97.3), (400.0, 0.0)).nice(10);
        assert_eq!(scale.domain, (0.0, 100.0));
        let scale = LinearScale::new((0.13, 0.87), (0.0, 1.0)).nice(10);
        assert!((scale.domain.0 - 0.1).abs() < 1e-12);
        assert!((scale.domain.1 - 0.9).abs() < 1e-12);
    }

    #[test]
    fn ticks_follow_round_steps() {
        let scale = LinearScale::new((0.0, 30.0), (0.0, 1.0));
        assert_eq!(
            scale.ticks(10),
            vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0, 26.0, 28.0, 30.0]
        );
        let fractional = LinearScale::new((0.0, 1.0), (0.0, 1.0)).ticks(5);
        assert_eq!(fractional, vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(format_tick(0.1 + 0.2), "0.3");
    }

    #[test]
    fn linear_scale_inverts() {
        let scale = LinearScale::new((0.0, 50.0), (300.0, 0.0));
        assert_eq!(scale.scale(25.0), 150.0);
        assert_eq!(scale.invert(150.0), 25.0);
    }

    #[test]
    fn extreme_domains_stay_finite() {
        let scale = LinearScale::new((-1e308, 1e308), (400.0, 0.0)).nice(5);
        assert!(scale.domain.0.is_finite() && scale.domain.1.is_finite());
        assert!(scale.domain.0 <= -1e308 && scale.domain.1 >= 1e308);
        let top = scale.scale(1e308);
        let bottom = scale.scale(-1e308);
        let zero = scale.scale(0.0);
        assert!(top.is_finite() && bottom.is_finite());
        assert!(top < zero && zero < bottom);
        let ticks = scale.ticks(5);
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|t| t.is_finite()));
        assert!(ticks.iter().all(|t| !format_tick(*t).contains("inf")));
    }

    #[test]
    fn huge_ticks_use_exponent_notation() {
        assert_eq!(format_tick(5e307), "5e307");
        assert_eq!(format_tick(-2e20), "-2e20");
        assert_eq!(format_tick(1500.0), "1500");
    }

    #[test]
    fn band_scale_matches_padding_semantics() {
        let band = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0), 0.2);
        // step = 100 / (2 - 0.2 + 0.4)
        assert!((band.step - 100.0 / 2.2).abs() < 1e-4);
        assert!((band.bandwidth - band.step * 0.8).abs() < 1e-4);
        let a = band.position("a").unwrap();
        let b = band.position("b").unwrap();
        assert!((a - band.step * 0.2).abs() < 1e-3);
        assert!((b - a - band.step).abs() < 1e-4);
        assert!(band.position("c").is_none());
    }

    #[test]
    fn ordinal_colors_wrap() {
        let palette = vec!["#1".to_string(), "#2".to_string()];
        let mut colors = OrdinalColors::new(&palette);
        assert_eq!(colors.color("x"), "#1");
        assert_eq!(colors.color("y"), "#2");
        assert_eq!(colors.color("x"), "#1");
        assert_eq!(colors.color("z"), "#1");
        assert_eq!(colors.entries().len(), 3);
    }

    #[test]
    fn time_scale_maps_domain_ends() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 24).unwrap();
        let scale = TimeScale::new((start, end), (100.0, 540.0));
        assert_eq!(scale.scale(start), 100.0);
        assert_eq!(scale.scale(end), 540.0);
        let ticks = scale.ticks(8);
        assert!(!ticks.is_empty() && ticks.len() <= 9);
        assert!(ticks.iter().all(|(d, _)| *d >= start && *d <= end));
    }

    #[test]
    fn distinct_keys_keep_first_seen_order() {
        let keys = distinct_in_order(["b", "a", "b", "c", "a"]);
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
