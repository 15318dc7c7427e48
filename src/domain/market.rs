//! Price history analysis: rolling averages, weekday patterns and
//! buy/sell-now signals over hourly auction snapshots.

use std::collections::HashMap;

use time::{Duration, PrimitiveDateTime, Weekday};

use super::crafting::MarketPriceLookup;
use super::entities::{Item, ItemId, PriceSnapshot, PriceWindow};

const WEEK: Duration = Duration::days(7);
const SIGNAL_LOOKBACK: Duration = Duration::days(3);
const MIN_WEEKDAY_SAMPLES: usize = 3;

/// Default percentage swing that counts as a buy or sell opportunity.
pub const DEFAULT_OPPORTUNITY_THRESHOLD_PCT: f64 = 5.0;

/// Snapshots for every tracked item, each series sorted by timestamp.
#[derive(Clone, Debug, Default)]
pub struct PriceHistory {
    series: HashMap<ItemId, Vec<PriceSnapshot>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_id: ItemId, mut snapshots: Vec<PriceSnapshot>) {
        snapshots.sort_by_key(|snapshot| snapshot.timestamp);
        self.series.insert(item_id, snapshots);
    }

    pub fn snapshots(&self, item_id: ItemId) -> &[PriceSnapshot] {
        self.series.get(&item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_count(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Average price of the most recent snapshot.
    pub fn current_price(&self, item_id: ItemId) -> Option<f64> {
        self.snapshots(item_id).last().map(|s| s.avg_price)
    }

    /// Mean average price over the trailing 7 days of the series.
    pub fn seven_day_average(&self, item_id: ItemId) -> Option<f64> {
        let points = self.snapshots(item_id);
        let latest = points.last()?.timestamp;
        mean(trailing(points, latest - WEEK).map(|s| s.avg_price))
    }

    pub fn price(&self, item_id: ItemId, window: PriceWindow) -> Option<f64> {
        match window {
            PriceWindow::Current => self.current_price(item_id),
            PriceWindow::SevenDayAverage => self.seven_day_average(item_id),
        }
    }
}

impl MarketPriceLookup for PriceHistory {
    fn market_price(&self, item_id: ItemId, window: PriceWindow) -> Option<f64> {
        self.price(item_id, window)
    }
}

fn trailing(
    points: &[PriceSnapshot],
    cutoff: PrimitiveDateTime,
) -> impl Iterator<Item = &PriceSnapshot> {
    points.iter().filter(move |s| s.timestamp >= cutoff)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeekdayPattern {
    pub best_buy_day: Weekday,
    pub best_buy_price: f64,
    pub best_sell_day: Weekday,
    pub best_sell_price: f64,
    /// Gain from buying on the cheapest weekday and selling on the priciest.
    pub flip_profit_pct: f64,
}

impl WeekdayPattern {
    pub fn gold_spread(&self) -> f64 {
        self.best_sell_price - self.best_buy_price
    }
}

/// Mean price per weekday, ignoring weekdays with too few samples.
pub fn weekday_patterns(points: &[PriceSnapshot]) -> Option<WeekdayPattern> {
    let mut buckets: HashMap<Weekday, (f64, usize)> = HashMap::new();
    for point in points {
        let entry = buckets.entry(point.timestamp.weekday()).or_insert((0.0, 0));
        entry.0 += point.avg_price;
        entry.1 += 1;
    }

    let mut days: Vec<(Weekday, f64)> = buckets
        .into_iter()
        .filter(|(_, (_, count))| *count >= MIN_WEEKDAY_SAMPLES)
        .map(|(day, (sum, count))| (day, sum / count as f64))
        .collect();
    if days.is_empty() {
        return None;
    }
    // Stable order so equal means resolve the same way on every run.
    days.sort_by_key(|(day, _)| day.number_days_from_monday());

    let (best_buy_day, best_buy_price) = days
        .iter()
        .copied()
        .reduce(|best, day| if day.1 < best.1 { day } else { best })?;
    let (best_sell_day, best_sell_price) = days
        .iter()
        .copied()
        .reduce(|best, day| if day.1 > best.1 { day } else { best })?;

    Some(WeekdayPattern {
        best_buy_day,
        best_buy_price,
        best_sell_day,
        best_sell_price,
        flip_profit_pct: pct_change(best_buy_price, best_sell_price),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub item_name: String,
    pub avg_30d: f64,
    pub avg_7d: f64,
    /// 7-day mean relative to the full-period mean, in percent.
    pub trend_pct: f64,
    pub patterns: Option<WeekdayPattern>,
}

pub fn item_summary(history: &PriceHistory, item: &Item) -> Option<ItemSummary> {
    let points = history.snapshots(item.id);
    let avg_30d = mean(points.iter().map(|s| s.avg_price))?;
    let avg_7d = history.seven_day_average(item.id)?;

    Some(ItemSummary {
        item_id: item.id,
        item_name: item.name.clone(),
        avg_30d,
        avg_7d,
        trend_pct: if avg_7d == 0.0 { 0.0 } else { pct_change(avg_30d, avg_7d) },
        patterns: weekday_patterns(points),
    })
}

/// Latest price compared against the preceding three days.
#[derive(Clone, Debug, PartialEq)]
pub struct BuySellSignal {
    pub item_id: ItemId,
    pub item_name: String,
    pub current_price: f64,
    pub avg_3d: f64,
    /// Negative when the item is cheaper now than its recent average.
    pub pct_diff: f64,
    pub price_diff: f64,
    pub last_updated: PrimitiveDateTime,
}

pub fn buy_sell_signal(history: &PriceHistory, item: &Item) -> Option<BuySellSignal> {
    let points = history.snapshots(item.id);
    let latest = points.last()?;
    let cutoff = latest.timestamp - SIGNAL_LOOKBACK;
    let avg_3d = mean(
        points
            .iter()
            .filter(|s| s.timestamp >= cutoff && s.timestamp < latest.timestamp)
            .map(|s| s.avg_price),
    )?;

    Some(BuySellSignal {
        item_id: item.id,
        item_name: item.name.clone(),
        current_price: latest.avg_price,
        avg_3d,
        pct_diff: pct_change(avg_3d, latest.avg_price),
        price_diff: latest.avg_price - avg_3d,
        last_updated: latest.timestamp,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketOpportunities {
    pub buy: Vec<BuySellSignal>,
    pub sell: Vec<BuySellSignal>,
}

/// Splits items into buy-now and sell-now lists, largest gold swing first.
pub fn market_opportunities(
    history: &PriceHistory,
    items: &[Item],
    threshold_pct: f64,
) -> MarketOpportunities {
    let mut opportunities = MarketOpportunities::default();
    for signal in items.iter().filter_map(|item| buy_sell_signal(history, item)) {
        if signal.pct_diff < -threshold_pct {
            opportunities.buy.push(signal);
        } else if signal.pct_diff > threshold_pct {
            opportunities.sell.push(signal);
        }
    }

    opportunities.buy.sort_by(|a, b| {
        b.price_diff
            .abs()
            .partial_cmp(&a.price_diff.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    opportunities.sell.sort_by(|a, b| {
        b.price_diff
            .partial_cmp(&a.price_diff)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    opportunities
}
