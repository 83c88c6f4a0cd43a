//! Chart data computed over a page of toys
//!
//! Each series is a pair of parallel lists. Labels appear in the order they
//! are first met while scanning the toys, and both series built from the
//! label tallies share that order.

use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;

use crate::model::Toy;

const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];

/// Parallel label/value lists, as consumed by the front-end charts
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartsData {
    pub prices_by_label: Series,
    pub inventory_by_label: Series,
    /// Placeholder numbers; there are no sales records behind them
    pub monthly_sales: Series,
}

/// Running totals for one label
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LabelTally {
    /// Toys carrying the label
    pub count: u32,
    pub in_stock: u32,
    /// Full price of every toy carrying the label (prices are not split across labels)
    pub price_total: f64,
}

/// Tallies every label in first-seen order
///
/// A label repeated on the same toy is counted once for that toy.
pub fn label_tallies(toys: &[Toy]) -> IndexMap<String, LabelTally> {
    let mut tallies: IndexMap<String, LabelTally> = IndexMap::new();
    for toy in toys {
        for (idx, label) in toy.labels.iter().enumerate() {
            if toy.labels[..idx].contains(label) {
                continue;
            }
            let tally = tallies.entry(label.clone()).or_default();
            tally.count += 1;
            tally.price_total += toy.price;
            if toy.in_stock {
                tally.in_stock += 1;
            }
        }
    }
    tallies
}

/// Mean price per label, rounded to the nearest integer
pub fn average_price_by_label(tallies: &IndexMap<String, LabelTally>) -> Series {
    series(tallies, |tally| {
        (tally.price_total / f64::from(tally.count)).round() as i64
    })
}

/// Percentage of toys per label that are in stock, rounded
pub fn stock_ratio_by_label(tallies: &IndexMap<String, LabelTally>) -> Series {
    series(tallies, |tally| {
        (f64::from(tally.in_stock) * 100.0 / f64::from(tally.count)).round() as i64
    })
}

/// Six months of made-up sales figures in `[30, 80)`
///
/// Demo data for the dashboard; it is random on every call.
pub fn monthly_sales<R: Rng>(rng: &mut R) -> Series {
    Series {
        labels: MONTHS.iter().map(|m| m.to_string()).collect(),
        data: MONTHS.iter().map(|_| rng.random_range(30..80)).collect(),
    }
}

pub fn charts_data(toys: &[Toy]) -> ChartsData {
    let tallies = label_tallies(toys);
    ChartsData {
        prices_by_label: average_price_by_label(&tallies),
        inventory_by_label: stock_ratio_by_label(&tallies),
        monthly_sales: monthly_sales(&mut rand::rng()),
    }
}

fn series(tallies: &IndexMap<String, LabelTally>, value: impl Fn(&LabelTally) -> i64) -> Series {
    Series {
        labels: tallies.keys().cloned().collect(),
        data: tallies.values().map(value).collect(),
    }
}
