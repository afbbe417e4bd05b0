// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use serde::Serialize;

pub const KG_PER_TONNE: f64 = 1000.0;

/// Flock-size rule of thumb: 10,000 laying hens eat one tonne of feed a day.
pub const HENS_PER_DAILY_TONNE: f64 = 10_000.0;

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn estimated_hens(feed_tonnes: f64, days: u32) -> f64 {
    if feed_tonnes <= 0.0 || days == 0 {
        return 0.0;
    }
    (feed_tonnes / days as f64) * HENS_PER_DAILY_TONNE
}

pub fn egg_lay_percentage(total_eggs: f64, days: u32, hens: f64) -> f64 {
    if hens <= 0.0 || days == 0 {
        return 0.0;
    }
    let daily_eggs = total_eggs / days as f64;
    (daily_eggs / hens) * 100.0
}

/// Inputs of the net-profit formula shared by every report:
///
/// `(egg_sales + discounts) - (feed + medicine + labor + other + tds)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProfitComponents {
    pub egg_sales: f64,
    pub discounts: f64,
    pub feed: f64,
    pub medicine: f64,
    pub labor: f64,
    pub other: f64,
    pub tds: f64,
}

impl ProfitComponents {
    pub fn total_sales(&self) -> f64 {
        self.egg_sales + self.discounts
    }

    pub fn total_expense(&self) -> f64 {
        self.feed + self.medicine + self.labor + self.other + self.tds
    }

    pub fn net_profit(&self) -> f64 {
        self.total_sales() - self.total_expense()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub days_in_month: u32,
    pub feed_purchased_tonnes: f64,
    pub estimated_hens: f64,
    pub egg_lay_percentage: f64,
}

impl DerivedMetrics {
    pub fn for_month(year: i32, month: u32, feed_purchased_kg: f64, total_eggs_sold: f64) -> Self {
        let days = days_in_month(year, month);
        let tonnes = feed_purchased_kg / KG_PER_TONNE;
        let hens = estimated_hens(tonnes, days);
        DerivedMetrics {
            days_in_month: days,
            feed_purchased_tonnes: tonnes,
            estimated_hens: hens,
            egg_lay_percentage: egg_lay_percentage(total_eggs_sold, days, hens),
        }
    }
}
