/*
Synthetic value history for the portfolio chart. There is no stored history, so each day
is the current total scaled by a random factor in [0.9, 1.1).
*/

use rand::Rng;
use serde::Serialize;

pub const HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub day: u32,
    pub value: f64,
}

pub fn generate_history<R: Rng + ?Sized>(total_value: f64, days: u32, rng: &mut R) -> Vec<HistoryPoint> {
    (1..=days)
        .map(|day| {
            let value = if total_value == 0.0 {
                0.0
            } else {
                total_value * rng.random_range(0.9..1.1)
            };

            HistoryPoint { day, value }
        })
        .collect()
}
