//! Delivery option types and summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How fast a delivery option ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySpeed {
    Standard,
    Express,
    NextDay,
    SameDay,
}

impl DeliverySpeed {
    /// Stable string stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::NextDay => "next_day",
            Self::SameDay => "same_day",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "express" => Some(Self::Express),
            "next_day" => Some(Self::NextDay),
            "same_day" => Some(Self::SameDay),
            _ => None,
        }
    }

    /// Tie-break rank when two options cost the same.
    const fn rank(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::Express => 1,
            Self::NextDay => 2,
            Self::SameDay => 3,
        }
    }
}

/// A persisted delivery option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOption {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub speed: DeliverySpeed,
    /// Delivery cost in base currency; 0 means free shipping.
    pub price: f64,
    pub min_order_amount: Option<f64>,
    pub estimated_days_min: i64,
    pub estimated_days_max: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Condensed delivery information shown in product listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub has_free: bool,
    pub cheapest_price: f64,
    pub fastest_days_min: i64,
    pub fastest_days_max: i64,
    pub options_count: usize,
}

impl DeliverySummary {
    /// Summarize the active options, or `None` if there are none.
    pub fn from_options(options: &[DeliveryOption]) -> Option<Self> {
        let active: Vec<&DeliveryOption> = options.iter().filter(|o| o.is_active).collect();
        let cheapest = active
            .iter()
            .map(|o| o.price)
            .min_by(f64::total_cmp)?;
        let fastest_min = active.iter().map(|o| o.estimated_days_min).min()?;
        // Among options with the fastest minimum, report the tightest maximum.
        let fastest_max = active
            .iter()
            .filter(|o| o.estimated_days_min == fastest_min)
            .map(|o| o.estimated_days_max)
            .min()?;

        Some(Self {
            has_free: active.iter().any(|o| o.price == 0.0),
            cheapest_price: cheapest,
            fastest_days_min: fastest_min,
            fastest_days_max: fastest_max,
            options_count: active.len(),
        })
    }
}

/// Active options ordered cheapest first, ties broken by speed.
pub fn sort_for_display(options: Vec<DeliveryOption>) -> Vec<DeliveryOption> {
    let mut active: Vec<DeliveryOption> = options.into_iter().filter(|o| o.is_active).collect();
    active.sort_by(|a, b| {
        a.price
            .total_cmp(&b.price)
            .then_with(|| a.speed.rank().cmp(&b.speed.rank()))
    });
    active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: i64, speed: DeliverySpeed, price: f64, min: i64, max: i64) -> DeliveryOption {
        let now = Utc::now();
        DeliveryOption {
            id,
            name: format!("Option {id}"),
            description: "test".to_string(),
            speed,
            price,
            min_order_amount: None,
            estimated_days_min: min,
            estimated_days_max: max,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summary_none_without_active_options() {
        let mut inactive = option(1, DeliverySpeed::Standard, 0.0, 3, 5);
        inactive.is_active = false;
        assert_eq!(DeliverySummary::from_options(&[inactive]), None);
        assert_eq!(DeliverySummary::from_options(&[]), None);
    }

    #[test]
    fn test_summary_over_seeded_shape() {
        let options = vec![
            option(1, DeliverySpeed::Standard, 0.0, 3, 5),
            option(2, DeliverySpeed::Express, 9.99, 1, 2),
            option(3, DeliverySpeed::NextDay, 19.99, 1, 1),
        ];
        let summary = DeliverySummary::from_options(&options).unwrap();
        assert!(summary.has_free);
        assert!(summary.cheapest_price.abs() < f64::EPSILON);
        assert_eq!(summary.fastest_days_min, 1);
        assert_eq!(summary.fastest_days_max, 1);
        assert_eq!(summary.options_count, 3);
    }

    #[test]
    fn test_sort_for_display_breaks_ties_by_speed() {
        let options = vec![
            option(1, DeliverySpeed::SameDay, 5.0, 0, 0),
            option(2, DeliverySpeed::Express, 5.0, 1, 2),
            option(3, DeliverySpeed::Standard, 0.0, 3, 5),
        ];
        let ids: Vec<i64> = sort_for_display(options).iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_speed_round_trips_through_storage_string() {
        for speed in [
            DeliverySpeed::Standard,
            DeliverySpeed::Express,
            DeliverySpeed::NextDay,
            DeliverySpeed::SameDay,
        ] {
            assert_eq!(DeliverySpeed::parse(speed.as_str()), Some(speed));
        }
        assert_eq!(
            serde_json::to_string(&DeliverySpeed::NextDay).unwrap(),
            "\"next_day\""
        );
    }
}
