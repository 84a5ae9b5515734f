pub mod deliveries;
pub mod locations;
pub mod orders;
pub mod payments;
pub mod pricing;

pub use pricing::MONEY_DP;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entities::delivery_location::{self, ExternalChannel};
use crate::entities::order;
use crate::errors::ServiceError;

/// Ghanaian phone numbers: `+233XXXXXXXXX` or `0XXXXXXXXX`.
pub static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+233|0)\d{9}$").expect("phone regex is valid"));

/// Loads the delivery location an order references, if any. The reference
/// may dangle only transiently (deletion clears it), so a missing row is
/// simply `None`.
pub(crate) async fn order_location<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
) -> Result<Option<delivery_location::Model>, ServiceError> {
    match order.delivery_location_id {
        Some(location_id) => Ok(delivery_location::Entity::find_by_id(location_id)
            .one(conn)
            .await?),
        None => Ok(None),
    }
}

/// The order's delivery-location name as a customer would read it: the
/// historical snapshot first (it survives catalog changes), then the live
/// catalog row, then the custom location.
pub fn effective_location_name(
    order: &order::Model,
    location: Option<&delivery_location::Model>,
) -> Option<String> {
    order
        .delivery_location_name
        .clone()
        .or_else(|| location.map(|l| l.name.clone()))
        .or_else(|| order.custom_delivery_location.clone())
}

/// Whether the order belongs to an externally pre-settled partner channel.
pub(crate) fn external_channel(
    order: &order::Model,
    location: Option<&delivery_location::Model>,
) -> Option<ExternalChannel> {
    effective_location_name(order, location)
        .as_deref()
        .and_then(ExternalChannel::from_location_name)
}

/// Human-readable elapsed time since `from`, for order listings.
pub fn time_ago(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(from);
    let seconds = elapsed.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = elapsed.num_minutes();
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, if minutes == 1 { "" } else { "s" });
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" });
    }
    let days = elapsed.num_days();
    format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn phone_regex_accepts_local_and_international() {
        assert!(PHONE_REGEX.is_match("+233244123456"));
        assert!(PHONE_REGEX.is_match("0244123456"));
        assert!(!PHONE_REGEX.is_match("244123456"));
        assert!(!PHONE_REGEX.is_match("+23324412345"));
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(time_ago(now - Duration::days(3), now), "3 days ago");
    }
}
