//! Run configuration handed to the engine initializer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriverBehavior {
    #[default]
    Eco,
    Intermediate,
    Crazy,
    VeryCrazy,
    Soigneux,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StationStrategy {
    #[default]
    NoSort,
    EntryTimeAsc,
    DelayAsc,
    DelayAscWithThreshold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub driver_behavior: DriverBehavior,
    pub station_strategy: StationStrategy,
}

impl RunConfig {
    pub fn new(driver_behavior: DriverBehavior, station_strategy: StationStrategy) -> Self {
        Self {
            driver_behavior,
            station_strategy,
        }
    }
}

impl std::fmt::Display for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.driver_behavior, self.station_strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wire_names_match_strum_names() {
        for behavior in DriverBehavior::iter() {
            let json = serde_json::to_string(&behavior).unwrap();
            assert_eq!(json, format!("\"{}\"", behavior));
            assert_eq!(DriverBehavior::from_str(&behavior.to_string()).unwrap(), behavior);
        }
        for strategy in StationStrategy::iter() {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy));
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(DriverBehavior::from_str("very_crazy").unwrap(), DriverBehavior::VeryCrazy);
        assert_eq!(
            StationStrategy::from_str("delay_asc_with_threshold").unwrap(),
            StationStrategy::DelayAscWithThreshold
        );
        assert!(DriverBehavior::from_str("reckless").is_err());
    }

    #[test]
    fn test_run_config_display() {
        assert_eq!(RunConfig::default().to_string(), "eco/no_sort");
    }
}
