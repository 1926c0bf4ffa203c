//! Battle weather
//!
//! Weather has no effect on its own; it indexes the per-skill percent
//! tables read by [`crate::battle::combat::CombatCalculator::skill_damage`].

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Current weather over the whole battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Sunny,
    Cloudy,
    Windy,
    Rainy,
    Hail,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Sunny,
        Weather::Cloudy,
        Weather::Windy,
        Weather::Rainy,
        Weather::Hail,
    ];

    /// Draw weight in percent
    pub fn weight(&self) -> u32 {
        match self {
            Self::Sunny => 40,
            Self::Cloudy => 25,
            Self::Windy => 15,
            Self::Rainy => 15,
            Self::Hail => 5,
        }
    }
}

/// Weighted draw over all weather kinds
pub fn random_weather<R: Rng + ?Sized>(rng: &mut R) -> Weather {
    let total: u32 = Weather::ALL.iter().map(|w| w.weight()).sum();
    let roll = rng.gen_range(0..total);

    let mut cumulative = 0;
    for weather in Weather::ALL {
        cumulative += weather.weight();
        if roll < cumulative {
            return weather;
        }
    }
    Weather::Sunny
}

/// With probability `chance`, redraw the weather (possibly the same value)
pub fn change_weather<R: Rng + ?Sized>(current: Weather, chance: f64, rng: &mut R) -> Weather {
    if rng.gen_bool(chance.clamp(0.0, 1.0)) {
        random_weather(rng)
    } else {
        current
    }
}
