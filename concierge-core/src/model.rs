use serde::{Deserialize, Serialize};

/// Status value reported by every successful tool call.
pub const STATUS_SUCCESS: &str = "success";

/// Current conditions for a single location, as returned by `get_weather`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub name: String,
    pub country: String,
    /// Local time at the location, verbatim from the provider (e.g. "2025-08-20 14:05").
    pub localtime: String,
    pub temp_c: f64,
    pub condition: String,
    pub wind_kph: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub status: String,
    pub converted: f64,
    pub rate: f64,
}

impl ConversionResult {
    pub fn new(amount: f64, rate: f64) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            converted: amount * rate,
            rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitSuggestion {
    pub status: String,
    pub suggestion: String,
}

/// The four clothing bands, ordered from coldest to warmest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutfitCategory {
    WinterWear,
    LightJacket,
    LongSleeves,
    ShortSleeves,
}

impl OutfitCategory {
    /// Band lookup: `< 10`, `< 18`, `< 24`, otherwise warm.
    ///
    /// Boundary values fall into the warmer band. NaN compares false
    /// everywhere and therefore lands in the warmest band.
    pub fn for_temperature(temp_c: f64) -> Self {
        if temp_c < 10.0 {
            OutfitCategory::WinterWear
        } else if temp_c < 18.0 {
            OutfitCategory::LightJacket
        } else if temp_c < 24.0 {
            OutfitCategory::LongSleeves
        } else {
            OutfitCategory::ShortSleeves
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutfitCategory::WinterWear => "Coat and winter gear",
            OutfitCategory::LightJacket => "Light jacket",
            OutfitCategory::LongSleeves => "Long-sleeved shirt",
            OutfitCategory::ShortSleeves => "Short sleeves and light clothing",
        }
    }

    pub const fn all() -> &'static [OutfitCategory] {
        &[
            OutfitCategory::WinterWear,
            OutfitCategory::LightJacket,
            OutfitCategory::LongSleeves,
            OutfitCategory::ShortSleeves,
        ]
    }
}

impl std::fmt::Display for OutfitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OutfitCategory> for OutfitSuggestion {
    fn from(category: OutfitCategory) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            suggestion: category.as_str().to_string(),
        }
    }
}
