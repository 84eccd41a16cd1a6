//! Core value types shared by the prediction engine and the optimizer.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Shortest plausible commute; every produced minute value is floored here.
pub const MIN_TRAVEL_MINUTES: u32 = 15;

pub type RouteId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Weekend,
    Rainy,
}

impl DayType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::Weekend => "weekend",
            Self::Rainy => "rainy day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    Cloudy,
    Rainy,
    HeavyRain,
}

impl Weather {
    pub fn label(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::HeavyRain => "heavy rain",
        }
    }

    pub fn is_wet(self) -> bool {
        matches!(self, Self::Rainy | Self::HeavyRain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Regular,
    SchoolHoliday,
    PublicHoliday,
}

impl Season {
    pub fn label(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::SchoolHoliday => "school holiday",
            Self::PublicHoliday => "public holiday",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficDensity {
    Light,
    #[default]
    Moderate,
    Heavy,
    VeryHeavy,
}

/// Condition tuple a prediction is requested for.
///
/// An empty route id means "all routes"; operations that iterate the route
/// catalogue rebind it per route with [`Query::for_route`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Query {
    route_id: RouteId,
    hour: u8,
    day_type: DayType,
    weather: Weather,
    season: Season,
}

impl Query {
    pub fn new(
        route_id: impl Into<RouteId>,
        hour: u8,
        day_type: DayType,
        weather: Weather,
        season: Season,
    ) -> Result<Self, AppError> {
        if hour > 23 {
            return Err(AppError::InvalidQuery(format!("hour {hour} out of range 0-23")));
        }
        Ok(Self {
            route_id: route_id.into(),
            hour,
            day_type,
            weather,
            season,
        })
    }

    /// Same conditions, all routes.
    pub fn conditions(hour: u8, day_type: DayType, weather: Weather, season: Season) -> Result<Self, AppError> {
        Self::new(String::new(), hour, day_type, weather, season)
    }

    pub fn for_route(&self, route_id: impl Into<RouteId>) -> Self {
        Self {
            route_id: route_id.into(),
            ..self.clone()
        }
    }

    pub fn with_hour(&self, hour: u8) -> Result<Self, AppError> {
        Self::new(self.route_id.clone(), hour, self.day_type, self.weather, self.season)
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn day_type(&self) -> DayType {
        self.day_type
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn is_all_routes(&self) -> bool {
        self.route_id.is_empty()
    }

    /// Deterministic key over every query field.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{:?}|{}|{:?}|{:?}",
            self.route_id, self.day_type, self.hour, self.weather, self.season
        )
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at {:02}:00 ({}, {})",
            if self.route_id.is_empty() { "all routes" } else { &self.route_id },
            self.day_type.label(),
            self.hour,
            self.weather.label(),
            self.season.label()
        )
    }
}

/// One historical travel-time record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub route_id: RouteId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub travel_time_minutes: f64,
    pub distance_km: f64,
    pub hour: u8,
    /// 0 = Monday.
    pub day_of_week: u8,
    pub day_type: DayType,
    pub weather: Weather,
    pub season: Season,
    #[serde(default)]
    pub traffic_density: TrafficDensity,
    #[serde(default)]
    pub average_speed_kmh: f64,
}

impl Observation {
    /// Builds a record, deriving hour, weekday and average speed from the inputs.
    pub fn new(
        route_id: impl Into<RouteId>,
        timestamp: OffsetDateTime,
        travel_time_minutes: f64,
        distance_km: f64,
        day_type: DayType,
        weather: Weather,
        season: Season,
    ) -> Self {
        let average_speed_kmh = if travel_time_minutes > 0.0 && distance_km > 0.0 {
            distance_km / (travel_time_minutes / 60.0)
        } else {
            0.0
        };
        Self {
            route_id: route_id.into(),
            timestamp,
            travel_time_minutes,
            distance_km,
            hour: timestamp.hour(),
            day_of_week: timestamp.weekday().number_days_from_monday(),
            day_type,
            weather,
            season,
            traffic_density: TrafficDensity::default(),
            average_speed_kmh,
        }
    }

    pub fn with_density(mut self, traffic_density: TrafficDensity) -> Self {
        self.traffic_density = traffic_density;
        self
    }

    pub fn is_usable(&self) -> bool {
        self.travel_time_minutes.is_finite() && self.travel_time_minutes > 0.0
    }
}

/// Closed classification of a route, derived once from its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteCategory {
    Highway,
    Main,
    Minor,
    Scenic,
    Coastal,
}

impl RouteCategory {
    /// Categories implied by a route name and its free-text type label.
    ///
    /// A route may carry several categories ("scenic highway"); `Minor` is
    /// assigned only when none of highway, main or scenic apply. `Coastal`
    /// comes from the route name alone.
    pub fn classify(name: &str, route_type: &str) -> Vec<RouteCategory> {
        let label = route_type.to_lowercase();
        let name = name.to_lowercase();
        let mut categories = Vec::new();
        if label.contains("highway") {
            categories.push(Self::Highway);
        }
        if label.contains("main") {
            categories.push(Self::Main);
        }
        if label.contains("scenic") {
            categories.push(Self::Scenic);
        }
        if categories.is_empty() {
            categories.push(Self::Minor);
        }
        if name.contains("marine") {
            categories.push(Self::Coastal);
        }
        categories
    }
}

/// Static reference data for one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMeta {
    pub id: RouteId,
    pub distance_km: f64,
    pub typical_speed_kmh: f64,
    pub route_type: String,
    categories: Vec<RouteCategory>,
}

impl RouteMeta {
    pub fn new(
        id: impl Into<RouteId>,
        distance_km: f64,
        typical_speed_kmh: f64,
        route_type: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let route_type = route_type.into();
        let categories = RouteCategory::classify(&id, &route_type);
        Self {
            id,
            distance_km,
            typical_speed_kmh,
            route_type,
            categories,
        }
    }

    pub fn categories(&self) -> &[RouteCategory] {
        &self.categories
    }

    pub fn has(&self, category: RouteCategory) -> bool {
        self.categories.contains(&category)
    }

    /// Highway or main road.
    pub fn is_arterial(&self) -> bool {
        self.has(RouteCategory::Highway) || self.has(RouteCategory::Main)
    }

    /// Travel time at typical speed, if the metadata allows computing it.
    pub fn free_flow_minutes(&self) -> Option<f64> {
        (self.distance_km > 0.0 && self.typical_speed_kmh > 0.0)
            .then(|| self.distance_km / self.typical_speed_kmh * 60.0)
    }
}

/// Travel-time prediction for one route under one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub route_id: RouteId,
    pub minutes: u32,
    pub confidence: f64,
    pub factors: Vec<String>,
}

impl Estimate {
    /// Rounds `minutes`, floors it at [`MIN_TRAVEL_MINUTES`] and clamps the
    /// confidence to `[0, 1]`.
    pub fn new(route_id: impl Into<RouteId>, minutes: f64, confidence: f64, factors: Vec<String>) -> Self {
        Self {
            route_id: route_id.into(),
            minutes: floor_minutes(minutes),
            confidence: clamp_confidence(confidence),
            factors,
        }
    }
}

pub fn floor_minutes(minutes: f64) -> u32 {
    if !minutes.is_finite() {
        return MIN_TRAVEL_MINUTES;
    }
    let rounded = minutes.round();
    if rounded <= MIN_TRAVEL_MINUTES as f64 {
        MIN_TRAVEL_MINUTES
    } else if rounded >= u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
