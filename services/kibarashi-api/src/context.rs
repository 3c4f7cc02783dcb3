//! Seasonal/weather context endpoint
//!
//! Computes a calendar-driven payload from the current local time: season,
//! the month's seasonal events, nearby holidays, special periods, and a
//! pseudo-weather block derived from season, hour and a per-region
//! temperature profile. The weather is flavor for the suggestion UI, not a
//! forecast — no external weather service is consulted.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, Local, Timelike};
use rand::RngExt;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl WeatherCondition {
    fn description_ja(self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "晴れ",
            WeatherCondition::Cloudy => "曇り",
            WeatherCondition::Rainy => "雨",
            WeatherCondition::Snowy => "雪",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "01d",
            WeatherCondition::Cloudy => "03d",
            WeatherCondition::Rainy => "10d",
            WeatherCondition::Snowy => "13d",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub temperature: i32,
    pub condition: WeatherCondition,
    pub description: &'static str,
    pub humidity: u32,
    pub location: String,
    pub icon: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalData {
    pub season: Season,
    pub month: u32,
    pub seasonal_events: Vec<&'static str>,
    pub holidays: Vec<&'static str>,
    pub special_periods: Vec<&'static str>,
    pub seasonal_tips: Vec<&'static str>,
}

/// Regional temperature profile. The adjustment shifts the seasonal base
/// temperature; snow-prone regions render winter precipitation as snow.
struct RegionProfile {
    key: &'static str,
    name_ja: &'static str,
    winter_adjust: i32,
    spring_adjust: i32,
    summer_adjust: i32,
    autumn_adjust: i32,
    snow_prone: bool,
}

const REGIONS: &[RegionProfile] = &[
    RegionProfile {
        key: "Hokkaido",
        name_ja: "北海道",
        winter_adjust: -15,
        spring_adjust: -5,
        summer_adjust: 3,
        autumn_adjust: -8,
        snow_prone: true,
    },
    RegionProfile {
        key: "Sendai",
        name_ja: "宮城県",
        winter_adjust: -8,
        spring_adjust: -2,
        summer_adjust: 5,
        autumn_adjust: -4,
        snow_prone: true,
    },
    RegionProfile {
        key: "Tokyo",
        name_ja: "東京都",
        winter_adjust: 0,
        spring_adjust: 0,
        summer_adjust: 0,
        autumn_adjust: 0,
        snow_prone: false,
    },
    RegionProfile {
        key: "Nagoya",
        name_ja: "愛知県",
        winter_adjust: -1,
        spring_adjust: 0,
        summer_adjust: 2,
        autumn_adjust: 0,
        snow_prone: false,
    },
    RegionProfile {
        key: "Osaka",
        name_ja: "大阪府",
        winter_adjust: 0,
        spring_adjust: 1,
        summer_adjust: 2,
        autumn_adjust: 0,
        snow_prone: false,
    },
    RegionProfile {
        key: "Hiroshima",
        name_ja: "広島県",
        winter_adjust: 0,
        spring_adjust: 0,
        summer_adjust: 1,
        autumn_adjust: 0,
        snow_prone: false,
    },
    RegionProfile {
        key: "Fukuoka",
        name_ja: "福岡県",
        winter_adjust: 1,
        spring_adjust: 1,
        summer_adjust: 2,
        autumn_adjust: 1,
        snow_prone: false,
    },
    RegionProfile {
        key: "Okinawa",
        name_ja: "沖縄県",
        winter_adjust: 10,
        spring_adjust: 5,
        summer_adjust: 3,
        autumn_adjust: 6,
        snow_prone: false,
    },
];

fn region_for(location: &str) -> &'static RegionProfile {
    REGIONS
        .iter()
        .find(|r| r.key.eq_ignore_ascii_case(location))
        .unwrap_or_else(|| {
            REGIONS
                .iter()
                .find(|r| r.key == "Tokyo")
                .expect("Tokyo profile exists")
        })
}

pub fn season_for_month(month: u32) -> Season {
    match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Autumn,
        _ => Season::Winter,
    }
}

fn seasonal_events(month: u32) -> Vec<&'static str> {
    match month {
        1 => vec!["正月・新年", "成人の日"],
        2 => vec!["節分", "バレンタイン"],
        3 => vec!["桜の開花時期", "春分の日"],
        4 => vec!["新学期・新年度", "お花見シーズン"],
        5 => vec!["ゴールデンウィーク", "こどもの日"],
        6 => vec!["梅雨入り", "ジューンブライド"],
        7 => vec!["七夕・夏祭り", "海の日"],
        8 => vec!["夏休み・お盆", "花火大会"],
        9 => vec!["紅葉の始まり", "敬老の日"],
        10 => vec!["紅葉シーズン", "ハロウィン"],
        11 => vec!["秋の味覚", "文化の日"],
        12 => vec!["年末・クリスマス", "忘年会シーズン"],
        _ => vec![],
    }
}

/// Fixed-date holidays announced within a ±2 day window.
const HOLIDAYS: &[(u32, u32, &str)] = &[
    (1, 1, "元日"),
    (2, 11, "建国記念の日"),
    (2, 23, "天皇誕生日"),
    (4, 29, "昭和の日"),
    (5, 3, "憲法記念日"),
    (5, 4, "みどりの日"),
    (5, 5, "こどもの日"),
    (11, 3, "文化の日"),
    (11, 23, "勤労感謝の日"),
    (12, 25, "クリスマス"),
];

fn holidays_near(month: u32, day: u32) -> Vec<&'static str> {
    HOLIDAYS
        .iter()
        .filter(|(m, d, _)| *m == month && day.abs_diff(*d) <= 2)
        .map(|(_, _, name)| *name)
        .collect()
}

fn special_periods(month: u32, day: u32) -> Vec<&'static str> {
    let mut periods = Vec::new();

    if (month == 12 && day >= 29) || (month == 1 && day <= 3) {
        periods.push("年末年始");
    }
    if (month == 4 && day >= 29) || (month == 5 && day <= 5) {
        periods.push("ゴールデンウィーク");
    }
    if month == 8 && (13..=16).contains(&day) {
        periods.push("お盆");
    }

    periods
}

fn seasonal_tips(season: Season) -> Vec<&'static str> {
    match season {
        Season::Spring => vec![
            "🌸 桜や花の写真を撮る",
            "🌿 新緑を感じながら深呼吸",
            "📚 新しいことを始める季節",
        ],
        Season::Summer => vec![
            "🌊 涼しい音楽を聴く",
            "🍧 冷たい飲み物でリフレッシュ",
            "🌟 夏の思い出を振り返る",
        ],
        Season::Autumn => vec![
            "🍂 紅葉の写真を見る",
            "📖 読書でのんびり過ごす",
            "🍁 秋の味覚を楽しむ",
        ],
        Season::Winter => vec![
            "❄️ 雪景色や冬の風景を楽しむ",
            "☕ 温かい飲み物で暖まる",
            "🧦 暖かい場所でくつろぐ",
        ],
    }
}

fn seasonal_base_temperature(season: Season) -> i32 {
    match season {
        Season::Spring => 18,
        Season::Summer => 28,
        Season::Autumn => 15,
        Season::Winter => 8,
    }
}

fn weather_for(hour: u32, season: Season, region: &RegionProfile) -> WeatherData {
    let mut rng = rand::rng();

    let mut condition = match (season, hour) {
        // Summer daytime skews sunny
        (Season::Summer, 6..=18) => {
            if rng.random_range(0..10) > 3 {
                WeatherCondition::Sunny
            } else {
                WeatherCondition::Cloudy
            }
        }
        // Winter early/late hours alternate between clear and overcast
        (Season::Winter, h) if !(7..=17).contains(&h) => {
            if rng.random_range(0..10) >= 5 {
                WeatherCondition::Cloudy
            } else {
                WeatherCondition::Sunny
            }
        }
        _ => [
            WeatherCondition::Sunny,
            WeatherCondition::Cloudy,
            WeatherCondition::Rainy,
        ][(hour % 3) as usize],
    };

    if condition == WeatherCondition::Rainy && season == Season::Winter && region.snow_prone {
        condition = WeatherCondition::Snowy;
    }

    let adjust = match season {
        Season::Spring => region.spring_adjust,
        Season::Summer => region.summer_adjust,
        Season::Autumn => region.autumn_adjust,
        Season::Winter => region.winter_adjust,
    };

    WeatherData {
        temperature: seasonal_base_temperature(season) + adjust + rng.random_range(-3..=3),
        condition,
        description: condition.description_ja(),
        humidity: rng.random_range(50..=80),
        location: region.name_ja.to_string(),
        icon: condition.icon(),
    }
}

/// GET /api/v1/context
pub async fn handle(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let location = params
        .get("location")
        .map(String::as_str)
        .filter(|l| !l.is_empty())
        .unwrap_or("Tokyo");

    let now = Local::now();
    let month = now.month();
    let day = now.day();
    let hour = now.hour();
    let season = season_for_month(month);

    let seasonal = SeasonalData {
        season,
        month,
        seasonal_events: seasonal_events(month),
        holidays: holidays_near(month, day),
        special_periods: special_periods(month, day),
        seasonal_tips: seasonal_tips(season),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        serde_json::json!({
            "success": true,
            "data": {
                "weather": weather_for(hour, season, region_for(location)),
                "seasonal": seasonal,
                "timestamp": now.to_rfc3339(),
            }
        })
        .to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_follow_japanese_calendar() {
        assert_eq!(season_for_month(3), Season::Spring);
        assert_eq!(season_for_month(5), Season::Spring);
        assert_eq!(season_for_month(6), Season::Summer);
        assert_eq!(season_for_month(8), Season::Summer);
        assert_eq!(season_for_month(9), Season::Autumn);
        assert_eq!(season_for_month(11), Season::Autumn);
        assert_eq!(season_for_month(12), Season::Winter);
        assert_eq!(season_for_month(1), Season::Winter);
        assert_eq!(season_for_month(2), Season::Winter);
    }

    #[test]
    fn every_month_has_seasonal_events() {
        for month in 1..=12 {
            assert_eq!(seasonal_events(month).len(), 2, "month {month}");
        }
    }

    #[test]
    fn holidays_appear_within_two_day_window() {
        assert!(holidays_near(1, 1).contains(&"元日"));
        assert!(holidays_near(1, 3).contains(&"元日"));
        assert!(!holidays_near(1, 4).contains(&"元日"));
        assert!(holidays_near(5, 4).contains(&"憲法記念日"));
        assert!(holidays_near(5, 4).contains(&"みどりの日"));
        assert!(holidays_near(5, 4).contains(&"こどもの日"));
        assert!(holidays_near(7, 15).is_empty());
    }

    #[test]
    fn special_periods_cover_known_ranges() {
        assert_eq!(special_periods(12, 30), vec!["年末年始"]);
        assert_eq!(special_periods(1, 2), vec!["年末年始"]);
        assert!(special_periods(1, 4).is_empty());
        assert_eq!(special_periods(5, 1), vec!["ゴールデンウィーク"]);
        assert_eq!(special_periods(8, 14), vec!["お盆"]);
        assert!(special_periods(6, 15).is_empty());
    }

    #[test]
    fn every_season_has_three_tips() {
        for season in [Season::Spring, Season::Summer, Season::Autumn, Season::Winter] {
            assert_eq!(seasonal_tips(season).len(), 3);
        }
    }

    #[test]
    fn unknown_location_falls_back_to_tokyo() {
        assert_eq!(region_for("Atlantis").name_ja, "東京都");
        assert_eq!(region_for("").name_ja, "東京都");
    }

    #[test]
    fn region_lookup_is_case_insensitive() {
        assert_eq!(region_for("hokkaido").name_ja, "北海道");
        assert_eq!(region_for("OKINAWA").name_ja, "沖縄県");
    }

    #[test]
    fn hokkaido_winter_is_cold() {
        // base 8, adjustment -15, jitter ±3 → between -10 and -4
        let weather = weather_for(12, Season::Winter, region_for("Hokkaido"));
        assert!((-10..=-4).contains(&weather.temperature), "{}", weather.temperature);
    }

    #[test]
    fn okinawa_winter_is_mild() {
        // base 8, adjustment +10, jitter ±3 → between 15 and 21
        let weather = weather_for(12, Season::Winter, region_for("Okinawa"));
        assert!((15..=21).contains(&weather.temperature), "{}", weather.temperature);
    }

    #[test]
    fn humidity_stays_in_range() {
        for hour in 0..24 {
            let weather = weather_for(hour, Season::Summer, region_for("Tokyo"));
            assert!((50..=80).contains(&weather.humidity));
        }
    }

    #[test]
    fn snow_prone_region_gets_snow_instead_of_winter_rain() {
        // Hour 8 in winter lands on the rainy slot of the hour cycle
        let weather = weather_for(8, Season::Winter, region_for("Hokkaido"));
        assert_eq!(weather.condition, WeatherCondition::Snowy);
        assert_eq!(weather.description, "雪");
        assert_eq!(weather.icon, "13d");

        let tokyo = weather_for(8, Season::Winter, region_for("Tokyo"));
        assert_eq!(tokyo.condition, WeatherCondition::Rainy);
    }

    #[test]
    fn description_matches_condition() {
        let weather = weather_for(2, Season::Spring, region_for("Tokyo"));
        // Hour 2 lands on the rainy slot of the hour cycle
        assert_eq!(weather.condition, WeatherCondition::Rainy);
        assert_eq!(weather.description, "雨");
        assert_eq!(weather.icon, "10d");
    }

    #[test]
    fn conditions_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&WeatherCondition::Sunny).unwrap(),
            "\"sunny\""
        );
        assert_eq!(serde_json::to_string(&Season::Autumn).unwrap(), "\"autumn\"");
    }
}
