use std::time::Duration;

use plotmap_client::DEFAULT_MAP_RANGE_URL;
use plotmap_shared::Cell;

pub const DEFAULT_PLANET_ID: i64 = 1;
pub const DEFAULT_CANVAS_WIDTH: f64 = 1280.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 720.0;
pub const DEFAULT_CENTER: Cell = Cell::new(50, 50);
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn api_url() -> String {
    non_empty("PLOTMAP_API_URL").unwrap_or_else(|| DEFAULT_MAP_RANGE_URL.to_string())
}

/// Session token forwarded to the API. There is no sensible default.
pub fn init_data() -> Option<String> {
    non_empty("PLOTMAP_INIT_DATA")
}

pub fn planet_id() -> i64 {
    non_empty("PLOTMAP_PLANET_ID")
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(DEFAULT_PLANET_ID)
}

fn canvas_dimension(name: &str, default: f64) -> f64 {
    non_empty(name)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(default)
}

pub fn canvas_size() -> (f64, f64) {
    (
        canvas_dimension("PLOTMAP_CANVAS_WIDTH", DEFAULT_CANVAS_WIDTH),
        canvas_dimension("PLOTMAP_CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT),
    )
}

pub fn mobile() -> bool {
    non_empty("PLOTMAP_MOBILE")
        .map(|value| {
            let normalized = value.to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

/// Cell to centre the probe viewport on. Each axis falls back on its own.
pub fn center() -> Cell {
    let axis = |name: &str, default: i32| {
        non_empty(name)
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or(default)
    };
    Cell::new(
        axis("PLOTMAP_CENTER_X", DEFAULT_CENTER.x),
        axis("PLOTMAP_CENTER_Y", DEFAULT_CENTER.y),
    )
}

fn secs(name: &str, default: u64) -> Duration {
    non_empty(name)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

pub fn http_timeout() -> Duration {
    secs("PLOTMAP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
}

pub fn connect_timeout() -> Duration {
    secs("PLOTMAP_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use plotmap_client::DEFAULT_MAP_RANGE_URL;
    use plotmap_shared::Cell;

    use super::*;

    const ALL_VARS: [&str; 10] = [
        "PLOTMAP_API_URL",
        "PLOTMAP_INIT_DATA",
        "PLOTMAP_PLANET_ID",
        "PLOTMAP_CANVAS_WIDTH",
        "PLOTMAP_CANVAS_HEIGHT",
        "PLOTMAP_MOBILE",
        "PLOTMAP_CENTER_X",
        "PLOTMAP_CENTER_Y",
        "PLOTMAP_HTTP_TIMEOUT_SECS",
        "PLOTMAP_CONNECT_TIMEOUT_SECS",
    ];

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars_unset(ALL_VARS, || {
            assert_eq!(api_url(), DEFAULT_MAP_RANGE_URL);
            assert_eq!(init_data(), None);
            assert_eq!(planet_id(), 1);
            assert_eq!(canvas_size(), (1280.0, 720.0));
            assert!(!mobile());
            assert_eq!(center(), Cell::new(50, 50));
            assert_eq!(http_timeout(), Duration::from_secs(10));
            assert_eq!(connect_timeout(), Duration::from_secs(3));
        });
    }

    #[test]
    fn valid_values_are_used() {
        temp_env::with_vars(
            [
                ("PLOTMAP_API_URL", Some(" http://localhost:8080/api/map_range/ ")),
                ("PLOTMAP_INIT_DATA", Some("query_id=1&hash=ab")),
                ("PLOTMAP_PLANET_ID", Some("7")),
                ("PLOTMAP_CANVAS_WIDTH", Some("390")),
                ("PLOTMAP_CANVAS_HEIGHT", Some("844")),
                ("PLOTMAP_MOBILE", Some("Yes")),
                ("PLOTMAP_CENTER_X", Some("-12")),
                ("PLOTMAP_CENTER_Y", Some("300")),
                ("PLOTMAP_HTTP_TIMEOUT_SECS", Some("30")),
                ("PLOTMAP_CONNECT_TIMEOUT_SECS", Some("5")),
            ],
            || {
                assert_eq!(api_url(), "http://localhost:8080/api/map_range/");
                assert_eq!(init_data().as_deref(), Some("query_id=1&hash=ab"));
                assert_eq!(planet_id(), 7);
                assert_eq!(canvas_size(), (390.0, 844.0));
                assert!(mobile());
                assert_eq!(center(), Cell::new(-12, 300));
                assert_eq!(http_timeout(), Duration::from_secs(30));
                assert_eq!(connect_timeout(), Duration::from_secs(5));
            },
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("PLOTMAP_API_URL", Some("   ")),
                ("PLOTMAP_INIT_DATA", Some("")),
                ("PLOTMAP_PLANET_ID", Some("mars")),
                ("PLOTMAP_CANVAS_WIDTH", Some("-5")),
                ("PLOTMAP_CANVAS_HEIGHT", Some("NaN")),
                ("PLOTMAP_MOBILE", Some("maybe")),
                ("PLOTMAP_CENTER_X", Some("1.5")),
                ("PLOTMAP_CENTER_Y", Some("8")),
                ("PLOTMAP_HTTP_TIMEOUT_SECS", Some("0")),
                ("PLOTMAP_CONNECT_TIMEOUT_SECS", Some("soon")),
            ],
            || {
                assert_eq!(api_url(), DEFAULT_MAP_RANGE_URL);
                assert_eq!(init_data(), None);
                assert_eq!(planet_id(), 1);
                assert_eq!(canvas_size(), (1280.0, 720.0));
                assert!(!mobile());
                assert_eq!(center(), Cell::new(50, 8));
                assert_eq!(http_timeout(), Duration::from_secs(10));
                assert_eq!(connect_timeout(), Duration::from_secs(3));
            },
        );
    }
}
