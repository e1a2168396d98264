use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;

use crate::display::{Line, COLUMNS};
use crate::sensor::Reading;
use crate::util;
use crate::weather::WeatherSnapshot;

const CAT: &str = "    =^. .^=     ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Indoor,
    Comfort,
    Clock,
    Weather,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Indoor, Screen::Comfort, Screen::Clock, Screen::Weather];

    pub fn from_index(index: usize) -> Screen {
        Self::ALL[index % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comfort {
    Cold,
    Cool,
    Comfortable,
    Warm,
    Hot,
}

// Inclusive upper bounds, so a value sitting on a cut point belongs to the
// colder bucket. Anything above the last bound (and NaN) is Hot.
const COMFORT_BOUNDS: [(f32, Comfort); 4] = [
    (20.0, Comfort::Cold),
    (21.0, Comfort::Cool),
    (23.0, Comfort::Comfortable),
    (26.0, Comfort::Warm),
];

impl Comfort {
    pub fn from_temperature(temperature_c: f32) -> Comfort {
        COMFORT_BOUNDS
            .iter()
            .find(|(bound, _)| temperature_c <= *bound)
            .map_or(Comfort::Hot, |&(_, comfort)| comfort)
    }

    pub fn label(self) -> &'static str {
        match self {
            Comfort::Cold => "***WINTERFELL***",
            Comfort::Cool => "**BLANKET TIME**",
            Comfort::Comfortable => "***COZY***",
            Comfort::Warm => "***TOASTIE***",
            Comfort::Hot => "**HEAT WAVE**",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub top: Line,
    pub bottom: Line,
}

impl Frame {
    fn new(top: Line, bottom: Line) -> Self {
        Frame { top, bottom }
    }
}

/// How long each screen stays up before the rotation moves on.
#[derive(Debug, Clone, Copy)]
pub struct Dwell {
    pub indoor: Duration,
    pub comfort: Duration,
    pub clock: Duration,
    pub weather: Duration,
}

impl Dwell {
    pub fn of(&self, screen: Screen) -> Duration {
        match screen {
            Screen::Indoor => self.indoor,
            Screen::Comfort => self.comfort,
            Screen::Clock => self.clock,
            Screen::Weather => self.weather,
        }
    }
}

/// Which screen is up and since when.
#[derive(Debug, Clone, Copy)]
pub struct DisplayState {
    screen_index: usize,
    entered_at: Instant,
}

impl DisplayState {
    pub fn new(now: Instant) -> Self {
        DisplayState {
            screen_index: 0,
            entered_at: now,
        }
    }

    pub fn screen_index(&self) -> usize {
        self.screen_index
    }

    /// Moves to the next screen once the current one has had its dwell.
    pub fn advance(&mut self, now: Instant, dwell: &Dwell) -> bool {
        let current = Screen::from_index(self.screen_index);
        if now.saturating_duration_since(self.entered_at) < dwell.of(current) {
            return false;
        }

        self.screen_index = (self.screen_index + 1) % Screen::ALL.len();
        self.entered_at = now;
        true
    }
}

/// Turns the latest known state into the two rows of one screen. Holds only
/// configuration, so identical arguments always render identical frames.
#[derive(Debug, Clone)]
pub struct ScreenRotator {
    dwell: Dwell,
    stale_after: Duration,
    weather_ttl: Option<Duration>,
}

impl ScreenRotator {
    /// `weather_ttl` is `None` when weather is disabled; a snapshot older than
    /// it is only there because refreshes have been failing.
    pub fn new(dwell: Dwell, stale_after: Duration, weather_ttl: Option<Duration>) -> Self {
        ScreenRotator {
            dwell,
            stale_after,
            weather_ttl,
        }
    }

    pub fn dwell(&self) -> &Dwell {
        &self.dwell
    }

    pub fn render(
        &self,
        screen_index: usize,
        reading: Option<&Reading>,
        weather: Option<&WeatherSnapshot>,
        now: DateTime<Local>,
    ) -> Frame {
        match Screen::from_index(screen_index) {
            Screen::Indoor => self.indoor(reading, now),
            Screen::Comfort => Self::comfort(reading),
            Screen::Clock => Frame::new(
                Line::centered(&now.format("%H:%M").to_string()),
                Line::new(CAT),
            ),
            Screen::Weather => self.weather(weather, now),
        }
    }

    fn indoor(&self, reading: Option<&Reading>, now: DateTime<Local>) -> Frame {
        let reading = match reading {
            Some(reading) => reading,
            None => return Frame::new(Line::new("Sensor error"), Line::new("Check wiring")),
        };

        let marker = if older_than(reading.taken_at, self.stale_after, now) {
            '*'
        } else {
            ' '
        };

        let temperature = format!("Temp: {:4.1}C", reading.temperature_c);

        Frame::new(
            Line::new(&format!("{temperature:<15}{marker}")),
            Line::new(&format!("Hum:  {:4.1}%", reading.humidity_percent)),
        )
    }

    fn comfort(reading: Option<&Reading>) -> Frame {
        let label = match reading {
            Some(reading) => Comfort::from_temperature(reading.temperature_c).label(),
            None => "No reading",
        };

        Frame::new(Line::centered(label), Line::blank())
    }

    fn weather(&self, weather: Option<&WeatherSnapshot>, now: DateTime<Local>) -> Frame {
        let ttl = match self.weather_ttl {
            Some(ttl) => ttl,
            None => return Frame::new(Line::new("No API key"), Line::blank()),
        };

        let weather = match weather {
            Some(weather) => weather,
            None => return Frame::new(Line::new("Weather error"), Line::blank()),
        };

        let mut top = format!(
            "T:{:.1}C W:{:.1}km/h",
            weather.temperature_c,
            weather.wind_speed * 3.6
        );
        if older_than(weather.fetched_at, ttl, now) {
            top = format!("{}*", util::fit(&top, COLUMNS - 1));
        }

        Frame::new(Line::new(&top), Line::new(&describe(&weather.description)))
    }
}

fn older_than(at: DateTime<Local>, limit: Duration, now: DateTime<Local>) -> bool {
    (now - at).to_std().map_or(false, |age| age > limit)
}

fn describe(description: &str) -> String {
    let mut chars = description.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };

    if capitalized.chars().count() > 16 {
        format!("{}...", capitalized.chars().take(13).collect::<String>())
    } else {
        capitalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Location;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 5, 7, 30, 0).unwrap()
    }

    fn dwell() -> Dwell {
        Dwell {
            indoor: Duration::from_secs(10),
            comfort: Duration::from_secs(3),
            clock: Duration::from_secs(3),
            weather: Duration::from_secs(5),
        }
    }

    fn rotator() -> ScreenRotator {
        ScreenRotator::new(dwell(), Duration::from_secs(60), Some(Duration::from_secs(600)))
    }

    fn reading(temperature_c: f32) -> Reading {
        Reading {
            temperature_c,
            humidity_percent: 45.0,
            taken_at: now(),
        }
    }

    fn snapshot(description: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: 5.0,
            wind_speed: 3.5,
            description: description.to_string(),
            fetched_at: now(),
            location: Location::City("Satu Mare,RO".to_string()),
        }
    }

    fn rows(frame: &Frame) -> (&str, &str) {
        (frame.top.as_str(), frame.bottom.as_str())
    }

    #[test]
    fn indoor_screen() {
        let frame = rotator().render(0, Some(&reading(21.5)), None, now());

        assert_eq!(rows(&frame), ("Temp: 21.5C     ", "Hum:  45.0%     "));
    }

    #[test]
    fn indoor_screen_marks_stale_reading() {
        let later = now() + chrono::Duration::seconds(61);
        let frame = rotator().render(0, Some(&reading(21.5)), None, later);

        assert_eq!(frame.top.as_str(), "Temp: 21.5C    *");
    }

    #[test]
    fn indoor_screen_without_reading() {
        let frame = rotator().render(0, None, None, now());

        assert_eq!(rows(&frame), ("Sensor error    ", "Check wiring    "));
    }

    #[test]
    fn comfort_screen() {
        let frame = rotator().render(1, Some(&reading(22.0)), None, now());

        assert_eq!(rows(&frame), ("   ***COZY***   ", "                "));
    }

    #[test]
    fn clock_screen() {
        let frame = rotator().render(2, None, None, now());

        assert_eq!(rows(&frame), ("     07:30      ", CAT));
    }

    #[test]
    fn weather_screen() {
        let frame = rotator().render(3, None, Some(&snapshot("light rain")), now());

        assert_eq!(rows(&frame), ("T:5.0C W:12.6km/", "Light rain      "));
    }

    #[test]
    fn weather_screen_marks_snapshot_past_ttl() {
        let weather = snapshot("light rain");

        let within = now() + chrono::Duration::seconds(600);
        let frame = rotator().render(3, None, Some(&weather), within);
        assert_eq!(frame.top.as_str(), "T:5.0C W:12.6km/");

        let past = now() + chrono::Duration::seconds(601);
        let frame = rotator().render(3, None, Some(&weather), past);
        assert_eq!(frame.top.as_str(), "T:5.0C W:12.6km*");
    }

    #[test]
    fn weather_screen_lowercases_rest_of_description() {
        let frame = rotator().render(3, None, Some(&snapshot("OVERCAST Clouds")), now());

        assert_eq!(frame.bottom.as_str(), "Overcast clouds ");
    }

    #[test]
    fn weather_screen_shortens_long_description() {
        let weather = snapshot("thunderstorm with heavy drizzle");
        let frame = rotator().render(3, None, Some(&weather), now());

        assert_eq!(frame.bottom.as_str(), "Thunderstorm ...");
    }

    #[test]
    fn weather_screen_placeholders() {
        let frame = rotator().render(3, None, None, now());
        assert_eq!(frame.top.as_str(), "Weather error   ");

        let disabled = ScreenRotator::new(dwell(), Duration::from_secs(60), None);
        let frame = disabled.render(3, None, Some(&snapshot("clear sky")), now());
        assert_eq!(frame.top.as_str(), "No API key      ");
    }

    #[test]
    fn index_wraps_around() {
        let rotator = rotator();
        let reading = reading(19.0);

        assert_eq!(
            rotator.render(5, Some(&reading), None, now()),
            rotator.render(1, Some(&reading), None, now())
        );
    }

    #[test]
    fn same_inputs_render_same_frame() {
        let rotator = rotator();
        let reading = reading(23.4);
        let weather = snapshot("few clouds");

        for index in 0..Screen::ALL.len() {
            assert_eq!(
                rotator.render(index, Some(&reading), Some(&weather), now()),
                rotator.render(index, Some(&reading), Some(&weather), now())
            );
        }
    }

    #[test]
    fn comfort_boundaries_belong_to_colder_bucket() {
        assert_eq!(Comfort::from_temperature(18.0), Comfort::Cold);
        assert_eq!(Comfort::from_temperature(19.5), Comfort::Cold);
        assert_eq!(Comfort::from_temperature(20.0), Comfort::Cold);
        assert_eq!(Comfort::from_temperature(20.01), Comfort::Cool);
        assert_eq!(Comfort::from_temperature(21.0), Comfort::Cool);
        assert_eq!(Comfort::from_temperature(21.01), Comfort::Comfortable);
        assert_eq!(Comfort::from_temperature(23.0), Comfort::Comfortable);
        assert_eq!(Comfort::from_temperature(23.01), Comfort::Warm);
        assert_eq!(Comfort::from_temperature(26.0), Comfort::Warm);
        assert_eq!(Comfort::from_temperature(26.01), Comfort::Hot);
    }

    #[test]
    fn comfort_is_total_and_ordered() {
        let mut previous = Comfort::from_temperature(-40.0);
        assert_eq!(previous, Comfort::Cold);

        let order = [
            Comfort::Cold,
            Comfort::Cool,
            Comfort::Comfortable,
            Comfort::Warm,
            Comfort::Hot,
        ];
        let rank = |comfort: Comfort| order.iter().position(|&c| c == comfort).unwrap();

        for step in -400..=600 {
            let comfort = Comfort::from_temperature(step as f32 / 10.0);
            assert!(rank(comfort) >= rank(previous));
            previous = comfort;
        }

        assert_eq!(previous, Comfort::Hot);
        assert_eq!(Comfort::from_temperature(f32::NAN), Comfort::Hot);
    }

    #[test]
    fn rotation_respects_dwell() {
        let start = Instant::now();
        let dwell = dwell();
        let mut state = DisplayState::new(start);

        assert!(!state.advance(start + Duration::from_secs(9), &dwell));
        assert!(state.advance(start + Duration::from_secs(10), &dwell));
        assert_eq!(state.screen_index(), 1);

        assert!(!state.advance(start + Duration::from_secs(12), &dwell));
        assert!(state.advance(start + Duration::from_secs(13), &dwell));
        assert!(state.advance(start + Duration::from_secs(16), &dwell));
        assert!(state.advance(start + Duration::from_secs(21), &dwell));
        assert_eq!(state.screen_index(), 0);
    }
}
