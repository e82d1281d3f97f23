use serde::Serialize;

// Hands that point at labels set 2% around the dial are nudged by the same
// amount.
const LABEL_OFFSET: f64 = 0.02 * 360.0;

/// Local wall-clock time, broken down the way the dials read it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallTime {
    /// 0 is January.
    pub month: u32,
    /// 1 to 31.
    pub day_of_month: u32,
    /// 0 is Sunday.
    pub weekday: u32,
    /// 0 to 23.
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl WallTime {
    /// The hour on a 12-hour dial. Midnight and noon read 12.
    pub fn display_hour(&self) -> u32 {
        match self.hours % 12 {
            0 => 12,
            hour => hour,
        }
    }
}

/// Hand angles in degrees, clockwise from twelve o'clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeHands {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourDayHands {
    pub hour: f64,
    pub minute: f64,
    pub weekday: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbitalHands {
    pub day_of_month: f64,
    pub month: f64,
}

fn hour_angle(time: &WallTime) -> f64 {
    f64::from(time.hours % 12) / 12.0 * 360.0 + f64::from(time.minutes) / 60.0 * 30.0
}

fn minute_angle(time: &WallTime) -> f64 {
    f64::from(time.minutes) / 60.0 * 360.0 + f64::from(time.seconds) / 60.0 * 6.0
}

pub fn time_hands(time: &WallTime) -> TimeHands {
    TimeHands {
        hour: hour_angle(time),
        minute: minute_angle(time),
        second: f64::from(time.seconds) / 60.0 * 360.0,
    }
}

pub fn hour_day_hands(time: &WallTime) -> HourDayHands {
    HourDayHands {
        hour: hour_angle(time) + LABEL_OFFSET,
        minute: minute_angle(time),
        weekday: f64::from(time.weekday) / 7.0 * 360.0,
    }
}

pub fn orbital_hands(time: &WallTime) -> OrbitalHands {
    OrbitalHands {
        day_of_month: f64::from(time.day_of_month.saturating_sub(1)) / 31.0 * 360.0,
        month: f64::from(time.month) / 12.0 * 360.0 + LABEL_OFFSET,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn at(hours: u32, minutes: u32, seconds: u32) -> WallTime {
        WallTime {
            month: 0,
            day_of_month: 1,
            weekday: 0,
            hours,
            minutes,
            seconds,
        }
    }

    #[test]
    fn half_past_three() {
        let hands = time_hands(&at(15, 30, 0));
        assert_relative_eq!(hands.hour, 105.0);
        assert_relative_eq!(hands.minute, 180.0);
        assert_relative_eq!(hands.second, 0.0);
    }

    #[test]
    fn minute_hand_creeps_with_the_seconds() {
        let hands = time_hands(&at(0, 0, 30));
        assert_relative_eq!(hands.minute, 3.0);
        assert_relative_eq!(hands.second, 180.0);
    }

    #[test]
    fn display_hour_is_twelve_hour() {
        assert_eq!(at(0, 0, 0).display_hour(), 12);
        assert_eq!(at(12, 0, 0).display_hour(), 12);
        assert_eq!(at(13, 0, 0).display_hour(), 1);
        assert_eq!(at(23, 0, 0).display_hour(), 11);
    }

    #[test]
    fn hour_day_hour_hand_is_offset() {
        let time = WallTime {
            weekday: 3,
            ..at(6, 0, 0)
        };
        let hands = hour_day_hands(&time);
        assert_relative_eq!(hands.hour, 187.2);
        assert_relative_eq!(hands.weekday, 3.0 / 7.0 * 360.0);
    }

    #[test]
    fn orbital_hands_span_the_year() {
        let new_year = orbital_hands(&at(0, 0, 0));
        assert_relative_eq!(new_year.day_of_month, 0.0);
        assert_relative_eq!(new_year.month, 7.2);

        let new_years_eve = orbital_hands(&WallTime {
            month: 11,
            day_of_month: 31,
            ..at(0, 0, 0)
        });
        assert_relative_eq!(new_years_eve.day_of_month, 30.0 / 31.0 * 360.0);
        assert_relative_eq!(new_years_eve.month, 337.2);
    }
}
