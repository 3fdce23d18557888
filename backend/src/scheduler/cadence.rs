//! Wall-clock cadences in India Standard Time

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use chrono_tz::Asia::Kolkata;
use shared::{ist_to_utc, FeedKind};

/// When a job fires, on the Asia/Kolkata wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every minute of the hour divisible by `n` (`*/n`)
    EveryMinutes(u32),
    /// Once a day at `hour:minute`
    DailyAt { hour: u32, minute: u32 },
}

impl Cadence {
    /// Default cadence of each feed
    pub fn for_feed(feed: FeedKind) -> Self {
        match feed {
            FeedKind::Bulletin => Cadence::DailyAt { hour: 18, minute: 30 },
            FeedKind::DistrictWarning => Cadence::DailyAt { hour: 18, minute: 0 },
            FeedKind::RiverBasin => Cadence::DailyAt { hour: 19, minute: 0 },
            FeedKind::DistrictNowcast | FeedKind::SteppedNowcast => Cadence::EveryMinutes(15),
            FeedKind::StationObservation => Cadence::EveryMinutes(30),
            FeedKind::Radar => Cadence::EveryMinutes(5),
        }
    }

    /// First fire time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&Kolkata).naive_local();

        let next_local = match *self {
            Cadence::EveryMinutes(n) => {
                let step = n.clamp(1, 60);
                let mut candidate = local
                    .with_second(0)
                    .and_then(|t| t.with_nanosecond(0))
                    .unwrap_or(local)
                    + ChronoDuration::minutes(1);
                while candidate.minute() % step != 0 {
                    candidate += ChronoDuration::minutes(1);
                }
                candidate
            }
            Cadence::DailyAt { hour, minute } => {
                let target = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
                    .unwrap_or(NaiveTime::MIN);
                let today = local.date().and_time(target);
                if today > local {
                    today
                } else {
                    today + ChronoDuration::days(1)
                }
            }
        };

        ist_to_utc(next_local).unwrap_or(now + ChronoDuration::minutes(1))
    }

    /// Time to wait from `now` until the next fire
    pub fn duration_until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(Duration::from_secs(1))
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::EveryMinutes(n) => write!(f, "every {} min", n),
            Cadence::DailyAt { hour, minute } => write!(f, "daily {:02}:{:02} IST", hour, minute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// UTC instant of an IST wall-clock time on 2024-07-15
    fn ist(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Kolkata
            .with_ymd_and_hms(2024, 7, 15, hour, minute, second)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_every_minutes_aligns_to_wall_clock() {
        let cadence = Cadence::EveryMinutes(15);
        assert_eq!(cadence.next_after(ist(10, 7, 30)), ist(10, 15, 0));
        assert_eq!(cadence.next_after(ist(10, 15, 0)), ist(10, 30, 0));
        assert_eq!(cadence.next_after(ist(10, 59, 59)), ist(11, 0, 0));
    }

    #[test]
    fn test_every_five_minutes() {
        let cadence = Cadence::EveryMinutes(5);
        assert_eq!(cadence.next_after(ist(10, 4, 59)), ist(10, 5, 0));
    }

    #[test]
    fn test_daily_later_today() {
        let cadence = Cadence::DailyAt { hour: 18, minute: 30 };
        assert_eq!(cadence.next_after(ist(9, 0, 0)), ist(18, 30, 0));
    }

    #[test]
    fn test_daily_rolls_over_to_tomorrow() {
        let cadence = Cadence::DailyAt { hour: 18, minute: 0 };
        let next = cadence.next_after(ist(18, 0, 0));
        assert_eq!(next, ist(18, 0, 0) + ChronoDuration::days(1));
    }

    #[test]
    fn test_every_minutes_crosses_midnight() {
        let cadence = Cadence::EveryMinutes(30);
        let next = cadence.next_after(ist(23, 45, 0));
        assert_eq!(next, ist(0, 0, 0) + ChronoDuration::days(1));
    }

    #[test]
    fn test_duration_is_positive_and_bounded() {
        for feed in FeedKind::ALL {
            let wait = Cadence::for_feed(feed).duration_until_next(Utc::now());
            assert!(wait.as_secs() <= 24 * 3600);
        }
    }

    #[test]
    fn test_default_cadences() {
        assert_eq!(Cadence::for_feed(FeedKind::Radar), Cadence::EveryMinutes(5));
        assert_eq!(
            Cadence::for_feed(FeedKind::RiverBasin),
            Cadence::DailyAt { hour: 19, minute: 0 }
        );
        assert_eq!(Cadence::for_feed(FeedKind::Radar).to_string(), "every 5 min");
    }
}
