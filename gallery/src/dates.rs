use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc};

/// Fixed shift used by [`DateMethod::Smart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartShift {
    pub threshold_hour: u32,
    pub offset_hours: i64,
}

/// Timestamps at or after 16:00 UTC roll over to the next day, which is the
/// same calendar a UTC+8 viewer sees.
pub const SMART_SHIFT: SmartShift = SmartShift {
    threshold_hour: 16,
    offset_hours: 8,
};

/// How a capture timestamp is turned into a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMethod {
    #[default]
    Local,
    Utc,
    Smart,
}

impl DateMethod {
    pub const ALL: [DateMethod; 3] = [DateMethod::Local, DateMethod::Utc, DateMethod::Smart];
}

impl std::fmt::Display for DateMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DateMethod::Local => "local",
            DateMethod::Utc => "utc",
            DateMethod::Smart => "smart",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for DateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(DateMethod::Local),
            "utc" => Ok(DateMethod::Utc),
            "smart" => Ok(DateMethod::Smart),
            other => Err(format!("unknown date method: {}", other)),
        }
    }
}

/// The viewer's time zone for [`DateMethod::Local`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// The machine's zone rules, applied at each timestamp so daylight
    /// saving is honoured.
    #[default]
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            LocalZone::System => ts.with_timezone(&chrono::Local).date_naive(),
            LocalZone::Fixed(offset) => ts.with_timezone(offset).date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }
}

pub fn bucket_day(ts: DateTime<Utc>, method: DateMethod, zone: LocalZone) -> NaiveDate {
    match method {
        DateMethod::Local => zone.day_of(ts),
        DateMethod::Utc => ts.date_naive(),
        DateMethod::Smart => {
            if ts.hour() >= SMART_SHIFT.threshold_hour {
                (ts + Duration::hours(SMART_SHIFT.offset_hours)).date_naive()
            } else {
                ts.date_naive()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Inclusive on both ends; an open end is unbounded.
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    ThisMonth,
    LastMonth,
    ThisYear,
    LastYear,
}

fn month_before(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

impl DateFilter {
    /// `today` is the viewer's current calendar day.
    pub fn contains(&self, day: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateFilter::Range { start, end } => {
                start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
            }
            DateFilter::ThisMonth => day.year() == today.year() && day.month() == today.month(),
            DateFilter::LastMonth => (day.year(), day.month()) == month_before(today),
            DateFilter::ThisYear => day.year() == today.year(),
            DateFilter::LastYear => day.year() == today.year() - 1,
        }
    }

    /// Accepts `this-month`, `last-month`, `this-year`, `last-year`,
    /// `YYYY-MM-DD`, and `YYYY-MM-DD..YYYY-MM-DD` with either end optional.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        match input {
            "this-month" => return Some(DateFilter::ThisMonth),
            "last-month" => return Some(DateFilter::LastMonth),
            "this-year" => return Some(DateFilter::ThisYear),
            "last-year" => return Some(DateFilter::LastYear),
            _ => {}
        }
        let parse_day = |s: &str| -> Result<Option<NaiveDate>, ()> {
            if s.is_empty() {
                Ok(None)
            } else {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| ())
            }
        };
        if let Some(idx) = input.find("..") {
            let start = parse_day(&input[..idx]).ok()?;
            let end = parse_day(&input[idx + 2..]).ok()?;
            if start.is_none() && end.is_none() {
                return None;
            }
            return Some(DateFilter::Range { start, end });
        }
        let day = parse_day(input).ok()??;
        Some(DateFilter::Range {
            start: Some(day),
            end: Some(day),
        })
    }
}
