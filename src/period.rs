use chrono::NaiveDate;

/// Closed inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Period { start, end }
    }

    /// The whole calendar year `[y-01-01, y-12-31]`.
    pub fn full_year(year: i32) -> Self {
        Period {
            start: NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year start"),
            end: NaiveDate::from_ymd_opt(year, 12, 31).expect("valid year end"),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%d.%m.%Y"),
            self.end.format("%d.%m.%Y")
        )
    }
}
