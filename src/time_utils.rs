use chrono::{Datelike, NaiveDate};

/// Half-hourly steps per day on the model output grid
pub const STEPS_PER_DAY: usize = 48;
/// Days covered by the output grid (leap days are not modelled)
pub const DAYS_PER_YEAR: usize = 365;
/// Length of the half-hourly output grid
pub const HALF_HOURLY_STEPS: usize = STEPS_PER_DAY * DAYS_PER_YEAR;
/// Hourly samples per day in the meteorological input
pub const MET_STEPS_PER_DAY: usize = 24;

/// Integer Julian day number of a Gregorian date
pub fn julian(year: i64, month: i64, day: i64) -> i64 {
    day - 32075
        + 1461 * (year + 4800 + (month - 14) / 12) / 4
        + 367 * (month - 2 - (month - 14) / 12 * 12) / 12
        - 3 * ((year + 4900 + (month - 14) / 12) / 100) / 4
}

/// Julian day number of 1 January of `year`
pub fn year_start(year: i32) -> f64 {
    julian(year as i64, 1, 1) as f64
}

/// Fractional Julian days of the half-hourly output grid for `year`
pub fn half_hourly_grid(year: i32) -> Vec<f64> {
    regular_grid(year_start(year), STEPS_PER_DAY, HALF_HOURLY_STEPS)
}

/// Fractional Julian days for `len` consecutive hourly samples starting at
/// midnight on 1 January of `year`
pub fn hourly_times(year: i32, len: usize) -> Vec<f64> {
    regular_grid(year_start(year), MET_STEPS_PER_DAY, len)
}

/// Move MODIS day-of-year offsets (1 = 1 January) onto absolute Julian days
pub fn modis_times_to_julian(year: i32, day_offsets: &[f64]) -> Vec<f64> {
    let base = year_start(year) - 1.0;
    day_offsets.iter().map(|t| base + t).collect()
}

fn regular_grid(start: f64, steps_per_day: usize, len: usize) -> Vec<f64> {
    let per_day = steps_per_day as f64;
    (0..len).map(|k| start + k as f64 / per_day).collect()
}

/// Check if a year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Every calendar day of `year` in order
pub fn days_of_year(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(366);
    let mut current = NaiveDate::from_ymd_opt(year, 1, 1);
    while let Some(day) = current {
        if day.year() != year {
            break;
        }
        days.push(day);
        current = day.succ_opt();
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_julian_matches_calendar_ordinal() {
        for year in 1990..2030 {
            let start = julian(year as i64, 1, 1);
            for day in days_of_year(year) {
                let jd = julian(year as i64, day.month() as i64, day.day() as i64);
                assert_eq!(jd - start, day.ordinal0() as i64);
            }
        }
    }

    #[test]
    fn test_half_hourly_grid_shape() {
        let grid = half_hourly_grid(2015);
        assert_eq!(grid.len(), 17520);
        assert_eq!(grid[0], julian(2015, 1, 1) as f64);
        assert_eq!(grid[48], julian(2015, 1, 2) as f64);
        assert!((grid[17519] - (julian(2015, 12, 31) as f64 + 47.0 / 48.0)).abs() < 1e-9);
    }

    #[test]
    fn test_modis_offsets_are_one_based() {
        let times = modis_times_to_julian(2015, &[1.0, 17.5]);
        assert_eq!(times[0], julian(2015, 1, 1) as f64);
        assert_eq!(times[1], julian(2015, 1, 17) as f64 + 0.5);
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert_eq!(days_of_year(2015).len(), 365);
        assert_eq!(days_of_year(2016).len(), 366);
    }
}
