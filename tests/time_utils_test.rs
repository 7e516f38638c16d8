use vprm_offline::time_utils::{
    days_of_year, half_hourly_grid, hourly_times, is_leap_year, julian, HALF_HOURLY_STEPS,
};

#[test]
fn test_specific_julian_dates() {
    // Reference Julian day numbers
    assert_eq!(julian(2000, 1, 1), 2451545);
    assert_eq!(julian(1970, 1, 1), 2440588);
    assert_eq!(julian(2024, 3, 1) - julian(2024, 2, 29), 1);
}

#[test]
fn test_month_boundaries() {
    assert_eq!(julian(2023, 2, 1) - julian(2023, 1, 31), 1);
    assert_eq!(julian(2024, 1, 1) - julian(2023, 12, 31), 1);
}

#[test]
fn test_half_hourly_grid_spacing() {
    let grid = half_hourly_grid(2015);
    assert_eq!(grid.len(), HALF_HOURLY_STEPS);
    for pair in grid.windows(2) {
        assert!((pair[1] - pair[0] - 1.0 / 48.0).abs() < 1e-6);
    }
}

#[test]
fn test_hourly_times_cover_a_year() {
    let hours = hourly_times(2015, 8760);
    assert_eq!(hours.len(), 8760);
    assert_eq!(hours[24], julian(2015, 1, 2) as f64);
    // Every second half-hourly node coincides with an hourly node
    let grid = half_hourly_grid(2015);
    assert_eq!(grid[2 * 100], hours[100]);
}

#[test]
fn test_leap_year_has_day_beyond_grid() {
    assert!(is_leap_year(2024));
    let days = days_of_year(2024);
    assert_eq!(days.len(), 366);
    let grid = half_hourly_grid(2024);
    // 31 December of a leap year starts after the last half-hourly node
    assert!(julian(2024, 12, 31) as f64 > grid[grid.len() - 1]);
}
