use super::common::*;
use crate::workflows::pulse::trend::{
    classify, classify_change, compare_snapshots, latest_in, DateRange, Momentum, PeriodWindows,
};

#[test]
fn change_thresholds_are_inclusive_at_the_lower_bound() {
    assert_eq!(classify_change(0.15), Momentum::StrongUp);
    assert_eq!(classify_change(0.149), Momentum::Growing);
    assert_eq!(classify_change(0.05), Momentum::Growing);
    assert_eq!(classify_change(0.0), Momentum::Steady);
    assert_eq!(classify_change(-0.05), Momentum::Steady);
    assert_eq!(classify_change(-0.051), Momentum::Slipping);
    assert_eq!(classify_change(-0.15), Momentum::Slipping);
    assert_eq!(classify_change(-0.4), Momentum::Falling);
}

#[test]
fn zero_last_period_is_new() {
    let trend = classify("sent", 40.0, 0.0);
    assert_eq!(trend.momentum, Momentum::New);
    assert!(trend.change.is_none());
    assert!(trend.percent_change.is_none());
}

#[test]
fn percent_change_is_reported() {
    let trend = classify("sent", 120.0, 100.0);
    assert_eq!(trend.momentum, Momentum::StrongUp);
    assert!((trend.percent_change.expect("defined") - 20.0).abs() < 1e-9);
}

#[test]
fn fixture_periods_show_more_volume_and_fewer_replies() {
    let trends = compare_snapshots(&snapshot(), &last_snapshot());

    assert_eq!(trends.this_date, as_of());
    assert_eq!(trends.last_date, date(2025, 1, 8));
    assert_eq!(trends.sent.momentum, Momentum::StrongUp);
    assert_eq!(trends.replied.momentum, Momentum::Falling);
    assert_eq!(trends.reply_rate.momentum, Momentum::Falling);
    assert!((trends.reply_rate.last_period - 16.0).abs() < 1e-9);

    let gtm = &trends.by_role["GTM"];
    assert_eq!(gtm.sent.momentum, Momentum::Steady);
    assert_eq!(gtm.reply_rate.momentum, Momentum::Falling);
}

#[test]
fn roles_present_in_one_period_only_still_trend() {
    let mut last = last_snapshot();
    last.by_role.remove("GTM");
    last.by_role.insert("Design".to_string(), Default::default());

    let trends = compare_snapshots(&snapshot(), &last);
    assert_eq!(trends.by_role["GTM"].sent.momentum, Momentum::New);
    assert_eq!(trends.by_role["Design"].sent.momentum, Momentum::New);
}

#[test]
fn momentum_scale_is_ordered() {
    let ranks: Vec<Option<u8>> = Momentum::ordered()
        .iter()
        .map(|momentum| momentum.scale_rank())
        .collect();
    assert_eq!(ranks, [Some(0), Some(1), Some(2), Some(3), Some(4)]);
    assert_eq!(Momentum::New.scale_rank(), None);
    assert!(Momentum::StrongUp.is_improving());
    assert!(Momentum::Slipping.is_declining());
    assert!(!Momentum::Steady.is_declining());
}

#[test]
fn trailing_windows_cover_two_consecutive_weeks() {
    let windows = PeriodWindows::trailing(as_of());
    assert_eq!(
        windows.this_period,
        DateRange {
            start: date(2025, 1, 9),
            end: date(2025, 1, 15)
        }
    );
    assert_eq!(
        windows.last_period,
        DateRange {
            start: date(2025, 1, 2),
            end: date(2025, 1, 8)
        }
    );
}

#[test]
fn latest_in_picks_the_newest_snapshot_inside_the_range() {
    let mut early = last_snapshot();
    early.date = date(2025, 1, 3);
    let late = last_snapshot();
    let outside = snapshot();
    let window = PeriodWindows::trailing(as_of()).last_period;

    let found = latest_in([&early, &outside, &late], window).expect("found");
    assert_eq!(found.date, date(2025, 1, 8));
    assert!(latest_in([&outside], window).is_none());
}
