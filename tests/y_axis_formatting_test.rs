// tests/y_axis_formatting_test.rs

use px4_hover_analysis::plot_framework::format_tick_label;

#[test]
fn test_small_error_ticks_keep_two_decimals() {
    // Position errors in metres are usually well below one.
    assert_eq!(format_tick_label(0.05), "0.05");
    assert_eq!(format_tick_label(0.25), "0.25");
    assert_eq!(format_tick_label(-0.5), "-0.50");
}

#[test]
fn test_zero_tick() {
    assert_eq!(format_tick_label(0.0), "0");
    assert_eq!(format_tick_label(-0.0), "0");
}

#[test]
fn test_degree_ticks() {
    assert_eq!(format_tick_label(5.7), "5.7");
    assert_eq!(format_tick_label(-2.4), "-2.4");
    assert_eq!(format_tick_label(5.0), "5");
    assert_eq!(format_tick_label(45.0), "45");
    assert_eq!(format_tick_label(180.0), "180");
}

#[test]
fn test_large_values_use_suffixes() {
    assert_eq!(format_tick_label(1000.0), "1k");
    assert_eq!(format_tick_label(-2000.0), "-2k");
    assert_eq!(format_tick_label(12_300.0), "12k");
    assert_eq!(format_tick_label(1_500_000.0), "1.5M");
}
