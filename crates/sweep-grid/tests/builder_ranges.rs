use sweep_core::SweepError;
use sweep_grid::{build, linspace, logspace, GridLimits, ParamValue, ParameterSpec};

fn numbers(values: &[ParamValue]) -> Vec<f64> {
    values
        .iter()
        .map(|value| value.as_f64().expect("numeric value"))
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() <= 1e-9 * e.abs().max(1.0), "{a} vs {e}");
    }
}

#[test]
fn linear_range_includes_both_ends() {
    assert_eq!(linspace(0.0, 5.0, 6), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    let values = linspace(4.5, 5.5, 11);
    assert_eq!(values.first(), Some(&4.5));
    assert_eq!(values.last(), Some(&5.5));
    assert_eq!(values.len(), 11);
}

#[test]
fn log_range_bounds_are_exponents() {
    assert_eq!(logspace(0.0, 1.0, 2), vec![1.0, 10.0]);
    assert_close(
        &logspace(-2.0, 1.0, 4),
        &[0.01, 0.1, 1.0, 10.0],
    );
}

#[test]
fn single_point_ranges_return_start() {
    assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
    assert_close(&logspace(2.0, 2.0, 1), &[100.0]);
}

#[test]
fn grid_of_linear_and_log_parameters_has_product_size() {
    let grid = build(
        &[
            ParameterSpec::parse_linspace("foo,0,5,6").expect("foo"),
            ParameterSpec::parse_logspace("bar,-2,1,4").expect("bar"),
        ],
        &GridLimits::default(),
    )
    .expect("grid");
    assert_eq!(grid.size(), 24);
    assert_eq!(grid.radices(), vec![6, 4]);
    assert_eq!(grid.names(), vec!["foo", "bar"]);
    let bar = grid.axis("bar").expect("bar axis");
    assert_close(
        &numbers(&bar.values),
        &[0.01, 0.1, 1.0, 10.0],
    );
}

#[test]
fn list_values_keep_declared_order() {
    let grid = build(
        &[ParameterSpec::parse_list("mode,fast,slow,auto").expect("mode")],
        &GridLimits::default(),
    )
    .expect("grid");
    let axis = grid.axis("mode").expect("axis");
    assert_eq!(
        axis.values,
        vec![
            ParamValue::from("fast"),
            ParamValue::from("slow"),
            ParamValue::from("auto"),
        ]
    );
}

#[test]
fn parameterless_grid_has_one_point() {
    let grid = build(&[], &GridLimits::default()).expect("grid");
    assert_eq!(grid.size(), 1);
    assert!(grid.decode(sweep_grid::TaskIndex::from_raw(0)).expect("decode").is_empty());
}

fn invalid_code(specs: &[ParameterSpec]) -> String {
    match build(specs, &GridLimits::default()) {
        Err(SweepError::InvalidSpec(info)) => info.code,
        other => panic!("expected InvalidSpec, got {other:?}"),
    }
}

#[test]
fn malformed_declarations_are_rejected() {
    assert_eq!(
        invalid_code(&[ParameterSpec::list("x", Vec::<&str>::new())]),
        "list_empty"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::linear_range("x", 0.0, 1.0, 0)]),
        "range_count"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::log_range("x", 1.0, 1.0, 3)]),
        "range_span"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::linear_range("x", 2.0, 1.0, 3)]),
        "range_order"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::linear_range("x", f64::NAN, 1.0, 3)]),
        "range_bounds"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::list("x", vec!["a", "b", "a"])]),
        "value_duplicate"
    );
    assert_eq!(
        invalid_code(&[ParameterSpec::list("bad-name", vec!["a"])]),
        "parameter_name"
    );
}

#[test]
fn duplicate_names_are_rejected_with_context() {
    let err = build(
        &[
            ParameterSpec::linear_range("x", 0.0, 1.0, 2),
            ParameterSpec::list("x", vec!["a"]),
        ],
        &GridLimits::default(),
    )
    .expect_err("duplicate");
    assert_eq!(err.code(), "parameter_duplicate");
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("x"));
}

#[test]
fn grid_limit_is_enforced_before_submission() {
    let limits = GridLimits { max_size: 20 };
    let err = build(
        &[
            ParameterSpec::linear_range("a", 0.0, 5.0, 6),
            ParameterSpec::linear_range("b", 0.0, 3.0, 4),
        ],
        &limits,
    )
    .expect_err("too large");
    assert!(matches!(err, SweepError::GridTooLarge(_)));
    assert_eq!(err.info().context.get("size").map(String::as_str), Some("24"));
}

#[test]
fn oversized_axis_fails_without_materializing() {
    let err = build(
        &[ParameterSpec::linear_range("a", 0.0, 1.0, usize::MAX)],
        &GridLimits::default(),
    )
    .expect_err("too large");
    assert!(matches!(err, SweepError::GridTooLarge(_)));
}

#[test]
fn ranges_that_overflow_a_float_are_rejected() {
    let err = build(
        &[ParameterSpec::log_range("x", 300.0, 400.0, 2)],
        &GridLimits::default(),
    )
    .expect_err("10^400 is not representable");
    assert_eq!(err.code(), "range_overflow");
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("x"));

    assert_eq!(
        invalid_code(&[ParameterSpec::linear_range("y", -1e308, 1e308, 3)]),
        "range_overflow"
    );
    assert!(build(
        &[ParameterSpec::log_range("z", 300.0, 308.0, 2)],
        &GridLimits::default()
    )
    .is_ok());
}
