use std::io::Write;

use sweep_core::SweepError;
use sweep_grid::{load_plan, GridLimits, ParameterGrid, ParameterKind, ParameterSpec};

#[test]
fn range_declarations_parse_name_bounds_and_count() {
    let spec = ParameterSpec::parse_linspace("foo,0,3,4").expect("parse");
    assert_eq!(spec, ParameterSpec::linear_range("foo", 0.0, 3.0, 4));
    let spec = ParameterSpec::parse_logspace("bar, -2, 1, 4").expect("parse");
    assert_eq!(spec, ParameterSpec::log_range("bar", -2.0, 1.0, 4));
}

#[test]
fn malformed_range_declarations_are_invalid_specs() {
    for declaration in ["foo,0,3", "foo,0,3,4,5", "foo,a,3,4", "foo,0,3,-1", "foo,0,3,2.5"] {
        let err = ParameterSpec::parse_linspace(declaration).expect_err(declaration);
        assert!(matches!(err, SweepError::InvalidSpec(_)), "{declaration}");
        assert_eq!(
            err.info().context.get("declaration").map(String::as_str),
            Some(declaration)
        );
    }
}

#[test]
fn list_declarations_keep_text_verbatim() {
    let spec = ParameterSpec::parse_list("opt,adam,sgd,0.10").expect("parse");
    assert_eq!(spec, ParameterSpec::list("opt", vec!["adam", "sgd", "0.10"]));
    assert!(ParameterSpec::parse_list("opt").is_err());
    assert!(ParameterSpec::parse_list(",a,b").is_err());
}

#[test]
fn yaml_plan_preserves_parameter_order_and_aliases() {
    let mut file = tempfile::NamedTempFile::new().expect("tmp");
    write!(
        file,
        "name: scan\n\
         parameters:\n\
         \x20 - {{ name: zeta, kind: logspace, start: -2, stop: 1, count: 4 }}\n\
         \x20 - {{ name: alpha, kind: linear_range, start: 0, stop: 5, count: 6 }}\n\
         \x20 - {{ name: mode, kind: list, values: [fast, 2] }}\n\
         command: [solver, --verbose]\n"
    )
    .expect("write");
    let plan = load_plan(file.path()).expect("plan");
    assert_eq!(plan.name.as_deref(), Some("scan"));
    assert_eq!(plan.command, vec!["solver", "--verbose"]);
    let names: Vec<&str> = plan.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mode"]);
    assert!(matches!(
        plan.parameters[0].kind,
        ParameterKind::LogRange { count: 4, .. }
    ));
    let grid = plan.build_grid(&GridLimits::default()).expect("grid");
    assert_eq!(grid.size(), 48);
}

#[test]
fn grid_json_round_trips_verbatim() {
    let grid = sweep_grid::build(
        &[
            ParameterSpec::log_range("bar", -2.0, 1.0, 4),
            ParameterSpec::list("mode", vec!["a b", "it's"]),
        ],
        &GridLimits::default(),
    )
    .expect("grid");
    let json = grid.to_canonical_json().expect("json");
    assert!(!json.contains('\n'));
    let restored = ParameterGrid::from_json(&json).expect("restore");
    assert_eq!(restored, grid);
    assert_eq!(restored.fingerprint().expect("fp"), grid.fingerprint().expect("fp"));
}

#[test]
fn tampered_grid_json_is_rejected() {
    let json = r#"{"axes":[{"spec":{"name":"x","kind":"list","values":["a"]},"values":["a","a"]}]}"#;
    assert!(ParameterGrid::from_json(json).is_err());
}
