use proptest::prelude::*;
use sweep_core::SweepError;
use sweep_grid::{
    build, decode, digits, encode, Combination, GridLimits, ParamValue, ParameterGrid,
    ParameterSpec, TaskIndex,
};

fn foo_bar_grid() -> ParameterGrid {
    build(
        &[
            ParameterSpec::linear_range("foo", 0.0, 5.0, 6),
            ParameterSpec::log_range("bar", -2.0, 1.0, 4),
        ],
        &GridLimits::default(),
    )
    .expect("grid")
}

fn grid_with_radices(radices: &[usize]) -> ParameterGrid {
    let specs: Vec<ParameterSpec> = radices
        .iter()
        .enumerate()
        .map(|(idx, radix)| {
            let values: Vec<String> = (0..*radix).map(|v| format!("v{v}")).collect();
            ParameterSpec::list(format!("p{idx}"), values)
        })
        .collect();
    build(&specs, &GridLimits { max_size: usize::MAX }).expect("grid")
}

#[test]
fn last_declared_parameter_varies_fastest() {
    let grid = foo_bar_grid();
    let bar = &grid.axis("bar").expect("bar").values;
    let first = decode(TaskIndex::from_raw(0), &grid).expect("decode 0");
    assert_eq!(first.get("foo"), Some(&ParamValue::Number(0.0)));
    assert_eq!(first.get("bar"), Some(&bar[0]));

    let second = decode(TaskIndex::from_raw(1), &grid).expect("decode 1");
    assert_eq!(second.get("foo"), Some(&ParamValue::Number(0.0)));
    assert_eq!(second.get("bar"), Some(&bar[1]));

    let fifth = decode(TaskIndex::from_raw(4), &grid).expect("decode 4");
    assert_eq!(fifth.get("foo"), Some(&ParamValue::Number(1.0)));
    assert_eq!(fifth.get("bar"), Some(&bar[0]));

    assert_eq!(digits(TaskIndex::from_raw(23), &grid).expect("digits"), vec![5, 3]);
}

#[test]
fn every_index_round_trips_on_the_example_grid() {
    let grid = foo_bar_grid();
    let mut seen = Vec::new();
    for index in grid.indices() {
        let combination = grid.decode(index).expect("decode");
        assert_eq!(grid.encode(&combination).expect("encode"), index);
        assert!(!seen.contains(&combination));
        seen.push(combination);
    }
    assert_eq!(seen.len(), 24);
}

#[test]
fn index_past_the_end_is_rejected() {
    let grid = foo_bar_grid();
    let err = decode(TaskIndex::from_raw(24), &grid).expect_err("out of range");
    assert!(matches!(err, SweepError::IndexOutOfRange(_)));
    assert_eq!(err.info().context.get("size").map(String::as_str), Some("24"));
}

#[test]
fn values_must_match_exactly() {
    let grid = foo_bar_grid();
    let bar = grid.axis("bar").expect("bar").values[0].clone();
    let near = Combination::new(vec![
        ("foo".to_string(), ParamValue::Number(1.0000001)),
        ("bar".to_string(), bar.clone()),
    ]);
    let err = encode(&near, &grid).expect_err("unknown");
    assert!(matches!(err, SweepError::UnknownValue(_)));
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("foo"));

    let textual = Combination::new(vec![
        ("foo".to_string(), ParamValue::from("1")),
        ("bar".to_string(), bar),
    ]);
    assert!(matches!(
        encode(&textual, &grid),
        Err(SweepError::UnknownValue(_))
    ));
}

#[test]
fn combination_must_cover_the_grid() {
    let grid = foo_bar_grid();
    let partial = Combination::new(vec![("foo".to_string(), ParamValue::Number(1.0))]);
    assert_eq!(
        encode(&partial, &grid).expect_err("arity").code(),
        "combination_arity"
    );
    let misnamed = Combination::new(vec![
        ("foo".to_string(), ParamValue::Number(1.0)),
        ("baz".to_string(), ParamValue::Number(0.01)),
    ]);
    assert_eq!(
        encode(&misnamed, &grid).expect_err("missing").code(),
        "combination_missing"
    );
}

proptest! {
    #[test]
    fn decode_then_encode_is_identity(
        radices in proptest::collection::vec(1usize..6, 0..5),
        seed in any::<usize>(),
    ) {
        let grid = grid_with_radices(&radices);
        let index = TaskIndex::from_raw(seed % grid.size());
        let combination = decode(index, &grid).unwrap();
        prop_assert_eq!(encode(&combination, &grid).unwrap(), index);
    }

    #[test]
    fn encode_then_decode_is_identity(
        picks in proptest::collection::vec((1usize..6, any::<usize>()), 0..5),
    ) {
        let radices: Vec<usize> = picks.iter().map(|(radix, _)| *radix).collect();
        let grid = grid_with_radices(&radices);
        let combination: Combination = grid
            .axes()
            .iter()
            .zip(&picks)
            .map(|(axis, (radix, pick))| (axis.name().to_string(), axis.values[pick % radix].clone()))
            .collect();
        let index = encode(&combination, &grid).unwrap();
        prop_assert!(index.as_raw() < grid.size());
        prop_assert_eq!(decode(index, &grid).unwrap(), combination);
    }
}
