//! IR loader and build-variant tests.

use sinkhound::ir::builder::ProgramBuilder;
use sinkhound::ir::loader::{load_program, restrict_to_initial, validate, LoadError, PROGRAM_FILE};
use sinkhound::ir::{Instr, Signature};

fn sample_json() -> String {
    let mut b = ProgramBuilder::new();
    b.add_package("main", "example.com/cmd", &["example.com/util"]);
    b.add_package("util", "example.com/util", &[]);
    let main_fn = b.add_function("example.com/cmd", "main", Signature::default());
    let helper = b.add_function(
        "example.com/util",
        "Join",
        Signature::new(vec!["string"], vec!["string"]),
    );
    b.set_instrs(main_fn, vec![Instr::call(helper)]);
    serde_json::to_string_pretty(&b.build()).unwrap()
}

#[test]
fn loads_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    std::fs::write(&path, sample_json()).unwrap();

    let program = load_program(&path).unwrap();
    assert_eq!(program.packages().len(), 2);
    assert_eq!(program.functions().len(), 2);
    assert_eq!(program.functions()[0].name, "main");
}

#[test]
fn loads_program_json_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PROGRAM_FILE), sample_json()).unwrap();

    let program = load_program(dir.path()).unwrap();
    assert_eq!(program.packages().len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_program(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn garbage_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = load_program(&path).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
}

#[test]
fn dangling_callee_fails_validation() {
    let json = r#"{
        "packages": [
            {"name": "main", "path": "example.com/cmd", "members": [{"kind": "function", "func": 0}]}
        ],
        "functions": [
            {"name": "main", "package": "example.com/cmd",
             "blocks": [{"instrs": [{"op": "call", "callee": 42}]}]}
        ]
    }"#;
    let program: sinkhound::ir::Program = serde_json::from_str(json).unwrap();
    let err = validate(&program).unwrap_err();
    assert!(matches!(err, LoadError::Invalid(_)));
}

#[test]
fn duplicate_package_path_fails_validation() {
    let mut b = ProgramBuilder::new();
    b.add_package("a", "example.com/a", &[]);
    let mut program = b.build();
    let dup = program.packages[0].clone();
    program.packages.push(dup);
    assert!(matches!(
        validate(&program).unwrap_err(),
        LoadError::Invalid(_)
    ));
}

#[test]
fn default_variant_keeps_only_main_and_imports() {
    let mut b = ProgramBuilder::new();
    b.add_package("main", "example.com/cmd", &["example.com/used"]);
    b.add_package("used", "example.com/used", &["example.com/deep"]);
    b.add_package("deep", "example.com/deep", &[]);
    b.add_package("stray", "example.com/stray", &[]);
    let program = restrict_to_initial(b.build(), None);

    let paths: Vec<_> = program.packages().iter().map(|p| p.path.as_str()).collect();
    assert!(paths.contains(&"example.com/cmd"));
    assert!(paths.contains(&"example.com/used"));
    assert!(paths.contains(&"example.com/deep"));
    assert!(!paths.contains(&"example.com/stray"));
}

#[test]
fn entry_override_roots_the_restriction() {
    let mut b = ProgramBuilder::new();
    b.add_package("svc", "example.com/svc", &["example.com/dep"]);
    b.add_package("dep", "example.com/dep", &[]);
    b.add_package("stray", "example.com/stray", &[]);
    let program = restrict_to_initial(b.build(), Some("example.com/svc"));

    let paths: Vec<_> = program.packages().iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["example.com/svc", "example.com/dep"]);
}

#[test]
fn instruction_shapes_round_trip_through_json() {
    use sinkhound::ir::{Block, Operand};

    let mut b = ProgramBuilder::new();
    b.add_package("main", "example.com/cmd", &[]);
    let main_fn = b.add_function("example.com/cmd", "main", Signature::default());
    let target = b.add_function(
        "example.com/cmd",
        "target",
        Signature::new(vec!["string"], Vec::<String>::new()),
    );
    b.set_body(
        main_fn,
        vec![Block::new(vec![
            Instr::call_with_args(target, vec![Operand::cast_func(target)]),
            Instr::Store {
                value: Operand::cast_func(target),
            },
            Instr::ChangeType {
                value: Operand::func(target),
            },
            Instr::Slice {
                value: Operand::Opaque,
            },
            Instr::Opaque,
            Instr::Call {
                callee: None,
                args: vec![],
            },
        ])],
    );
    let program = b.build();

    let json = serde_json::to_string(&program).unwrap();
    let back: sinkhound::ir::Program = serde_json::from_str(&json).unwrap();
    validate(&back).unwrap();
    let blocks = back.functions()[0].blocks.as_ref().unwrap();
    assert_eq!(blocks[0].instrs.len(), 6);
    assert_eq!(
        blocks[0].instrs[1].wrapped_function(),
        Some(target)
    );
}
