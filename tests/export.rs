use haaspost::{
    export, Command, CoolantMode, Destination, ExportError, Operation, PathNode, ToolDescriptor,
    ToolType,
};
use pretty_assertions::assert_eq;

fn operation(label: &str, blocks: &[&str]) -> Operation {
    let commands = blocks.iter().map(|b| Command::parse(b).unwrap()).collect();
    Operation::new(label, commands)
}

fn tapping_job() -> Vec<PathNode> {
    let mut tap = operation(
        "Tap M6",
        &["M6 T4", "M3 S500", "G0 X10 Y10 Z5", "G81 X10 Y10 Z-10 R2 F1.5"],
    );
    tap.tool = Some(ToolDescriptor::new(4, ToolType::Tap));
    tap.coolant_mode = Some(CoolantMode::Flood);

    vec![PathNode::Group {
        label: "Job".to_string(),
        children: vec![
            operation("Fixture", &["G0 X0 Y0", "G54"]).into(),
            tap.into(),
        ],
    }]
}

#[test]
fn test_tapping_job_to_stdout() {
    let gcode = export(
        &tapping_job(),
        &Destination::from("-"),
        "--no-header --no-comments --preamble=G90 --postamble=M30",
        None,
    )
    .unwrap();

    let expected = "\
G90
G21
G54
M8
M5
M6 T4
G43 H4
G0 X10.000 Y10.000 Z5.000
G95
M29 S500
G84 Z-10.000 R2.000 F1.500
G80
G94
M9
M30
%
";
    assert_eq!(gcode, expected);
}

#[test]
fn test_export_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.nc");
    let destination = Destination::File(path.clone());

    let gcode = export(&tapping_job(), &destination, "--inches --line-numbers", None).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, gcode);
    assert!(written.starts_with("%\nO\n"));
    assert!(written.contains("G20"));
    assert!(written.contains("G84 Z-0.3937 R0.0787 F0.0591"));
}

#[test]
fn test_non_path_rejected_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.nc");
    let nodes = vec![PathNode::Other {
        name: "Stock".to_string(),
    }];

    let err = export(&nodes, &Destination::File(path.clone()), "", None).unwrap_err();
    assert!(matches!(err, ExportError::NotAPath(_)));
    assert!(!path.exists());
}
