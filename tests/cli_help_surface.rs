use std::process::Command;

fn run(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_stranger-connect"))
        .args(args)
        .output()
        .expect("binary runs");
    assert!(output.status.success(), "{args:?} exited with {}", output.status);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let help = run(&["--help"]);
    for sub in ["chat", "install", "fetch"] {
        assert!(help.contains(sub), "missing {sub} in:\n{help}");
    }
    assert!(help.contains("--relay"));
}

#[test]
fn fetch_help_documents_output_flag() {
    let help = run(&["fetch", "--help"]);
    assert!(help.contains("--output"));
}
