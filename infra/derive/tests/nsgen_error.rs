#[test]
fn nsgen_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/nsgen_error_pass.rs");
}
