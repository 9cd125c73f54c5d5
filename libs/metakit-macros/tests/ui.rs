#[test]
fn ui() {
    let t = trybuild::TestCases::new();
    // Passing cases (compiled and run)
    t.pass("tests/ui/pass/*.rs");
}
