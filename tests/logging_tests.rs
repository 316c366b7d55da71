use chatsum::setup_logging;

#[test]
fn test_logging_setup() {
    let result = std::panic::catch_unwind(|| {
        setup_logging();
    });
    assert!(result.is_ok(), "setup_logging function should not panic");
}

#[test]
fn test_logging_setup_twice() {
    setup_logging();
    let result = std::panic::catch_unwind(|| {
        setup_logging();
    });
    assert!(result.is_ok(), "a second setup_logging call should be a no-op");
}
