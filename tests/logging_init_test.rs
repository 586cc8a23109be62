// Installs the global subscriber, so it runs in its own test binary.

use thumbmark::logging::{init_subscriber, LogFormat};

#[test]
fn test_second_initialization_is_an_error() {
    init_subscriber(LogFormat::Json).unwrap();
    tracing::info!("logging initialized");

    let err = init_subscriber(LogFormat::Pretty).unwrap_err();
    assert!(err.starts_with("Failed to initialize logging"));
}
