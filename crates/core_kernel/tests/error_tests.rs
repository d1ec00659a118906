//! Tests for the port error type

use core_kernel::PortError;

#[test]
fn test_port_error_validation_field() {
    let error = PortError::validation_field("must be positive", "amount");

    match error {
        PortError::Validation { message, field } => {
            assert_eq!(message, "must be positive");
            assert_eq!(field.as_deref(), Some("amount"));
        }
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_port_error_conflict_is_not_transient() {
    let error = PortError::conflict("boleto already exists");
    assert!(!error.is_transient());
    assert!(!error.is_not_found());
}
