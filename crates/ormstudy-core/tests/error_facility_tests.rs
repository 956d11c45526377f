use ormstudy_core::errors::{ExError, ExErrorKind, OrmStudyError};

#[test]
fn test_not_found_verifiable_by_kind() {
    let err = OrmStudyError::EntityNotFound {
        entity: "Member".to_string(),
        id: "42".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.entity(), Some("Member"));
    assert_eq!(ex_err.entity_id(), Some("42"));
}

#[test]
fn test_already_exists_distinct_from_not_found() {
    let err = OrmStudyError::EntityAlreadyExists {
        entity: "Member".to_string(),
        id: "id1".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::AlreadyExists);
    assert_ne!(ex_err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidInput, "ERR_INVALID_INPUT"),
        (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
        (ExErrorKind::AlreadyExists, "ERR_ALREADY_EXISTS"),
        (ExErrorKind::ConstraintViolation, "ERR_CONSTRAINT_VIOLATION"),
        (ExErrorKind::Conversion, "ERR_CONVERSION"),
        (ExErrorKind::InvalidQuery, "ERR_INVALID_QUERY"),
        (ExErrorKind::DuplicateMapping, "ERR_DUPLICATE_MAPPING"),
        (ExErrorKind::MissingMapping, "ERR_MISSING_MAPPING"),
        (ExErrorKind::UnitOfWork, "ERR_UNIT_OF_WORK"),
        (ExErrorKind::Closed, "ERR_CLOSED"),
        (ExErrorKind::Io, "ERR_IO"),
        (ExErrorKind::Serialization, "ERR_SERIALIZATION"),
        (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
        (ExErrorKind::Configuration, "ERR_CONFIGURATION"),
        (ExErrorKind::Internal, "ERR_INTERNAL"),
    ];

    let mut seen = std::collections::HashSet::new();
    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
        assert!(seen.insert(expected_code), "codes must be unique");
    }
}

#[test]
fn test_missing_mapping_conversions() {
    let cases = vec![
        OrmStudyError::NamedQueryNotFound {
            name: "Member.nope".to_string(),
        },
        OrmStudyError::EntityGraphNotFound {
            name: "Order.withAll".to_string(),
        },
        OrmStudyError::UnknownGraphAttribute {
            graph: "Order.withAll".to_string(),
            attribute: "delivery".to_string(),
        },
        OrmStudyError::ProcedureNotFound {
            name: "proc_divide".to_string(),
        },
    ];

    for err in cases {
        let ex_err: ExError = err.into();
        assert_eq!(ex_err.kind(), ExErrorKind::MissingMapping);
        assert!(ex_err.op().is_some());
    }
}

#[test]
fn test_conversion_records_attribute() {
    let err = OrmStudyError::Conversion {
        attribute: "vip".to_string(),
        value: "Q".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::Conversion);
    assert_eq!(ex_err.entity_id(), Some("vip"));
    assert!(ex_err.message().contains("\"Q\""));
}

#[test]
fn test_missing_id_is_invalid_input_on_persist() {
    let ex_err: ExError = OrmStudyError::MissingId {
        entity: "Board".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(ex_err.op(), Some("persist"));
    assert_eq!(ex_err.entity(), Some("Board"));
}

#[test]
fn test_display_format_is_stable() {
    let ex_err = ExError::new(ExErrorKind::NotFound)
        .with_op("find")
        .with_message("Member not found: 1")
        .with_entity("Member")
        .with_entity_id("1");

    assert_eq!(
        ex_err.to_string(),
        "[ERR_NOT_FOUND] in operation 'find': Member not found: 1 (entity: Member) (entity_id: 1)"
    );
}
