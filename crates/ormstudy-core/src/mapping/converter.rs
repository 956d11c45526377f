//! Attribute converters
//!
//! A converter translates one entity attribute to the column representation
//! stored in the database and back.

/// Two-way conversion between an attribute type `A` and a column type `C`
///
/// Both directions receive an `Option` because either side may be NULL.
pub trait AttributeConverter<A, C> {
    /// Attribute value to column value
    fn to_database_column(&self, attribute: Option<&A>) -> C;

    /// Column value to attribute value
    fn to_entity_attribute(&self, column: Option<&C>) -> A;
}

/// Stores booleans as `"Y"` / `"N"`
///
/// A missing attribute is written as `"N"`; any column value other than
/// `"Y"`, including NULL, reads back as `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanToYnConverter;

impl AttributeConverter<bool, String> for BooleanToYnConverter {
    fn to_database_column(&self, attribute: Option<&bool>) -> String {
        if attribute.copied().unwrap_or(false) {
            "Y".to_string()
        } else {
            "N".to_string()
        }
    }

    fn to_entity_attribute(&self, column: Option<&String>) -> bool {
        column.map(|c| c == "Y").unwrap_or(false)
    }
}
