//! Unit tests for Value and entity ids

use core_types::{FunctionId, ObjectId, TypeId, Value};

#[cfg(test)]
mod value_identity_tests {
    use super::*;

    #[test]
    fn test_object_identity_is_by_id() {
        assert_eq!(Value::Object(ObjectId(3)), Value::Object(ObjectId(3)));
        assert_ne!(Value::Object(ObjectId(3)), Value::Object(ObjectId(4)));
    }

    #[test]
    fn test_distinct_kinds_never_equal() {
        assert_ne!(Value::Object(ObjectId(1)), Value::Type(TypeId(1)));
        assert_ne!(Value::Function(FunctionId(1)), Value::Int(1));
    }

    #[test]
    fn test_strings_compare_by_content() {
        assert_eq!(Value::str("abc"), Value::str("abc"));
        assert_ne!(Value::str("abc"), Value::str("abd"));
    }

    #[test]
    fn test_as_object_and_function() {
        assert_eq!(Value::Object(ObjectId(7)).as_object(), Some(ObjectId(7)));
        assert_eq!(Value::Int(7).as_object(), None);
        assert_eq!(
            Value::Function(FunctionId(2)).as_function(),
            Some(FunctionId(2))
        );
    }
}

#[cfg(test)]
mod value_display_tests {
    use super::*;

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Int(-5).to_string(), "-5");
        assert_eq!(Value::str("hi").to_string(), "hi");
    }

    #[test]
    fn test_display_bound_method() {
        let v = Value::BoundMethod {
            function: FunctionId(1),
            receiver: ObjectId(9),
        };
        assert_eq!(v.to_string(), "<bound method #1 of object #9>");
    }
}
