use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperation {
    EqualTo,
    DistinctTo,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    Like,
    NotContains,
    NotStartsWith,
    NotEndsWith,
    NotLike,
    IsIn,
    IsNotIn,
}

impl FilterOperation {
    /// Operations whose value is a list of candidates rather than a scalar.
    pub fn is_list(self) -> bool {
        matches!(self, FilterOperation::IsIn | FilterOperation::IsNotIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterGroupOperation {
    And,
    Or,
}

/// Category of a token used to pick the filter operations it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    Integer,
    Decimal,
    String,
    DateTime,
    Time,
    Lite,
    Embedded,
    Boolean,
    Enum,
    Guid,
}

const STRING_OPERATIONS: &[FilterOperation] = &[
    FilterOperation::Contains,
    FilterOperation::EqualTo,
    FilterOperation::StartsWith,
    FilterOperation::EndsWith,
    FilterOperation::Like,
    FilterOperation::NotContains,
    FilterOperation::DistinctTo,
    FilterOperation::NotStartsWith,
    FilterOperation::NotEndsWith,
    FilterOperation::NotLike,
    FilterOperation::IsIn,
    FilterOperation::IsNotIn,
];

const RELATIONAL_OPERATIONS: &[FilterOperation] = &[
    FilterOperation::EqualTo,
    FilterOperation::DistinctTo,
    FilterOperation::GreaterThan,
    FilterOperation::GreaterThanOrEqual,
    FilterOperation::LessThan,
    FilterOperation::LessThanOrEqual,
    FilterOperation::IsIn,
    FilterOperation::IsNotIn,
];

const IDENTITY_OPERATIONS: &[FilterOperation] = &[
    FilterOperation::EqualTo,
    FilterOperation::DistinctTo,
    FilterOperation::IsIn,
    FilterOperation::IsNotIn,
];

const EQUALITY_OPERATIONS: &[FilterOperation] =
    &[FilterOperation::EqualTo, FilterOperation::DistinctTo];

impl FilterType {
    /// Operations a filter on a token of this type may use, in menu order.
    pub fn operations(self) -> &'static [FilterOperation] {
        match self {
            FilterType::String => STRING_OPERATIONS,
            FilterType::Integer
            | FilterType::Decimal
            | FilterType::DateTime
            | FilterType::Time
            | FilterType::Enum => RELATIONAL_OPERATIONS,
            FilterType::Guid | FilterType::Lite => IDENTITY_OPERATIONS,
            FilterType::Embedded | FilterType::Boolean => EQUALITY_OPERATIONS,
        }
    }

    pub fn allows(self, operation: FilterOperation) -> bool {
        self.operations().contains(&operation)
    }
}

pub fn is_list(operation: FilterOperation) -> bool {
    operation.is_list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_allows_text_matching() {
        assert!(FilterType::String.allows(FilterOperation::Like));
        assert!(FilterType::String.allows(FilterOperation::NotEndsWith));
        assert!(!FilterType::String.allows(FilterOperation::GreaterThan));
        assert_eq!(FilterType::String.operations().len(), 12);
    }

    #[test]
    fn relational_types_share_operations() {
        for ft in [
            FilterType::Integer,
            FilterType::Decimal,
            FilterType::DateTime,
            FilterType::Enum,
        ] {
            assert!(ft.allows(FilterOperation::LessThanOrEqual));
            assert!(ft.allows(FilterOperation::IsNotIn));
            assert!(!ft.allows(FilterOperation::Contains));
        }
    }

    #[test]
    fn identity_types_have_no_ordering() {
        assert!(FilterType::Lite.allows(FilterOperation::IsIn));
        assert!(!FilterType::Lite.allows(FilterOperation::GreaterThan));
        assert!(!FilterType::Guid.allows(FilterOperation::LessThan));
    }

    #[test]
    fn embedded_and_boolean_only_compare() {
        assert_eq!(
            FilterType::Boolean.operations(),
            &[FilterOperation::EqualTo, FilterOperation::DistinctTo]
        );
        assert!(!FilterType::Embedded.allows(FilterOperation::IsIn));
    }

    #[test]
    fn list_operations() {
        assert!(is_list(FilterOperation::IsIn));
        assert!(is_list(FilterOperation::IsNotIn));
        assert!(!is_list(FilterOperation::EqualTo));
    }
}
