//! Static shape checks for rule bodies.
//!
//! Validation is strict where evaluation is lenient: an unknown condition
//! type is an error here but a silent no-op when a stored rule is evaluated.
//! Operators are only checked for presence; whether an operator suits its
//! condition type is left to evaluation.
//!
//! Conditions are numbered from 1 in messages.

use serde_json::Value;
use tasktree_model::RuleData;
use thiserror::Error;

use crate::condition::ConditionType;
use crate::op::is_no_value_operator;

/// Longest accepted rule name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// One structural problem with a rule body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Rules must be a dictionary")]
    NotAnObject,

    #[error("Conditions must be a list")]
    ConditionsNotAList,

    #[error("Logic must be 'AND' or 'OR'")]
    InvalidLogic,

    #[error("Condition {index} must be a dictionary")]
    ConditionNotAnObject { index: usize },

    #[error("Condition {index} missing 'type' field")]
    MissingType { index: usize },

    #[error("Condition {index} has invalid type: {kind}")]
    InvalidType { index: usize, kind: String },

    #[error("Condition {index} missing 'operator' field")]
    MissingOperator { index: usize },

    #[error("Condition {index} 'values' must be a list")]
    ValuesNotAList { index: usize },

    #[error("Condition {index} must have non-empty 'values' list")]
    MissingValues { index: usize },

    #[error("Name must be between 1 and {MAX_NAME_LEN} characters")]
    InvalidName,
}

/// Validates a typed rule body.
pub fn validate(data: &RuleData) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (i, condition) in data.conditions.iter().enumerate() {
        check_condition(
            i + 1,
            Some(condition.kind.as_str()),
            Some(condition.operator.as_str()),
            Some(condition.values.len()),
            &mut errors,
        );
    }
    errors
}

/// Validates a rule body as it arrives over the wire.
pub fn validate_json(rules: &Value) -> Vec<ValidationError> {
    let Some(rules) = rules.as_object() else {
        return vec![ValidationError::NotAnObject];
    };

    let conditions = match rules.get("conditions") {
        None => &[][..],
        Some(Value::Array(conditions)) => conditions.as_slice(),
        Some(_) => return vec![ValidationError::ConditionsNotAList],
    };

    let mut errors = Vec::new();
    match rules.get("logic") {
        None => {}
        Some(Value::String(logic)) if logic == "AND" || logic == "OR" => {}
        Some(_) => errors.push(ValidationError::InvalidLogic),
    }

    for (i, condition) in conditions.iter().enumerate() {
        let index = i + 1;
        let Some(condition) = condition.as_object() else {
            errors.push(ValidationError::ConditionNotAnObject { index });
            continue;
        };
        let kind = match condition.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(kind)) => Some(kind.clone()),
            Some(other) => Some(other.to_string()),
        };
        let operator = match condition.get("operator") {
            None | Some(Value::Null) => None,
            Some(Value::String(op)) => Some(op.clone()),
            Some(other) => Some(other.to_string()),
        };
        let values_len = match condition.get("values") {
            None => Some(0),
            Some(Value::Array(values)) => Some(values.len()),
            Some(_) => None,
        };
        check_condition(index, kind.as_deref(), operator.as_deref(), values_len, &mut errors);
    }
    errors
}

fn check_condition(
    index: usize,
    kind: Option<&str>,
    operator: Option<&str>,
    values_len: Option<usize>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(kind) = kind.filter(|k| !k.is_empty()) else {
        errors.push(ValidationError::MissingType { index });
        return;
    };
    if kind.parse::<ConditionType>().is_err() {
        errors.push(ValidationError::InvalidType {
            index,
            kind: kind.to_string(),
        });
    }
    let Some(operator) = operator.filter(|op| !op.is_empty()) else {
        errors.push(ValidationError::MissingOperator { index });
        return;
    };
    match values_len {
        None => errors.push(ValidationError::ValuesNotAList { index }),
        Some(0) if !is_no_value_operator(operator) => {
            errors.push(ValidationError::MissingValues { index })
        }
        Some(_) => {}
    }
}

/// Checks a rule name's length.
pub fn validate_name(name: &str) -> Option<ValidationError> {
    let len = name.chars().count();
    (len == 0 || len > MAX_NAME_LEN).then_some(ValidationError::InvalidName)
}
