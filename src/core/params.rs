//! Parameter specifications and the parameter binder
//!
//! Binding validates the trailing tokens of a matched command against the
//! node's ordered [`ParamSpec`] list and converts them into typed values.
//! It has no side effects beyond producing the bound map or an error.

use crate::error::ParameterError;
use crate::utils::tokenizer::{Token, texts};
use indexmap::IndexMap;
use std::fmt;
use tracing::{debug, instrument};

/// Value kind accepted by a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Any token, verbatim
    String,
    /// Base-10 integer within inclusive bounds
    Integer { min: i64, max: i64 },
    /// One of a fixed set of words, matched exactly
    Enum(Vec<String>),
    /// All remaining tokens as one ordered list
    Vararg,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer { min, max } => write!(f, "integer {min}..{max}"),
            Self::Enum(allowed) => write!(f, "one of {}", allowed.join("|")),
            Self::Vararg => write!(f, "text"),
        }
    }
}

/// Declarative description of one expected argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    /// Required parameter of the given kind
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, ParamKind::Integer { min, max })
    }

    pub fn one_of<I, S>(name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ParamKind::Enum(allowed.into_iter().map(Into::into).collect()))
    }

    pub fn vararg(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Vararg)
    }

    /// Mark the parameter optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn is_vararg(&self) -> bool {
        matches!(self.kind, ParamKind::Vararg)
    }

    /// Usage fragment such as `<vlan>` or `[words...]`
    pub fn usage(&self) -> String {
        let body = if self.is_vararg() {
            format!("{}...", self.name)
        } else {
            self.name.clone()
        };
        if self.required {
            format!("<{body}>")
        } else {
            format!("[{body}]")
        }
    }
}

/// Check the ordering rules of a parameter list.
///
/// At most one vararg, only in last position; required entries precede
/// optional ones; names are unique; integer bounds are ordered; enums are
/// non-empty. Returns the reason on failure.
pub fn validate_specs(specs: &[ParamSpec]) -> Result<(), String> {
    let mut seen_optional = false;
    for (idx, spec) in specs.iter().enumerate() {
        if spec.name.is_empty() {
            return Err(format!("parameter #{} has an empty name", idx + 1));
        }
        if specs[..idx].iter().any(|s| s.name == spec.name) {
            return Err(format!("duplicate parameter name '{}'", spec.name));
        }
        if spec.is_vararg() && idx + 1 != specs.len() {
            return Err(format!("vararg '{}' must be the last parameter", spec.name));
        }
        if spec.required && seen_optional {
            return Err(format!(
                "required parameter '{}' follows an optional one",
                spec.name
            ));
        }
        match &spec.kind {
            ParamKind::Integer { min, max } if min > max => {
                return Err(format!("'{}' has min {min} above max {max}", spec.name));
            }
            ParamKind::Enum(allowed) if allowed.is_empty() => {
                return Err(format!("enum '{}' allows no values", spec.name));
            }
            _ => {}
        }
        seen_optional |= !spec.required;
    }
    Ok(())
}

/// A bound, typed parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    List(Vec<String>),
}

/// Parameter values keyed by spec name, in spec order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundParams {
    values: IndexMap<String, ParamValue>,
}

impl BoundParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// String or enum value
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name)? {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }
}

/// Bind `tokens` to `specs` in order.
///
/// `end_offset` is the byte length of the source line; it positions
/// `MissingParameter` errors past the last token.
#[instrument(level = "debug", skip(specs, tokens), fields(specs = specs.len(), tokens = tokens.len()))]
pub fn bind(
    specs: &[ParamSpec],
    tokens: &[Token],
    end_offset: usize,
) -> Result<BoundParams, ParameterError> {
    let mut bound = BoundParams::new();
    let mut rest = tokens;

    for spec in specs {
        if spec.is_vararg() {
            if rest.is_empty() && spec.required {
                return Err(ParameterError::MissingParameter {
                    spec_name: spec.name.clone(),
                    position: end_offset,
                });
            }
            bound.insert(&spec.name, ParamValue::List(texts(rest)));
            rest = &[];
            continue;
        }

        let Some((token, tail)) = rest.split_first() else {
            if spec.required {
                return Err(ParameterError::MissingParameter {
                    spec_name: spec.name.clone(),
                    position: end_offset,
                });
            }
            continue;
        };

        let value = convert(spec, token)?;
        bound.insert(&spec.name, value);
        rest = tail;
    }

    if let Some(first) = rest.first() {
        return Err(ParameterError::ExtraArguments {
            tokens: texts(rest),
            position: first.offset,
        });
    }

    debug!("Bound {} parameter(s)", bound.len());
    Ok(bound)
}

fn convert(spec: &ParamSpec, token: &Token) -> Result<ParamValue, ParameterError> {
    match &spec.kind {
        ParamKind::String => Ok(ParamValue::Str(token.text.clone())),
        ParamKind::Integer { min, max } => {
            let out_of_range = || ParameterError::OutOfRange {
                token: token.text.clone(),
                min: *min,
                max: *max,
                position: token.offset,
            };
            let value: i64 = match token.text.parse() {
                Ok(value) => value,
                // well-formed decimal that overflows i64
                Err(_) if is_decimal(&token.text) => return Err(out_of_range()),
                Err(_) => {
                    return Err(ParameterError::InvalidParameter {
                        token: token.text.clone(),
                        expected_kind: spec.kind.to_string(),
                        position: token.offset,
                    });
                }
            };
            if value < *min || value > *max {
                return Err(out_of_range());
            }
            Ok(ParamValue::Int(value))
        }
        ParamKind::Enum(allowed) => {
            if allowed.iter().any(|a| *a == token.text) {
                Ok(ParamValue::Str(token.text.clone()))
            } else {
                Err(ParameterError::InvalidParameter {
                    token: token.text.clone(),
                    expected_kind: spec.kind.to_string(),
                    position: token.offset,
                })
            }
        }
        ParamKind::Vararg => Ok(ParamValue::List(vec![token.text.clone()])),
    }
}

/// Optional sign followed by one or more ASCII digits
fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<Token> {
        let mut offset = 0;
        words
            .iter()
            .map(|w| {
                let token = Token::new(*w, offset);
                offset += w.len() + 1;
                token
            })
            .collect()
    }

    #[test]
    fn test_integer_overflow_is_out_of_range() {
        let specs = [ParamSpec::integer("n", 0, 100)];
        let err = bind(&specs, &toks(&["99999999999999999999"]), 20).unwrap_err();
        assert!(matches!(
            err,
            ParameterError::OutOfRange { min: 0, max: 100, ref token, .. } if token == "99999999999999999999"
        ));

        let err = bind(&specs, &toks(&["-99999999999999999999"]), 21).unwrap_err();
        assert!(matches!(err, ParameterError::OutOfRange { .. }));

        let err = bind(&specs, &toks(&["12ab"]), 4).unwrap_err();
        assert!(matches!(err, ParameterError::InvalidParameter { .. }));
        let err = bind(&specs, &toks(&["-"]), 1).unwrap_err();
        assert!(matches!(err, ParameterError::InvalidParameter { .. }));
    }

    #[test]
    fn test_integer_within_bounds() {
        let specs = [ParamSpec::integer("n", 0, 100)];
        let bound = bind(&specs, &toks(&["42"]), 2).unwrap();
        assert_eq!(bound.get_int("n"), Some(42));
    }

    #[test]
    fn test_integer_out_of_range() {
        let specs = [ParamSpec::integer("n", 0, 100)];
        let err = bind(&specs, &toks(&["200"]), 3).unwrap_err();
        assert!(matches!(
            err,
            ParameterError::OutOfRange { ref token, min: 0, max: 100, .. } if token == "200"
        ));
    }

    #[test]
    fn test_integer_unparsable() {
        let specs = [ParamSpec::integer("n", 0, 100)];
        let err = bind(&specs, &toks(&["abc"]), 3).unwrap_err();
        assert!(matches!(err, ParameterError::InvalidParameter { ref token, .. } if token == "abc"));
    }

    #[test]
    fn test_negative_integer_bounds() {
        let specs = [ParamSpec::integer("offset", -10, 10)];
        assert_eq!(bind(&specs, &toks(&["-7"]), 2).unwrap().get_int("offset"), Some(-7));
    }

    #[test]
    fn test_enum_requires_exact_value() {
        let specs = [ParamSpec::one_of("speed", ["10", "100", "auto"])];
        assert_eq!(
            bind(&specs, &toks(&["auto"]), 4).unwrap().get_str("speed"),
            Some("auto")
        );
        let err = bind(&specs, &toks(&["au"]), 2).unwrap_err();
        assert!(matches!(err, ParameterError::InvalidParameter { .. }));
    }

    #[test]
    fn test_string_is_verbatim() {
        let specs = [ParamSpec::string("name")];
        let bound = bind(&specs, &toks(&["Gi0/1"]), 5).unwrap();
        assert_eq!(bound.get_str("name"), Some("Gi0/1"));
    }

    #[test]
    fn test_missing_required_parameter() {
        let specs = [ParamSpec::string("addr"), ParamSpec::string("mask")];
        let err = bind(&specs, &toks(&["10.0.0.1"]), 20).unwrap_err();
        assert_eq!(
            err,
            ParameterError::MissingParameter {
                spec_name: "mask".to_string(),
                position: 20
            }
        );
    }

    #[test]
    fn test_optional_parameter_may_be_absent() {
        let specs = [ParamSpec::string("name"), ParamSpec::integer("count", 1, 5).optional()];
        let bound = bind(&specs, &toks(&["x"]), 1).unwrap();
        assert!(bound.contains("name"));
        assert!(!bound.contains("count"));
    }

    #[test]
    fn test_vararg_consumes_everything() {
        let specs = [ParamSpec::string("first"), ParamSpec::vararg("rest")];
        let bound = bind(&specs, &toks(&["a", "b", "c", "d"]), 7).unwrap();
        assert_eq!(bound.get_list("rest").unwrap(), ["b", "c", "d"]);
    }

    #[test]
    fn test_optional_vararg_may_be_empty() {
        let specs = [ParamSpec::vararg("words").optional()];
        let bound = bind(&specs, &[], 0).unwrap();
        assert_eq!(bound.get_list("words").unwrap().len(), 0);
    }

    #[test]
    fn test_required_vararg_needs_a_token() {
        let specs = [ParamSpec::vararg("words")];
        let err = bind(&specs, &[], 4).unwrap_err();
        assert!(matches!(err, ParameterError::MissingParameter { .. }));
    }

    #[test]
    fn test_extra_arguments() {
        let specs = [ParamSpec::string("name")];
        let err = bind(&specs, &toks(&["a", "b", "c"]), 5).unwrap_err();
        assert_eq!(
            err,
            ParameterError::ExtraArguments {
                tokens: vec!["b".to_string(), "c".to_string()],
                position: 2
            }
        );
    }

    #[test]
    fn test_no_specs_rejects_any_token() {
        let err = bind(&[], &toks(&["x"]), 1).unwrap_err();
        assert!(matches!(err, ParameterError::ExtraArguments { .. }));
    }

    #[test]
    fn test_validate_specs_ordering() {
        assert!(validate_specs(&[ParamSpec::string("a"), ParamSpec::vararg("b")]).is_ok());
        assert!(validate_specs(&[ParamSpec::vararg("a"), ParamSpec::string("b")]).is_err());
        assert!(
            validate_specs(&[ParamSpec::string("a").optional(), ParamSpec::string("b")]).is_err()
        );
        assert!(validate_specs(&[ParamSpec::string("a"), ParamSpec::string("a")]).is_err());
        assert!(validate_specs(&[ParamSpec::integer("n", 5, 1)]).is_err());
        assert!(validate_specs(&[ParamSpec::one_of("e", Vec::<String>::new())]).is_err());
    }

    #[test]
    fn test_usage_fragments() {
        assert_eq!(ParamSpec::string("name").usage(), "<name>");
        assert_eq!(ParamSpec::vararg("words").optional().usage(), "[words...]");
    }
}
