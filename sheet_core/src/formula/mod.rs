//! Formula engine - `@variable` substitution plus dice/arithmetic evaluation
//!
//! Evaluation is two-phase: every `@path` is replaced with its literal value,
//! then the fully-numeric string is parsed and evaluated. Dice terms roll
//! through an injected [`DiceRoller`], so a fixed roller makes evaluation
//! deterministic.

pub mod dice;
mod parser;
mod substitute;

pub use dice::{roll_dice, thread_roller, DiceRoller, RngRoller};
pub use parser::{parse, Expr, Function};
pub use substitute::{format_value, referenced_variables, substitute_variables, VariableLookup};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Formula evaluation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("unknown variable '@{0}'")]
    UnknownVariable(String),
    #[error("unexpected token '{token}' at {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{function} expects {expected} argument(s), found {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid dice term '{0}'")]
    InvalidDice(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Result of evaluating a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaResult {
    pub value: f64,
    /// The expression after substitution, for tooltips
    pub substituted: String,
}

/// Relational operator used by switch cases and conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparison {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparison {
    pub fn compare(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Gt => left > right,
            Comparison::Le => left <= right,
            Comparison::Ge => left >= right,
        }
    }

    /// Non-numeric operands only support equality checks
    pub fn compare_text(&self, left: &str, right: &str) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            _ => false,
        }
    }
}

/// One case of a switch formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub case_value: String,
    #[serde(default)]
    pub operator: Comparison,
    pub result_expression: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SwitchCasesRepr {
    List(Vec<SwitchCase>),
    /// Older packs store cases as a `{ value: result }` map
    Legacy(BTreeMap<String, String>),
}

fn deserialize_cases<'de, D>(deserializer: D) -> Result<Vec<SwitchCase>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match SwitchCasesRepr::deserialize(deserializer)? {
        SwitchCasesRepr::List(cases) => cases,
        SwitchCasesRepr::Legacy(map) => map
            .into_iter()
            .map(|(case_value, result_expression)| SwitchCase {
                case_value,
                operator: Comparison::Eq,
                result_expression,
            })
            .collect(),
    })
}

/// Conditional formula: the first matching case's expression is evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchFormula {
    pub switch_expression: String,
    #[serde(deserialize_with = "deserialize_cases")]
    pub cases: Vec<SwitchCase>,
    pub default_value: String,
}

/// A formula as declared by content
///
/// Deserializes from a bare string or number, `{ "expression": ... }`, or a
/// switch object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "FormulaRepr")]
pub enum Formula {
    Switch(SwitchFormula),
    Normal { expression: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormulaRepr {
    Text(String),
    Number(f64),
    Switch(SwitchFormula),
    Normal { expression: String },
}

impl From<FormulaRepr> for Formula {
    fn from(repr: FormulaRepr) -> Self {
        match repr {
            FormulaRepr::Text(expression) | FormulaRepr::Normal { expression } => {
                Formula::Normal { expression }
            }
            FormulaRepr::Number(value) => Formula::constant(value),
            FormulaRepr::Switch(switch) => Formula::Switch(switch),
        }
    }
}

impl From<&str> for Formula {
    fn from(expression: &str) -> Self {
        Formula::Normal {
            expression: expression.to_string(),
        }
    }
}

impl Default for Formula {
    fn default() -> Self {
        Formula::constant(0.0)
    }
}

impl Formula {
    pub fn constant(value: f64) -> Self {
        Formula::Normal {
            expression: format_value(value),
        }
    }

    /// Display text of the formula before substitution
    pub fn source_text(&self) -> &str {
        match self {
            Formula::Normal { expression } => expression,
            Formula::Switch(switch) => &switch.switch_expression,
        }
    }

    /// Evaluate against a variable store, rolling dice through `roller`
    pub fn evaluate(
        &self,
        variables: &dyn VariableLookup,
        roller: &dyn DiceRoller,
    ) -> Result<FormulaResult, FormulaError> {
        match self {
            Formula::Normal { expression } => evaluate(expression, variables, roller),
            Formula::Switch(switch) => {
                let expression = select_switch_case(switch, variables, roller)?;
                evaluate(expression, variables, roller)
            }
        }
    }

    /// `customVariable.<id>` references, as bare ids in first-seen order
    pub fn custom_variable_dependencies(&self) -> Vec<String> {
        let texts: Vec<&str> = match self {
            Formula::Normal { expression } => vec![expression.as_str()],
            Formula::Switch(switch) => {
                let mut texts = vec![switch.switch_expression.as_str()];
                for case in &switch.cases {
                    texts.push(case.case_value.as_str());
                    texts.push(case.result_expression.as_str());
                }
                texts.push(switch.default_value.as_str());
                texts
            }
        };

        let mut dependencies: Vec<String> = Vec::new();
        for text in texts {
            for path in referenced_variables(text) {
                if let Some(id) = path.strip_prefix("customVariable.") {
                    if !dependencies.iter().any(|dep| dep == id) {
                        dependencies.push(id.to_string());
                    }
                }
            }
        }
        dependencies
    }
}

/// Pick the result expression of the first case that matches
fn select_switch_case<'a>(
    switch: &'a SwitchFormula,
    variables: &dyn VariableLookup,
    roller: &dyn DiceRoller,
) -> Result<&'a str, FormulaError> {
    let left_text = substitute_variables(&switch.switch_expression, variables)?;
    let left = numeric_value(&left_text, roller);

    for case in &switch.cases {
        let right_text = substitute_variables(&case.case_value, variables)?;
        let matched = match (left, numeric_value(&right_text, roller)) {
            (Some(l), Some(r)) => case.operator.compare(l, r),
            _ => case.operator.compare_text(left_text.trim(), right_text.trim()),
        };
        if matched {
            return Ok(&case.result_expression);
        }
    }

    Ok(&switch.default_value)
}

fn numeric_value(text: &str, roller: &dyn DiceRoller) -> Option<f64> {
    parse(text).ok()?.evaluate(roller).ok()
}

/// Substitute then evaluate a single expression
pub fn evaluate(
    expression: &str,
    variables: &dyn VariableLookup,
    roller: &dyn DiceRoller,
) -> Result<FormulaResult, FormulaError> {
    let substituted = substitute_variables(expression, variables)?;
    let value = parse(&substituted)?.evaluate(roller)?;
    Ok(FormulaResult { value, substituted })
}

/// Evaluate using any `rand` generator for dice
pub fn evaluate_with_rng(
    expression: &str,
    variables: &dyn VariableLookup,
    rng: &mut impl Rng,
) -> Result<FormulaResult, FormulaError> {
    let roller = RngRoller::new(rng);
    evaluate(expression, variables, &roller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vars(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_dice_plus_level_with_fixed_roller() {
        let variables = vars(&[("level", 5.0)]);
        let roller = |_min: i64, _max: i64| 1;
        let result = evaluate("1d1 + @level", &variables, &roller).unwrap();
        assert_eq!(result.substituted, "1d1 + 5");
        assert!((result.value - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_floor_of_level() {
        let variables = vars(&[("level", 7.0)]);
        let roller = |_min: i64, _max: i64| 1;
        let result = evaluate("floor(@level / 2)", &variables, &roller).unwrap();
        assert!((result.value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_variable_surfaces() {
        let variables = vars(&[]);
        let roller = |_min: i64, _max: i64| 1;
        let err = evaluate("@nope + 1", &variables, &roller).unwrap_err();
        assert_eq!(err, FormulaError::UnknownVariable("nope".to_string()));
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let variables = vars(&[("ability.strength.modifier", 3.0)]);
        let mut first = StdRng::seed_from_u64(12345);
        let mut second = StdRng::seed_from_u64(12345);
        let a = evaluate_with_rng("4d6 + @ability.strength.modifier", &variables, &mut first).unwrap();
        let b = evaluate_with_rng("4d6 + @ability.strength.modifier", &variables, &mut second).unwrap();
        assert_eq!(a, b);
        assert!(a.value >= 7.0 && a.value <= 27.0);
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_result(
            seed in any::<u64>(),
            count in 1u32..6,
            sides in 1u32..21,
            bonus in -5i32..6,
        ) {
            let variables = vars(&[("level", f64::from(bonus))]);
            let expression = format!("{}d{} + @level", count, sides);
            let first = RngRoller::new(StdRng::seed_from_u64(seed));
            let second = RngRoller::new(StdRng::seed_from_u64(seed));

            let a = evaluate(&expression, &variables, &first).unwrap();
            let b = evaluate(&expression, &variables, &second).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert!(a.value >= f64::from(count) + f64::from(bonus));
            prop_assert!(a.value <= f64::from(count * sides) + f64::from(bonus));
        }
    }

    #[test]
    fn test_formula_deserialize_shapes() {
        let text: Formula = serde_json::from_str("\"@level + 1\"").unwrap();
        assert_eq!(text, Formula::from("@level + 1"));

        let number: Formula = serde_json::from_str("3").unwrap();
        assert_eq!(number, Formula::from("3"));

        let normal: Formula = serde_json::from_str(r#"{"expression": "2d6"}"#).unwrap();
        assert_eq!(normal, Formula::from("2d6"));

        let switch: Formula = serde_json::from_str(
            r#"{
                "type": "switch",
                "switch_expression": "@level",
                "cases": [
                    {"case_value": "5", "operator": ">=", "result_expression": "3"},
                    {"case_value": "3", "operator": ">=", "result_expression": "2"}
                ],
                "default_value": "0"
            }"#,
        )
        .unwrap();
        assert!(matches!(switch, Formula::Switch(ref s) if s.cases.len() == 2));
    }

    #[test]
    fn test_switch_first_match_wins() {
        let formula = Formula::Switch(SwitchFormula {
            switch_expression: "@level".to_string(),
            cases: vec![
                SwitchCase {
                    case_value: "5".into(),
                    operator: Comparison::Ge,
                    result_expression: "3".into(),
                },
                SwitchCase {
                    case_value: "3".into(),
                    operator: Comparison::Ge,
                    result_expression: "2".into(),
                },
                SwitchCase {
                    case_value: "1".into(),
                    operator: Comparison::Ge,
                    result_expression: "1".into(),
                },
            ],
            default_value: "0".into(),
        });
        let roller = |_min: i64, _max: i64| 1;

        let at_four = formula.evaluate(&vars(&[("level", 4.0)]), &roller).unwrap();
        assert!((at_four.value - 2.0).abs() < f64::EPSILON);

        let at_zero = formula.evaluate(&vars(&[("level", 0.0)]), &roller).unwrap();
        assert!((at_zero.value - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_legacy_switch_cases() {
        let formula: Formula = serde_json::from_str(
            r#"{
                "switch_expression": "@weapon.size",
                "cases": {"2": "1d4", "3": "1d6"},
                "default_value": "1d3"
            }"#,
        )
        .unwrap();
        let roller = |_min: i64, max: i64| max;
        let result = formula.evaluate(&vars(&[("weapon.size", 3.0)]), &roller).unwrap();
        assert!((result.value - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_variable_dependencies() {
        let formula = Formula::from("@customVariable.sneak + @customVariable.bonus * @level");
        assert_eq!(
            formula.custom_variable_dependencies(),
            vec!["sneak".to_string(), "bonus".to_string()]
        );
    }
}
