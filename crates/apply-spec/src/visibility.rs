use serde_json::Value;
use tracing::debug;

use crate::spec::answer::Answer;
use crate::spec::lenient::{is_truthy, number_text, parse_int_prefix, strict_eq};
use crate::spec::question::Question;

/// Answer id to whether its question is currently shown.
pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Decides whether a question is shown given every answer in the application.
///
/// Non-conditional questions are always shown. A conditional question without
/// both condition fields is never shown. Otherwise the question is shown as
/// soon as any one dependency carries its required answer.
pub fn should_show(question: Option<&Question>, answers: &[Answer]) -> bool {
    let Some(question) = question else {
        return true;
    };
    if !question.conditional {
        return true;
    }
    let (Some(dependencies), Some(required)) =
        (&question.conditionquestion, &question.conditionanswer)
    else {
        return false;
    };
    let Value::Object(required) = required else {
        return false;
    };

    for dependency in dependencies {
        let Some(answer) = answers.iter().find(|answer| {
            answer
                .expanded_question()
                .is_some_and(|dep| &dep.id == dependency)
        }) else {
            continue;
        };
        if !is_truthy(&answer.response) {
            continue;
        }
        let Some(expected) = required.get(dependency) else {
            continue;
        };
        if response_matches(&answer.response, expected) {
            debug!(question = %question.id, dependency = %dependency, "condition satisfied");
            return true;
        }
    }

    false
}

fn response_matches(response: &Value, expected: &Value) -> bool {
    match response {
        Value::String(text) => matches!(expected, Value::String(want) if want == text),
        Value::Object(map) => match map.get("selected") {
            Some(Value::Number(selected)) => {
                let selected = number_text(selected.as_f64().unwrap_or(f64::NAN));
                matches!(expected, Value::String(want) if *want == selected)
            }
            Some(Value::Array(selected)) => parse_int_prefix(expected).is_some_and(|wanted| {
                selected
                    .iter()
                    .filter_map(Value::as_f64)
                    .any(|index| index == wanted as f64)
            }),
            _ => map.values().any(|value| strict_eq(value, expected)),
        },
        Value::Array(items) => items.iter().any(|value| strict_eq(value, expected)),
        _ => false,
    }
}

/// Marks every answer whose conditional question is hidden as valid.
///
/// Only `valid` changes; the input is left untouched. Applying this twice
/// gives the same result as applying it once.
pub fn reconcile(answers: &[Answer]) -> Vec<Answer> {
    answers
        .iter()
        .map(|answer| {
            let hidden = answer
                .expanded_question()
                .is_some_and(|question| question.conditional && !should_show(Some(question), answers));
            let mut answer = answer.clone();
            if hidden && !answer.valid {
                debug!(answer = %answer.id, "hidden answer marked valid");
                answer.valid = true;
            }
            answer
        })
        .collect()
}

/// Visibility of every answer's question, keyed by answer id.
pub fn visibility_map(answers: &[Answer]) -> VisibilityMap {
    answers
        .iter()
        .map(|answer| {
            (
                answer.id.clone(),
                should_show(answer.expanded_question(), answers),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::QuestionType;
    use serde_json::json;

    fn conditional(id: &str, on: &[&str], required: Value) -> Question {
        let mut question = Question::new(id, QuestionType::ShortText);
        question.conditional = true;
        question.conditionquestion = Some(on.iter().map(|id| id.to_string()).collect());
        question.conditionanswer = Some(required);
        question
    }

    fn answer(id: &str, question: Question, response: Value) -> Answer {
        Answer::for_question(id, question, response)
    }

    #[test]
    fn string_responses_match_exactly() {
        let source = Question::new("q1", QuestionType::ShortText);
        let answers = vec![answer("a1", source, json!("yes"))];
        assert!(should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "yes"}))),
            &answers
        ));
        assert!(!should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "Yes"}))),
            &answers
        ));
    }

    #[test]
    fn single_choice_compares_index_text() {
        let source = Question::new("q1", QuestionType::Radio);
        let answers = vec![answer("a1", source, json!({"selected": 2, "others": ""}))];
        assert!(should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "2"}))),
            &answers
        ));
        assert!(!should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": 2}))),
            &answers
        ));
    }

    #[test]
    fn multiple_choice_checks_membership() {
        let source = Question::new("q1", QuestionType::Checkbox);
        let answers = vec![answer("a1", source, json!({"selected": [0, 3]}))];
        assert!(should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "3"}))),
            &answers
        ));
        assert!(!should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "1"}))),
            &answers
        ));
    }

    #[test]
    fn other_objects_match_any_value() {
        let source = Question::new("q1", QuestionType::Unknown);
        let answers = vec![answer("a1", source, json!({"choice": "b", "n": 4}))];
        assert!(should_show(
            Some(&conditional("q2", &["q1"], json!({"q1": "b"}))),
            &answers
        ));
    }

    #[test]
    fn any_dependency_is_enough() {
        let answers = vec![
            answer("a1", Question::new("q1", QuestionType::ShortText), json!("no")),
            answer("a2", Question::new("q2", QuestionType::ShortText), json!("go")),
        ];
        let question = conditional("q3", &["q1", "q2"], json!({"q1": "yes", "q2": "go"}));
        assert!(should_show(Some(&question), &answers));
    }

    #[test]
    fn empty_responses_never_satisfy() {
        let answers = vec![answer(
            "a1",
            Question::new("q1", QuestionType::ShortText),
            json!(""),
        )];
        let question = conditional("q2", &["q1"], json!({"q1": ""}));
        assert!(!should_show(Some(&question), &answers));
    }

    #[test]
    fn incomplete_conditions_fail_closed() {
        let mut question = Question::new("q2", QuestionType::ShortText);
        question.conditional = true;
        assert!(!should_show(Some(&question), &[]));
        question.conditionquestion = Some(vec!["q1".into()]);
        assert!(!should_show(Some(&question), &[]));
        question.conditionanswer = Some(json!("q1"));
        assert!(!should_show(Some(&question), &[]));
    }

    #[test]
    fn plain_questions_always_show() {
        assert!(should_show(None, &[]));
        assert!(should_show(
            Some(&Question::new("q", QuestionType::Email)),
            &[]
        ));
    }

    #[test]
    fn reconcile_only_touches_hidden_answers() {
        let gate = answer(
            "a1",
            Question::new("q1", QuestionType::ShortText),
            json!("no"),
        );
        let hidden = answer(
            "a2",
            conditional("q2", &["q1"], json!({"q1": "yes"})),
            Value::Null,
        );
        let shown = answer(
            "a3",
            conditional("q3", &["q1"], json!({"q1": "no"})),
            Value::Null,
        );
        let answers = vec![gate, hidden, shown];

        let reconciled = reconcile(&answers);
        assert!(!reconciled[0].valid);
        assert!(reconciled[1].valid);
        assert!(!reconciled[2].valid);
        assert_eq!(reconcile(&reconciled), reconciled);

        let map = visibility_map(&answers);
        assert_eq!(map.get("a2"), Some(&false));
        assert_eq!(map.get("a3"), Some(&true));
    }
}
