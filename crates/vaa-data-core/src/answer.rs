use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::object::{Id, Image};

/// A raw answer as provided in data. The value is interpreted by the question it answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Answer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value, info: None }
    }
}

/// Question id to answer. A `None` entry is an explicitly empty answer.
pub type Answers = IndexMap<Id, Option<Answer>>;

/// A value that has been checked against a question.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Image(Image),
    Date(Date),
    MultipleText(Vec<String>),
    /// The id of one of the question's choices.
    Choice(Id),
    Choices(Vec<Id>),
}

impl AnswerValue {
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) | Self::Choice(text) => Value::String(text.clone()),
            Self::Number(number) => serde_json::Number::from_f64(*number).map_or(Value::Null, Value::Number),
            Self::Boolean(flag) => Value::Bool(*flag),
            Self::Image(image) => serde_json::to_value(image).unwrap_or(Value::Null),
            Self::Date(date) => Value::String(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            )),
            Self::MultipleText(items) | Self::Choices(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedAnswer {
    pub value: AnswerValue,
    pub info: Option<String>,
}
