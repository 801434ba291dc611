use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::answer::{Answer, AnswerValue, TypedAnswer};
use crate::category::QuestionCategory;
use crate::ensure::{
    ensure_array, ensure_boolean, ensure_date, ensure_id, ensure_image, ensure_number,
    ensure_string, ensure_unique, is_unique,
};
use crate::error::{DataError, DataResult};
use crate::filter::{EffectiveFilter, Filter, FilterFields, Filterable};
use crate::format::{ListFormatOptions, NumberFormat};
use crate::ids::is_valid_id;
use crate::object::{DataObject, Id, ObjectFields, ObjectType};
use crate::root::DataRoot;
use crate::updatable::{impl_observable, Updatable};

pub const COORDINATE_MIN: f64 = -0.5;
pub const COORDINATE_MAX: f64 = 0.5;
pub const COORDINATE_NEUTRAL: f64 = 0.0;

/// Scale `value` from `[min, max]` into the coordinate range.
///
/// # Errors
/// Returns [`DataError::Type`] when `value` is outside `[min, max]` or the range is inverted.
pub fn normalize_coordinate(value: f64, min: f64, max: f64) -> DataResult<f64> {
    if min > max {
        return Err(DataError::type_error(format!("range min {min} MUST NOT exceed max {max}")));
    }
    if value < min || value > max {
        return Err(DataError::type_error(format!(
            "value {value} is outside the range [{min}, {max}]"
        )));
    }
    if (max - min).abs() < f64::EPSILON {
        return Ok(COORDINATE_NEUTRAL);
    }
    Ok(COORDINATE_MIN + (value - min) / (max - min) * (COORDINATE_MAX - COORDINATE_MIN))
}

/// A normalized answer. `None` coordinates are missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Single(Option<f64>),
    Multiple(Vec<Option<f64>>),
}

impl Normalized {
    #[must_use]
    pub fn coordinates(&self) -> Vec<Option<f64>> {
        match self {
            Self::Single(coordinate) => vec![*coordinate],
            Self::Multiple(coordinates) => coordinates.clone(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Single(coordinate) => coordinate.is_none(),
            Self::Multiple(coordinates) => coordinates.iter().all(Option::is_none),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    Text,
    Number,
    Boolean,
    Image,
    Date,
    MultipleText,
    SingleChoiceOrdinal,
    SingleChoiceCategorical,
    MultipleChoiceCategorical,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Image => "image",
            Self::Date => "date",
            Self::MultipleText => "multipleText",
            Self::SingleChoiceOrdinal => "singleChoiceOrdinal",
            Self::SingleChoiceCategorical => "singleChoiceCategorical",
            Self::MultipleChoiceCategorical => "multipleChoiceCategorical",
        }
    }

    #[must_use]
    pub fn object_type(self) -> ObjectType {
        match self {
            Self::Text => ObjectType::TextQuestion,
            Self::Number => ObjectType::NumberQuestion,
            Self::Boolean => ObjectType::BooleanQuestion,
            Self::Image => ObjectType::ImageQuestion,
            Self::Date => ObjectType::DateQuestion,
            Self::MultipleText => ObjectType::MultipleTextQuestion,
            Self::SingleChoiceOrdinal => ObjectType::SingleChoiceOrdinalQuestion,
            Self::SingleChoiceCategorical => ObjectType::SingleChoiceCategoricalQuestion,
            Self::MultipleChoiceCategorical => ObjectType::MultipleChoiceCategoricalQuestion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: Id,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizable_value: Option<f64>,
}

/// A choice set MUST have at least two choices with unique, non-blank ids.
///
/// # Errors
/// Returns [`DataError::Provision`] describing the first violation.
pub fn validate_choices(choices: &[Choice]) -> DataResult<()> {
    if choices.len() < 2 {
        return Err(DataError::provision(format!(
            "a choice question MUST have at least two choices, got {}",
            choices.len()
        )));
    }
    if let Some(choice) = choices.iter().find(|choice| !is_valid_id(&choice.id)) {
        return Err(DataError::provision(format!("choice id `{}` MUST NOT be blank", choice.id)));
    }
    let ids = choices.iter().map(|choice| choice.id.as_str()).collect::<Vec<_>>();
    if !is_unique(&ids) {
        return Err(DataError::provision("choice ids MUST be unique"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    pub id: Id,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub category_id: Id,
    #[serde(flatten)]
    pub common: ObjectFields,
    #[serde(flatten)]
    pub filters: FilterFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_duplicates: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberSettings {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub format: Option<NumberFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateSettings {
    pub min: Option<Date>,
    pub max: Option<Date>,
    /// A `time` format description such as `[month]/[day]/[year]`.
    pub format: Option<String>,
}

/// The kind-specific part of a question, resolved from [`QuestionData`] at ingest.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    Text,
    Number(NumberSettings),
    Boolean,
    Image,
    Date(DateSettings),
    MultipleText,
    SingleChoiceOrdinal { choices: Vec<Choice>, min: f64, max: f64 },
    SingleChoiceCategorical { choices: Vec<Choice> },
    MultipleChoiceCategorical { choices: Vec<Choice>, allow_duplicates: bool },
}

impl QuestionKind {
    /// # Errors
    /// Returns [`DataError::Provision`] when kind-specific settings are malformed.
    pub fn from_data(data: &QuestionData) -> DataResult<Self> {
        let kind = match data.question_type {
            QuestionType::Text => Self::Text,
            QuestionType::Boolean => Self::Boolean,
            QuestionType::Image => Self::Image,
            QuestionType::MultipleText => Self::MultipleText,
            QuestionType::Number => Self::Number(NumberSettings {
                min: setting(data, data.min.as_ref(), "min", ensure_number)?,
                max: setting(data, data.max.as_ref(), "max", ensure_number)?,
                format: data
                    .format
                    .as_ref()
                    .map(|format| {
                        serde_json::from_value::<NumberFormat>(format.clone()).map_err(|err| {
                            DataError::provision(format!(
                                "question `{}` has an invalid number format: {err}",
                                data.id
                            ))
                        })
                    })
                    .transpose()?,
            }),
            QuestionType::Date => Self::Date(DateSettings {
                min: setting(data, data.min.as_ref(), "min", ensure_date)?,
                max: setting(data, data.max.as_ref(), "max", ensure_date)?,
                format: date_format(data)?,
            }),
            QuestionType::SingleChoiceOrdinal => {
                let choices = choices_of(data)?;
                let mut values = Vec::with_capacity(choices.len());
                for choice in &choices {
                    let Some(value) = choice.normalizable_value.filter(|value| value.is_finite())
                    else {
                        return Err(DataError::provision(format!(
                            "choice `{}` of ordinal question `{}` MUST have a numeric normalizableValue",
                            choice.id, data.id
                        )));
                    };
                    values.push(value);
                }
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Self::SingleChoiceOrdinal { choices, min, max }
            }
            QuestionType::SingleChoiceCategorical => {
                Self::SingleChoiceCategorical { choices: choices_of(data)? }
            }
            QuestionType::MultipleChoiceCategorical => Self::MultipleChoiceCategorical {
                choices: choices_of(data)?,
                allow_duplicates: data.allow_duplicates.unwrap_or(false)
                    && !data.ordered.unwrap_or(false),
            },
        };
        Ok(kind)
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::Text => QuestionType::Text,
            Self::Number(_) => QuestionType::Number,
            Self::Boolean => QuestionType::Boolean,
            Self::Image => QuestionType::Image,
            Self::Date(_) => QuestionType::Date,
            Self::MultipleText => QuestionType::MultipleText,
            Self::SingleChoiceOrdinal { .. } => QuestionType::SingleChoiceOrdinal,
            Self::SingleChoiceCategorical { .. } => QuestionType::SingleChoiceCategorical,
            Self::MultipleChoiceCategorical { .. } => QuestionType::MultipleChoiceCategorical,
        }
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        match self {
            Self::SingleChoiceOrdinal { choices, .. }
            | Self::SingleChoiceCategorical { choices }
            | Self::MultipleChoiceCategorical { choices, .. } => choices,
            _ => &[],
        }
    }
}

fn setting<T>(
    data: &QuestionData,
    value: Option<&Value>,
    name: &str,
    ensure: fn(&Value) -> Option<T>,
) -> DataResult<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => ensure(raw).map(Some).ok_or_else(|| {
            DataError::provision(format!("question `{}` has an invalid {name}: {raw}", data.id))
        }),
    }
}

fn date_format(data: &QuestionData) -> DataResult<Option<String>> {
    match &data.format {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(format)) => {
            time::format_description::parse(format).map_err(|err| {
                DataError::provision(format!(
                    "question `{}` has an invalid date format `{format}`: {err}",
                    data.id
                ))
            })?;
            Ok(Some(format.clone()))
        }
        Some(other) => Err(DataError::provision(format!(
            "question `{}` date format MUST be a format description string, got {other}",
            data.id
        ))),
    }
}

fn choices_of(data: &QuestionData) -> DataResult<Vec<Choice>> {
    let choices = data.choices.clone().unwrap_or_default();
    validate_choices(&choices).map_err(|err| match err {
        DataError::Provision(message) => {
            DataError::Provision(format!("question `{}`: {message}", data.id))
        }
        other => other,
    })?;
    Ok(choices)
}

#[derive(Debug)]
pub struct Question {
    id: Id,
    data: QuestionData,
    kind: QuestionKind,
    filter: Filter,
    effective: EffectiveFilter,
    updates: Updatable<Question>,
}

impl_observable!(Question);

impl DataObject for Question {
    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> &ObjectFields {
        &self.data.common
    }

    fn object_type(&self) -> ObjectType {
        self.kind.question_type().object_type()
    }
}

impl Filterable for Question {
    fn own_filter(&self) -> &Filter {
        &self.filter
    }

    fn effective_filter(&self) -> &EffectiveFilter {
        &self.effective
    }
}

impl Question {
    /// Build a question that inherits the filter of `category`.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] when the id is blank, the category does not match
    /// `categoryId` or kind-specific settings are invalid.
    pub fn new(data: QuestionData, category: &QuestionCategory) -> DataResult<Self> {
        if !is_valid_id(&data.id) {
            return Err(DataError::provision("question id MUST NOT be blank"));
        }
        if data.category_id != category.id() {
            return Err(DataError::provision(format!(
                "question `{}` MUST belong to category `{}`",
                data.id, data.category_id
            )));
        }
        let kind = QuestionKind::from_data(&data)?;
        let filter = Filter::from(&data.filters);
        let effective = filter.intersect(category.own_filter());
        Ok(Self { id: data.id.clone(), data, kind, filter, effective, updates: Updatable::new() })
    }

    #[must_use]
    pub fn data(&self) -> &QuestionData {
        &self.data
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    #[must_use]
    pub fn category_id(&self) -> &str {
        &self.data.category_id
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the category is not in `root`.
    pub fn category<'r>(&self, root: &'r DataRoot) -> DataResult<&'r QuestionCategory> {
        root.question_category(&self.data.category_id)
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        self.kind.choices()
    }

    #[must_use]
    pub fn choice(&self, id: &str) -> Option<&Choice> {
        self.choices().iter().find(|choice| choice.id == id)
    }

    #[must_use]
    pub fn is_matchable(&self) -> bool {
        !matches!(
            self.kind,
            QuestionKind::Text
                | QuestionKind::Image
                | QuestionKind::MultipleText
                | QuestionKind::MultipleChoiceCategorical { .. }
        )
    }

    /// The number of coordinates a normalized value has, `None` for non-matchable questions.
    #[must_use]
    pub fn normalized_dimensions(&self) -> Option<usize> {
        if !self.is_matchable() {
            return None;
        }
        match &self.kind {
            QuestionKind::SingleChoiceCategorical { choices } if choices.len() > 2 => {
                Some(choices.len())
            }
            _ => Some(1),
        }
    }

    /// Interpret a raw value for this question. Anything that cannot be interpreted
    /// without loss is the missing value (`None`).
    #[must_use]
    pub fn ensure_value(&self, value: &Value) -> Option<AnswerValue> {
        match &self.kind {
            QuestionKind::Text => ensure_string(value).map(AnswerValue::Text),
            QuestionKind::Number(_) => ensure_number(value).map(AnswerValue::Number),
            QuestionKind::Boolean => ensure_boolean(value).map(AnswerValue::Boolean),
            QuestionKind::Image => ensure_image(value).map(AnswerValue::Image),
            QuestionKind::Date(_) => ensure_date(value).map(AnswerValue::Date),
            QuestionKind::MultipleText => {
                ensure_array(value, ensure_string).map(AnswerValue::MultipleText)
            }
            QuestionKind::SingleChoiceOrdinal { .. } | QuestionKind::SingleChoiceCategorical { .. } => {
                ensure_id(value).filter(|id| self.choice(id).is_some()).map(AnswerValue::Choice)
            }
            QuestionKind::MultipleChoiceCategorical { allow_duplicates, .. } => {
                let ids = ensure_array(value, ensure_id)?;
                if ids.is_empty() || ids.iter().any(|id| self.choice(id).is_none()) {
                    return None;
                }
                let ids = if *allow_duplicates { ids } else { ensure_unique(ids)? };
                Some(AnswerValue::Choices(ids))
            }
        }
    }

    #[must_use]
    pub fn ensure_answer(&self, answer: Option<&Answer>) -> Option<TypedAnswer> {
        let answer = answer?;
        let value = self.ensure_value(&answer.value)?;
        Some(TypedAnswer { value, info: answer.info.clone() })
    }

    /// Map a checked value into coordinates for matching. A value of the wrong shape is
    /// treated as missing.
    ///
    /// # Errors
    /// Returns [`DataError::Type`] if the question is not matchable, a ranged question has
    /// no configured range, or the value falls outside the range.
    pub fn normalize_value(&self, value: Option<&AnswerValue>) -> DataResult<Normalized> {
        match &self.kind {
            QuestionKind::Text
            | QuestionKind::Image
            | QuestionKind::MultipleText
            | QuestionKind::MultipleChoiceCategorical { .. } => Err(DataError::type_error(format!(
                "{} question `{}` is not matchable and cannot be normalized",
                self.question_type().as_str(),
                self.id
            ))),
            QuestionKind::Boolean => Ok(Normalized::Single(match value {
                Some(AnswerValue::Boolean(true)) => Some(COORDINATE_MAX),
                Some(AnswerValue::Boolean(false)) => Some(COORDINATE_MIN),
                _ => None,
            })),
            QuestionKind::Number(settings) => {
                let (min, max) = self.require_range(settings.min, settings.max)?;
                match value {
                    Some(AnswerValue::Number(number)) => {
                        normalize_coordinate(*number, min, max).map(|c| Normalized::Single(Some(c)))
                    }
                    _ => Ok(Normalized::Single(None)),
                }
            }
            QuestionKind::Date(settings) => {
                let (min, max) = self.require_range(
                    settings.min.map(julian_day),
                    settings.max.map(julian_day),
                )?;
                match value {
                    Some(AnswerValue::Date(date)) => normalize_coordinate(julian_day(*date), min, max)
                        .map(|c| Normalized::Single(Some(c))),
                    _ => Ok(Normalized::Single(None)),
                }
            }
            QuestionKind::SingleChoiceOrdinal { min, max, .. } => {
                let selected = match value {
                    Some(AnswerValue::Choice(id)) => {
                        self.choice(id).and_then(|choice| choice.normalizable_value)
                    }
                    _ => None,
                };
                match selected {
                    Some(ordinal) => normalize_coordinate(ordinal, *min, *max)
                        .map(|c| Normalized::Single(Some(c))),
                    None => Ok(Normalized::Single(None)),
                }
            }
            QuestionKind::SingleChoiceCategorical { choices } => {
                let selected = match value {
                    Some(AnswerValue::Choice(id)) => choices.iter().position(|choice| &choice.id == id),
                    _ => None,
                };
                // Two choices are a binary question. More are one-hot encoded, which caps
                // the distance between any two different answers.
                if choices.len() == 2 {
                    return Ok(Normalized::Single(selected.map(|index| {
                        if index == 0 {
                            COORDINATE_MIN
                        } else {
                            COORDINATE_MAX
                        }
                    })));
                }
                Ok(Normalized::Multiple(match selected {
                    Some(selected) => (0..choices.len())
                        .map(|index| {
                            Some(if index == selected { COORDINATE_MAX } else { COORDINATE_MIN })
                        })
                        .collect(),
                    None => vec![None; choices.len()],
                }))
            }
        }
    }

    /// Ensure then normalize a raw answer.
    ///
    /// # Errors
    /// See [`Question::normalize_value`].
    pub fn normalize_answer(&self, answer: Option<&Answer>) -> DataResult<Normalized> {
        let typed = self.ensure_answer(answer);
        self.normalize_value(typed.as_ref().map(|answer| &answer.value))
    }

    /// Render an answer with the formatters held by `root`.
    #[must_use]
    pub fn format_answer(
        &self,
        root: &DataRoot,
        answer: Option<&Answer>,
        options: &ListFormatOptions<'_>,
    ) -> String {
        root.format_answer(self, answer, options)
    }

    fn require_range(&self, min: Option<f64>, max: Option<f64>) -> DataResult<(f64, f64)> {
        match (min, max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(DataError::type_error(format!(
                "{} question `{}` MUST have both min and max to be normalized",
                self.question_type().as_str(),
                self.id
            ))),
        }
    }
}

fn julian_day(date: Date) -> f64 {
    f64::from(date.to_julian_day())
}
