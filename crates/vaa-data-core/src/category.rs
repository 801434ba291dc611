use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};
use crate::filter::{EffectiveFilter, Filter, FilterFields, Filterable};
use crate::ids::is_valid_id;
use crate::object::{impl_data_object, sort_by_order, Id, ObjectFields, ObjectType};
use crate::question::Question;
use crate::root::DataRoot;
use crate::updatable::Updatable;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QuestionCategoryType {
    #[default]
    Default,
    Info,
    Opinion,
}

impl QuestionCategoryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Info => "info",
            Self::Opinion => "opinion",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "info" => Some(Self::Info),
            "opinion" => Some(Self::Opinion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCategoryData {
    pub id: Id,
    #[serde(rename = "type", default)]
    pub category_type: QuestionCategoryType,
    #[serde(flatten)]
    pub common: ObjectFields,
    #[serde(flatten)]
    pub filters: FilterFields,
}

#[derive(Debug)]
pub struct QuestionCategory {
    id: Id,
    data: QuestionCategoryData,
    filter: Filter,
    effective: EffectiveFilter,
    updates: Updatable<QuestionCategory>,
}

impl_data_object!(QuestionCategory, ObjectType::QuestionCategory);

impl Filterable for QuestionCategory {
    fn own_filter(&self) -> &Filter {
        &self.filter
    }

    fn effective_filter(&self) -> &EffectiveFilter {
        &self.effective
    }
}

impl QuestionCategory {
    /// # Errors
    /// Returns [`DataError::Provision`] if the id is blank.
    pub fn new(data: QuestionCategoryData) -> DataResult<Self> {
        if !is_valid_id(&data.id) {
            return Err(DataError::provision("question category id MUST NOT be blank"));
        }
        let filter = Filter::from(&data.filters);
        let effective = filter.to_effective();
        Ok(Self { id: data.id.clone(), data, filter, effective, updates: Updatable::new() })
    }

    #[must_use]
    pub fn data(&self) -> &QuestionCategoryData {
        &self.data
    }

    #[must_use]
    pub fn category_type(&self) -> QuestionCategoryType {
        self.data.category_type
    }

    /// The category's questions in display order.
    #[must_use]
    pub fn questions<'r>(&self, root: &'r DataRoot) -> Vec<&'r Question> {
        let mut questions = root
            .questions()
            .unwrap_or_default()
            .into_iter()
            .filter(|question| question.category_id() == self.id)
            .collect::<Vec<_>>();
        sort_by_order(&mut questions);
        questions
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filter::FilterTargets;
    use crate::object::{DataObject, EntityType};

    fn mk_category(data: serde_json::Value) -> QuestionCategory {
        let data: QuestionCategoryData = match serde_json::from_value(data) {
            Ok(data) => data,
            Err(err) => panic!("category fixture should deserialize: {err}"),
        };
        match QuestionCategory::new(data) {
            Ok(category) => category,
            Err(err) => panic!("category fixture should be valid: {err}"),
        }
    }

    #[test]
    fn type_defaults_to_default() {
        let category = mk_category(json!({ "id": "category-1", "name": "Basics" }));
        assert_eq!(category.category_type(), QuestionCategoryType::Default);
        assert_eq!(category.name(), "Basics");
        assert_eq!(category.object_type(), ObjectType::QuestionCategory);
    }

    #[test]
    fn own_filter_is_the_effective_filter() {
        let category = mk_category(json!({
            "id": "category-2",
            "type": "info",
            "entityType": ["organization"]
        }));
        let organization = FilterTargets::new().with_entity_type(EntityType::Organization);
        let candidate = FilterTargets::new().with_entity_type(EntityType::Candidate);
        assert!(category.applies_to(&organization));
        assert!(!category.applies_to(&candidate));
        assert!(category.applies_to(&FilterTargets::new()));
    }

    #[test]
    fn blank_id_is_rejected() {
        let data = QuestionCategoryData {
            id: " ".to_string(),
            category_type: QuestionCategoryType::Opinion,
            common: ObjectFields::default(),
            filters: FilterFields::default(),
        };
        assert!(matches!(QuestionCategory::new(data), Err(DataError::Provision(_))));
    }

    #[test]
    fn category_type_parses_names() {
        for category_type in
            [QuestionCategoryType::Default, QuestionCategoryType::Info, QuestionCategoryType::Opinion]
        {
            assert_eq!(QuestionCategoryType::parse(category_type.as_str()), Some(category_type));
        }
        assert_eq!(QuestionCategoryType::parse("quiz"), None);
    }
}
