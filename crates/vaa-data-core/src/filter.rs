use serde::{Deserialize, Serialize};

use crate::object::{EntityType, Id};

/// A filter as it appears in data: one value or a list of values.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum FilterValue<T> {
    Many(Vec<T>),
    One(T),
}

impl<T: Clone> FilterValue<T> {
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::Many(values) => values.clone(),
            Self::One(value) => vec![value.clone()],
        }
    }
}

fn values_of<T: Clone>(value: Option<&FilterValue<T>>) -> Vec<T> {
    value.map(FilterValue::to_vec).unwrap_or_default()
}

/// Whether any target is allowed by `filter`. An empty filter allows everything,
/// an empty target list never matches a non-empty filter.
#[must_use]
pub fn matches<T: PartialEq>(filter: &[T], targets: &[T]) -> bool {
    if filter.is_empty() {
        return true;
    }
    targets.iter().any(|target| filter.contains(target))
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FilterIntersection<T> {
    /// Neither side restricts.
    Unrestricted,
    Only(Vec<T>),
    /// Both sides restrict and share no value. Nothing can satisfy the filter.
    NoneApplicable,
}

impl<T: PartialEq> FilterIntersection<T> {
    /// Dimensions the caller did not ask about (`None`) are skipped, but a conflicting
    /// filter never applies.
    #[must_use]
    pub fn allows(&self, targets: Option<&[T]>) -> bool {
        match (self, targets) {
            (Self::NoneApplicable, _) => false,
            (Self::Unrestricted, _) | (Self::Only(_), None) => true,
            (Self::Only(values), Some(targets)) => matches(values, targets),
        }
    }

    #[must_use]
    pub fn is_none_applicable(&self) -> bool {
        matches!(self, Self::NoneApplicable)
    }
}

#[must_use]
pub fn intersect_filters<T: Clone + PartialEq>(child: &[T], parent: &[T]) -> FilterIntersection<T> {
    intersect_filters_by(child, parent, |a, b| a == b)
}

/// Intersect two filters, keeping the order of `child`.
pub fn intersect_filters_by<T, F>(child: &[T], parent: &[T], compare: F) -> FilterIntersection<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    match (child.is_empty(), parent.is_empty()) {
        (true, true) => FilterIntersection::Unrestricted,
        (false, true) => FilterIntersection::Only(child.to_vec()),
        (true, false) => FilterIntersection::Only(parent.to_vec()),
        (false, false) => {
            let common = child
                .iter()
                .filter(|value| parent.iter().any(|other| compare(*value, other)))
                .cloned()
                .collect::<Vec<_>>();
            if common.is_empty() {
                FilterIntersection::NoneApplicable
            } else {
                FilterIntersection::Only(common)
            }
        }
    }
}

/// The filterable properties shared by questions and question categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_ids: Option<FilterValue<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_rounds: Option<FilterValue<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituency_ids: Option<FilterValue<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<FilterValue<EntityType>>,
}

/// An object's own filter. Empty lists mean no restriction.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Filter {
    pub election_ids: Vec<Id>,
    pub election_rounds: Vec<u32>,
    pub constituency_ids: Vec<Id>,
    pub entity_types: Vec<EntityType>,
}

impl From<&FilterFields> for Filter {
    fn from(fields: &FilterFields) -> Self {
        Self {
            election_ids: values_of(fields.election_ids.as_ref()),
            election_rounds: values_of(fields.election_rounds.as_ref()),
            constituency_ids: values_of(fields.constituency_ids.as_ref()),
            entity_types: values_of(fields.entity_type.as_ref()),
        }
    }
}

impl Filter {
    #[must_use]
    pub fn applies_to(&self, targets: &FilterTargets) -> bool {
        fn dimension<T: PartialEq>(filter: &[T], targets: Option<&Vec<T>>) -> bool {
            targets.map_or(true, |targets| matches(filter, targets))
        }
        dimension(&self.election_ids, targets.elections.as_ref())
            && dimension(&self.election_rounds, targets.election_rounds.as_ref())
            && dimension(&self.constituency_ids, targets.constituencies.as_ref())
            && dimension(&self.entity_types, targets.entity_types.as_ref())
    }

    #[must_use]
    pub fn intersect(&self, parent: &Filter) -> EffectiveFilter {
        EffectiveFilter {
            election_ids: intersect_filters(&self.election_ids, &parent.election_ids),
            election_rounds: intersect_filters(&self.election_rounds, &parent.election_rounds),
            constituency_ids: intersect_filters(&self.constituency_ids, &parent.constituency_ids),
            entity_types: intersect_filters(&self.entity_types, &parent.entity_types),
        }
    }

    #[must_use]
    pub fn to_effective(&self) -> EffectiveFilter {
        self.intersect(&Filter::default())
    }
}

/// The intersection of an object's filter and the filter it inherits.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EffectiveFilter {
    pub election_ids: FilterIntersection<Id>,
    pub election_rounds: FilterIntersection<u32>,
    pub constituency_ids: FilterIntersection<Id>,
    pub entity_types: FilterIntersection<EntityType>,
}

impl EffectiveFilter {
    #[must_use]
    pub fn applies_to(&self, targets: &FilterTargets) -> bool {
        self.election_ids.allows(targets.elections.as_deref())
            && self.election_rounds.allows(targets.election_rounds.as_deref())
            && self.constituency_ids.allows(targets.constituencies.as_deref())
            && self.entity_types.allows(targets.entity_types.as_deref())
    }

    /// False when any dimension conflicts with the inherited filter.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        !(self.election_ids.is_none_applicable()
            || self.election_rounds.is_none_applicable()
            || self.constituency_ids.is_none_applicable()
            || self.entity_types.is_none_applicable())
    }
}

/// The context to test applicability against. A `None` dimension is not checked.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FilterTargets {
    pub elections: Option<Vec<Id>>,
    pub election_rounds: Option<Vec<u32>>,
    pub constituencies: Option<Vec<Id>>,
    pub entity_types: Option<Vec<EntityType>>,
}

impl FilterTargets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_election(mut self, id: impl Into<Id>) -> Self {
        self.elections.get_or_insert_with(Vec::new).push(id.into());
        self
    }

    #[must_use]
    pub fn with_election_round(mut self, round: u32) -> Self {
        self.election_rounds.get_or_insert_with(Vec::new).push(round);
        self
    }

    #[must_use]
    pub fn with_constituency(mut self, id: impl Into<Id>) -> Self {
        self.constituencies.get_or_insert_with(Vec::new).push(id.into());
        self
    }

    #[must_use]
    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.get_or_insert_with(Vec::new).push(entity_type);
        self
    }
}

pub trait Filterable {
    fn own_filter(&self) -> &Filter;

    fn effective_filter(&self) -> &EffectiveFilter;

    fn applies_to(&self, targets: &FilterTargets) -> bool {
        self.effective_filter().applies_to(targets)
    }

    /// Ignores any inherited filter.
    fn applies_to_own(&self, targets: &FilterTargets) -> bool {
        self.own_filter().applies_to(targets)
    }
}
