use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::category::QuestionCategoryType;
use crate::constituency::{Constituency, ConstituencyGroup};
use crate::ensure::ensure_date;
use crate::error::{DataError, DataResult};
use crate::filter::FilterTargets;
use crate::ids::is_valid_id;
use crate::nomination::NominationRef;
use crate::object::{impl_data_object, DataObject, EntityType, Id, ObjectFields, ObjectType};
use crate::question::Question;
use crate::root::{DataRoot, QuestionQuery};
use crate::updatable::{Observable, Updatable};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionData {
    pub id: Id,
    #[serde(flatten)]
    pub common: ObjectFields,
    pub constituency_group_ids: Vec<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_rounds: Option<bool>,
}

#[derive(Debug)]
pub struct Election {
    id: Id,
    data: ElectionData,
    updates: Updatable<Election>,
}

impl_data_object!(Election, ObjectType::Election);

impl Election {
    /// An election MUST have at least one constituency group and every group MUST exist.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] describing the violated rule.
    pub fn new(data: ElectionData, root: &DataRoot) -> DataResult<Self> {
        if !is_valid_id(&data.id) {
            return Err(DataError::provision("election id MUST NOT be blank"));
        }
        if data.constituency_group_ids.is_empty() {
            return Err(DataError::provision(format!(
                "election `{}` MUST have at least one constituency group",
                data.id
            )));
        }
        if let Some(missing) =
            data.constituency_group_ids.iter().find(|id| root.constituency_group(id).is_err())
        {
            return Err(DataError::provision(format!(
                "election `{}` references missing constituency group `{missing}`",
                data.id
            )));
        }
        if data.round == Some(0) {
            return Err(DataError::provision(format!("election `{}` round MUST be at least 1", data.id)));
        }
        Ok(Self { id: data.id.clone(), data, updates: Updatable::new() })
    }

    #[must_use]
    pub fn data(&self) -> &ElectionData {
        &self.data
    }

    /// `None` if the date is absent or cannot be read.
    #[must_use]
    pub fn date(&self) -> Option<Date> {
        self.data.date.as_ref().and_then(ensure_date)
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.data.round.unwrap_or(1)
    }

    /// Switch the current round, notifying subscribers.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] for round 0.
    pub fn set_round(&mut self, round: u32) -> DataResult<()> {
        if round == 0 {
            return Err(DataError::provision(format!("election `{}` round MUST be at least 1", self.id)));
        }
        self.update(|election| {
            election.data.round = Some(round);
            Ok(())
        })
    }

    #[must_use]
    pub fn multiple_rounds(&self) -> bool {
        self.data.multiple_rounds.unwrap_or(false)
    }

    #[must_use]
    pub fn constituency_group_ids(&self) -> &[Id] {
        &self.data.constituency_group_ids
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a group id does not resolve.
    pub fn constituency_groups<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r ConstituencyGroup>> {
        self.data.constituency_group_ids.iter().map(|id| root.constituency_group(id)).collect()
    }

    /// The only constituency when the election has one group holding one constituency.
    #[must_use]
    pub fn single_constituency<'r>(&self, root: &'r DataRoot) -> Option<&'r Constituency> {
        match self.data.constituency_group_ids.as_slice() {
            [only] => root.constituency_group(only).ok()?.single_constituency(root),
            _ => None,
        }
    }

    /// Nominations of one entity type in `constituency` for the current round.
    #[must_use]
    pub fn nominations<'r>(
        &self,
        root: &'r DataRoot,
        entity_type: EntityType,
        constituency: &Constituency,
    ) -> Vec<NominationRef<'r>> {
        root.nominations_for_constituency(&self.id, constituency.id(), self.round(), entity_type)
    }

    /// Questions applicable in `constituency` of this election, optionally narrowed by
    /// category type and entity type.
    #[must_use]
    pub fn questions<'r>(
        &self,
        root: &'r DataRoot,
        constituency: &Constituency,
        category_type: Option<QuestionCategoryType>,
        entity_type: Option<EntityType>,
    ) -> Vec<&'r Question> {
        let mut targets = FilterTargets::new()
            .with_election(self.id.clone())
            .with_constituency(constituency.id());
        if let Some(entity_type) = entity_type {
            targets = targets.with_entity_type(entity_type);
        }
        let mut query = QuestionQuery::new().with_targets(targets);
        if let Some(category_type) = category_type {
            query = query.with_category_type(category_type);
        }
        root.find_questions(&query)
    }

    /// Pick the constituency of this election that `selected` points to, either directly or
    /// through a broader constituency implied by one of the selections.
    ///
    /// # Errors
    /// Returns [`DataError::Type`] if more than one constituency matches.
    pub fn applicable_constituency<'r>(
        &self,
        root: &'r DataRoot,
        selected: &[&'r Constituency],
    ) -> DataResult<Option<&'r Constituency>> {
        let groups = self.constituency_groups(root)?;
        let mut matches: Vec<&'r Constituency> = Vec::new();
        for &constituency in selected {
            let found = groups
                .iter()
                .find_map(|group| group.implied_constituency(root, constituency));
            if let Some(found) = found {
                if !matches.iter().any(|known| known.id() == found.id()) {
                    matches.push(found);
                }
            }
        }
        if matches.len() > 1 {
            let ids = matches.iter().map(|matched| matched.id()).collect::<Vec<_>>();
            return Err(DataError::type_error(format!(
                "more than one constituency matches election `{}`: {}",
                self.id,
                ids.join(", ")
            )));
        }
        Ok(matches.pop())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::root::RootOptions;

    fn mk_root() -> DataRoot {
        let mut root = DataRoot::new(RootOptions::default());
        let constituencies = match serde_json::from_value(json!([
            { "id": "region-1" },
            { "id": "town-1", "parentId": "region-1" }
        ])) {
            Ok(data) => data,
            Err(err) => panic!("constituencies should deserialize: {err}"),
        };
        if let Err(err) = root.provide_constituency_data(constituencies) {
            panic!("constituencies should provision: {err}");
        }
        let groups = match serde_json::from_value(json!([
            { "id": "regions", "constituencyIds": ["region-1"] },
            { "id": "towns", "constituencyIds": ["town-1"] }
        ])) {
            Ok(data) => data,
            Err(err) => panic!("groups should deserialize: {err}"),
        };
        if let Err(err) = root.provide_constituency_group_data(groups) {
            panic!("groups should provision: {err}");
        }
        root
    }

    fn mk_data(value: serde_json::Value) -> ElectionData {
        match serde_json::from_value(value) {
            Ok(data) => data,
            Err(err) => panic!("election fixture should deserialize: {err}"),
        }
    }

    #[test]
    fn requires_existing_constituency_groups() {
        let root = mk_root();
        let empty = Election::new(mk_data(json!({ "id": "e", "constituencyGroupIds": [] })), &root);
        assert!(matches!(empty, Err(DataError::Provision(_))));
        let missing = Election::new(mk_data(json!({ "id": "e", "constituencyGroupIds": ["nope"] })), &root);
        assert!(matches!(missing, Err(DataError::Provision(_))));
    }

    #[test]
    fn defaults_and_date() {
        let root = mk_root();
        let election = match Election::new(
            mk_data(json!({ "id": "e", "constituencyGroupIds": ["regions"], "date": "2033-11-03" })),
            &root,
        ) {
            Ok(election) => election,
            Err(err) => panic!("election should be valid: {err}"),
        };
        assert_eq!(election.round(), 1);
        assert!(!election.multiple_rounds());
        assert_eq!(election.date().map(|date| date.year()), Some(2033));
        assert_eq!(election.single_constituency(&root).map(DataObject::id), Some("region-1"));
    }

    #[test]
    fn set_round_notifies_and_rejects_zero() {
        use std::cell::Cell;
        use std::rc::Rc;

        let root = mk_root();
        let mut election = match Election::new(
            mk_data(json!({ "id": "e", "constituencyGroupIds": ["regions", "towns"] })),
            &root,
        ) {
            Ok(election) => election,
            Err(err) => panic!("election should be valid: {err}"),
        };
        let seen = Rc::new(Cell::new(0));
        let seen_in_handler = Rc::clone(&seen);
        election.subscribe(move |election: &Election| seen_in_handler.set(election.round()));

        assert_eq!(election.set_round(2), Ok(()));
        assert_eq!(seen.get(), 2);
        assert!(matches!(election.set_round(0), Err(DataError::Provision(_))));
        assert_eq!(election.round(), 2);
        assert!(election.single_constituency(&root).is_none());
    }

    #[test]
    fn applicable_constituency_uses_implied_parents() {
        let root = mk_root();
        let election = match Election::new(
            mk_data(json!({ "id": "e", "constituencyGroupIds": ["regions"] })),
            &root,
        ) {
            Ok(election) => election,
            Err(err) => panic!("election should be valid: {err}"),
        };
        let town = match root.constituency("town-1") {
            Ok(town) => town,
            Err(err) => panic!("town should exist: {err}"),
        };
        let region = match root.constituency("region-1") {
            Ok(region) => region,
            Err(err) => panic!("region should exist: {err}"),
        };
        let found = election.applicable_constituency(&root, &[town]);
        assert_eq!(found.map(|found| found.map(DataObject::id)), Ok(Some("region-1")));
        let same = election.applicable_constituency(&root, &[town, region]);
        assert_eq!(same.map(|found| found.map(DataObject::id)), Ok(Some("region-1")));
        assert_eq!(election.applicable_constituency(&root, &[]).map(|found| found.is_none()), Ok(true));
    }
}
