use serde::{Deserialize, Serialize};

use crate::answer::{Answer, Answers, TypedAnswer};
use crate::constituency::Constituency;
use crate::election::Election;
use crate::error::{DataError, DataResult};
use crate::format::ListFormatOptions;
use crate::ids::is_valid_id;
use crate::nomination::{NominationQuery, NominationRef};
use crate::object::{
    impl_data_object, sort_by_order, DataObject, EntityType, Id, ObjectFields, ObjectType,
};
use crate::question::Question;
use crate::root::DataRoot;
use crate::updatable::Updatable;

/// Ingest record for any entity. Candidate-only fields are ignored for other types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub id: Id,
    /// Absent in entity trees, where the key supplies it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(flatten)]
    pub common: ObjectFields,
    #[serde(default, skip_serializing_if = "Answers::is_empty")]
    pub answers: Answers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Id>,
}

impl EntityData {
    /// A placeholder for an entity implied by a nomination.
    #[must_use]
    pub fn generated(
        entity_type: EntityType,
        id: Id,
        name: Option<String>,
        short_name: Option<String>,
    ) -> Self {
        Self {
            id,
            entity_type: Some(entity_type),
            common: ObjectFields { name, short_name, is_generated: true, ..ObjectFields::default() },
            ..Self::default()
        }
    }
}

/// Behavior shared by the four entity kinds.
pub trait Entity: DataObject {
    fn entity_data(&self) -> &EntityData;

    fn entity_type(&self) -> EntityType;

    /// The name shown to users, computed through the root's formatters when the data has none.
    fn display_name(&self, root: &DataRoot) -> String;

    fn display_short_name(&self, root: &DataRoot) -> String;

    fn answers(&self) -> &Answers {
        &self.entity_data().answers
    }

    fn raw_answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers().get(question_id).and_then(Option::as_ref)
    }

    /// The answer to `question`, checked against its kind.
    fn answer(&self, question: &Question) -> Option<TypedAnswer> {
        question.ensure_answer(self.raw_answer(question.id()))
    }

    /// Questions with a non-null answer value.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if an answered question id does not resolve.
    fn answered_questions<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Question>> {
        self.answers()
            .iter()
            .filter(|(_, answer)| answer.as_ref().is_some_and(|answer| !answer.value.is_null()))
            .map(|(id, _)| root.question(id))
            .collect()
    }

    fn nominations<'r>(&self, root: &'r DataRoot) -> Vec<NominationRef<'r>> {
        root.nominations_for_entity(self.entity_type(), self.id())
    }

    /// Nominations in `constituency` for the election's current round.
    fn applicable_nominations<'r>(
        &self,
        root: &'r DataRoot,
        election: &Election,
        constituency: &Constituency,
    ) -> Vec<NominationRef<'r>> {
        root.find_nominations(
            &NominationQuery::new()
                .with_entity(self.entity_type(), self.id())
                .with_election(election.id())
                .with_constituency(constituency.id())
                .with_round(election.round()),
        )
    }

    fn formatted_answer(
        &self,
        root: &DataRoot,
        question: &Question,
        options: &ListFormatOptions<'_>,
    ) -> String {
        root.format_answer(question, self.raw_answer(question.id()), options)
    }
}

fn check_entity_id(data: &EntityData, expected: EntityType) -> DataResult<()> {
    if !is_valid_id(&data.id) {
        return Err(DataError::provision(format!("{expected} id MUST NOT be blank")));
    }
    match data.entity_type {
        Some(entity_type) if entity_type != expected => Err(DataError::provision(format!(
            "entity `{}` has type {entity_type} but MUST be {expected}",
            data.id
        ))),
        _ => Ok(()),
    }
}

fn data_name(data: &EntityData) -> Option<&str> {
    data.common.name.as_deref().filter(|name| !name.is_empty())
}

fn data_short_name(data: &EntityData) -> Option<&str> {
    data.common
        .short_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| data_name(data))
}

/// Unique entities in first-seen order.
fn push_unique<'r, T: DataObject>(items: &mut Vec<&'r T>, item: &'r T) {
    if !items.iter().any(|known| known.id() == item.id()) {
        items.push(item);
    }
}

macro_rules! entity_struct {
    ($(#[$meta:meta])* $ty:ident, $kind:expr, $object_type:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $ty {
            id: Id,
            data: EntityData,
            updates: Updatable<$ty>,
        }

        impl_data_object!($ty, $object_type);

        impl $ty {
            /// # Errors
            /// Returns [`DataError::Provision`] if the id is blank or the data is for another type.
            pub fn new(mut data: EntityData) -> DataResult<Self> {
                check_entity_id(&data, $kind)?;
                data.entity_type = Some($kind);
                Ok(Self { id: data.id.clone(), data, updates: Updatable::new() })
            }

            #[must_use]
            pub fn data(&self) -> &EntityData {
                &self.data
            }
        }
    };
}

entity_struct!(Alliance, EntityType::Alliance, ObjectType::Alliance);
entity_struct!(Candidate, EntityType::Candidate, ObjectType::Candidate);
entity_struct!(
    /// A faction is a sub-list of an organization's nomination.
    Faction,
    EntityType::Faction,
    ObjectType::Faction
);
entity_struct!(Organization, EntityType::Organization, ObjectType::Organization);

impl Entity for Alliance {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Alliance
    }

    fn display_name(&self, root: &DataRoot) -> String {
        data_name(&self.data)
            .map_or_else(|| (root.formatters().alliance_name)(self, root), str::to_string)
    }

    fn display_short_name(&self, root: &DataRoot) -> String {
        data_short_name(&self.data)
            .map_or_else(|| (root.formatters().alliance_short_name)(self, root), str::to_string)
    }
}

impl Alliance {
    /// Member organizations across all of the alliance's nominations.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn organizations<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Organization>> {
        let mut organizations = Vec::new();
        for nomination in root.alliance_nominations_for(&self.id) {
            for member in nomination.organization_nominations(root)? {
                push_unique(&mut organizations, member.organization(root)?);
            }
        }
        Ok(organizations)
    }
}

impl Entity for Candidate {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Candidate
    }

    fn display_name(&self, root: &DataRoot) -> String {
        data_name(&self.data)
            .map_or_else(|| (root.formatters().candidate_name)(self, root), str::to_string)
    }

    fn display_short_name(&self, root: &DataRoot) -> String {
        match self.data.common.short_name.as_deref().filter(|name| !name.is_empty()) {
            Some(short_name) => short_name.to_string(),
            None => (root.formatters().candidate_short_name)(self, root),
        }
    }
}

impl Candidate {
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.data.first_name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        self.data.last_name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.data.organization_id.as_deref()
    }

    /// The organization the candidate is a member of, if any.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] for a dangling `organizationId`.
    pub fn organization<'r>(&self, root: &'r DataRoot) -> DataResult<Option<&'r Organization>> {
        self.organization_id().map(|id| root.organization(id)).transpose()
    }
}

impl Entity for Faction {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Faction
    }

    fn display_name(&self, root: &DataRoot) -> String {
        data_name(&self.data)
            .map_or_else(|| (root.formatters().faction_name)(self, root), str::to_string)
    }

    fn display_short_name(&self, root: &DataRoot) -> String {
        data_short_name(&self.data).map_or_else(|| self.display_name(root), str::to_string)
    }
}

impl Faction {
    /// The organization whose nomination the faction belongs to.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the faction has no nominations.
    pub fn organization<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Organization> {
        let nomination = root
            .faction_nominations_for(&self.id)
            .into_iter()
            .next()
            .ok_or_else(|| DataError::not_found("faction nomination for faction", &self.id))?;
        nomination.list(root)?.organization(root)
    }

    /// Candidates nominated in any of the faction's nominations, sorted by order then id.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn candidates<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Candidate>> {
        let mut candidates = Vec::new();
        for nomination in root.faction_nominations_for(&self.id) {
            for member in nomination.candidate_nominations(root)? {
                push_unique(&mut candidates, member.candidate(root)?);
            }
        }
        candidates.sort_by(|a, b| a.order().total_cmp(&b.order()).then_with(|| a.id.cmp(&b.id)));
        Ok(candidates)
    }
}

impl Entity for Organization {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Organization
    }

    fn display_name(&self, _root: &DataRoot) -> String {
        self.name().to_string()
    }

    fn display_short_name(&self, _root: &DataRoot) -> String {
        self.short_name().to_string()
    }
}

impl Organization {
    /// Candidates whose `organizationId` points here, in display order.
    #[must_use]
    pub fn member_candidates<'r>(&self, root: &'r DataRoot) -> Vec<&'r Candidate> {
        let mut members = root
            .candidates()
            .unwrap_or_default()
            .into_iter()
            .filter(|candidate| candidate.organization_id() == Some(self.id.as_str()))
            .collect::<Vec<_>>();
        sort_by_order(&mut members);
        members
    }

    /// Candidates nominated directly on the organization's lists.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn nominated_candidates<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Candidate>> {
        let mut candidates = Vec::new();
        for nomination in root.organization_nominations_for(&self.id) {
            for member in nomination.candidate_nominations(root)? {
                push_unique(&mut candidates, member.candidate(root)?);
            }
        }
        Ok(candidates)
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a parent nomination does not resolve.
    pub fn alliances<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Alliance>> {
        let mut alliances = Vec::new();
        for nomination in root.organization_nominations_for(&self.id) {
            if let Some(parent) = nomination.alliance_nomination(root)? {
                push_unique(&mut alliances, parent.alliance(root)?);
            }
        }
        Ok(alliances)
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a faction nomination does not resolve.
    pub fn factions<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Faction>> {
        let mut factions = Vec::new();
        for nomination in root.organization_nominations_for(&self.id) {
            for member in nomination.faction_nominations(root)? {
                push_unique(&mut factions, member.faction(root)?);
            }
        }
        Ok(factions)
    }
}

/// A borrowed entity of any kind.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'r> {
    Alliance(&'r Alliance),
    Candidate(&'r Candidate),
    Faction(&'r Faction),
    Organization(&'r Organization),
}

impl EntityRef<'_> {
    fn inner(&self) -> &dyn Entity {
        match self {
            Self::Alliance(entity) => *entity,
            Self::Candidate(entity) => *entity,
            Self::Faction(entity) => *entity,
            Self::Organization(entity) => *entity,
        }
    }
}

impl<'r> EntityRef<'r> {
    /// The entity's data with the registry's lifetime.
    #[must_use]
    pub fn data(self) -> &'r EntityData {
        match self {
            Self::Alliance(entity) => entity.data(),
            Self::Candidate(entity) => entity.data(),
            Self::Faction(entity) => entity.data(),
            Self::Organization(entity) => entity.data(),
        }
    }
}

impl DataObject for EntityRef<'_> {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn fields(&self) -> &ObjectFields {
        self.inner().fields()
    }

    fn object_type(&self) -> ObjectType {
        self.inner().object_type()
    }
}

impl Entity for EntityRef<'_> {
    fn entity_data(&self) -> &EntityData {
        self.inner().entity_data()
    }

    fn entity_type(&self) -> EntityType {
        self.inner().entity_type()
    }

    fn display_name(&self, root: &DataRoot) -> String {
        self.inner().display_name(root)
    }

    fn display_short_name(&self, root: &DataRoot) -> String {
        self.inner().display_short_name(root)
    }
}
