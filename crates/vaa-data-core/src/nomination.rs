use serde::{Deserialize, Serialize};

use crate::answer::Answers;
use crate::constituency::Constituency;
use crate::election::Election;
use crate::entity::{Alliance, Candidate, Entity, EntityRef, Faction, Organization};
use crate::error::{DataError, DataResult};
use crate::filter::FilterTargets;
use crate::object::{DataObject, EntityType, Id, ObjectFields, ObjectType};
use crate::question::Question;
use crate::root::{DataRoot, QuestionQuery};
use crate::updatable::{impl_observable, Updatable};

/// Ingest record for a nomination of any kind. Nested records inherit the election,
/// constituency, round and parent of the record that contains them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NominationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituency_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_nomination_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_nomination_type: Option<EntityType>,
    #[serde(flatten)]
    pub common: ObjectFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<NominationData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factions: Option<Vec<NominationData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<NominationData>>,
}

impl NominationData {
    /// Nested records with their inherited location and parent filled in.
    #[must_use]
    pub fn children_of(&self, parent_id: &str, parent_type: EntityType) -> Vec<NominationData> {
        let nested = [
            (EntityType::Organization, &self.organizations),
            (EntityType::Faction, &self.factions),
            (EntityType::Candidate, &self.candidates),
        ];
        nested
            .into_iter()
            .flat_map(|(entity_type, children)| {
                children.iter().flatten().map(move |child| (entity_type, child))
            })
            .map(|(entity_type, child)| NominationData {
                entity_type: Some(entity_type),
                election_id: self.election_id.clone(),
                constituency_id: self.constituency_id.clone(),
                election_round: self.election_round,
                parent_nomination_id: Some(parent_id.to_string()),
                parent_nomination_type: Some(parent_type),
                ..child.clone()
            })
            .collect()
    }

    fn nested_len(children: Option<&Vec<NominationData>>) -> usize {
        children.map_or(0, Vec::len)
    }

    /// Entity ids of nested records, which MUST all be present.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] naming the nested kind that lacks an id.
    pub fn nested_entity_ids(&self, entity_type: EntityType) -> DataResult<Vec<&str>> {
        let children = match entity_type {
            EntityType::Organization => self.organizations.as_ref(),
            EntityType::Faction => self.factions.as_ref(),
            EntityType::Candidate => self.candidates.as_ref(),
            EntityType::Alliance => None,
        };
        children
            .into_iter()
            .flatten()
            .map(|child| {
                child.entity_id.as_deref().ok_or_else(|| {
                    DataError::provision(format!("nested {entity_type} nomination MUST have an entityId"))
                })
            })
            .collect()
    }
}

/// Structural rules that do not need the registry: parent pairing, allowed parents and
/// nested cardinality.
///
/// # Errors
/// Returns [`DataError::Provision`] describing the first violation.
pub fn check_shape(entity_type: EntityType, data: &NominationData) -> DataResult<()> {
    let parent_type = match (&data.parent_nomination_type, &data.parent_nomination_id) {
        (Some(parent_type), Some(_)) => Some(*parent_type),
        (None, None) => None,
        _ => {
            return Err(DataError::provision(format!(
                "{entity_type} nomination MUST define either both or neither of parentNominationType and parentNominationId"
            )))
        }
    };
    if let Some(parent_type) = parent_type {
        let allowed = match entity_type {
            EntityType::Alliance => false,
            EntityType::Candidate => {
                matches!(parent_type, EntityType::Faction | EntityType::Organization)
            }
            EntityType::Faction => parent_type == EntityType::Organization,
            EntityType::Organization => parent_type == EntityType::Alliance,
        };
        if !allowed {
            return Err(DataError::provision(format!(
                "{entity_type} nomination MUST NOT be nested under a {parent_type} nomination"
            )));
        }
    }
    let organizations = NominationData::nested_len(data.organizations.as_ref());
    let factions = NominationData::nested_len(data.factions.as_ref());
    let candidates = NominationData::nested_len(data.candidates.as_ref());
    match entity_type {
        EntityType::Alliance => {
            if organizations < 2 {
                return Err(DataError::provision(format!(
                    "alliance nomination MUST have at least two organization nominations, got {organizations}"
                )));
            }
            if factions + candidates > 0 {
                return Err(DataError::provision(
                    "alliance nomination MUST only nest organization nominations",
                ));
            }
        }
        EntityType::Faction => {
            if candidates == 0 {
                return Err(DataError::provision(
                    "faction nomination MUST have at least one candidate nomination",
                ));
            }
            if parent_type.is_none() {
                return Err(DataError::provision(
                    "faction nomination MUST be nested under an organization nomination",
                ));
            }
            if organizations + factions > 0 {
                return Err(DataError::provision("faction nomination MUST only nest candidate nominations"));
            }
        }
        EntityType::Organization => {
            if candidates > 0 && factions > 0 {
                return Err(DataError::provision(
                    "organization nomination MUST NOT have both candidate and faction nominations",
                ));
            }
            if organizations > 0 {
                return Err(DataError::provision(
                    "organization nomination MUST NOT nest organization nominations",
                ));
            }
            if data.entity_id.is_none() {
                return Err(DataError::provision("organization nomination MUST have an entityId"));
            }
        }
        EntityType::Candidate => {
            if organizations + factions + candidates > 0 {
                return Err(DataError::provision("candidate nomination MUST NOT nest other nominations"));
            }
            if data.entity_id.is_none() {
                return Err(DataError::provision("candidate nomination MUST have an entityId"));
            }
        }
    }
    Ok(())
}

/// The resolved location and identity shared by every nomination kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NominationCore {
    id: Id,
    entity_type: EntityType,
    entity_id: Id,
    election_id: Id,
    constituency_id: Id,
    election_round: u32,
    parent: Option<(EntityType, Id)>,
    data: NominationData,
}

impl NominationCore {
    /// `data` MUST carry its id, entity id, election and constituency, all of which MUST
    /// resolve in `root` together with any parent.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] for a missing field or unresolved reference.
    pub fn new(entity_type: EntityType, data: NominationData, root: &DataRoot) -> DataResult<Self> {
        let missing = |field: &str| {
            DataError::provision(format!("{entity_type} nomination MUST have {field}"))
        };
        let id = data.id.clone().ok_or_else(|| missing("an id"))?;
        let entity_id = data.entity_id.clone().ok_or_else(|| missing("an entityId"))?;
        let election_id = data.election_id.clone().ok_or_else(|| missing("an electionId"))?;
        let constituency_id = data.constituency_id.clone().ok_or_else(|| missing("a constituencyId"))?;
        let election_round = data.election_round.unwrap_or(1);
        if election_round == 0 {
            return Err(DataError::provision(format!("nomination `{id}` round MUST be at least 1")));
        }
        let unresolved = |what: &str, target: &str| {
            DataError::provision(format!("nomination `{id}` references missing {what} `{target}`"))
        };
        root.election(&election_id).map_err(|_| unresolved("election", &election_id))?;
        root.constituency(&constituency_id).map_err(|_| unresolved("constituency", &constituency_id))?;
        root.entity(entity_type, &entity_id).map_err(|_| unresolved(entity_type.as_str(), &entity_id))?;
        let parent = match (data.parent_nomination_type, data.parent_nomination_id.clone()) {
            (Some(parent_type), Some(parent_id)) => {
                root.nomination(parent_type, &parent_id)
                    .map_err(|_| unresolved("parent nomination", &parent_id))?;
                Some((parent_type, parent_id))
            }
            _ => None,
        };
        Ok(Self {
            id,
            entity_type,
            entity_id,
            election_id,
            constituency_id,
            election_round,
            parent,
            data,
        })
    }

    #[must_use]
    pub fn data(&self) -> &NominationData {
        &self.data
    }
}

pub trait Nomination: DataObject {
    fn core(&self) -> &NominationCore;

    fn entity_type(&self) -> EntityType {
        self.core().entity_type
    }

    fn entity_id(&self) -> &str {
        &self.core().entity_id
    }

    fn election_id(&self) -> &str {
        &self.core().election_id
    }

    fn constituency_id(&self) -> &str {
        &self.core().constituency_id
    }

    fn election_round(&self) -> u32 {
        self.core().election_round
    }

    fn election_symbol(&self) -> &str {
        self.core().data.election_symbol.as_deref().unwrap_or_default()
    }

    fn parent_nomination_type(&self) -> Option<EntityType> {
        self.core().parent.as_ref().map(|(parent_type, _)| *parent_type)
    }

    fn parent_nomination_id(&self) -> Option<&str> {
        self.core().parent.as_ref().map(|(_, parent_id)| parent_id.as_str())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the entity does not resolve.
    fn entity<'r>(&self, root: &'r DataRoot) -> DataResult<EntityRef<'r>> {
        root.entity(self.entity_type(), self.entity_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the election does not resolve.
    fn election<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Election> {
        root.election(self.election_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the constituency does not resolve.
    fn constituency<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Constituency> {
        root.constituency(self.constituency_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the parent does not resolve.
    fn parent_nomination<'r>(&self, root: &'r DataRoot) -> DataResult<Option<NominationRef<'r>>> {
        self.core()
            .parent
            .as_ref()
            .map(|(parent_type, parent_id)| root.nomination(*parent_type, parent_id))
            .transpose()
    }

    /// The nomination's own name, falling back to the entity's.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the entity is needed and does not resolve.
    fn display_name(&self, root: &DataRoot) -> DataResult<String> {
        match self.fields().name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => Ok(name.to_string()),
            None => Ok(self.entity(root)?.display_name(root)),
        }
    }

    /// Own short name, then own name, then the entity's short name.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the entity is needed and does not resolve.
    fn display_short_name(&self, root: &DataRoot) -> DataResult<String> {
        let fields = self.fields();
        let own = [fields.short_name.as_deref(), fields.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty());
        match own {
            Some(name) => Ok(name.to_string()),
            None => Ok(self.entity(root)?.display_short_name(root)),
        }
    }

    /// Questions that apply to this nomination's entity type, election, round and constituency.
    fn applicable_questions<'r>(&self, root: &'r DataRoot) -> Vec<&'r Question> {
        let targets = FilterTargets::new()
            .with_entity_type(self.entity_type())
            .with_election(self.election_id())
            .with_election_round(self.election_round())
            .with_constituency(self.constituency_id());
        root.find_questions(&QuestionQuery::new().with_targets(targets))
    }

    /// The entity's answers.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the entity does not resolve.
    fn answers<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Answers> {
        Ok(&self.entity(root)?.data().answers)
    }
}

macro_rules! impl_nomination {
    ($ty:ty, $object_type:expr) => {
        impl DataObject for $ty {
            fn id(&self) -> &str {
                &self.core.id
            }

            fn fields(&self) -> &ObjectFields {
                &self.core.data.common
            }

            fn object_type(&self) -> ObjectType {
                $object_type
            }
        }

        impl Nomination for $ty {
            fn core(&self) -> &NominationCore {
                &self.core
            }
        }

        impl_observable!($ty);
    };
}

fn resolve_all<'r, T>(
    ids: &[Id],
    resolve: impl Fn(&str) -> DataResult<&'r T>,
) -> DataResult<Vec<&'r T>> {
    ids.iter().map(|id| resolve(id.as_str())).collect()
}

#[derive(Debug)]
pub struct AllianceNomination {
    core: NominationCore,
    organization_nomination_ids: Vec<Id>,
    updates: Updatable<AllianceNomination>,
}

impl_nomination!(AllianceNomination, ObjectType::AllianceNomination);

impl AllianceNomination {
    #[must_use]
    pub fn new(core: NominationCore) -> Self {
        Self { core, organization_nomination_ids: Vec::new(), updates: Updatable::new() }
    }

    pub(crate) fn set_organization_nomination_ids(&mut self, ids: Vec<Id>) {
        self.organization_nomination_ids = ids;
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the alliance does not resolve.
    pub fn alliance<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Alliance> {
        root.alliance(self.entity_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the alliance has no member nominations or one
    /// does not resolve.
    pub fn organization_nominations<'r>(
        &self,
        root: &'r DataRoot,
    ) -> DataResult<Vec<&'r OrganizationNomination>> {
        if self.organization_nomination_ids.is_empty() {
            return Err(DataError::not_found("organization nominations of alliance nomination", &self.core.id));
        }
        resolve_all(&self.organization_nomination_ids, |id| root.organization_nomination(id))
    }
}

#[derive(Debug)]
pub struct CandidateNomination {
    core: NominationCore,
    updates: Updatable<CandidateNomination>,
}

impl_nomination!(CandidateNomination, ObjectType::CandidateNomination);

impl CandidateNomination {
    #[must_use]
    pub fn new(core: NominationCore) -> Self {
        Self { core, updates: Updatable::new() }
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the candidate does not resolve.
    pub fn candidate<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Candidate> {
        root.candidate(self.entity_id())
    }

    /// The organization or faction list the candidate is nominated on, if any.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the parent does not resolve.
    pub fn list<'r>(&self, root: &'r DataRoot) -> DataResult<Option<NominationRef<'r>>> {
        self.parent_nomination(root)
    }
}

#[derive(Debug)]
pub struct FactionNomination {
    core: NominationCore,
    candidate_nomination_ids: Vec<Id>,
    updates: Updatable<FactionNomination>,
}

impl_nomination!(FactionNomination, ObjectType::FactionNomination);

impl FactionNomination {
    #[must_use]
    pub fn new(core: NominationCore) -> Self {
        Self { core, candidate_nomination_ids: Vec::new(), updates: Updatable::new() }
    }

    pub(crate) fn set_candidate_nomination_ids(&mut self, ids: Vec<Id>) {
        self.candidate_nomination_ids = ids;
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the faction does not resolve.
    pub fn faction<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Faction> {
        root.faction(self.entity_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn candidate_nominations<'r>(
        &self,
        root: &'r DataRoot,
    ) -> DataResult<Vec<&'r CandidateNomination>> {
        resolve_all(&self.candidate_nomination_ids, |id| root.candidate_nomination(id))
    }

    /// The organization nomination the faction is part of.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] if the parent is absent or does not resolve.
    pub fn list<'r>(&self, root: &'r DataRoot) -> DataResult<&'r OrganizationNomination> {
        let Some(parent_id) = self.parent_nomination_id() else {
            return Err(DataError::not_found("parent nomination of faction nomination", &self.core.id));
        };
        root.organization_nomination(parent_id)
    }
}

#[derive(Debug)]
pub struct OrganizationNomination {
    core: NominationCore,
    candidate_nomination_ids: Vec<Id>,
    faction_nomination_ids: Vec<Id>,
    updates: Updatable<OrganizationNomination>,
}

impl_nomination!(OrganizationNomination, ObjectType::OrganizationNomination);

impl OrganizationNomination {
    #[must_use]
    pub fn new(core: NominationCore) -> Self {
        Self {
            core,
            candidate_nomination_ids: Vec::new(),
            faction_nomination_ids: Vec::new(),
            updates: Updatable::new(),
        }
    }

    pub(crate) fn set_candidate_nomination_ids(&mut self, ids: Vec<Id>) {
        self.candidate_nomination_ids = ids;
    }

    pub(crate) fn set_faction_nomination_ids(&mut self, ids: Vec<Id>) {
        self.faction_nomination_ids = ids;
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the organization does not resolve.
    pub fn organization<'r>(&self, root: &'r DataRoot) -> DataResult<&'r Organization> {
        root.organization(self.entity_id())
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if the parent does not resolve.
    pub fn alliance_nomination<'r>(&self, root: &'r DataRoot) -> DataResult<Option<&'r AllianceNomination>> {
        self.parent_nomination_id().map(|id| root.alliance_nomination(id)).transpose()
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn candidate_nominations<'r>(
        &self,
        root: &'r DataRoot,
    ) -> DataResult<Vec<&'r CandidateNomination>> {
        resolve_all(&self.candidate_nomination_ids, |id| root.candidate_nomination(id))
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a member nomination does not resolve.
    pub fn faction_nominations<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r FactionNomination>> {
        resolve_all(&self.faction_nomination_ids, |id| root.faction_nomination(id))
    }

    #[must_use]
    pub fn has_candidates(&self) -> bool {
        !self.candidate_nomination_ids.is_empty()
    }

    #[must_use]
    pub fn has_factions(&self) -> bool {
        !self.faction_nomination_ids.is_empty()
    }
}

/// A borrowed nomination of any kind.
#[derive(Debug, Clone, Copy)]
pub enum NominationRef<'r> {
    Alliance(&'r AllianceNomination),
    Candidate(&'r CandidateNomination),
    Faction(&'r FactionNomination),
    Organization(&'r OrganizationNomination),
}

impl NominationRef<'_> {
    fn inner(&self) -> &dyn Nomination {
        match self {
            Self::Alliance(nomination) => *nomination,
            Self::Candidate(nomination) => *nomination,
            Self::Faction(nomination) => *nomination,
            Self::Organization(nomination) => *nomination,
        }
    }
}

impl DataObject for NominationRef<'_> {
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

impl Nomination for NominationRef<'_> {
    fn core(&self) -> &NominationCore {
        self.inner().core()
    }
}

/// Criteria for [`DataRoot::find_nominations`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NominationQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Id>,
    pub election_id: Option<Id>,
    pub constituency_id: Option<Id>,
    pub election_round: Option<u32>,
}

impl NominationQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity_type: EntityType, entity_id: impl Into<Id>) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn with_election(mut self, election_id: impl Into<Id>) -> Self {
        self.election_id = Some(election_id.into());
        self
    }

    #[must_use]
    pub fn with_constituency(mut self, constituency_id: impl Into<Id>) -> Self {
        self.constituency_id = Some(constituency_id.into());
        self
    }

    #[must_use]
    pub fn with_round(mut self, election_round: u32) -> Self {
        self.election_round = Some(election_round);
        self
    }

    #[must_use]
    pub fn matches(&self, nomination: &dyn Nomination) -> bool {
        fn field(expected: Option<&str>, actual: &str) -> bool {
            expected.map_or(true, |expected| expected == actual)
        }
        self.entity_type.map_or(true, |entity_type| entity_type == nomination.entity_type())
            && field(self.entity_id.as_deref(), nomination.entity_id())
            && field(self.election_id.as_deref(), nomination.election_id())
            && field(self.constituency_id.as_deref(), nomination.constituency_id())
            && self.election_round.map_or(true, |round| round == nomination.election_round())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mk_data(value: serde_json::Value) -> NominationData {
        match serde_json::from_value(value) {
            Ok(data) => data,
            Err(err) => panic!("nomination fixture should deserialize: {err}"),
        }
    }

    fn shape(entity_type: EntityType, value: serde_json::Value) -> DataResult<()> {
        check_shape(entity_type, &mk_data(value))
    }

    #[test]
    fn alliance_needs_two_organizations() {
        let one = shape(EntityType::Alliance, json!({ "organizations": [{ "entityId": "o-1" }] }));
        assert!(matches!(one, Err(DataError::Provision(_))));
        let two = shape(
            EntityType::Alliance,
            json!({ "organizations": [{ "entityId": "o-1" }, { "entityId": "o-2" }] }),
        );
        assert_eq!(two, Ok(()));
    }

    #[test]
    fn faction_needs_candidates_and_a_parent() {
        let empty = shape(
            EntityType::Faction,
            json!({ "candidates": [], "parentNominationId": "n", "parentNominationType": "organization" }),
        );
        assert!(matches!(empty, Err(DataError::Provision(_))));
        let orphan = shape(EntityType::Faction, json!({ "candidates": [{ "entityId": "c-1" }] }));
        assert!(matches!(orphan, Err(DataError::Provision(_))));
        let nested = shape(
            EntityType::Faction,
            json!({
                "candidates": [{ "entityId": "c-1" }],
                "parentNominationId": "n",
                "parentNominationType": "organization"
            }),
        );
        assert_eq!(nested, Ok(()));
    }

    #[test]
    fn parent_fields_come_in_pairs() {
        let half = shape(
            EntityType::Candidate,
            json!({ "entityId": "c-1", "parentNominationId": "n" }),
        );
        assert!(matches!(half, Err(DataError::Provision(_))));
    }

    #[test]
    fn parent_kinds_are_restricted() {
        let under_alliance = shape(
            EntityType::Candidate,
            json!({ "entityId": "c-1", "parentNominationId": "n", "parentNominationType": "alliance" }),
        );
        assert!(matches!(under_alliance, Err(DataError::Provision(_))));
        let under_faction = shape(
            EntityType::Candidate,
            json!({ "entityId": "c-1", "parentNominationId": "n", "parentNominationType": "faction" }),
        );
        assert_eq!(under_faction, Ok(()));
        let organization_under_organization = shape(
            EntityType::Organization,
            json!({ "entityId": "o-1", "parentNominationId": "n", "parentNominationType": "organization" }),
        );
        assert!(matches!(organization_under_organization, Err(DataError::Provision(_))));
    }

    #[test]
    fn organization_cannot_mix_candidates_and_factions() {
        let mixed = shape(
            EntityType::Organization,
            json!({
                "entityId": "o-1",
                "candidates": [{ "entityId": "c-1" }],
                "factions": [{ "candidates": [{ "entityId": "c-2" }] }]
            }),
        );
        assert!(matches!(mixed, Err(DataError::Provision(_))));
    }

    #[test]
    fn children_inherit_location_and_parent() {
        let data = mk_data(json!({
            "electionId": "e-1",
            "constituencyId": "c-1",
            "electionRound": 2,
            "entityId": "o-1",
            "candidates": [{ "entityId": "c-1" }, { "entityId": "c-2", "electionSymbol": "12" }]
        }));
        let children = data.children_of("n-1", EntityType::Organization);
        assert_eq!(children.len(), 2);
        for child in &children {
            assert_eq!(child.entity_type, Some(EntityType::Candidate));
            assert_eq!(child.election_id.as_deref(), Some("e-1"));
            assert_eq!(child.constituency_id.as_deref(), Some("c-1"));
            assert_eq!(child.election_round, Some(2));
            assert_eq!(child.parent_nomination_id.as_deref(), Some("n-1"));
            assert_eq!(child.parent_nomination_type, Some(EntityType::Organization));
        }
        assert_eq!(children[1].election_symbol.as_deref(), Some("12"));
    }

    #[test]
    fn nested_entity_ids_must_be_present() {
        let data = mk_data(json!({ "organizations": [{ "entityId": "o-1" }, { "info": "no id" }] }));
        assert!(matches!(
            data.nested_entity_ids(EntityType::Organization),
            Err(DataError::Provision(_))
        ));
        let data = mk_data(json!({ "candidates": [{ "entityId": "c-2" }, { "entityId": "c-1" }] }));
        assert_eq!(data.nested_entity_ids(EntityType::Candidate), Ok(vec!["c-2", "c-1"]));
    }

    #[test]
    fn query_matches_only_set_fields() {
        let query = NominationQuery::new().with_election("e-1").with_round(2);
        assert_eq!(query.entity_type, None);
        assert_eq!(query.election_id.as_deref(), Some("e-1"));
        assert_eq!(NominationQuery::new(), NominationQuery::default());
    }
}
