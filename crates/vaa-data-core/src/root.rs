//! The registry that owns every object of one data set.
//!
//! Objects refer to each other by id and resolve through [`DataRoot`]. Provisioning runs
//! bottom-up (constituencies, groups, elections, categories, questions, entities,
//! nominations) and is atomic per call: whatever a failed call inserted is rolled back.

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter as FmtFormatter};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::answer::{Answer, AnswerValue};
use crate::category::{QuestionCategory, QuestionCategoryData, QuestionCategoryType};
use crate::constituency::{Constituency, ConstituencyData, ConstituencyGroup, ConstituencyGroupData};
use crate::document::{ConstituenciesData, EntitiesInput, FullVaaData, NominationsInput, QuestionsData};
use crate::election::{Election, ElectionData};
use crate::entity::{Alliance, Candidate, EntityData, EntityRef, Faction, Organization};
use crate::error::{DataError, DataResult};
use crate::filter::{FilterTargets, Filterable};
use crate::format::{Formatter, Formatters, ListFormatOptions};
use crate::ids::{create_deterministic_id, is_valid_id, Discriminant, IdentityProps};
use crate::nomination::{
    check_shape, AllianceNomination, CandidateNomination, FactionNomination, Nomination,
    NominationCore, NominationData, NominationQuery, NominationRef, OrganizationNomination,
};
use crate::object::{sort_by_order, DataObject, EntityType, Id};
use crate::question::{Question, QuestionData, QuestionKind};
use crate::updatable::{impl_observable, Observable, Updatable};

/// Locale used for number formatting when the root has none.
pub const DEFAULT_LOCALE: &str = "en";

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag of one registry instance.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RootGeneration(u64);

impl RootGeneration {
    fn next() -> Self {
        Self(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for RootGeneration {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RootOptions {
    pub locale: Option<String>,
}

/// Criteria for [`DataRoot::find_questions`].
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct QuestionQuery {
    pub category_type: Option<QuestionCategoryType>,
    pub targets: FilterTargets,
}

impl QuestionQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_targets(mut self, targets: FilterTargets) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn with_category_type(mut self, category_type: QuestionCategoryType) -> Self {
        self.category_type = Some(category_type);
        self
    }
}

/// What one provisioning call changed, so that it can be undone.
#[derive(Debug, Default)]
struct Journal {
    inserted: Vec<(Collection, Id)>,
    opened: Vec<Collection>,
}

type Slot<T> = Option<IndexMap<Id, T>>;

/// entity type -> entity id -> nomination ids, in insertion order.
type NominationIndex = HashMap<EntityType, HashMap<Id, Vec<Id>>>;

pub struct DataRoot {
    generation: RootGeneration,
    options: RootOptions,
    formatters: Formatters,
    elections: Slot<Election>,
    constituencies: Slot<Constituency>,
    constituency_groups: Slot<ConstituencyGroup>,
    question_categories: Slot<QuestionCategory>,
    questions: Slot<Question>,
    alliances: Slot<Alliance>,
    candidates: Slot<Candidate>,
    factions: Slot<Faction>,
    organizations: Slot<Organization>,
    alliance_nominations: Slot<AllianceNomination>,
    candidate_nominations: Slot<CandidateNomination>,
    faction_nominations: Slot<FactionNomination>,
    organization_nominations: Slot<OrganizationNomination>,
    nomination_index: NominationIndex,
    updates: Updatable<DataRoot>,
}

impl_observable!(DataRoot);

impl Debug for DataRoot {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRoot")
            .field("generation", &self.generation)
            .field("locale", &self.options.locale)
            .field("updates", &self.updates)
            .finish_non_exhaustive()
    }
}

macro_rules! collections {
    ($($variant:ident => $field:ident, $single:ident, $single_mut:ident, $ty:ty, $label:literal;)+) => {
        #[derive(Debug, Clone, Copy, Eq, PartialEq)]
        enum Collection {
            $($variant,)+
        }

        impl DataRoot {
            $(
                #[doc = concat!("Every ", $label, " sorted by order, or `None` until provisioned.")]
                #[must_use]
                pub fn $field(&self) -> Option<Vec<&$ty>> {
                    self.$field.as_ref().map(|map| {
                        let mut items = map.values().collect::<Vec<_>>();
                        sort_by_order(&mut items);
                        items
                    })
                }

                #[doc = concat!("Look up one ", $label, " by id.")]
                #[doc = ""]
                #[doc = "# Errors"]
                #[doc = "Returns [`DataError::NotFound`] for an unknown id."]
                pub fn $single(&self, id: &str) -> DataResult<&$ty> {
                    self.$field
                        .as_ref()
                        .and_then(|map| map.get(id))
                        .ok_or_else(|| DataError::not_found($label, id))
                }

                #[doc = concat!("Mutable access to one ", $label, ", e.g. to subscribe to it.")]
                #[doc = ""]
                #[doc = "# Errors"]
                #[doc = "Returns [`DataError::NotFound`] for an unknown id."]
                pub fn $single_mut(&mut self, id: &str) -> DataResult<&mut $ty> {
                    self.$field
                        .as_mut()
                        .and_then(|map| map.get_mut(id))
                        .ok_or_else(|| DataError::not_found($label, id))
                }
            )+

            /// Remove one object, or the whole collection when `id` is `None`.
            fn discard(&mut self, collection: Collection, id: Option<&str>) {
                match collection {
                    $(
                        Collection::$variant => match id {
                            Some(id) => {
                                if let Some(map) = self.$field.as_mut() {
                                    map.shift_remove(id);
                                }
                            }
                            None => self.$field = None,
                        },
                    )+
                }
            }

            fn release_objects(&mut self) -> usize {
                let mut released = 0;
                $(
                    for object in self.$field.iter_mut().flat_map(IndexMap::values_mut) {
                        released += object.updatable_mut().release_all();
                    }
                )+
                released
            }
        }
    };
}

collections! {
    Elections => elections, election, election_mut, Election, "election";
    Constituencies => constituencies, constituency, constituency_mut, Constituency, "constituency";
    ConstituencyGroups => constituency_groups, constituency_group, constituency_group_mut, ConstituencyGroup, "constituency group";
    QuestionCategories => question_categories, question_category, question_category_mut, QuestionCategory, "question category";
    Questions => questions, question, question_mut, Question, "question";
    Alliances => alliances, alliance, alliance_mut, Alliance, "alliance";
    Candidates => candidates, candidate, candidate_mut, Candidate, "candidate";
    Factions => factions, faction, faction_mut, Faction, "faction";
    Organizations => organizations, organization, organization_mut, Organization, "organization";
    AllianceNominations => alliance_nominations, alliance_nomination, alliance_nomination_mut, AllianceNomination, "alliance nomination";
    CandidateNominations => candidate_nominations, candidate_nomination, candidate_nomination_mut, CandidateNomination, "candidate nomination";
    FactionNominations => faction_nominations, faction_nomination, faction_nomination_mut, FactionNomination, "faction nomination";
    OrganizationNominations => organization_nominations, organization_nomination, organization_nomination_mut, OrganizationNomination, "organization nomination";
}

fn open<'s, T>(slot: &'s mut Slot<T>, collection: Collection, journal: &mut Journal) -> &'s mut IndexMap<Id, T> {
    if slot.is_none() {
        journal.opened.push(collection);
    }
    slot.get_or_insert_with(IndexMap::new)
}

fn insert<T>(slot: &mut Slot<T>, collection: Collection, id: Id, object: T, journal: &mut Journal) {
    open(slot, collection, journal).insert(id.clone(), object);
    journal.inserted.push((collection, id));
}

/// True when `incoming` repeats `existing` exactly and can be skipped.
fn is_duplicate<D: PartialEq>(existing: Option<&D>, incoming: &D, label: &str, id: &str) -> DataResult<bool> {
    match existing {
        None => Ok(false),
        Some(existing) if existing == incoming => {
            tracing::debug!(collection = label, id, "skipping identical object");
            Ok(true)
        }
        Some(_) => Err(DataError::provision(format!(
            "{label} `{id}` is provided twice with conflicting data"
        ))),
    }
}

fn choice_label<'q>(question: &'q Question, id: &str) -> &'q str {
    question.choice(id).map_or("", |choice| choice.label.trim())
}

impl DataRoot {
    #[must_use]
    pub fn new(options: RootOptions) -> Self {
        let generation = RootGeneration::next();
        tracing::debug!(generation = generation.get(), locale = ?options.locale, "created data root");
        Self {
            generation,
            options,
            formatters: Formatters::default(),
            elections: None,
            constituencies: None,
            constituency_groups: None,
            question_categories: None,
            questions: None,
            alliances: None,
            candidates: None,
            factions: None,
            organizations: None,
            alliance_nominations: None,
            candidate_nominations: None,
            faction_nominations: None,
            organization_nominations: None,
            nomination_index: NominationIndex::new(),
            updates: Updatable::new(),
        }
    }

    /// A root provisioned with a whole document.
    ///
    /// # Errors
    /// Returns the first error raised while provisioning `data`.
    pub fn from_data(data: FullVaaData, options: RootOptions) -> DataResult<Self> {
        let mut root = Self::new(options);
        root.provide_full_data(data)?;
        Ok(root)
    }

    #[must_use]
    pub fn generation(&self) -> RootGeneration {
        self.generation
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.options.locale.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &RootOptions {
        &self.options
    }

    #[must_use]
    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    /// Replace one formatter and notify subscribers of the root.
    pub fn set_formatter(&mut self, formatter: Formatter) {
        tracing::debug!(formatter = formatter.key(), "replacing formatter");
        self.formatters.set(formatter);
        self.notify();
    }

    /// Deterministic id for a generated object.
    #[must_use]
    pub fn create_id(&self, props: &IdentityProps<'_>) -> Id {
        let id = create_deterministic_id(props);
        tracing::debug!(kind = props.discriminant.kind().as_str(), %id, "generated id");
        id
    }

    /// # Errors
    /// Returns [`DataError::Provision`] if `id` is blank.
    pub fn check_id(&self, id: &str) -> DataResult<()> {
        if is_valid_id(id) {
            Ok(())
        } else {
            Err(DataError::provision(format!("id `{id}` MUST NOT be blank")))
        }
    }

    /// Release every subscription held by the root and its objects. The root is consumed,
    /// so nothing borrowed from it can outlive this call.
    pub fn dispose(mut self) -> usize {
        let released = self.release_objects() + self.updates.release_all();
        tracing::debug!(generation = self.generation.get(), released, "disposed data root");
        released
    }

    // Lookup by type

    /// # Errors
    /// Returns [`DataError::NotFound`] for an unknown id.
    pub fn entity(&self, entity_type: EntityType, id: &str) -> DataResult<EntityRef<'_>> {
        Ok(match entity_type {
            EntityType::Alliance => EntityRef::Alliance(self.alliance(id)?),
            EntityType::Candidate => EntityRef::Candidate(self.candidate(id)?),
            EntityType::Faction => EntityRef::Faction(self.faction(id)?),
            EntityType::Organization => EntityRef::Organization(self.organization(id)?),
        })
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] for an unknown id.
    pub fn nomination(&self, entity_type: EntityType, id: &str) -> DataResult<NominationRef<'_>> {
        Ok(match entity_type {
            EntityType::Alliance => NominationRef::Alliance(self.alliance_nomination(id)?),
            EntityType::Candidate => NominationRef::Candidate(self.candidate_nomination(id)?),
            EntityType::Faction => NominationRef::Faction(self.faction_nomination(id)?),
            EntityType::Organization => NominationRef::Organization(self.organization_nomination(id)?),
        })
    }

    /// Every nomination of one kind, sorted by order.
    #[must_use]
    pub fn nominations_of_type(&self, entity_type: EntityType) -> Vec<NominationRef<'_>> {
        match entity_type {
            EntityType::Alliance => self
                .alliance_nominations()
                .unwrap_or_default()
                .into_iter()
                .map(NominationRef::Alliance)
                .collect(),
            EntityType::Candidate => self
                .candidate_nominations()
                .unwrap_or_default()
                .into_iter()
                .map(NominationRef::Candidate)
                .collect(),
            EntityType::Faction => self
                .faction_nominations()
                .unwrap_or_default()
                .into_iter()
                .map(NominationRef::Faction)
                .collect(),
            EntityType::Organization => self
                .organization_nominations()
                .unwrap_or_default()
                .into_iter()
                .map(NominationRef::Organization)
                .collect(),
        }
    }

    // Find

    fn indexed(&self, entity_type: EntityType, entity_id: &str) -> impl Iterator<Item = &str> {
        self.nomination_index
            .get(&entity_type)
            .and_then(|by_entity| by_entity.get(entity_id))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Nominations of one entity in provisioning order.
    #[must_use]
    pub fn nominations_for_entity(&self, entity_type: EntityType, entity_id: &str) -> Vec<NominationRef<'_>> {
        self.indexed(entity_type, entity_id)
            .filter_map(|id| self.nomination(entity_type, id).ok())
            .collect()
    }

    #[must_use]
    pub fn alliance_nominations_for(&self, alliance_id: &str) -> Vec<&AllianceNomination> {
        self.indexed(EntityType::Alliance, alliance_id)
            .filter_map(|id| self.alliance_nomination(id).ok())
            .collect()
    }

    #[must_use]
    pub fn candidate_nominations_for(&self, candidate_id: &str) -> Vec<&CandidateNomination> {
        self.indexed(EntityType::Candidate, candidate_id)
            .filter_map(|id| self.candidate_nomination(id).ok())
            .collect()
    }

    #[must_use]
    pub fn faction_nominations_for(&self, faction_id: &str) -> Vec<&FactionNomination> {
        self.indexed(EntityType::Faction, faction_id)
            .filter_map(|id| self.faction_nomination(id).ok())
            .collect()
    }

    #[must_use]
    pub fn organization_nominations_for(&self, organization_id: &str) -> Vec<&OrganizationNomination> {
        self.indexed(EntityType::Organization, organization_id)
            .filter_map(|id| self.organization_nomination(id).ok())
            .collect()
    }

    /// Nominations matching `query`, grouped by kind. Never fails; an empty result is
    /// a valid answer.
    #[must_use]
    pub fn find_nominations(&self, query: &NominationQuery) -> Vec<NominationRef<'_>> {
        if let (Some(entity_type), Some(entity_id)) = (query.entity_type, query.entity_id.as_deref()) {
            return self
                .nominations_for_entity(entity_type, entity_id)
                .into_iter()
                .filter(|nomination| query.matches(nomination))
                .collect();
        }
        EntityType::ALL
            .into_iter()
            .filter(|entity_type| query.entity_type.map_or(true, |wanted| wanted == *entity_type))
            .flat_map(|entity_type| self.nominations_of_type(entity_type))
            .filter(|nomination| query.matches(nomination))
            .collect()
    }

    #[must_use]
    pub fn nominations_for_constituency(
        &self,
        election_id: &str,
        constituency_id: &str,
        election_round: u32,
        entity_type: EntityType,
    ) -> Vec<NominationRef<'_>> {
        self.find_nominations(
            &NominationQuery::new()
                .with_entity_type(entity_type)
                .with_election(election_id)
                .with_constituency(constituency_id)
                .with_round(election_round),
        )
    }

    /// Questions applicable to `query.targets`, category by category in order.
    #[must_use]
    pub fn find_questions(&self, query: &QuestionQuery) -> Vec<&Question> {
        self.question_categories()
            .unwrap_or_default()
            .into_iter()
            .filter(|category| {
                query.category_type.map_or(true, |wanted| wanted == category.category_type())
            })
            .flat_map(|category| category.questions(self))
            .filter(|question| question.applies_to(&query.targets))
            .collect()
    }

    // Formatting

    /// Render `answer` with the formatter for the question's kind. Choice answers are
    /// rendered through their trimmed labels.
    #[must_use]
    pub fn format_answer(
        &self,
        question: &Question,
        answer: Option<&Answer>,
        options: &ListFormatOptions<'_>,
    ) -> String {
        let formatters = &self.formatters;
        let Some(typed) = question.ensure_answer(answer) else {
            return (formatters.missing_answer)();
        };
        match typed.value {
            AnswerValue::Text(text) => (formatters.text_answer)(&text),
            AnswerValue::Number(number) => {
                let format = match question.kind() {
                    QuestionKind::Number(settings) => settings.format.as_ref(),
                    _ => None,
                };
                (formatters.number_answer)(number, format, self.locale().unwrap_or(DEFAULT_LOCALE))
            }
            AnswerValue::Boolean(flag) => (formatters.boolean_answer)(flag),
            AnswerValue::Image(image) => (formatters.image_answer)(&image),
            AnswerValue::Date(date) => {
                let format = match question.kind() {
                    QuestionKind::Date(settings) => settings.format.as_deref(),
                    _ => None,
                };
                (formatters.date_answer)(date, format)
            }
            AnswerValue::MultipleText(items) => (formatters.multiple_text_answer)(&items, options),
            AnswerValue::Choice(id) => (formatters.text_answer)(choice_label(question, &id)),
            AnswerValue::Choices(ids) => {
                let labels = ids
                    .iter()
                    .map(|id| choice_label(question, id).to_string())
                    .collect::<Vec<_>>();
                (formatters.multiple_text_answer)(&labels, options)
            }
        }
    }

    // Provisioning

    /// # Errors
    /// Returns [`DataError::Provision`] for an invalid record, a conflicting duplicate, a
    /// dangling parent or a parent cycle. Nothing from the call is kept in that case.
    pub fn provide_constituency_data(&mut self, records: Vec<ConstituencyData>) -> DataResult<()> {
        self.provision("constituencies", |root, journal| root.insert_constituencies(records, journal))
    }

    /// # Errors
    /// Returns [`DataError::Provision`] for an invalid record, a conflicting duplicate or a
    /// missing constituency.
    pub fn provide_constituency_group_data(&mut self, records: Vec<ConstituencyGroupData>) -> DataResult<()> {
        self.provision("constituency groups", |root, journal| {
            root.insert_constituency_groups(records, journal)
        })
    }

    /// # Errors
    /// Returns [`DataError::Provision`] for an invalid record, a conflicting duplicate or a
    /// missing constituency group.
    pub fn provide_election_data(&mut self, records: Vec<ElectionData>) -> DataResult<()> {
        self.provision("elections", |root, journal| root.insert_elections(records, journal))
    }

    /// # Errors
    /// Returns [`DataError::Provision`] for an invalid record or a conflicting duplicate.
    pub fn provide_question_category_data(&mut self, records: Vec<QuestionCategoryData>) -> DataResult<()> {
        self.provision("question categories", |root, journal| {
            root.insert_question_categories(records, journal)
        })
    }

    /// # Errors
    /// Returns [`DataError::Provision`] for an invalid record, a conflicting duplicate or a
    /// missing category.
    pub fn provide_question_data(&mut self, records: Vec<QuestionData>) -> DataResult<()> {
        self.provision("questions", |root, journal| root.insert_questions(records, journal))
    }

    /// Accepts a flat list or a tree keyed by entity type.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] for an untyped or invalid record, a conflicting
    /// duplicate or a candidate whose organization does not exist.
    pub fn provide_entity_data(&mut self, input: impl Into<EntitiesInput>) -> DataResult<()> {
        let records = input.into().into_records();
        self.provision("entities", |root, journal| root.insert_entities(records, journal))
    }

    /// Accepts a flat list or a tree keyed by election and constituency, and returns the
    /// ids of the top-level nominations in input order.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] for a malformed nomination tree, an unresolved
    /// reference or a conflicting duplicate.
    pub fn provide_nomination_data(&mut self, input: impl Into<NominationsInput>) -> DataResult<Vec<Id>> {
        let records = input.into().into_records();
        self.provision("nominations", |root, journal| root.insert_nominations(records, journal))
    }

    /// Provision every section of `data` in dependency order as one atomic call.
    ///
    /// # Errors
    /// Returns the first error of any section; nothing from the call is kept in that case.
    pub fn provide_full_data(&mut self, data: FullVaaData) -> DataResult<()> {
        let FullVaaData { elections, constituencies, questions, entities, nominations } = data;
        let ConstituenciesData { groups, constituencies } = constituencies.unwrap_or_default();
        let QuestionsData { categories, questions } = questions.unwrap_or_default();
        self.provision("full data", |root, journal| {
            if let Some(records) = constituencies {
                root.insert_constituencies(records, journal)?;
            }
            if let Some(records) = groups {
                root.insert_constituency_groups(records, journal)?;
            }
            if let Some(records) = elections {
                root.insert_elections(records, journal)?;
            }
            if let Some(records) = categories {
                root.insert_question_categories(records, journal)?;
            }
            if let Some(records) = questions {
                root.insert_questions(records, journal)?;
            }
            if let Some(input) = entities {
                root.insert_entities(input.into_records(), journal)?;
            }
            if let Some(input) = nominations {
                root.insert_nominations(input.into_records(), journal)?;
            }
            Ok(())
        })
    }

    /// Run `body` as one update transaction, rolling back its insertions on error.
    fn provision<R>(
        &mut self,
        section: &'static str,
        body: impl FnOnce(&mut Self, &mut Journal) -> DataResult<R>,
    ) -> DataResult<R> {
        self.update(|root| {
            let mut journal = Journal::default();
            match body(root, &mut journal) {
                Ok(value) => {
                    tracing::debug!(
                        section,
                        inserted = journal.inserted.len(),
                        generation = root.generation.get(),
                        "provisioned data"
                    );
                    Ok(value)
                }
                Err(err) => {
                    tracing::warn!(
                        section,
                        error = %err,
                        discarded = journal.inserted.len(),
                        "provisioning failed; rolling back"
                    );
                    root.rollback(journal);
                    Err(err)
                }
            }
        })
    }

    fn rollback(&mut self, journal: Journal) {
        for (collection, id) in journal.inserted.iter().rev() {
            self.discard(*collection, Some(id));
        }
        for collection in journal.opened {
            self.discard(collection, None);
        }
        self.reindex_nominations();
    }

    fn reindex_nominations(&mut self) {
        let mut index = NominationIndex::new();
        for entity_type in EntityType::ALL {
            for nomination in self.nominations_of_type(entity_type) {
                index
                    .entry(entity_type)
                    .or_default()
                    .entry(nomination.entity_id().to_string())
                    .or_default()
                    .push(nomination.id().to_string());
            }
        }
        self.nomination_index = index;
    }

    fn insert_constituencies(&mut self, records: Vec<ConstituencyData>, journal: &mut Journal) -> DataResult<()> {
        open(&mut self.constituencies, Collection::Constituencies, journal);
        let mut added = Vec::new();
        for data in records {
            let existing = self.constituency(&data.id).ok().map(Constituency::data);
            if is_duplicate(existing, &data, "constituency", &data.id)? {
                continue;
            }
            let constituency = Constituency::new(data)?;
            let id = constituency.id().to_string();
            added.push(id.clone());
            insert(&mut self.constituencies, Collection::Constituencies, id, constituency, journal);
        }
        for id in &added {
            self.check_constituency_parent(id)?;
        }
        Ok(())
    }

    fn check_constituency_parent(&self, id: &str) -> DataResult<()> {
        let constituency = self.constituency(id)?;
        if let Some(parent_id) = constituency.parent_id() {
            if self.constituency(parent_id).is_err() {
                return Err(DataError::provision(format!(
                    "constituency `{id}` references missing parent `{parent_id}`"
                )));
            }
        }
        constituency.ancestors(self)?;
        Ok(())
    }

    fn insert_constituency_groups(
        &mut self,
        records: Vec<ConstituencyGroupData>,
        journal: &mut Journal,
    ) -> DataResult<()> {
        open(&mut self.constituency_groups, Collection::ConstituencyGroups, journal);
        for data in records {
            let existing = self.constituency_group(&data.id).ok().map(ConstituencyGroup::data);
            if is_duplicate(existing, &data, "constituency group", &data.id)? {
                continue;
            }
            let group = ConstituencyGroup::new(data, self)?;
            let id = group.id().to_string();
            insert(&mut self.constituency_groups, Collection::ConstituencyGroups, id, group, journal);
        }
        Ok(())
    }

    fn insert_elections(&mut self, records: Vec<ElectionData>, journal: &mut Journal) -> DataResult<()> {
        open(&mut self.elections, Collection::Elections, journal);
        for data in records {
            let existing = self.election(&data.id).ok().map(Election::data);
            if is_duplicate(existing, &data, "election", &data.id)? {
                continue;
            }
            let election = Election::new(data, self)?;
            let id = election.id().to_string();
            insert(&mut self.elections, Collection::Elections, id, election, journal);
        }
        Ok(())
    }

    fn insert_question_categories(
        &mut self,
        records: Vec<QuestionCategoryData>,
        journal: &mut Journal,
    ) -> DataResult<()> {
        open(&mut self.question_categories, Collection::QuestionCategories, journal);
        for data in records {
            let existing = self.question_category(&data.id).ok().map(QuestionCategory::data);
            if is_duplicate(existing, &data, "question category", &data.id)? {
                continue;
            }
            let category = QuestionCategory::new(data)?;
            let id = category.id().to_string();
            insert(&mut self.question_categories, Collection::QuestionCategories, id, category, journal);
        }
        Ok(())
    }

    fn insert_questions(&mut self, records: Vec<QuestionData>, journal: &mut Journal) -> DataResult<()> {
        open(&mut self.questions, Collection::Questions, journal);
        for data in records {
            let existing = self.question(&data.id).ok().map(Question::data);
            if is_duplicate(existing, &data, "question", &data.id)? {
                continue;
            }
            let category = self.question_category(&data.category_id).map_err(|_| {
                DataError::provision(format!(
                    "question `{}` references missing category `{}`",
                    data.id, data.category_id
                ))
            })?;
            let question = Question::new(data, category)?;
            let id = question.id().to_string();
            insert(&mut self.questions, Collection::Questions, id, question, journal);
        }
        Ok(())
    }

    fn insert_entities(&mut self, records: Vec<EntityData>, journal: &mut Journal) -> DataResult<()> {
        open(&mut self.alliances, Collection::Alliances, journal);
        open(&mut self.candidates, Collection::Candidates, journal);
        open(&mut self.factions, Collection::Factions, journal);
        open(&mut self.organizations, Collection::Organizations, journal);
        let mut candidates = Vec::new();
        for data in records {
            let is_candidate = data.entity_type == Some(EntityType::Candidate);
            let id = self.insert_entity(data, journal)?;
            if is_candidate {
                candidates.push(id);
            }
        }
        for id in &candidates {
            self.check_candidate_organization(id)?;
        }
        Ok(())
    }

    /// A generated duplicate keeps the first object; an explicit one must repeat it exactly.
    fn insert_entity(&mut self, data: EntityData, journal: &mut Journal) -> DataResult<Id> {
        let Some(entity_type) = data.entity_type else {
            return Err(DataError::provision(format!("entity `{}` MUST have a type", data.id)));
        };
        let id = data.id.clone();
        if let Ok(existing) = self.entity(entity_type, &id) {
            let existing = existing.data();
            if existing == &data {
                tracing::debug!(%entity_type, %id, "skipping identical entity");
                return Ok(id);
            }
            if existing.common.is_generated && data.common.is_generated {
                tracing::warn!(%entity_type, %id, "generated entity already exists; keeping the first");
                return Ok(id);
            }
            return Err(DataError::provision(format!(
                "{entity_type} `{id}` is provided twice with conflicting data"
            )));
        }
        match entity_type {
            EntityType::Alliance => {
                let entity = Alliance::new(data)?;
                insert(&mut self.alliances, Collection::Alliances, id.clone(), entity, journal);
            }
            EntityType::Candidate => {
                let entity = Candidate::new(data)?;
                insert(&mut self.candidates, Collection::Candidates, id.clone(), entity, journal);
            }
            EntityType::Faction => {
                let entity = Faction::new(data)?;
                insert(&mut self.factions, Collection::Factions, id.clone(), entity, journal);
            }
            EntityType::Organization => {
                let entity = Organization::new(data)?;
                insert(&mut self.organizations, Collection::Organizations, id.clone(), entity, journal);
            }
        }
        Ok(id)
    }

    fn check_candidate_organization(&self, id: &str) -> DataResult<()> {
        let candidate = self.candidate(id)?;
        match (candidate.organization_id(), self.organizations.as_ref()) {
            (Some(organization_id), Some(organizations)) if !organizations.contains_key(organization_id) => {
                Err(DataError::provision(format!(
                    "candidate `{id}` references missing organization `{organization_id}`"
                )))
            }
            _ => Ok(()),
        }
    }

    fn insert_nominations(&mut self, records: Vec<NominationData>, journal: &mut Journal) -> DataResult<Vec<Id>> {
        open(&mut self.alliance_nominations, Collection::AllianceNominations, journal);
        open(&mut self.candidate_nominations, Collection::CandidateNominations, journal);
        open(&mut self.faction_nominations, Collection::FactionNominations, journal);
        open(&mut self.organization_nominations, Collection::OrganizationNominations, journal);
        let mut ids = Vec::with_capacity(records.len());
        for data in records {
            ids.push(self.insert_nomination(data, journal)?);
        }
        Ok(ids)
    }

    /// Insert one nomination and, depth-first, the nominations nested in it. An implied
    /// alliance or faction is created before the nomination that refers to it.
    fn insert_nomination(&mut self, mut data: NominationData, journal: &mut Journal) -> DataResult<Id> {
        let Some(entity_type) = data.entity_type else {
            return Err(DataError::provision("nomination MUST have an entityType"));
        };
        check_shape(entity_type, &data)?;
        let missing = |field: &str| DataError::provision(format!("{entity_type} nomination MUST have {field}"));
        let election_id = data.election_id.clone().ok_or_else(|| missing("an electionId"))?;
        let constituency_id = data.constituency_id.clone().ok_or_else(|| missing("a constituencyId"))?;

        let entity_id = match data.entity_id.clone() {
            Some(entity_id) => entity_id,
            None => {
                let entity_id = self.generate_entity(entity_type, &data, &election_id, &constituency_id, journal)?;
                data.entity_id = Some(entity_id.clone());
                entity_id
            }
        };
        let id = match data.id.clone() {
            Some(id) => id,
            None => {
                let id = self.create_id(&IdentityProps {
                    election_id: &election_id,
                    constituency_id: &constituency_id,
                    election_round: data.election_round,
                    parent_nomination_id: data.parent_nomination_id.as_deref(),
                    discriminant: Discriminant::Nomination { entity_type, entity_id: &entity_id },
                });
                data.id = Some(id.clone());
                data.common.is_generated = true;
                id
            }
        };

        if let Ok(existing) = self.nomination(entity_type, &id) {
            if existing.core().data() == &data {
                tracing::debug!(%entity_type, %id, "skipping identical nomination");
                return Ok(id);
            }
            if existing.is_generated() && data.common.is_generated {
                tracing::warn!(%entity_type, %id, "generated nomination already exists; keeping the first");
                return Ok(id);
            }
            return Err(DataError::provision(format!(
                "{entity_type} nomination `{id}` is provided twice with conflicting data"
            )));
        }

        let core = NominationCore::new(entity_type, data, self)?;
        let children = core.data().children_of(&id, entity_type);
        match entity_type {
            EntityType::Alliance => {
                let nomination = AllianceNomination::new(core);
                insert(&mut self.alliance_nominations, Collection::AllianceNominations, id.clone(), nomination, journal);
            }
            EntityType::Candidate => {
                let nomination = CandidateNomination::new(core);
                insert(&mut self.candidate_nominations, Collection::CandidateNominations, id.clone(), nomination, journal);
            }
            EntityType::Faction => {
                let nomination = FactionNomination::new(core);
                insert(&mut self.faction_nominations, Collection::FactionNominations, id.clone(), nomination, journal);
            }
            EntityType::Organization => {
                let nomination = OrganizationNomination::new(core);
                insert(
                    &mut self.organization_nominations,
                    Collection::OrganizationNominations,
                    id.clone(),
                    nomination,
                    journal,
                );
            }
        }
        self.nomination_index
            .entry(entity_type)
            .or_default()
            .entry(entity_id)
            .or_default()
            .push(id.clone());

        let mut organizations = Vec::new();
        let mut factions = Vec::new();
        let mut candidates = Vec::new();
        for child in children {
            let child_type = child.entity_type;
            let child_id = self.insert_nomination(child, journal)?;
            match child_type {
                Some(EntityType::Organization) => organizations.push(child_id),
                Some(EntityType::Faction) => factions.push(child_id),
                Some(EntityType::Candidate) => candidates.push(child_id),
                Some(EntityType::Alliance) | None => {}
            }
        }
        self.link_children(entity_type, &id, organizations, factions, candidates);
        Ok(id)
    }

    fn link_children(
        &mut self,
        entity_type: EntityType,
        id: &str,
        organizations: Vec<Id>,
        factions: Vec<Id>,
        candidates: Vec<Id>,
    ) {
        match entity_type {
            EntityType::Alliance => {
                if let Ok(nomination) = self.alliance_nomination_mut(id) {
                    nomination.set_organization_nomination_ids(organizations);
                }
            }
            EntityType::Faction => {
                if let Ok(nomination) = self.faction_nomination_mut(id) {
                    nomination.set_candidate_nomination_ids(candidates);
                }
            }
            EntityType::Organization => {
                if let Ok(nomination) = self.organization_nomination_mut(id) {
                    nomination.set_candidate_nomination_ids(candidates);
                    nomination.set_faction_nomination_ids(factions);
                }
            }
            EntityType::Candidate => {}
        }
    }

    /// Create the alliance or faction implied by a nomination without an `entityId`. Its id
    /// hashes the location and the member entity ids.
    fn generate_entity(
        &mut self,
        entity_type: EntityType,
        data: &NominationData,
        election_id: &str,
        constituency_id: &str,
        journal: &mut Journal,
    ) -> DataResult<Id> {
        let discriminant = match entity_type {
            EntityType::Alliance => Discriminant::Alliance {
                organization_ids: data.nested_entity_ids(EntityType::Organization)?,
            },
            EntityType::Faction => Discriminant::Faction {
                candidate_ids: data.nested_entity_ids(EntityType::Candidate)?,
            },
            EntityType::Candidate | EntityType::Organization => {
                return Err(DataError::provision(format!("{entity_type} nomination MUST have an entityId")));
            }
        };
        let id = self.create_id(&IdentityProps {
            election_id,
            constituency_id,
            election_round: data.election_round,
            parent_nomination_id: data.parent_nomination_id.as_deref(),
            discriminant,
        });
        let entity = EntityData::generated(
            entity_type,
            id,
            data.common.name.clone(),
            data.common.short_name.clone(),
        );
        self.insert_entity(entity, journal)
    }
}
