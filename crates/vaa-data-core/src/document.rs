//! The ingest document and the flattening of its tree-shaped sections.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::category::QuestionCategoryData;
use crate::constituency::{ConstituencyData, ConstituencyGroupData};
use crate::election::ElectionData;
use crate::entity::EntityData;
use crate::nomination::NominationData;
use crate::object::{EntityType, Id};
use crate::question::QuestionData;

/// Entities keyed by type. Records in a tree do not repeat their `type`.
pub type EntityTree = IndexMap<EntityType, Vec<EntityData>>;

/// Nominations keyed by election id, then constituency id.
pub type NominationTree = IndexMap<Id, IndexMap<Id, Vec<NominationData>>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EntitiesInput {
    List(Vec<EntityData>),
    Tree(EntityTree),
}

impl Default for EntitiesInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl EntitiesInput {
    #[must_use]
    pub fn into_records(self) -> Vec<EntityData> {
        match self {
            Self::List(records) => records,
            Self::Tree(tree) => parse_entity_tree(tree),
        }
    }
}

impl From<Vec<EntityData>> for EntitiesInput {
    fn from(records: Vec<EntityData>) -> Self {
        Self::List(records)
    }
}

impl From<EntityTree> for EntitiesInput {
    fn from(tree: EntityTree) -> Self {
        Self::Tree(tree)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NominationsInput {
    List(Vec<NominationData>),
    Tree(NominationTree),
}

impl Default for NominationsInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl NominationsInput {
    /// Top-level records only. Nested nominations stay inside their parents and are
    /// expanded during provisioning.
    #[must_use]
    pub fn into_records(self) -> Vec<NominationData> {
        match self {
            Self::List(records) => records,
            Self::Tree(tree) => parse_nomination_tree(tree),
        }
    }
}

impl From<Vec<NominationData>> for NominationsInput {
    fn from(records: Vec<NominationData>) -> Self {
        Self::List(records)
    }
}

impl From<NominationTree> for NominationsInput {
    fn from(tree: NominationTree) -> Self {
        Self::Tree(tree)
    }
}

/// Tree keys override any `type` in the records.
#[must_use]
pub fn parse_entity_tree(tree: EntityTree) -> Vec<EntityData> {
    tree.into_iter()
        .flat_map(|(entity_type, records)| {
            records.into_iter().map(move |record| EntityData { entity_type: Some(entity_type), ..record })
        })
        .collect()
}

/// Flatten the election and constituency levels into the records, keeping document order.
#[must_use]
pub fn parse_nomination_tree(tree: NominationTree) -> Vec<NominationData> {
    let mut records = Vec::new();
    for (election_id, constituencies) in tree {
        for (constituency_id, nominations) in constituencies {
            records.extend(nominations.into_iter().map(|record| NominationData {
                election_id: Some(election_id.clone()),
                constituency_id: Some(constituency_id.clone()),
                ..record
            }));
        }
    }
    records
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstituenciesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<ConstituencyGroupData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituencies: Option<Vec<ConstituencyData>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<QuestionCategoryData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionData>>,
}

/// Everything a root needs, in one document. An absent section leaves its collections
/// unprovided.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FullVaaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elections: Option<Vec<ElectionData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituencies: Option<ConstituenciesData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<QuestionsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntitiesInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominations: Option<NominationsInput>,
}
