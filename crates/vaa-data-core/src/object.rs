use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Id = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Alliance,
    Candidate,
    Faction,
    Organization,
}

impl EntityType {
    pub const ALL: [Self; 4] = [Self::Alliance, Self::Candidate, Self::Faction, Self::Organization];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alliance => "alliance",
            Self::Candidate => "candidate",
            Self::Faction => "faction",
            Self::Organization => "organization",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alliance" => Some(Self::Alliance),
            "candidate" => Some(Self::Candidate),
            "faction" => Some(Self::Faction),
            "organization" => Some(Self::Organization),
            _ => None,
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Election,
    Constituency,
    ConstituencyGroup,
    QuestionCategory,
    TextQuestion,
    NumberQuestion,
    BooleanQuestion,
    ImageQuestion,
    DateQuestion,
    MultipleTextQuestion,
    SingleChoiceOrdinalQuestion,
    SingleChoiceCategoricalQuestion,
    MultipleChoiceCategoricalQuestion,
    Alliance,
    Candidate,
    Faction,
    Organization,
    AllianceNomination,
    CandidateNomination,
    FactionNomination,
    OrganizationNomination,
}

impl ObjectType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Election => "election",
            Self::Constituency => "constituency",
            Self::ConstituencyGroup => "constituencyGroup",
            Self::QuestionCategory => "questionCategory",
            Self::TextQuestion => "textQuestion",
            Self::NumberQuestion => "numberQuestion",
            Self::BooleanQuestion => "booleanQuestion",
            Self::ImageQuestion => "imageQuestion",
            Self::DateQuestion => "dateQuestion",
            Self::MultipleTextQuestion => "multipleTextQuestion",
            Self::SingleChoiceOrdinalQuestion => "singleChoiceOrdinalQuestion",
            Self::SingleChoiceCategoricalQuestion => "singleChoiceCategoricalQuestion",
            Self::MultipleChoiceCategoricalQuestion => "multipleChoiceCategoricalQuestion",
            Self::Alliance => "alliance",
            Self::Candidate => "candidate",
            Self::Faction => "faction",
            Self::Organization => "organization",
            Self::AllianceNomination => "allianceNomination",
            Self::CandidateNomination => "candidateNomination",
            Self::FactionNomination => "factionNomination",
            Self::OrganizationNomination => "organizationNomination",
        }
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    pub normal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_dark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Properties shared by every object in the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Colors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_generated: bool,
}

pub trait DataObject {
    fn id(&self) -> &str;

    fn fields(&self) -> &ObjectFields;

    fn object_type(&self) -> ObjectType;

    fn name(&self) -> &str {
        self.fields().name.as_deref().unwrap_or_default()
    }

    /// Falls back to `name`.
    fn short_name(&self) -> &str {
        match self.fields().short_name.as_deref() {
            Some(short_name) if !short_name.is_empty() => short_name,
            _ => self.name(),
        }
    }

    fn order(&self) -> f64 {
        self.fields().order.unwrap_or(f64::INFINITY)
    }

    fn color(&self) -> Option<&Colors> {
        self.fields().color.as_ref()
    }

    fn image(&self) -> Option<&Image> {
        self.fields().image.as_ref()
    }

    fn info(&self) -> &str {
        self.fields().info.as_deref().unwrap_or_default()
    }

    fn subtype(&self) -> &str {
        self.fields().subtype.as_deref().unwrap_or_default()
    }

    fn custom_data(&self) -> Option<&Value> {
        self.fields().custom_data.as_ref()
    }

    fn is_generated(&self) -> bool {
        self.fields().is_generated
    }
}

/// Stable sort by `order`; ties keep their incoming order.
pub(crate) fn sort_by_order<T: DataObject + ?Sized>(items: &mut [&T]) {
    items.sort_by(|a, b| a.order().total_cmp(&b.order()));
}

/// Implements [`DataObject`] and [`crate::updatable::Observable`] for a struct with
/// `id`, `data.common` and `updates` fields.
macro_rules! impl_data_object {
    ($ty:ty, $kind:expr) => {
        impl $crate::object::DataObject for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn fields(&self) -> &$crate::object::ObjectFields {
                &self.data.common
            }

            fn object_type(&self) -> $crate::object::ObjectType {
                $kind
            }
        }

        $crate::updatable::impl_observable!($ty);
    };
}

pub(crate) use impl_data_object;
