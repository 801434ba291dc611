//! In-memory data model for voting advice applications: elections, constituencies,
//! questions, entities and their nominations, resolved through one registry.

pub mod answer;
pub mod category;
pub mod constituency;
pub mod document;
pub mod election;
pub mod ensure;
pub mod entity;
pub mod error;
pub mod filter;
pub mod format;
pub mod ids;
pub mod nomination;
pub mod object;
pub mod question;
pub mod root;
pub mod session;
pub mod translate;
pub mod updatable;

pub use answer::{Answer, AnswerValue, Answers, TypedAnswer};
pub use category::{QuestionCategory, QuestionCategoryData, QuestionCategoryType};
pub use constituency::{Constituency, ConstituencyData, ConstituencyGroup, ConstituencyGroupData};
pub use document::{
    parse_entity_tree, parse_nomination_tree, ConstituenciesData, EntitiesInput, EntityTree,
    FullVaaData, NominationTree, NominationsInput, QuestionsData,
};
pub use election::{Election, ElectionData};
pub use entity::{Alliance, Candidate, Entity, EntityData, EntityRef, Faction, Organization};
pub use error::{DataError, DataResult};
pub use filter::{
    intersect_filters, intersect_filters_by, EffectiveFilter, Filter, FilterFields,
    FilterIntersection, FilterTargets, FilterValue, Filterable,
};
pub use format::{Formatter, Formatters, ListFormatOptions, NumberFormat, NumberStyle, MISSING_ANSWER};
pub use ids::{create_deterministic_id, cyrb53, is_valid_id, Discriminant, IdentityProps};
pub use nomination::{
    AllianceNomination, CandidateNomination, FactionNomination, Nomination, NominationData,
    NominationQuery, NominationRef, OrganizationNomination,
};
pub use object::{Colors, DataObject, EntityType, Id, Image, ObjectFields, ObjectType};
pub use question::{
    Choice, Normalized, Question, QuestionData, QuestionKind, QuestionType, COORDINATE_MAX,
    COORDINATE_MIN, COORDINATE_NEUTRAL,
};
pub use root::{DataRoot, QuestionQuery, RootGeneration, RootOptions, DEFAULT_LOCALE};
pub use session::DataSession;
pub use translate::translate;
pub use updatable::{Observable, Subscription, Updatable};
