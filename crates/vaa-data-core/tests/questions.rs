mod common;

use vaa_data_core::{
    AnswerValue, DataError, DataRoot, Entity, EntityType, FilterTargets, Filterable,
    ListFormatOptions, Nomination, Normalized, QuestionCategoryType, QuestionQuery, QuestionType,
    MISSING_ANSWER,
};

use common::{candidate, constituency, election, ids, mk_root, ok, question};

fn find(root: &DataRoot, query: &QuestionQuery) -> Vec<String> {
    ids(&root.find_questions(query))
}

#[test]
fn find_questions_combines_category_and_question_filters() {
    let root = mk_root();
    let query = QuestionQuery::new()
        .with_category_type(QuestionCategoryType::Info)
        .with_targets(FilterTargets::new().with_entity_type(EntityType::Organization));
    assert_eq!(find(&root, &query), vec!["question-1", "question-2", "question-6", "question-7"]);

    let query = QuestionQuery::new()
        .with_category_type(QuestionCategoryType::Info)
        .with_targets(FilterTargets::new().with_entity_type(EntityType::Candidate));
    assert_eq!(
        find(&root, &query),
        vec!["question-1", "question-2", "question-3", "question-4", "question-5"]
    );

    let query = QuestionQuery::new()
        .with_category_type(QuestionCategoryType::Opinion)
        .with_targets(FilterTargets::new().with_constituency("constituency-1-2"));
    assert_eq!(
        find(&root, &query),
        vec!["question-8", "question-9", "question-11", "question-12", "question-13"]
    );
}

#[test]
fn election_questions_are_scoped_to_the_election() {
    let root = mk_root();
    let central = constituency(&root, "constituency-1-1");
    let parliamentary = election(&root, "election-1");
    let opinions = parliamentary.questions(&root, central, Some(QuestionCategoryType::Opinion), None);
    assert_eq!(ids(&opinions), vec!["question-9", "question-11", "question-12", "question-13"]);

    let municipal = election(&root, "election-2");
    let opinions = municipal.questions(&root, central, Some(QuestionCategoryType::Opinion), None);
    assert_eq!(ids(&opinions), vec!["question-8", "question-9", "question-10", "question-11", "question-12", "question-13"]);
}

#[test]
fn nomination_applicable_questions_use_its_context() {
    let root = mk_root();
    let nomination = root.alliance_nominations_for("alliance-1")[0];
    assert_eq!(
        ids(&nomination.applicable_questions(&root)),
        vec!["question-1", "question-2", "question-9", "question-11", "question-12", "question-13"]
    );
}

#[test]
fn conflicting_filters_never_apply() {
    let root = mk_root();
    let languages = question(&root, "question-7a");
    assert!(!languages.effective_filter().is_applicable());
    let candidates = FilterTargets::new().with_entity_type(EntityType::Candidate);
    assert!(!languages.applies_to(&candidates));
    assert!(languages.applies_to_own(&candidates));
    assert!(!languages.applies_to(&FilterTargets::new()));
}

#[test]
fn category_filter_is_inherited() {
    let root = mk_root();
    let themes = question(&root, "question-7");
    let candidates = FilterTargets::new().with_entity_type(EntityType::Candidate);
    assert!(!themes.applies_to(&candidates));
    assert!(themes.applies_to_own(&candidates));
    let category = ok(themes.category(&root), "category");
    assert_eq!(category.category_type(), QuestionCategoryType::Info);
    assert_eq!(ids(&category.questions(&root)), vec!["question-6", "question-7", "question-7a"]);
}

#[test]
fn question_kinds_and_matchability() {
    let root = mk_root();
    let kinds = [
        ("question-1", QuestionType::Text, false),
        ("question-2", QuestionType::Number, true),
        ("question-3", QuestionType::Boolean, true),
        ("question-4", QuestionType::Date, true),
        ("question-5", QuestionType::Image, false),
        ("question-7", QuestionType::MultipleText, false),
        ("question-7a", QuestionType::MultipleChoiceCategorical, false),
        ("question-8", QuestionType::SingleChoiceCategorical, true),
        ("question-9", QuestionType::SingleChoiceOrdinal, true),
    ];
    for (id, question_type, matchable) in kinds {
        let question = question(&root, id);
        assert_eq!(question.question_type(), question_type, "{id}");
        assert_eq!(question.is_matchable(), matchable, "{id}");
    }
    assert_eq!(question(&root, "question-8").normalized_dimensions(), Some(3));
    assert_eq!(question(&root, "question-9").normalized_dimensions(), Some(1));
}

#[test]
fn answers_are_ensured_against_their_question() {
    let root = mk_root();
    let ganon = candidate(&root, "candidate-1");
    let stance = ganon.answer(question(&root, "question-9"));
    let stance = stance.unwrap_or_else(|| panic!("question-9 should be answered"));
    assert_eq!(stance.value, AnswerValue::Choice("5".to_string()));
    assert_eq!(stance.info.as_deref(), Some("Zonai vehicles should be banned."));
    let mobba = candidate(&root, "candidate-2");
    assert!(mobba.answer(question(&root, "question-3")).is_none());
    let answered = ok(ganon.answered_questions(&root), "answered questions");
    assert_eq!(answered.len(), 12);
}

#[test]
fn answers_normalize_into_coordinates() {
    let root = mk_root();
    let normalized = |candidate_id: &str, question_id: &str| {
        let question = question(&root, question_id);
        question.normalize_answer(candidate(&root, candidate_id).raw_answer(question_id))
    };
    assert_eq!(normalized("candidate-1", "question-9"), Ok(Normalized::Single(Some(0.5))));
    assert_eq!(normalized("candidate-3", "question-9"), Ok(Normalized::Single(Some(-0.25))));
    assert_eq!(normalized("candidate-1", "question-10"), Ok(Normalized::Single(Some(0.0))));
    assert_eq!(normalized("candidate-1", "question-3"), Ok(Normalized::Single(Some(0.5))));
    assert_eq!(normalized("candidate-2", "question-3"), Ok(Normalized::Single(None)));
    assert_eq!(
        normalized("candidate-3", "question-8"),
        Ok(Normalized::Multiple(vec![Some(-0.5), Some(-0.5), Some(0.5)]))
    );
    match normalized("candidate-1", "question-4") {
        Ok(Normalized::Single(Some(coordinate))) => assert!(coordinate > -0.5 && coordinate < 0.5),
        other => panic!("birthdate should normalize inside the range, got {other:?}"),
    }
}

#[test]
fn normalization_errors_are_type_errors() {
    let root = mk_root();
    let lucky = question(&root, "question-2");
    let urbosa = candidate(&root, "candidate-3");
    assert!(matches!(
        lucky.normalize_answer(urbosa.raw_answer("question-2")),
        Err(DataError::Type(_))
    ));
    let stables = question(&root, "question-10");
    assert!(matches!(
        stables.normalize_answer(urbosa.raw_answer("question-10")),
        Err(DataError::Type(_))
    ));
    let languages = question(&root, "question-7a");
    assert!(matches!(
        languages.normalize_answer(urbosa.raw_answer("question-7a")),
        Err(DataError::Type(_))
    ));
}

#[test]
fn answers_format_by_kind() {
    let root = mk_root();
    let ganon = candidate(&root, "candidate-1");
    let options = ListFormatOptions::default();
    let formatted = |id: &str| ganon.formatted_answer(&root, question(&root, id), &options);
    assert_eq!(formatted("question-2"), "7");
    assert_eq!(formatted("question-3"), "Yes");
    assert_eq!(formatted("question-4"), "6/12/1777");
    assert_eq!(
        formatted("question-5"),
        "<img src=\"https://example.com/underworld.jpg\" alt=\"Ganon Dorf exploring the underworld.\" />"
    );
    assert_eq!(formatted("question-7a"), "Hylian");
    assert_eq!(formatted("question-8"), "Akkala");
    assert_eq!(formatted("question-9"), "Strongly agree");

    let urbosa = candidate(&root, "candidate-3");
    let languages = question(&root, "question-7a");
    assert_eq!(urbosa.formatted_answer(&root, languages, &options), "Hylian, Gerudo");
    let slashed = ListFormatOptions { separator: Some(" / "), ..ListFormatOptions::default() };
    assert_eq!(urbosa.formatted_answer(&root, languages, &slashed), "Hylian / Gerudo");

    let mobba = candidate(&root, "candidate-2");
    assert_eq!(mobba.formatted_answer(&root, question(&root, "question-3"), &options), MISSING_ANSWER);

    let evil = ok(root.organization("organization-1"), "organization");
    assert_eq!(evil.formatted_answer(&root, question(&root, "question-6"), &options), "No");
}
