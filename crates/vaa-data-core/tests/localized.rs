mod common;

use serde_json::{json, Value};
use vaa_data_core::{DataObject, DataSession, Entity, ListFormatOptions, RootOptions};

use common::{candidate, election, fixture_source, ids, question};

const ELECTION_EN: &str = "Hyrule Parliamentary Elections 2033";
const ELECTION_FI: &str = "Hyrulen eduskuntavaalit 2033";
const AGREE_EN: &str = "Strongly agree";
const AGREE_FI: &str = "T\u{e4}ysin samaa mielt\u{e4}";
const FRONT_EN: &str = "The United Zora-Gerudo Front";
const FRONT_FI: &str = "Zora-Gerudo-rintama";

/// Replace every string leaf equal to `english` with an English and Finnish translation.
fn localize(value: &mut Value, english: &str, finnish: &str) {
    match value {
        Value::String(text) if *text == english => {
            *value = json!({ "__translations__": { "en": english, "fi": finnish } });
        }
        Value::Array(items) => items.iter_mut().for_each(|item| localize(item, english, finnish)),
        Value::Object(map) => map.values_mut().for_each(|item| localize(item, english, finnish)),
        _ => {}
    }
}

fn mk_source() -> Value {
    let mut source = fixture_source();
    localize(&mut source, ELECTION_EN, ELECTION_FI);
    localize(&mut source, AGREE_EN, AGREE_FI);
    localize(&mut source, FRONT_EN, FRONT_FI);
    source
}

fn mk_session(locale: Option<&str>) -> DataSession {
    let options = RootOptions { locale: locale.map(str::to_string) };
    DataSession::new(mk_source(), options)
        .unwrap_or_else(|err| panic!("localized fixture should provision: {err}"))
}

fn generated_alliance(session: &DataSession) -> (String, String) {
    let root = session.root();
    root.alliances()
        .unwrap_or_default()
        .into_iter()
        .find(|alliance| alliance.is_generated())
        .map(|alliance| (alliance.id().to_string(), alliance.display_name(root)))
        .unwrap_or_else(|| panic!("an alliance should be generated"))
}

#[test]
fn values_resolve_for_the_session_locale() {
    let session = mk_session(Some("fi"));
    let root = session.root();
    assert_eq!(election(root, "election-1").name(), ELECTION_FI);
    let stance = question(root, "question-9");
    assert_eq!(stance.choice("5").map(|choice| choice.label.as_str()), Some(AGREE_FI));
    let ganon = candidate(root, "candidate-1");
    assert_eq!(ganon.formatted_answer(root, stance, &ListFormatOptions::default()), AGREE_FI);
    assert_eq!(generated_alliance(&session).1, FRONT_FI);
}

#[test]
fn unknown_or_missing_locale_uses_the_first_translation() {
    for locale in [None, Some("sv-SE")] {
        let session = mk_session(locale);
        assert_eq!(election(session.root(), "election-1").name(), ELECTION_EN, "{locale:?}");
        assert_eq!(generated_alliance(&session).1, FRONT_EN, "{locale:?}");
    }
}

#[test]
fn regional_locale_falls_back_to_its_language() {
    let session = mk_session(Some("fi-FI"));
    assert_eq!(session.locale(), Some("fi-FI"));
    assert_eq!(election(session.root(), "election-1").name(), ELECTION_FI);
}

#[test]
fn locale_swap_rebuilds_with_stable_generated_ids() {
    let mut session = mk_session(Some("en"));
    let (english_id, english_name) = generated_alliance(&session);
    let factions = ids(&session.root().factions().unwrap_or_default());
    let before = session.generation();

    let after = session
        .set_locale(Some("fi".to_string()))
        .unwrap_or_else(|err| panic!("locale swap should succeed: {err}"));
    assert_ne!(before, after);

    let (finnish_id, finnish_name) = generated_alliance(&session);
    assert_eq!(english_id, finnish_id);
    assert_eq!(english_name, FRONT_EN);
    assert_eq!(finnish_name, FRONT_FI);
    assert_eq!(ids(&session.root().factions().unwrap_or_default()), factions);
    assert_eq!(election(session.root(), "election-1").name(), ELECTION_FI);
}

#[test]
fn the_source_is_retained_untranslated() {
    let session = mk_session(Some("fi"));
    let name = &session.source()["elections"][0]["name"];
    assert_eq!(name["__translations__"]["en"], json!(ELECTION_EN));
}
