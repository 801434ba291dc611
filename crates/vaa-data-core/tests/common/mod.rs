#![allow(dead_code)]

use serde_json::Value;
use vaa_data_core::{
    Candidate, Constituency, DataResult, DataRoot, Election, FullVaaData, Question, RootOptions,
};

pub const FIXTURE: &str = include_str!("../fixtures/hyrule.json");

pub fn fixture_source() -> Value {
    serde_json::from_str(FIXTURE).unwrap_or_else(|err| panic!("fixture should be valid JSON: {err}"))
}

pub fn fixture_data() -> FullVaaData {
    data_from(fixture_source())
}

pub fn data_from(source: Value) -> FullVaaData {
    serde_json::from_value(source)
        .unwrap_or_else(|err| panic!("fixture should have the ingest shape: {err}"))
}

pub fn mk_root() -> DataRoot {
    mk_root_from(fixture_source())
}

pub fn mk_root_from(source: Value) -> DataRoot {
    DataRoot::from_data(data_from(source), RootOptions::default())
        .unwrap_or_else(|err| panic!("fixture should provision: {err}"))
}

pub fn ok<T>(result: DataResult<T>, what: &str) -> T {
    result.unwrap_or_else(|err| panic!("{what} should succeed: {err}"))
}

pub fn election<'r>(root: &'r DataRoot, id: &str) -> &'r Election {
    ok(root.election(id), id)
}

pub fn constituency<'r>(root: &'r DataRoot, id: &str) -> &'r Constituency {
    ok(root.constituency(id), id)
}

pub fn question<'r>(root: &'r DataRoot, id: &str) -> &'r Question {
    ok(root.question(id), id)
}

pub fn candidate<'r>(root: &'r DataRoot, id: &str) -> &'r Candidate {
    ok(root.candidate(id), id)
}

pub fn ids<T: vaa_data_core::DataObject + ?Sized>(items: &[&T]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

/// Mutable access to `source.nominations[election][constituency]`.
pub fn nominations_at<'a>(source: &'a mut Value, election: &str, constituency: &str) -> &'a mut Vec<Value> {
    source
        .get_mut("nominations")
        .and_then(|tree| tree.get_mut(election))
        .and_then(|by_constituency| by_constituency.get_mut(constituency))
        .and_then(Value::as_array_mut)
        .unwrap_or_else(|| panic!("fixture should have nominations for {election}/{constituency}"))
}
