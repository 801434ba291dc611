use serde_json::{Map, Value};

/// The only key of a localized leaf: `{"__translations__": {"en": "...", "fi": "..."}}`.
pub const TRANSLATIONS_KEY: &str = "__translations__";

#[must_use]
pub fn is_localized(value: &Value) -> bool {
    match value {
        Value::Object(object) => {
            object.len() == 1 && object.get(TRANSLATIONS_KEY).is_some_and(Value::is_object)
        }
        _ => false,
    }
}

/// Resolve every localized leaf in `value` to the best match for `locale`, recursing through
/// objects and arrays.
#[must_use]
pub fn translate(value: Value, locale: &str) -> Value {
    match value {
        Value::Object(mut object) => {
            if object.len() == 1 {
                if let Some(Value::Object(translations)) = object.get(TRANSLATIONS_KEY) {
                    return translate(pick_translation(translations, locale), locale);
                }
            }
            for entry in object.values_mut() {
                *entry = translate(std::mem::take(entry), locale);
            }
            Value::Object(object)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|item| translate(item, locale)).collect())
        }
        other => other,
    }
}

/// Exact locale, then the same primary language, then the first translation.
fn pick_translation(translations: &Map<String, Value>, locale: &str) -> Value {
    if let Some(value) = translations.get(locale) {
        return value.clone();
    }
    let language = primary_language(locale);
    translations
        .iter()
        .find(|(key, _)| primary_language(key).eq_ignore_ascii_case(language))
        .or_else(|| translations.iter().next())
        .map_or(Value::Null, |(_, value)| value.clone())
}

fn primary_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}
