//! Default presentation of computed names and answers, overridable per root.

use std::fmt::{Debug, Formatter as FmtFormatter};

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::entity::{Alliance, Candidate, Entity, Faction};
use crate::object::Image;
use crate::root::DataRoot;

/// Placeholder rendered for a missing answer.
pub const MISSING_ANSWER: &str = "\u{2014}";

pub type NameFormatter<T> = Box<dyn Fn(&T, &DataRoot) -> String>;
pub type BooleanFormatter = Box<dyn Fn(bool) -> String>;
/// Receives the question's format description, if any.
pub type DateFormatter = Box<dyn Fn(Date, Option<&str>) -> String>;
pub type ImageFormatter = Box<dyn Fn(&Image) -> String>;
pub type MissingFormatter = Box<dyn Fn() -> String>;
pub type ListFormatter = Box<dyn Fn(&[String], &ListFormatOptions<'_>) -> String>;
/// Receives the question's number format and the root locale.
pub type NumberFormatter = Box<dyn Fn(f64, Option<&NumberFormat>, &str) -> String>;
pub type TextFormatter = Box<dyn Fn(&str) -> String>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum NumberStyle {
    #[default]
    Decimal,
    Percent,
    Currency,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NumberFormat {
    #[serde(default)]
    pub style: NumberStyle,
    /// ISO 4217 code, used with [`NumberStyle::Currency`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_fraction_digits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_fraction_digits: Option<u8>,
}

/// Options for rendering list answers.
#[derive(Clone, Copy, Default)]
pub struct ListFormatOptions<'a> {
    pub separator: Option<&'a str>,
    pub empty_placeholder: Option<&'a str>,
    /// Applied to each trimmed item.
    pub map: Option<&'a dyn Fn(&str) -> String>,
}

impl Debug for ListFormatOptions<'_> {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListFormatOptions")
            .field("separator", &self.separator)
            .field("empty_placeholder", &self.empty_placeholder)
            .field("map", &self.map.is_some())
            .finish()
    }
}

/// One replacement for [`DataRoot::set_formatter`].
pub enum Formatter {
    AllianceName(NameFormatter<Alliance>),
    AllianceShortName(NameFormatter<Alliance>),
    CandidateName(NameFormatter<Candidate>),
    CandidateShortName(NameFormatter<Candidate>),
    FactionName(NameFormatter<Faction>),
    BooleanAnswer(BooleanFormatter),
    DateAnswer(DateFormatter),
    ImageAnswer(ImageFormatter),
    MissingAnswer(MissingFormatter),
    MultipleTextAnswer(ListFormatter),
    NumberAnswer(NumberFormatter),
    TextAnswer(TextFormatter),
}

impl Formatter {
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::AllianceName(_) => "allianceName",
            Self::AllianceShortName(_) => "allianceShortName",
            Self::CandidateName(_) => "candidateName",
            Self::CandidateShortName(_) => "candidateShortName",
            Self::FactionName(_) => "factionName",
            Self::BooleanAnswer(_) => "booleanAnswer",
            Self::DateAnswer(_) => "dateAnswer",
            Self::ImageAnswer(_) => "imageAnswer",
            Self::MissingAnswer(_) => "missingAnswer",
            Self::MultipleTextAnswer(_) => "multipleTextAnswer",
            Self::NumberAnswer(_) => "numberAnswer",
            Self::TextAnswer(_) => "textAnswer",
        }
    }
}

impl Debug for Formatter {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Formatter").field(&self.key()).finish()
    }
}

/// The formatter table held by every root.
pub struct Formatters {
    pub alliance_name: NameFormatter<Alliance>,
    pub alliance_short_name: NameFormatter<Alliance>,
    pub candidate_name: NameFormatter<Candidate>,
    pub candidate_short_name: NameFormatter<Candidate>,
    pub faction_name: NameFormatter<Faction>,
    pub boolean_answer: BooleanFormatter,
    pub date_answer: DateFormatter,
    pub image_answer: ImageFormatter,
    pub missing_answer: MissingFormatter,
    pub multiple_text_answer: ListFormatter,
    pub number_answer: NumberFormatter,
    pub text_answer: TextFormatter,
}

impl Formatters {
    pub fn set(&mut self, formatter: Formatter) {
        match formatter {
            Formatter::AllianceName(f) => self.alliance_name = f,
            Formatter::AllianceShortName(f) => self.alliance_short_name = f,
            Formatter::CandidateName(f) => self.candidate_name = f,
            Formatter::CandidateShortName(f) => self.candidate_short_name = f,
            Formatter::FactionName(f) => self.faction_name = f,
            Formatter::BooleanAnswer(f) => self.boolean_answer = f,
            Formatter::DateAnswer(f) => self.date_answer = f,
            Formatter::ImageAnswer(f) => self.image_answer = f,
            Formatter::MissingAnswer(f) => self.missing_answer = f,
            Formatter::MultipleTextAnswer(f) => self.multiple_text_answer = f,
            Formatter::NumberAnswer(f) => self.number_answer = f,
            Formatter::TextAnswer(f) => self.text_answer = f,
        }
    }
}

impl Default for Formatters {
    fn default() -> Self {
        Self {
            alliance_name: Box::new(alliance_name),
            alliance_short_name: Box::new(alliance_name),
            candidate_name: Box::new(|candidate: &Candidate, _: &DataRoot| {
                join_name(candidate.first_name(), candidate.last_name())
            }),
            candidate_short_name: Box::new(|candidate: &Candidate, _: &DataRoot| {
                let initial = candidate
                    .last_name()
                    .chars()
                    .next()
                    .map(|initial| format!("{initial}."))
                    .unwrap_or_default();
                join_name(candidate.first_name(), &initial)
            }),
            faction_name: Box::new(|faction: &Faction, root: &DataRoot| match faction.organization(root) {
                Ok(organization) => format!("{} faction", organization.display_short_name(root)),
                Err(_) => "faction".to_string(),
            }),
            boolean_answer: Box::new(|value: bool| if value { "Yes" } else { "No" }.to_string()),
            date_answer: Box::new(format_date),
            image_answer: Box::new(format_image),
            missing_answer: Box::new(|| MISSING_ANSWER.to_string()),
            multiple_text_answer: Box::new(format_list),
            number_answer: Box::new(format_number),
            text_answer: Box::new(str::to_string),
        }
    }
}

impl Debug for Formatters {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        f.write_str("Formatters { .. }")
    }
}

fn join_name(first: &str, last: &str) -> String {
    [first, last].into_iter().filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Member organizations' short names joined with an en dash.
fn alliance_name(alliance: &Alliance, root: &DataRoot) -> String {
    alliance
        .organizations(root)
        .unwrap_or_default()
        .into_iter()
        .map(|organization| organization.display_short_name(root))
        .collect::<Vec<_>>()
        .join(" \u{2013} ")
}

/// `M/D/YYYY`, or `format` when it is a valid `time` format description.
#[must_use]
pub fn format_date(date: Date, format: Option<&str>) -> String {
    if let Some(format) = format {
        if let Ok(items) = time::format_description::parse(format) {
            if let Ok(formatted) = date.format(&items) {
                return formatted;
            }
        }
    }
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

#[must_use]
pub fn format_image(image: &Image) -> String {
    let mut html = format!(
        "<img src=\"{}\" alt=\"{}\"",
        escape_attribute(&image.url),
        escape_attribute(image.alt.as_deref().unwrap_or_default())
    );
    if let Some(dark) = &image.url_dark {
        html.push_str(&format!(" data-dark-src=\"{}\"", escape_attribute(dark)));
    }
    html.push_str(" />");
    html
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Trim, map, then join. An empty list renders the placeholder.
#[must_use]
pub fn format_list(items: &[String], options: &ListFormatOptions<'_>) -> String {
    let items = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| options.map.map_or_else(|| item.to_string(), |map| map(item)))
        .collect::<Vec<_>>();
    if items.is_empty() {
        return options.empty_placeholder.unwrap_or(MISSING_ANSWER).to_string();
    }
    items.join(options.separator.unwrap_or(", "))
}

/// Resolve the number locale: exact name, then primary language, then English.
fn number_locale(locale: &str) -> Locale {
    let name = locale.replace('_', "-");
    Locale::from_name(&name)
        .or_else(|_| Locale::from_name(name.split('-').next().unwrap_or_default()))
        .unwrap_or(Locale::en)
}

fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{a3}",
        "JPY" => "\u{a5}",
        other => other,
    }
}

/// Locale-aware decimal, percent and currency rendering.
#[must_use]
pub fn format_number(value: f64, format: Option<&NumberFormat>, locale: &str) -> String {
    let default_format = NumberFormat::default();
    let format = format.unwrap_or(&default_format);
    let locale = number_locale(locale);
    // Comma-decimal locales put percent and currency signs after a no-break space.
    let spaced = locale.decimal() == ",";
    let (scaled, default_min, default_max) = match format.style {
        NumberStyle::Decimal => (value, 0, 3),
        NumberStyle::Percent => (value * 100.0, 0, 0),
        NumberStyle::Currency => (value, 2, 2),
    };
    let max_digits = format.maximum_fraction_digits.unwrap_or(default_max);
    let min_digits = format.minimum_fraction_digits.unwrap_or(default_min).min(max_digits);
    let digits = group_digits(scaled.abs(), usize::from(min_digits), usize::from(max_digits), &locale);
    let sign = if scaled < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    let space = if spaced { "\u{a0}" } else { "" };
    match format.style {
        NumberStyle::Decimal => format!("{sign}{digits}"),
        NumberStyle::Percent => format!("{sign}{digits}{space}%"),
        NumberStyle::Currency => {
            let symbol = currency_symbol(format.currency.as_deref().unwrap_or("USD"));
            if spaced {
                format!("{sign}{digits}{space}{symbol}")
            } else {
                format!("{sign}{symbol}{digits}")
            }
        }
    }
}

fn group_digits(value: f64, min_digits: usize, max_digits: usize, locale: &Locale) -> String {
    let fixed = format!("{value:.max_digits$}");
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut fraction = fraction.to_string();
    while fraction.len() > min_digits && fraction.ends_with('0') {
        fraction.pop();
    }
    let grouped = integer
        .parse::<u128>()
        .map_or_else(|_| integer.to_string(), |integer| integer.to_formatted_string(locale));
    if fraction.is_empty() {
        grouped
    } else {
        format!("{grouped}{}{fraction}", locale.decimal())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::Month;

    use super::*;

    fn mk_date(year: i32, month: Month, day: u8) -> Date {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => date,
            Err(err) => panic!("test date should be valid: {err}"),
        }
    }

    #[test]
    fn dates_default_to_month_day_year() {
        let date = mk_date(2023, Month::October, 5);
        assert_eq!(format_date(date, None), "10/5/2023");
        assert_eq!(format_date(date, Some("[day].[month].[year]")), "05.10.2023");
        assert_eq!(format_date(date, Some("[broken")), "10/5/2023");
    }

    #[test]
    fn images_render_as_tags() {
        let image = Image {
            url: "https://example.com/a.png".to_string(),
            url_dark: Some("https://example.com/a-dark.png".to_string()),
            alt: Some("A \"logo\"".to_string()),
        };
        assert_eq!(
            format_image(&image),
            "<img src=\"https://example.com/a.png\" alt=\"A &quot;logo&quot;\" data-dark-src=\"https://example.com/a-dark.png\" />"
        );
    }

    #[test]
    fn lists_trim_map_and_join() {
        let items = vec!["  Choice 3 ".to_string(), "Choice 1".to_string(), String::new()];
        assert_eq!(format_list(&items, &ListFormatOptions::default()), "Choice 3, Choice 1");
        let upper = |item: &str| item.to_uppercase();
        let options = ListFormatOptions { separator: Some(" / "), map: Some(&upper), ..ListFormatOptions::default() };
        assert_eq!(format_list(&items, &options), "CHOICE 3 / CHOICE 1");
        assert_eq!(format_list(&[], &ListFormatOptions::default()), MISSING_ANSWER);
        let options = ListFormatOptions { empty_placeholder: Some("none"), ..ListFormatOptions::default() };
        assert_eq!(format_list(&[], &options), "none");
    }

    #[test]
    fn numbers_follow_the_locale() {
        assert_eq!(format_number(1234.5, None, "en"), "1,234.5");
        assert_eq!(format_number(1234.5, None, "de-DE"), "1.234,5");
        assert_eq!(format_number(1_234_567.0, None, "fi"), "1\u{a0}234\u{a0}567");
        assert_eq!(format_number(-0.125, None, "en-US"), "-0.125");
        assert_eq!(format_number(7.0, None, "en"), "7");
        assert_eq!(format_number(1234.5, None, "pt-BR"), "1.234,5");
        assert_eq!(format_number(1234.5, None, "xx-unknown"), "1,234.5");
    }

    #[test]
    fn percent_and_currency_styles() {
        let percent = NumberFormat { style: NumberStyle::Percent, ..NumberFormat::default() };
        assert_eq!(format_number(0.5, Some(&percent), "en-US"), "50%");
        assert_eq!(format_number(0.5, Some(&percent), "fi"), "50\u{a0}%");

        let dollars = NumberFormat { style: NumberStyle::Currency, ..NumberFormat::default() };
        assert_eq!(format_number(1234.5, Some(&dollars), "en"), "$1,234.50");
        let euros = NumberFormat {
            style: NumberStyle::Currency,
            currency: Some("EUR".to_string()),
            ..NumberFormat::default()
        };
        assert_eq!(format_number(1234.5, Some(&euros), "de"), "1.234,50\u{a0}\u{20ac}");
    }

    #[test]
    fn fraction_digit_bounds_apply() {
        let fixed = NumberFormat {
            minimum_fraction_digits: Some(2),
            maximum_fraction_digits: Some(2),
            ..NumberFormat::default()
        };
        assert_eq!(format_number(3.0, Some(&fixed), "en"), "3.00");
        assert_eq!(format_number(3.14159, Some(&fixed), "en"), "3.14");
    }

    #[test]
    fn formatter_keys_are_camel_case() {
        let formatter = Formatter::TextAnswer(Box::new(|text: &str| text.to_uppercase()));
        assert_eq!(formatter.key(), "textAnswer");
        let mut formatters = Formatters::default();
        formatters.set(formatter);
        assert_eq!((formatters.text_answer)("abc"), "ABC");
        assert_eq!((formatters.boolean_answer)(true), "Yes");
        assert_eq!((formatters.missing_answer)(), MISSING_ANSWER);
    }

    proptest! {
        #[test]
        fn property_grouping_preserves_digits(value in 0u64..10_000_000_000) {
            #[allow(clippy::cast_precision_loss)]
            let formatted = format_number(value as f64, None, "en");
            let digits = formatted.replace(',', "");
            prop_assert_eq!(digits, value.to_string());
        }
    }
}
