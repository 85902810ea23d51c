use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A question number within a template, `1..=total_questions`.
///
/// Serialized as a string so it can be used as a map key in both JSON
/// and BSON documents; accepts either a string or an integer on input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionNumber(pub u32);

impl fmt::Display for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for QuestionNumber {
    fn from(value: u32) -> Self {
        QuestionNumber(value)
    }
}

impl FromStr for QuestionNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(QuestionNumber)
    }
}

impl Serialize for QuestionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for QuestionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuestionNumberVisitor;

        impl de::Visitor<'_> for QuestionNumberVisitor {
            type Value = QuestionNumber;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a question number as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(|_| {
                    E::invalid_value(de::Unexpected::Str(v), &"a positive integer")
                })
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u32::try_from(v).map(QuestionNumber).map_err(|_| {
                    E::invalid_value(de::Unexpected::Unsigned(v), &"a u32 question number")
                })
            }
        }

        deserializer.deserialize_any(QuestionNumberVisitor)
    }
}

/// A student's answer to one question. `Empty` is the "left blank"
/// sentinel and serializes as `"X"`, distinct from every option label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "X")]
    Empty,
}

impl AnswerChoice {
    /// Normalizes a caller-supplied label. Trims and uppercases before
    /// matching, so bulk-import rows like `" a "` still resolve.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "A" => Some(AnswerChoice::A),
            "B" => Some(AnswerChoice::B),
            "C" => Some(AnswerChoice::C),
            "D" => Some(AnswerChoice::D),
            "E" => Some(AnswerChoice::E),
            "X" => Some(AnswerChoice::Empty),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnswerChoice::Empty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerChoice::A => "A",
            AnswerChoice::B => "B",
            AnswerChoice::C => "C",
            AnswerChoice::D => "D",
            AnswerChoice::E => "E",
            AnswerChoice::Empty => "X",
        }
    }
}

impl fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored answer inside a persisted result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerRecord {
    pub answer: AnswerChoice,
    pub is_correct: bool,
}

/// A scored exam sitting. Aggregates are computed once at creation and
/// stored; the record is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamResult {
    pub id: String,
    pub institution_id: String,
    pub template_id: String,
    pub student_id: String,
    pub user_id: String,
    pub exam_date: NaiveDate,
    pub answers: BTreeMap<QuestionNumber, AnswerRecord>,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub empty_count: u32,
    pub net_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExamResult {
    pub fn total_questions(&self) -> u32 {
        self.correct_count + self.wrong_count + self.empty_count
    }
}
