//! Query documents and response shapes of the remote API
//!
//! The remote service reports numeric ids as JSON strings in some places and
//! as numbers in others, so ids go through lenient deserializers.

use crate::storage::Level;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Value};

/// Number of submissions requested per problem
///
/// Only the first page is ever read.
pub const SUBMISSION_PAGE_LIMIT: u32 = 20;

/// Status label of an accepted submission
pub const ACCEPTED_STATUS: &str = "Accepted";

/// Status code of a solved problem in the problem list
pub const SOLVED_STATUS: &str = "ac";

pub const PROBLEM_DETAIL_OPERATION: &str = "getQuestionDetail";

pub const PROBLEM_DETAIL_QUERY: &str = r#"query getQuestionDetail($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    questionId
    questionFrontendId
    questionTitle
    questionTitleSlug
    content
    difficulty
    stats
    similarQuestions
    categoryTitle
    topicTags {
      name
      slug
    }
  }
}"#;

pub const SOLUTION_OPERATION: &str = "QuestionNote";

pub const SOLUTION_QUERY: &str = r#"query QuestionNote($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    questionId
    article
    solution {
      id
      content
      contentTypeId
      canSeeDetail
      paidOnly
    }
  }
}"#;

pub const SUBMISSIONS_OPERATION: &str = "Submissions";

pub const SUBMISSIONS_QUERY: &str = r#"query Submissions($offset: Int!, $limit: Int!, $lastKey: String, $questionSlug: String!) {
  submissionList(offset: $offset, limit: $limit, lastKey: $lastKey, questionSlug: $questionSlug) {
    lastKey
    hasNext
    submissions {
      id
      statusDisplay
      lang
      runtime
      timestamp
      url
      isPending
    }
  }
}"#;

pub fn problem_variables(slug: &str) -> Value {
    json!({ "titleSlug": slug })
}

pub fn submission_variables(slug: &str) -> Value {
    json!({
        "offset": 0,
        "limit": SUBMISSION_PAGE_LIMIT,
        "lastKey": "",
        "questionSlug": slug,
    })
}

// ===== Problem list =====

/// The full catalog with the user's per-problem status
#[derive(Debug, Clone, Deserialize)]
pub struct ProblemList {
    pub stat_status_pairs: Vec<StatStatusPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatStatusPair {
    pub stat: ProblemStat,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemStat {
    #[serde(deserialize_with = "lenient_i64")]
    pub question_id: i64,
    #[serde(rename = "question__title_slug")]
    pub title_slug: String,
}

/// A problem the user has solved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcceptedProblem {
    pub id: i64,
    pub slug: String,
}

impl ProblemList {
    /// The solved problems, in the order the remote listed them
    pub fn accepted(&self) -> Vec<AcceptedProblem> {
        self.stat_status_pairs
            .iter()
            .filter(|pair| pair.status.as_deref() == Some(SOLVED_STATUS))
            .map(|pair| AcceptedProblem {
                id: pair.stat.question_id,
                slug: pair.stat.title_slug.clone(),
            })
            .collect()
    }
}

// ===== Problem detail =====

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "questionId", deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "questionFrontendId", deserialize_with = "lenient_string")]
    pub display_id: String,
    #[serde(rename = "questionTitle")]
    pub title: String,
    #[serde(rename = "questionTitleSlug")]
    pub slug: String,
    #[serde(default)]
    pub content: Option<String>,
    pub difficulty: Level,
    #[serde(rename = "topicTags", default, deserialize_with = "null_as_default")]
    pub topic_tags: Vec<TopicTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicTag {
    pub name: String,
    pub slug: String,
}

// ===== Official solution =====

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionNote {
    #[serde(rename = "questionId", deserialize_with = "lenient_i64")]
    pub question_id: i64,
    #[serde(default)]
    pub solution: Option<OfficialSolution>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficialSolution {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "paidOnly", default)]
    pub paid_only: bool,
}

impl QuestionNote {
    /// The solution, if one exists and is not behind the paywall
    pub fn free_solution(&self) -> Option<&OfficialSolution> {
        self.solution.as_ref().filter(|s| !s.paid_only)
    }
}

// ===== Submission list =====

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionList {
    /// Whether older submissions exist beyond the page that was read
    #[serde(rename = "hasNext", default, deserialize_with = "null_as_default")]
    pub has_next: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionSummary {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "statusDisplay")]
    pub status_display: String,
    pub lang: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub timestamp: i64,
    /// Path of the detail page, relative to the service origin
    pub url: String,
    /// Still being judged; reported as `"Pending"`/`"Not Pending"` or a bool
    #[serde(rename = "isPending", default, deserialize_with = "lenient_pending")]
    pub is_pending: bool,
}

impl SubmissionSummary {
    /// Judged and accepted
    pub fn is_accepted(&self) -> bool {
        !self.is_pending && self.status_display == ACCEPTED_STATUS
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected an integer, got {:?}", s))),
    }
}

fn lenient_pending<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Pending {
        Flag(bool),
        Label(String),
    }

    match Option::<Pending>::deserialize(deserializer)? {
        Some(Pending::Flag(flag)) => Ok(flag),
        Some(Pending::Label(label)) => Ok(label.trim().eq_ignore_ascii_case("pending")),
        None => Ok(false),
    }
}

/// Decodes `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n.to_string()),
        NumberOrText::Text(s) => Ok(s),
    }
}
