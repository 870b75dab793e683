//! Integration tests for synchronization
//!
//! These tests use wiremock as the remote API and a fixture browser serving
//! canned submission pages, and run whole synchronizations end-to-end.

use async_trait::async_trait;
use leetdeck::auth::{AuthenticatedContext, StoredCookie};
use leetdeck::browser::{Browser, BrowserResult};
use leetdeck::config::{BrowserConfig, Config, OutputConfig, RemoteConfig, SyncConfig};
use leetdeck::storage::{Level, ProblemRecord, RunStatus, SqliteStorage, Storage};
use leetdeck::sync::{QueryClient, SyncReport, Synchronizer};
use leetdeck::SyncError;
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves fixed markup per URL and records every navigation
#[derive(Default)]
struct FixtureBrowser {
    pages: HashMap<String, String>,
    current: String,
    visits: Vec<String>,
}

impl FixtureBrowser {
    fn with_page(mut self, url: String, markup: String) -> Self {
        self.pages.insert(url, markup);
        self
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.current = url.to_string();
        self.visits.push(url.to_string());
        Ok(())
    }

    async fn current_url(&mut self) -> BrowserResult<String> {
        Ok(self.current.clone())
    }

    async fn page_source(&mut self) -> BrowserResult<String> {
        Ok(self
            .pages
            .get(&self.current)
            .cloned()
            .unwrap_or_else(|| "<html><body>loading</body></html>".to_string()))
    }

    async fn cookies(&mut self) -> BrowserResult<Vec<StoredCookie>> {
        Ok(Vec::new())
    }
}

/// Creates a test configuration pointing at the mock server, without pacing
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        remote: RemoteConfig {
            base_url: base_url.to_string(),
            user_agent: "TestAgent/1.0".to_string(),
        },
        browser: BrowserConfig {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            login_timeout_secs: 1,
            extraction_timeout_secs: 1,
            ready_selector: "#result_date".to_string(),
        },
        sync: SyncConfig {
            min_pace_secs: 0.0,
            max_pace_secs: 0.0,
            max_attempts: 3,
        },
        output: OutputConfig {
            database_path: dir.path().join("leetcode.db").display().to_string(),
            credentials_path: dir.path().join("cookies.json").display().to_string(),
            deck_path: dir.path().join("deck.md").display().to_string(),
        },
    }
}

fn create_client(config: &Config) -> QueryClient {
    let context = AuthenticatedContext::from_cookies(vec![
        StoredCookie::new("LEETCODE_SESSION", "sess"),
        StoredCookie::new("csrftoken", "tok"),
    ]);
    QueryClient::new(&context, &config.remote).unwrap()
}

async fn run_sync(
    config: &Config,
    storage: &mut SqliteStorage,
    browser: &mut FixtureBrowser,
) -> leetdeck::Result<SyncReport> {
    let client = create_client(config);
    Synchronizer::new(storage, browser, client, config)
        .run("test-hash")
        .await
}

fn submission_page(escaped_source: &str) -> String {
    format!(
        "<html><body><div id=\"result_date\">1 day ago</div><script>\n\
         var pageData = {{\n  submissionCode: '{}',\n  editCodeUrl: '/problems/x/'\n}};\n\
         </script></body></html>",
        escaped_source
    )
}

async fn mock_problem_list(server: &MockServer, problems: &[(i64, &str, &str)]) {
    let pairs: Vec<Value> = problems
        .iter()
        .map(|(id, slug, status)| {
            json!({
                "stat": { "question_id": id, "question__title_slug": slug },
                "status": status,
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/problems/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stat_status_pairs": pairs
        })))
        .mount(server)
        .await;
}

fn detail_body(id: i64, slug: &str, title: &str) -> Value {
    json!({
        "data": { "question": {
            "questionId": id.to_string(),
            "questionFrontendId": id.to_string(),
            "questionTitle": title,
            "questionTitleSlug": slug,
            "content": format!("<p>{} statement</p>", title),
            "difficulty": "Easy",
            "topicTags": [
                { "name": "Array", "slug": "array" },
                { "name": "Hash Table", "slug": "hash-table" }
            ]
        }}
    })
}

fn detail_mock(slug: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("getQuestionDetail"))
        .and(body_string_contains(format!("\"titleSlug\":\"{}\"", slug)))
}

fn solution_mock(slug: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("QuestionNote"))
        .and(body_string_contains(format!("\"titleSlug\":\"{}\"", slug)))
}

fn submissions_mock(slug: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("\"operationName\":\"Submissions\""))
        .and(body_string_contains(format!("\"questionSlug\":\"{}\"", slug)))
}

fn submissions_body(entries: &[(i64, &str)]) -> Value {
    let submissions: Vec<Value> = entries
        .iter()
        .map(|(id, status)| {
            json!({
                "id": id.to_string(),
                "statusDisplay": status,
                "lang": "python3",
                "runtime": "40 ms",
                "timestamp": "1600000000",
                "url": format!("/submissions/detail/{}/", id),
                "isPending": "Not Pending"
            })
        })
        .collect();

    json!({
        "data": { "submissionList": {
            "lastKey": null,
            "hasNext": false,
            "submissions": submissions
        }}
    })
}

fn no_solution_body(id: i64) -> Value {
    json!({ "data": { "question": { "questionId": id.to_string(), "solution": null } } })
}

/// Mounts a remote with one solved problem, two-sum, and one accepted submission
async fn mount_two_sum(server: &MockServer) {
    mock_problem_list(server, &[(1, "two-sum", "ac"), (2, "add-two-numbers", "notac")]).await;

    detail_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(1, "two-sum", "Two Sum")))
        .expect(1)
        .mount(server)
        .await;

    solution_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "question": {
                "questionId": "1",
                "solution": { "id": "7", "content": "## Hash map", "paidOnly": false }
            }}
        })))
        .expect(1)
        .mount(server)
        .await;

    submissions_mock("two-sum")
        .respond_with(
            ResponseTemplate::new(200).set_body_json(submissions_body(&[(100, "Accepted")])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_sum_scenario() {
    let server = MockServer::start().await;
    mount_two_sum(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default().with_page(
        format!("{}/submissions/detail/100/", server.uri()),
        submission_page("class Solution:\\u000A    def twoSum(self): ..."),
    );

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(report.accepted_problems, 1);
    assert_eq!(report.new_problems, 1);
    assert_eq!(report.solutions_stored, 1);
    assert_eq!(report.submissions_stored, 1);

    let problem = storage.get_problem(1).unwrap();
    assert_eq!(problem.slug, "two-sum");
    assert_eq!(problem.title, "Two Sum");
    assert_eq!(problem.level, Level::Easy);
    assert!(problem.accepted);

    let tags: Vec<String> = storage
        .tags_for_problem(1)
        .unwrap()
        .into_iter()
        .map(|t| t.slug)
        .collect();
    assert_eq!(tags, vec!["array", "hash-table"]);

    let solution = storage.get_solution(1).unwrap().unwrap();
    assert_eq!(solution.url, format!("{}/articles/two-sum/", server.uri()));
    assert_eq!(solution.content.as_deref(), Some("## Hash map"));

    let submissions = storage.submissions_for_slug("two-sum").unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].id, 100);
    assert_eq!(submissions[0].language, "python3");
    assert_eq!(submissions[0].created, 1_600_000_000);
    assert_eq!(
        submissions[0].source,
        b"class Solution:\n    def twoSum(self): ...".to_vec()
    );

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.new_problems, 1);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_two_sum(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new(&dir.path().join("leetcode.db")).unwrap();
    let detail_url = format!("{}/submissions/detail/100/", server.uri());
    let mut browser = FixtureBrowser::default()
        .with_page(detail_url.clone(), submission_page("print(1)"));

    let first = run_sync(&config, &mut storage, &mut browser).await.unwrap();
    let problem_after_first = storage.get_problem(1).unwrap();

    let second = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(first.new_problems, 1);
    assert_eq!(second.new_problems, 0);
    assert_eq!(second.submissions_stored, 0);
    assert_eq!(second.submissions_known, 1);

    assert_eq!(storage.count_problems().unwrap(), 1);
    assert_eq!(storage.count_tags().unwrap(), 2);
    assert_eq!(storage.count_solutions().unwrap(), 1);
    assert_eq!(storage.count_submissions().unwrap(), 1);
    assert_eq!(storage.get_problem(1).unwrap(), problem_after_first);

    // The detail page is rendered once across both runs
    assert_eq!(browser.visits, vec![detail_url]);
}

#[tokio::test]
async fn test_only_new_problems_are_fetched() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "a", "ac"), (2, "b", "ac"), (3, "c", "ac")]).await;

    for (id, slug) in [(1, "a"), (3, "c")] {
        detail_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id, slug, slug)))
            .expect(1)
            .mount(&server)
            .await;
        solution_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(no_solution_body(id)))
            .expect(1)
            .mount(&server)
            .await;
    }
    detail_mock("b")
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(2, "b", "b")))
        .expect(0)
        .mount(&server)
        .await;

    // Submission lists are checked for known problems too
    for slug in ["a", "b", "c"] {
        submissions_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(submissions_body(&[])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage
        .upsert_problem(&ProblemRecord {
            id: 2,
            display_id: "2".to_string(),
            title: "B".to_string(),
            slug: "b".to_string(),
            level: Level::Medium,
            description: None,
            accepted: true,
        })
        .unwrap();
    let mut browser = FixtureBrowser::default();

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(report.accepted_problems, 3);
    assert_eq!(report.new_problems, 2);
    assert_eq!(report.solutions_stored, 0);
    assert_eq!(storage.get_problem(2).unwrap().title, "B");
    assert!(storage.problem_exists(1).unwrap());
    assert!(storage.problem_exists(3).unwrap());
}

#[tokio::test]
async fn test_unaccepted_and_unreadable_submissions_are_skipped() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "two-sum", "ac")]).await;
    detail_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(1, "two-sum", "Two Sum")))
        .mount(&server)
        .await;
    solution_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "question": {
                "questionId": "1",
                "solution": { "content": "premium", "paidOnly": true }
            }}
        })))
        .mount(&server)
        .await;
    submissions_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(submissions_body(&[
            (101, "Wrong Answer"),
            (102, "Accepted"),
            (103, "Accepted"),
        ])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default()
        .with_page(
            format!("{}/submissions/detail/102/", server.uri()),
            "<html><body><div id=\"result_date\">now</div>redesigned page</body></html>"
                .to_string(),
        )
        .with_page(
            format!("{}/submissions/detail/103/", server.uri()),
            submission_page("return 42"),
        );

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(report.submissions_stored, 1);
    assert_eq!(report.submissions_skipped, 2);
    assert_eq!(report.solutions_stored, 0);
    assert!(storage.get_solution(1).unwrap().is_none());

    assert!(!storage.submission_exists(101).unwrap());
    assert!(!storage.submission_exists(102).unwrap());
    assert!(storage.submission_exists(103).unwrap());

    // The wrong answer is never rendered
    assert!(!browser.visits.iter().any(|url| url.contains("/101/")));
}

#[tokio::test]
async fn test_submission_list_failure_does_not_abort_run() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "a", "ac"), (2, "b", "ac")]).await;
    for (id, slug) in [(1, "a"), (2, "b")] {
        detail_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id, slug, slug)))
            .mount(&server)
            .await;
        solution_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(no_solution_body(id)))
            .mount(&server)
            .await;
    }
    submissions_mock("a")
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    submissions_mock("b")
        .respond_with(ResponseTemplate::new(200).set_body_json(submissions_body(&[(200, "Accepted")])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default().with_page(
        format!("{}/submissions/detail/200/", server.uri()),
        submission_page("b()"),
    );

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(report.new_problems, 2);
    assert_eq!(report.submission_list_failures, 1);
    assert_eq!(report.submissions_stored, 1);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_submission_write_failure_does_not_abort_run() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "a", "ac"), (2, "b", "ac")]).await;
    for (id, slug, submission_id) in [(1, "a", 100), (2, "b", 200)] {
        detail_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id, slug, slug)))
            .mount(&server)
            .await;
        solution_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_json(no_solution_body(id)))
            .mount(&server)
            .await;
        submissions_mock(slug)
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(submissions_body(&[(submission_id, "Accepted")])),
            )
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let db_path = dir.path().join("leetcode.db");
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    // A second connection makes every write of a's submissions fail
    rusqlite::Connection::open(&db_path)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_a BEFORE INSERT ON submissions WHEN NEW.slug = 'a'
             BEGIN SELECT RAISE(ABORT, 'disk fault'); END;",
        )
        .unwrap();

    let mut browser = FixtureBrowser::default()
        .with_page(
            format!("{}/submissions/detail/100/", server.uri()),
            submission_page("a()"),
        )
        .with_page(
            format!("{}/submissions/detail/200/", server.uri()),
            submission_page("b()"),
        );

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();

    assert_eq!(report.new_problems, 2);
    assert_eq!(report.submission_store_failures, 1);
    assert_eq!(report.submissions_stored, 1);
    assert!(storage.problem_exists(2).unwrap());
    assert!(!storage.submission_exists(100).unwrap());
    assert!(storage.submission_exists(200).unwrap());
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_transient_detail_failure_is_retried() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "two-sum", "ac")]).await;
    detail_mock("two-sum")
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    detail_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(1, "two-sum", "Two Sum")))
        .expect(1)
        .mount(&server)
        .await;
    solution_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(no_solution_body(1)))
        .mount(&server)
        .await;
    submissions_mock("two-sum")
        .respond_with(ResponseTemplate::new(200).set_body_json(submissions_body(&[])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default();

    let report = run_sync(&config, &mut storage, &mut browser).await.unwrap();
    assert_eq!(report.new_problems, 1);
}

#[tokio::test]
async fn test_malformed_detail_fails_run_and_keeps_progress() {
    let server = MockServer::start().await;
    mock_problem_list(&server, &[(1, "a", "ac"), (2, "b", "ac")]).await;
    detail_mock("a")
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(1, "a", "A")))
        .mount(&server)
        .await;
    solution_mock("a")
        .respond_with(ResponseTemplate::new(200).set_body_json(no_solution_body(1)))
        .mount(&server)
        .await;
    submissions_mock("a")
        .respond_with(ResponseTemplate::new(200).set_body_json(submissions_body(&[])))
        .mount(&server)
        .await;
    detail_mock("b")
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default();

    let result = run_sync(&config, &mut storage, &mut browser).await;

    match result {
        Err(SyncError::QueryFailed { operation, .. }) => {
            assert_eq!(operation, "getQuestionDetail")
        }
        other => panic!("expected a failed detail query, got {:?}", other),
    }

    assert!(storage.problem_exists(1).unwrap());
    assert!(!storage.problem_exists(2).unwrap());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.new_problems, 1);
}

/// Rewriting a synced problem through storage replaces its row and keeps its tags
#[tokio::test]
async fn test_storage_upsert_replaces_synced_problem_in_place() {
    let server = MockServer::start().await;
    mount_two_sum(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut browser = FixtureBrowser::default();

    run_sync(&config, &mut storage, &mut browser).await.unwrap();

    let mut renamed = storage.get_problem(1).unwrap();
    renamed.title = "Two Sum (Renamed)".to_string();
    storage.upsert_problem(&renamed).unwrap();

    assert_eq!(storage.count_problems().unwrap(), 1);
    assert_eq!(storage.get_problem(1).unwrap().title, "Two Sum (Renamed)");
    assert_eq!(storage.tags_for_problem(1).unwrap().len(), 2);
}
