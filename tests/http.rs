use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use library_catalog::database::{
    DefaultAuthorRepository, DefaultBookRepository, establish_in_memory_pool,
};
use library_catalog::http::{AppState, router};
use sqlx::SqlitePool;
use tower::ServiceExt;

async fn app_with_pool() -> (Router, SqlitePool) {
    let pool = establish_in_memory_pool().await.unwrap();
    let state = AppState::new(
        DefaultAuthorRepository::new(pool.clone()),
        DefaultBookRepository::new(pool.clone()),
    );
    (router(state), pool)
}

async fn app() -> Router {
    app_with_pool().await.0
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

struct Posted {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

async fn post(app: &Router, uri: &str, form: &str) -> Posted {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    Posted {
        status,
        location,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

async fn seed_author(app: &Router, name: &str) {
    let form = format!("name={name}&birth_date=1950-01-01&death_date=");
    let resp = post(app, "/add_author", &form).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
}

async fn seed_book(app: &Router, title: &str, isbn: &str) {
    let form = format!("title={title}&author_id=1&publication_year=&isbn={isbn}");
    let resp = post(app, "/add_book", &form).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn empty_catalog_renders() {
    let app = app().await;
    let (status, body) = get(&app, "/?sort_by=unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No books found."));
}

#[tokio::test]
async fn add_author_redirects_with_success_flag() {
    let app = app().await;
    let resp = post(
        &app,
        "/add_author",
        "name=Jane+Doe&birth_date=1990-05-01&death_date=",
    )
    .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/add_author?success=true"));

    let (_, body) = get(&app, "/add_author?success=true").await;
    assert!(body.contains("Author added successfully."));

    let (status, body) = get(&app, "/add_book").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("1. Jane Doe (1990-05-01)"));
}

#[tokio::test]
async fn add_author_with_bad_date_rerenders_form() {
    let app = app().await;
    let resp = post(&app, "/add_author", "name=Jane&birth_date=yesterday").await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.body.contains("Invalid birth date"));
    assert!(resp.body.contains(r#"action="/add_author""#));

    let resp = post(
        &app,
        "/add_author",
        "name=Jane&birth_date=1990-05-01&death_date=1980-05-01",
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.body.contains("precedes birth date"));
}

#[tokio::test]
async fn add_book_stores_year_prefix_of_date() {
    let app = app().await;
    seed_author(&app, "Anon").await;

    let resp = post(
        &app,
        "/add_book",
        "title=Millennium&author_id=1&publication_year=1999-07-01&isbn=111",
    )
    .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/add_book?success=true"));

    let (_, body) = get(&app, "/").await;
    assert!(body.contains("<td>Millennium</td>"));
    assert!(body.contains("<td>1999</td>"));
    assert!(body.contains("<td>Anon</td>"));
}

#[tokio::test]
async fn add_book_with_bad_year_is_rejected() {
    let app = app().await;
    seed_author(&app, "Anon").await;

    let resp = post(
        &app,
        "/add_book",
        "title=Broken&author_id=1&publication_year=abc&isbn=111",
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.body.contains("Invalid year format: abc"));
    assert!(resp.body.contains(r#"<option value="1">"#));

    let (_, body) = get(&app, "/").await;
    assert!(body.contains("No books found."));
}

#[tokio::test]
async fn add_book_with_duplicate_isbn_conflicts() {
    let app = app().await;
    seed_author(&app, "Anon").await;
    seed_book(&app, "First", "222").await;

    let resp = post(&app, "/add_book", "title=Second&author_id=1&isbn=222").await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert!(resp.body.contains("A book with ISBN 222 already exists."));

    let (_, body) = get(&app, "/").await;
    assert!(body.contains("First"));
    assert!(!body.contains("Second"));
}

#[tokio::test]
async fn add_book_for_unknown_author_is_rejected() {
    let app = app().await;
    let resp = post(&app, "/add_book", "title=Orphan&author_id=7&isbn=333").await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.body.contains("does not exist"));
}

#[tokio::test]
async fn search_and_sort_through_query_string() {
    let app = app().await;
    seed_author(&app, "Anon").await;
    seed_book(&app, "Zebra+Tales", "1").await;
    seed_book(&app, "Apple+Pie", "2").await;
    seed_book(&app, "Zebra+Crossing", "3").await;

    let (_, body) = get(&app, "/?search=Zebra&sort_by=title").await;
    assert!(!body.contains("Apple Pie"));
    let crossing = body.find("Zebra Crossing").unwrap();
    let tales = body.find("Zebra Tales").unwrap();
    assert!(crossing < tales);

    let (_, body) = get(&app, "/?sort_by=title").await;
    assert!(body.find("Apple Pie").unwrap() < body.find("Zebra Crossing").unwrap());
}

#[tokio::test]
async fn deleting_missing_book_redirects_with_error() {
    let app = app().await;
    let resp = post(&app, "/book/999999/delete", "").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/?error=Book+not+found"));

    let (_, body) = get(&app, "/?error=Book+not+found").await;
    assert!(body.contains("Book not found"));
}

#[tokio::test]
async fn home_renders_any_error_text_escaped() {
    let app = app().await;
    let (status, body) = get(&app, "/?error=Something%20%3Cbad%3E%20happened").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Something &lt;bad&gt; happened"));
}

#[tokio::test]
async fn home_tolerates_loose_query_strings() {
    let app = app().await;
    for uri in [
        "/?success_delete=True",
        "/?success_delete=1",
        "/?sort_by=title&sort_by=author",
        "/?success_delete=maybe&unexpected=x",
    ] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    let (_, body) = get(&app, "/?success_delete=True").await;
    assert!(body.contains("Book deleted successfully."));

    let (status, body) = get(&app, "/add_author?success=True").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Author added successfully."));

    let (status, body) = get(&app, "/add_book?success=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Book added successfully."));
}

#[tokio::test]
async fn whitespace_search_matches_titles_with_spaces() {
    let app = app().await;
    seed_author(&app, "Anon").await;
    seed_book(&app, "Zebra", "1").await;
    seed_book(&app, "Apple+Pie", "2").await;

    let (_, body) = get(&app, "/?search=+").await;
    assert!(body.contains("Apple Pie"));
    assert!(!body.contains("<td>Zebra</td>"));
}

#[tokio::test]
async fn storage_failure_on_add_author_rerenders_form() {
    let (app, pool) = app_with_pool().await;
    pool.close().await;

    let resp = post(&app, "/add_author", "name=Jane&birth_date=1990-05-01").await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body.contains("Database error"));
    assert!(resp.body.contains(r#"action="/add_author""#));
}

#[tokio::test]
async fn storage_failure_on_add_book_reports_database_error() {
    let (app, pool) = app_with_pool().await;
    pool.close().await;

    let resp = post(&app, "/add_book", "title=Late&author_id=1&isbn=1").await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body.contains("Database error"));
}

#[tokio::test]
async fn storage_failure_on_delete_redirects_with_message() {
    let (app, pool) = app_with_pool().await;
    seed_author(&app, "Anon").await;
    seed_book(&app, "Doomed", "1").await;
    sqlx::query("DROP TABLE book").execute(&pool).await.unwrap();

    let resp = post(&app, "/book/1/delete", "").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    let location = resp.location.unwrap();
    assert!(
        location.starts_with("/?error=Error+deleting+book%3A+"),
        "{location}"
    );
    assert!(location.contains("no+such+table"), "{location}");
}

#[tokio::test]
async fn deleting_book_redirects_with_success() {
    let app = app().await;
    seed_author(&app, "Anon").await;
    seed_book(&app, "Doomed", "1").await;

    let resp = post(&app, "/book/1/delete", "").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/?success_delete=true"));

    let (_, body) = get(&app, "/?success_delete=true").await;
    assert!(body.contains("Book deleted successfully."));
    assert!(!body.contains("Doomed"));
}
