use crate::http::{AppState, views};
use crate::models::{
    AuthorName, AuthorNameEmptyError, BookTitle, BookTitleEmptyError, CreateAuthorError,
    CreateAuthorRequest, CreateBookError, CreateBookRequest, DateError, DeleteBookError,
    DeleteBookRequest, FindAllAuthorsError, Isbn, IsbnEmptyError, Lifespan, LifespanError,
    ListBooksError, ListBooksRequest, PublicationYear, PublicationYearError, parse_date,
};
use crate::repositories::{AuthorRepository, BookRepository};
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use maud::Markup;
use serde::Deserialize;
use thiserror::Error;


#[derive(Debug)]
pub struct HtmlPage(StatusCode, Markup);

impl HtmlPage {
    pub const fn new(status: StatusCode, page: Markup) -> Self {
        Self(status, page)
    }
}

impl IntoResponse for HtmlPage {
    fn into_response(self) -> Response {
        (self.0, Html(self.1.into_string())).into_response()
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    Conflict(String),
    UnprocessableEntity(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::InternalServerError(msg) | Self::Conflict(msg) | Self::UnprocessableEntity(msg) => {
                msg.as_str()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        HtmlPage::new(self.status(), views::error(self.message())).into_response()
    }
}

fn database_error(cause: &anyhow::Error) -> ApiError {
    tracing::error!("{cause:#}");
    ApiError::InternalServerError(format!("Database error: {cause:#}"))
}

impl From<ParseCreateAuthorHttpRequestError> for ApiError {
    fn from(err: ParseCreateAuthorHttpRequestError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<ParseCreateBookHttpRequestError> for ApiError {
    fn from(err: ParseCreateBookHttpRequestError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Other(cause) => database_error(&cause),
        }
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::Duplicate { .. } => Self::Conflict(err.to_string()),
            CreateBookError::UnknownAuthor { .. } => Self::UnprocessableEntity(err.to_string()),
            CreateBookError::Other(cause) => database_error(&cause),
        }
    }
}

impl From<FindAllAuthorsError> for ApiError {
    fn from(err: FindAllAuthorsError) -> Self {
        database_error(&err.0)
    }
}

impl From<ListBooksError> for ApiError {
    fn from(err: ListBooksError) -> Self {
        database_error(&err.0)
    }
}

/// Raw query-string pairs. Lookups take the first occurrence of a key, so
/// repeated or unexpected parameters never reject the request.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `true`, `True`, `1`, `yes` and `on` count as set.
    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
    }
}

pub async fn home<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Query(query): Query<QueryParams>,
) -> Result<HtmlPage, ApiError> {
    let req = ListBooksRequest::new(query.get("search"), query.get("sort_by"));
    let books = state.book_repo.list_books(&req).await?;

    let error = query.get("error").filter(|msg| !msg.trim().is_empty());
    let success = query
        .flag("success_delete")
        .then_some("Book deleted successfully.");

    let page = views::home(&views::HomeView {
        books: &books,
        request: &req,
        success,
        error,
    });
    Ok(HtmlPage::new(StatusCode::OK, page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateAuthorHttpRequest {
    name: String,
    birth_date: String,
    death_date: String,
}

#[derive(Error, Debug)]
pub enum ParseCreateAuthorHttpRequestError {
    #[error(transparent)]
    Name(#[from] AuthorNameEmptyError),
    #[error("Birth date is required")]
    MissingBirthDate,
    #[error("Invalid birth date: {0}")]
    BirthDate(DateError),
    #[error("Invalid death date: {0}")]
    DeathDate(DateError),
    #[error(transparent)]
    Lifespan(#[from] LifespanError),
}

impl TryFrom<CreateAuthorHttpRequest> for CreateAuthorRequest {
    type Error = ParseCreateAuthorHttpRequestError;

    fn try_from(value: CreateAuthorHttpRequest) -> Result<Self, Self::Error> {
        let name = AuthorName::new(&value.name)?;

        let birth_date = value.birth_date.trim();
        if birth_date.is_empty() {
            return Err(ParseCreateAuthorHttpRequestError::MissingBirthDate);
        }
        let birth_date = parse_date(birth_date).map_err(ParseCreateAuthorHttpRequestError::BirthDate)?;

        let death_date = match value.death_date.trim() {
            "" => None,
            raw => Some(parse_date(raw).map_err(ParseCreateAuthorHttpRequestError::DeathDate)?),
        };

        let lifespan = Lifespan::new(birth_date, death_date)?;
        Ok(Self::new(name, lifespan))
    }
}

pub async fn add_author_form(Query(query): Query<QueryParams>) -> HtmlPage {
    HtmlPage::new(StatusCode::OK, views::add_author(query.flag("success"), None))
}

pub async fn add_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Form(body): Form<CreateAuthorHttpRequest>,
) -> Response {
    match create_author(&state, body).await {
        Ok(()) => Redirect::to("/add_author?success=true").into_response(),
        Err(err) => {
            HtmlPage::new(err.status(), views::add_author(false, Some(err.message()))).into_response()
        }
    }
}

async fn create_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    body: CreateAuthorHttpRequest,
) -> Result<(), ApiError> {
    let req: CreateAuthorRequest = body.try_into()?;
    let author = state.author_repo.create_author(&req).await?;
    tracing::info!(id = author.id(), name = %author.name(), "created author");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookHttpRequest {
    title: String,
    author_id: String,
    publication_year: String,
    isbn: String,
}

#[derive(Error, Debug)]
pub enum ParseCreateBookHttpRequestError {
    #[error(transparent)]
    Title(#[from] BookTitleEmptyError),
    #[error("Invalid author id: \"{0}\"")]
    AuthorId(String),
    #[error(transparent)]
    PublicationYear(#[from] PublicationYearError),
    #[error(transparent)]
    Isbn(#[from] IsbnEmptyError),
}

impl TryFrom<CreateBookHttpRequest> for CreateBookRequest {
    type Error = ParseCreateBookHttpRequestError;

    fn try_from(value: CreateBookHttpRequest) -> Result<Self, Self::Error> {
        let title = BookTitle::new(&value.title)?;
        let author_id = value.author_id.trim();
        let author_id = author_id
            .parse::<i64>()
            .map_err(|_| ParseCreateBookHttpRequestError::AuthorId(author_id.into()))?;
        let publication_year = PublicationYear::parse(&value.publication_year)?;
        let isbn = Isbn::new(&value.isbn)?;
        Ok(Self::new(title, author_id, publication_year, isbn))
    }
}

pub async fn add_book_form<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Query(query): Query<QueryParams>,
) -> Result<HtmlPage, ApiError> {
    let authors = state.author_repo.find_all_authors().await?;
    let page = views::add_book(&authors, query.flag("success"), None);
    Ok(HtmlPage::new(StatusCode::OK, page))
}

pub async fn add_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Form(body): Form<CreateBookHttpRequest>,
) -> Result<Response, ApiError> {
    let Err(err) = create_book(&state, body).await else {
        return Ok(Redirect::to("/add_book?success=true").into_response());
    };

    let authors = state.author_repo.find_all_authors().await?;
    let page = views::add_book(&authors, false, Some(err.message()));
    Ok(HtmlPage::new(err.status(), page).into_response())
}

async fn create_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    body: CreateBookHttpRequest,
) -> Result<(), ApiError> {
    let req: CreateBookRequest = body.try_into()?;
    let book = state.book_repo.create_book(&req).await?;
    tracing::info!(isbn = %book.isbn(), "created book {book}");
    Ok(())
}

pub async fn delete_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
) -> Redirect {
    match state.book_repo.delete_book(&DeleteBookRequest::new(id)).await {
        Ok(()) => {
            tracing::info!(id, "deleted book");
            Redirect::to("/?success_delete=true")
        }
        Err(err @ DeleteBookError::NotFound { .. }) => {
            tracing::debug!(id, "book to delete does not exist");
            home_with_error(&err.to_string())
        }
        Err(DeleteBookError::Other(cause)) => {
            tracing::error!("{cause:#}");
            home_with_error(&format!("Error deleting book: {cause:#}"))
        }
    }
}

fn home_with_error(message: &str) -> Redirect {
    match serde_urlencoded::to_string([("error", message)]) {
        Ok(query) => Redirect::to(&format!("/?{query}")),
        Err(err) => {
            tracing::error!("failed to encode error message: {err}");
            Redirect::to("/")
        }
    }
}
