use crate::models::{
    Author, AuthorName, Book, BookTitle, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteBookError, DeleteBookRequest, FindAllAuthorsError, Isbn, Lifespan,
    ListBooksError, ListBooksRequest, PublicationYear, SortBy,
};
use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

static MIGRATOR: Migrator = sqlx::migrate!();

const SELECT_BOOKS: &str = "SELECT b.id, b.author_id, a.name AS author_name, b.title, \
     b.publication_year, b.isbn FROM book b LEFT JOIN author a ON a.id = b.author_id";

const SELECT_BOOKS_WITH_AUTHOR: &str = "SELECT b.id, b.author_id, a.name AS author_name, \
     b.title, b.publication_year, b.isbn FROM book b JOIN author a ON a.id = b.author_id";

/// Opens the catalog database, creating the file if needed, and brings the
/// schema up to date before returning.
pub async fn establish_pool(path: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    if let Some(dir) = opts.get_filename().parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    migrate(&pool).await?;

    Ok(pool)
}

/// A single-connection in-memory database. The connection is never recycled,
/// so the data lives as long as the pool.
pub async fn establish_in_memory_pool() -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .context("Failed to open in-memory database")?;

    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("database schema is up to date");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DefaultAuthorRepository {
    pool: SqlitePool,
}

impl DefaultAuthorRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let birth_date: NaiveDate = row.try_get("birth_date")?;
        let death_date: Option<NaiveDate> = row.try_get("death_date")?;

        let name = AuthorName::new_unchecked(&name);
        let lifespan = Lifespan::new_unchecked(birth_date, death_date);
        Ok(Self::new(id, name, lifespan))
    }
}

#[async_trait]
impl AuthorRepository for DefaultAuthorRepository {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let context = || format!(r#"Failed to create author with name "{}""#, req.name());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| CreateAuthorError::Other(anyhow!(err).context(context())))?;

        let author = sqlx::query_as(
            "INSERT INTO author (name, birth_date, death_date) VALUES (?, ?, ?) \
             RETURNING id, name, birth_date, death_date",
        )
        .bind(req.name().to_string())
        .bind(req.birth_date())
        .bind(req.death_date())
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| CreateAuthorError::Other(anyhow!(err).context(context())))?;

        tx.commit()
            .await
            .map_err(|err| CreateAuthorError::Other(anyhow!(err).context(context())))?;

        Ok(author)
    }

    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
        let authors =
            sqlx::query_as("SELECT id, name, birth_date, death_date FROM author ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(|err| {
                    let err = anyhow!(err).context("Failed to retrieve all authors");
                    FindAllAuthorsError(err)
                })?;

        Ok(authors)
    }
}

#[derive(Debug, Clone)]
pub struct DefaultBookRepository {
    pool: SqlitePool,
}

impl DefaultBookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let author_id = row.try_get("author_id")?;
        let author_name: Option<String> = row.try_get("author_name")?;
        let title: String = row.try_get("title")?;
        let publication_year: Option<i32> = row.try_get("publication_year")?;
        let isbn: String = row.try_get("isbn")?;

        Ok(Self::new(
            id,
            author_id,
            author_name.as_deref().map(AuthorName::new_unchecked),
            BookTitle::new_unchecked(&title),
            publication_year.map(PublicationYear::new_unchecked),
            Isbn::new_unchecked(&isbn),
        ))
    }
}

#[async_trait]
impl BookRepository for DefaultBookRepository {
    async fn list_books(&self, req: &ListBooksRequest) -> Result<Vec<Book>, ListBooksError> {
        let (sql, pattern) = match req {
            ListBooksRequest::Search(term) => (
                format!(r"{SELECT_BOOKS} WHERE b.title LIKE ? ESCAPE '\' ORDER BY b.title, b.id"),
                Some(like_pattern(term)),
            ),
            ListBooksRequest::Sort(SortBy::Title) => {
                (format!("{SELECT_BOOKS} ORDER BY b.title, b.id"), None)
            }
            ListBooksRequest::Sort(SortBy::Author) => (
                format!("{SELECT_BOOKS_WITH_AUTHOR} ORDER BY a.name, b.id"),
                None,
            ),
            ListBooksRequest::Sort(SortBy::PublicationYear) => (
                format!("{SELECT_BOOKS} ORDER BY b.publication_year, b.id"),
                None,
            ),
            ListBooksRequest::Sort(SortBy::Unsorted) => (SELECT_BOOKS.to_string(), None),
        };

        let mut query = sqlx::query_as(&sql);
        if let Some(pattern) = pattern {
            query = query.bind(pattern);
        }

        let books = query.fetch_all(&self.pool).await.map_err(|err| {
            let err = anyhow!(err).context("Failed to retrieve books");
            ListBooksError(err)
        })?;

        Ok(books)
    }

    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let context = || format!(r#"Failed to create book with ISBN "{}""#, req.isbn());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| CreateBookError::Other(anyhow!(err).context(context())))?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM book WHERE isbn = ?")
            .bind(req.isbn().to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|err| CreateBookError::Other(anyhow!(err).context(context())))?;
        if existing.is_some() {
            return Err(CreateBookError::Duplicate {
                isbn: req.isbn().to_string(),
            });
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO book (author_id, title, publication_year, isbn) VALUES (?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(req.author_id())
        .bind(req.title().to_string())
        .bind(req.publication_year().map(|year| year.value()))
        .bind(req.isbn().to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateBookError::Duplicate {
                    isbn: req.isbn().to_string(),
                }
            } else if is_foreign_key_violation(&err) {
                CreateBookError::UnknownAuthor {
                    id: req.author_id(),
                }
            } else {
                CreateBookError::Other(anyhow!(err).context(context()))
            }
        })?;

        let book = sqlx::query_as(&format!("{SELECT_BOOKS} WHERE b.id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| CreateBookError::Other(anyhow!(err).context(context())))?;

        tx.commit()
            .await
            .map_err(|err| CreateBookError::Other(anyhow!(err).context(context())))?;

        Ok(book)
    }

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        let context = || format!(r#"Failed to delete book with id "{}""#, req.id());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| DeleteBookError::Other(anyhow!(err).context(context())))?;

        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(req.id())
            .execute(&mut *tx)
            .await
            .map_err(|err| DeleteBookError::Other(anyhow!(err).context(context())))?;
        if result.rows_affected() == 0 {
            return Err(DeleteBookError::NotFound { id: req.id() });
        }

        tx.commit()
            .await
            .map_err(|err| DeleteBookError::Other(anyhow!(err).context(context())))?;

        Ok(())
    }
}

/// Escapes `LIKE` wildcards so the term matches as a plain substring.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_foreign_key_violation();
    }

    false
}
