use chrono::NaiveDate;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(AuthorNameEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Author name cannot be empty")]
pub struct AuthorNameEmptyError;

/// Parses an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| DateError(trimmed.into()))
}

#[derive(Error, Debug)]
#[error("Invalid date format: {0} (expected YYYY-MM-DD)")]
pub struct DateError(String);

/// Birth date and optional death date of an author; the death date never
/// precedes the birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    birth_date: NaiveDate,
    death_date: Option<NaiveDate>,
}

impl Lifespan {
    pub fn new(
        birth_date: NaiveDate,
        death_date: Option<NaiveDate>,
    ) -> Result<Self, LifespanError> {
        match death_date {
            Some(death_date) if death_date < birth_date => Err(LifespanError {
                birth_date,
                death_date,
            }),
            _ => Ok(Self {
                birth_date,
                death_date,
            }),
        }
    }

    pub const fn new_unchecked(birth_date: NaiveDate, death_date: Option<NaiveDate>) -> Self {
        Self {
            birth_date,
            death_date,
        }
    }

    pub const fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub const fn death_date(&self) -> Option<NaiveDate> {
        self.death_date
    }
}

#[derive(Error, Debug)]
#[error("Death date {death_date} precedes birth date {birth_date}")]
pub struct LifespanError {
    birth_date: NaiveDate,
    death_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Author {
    id: i64,
    name: AuthorName,
    lifespan: Lifespan,
}

impl Author {
    pub const fn new(id: i64, name: AuthorName, lifespan: Lifespan) -> Self {
        Self { id, name, lifespan }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn birth_date(&self) -> NaiveDate {
        self.lifespan.birth_date()
    }

    pub const fn death_date(&self) -> Option<NaiveDate> {
        self.lifespan.death_date()
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.death_date() {
            Some(death_date) => write!(
                f,
                "{}. {} ({} - {})",
                self.id,
                self.name,
                self.birth_date(),
                death_date
            ),
            None => write!(f, "{}. {} ({})", self.id, self.name, self.birth_date()),
        }
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    lifespan: Lifespan,
}

impl CreateAuthorRequest {
    pub const fn new(name: AuthorName, lifespan: Lifespan) -> Self {
        Self { name, lifespan }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn birth_date(&self) -> NaiveDate {
        self.lifespan.birth_date()
    }

    pub const fn death_date(&self) -> Option<NaiveDate> {
        self.lifespan.death_date()
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllAuthorsError(#[from] pub anyhow::Error);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, BookTitleEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(BookTitleEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Book title cannot be empty")]
pub struct BookTitleEmptyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isbn(String);

impl Isbn {
    pub fn new(raw: &str) -> Result<Self, IsbnEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(IsbnEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("ISBN cannot be empty")]
pub struct IsbnEmptyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublicationYear(i32);

impl PublicationYear {
    /// Parses a bare year (`1999`) or the year prefix of a date (`1999-07-01`).
    /// An empty input means the year is unknown.
    pub fn parse(raw: &str) -> Result<Option<Self>, PublicationYearError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let year = match trimmed.split_once('-') {
            Some((year, _)) => year,
            None => trimmed,
        };
        year.parse::<i32>()
            .map(|year| Some(Self(year)))
            .map_err(|_| PublicationYearError(trimmed.into()))
    }

    pub const fn new_unchecked(year: i32) -> Self {
        Self(year)
    }

    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for PublicationYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
#[error("Invalid year format: {0}")]
pub struct PublicationYearError(String);

#[derive(Debug, Clone)]
pub struct Book {
    id: i64,
    author_id: Option<i64>,
    author_name: Option<AuthorName>,
    title: BookTitle,
    publication_year: Option<PublicationYear>,
    isbn: Isbn,
}

impl Book {
    pub const fn new(
        id: i64,
        author_id: Option<i64>,
        author_name: Option<AuthorName>,
        title: BookTitle,
        publication_year: Option<PublicationYear>,
        isbn: Isbn,
    ) -> Self {
        Self {
            id,
            author_id,
            author_name,
            title,
            publication_year,
            isbn,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn author_id(&self) -> Option<i64> {
        self.author_id
    }

    /// Name of the owning author; `None` for a book without one.
    pub const fn author_name(&self) -> Option<&AuthorName> {
        self.author_name.as_ref()
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn publication_year(&self) -> Option<PublicationYear> {
        self.publication_year
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.publication_year {
            Some(year) => write!(f, "{}. {} ({})", self.id, self.title, year),
            None => write!(f, "{}. {}", self.id, self.title),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Title,
    Author,
    PublicationYear,
    Unsorted,
}

impl SortBy {
    /// Unrecognised or missing keys fall back to [`SortBy::Unsorted`].
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("title") => Self::Title,
            Some("author") => Self::Author,
            Some("publication_year") => Self::PublicationYear,
            _ => Self::Unsorted,
        }
    }

    pub const fn key(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::PublicationYear => "publication_year",
            Self::Unsorted => "no_sort",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListBooksRequest {
    Search(String),
    Sort(SortBy),
}

impl ListBooksRequest {
    /// A non-empty search term takes precedence over the sort key. The term is
    /// matched verbatim, so whitespace is significant.
    pub fn new(search: Option<&str>, sort_by: Option<&str>) -> Self {
        match search {
            Some(term) if !term.is_empty() => Self::Search(term.into()),
            _ => Self::Sort(SortBy::from_key(sort_by)),
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        match self {
            Self::Search(term) => Some(term),
            Self::Sort(_) => None,
        }
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListBooksError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct CreateBookRequest {
    title: BookTitle,
    author_id: i64,
    publication_year: Option<PublicationYear>,
    isbn: Isbn,
}

impl CreateBookRequest {
    pub const fn new(
        title: BookTitle,
        author_id: i64,
        publication_year: Option<PublicationYear>,
        isbn: Isbn,
    ) -> Self {
        Self {
            title,
            author_id,
            publication_year,
            isbn,
        }
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }

    pub const fn publication_year(&self) -> Option<PublicationYear> {
        self.publication_year
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("A book with ISBN {isbn} already exists.")]
    Duplicate { isbn: String },
    #[error("Author with id \"{id}\" does not exist")]
    UnknownAuthor { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct DeleteBookRequest {
    id: i64,
}

impl DeleteBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book not found")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publication_year_accepts_bare_year() {
        let year = PublicationYear::parse("1999").unwrap();
        assert_eq!(year, Some(PublicationYear::new_unchecked(1999)));
    }

    #[test]
    fn publication_year_takes_prefix_of_date() {
        let year = PublicationYear::parse("1999-07-01").unwrap();
        assert_eq!(year.map(|y| y.value()), Some(1999));
    }

    #[test]
    fn publication_year_empty_is_unknown() {
        assert_eq!(PublicationYear::parse("  ").unwrap(), None);
    }

    #[test]
    fn publication_year_rejects_garbage() {
        let err = PublicationYear::parse("abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid year format: abc");
        assert!(PublicationYear::parse("-1999").is_err());
    }

    #[test]
    fn author_name_is_trimmed_and_required() {
        assert_eq!(AuthorName::new("  Ursula  ").unwrap().to_string(), "Ursula");
        assert!(AuthorName::new("   ").is_err());
    }

    #[test]
    fn isbn_and_title_are_required() {
        assert!(Isbn::new("").is_err());
        assert!(BookTitle::new(" ").is_err());
        assert_eq!(Isbn::new(" 978-0 ").unwrap().to_string(), "978-0");
    }

    #[test]
    fn parse_date_rejects_non_iso_input() {
        assert!(parse_date("1990-05-01").is_ok());
        assert!(parse_date("01/05/1990").is_err());
        assert!(parse_date("1990-13-01").is_err());
    }

    #[test]
    fn lifespan_rejects_death_before_birth() {
        let birth = parse_date("1990-05-01").unwrap();
        let death = parse_date("1980-01-01").unwrap();
        assert!(Lifespan::new(birth, Some(death)).is_err());
        assert!(Lifespan::new(birth, Some(birth)).is_ok());
        assert!(Lifespan::new(birth, None).is_ok());
    }

    #[test]
    fn list_request_prefers_search_over_sort() {
        let req = ListBooksRequest::new(Some("Dune"), Some("author"));
        assert_eq!(req, ListBooksRequest::Search("Dune".into()));

        let req = ListBooksRequest::new(Some(""), Some("author"));
        assert_eq!(req, ListBooksRequest::Sort(SortBy::Author));

        let req = ListBooksRequest::new(None, Some("bogus"));
        assert_eq!(req, ListBooksRequest::Sort(SortBy::Unsorted));
    }

    #[test]
    fn list_request_keeps_whitespace_in_search() {
        let req = ListBooksRequest::new(Some(" "), Some("title"));
        assert_eq!(req, ListBooksRequest::Search(" ".into()));
    }

    #[test]
    fn book_display_includes_year_when_known() {
        let book = Book::new(
            4,
            Some(1),
            None,
            BookTitle::new_unchecked("Dune"),
            Some(PublicationYear::new_unchecked(1965)),
            Isbn::new_unchecked("1"),
        );
        assert_eq!(book.to_string(), "4. Dune (1965)");

        let title = BookTitle::new_unchecked("Untitled");
        let book = Book::new(5, None, None, title, None, Isbn::new_unchecked("2"));
        assert_eq!(book.to_string(), "5. Untitled");
    }

    #[test]
    fn delete_not_found_message() {
        assert_eq!(DeleteBookError::NotFound { id: 9 }.to_string(), "Book not found");
    }

    #[test]
    fn author_display_includes_lifespan() {
        let birth = parse_date("1929-10-21").unwrap();
        let death = parse_date("2018-01-22").unwrap();
        let name = AuthorName::new_unchecked("Ursula K. Le Guin");

        let author = Author::new(1, name.clone(), Lifespan::new_unchecked(birth, Some(death)));
        assert_eq!(
            author.to_string(),
            "1. Ursula K. Le Guin (1929-10-21 - 2018-01-22)"
        );

        let author = Author::new(2, name, Lifespan::new_unchecked(birth, None));
        assert_eq!(author.to_string(), "2. Ursula K. Le Guin (1929-10-21)");
    }
}
