use crate::models::{Author, Book, ListBooksRequest, SortBy};
use maud::{DOCTYPE, Markup, html};

const SORT_KEYS: [(SortBy, &str); 4] = [
    (SortBy::Unsorted, "None"),
    (SortBy::Title, "Title"),
    (SortBy::Author, "Author"),
    (SortBy::PublicationYear, "Publication year"),
];

fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " | Library" }
            }
            body {
                nav {
                    a href="/" { "Home" } " | "
                    a href="/add_author" { "Add author" } " | "
                    a href="/add_book" { "Add book" }
                }
                h1 { (title) }
                (content)
            }
        }
    }
}

fn flash(success: Option<&str>, error: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = success {
            p class="success" { (message) }
        }
        @if let Some(message) = error {
            p class="error" { (message) }
        }
    }
}

pub struct HomeView<'a> {
    pub books: &'a [Book],
    pub request: &'a ListBooksRequest,
    pub success: Option<&'a str>,
    pub error: Option<&'a str>,
}

pub fn home(view: &HomeView<'_>) -> Markup {
    let search = view.request.search_term();
    let content = html! {
        (flash(view.success, view.error))
        form method="get" action="/" {
            input type="search" name="search" placeholder="Search by title" value=[search];
            button type="submit" { "Search" }
        }
        p {
            "Sort by: "
            @for (sort_by, label) in SORT_KEYS {
                a href={ "/?sort_by=" (sort_by.key()) } { (label) } " "
            }
        }
        @if view.books.is_empty() {
            p { "No books found." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Title" }
                        th { "Author" }
                        th { "Year" }
                        th { "ISBN" }
                        th {}
                    }
                }
                tbody {
                    @for book in view.books {
                        tr {
                            td { (book.title()) }
                            td {
                                @if let Some(name) = book.author_name() {
                                    (name)
                                } @else {
                                    "Unknown"
                                }
                            }
                            td {
                                @if let Some(year) = book.publication_year() {
                                    (year)
                                }
                            }
                            td { (book.isbn()) }
                            td {
                                form method="post" action={ "/book/" (book.id()) "/delete" } {
                                    button type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    layout("Books", content)
}

pub fn add_author(success: bool, error: Option<&str>) -> Markup {
    let success = success.then_some("Author added successfully.");
    let content = html! {
        (flash(success, error))
        form method="post" action="/add_author" {
            label { "Name " input type="text" name="name" required; }
            br;
            label { "Birth date " input type="date" name="birth_date" required; }
            br;
            label { "Death date " input type="date" name="death_date"; }
            br;
            button type="submit" { "Add author" }
        }
    };
    layout("Add author", content)
}

pub fn add_book(authors: &[Author], success: bool, error: Option<&str>) -> Markup {
    let success = success.then_some("Book added successfully.");
    let content = html! {
        (flash(success, error))
        form method="post" action="/add_book" {
            label { "Title " input type="text" name="title" required; }
            br;
            label {
                "Author "
                select name="author_id" required {
                    @for author in authors {
                        option value=(author.id()) { (author) }
                    }
                }
            }
            br;
            label { "Publication year " input type="text" name="publication_year"; }
            br;
            label { "ISBN " input type="text" name="isbn" required; }
            br;
            button type="submit" { "Add book" }
        }
    };
    layout("Add book", content)
}

pub fn error(message: &str) -> Markup {
    layout("Error", html! { p class="error" { (message) } })
}
