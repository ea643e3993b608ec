//! Shared record fixtures for repository integration tests.

#![allow(dead_code)]

use recordkit_core::{ColumnDef, Record, RecordValidationError, RowDecodeError};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Parent fixture with one declared relation (`chapters`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub pages: i64,
    pub shelf: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn new(title: impl Into<String>, pages: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            pages,
            shelf: None,
            chapters: Vec::new(),
        }
    }
}

impl Record for Book {
    const TABLE: &'static str = "books";

    fn columns() -> &'static [ColumnDef] {
        &[
            ColumnDef {
                name: "id",
                decl: "TEXT PRIMARY KEY NOT NULL",
                primary_key: true,
            },
            ColumnDef {
                name: "title",
                decl: "TEXT NOT NULL",
                primary_key: false,
            },
            ColumnDef {
                name: "pages",
                decl: "INTEGER NOT NULL",
                primary_key: false,
            },
            ColumnDef {
                name: "shelf",
                decl: "TEXT",
                primary_key: false,
            },
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Text(self.id.clone())),
            ("title", Value::Text(self.title.clone())),
            ("pages", Value::Integer(self.pages)),
            ("shelf", self.shelf.clone().map_or(Value::Null, Value::Text)),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, RowDecodeError> {
        let pages: i64 = row.get("pages")?;
        if pages < 0 {
            return Err(RowDecodeError::Invalid(format!(
                "negative page count `{pages}` in books.pages"
            )));
        }
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            pages,
            shelf: row.get("shelf")?,
            chapters: Vec::new(),
        })
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        if self.title.trim().is_empty() {
            return Err(RecordValidationError {
                field: "title",
                message: "title cannot be empty".to_string(),
            });
        }
        if self.pages < 0 {
            return Err(RecordValidationError {
                field: "pages",
                message: format!("page count cannot be negative, got {}", self.pages),
            });
        }
        Ok(())
    }

    fn relation_names() -> &'static [&'static str] {
        &["chapters"]
    }

    fn load_relation(&mut self, conn: &Connection, relation: &str) -> Result<(), RowDecodeError> {
        match relation {
            "chapters" => {
                let mut stmt = conn.prepare(
                    "SELECT id, book_id, title, position
                     FROM chapters
                     WHERE book_id = ?1
                     ORDER BY position ASC;",
                )?;
                let mut rows = stmt.query([self.id.as_str()])?;
                let mut chapters = Vec::new();
                while let Some(row) = rows.next()? {
                    chapters.push(Chapter::from_row(row)?);
                }
                self.chapters = chapters;
                Ok(())
            }
            other => Err(RowDecodeError::Invalid(format!(
                "record type `books` declares no relation `{other}`"
            ))),
        }
    }
}

/// Child fixture keyed back to `Book` through `book_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub position: i64,
}

impl Chapter {
    pub fn new(book_id: impl Into<String>, title: impl Into<String>, position: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            book_id: book_id.into(),
            title: title.into(),
            position,
        }
    }
}

impl Record for Chapter {
    const TABLE: &'static str = "chapters";

    fn columns() -> &'static [ColumnDef] {
        &[
            ColumnDef {
                name: "id",
                decl: "TEXT PRIMARY KEY NOT NULL",
                primary_key: true,
            },
            ColumnDef {
                name: "book_id",
                decl: "TEXT NOT NULL",
                primary_key: false,
            },
            ColumnDef {
                name: "title",
                decl: "TEXT NOT NULL",
                primary_key: false,
            },
            ColumnDef {
                name: "position",
                decl: "INTEGER NOT NULL",
                primary_key: false,
            },
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Text(self.id.clone())),
            ("book_id", Value::Text(self.book_id.clone())),
            ("title", Value::Text(self.title.clone())),
            ("position", Value::Integer(self.position)),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, RowDecodeError> {
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            title: row.get("title")?,
            position: row.get("position")?,
        })
    }
}
