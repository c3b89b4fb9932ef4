//! Catalog service: books, authors, genres, languages

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{check_lifespan, Author, AuthorDetails, CreateAuthor, UpdateAuthor},
        book::{display_genre, BookDetails, BookShort, CreateBook, UpdateBook},
        book_instance::{BookInstanceView, LoanStatus},
        genre::{CreateGenre, Genre, GenreDetails},
        language::{CreateLanguage, Language, LanguageDetails},
        pagination::Page,
    },
    repository::Repository,
};

use super::today;

/// Figures shown on the catalog home page
#[derive(Debug, Clone)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // ---------------------------------------------------------------------
    // Home
    // ---------------------------------------------------------------------

    pub async fn counts(&self) -> AppResult<CatalogCounts> {
        Ok(CatalogCounts {
            num_books: self.repository.books.count().await?,
            num_instances: self.repository.book_instances.count().await?,
            num_instances_available: self
                .repository
                .book_instances
                .count_by_status(LoanStatus::Available)
                .await?,
            num_authors: self.repository.authors.count().await?,
        })
    }

    /// All copies, ordered by due date
    pub async fn all_instances(&self) -> AppResult<Vec<BookInstanceView>> {
        let today = today();
        Ok(self
            .repository
            .book_instances
            .list_all()
            .await?
            .into_iter()
            .map(|i| BookInstanceView::new(i, today))
            .collect())
    }

    // ---------------------------------------------------------------------
    // Books
    // ---------------------------------------------------------------------

    pub async fn list_books(&self, page: Page) -> AppResult<(Vec<BookShort>, i64)> {
        self.repository.books.list(page).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;

        let author = match book.author_id {
            Some(author_id) => self.repository.authors.find_by_id(author_id).await?,
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => self.repository.languages.find_by_id(language_id).await?,
            None => None,
        };
        let genres = self.repository.genres.for_book(book.id).await?;

        let today = today();
        let instances = self
            .repository
            .book_instances
            .for_book(book.id)
            .await?
            .into_iter()
            .map(|i| BookInstanceView::new(i, today))
            .collect();

        Ok(BookDetails {
            id: book.id,
            display_genre: display_genre(&genres),
            title: book.title,
            summary: book.summary,
            isbn: book.isbn,
            author,
            language,
            genres,
            instances,
        })
    }

    pub async fn create_book(&self, data: CreateBook) -> AppResult<BookDetails> {
        self.check_book_refs(data.author_id, data.language_id, Some(&data.genre_ids))
            .await?;

        let book = self.repository.books.create(&data).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "Book created");
        self.get_book(book.id).await
    }

    pub async fn update_book(&self, id: i32, data: UpdateBook) -> AppResult<BookDetails> {
        self.check_book_refs(
            data.author_id.flatten(),
            data.language_id.flatten(),
            data.genre_ids.as_deref(),
        )
        .await?;

        self.repository.books.update(id, &data).await?;
        self.get_book(id).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Referenced rows must exist; reported as form errors on the offending field
    async fn check_book_refs(
        &self,
        author_id: Option<i32>,
        language_id: Option<i32>,
        genre_ids: Option<&[i32]>,
    ) -> AppResult<()> {
        if let Some(author_id) = author_id {
            if self.repository.authors.find_by_id(author_id).await?.is_none() {
                return Err(AppError::field("author_id", format!("Author {} does not exist", author_id)));
            }
        }

        if let Some(language_id) = language_id {
            if self.repository.languages.find_by_id(language_id).await?.is_none() {
                return Err(AppError::field(
                    "language_id",
                    format!("Language {} does not exist", language_id),
                ));
            }
        }

        if let Some(genre_ids) = genre_ids {
            let mut unique = genre_ids.to_vec();
            unique.sort_unstable();
            unique.dedup();

            let found = self.repository.genres.count_existing(&unique).await?;
            if found != unique.len() as i64 {
                return Err(AppError::field("genre_ids", "Unknown genre selected"));
            }
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Authors
    // ---------------------------------------------------------------------

    pub async fn list_authors(&self, page: Page) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.list(page).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.by_author(id).await?;
        Ok(AuthorDetails {
            name: author.to_string(),
            author,
            books,
        })
    }

    pub async fn create_author(&self, data: CreateAuthor) -> AppResult<Author> {
        check_lifespan(data.date_of_birth, data.date_of_death)?;
        self.repository.authors.create(&data).await
    }

    pub async fn update_author(&self, id: i32, data: UpdateAuthor) -> AppResult<Author> {
        let current = self.repository.authors.get_by_id(id).await?;
        let (birth, death) = data.merged_lifespan(&current);
        check_lifespan(birth, death)?;
        self.repository.authors.update(id, &data).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }

    // ---------------------------------------------------------------------
    // Genres
    // ---------------------------------------------------------------------

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<GenreDetails> {
        let genre = self.repository.genres.get_by_id(id).await?;
        let books = self.repository.books.by_genre(id).await?;
        Ok(GenreDetails { genre, books })
    }

    pub async fn create_genre(&self, data: CreateGenre) -> AppResult<Genre> {
        self.repository.genres.create(&data).await
    }

    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await
    }

    // ---------------------------------------------------------------------
    // Languages
    // ---------------------------------------------------------------------

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn get_language(&self, id: i32) -> AppResult<LanguageDetails> {
        let language = self.repository.languages.get_by_id(id).await?;
        let books = self.repository.books.by_language(id).await?;
        Ok(LanguageDetails { language, books })
    }

    pub async fn create_language(&self, data: CreateLanguage) -> AppResult<Language> {
        self.repository.languages.create(&data).await
    }

    pub async fn delete_language(&self, id: i32) -> AppResult<()> {
        self.repository.languages.delete(id).await
    }
}
