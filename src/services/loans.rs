//! Loan workflow service: copies, borrowing, returns and renewals

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        book_instance::{
            BookInstanceView, BorrowRequest, CreateBookInstance, LoanStatus, RenewBookForm,
            RenewalProposal,
        },
        pagination::Page,
    },
    repository::Repository,
};

use super::today;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Default due date for a loan starting on `from`
    pub fn default_due_date(&self, from: NaiveDate) -> NaiveDate {
        from + Duration::weeks(self.config.loan_period_weeks)
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<BookInstanceView> {
        let instance = self.repository.book_instances.get_by_id(id).await?;
        Ok(BookInstanceView::new(instance, today()))
    }

    pub async fn create_instance(&self, data: CreateBookInstance) -> AppResult<BookInstanceView> {
        if !self.repository.books.exists(data.book_id).await? {
            return Err(AppError::field("book_id", format!("Book {} does not exist", data.book_id)));
        }
        if data.status == Some(LoanStatus::OnLoan) {
            return Err(AppError::field("status", "Use the borrow action to lend a copy"));
        }

        let instance = self.repository.book_instances.create(&data).await?;
        tracing::info!(instance_id = %instance.id, book_id = data.book_id, "Book instance created");
        Ok(BookInstanceView::new(instance, today()))
    }

    pub async fn delete_instance(&self, id: Uuid) -> AppResult<()> {
        self.repository.book_instances.delete(id).await
    }

    /// Move a copy between maintenance, available and reserved.
    /// Lending goes through `borrow`, returning through `mark_returned`.
    pub async fn change_status(&self, id: Uuid, next: LoanStatus) -> AppResult<BookInstanceView> {
        let current = self.repository.book_instances.get_by_id(id).await?;

        current.status.check_manual_change(next)?;

        if current.status != next
            && !self
                .repository
                .book_instances
                .update_status(id, current.status, next)
                .await?
        {
            return Err(AppError::Conflict(format!(
                "Book instance {} changed status concurrently",
                id
            )));
        }

        tracing::info!(instance_id = %id, from = %current.status, to = %next, "Book instance status changed");
        self.get_instance(id).await
    }

    /// Lend a copy to a user
    pub async fn borrow(&self, id: Uuid, request: BorrowRequest) -> AppResult<BookInstanceView> {
        let current = self.repository.book_instances.get_by_id(id).await?;
        current.status.check_transition(LoanStatus::OnLoan)?;
        if current.status == LoanStatus::OnLoan {
            return Err(AppError::BusinessRule(format!("Book instance {} is already on loan", id)));
        }

        self.repository
            .users
            .get_by_id(request.borrower_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::field(
                    "borrower_id",
                    format!("User {} does not exist", request.borrower_id),
                ),
                other => other,
            })?;

        let today = today();
        let due_back = request.due_back.unwrap_or_else(|| self.default_due_date(today));
        if due_back < today {
            return Err(AppError::field("due_back", "Due date is in the past"));
        }

        if !self
            .repository
            .book_instances
            .borrow(id, request.borrower_id, due_back)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Book instance {} changed status concurrently",
                id
            )));
        }

        tracing::info!(instance_id = %id, borrower_id = request.borrower_id, %due_back, "Book lent");
        self.get_instance(id).await
    }

    /// Put a copy on loan back on the shelf
    pub async fn mark_returned(&self, id: Uuid) -> AppResult<BookInstanceView> {
        let current = self.repository.book_instances.get_by_id(id).await?;
        if current.status != LoanStatus::OnLoan {
            return Err(AppError::BusinessRule(format!("Book instance {} is not on loan", id)));
        }

        if !self.repository.book_instances.mark_returned(id).await? {
            return Err(AppError::Conflict(format!(
                "Book instance {} changed status concurrently",
                id
            )));
        }

        tracing::info!(instance_id = %id, borrower_id = ?current.borrower_id, "Book returned");
        self.get_instance(id).await
    }

    /// Copies on loan to one user
    pub async fn loans_for_user(
        &self,
        user_id: i32,
        page: Page,
    ) -> AppResult<(Vec<BookInstanceView>, i64)> {
        self.on_loan(Some(user_id), page).await
    }

    /// Every copy on loan
    pub async fn all_loans(&self, page: Page) -> AppResult<(Vec<BookInstanceView>, i64)> {
        self.on_loan(None, page).await
    }

    async fn on_loan(
        &self,
        borrower_id: Option<i32>,
        page: Page,
    ) -> AppResult<(Vec<BookInstanceView>, i64)> {
        let (rows, total) = self
            .repository
            .book_instances
            .list_on_loan(borrower_id, page)
            .await?;
        let today = today();
        Ok((
            rows.into_iter()
                .map(|i| BookInstanceView::new(i, today))
                .collect(),
            total,
        ))
    }

    /// Initial renewal form: proposes the default loan period from today
    pub async fn renewal_proposal(&self, id: Uuid) -> AppResult<RenewalProposal> {
        let book_instance = self.get_instance(id).await?;
        Ok(RenewalProposal {
            book_instance,
            proposed_renewal_date: self.default_due_date(today()),
        })
    }

    /// Validate the renewal form and set the new due date
    pub async fn renew(&self, id: Uuid, form: RenewBookForm) -> AppResult<BookInstanceView> {
        // 404 takes precedence over form errors
        self.repository.book_instances.get_by_id(id).await?;

        let renewal_date = form.clean(today(), self.config.max_renewal_weeks)?;
        self.repository
            .book_instances
            .set_due_back(id, renewal_date)
            .await?;

        tracing::info!(instance_id = %id, %renewal_date, "Loan renewed");
        self.get_instance(id).await
    }
}
