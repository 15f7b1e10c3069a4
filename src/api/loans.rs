//! Loan endpoints
//!
//! Every loan route acts on behalf of the authenticated member. Business
//! refusals (no copy left, renewal limit, overdue loan...) are answered with
//! `409 Conflict` and a refusal-specific error code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails},
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: i32,
}

/// Loan after a state change
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub loan: Loan,
    /// Status message
    pub message: String,
}

/// Loans of the current member, newest first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open and closed loans with status flags", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans_for_member(claims.user_id).await?;
    Ok(Json(loans))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Duplicate open loan or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .loans
        .create_loan(claims.user_id, request.book_id)
        .await?
        .into_result()?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            message: format!("Loan created, due {}", loan.due_date.format("%Y-%m-%d")),
            loan,
        }),
    ))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 403, description = "Loan belongs to another member"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Renewal refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    claims.require_owner(loan.user_id)?;

    let loan = state.services.loans.renew_loan(&loan).await?.into_result()?;

    Ok(Json(LoanResponse {
        message: format!("Loan renewed, due {}", loan.due_date.format("%Y-%m-%d")),
        loan,
    }))
}

/// Return a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan returned", body = LoanResponse),
        (status = 403, description = "Loan belongs to another member"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    claims.require_owner(loan.user_id)?;

    let loan = state.services.loans.return_loan(&loan).await?.into_result()?;

    Ok(Json(LoanResponse {
        loan,
        message: "Book returned".to_string(),
    }))
}

/// Delete a closed loan from the member's history
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 403, description = "Loan belongs to another member"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan still open", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<StatusCode> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    claims.require_owner(loan.user_id)?;

    state.services.loans.delete_loan(&loan).await?.into_result()?;

    Ok(StatusCode::NO_CONTENT)
}
