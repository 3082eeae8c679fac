//! Invoice handlers: entries, status dates and the printable document.

use super::common::{TenantDb, optional_date, required, to_project};
use super::html::{escape, long_date, page, push_row};
use crate::error::{ApiError, ApiResult};
use axum::Form;
use axum::extract::Path;
use axum::response::{Html, Redirect};
use invoicer_core::{format_currency, parse_amount};
use invoicer_database::models::AdjustmentKind;
use invoicer_database::repos::{InvoiceRepo, ProjectRepo};
use serde::Deserialize;
use std::fmt::Write;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct InvoiceForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LineItemForm {
    pub deliverable_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentForm {
    pub reason: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct SentForm {
    #[serde(default)]
    pub sent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaidForm {
    #[serde(default)]
    pub paid: Option<String>,
}

/// Check that the invoice exists and belongs to the project.
async fn ensure_invoice(db: &mut TenantDb, project_id: i64, invoice_id: i64) -> ApiResult<()> {
    match db.get_invoice(project_id, invoice_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("invoice {invoice_id}"))),
    }
}

/// POST /project/{project_id}/invoice
pub async fn create_invoice(
    mut db: TenantDb,
    Path(project_id): Path<i64>,
    Form(form): Form<InvoiceForm>,
) -> ApiResult<Redirect> {
    if db.get_project(project_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("project {project_id}")));
    }
    let invoice = db
        .create_invoice(project_id, required("name", &form.name)?)
        .await?;
    tracing::info!(project_id, invoice_id = invoice.id, "Created invoice");
    Ok(to_project(project_id))
}

/// POST /project/{project_id}/invoice/{invoice_id}/line_items
pub async fn add_line_item(
    mut db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
    Form(form): Form<LineItemForm>,
) -> ApiResult<Redirect> {
    db.add_line_item(project_id, invoice_id, form.deliverable_id)
        .await?;
    Ok(to_project(project_id))
}

/// POST /project/{project_id}/invoice/{invoice_id}/line_items/{line_item_id}
pub async fn remove_line_item(
    mut db: TenantDb,
    Path((project_id, invoice_id, line_item_id)): Path<(i64, i64, i64)>,
) -> ApiResult<Redirect> {
    ensure_invoice(&mut db, project_id, invoice_id).await?;
    db.remove_line_item(invoice_id, line_item_id).await?;
    Ok(to_project(project_id))
}

async fn add_adjustment(
    mut db: TenantDb,
    project_id: i64,
    invoice_id: i64,
    kind: AdjustmentKind,
    form: AdjustmentForm,
) -> ApiResult<Redirect> {
    ensure_invoice(&mut db, project_id, invoice_id).await?;
    let reason = required("reason", &form.reason)?;
    let amount = parse_amount(&form.amount)?;
    db.add_adjustment(invoice_id, kind, reason, amount).await?;
    Ok(to_project(project_id))
}

async fn remove_adjustment(
    mut db: TenantDb,
    project_id: i64,
    invoice_id: i64,
    kind: AdjustmentKind,
    adjustment_id: i64,
) -> ApiResult<Redirect> {
    ensure_invoice(&mut db, project_id, invoice_id).await?;
    db.remove_adjustment(invoice_id, kind, adjustment_id).await?;
    Ok(to_project(project_id))
}

/// POST /project/{project_id}/invoice/{invoice_id}/credit
pub async fn add_credit(
    db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
    Form(form): Form<AdjustmentForm>,
) -> ApiResult<Redirect> {
    add_adjustment(db, project_id, invoice_id, AdjustmentKind::Credit, form).await
}

/// POST /project/{project_id}/invoice/{invoice_id}/credit/{credit_id}
pub async fn remove_credit(
    db: TenantDb,
    Path((project_id, invoice_id, credit_id)): Path<(i64, i64, i64)>,
) -> ApiResult<Redirect> {
    remove_adjustment(db, project_id, invoice_id, AdjustmentKind::Credit, credit_id).await
}

/// POST /project/{project_id}/invoice/{invoice_id}/reimbursement
pub async fn add_reimbursement(
    db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
    Form(form): Form<AdjustmentForm>,
) -> ApiResult<Redirect> {
    add_adjustment(db, project_id, invoice_id, AdjustmentKind::Reimbursement, form).await
}

/// POST /project/{project_id}/invoice/{invoice_id}/reimbursement/{reimbursement_id}
pub async fn remove_reimbursement(
    db: TenantDb,
    Path((project_id, invoice_id, reimbursement_id)): Path<(i64, i64, i64)>,
) -> ApiResult<Redirect> {
    remove_adjustment(
        db,
        project_id,
        invoice_id,
        AdjustmentKind::Reimbursement,
        reimbursement_id,
    )
    .await
}

/// POST /project/{project_id}/invoice/{invoice_id}/sent - set or clear the sent date.
pub async fn mark_sent(
    mut db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
    Form(form): Form<SentForm>,
) -> ApiResult<Redirect> {
    ensure_invoice(&mut db, project_id, invoice_id).await?;
    let sent = optional_date("sent", form.sent.as_deref())?;
    db.set_sent(invoice_id, sent).await?;
    Ok(to_project(project_id))
}

/// POST /project/{project_id}/invoice/{invoice_id}/paid - set or clear the paid date.
pub async fn mark_paid(
    mut db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
    Form(form): Form<PaidForm>,
) -> ApiResult<Redirect> {
    ensure_invoice(&mut db, project_id, invoice_id).await?;
    let paid = optional_date("paid", form.paid.as_deref())?;
    db.set_paid(invoice_id, paid).await?;
    Ok(to_project(project_id))
}

/// GET /project/{project_id}/invoice/{invoice_id}/render - printable invoice.
pub async fn render_invoice(
    mut db: TenantDb,
    Path((project_id, invoice_id)): Path<(i64, i64)>,
) -> ApiResult<Html<String>> {
    if db.get_project(project_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("project {project_id}")));
    }
    let detail = db
        .invoice_detail(project_id, invoice_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("invoice {invoice_id}")))?;
    let bill_to = db.get_bill_to(project_id).await?;
    let totals = detail.totals();

    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1>Invoice {}</h1>\n<p>Date: {}</p>",
        escape(&detail.invoice.name),
        long_date(OffsetDateTime::now_utc().date())
    );
    if let Some(bill_to) = &bill_to {
        let _ = writeln!(
            body,
            "<address>{}<br>{}<br>{}</address>",
            escape(&bill_to.company_name),
            escape(&bill_to.contact_name),
            escape(&bill_to.contact_email)
        );
    }

    body.push_str("<table>\n<tr><th>Deliverable</th><th>Amount</th></tr>\n");
    for item in &detail.line_items {
        push_row(&mut body, &[&escape(&item.deliverable_name), &format_currency(item.amount)]);
    }
    for credit in &detail.credits {
        push_row(&mut body, &[&escape(&credit.reason), &format_currency(-credit.amount)]);
    }
    body.push_str("</table>\n");

    if !detail.reimbursements.is_empty() {
        body.push_str("<h2>Reimbursements</h2>\n<table>\n");
        for reimbursement in &detail.reimbursements {
            push_row(
                &mut body,
                &[&escape(&reimbursement.reason), &format_currency(reimbursement.amount)],
            );
        }
        body.push_str("</table>\n");
    }

    let _ = writeln!(
        body,
        "<dl>\n<dt>Net pay</dt><dd>{}</dd>\n<dt>Reimbursements</dt><dd>{}</dd>\n\
         <dt>Balance due</dt><dd>{}</dd>\n</dl>",
        format_currency(totals.net_pay),
        format_currency(totals.reimbursements_total),
        format_currency(totals.balance_due)
    );

    Ok(page(&format!("Invoice {}", detail.invoice.name), &body))
}
