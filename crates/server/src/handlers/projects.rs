//! Project pages.

use super::common::{TenantDb, required, to_project};
use super::html::{button_form, date_value, escape, page, push_row};
use crate::error::{ApiError, ApiResult};
use axum::Form;
use axum::extract::Path;
use axum::response::{Html, Redirect};
use invoicer_core::format_currency;
use invoicer_database::models::{DeliverableRow, InvoiceDetail, NewBillTo};
use invoicer_database::repos::{DeliverableRepo, InvoiceRepo, ProjectRepo};
use serde::Deserialize;
use std::fmt::Write;

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
}

/// GET / - list projects.
pub async fn index(mut db: TenantDb) -> ApiResult<Html<String>> {
    let projects = db.list_projects().await?;

    let mut body = String::from("<h1>Projects</h1>\n<ul>\n");
    for project in &projects {
        let _ = writeln!(
            body,
            "<li><a href=\"/projects/{}\">{}</a></li>",
            project.id,
            escape(&project.name)
        );
    }
    body.push_str("</ul>\n<p><a href=\"/projects\">New project</a></p>");
    Ok(page("Projects", &body))
}

/// GET /projects - new project form.
pub async fn new_project() -> Html<String> {
    page(
        "New project",
        "<h1>New project</h1>\n\
         <form action=\"/projects\" method=\"post\">\n\
         <label>Name <input type=\"text\" name=\"name\" required></label>\n\
         <button type=\"submit\">Create</button>\n</form>",
    )
}

/// POST /projects - create a project.
pub async fn create_project(mut db: TenantDb, Form(form): Form<ProjectForm>) -> ApiResult<Redirect> {
    let name = required("name", &form.name)?;
    let project = db.create_project(name).await?;
    tracing::info!(project_id = project.id, "Created project");
    Ok(Redirect::to("/"))
}

/// POST /projects/{id}/delete
pub async fn delete_project(mut db: TenantDb, Path(project_id): Path<i64>) -> ApiResult<Redirect> {
    db.delete_project(project_id).await?;
    tracing::info!(project_id, "Deleted project");
    Ok(Redirect::to("/"))
}

/// POST /project/{project_id}/contact - create or update the bill-to contact.
pub async fn update_contact(
    mut db: TenantDb,
    Path(project_id): Path<i64>,
    Form(form): Form<ContactForm>,
) -> ApiResult<Redirect> {
    let bill_to = NewBillTo {
        company_name: required("company_name", &form.company_name)?.to_string(),
        contact_name: required("contact_name", &form.contact_name)?.to_string(),
        contact_email: required("contact_email", &form.contact_email)?.to_string(),
    };
    db.upsert_bill_to(project_id, &bill_to).await?;
    Ok(to_project(project_id))
}

/// GET /projects/{id} - project detail.
pub async fn project_detail(mut db: TenantDb, Path(project_id): Path<i64>) -> ApiResult<Html<String>> {
    let project = db
        .get_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))?;
    let bill_to = db.get_bill_to(project_id).await?;
    let deliverables = db.list_deliverables(project_id).await?;
    let available = db.list_uninvoiced_deliverables(project_id).await?;
    let mut invoices = Vec::new();
    for invoice in db.list_invoices(project_id).await? {
        if let Some(detail) = db.invoice_detail(project_id, invoice.id).await? {
            invoices.push(detail);
        }
    }

    let base = format!("/project/{project_id}");
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape(&project.name));
    body.push_str(&button_form(
        &format!("/projects/{project_id}/delete"),
        "Delete project",
    ));

    body.push_str("\n<h2>Bill to</h2>\n");
    let (company, contact, email) = bill_to
        .as_ref()
        .map(|b| (b.company_name.as_str(), b.contact_name.as_str(), b.contact_email.as_str()))
        .unwrap_or_default();
    let _ = writeln!(
        body,
        "<form action=\"{base}/contact\" method=\"post\">\n\
         <label>Company <input type=\"text\" name=\"company_name\" value=\"{}\" required></label>\n\
         <label>Contact <input type=\"text\" name=\"contact_name\" value=\"{}\" required></label>\n\
         <label>Email <input type=\"email\" name=\"contact_email\" value=\"{}\" required></label>\n\
         <button type=\"submit\">Save</button>\n</form>",
        escape(company),
        escape(contact),
        escape(email)
    );

    body.push_str("<h2>Deliverables</h2>\n");
    render_deliverables(&mut body, project_id, &deliverables);
    let _ = writeln!(
        body,
        "<form action=\"{base}/deliverable\" method=\"post\">\n\
         <label>Name <input type=\"text\" name=\"name\" required></label>\n\
         <label>Estimate <input type=\"text\" name=\"estimate\" inputmode=\"decimal\"></label>\n\
         <label>Due <input type=\"date\" name=\"due_date\"></label>\n\
         <button type=\"submit\">Add deliverable</button>\n</form>"
    );

    body.push_str("<h2>Invoices</h2>\n");
    let _ = writeln!(
        body,
        "<form action=\"{base}/invoice\" method=\"post\">\n\
         <label>Number <input type=\"text\" name=\"name\" required></label>\n\
         <button type=\"submit\">New invoice</button>\n</form>"
    );
    for detail in &invoices {
        render_invoice_section(&mut body, project_id, detail, &available);
    }

    Ok(page(&project.name, &body))
}

fn render_deliverables(body: &mut String, project_id: i64, deliverables: &[DeliverableRow]) {
    body.push_str(
        "<table>\n<tr><th>Name</th><th>Estimate</th><th>Due</th><th>Status</th><th></th></tr>\n",
    );
    for d in deliverables {
        let status = match (d.invoiced, d.paid) {
            (_, true) => "paid",
            (true, false) => "invoiced",
            (false, false) => "open",
        };
        let estimate = d.estimate.map(format_currency).unwrap_or_default();
        let delete = if d.invoiced {
            String::new()
        } else {
            button_form(
                &format!("/project/{project_id}/deliverable/{}/delete", d.id),
                "Delete",
            )
        };
        push_row(
            body,
            &[
                &escape(&d.name),
                &estimate,
                &date_value(d.due_date),
                status,
                &delete,
            ],
        );
    }
    body.push_str("</table>\n");
}

fn render_invoice_section(
    body: &mut String,
    project_id: i64,
    detail: &InvoiceDetail,
    available: &[DeliverableRow],
) {
    let invoice = &detail.invoice;
    let base = format!("/project/{project_id}/invoice/{}", invoice.id);
    let totals = detail.totals();

    let _ = writeln!(
        body,
        "<section>\n<h3>{} <a href=\"{base}/render\">Print</a></h3>",
        escape(&invoice.name)
    );

    body.push_str("<table>\n");
    for item in &detail.line_items {
        push_row(
            body,
            &[
                &escape(&item.deliverable_name),
                &format_currency(item.amount),
                &button_form(&format!("{base}/line_items/{}", item.id), "Remove"),
            ],
        );
    }
    for credit in &detail.credits {
        push_row(
            body,
            &[
                &format!("Credit: {}", escape(&credit.reason)),
                &format_currency(-credit.amount),
                &button_form(&format!("{base}/credit/{}", credit.id), "Remove"),
            ],
        );
    }
    for reimbursement in &detail.reimbursements {
        push_row(
            body,
            &[
                &format!("Reimbursement: {}", escape(&reimbursement.reason)),
                &format_currency(reimbursement.amount),
                &button_form(
                    &format!("{base}/reimbursement/{}", reimbursement.id),
                    "Remove",
                ),
            ],
        );
    }
    push_row(body, &["<strong>Balance due</strong>", &format_currency(totals.balance_due), ""]);
    push_row(body, &["Gross pay", &format_currency(totals.gross_pay), ""]);
    push_row(body, &["Net pay", &format_currency(totals.net_pay), ""]);
    body.push_str("</table>\n");

    if !available.is_empty() {
        let _ = write!(
            body,
            "<form action=\"{base}/line_items\" method=\"post\">\n<select name=\"deliverable_id\">\n"
        );
        for d in available {
            let _ = writeln!(body, "<option value=\"{}\">{}</option>", d.id, escape(&d.name));
        }
        body.push_str("</select>\n<button type=\"submit\">Add line item</button>\n</form>\n");
    }

    for (path, label) in [("credit", "Add credit"), ("reimbursement", "Add reimbursement")] {
        let _ = writeln!(
            body,
            "<form action=\"{base}/{path}\" method=\"post\">\n\
             <input type=\"text\" name=\"reason\" placeholder=\"Reason\" required>\n\
             <input type=\"text\" name=\"amount\" inputmode=\"decimal\" required>\n\
             <button type=\"submit\">{label}</button>\n</form>"
        );
    }

    for (path, value) in [("sent", invoice.sent), ("paid", invoice.paid)] {
        let _ = writeln!(
            body,
            "<form action=\"{base}/{path}\" method=\"post\">\n\
             <label>{path} <input type=\"date\" name=\"{path}\" value=\"{}\"></label>\n\
             <button type=\"submit\">Save</button>\n</form>",
            date_value(value)
        );
    }
    body.push_str("</section>\n");
}
