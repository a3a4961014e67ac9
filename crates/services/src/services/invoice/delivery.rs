use db::{
    ConnectionTrait, DatabaseError,
    models::invoice::{CreateInvoice, Invoice, InvoiceError},
};
use thiserror::Error;
use uuid::Uuid;

use crate::services::{
    error_log::ErrorLogService,
    external::{ExternalServiceError, MailRelay, ObjectStore, OutboundEmail, PdfRenderer},
    invoice::composer::ComposedInvoice,
    quota::QuotaService,
};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    /// Render or store failed before the invoice record existed. The caller
    /// queues the task for a later retry.
    #[error(transparent)]
    External(#[from] ExternalServiceError),
}

#[derive(Debug)]
pub struct DeliveryOutcome {
    pub invoice: Invoice,
    pub emailed: bool,
}

/// Renders, stores and emails a composed invoice.
///
/// Failure handling is tiered: render and upload failures abort delivery (no
/// invoice record is written, the task can be retried cleanly); once the
/// record exists, email failures degrade the outcome to `emailed: false`
/// instead of failing the whole operation.
pub struct InvoiceDelivery;

impl InvoiceDelivery {
    pub async fn deliver<C: ConnectionTrait>(
        db: &C,
        renderer: &dyn PdfRenderer,
        store: &dyn ObjectStore,
        mailer: &dyn MailRelay,
        error_log: &ErrorLogService,
        invoice_uuid: Uuid,
        task_id: Uuid,
        task_time_taken_seconds: i64,
        composed: &ComposedInvoice,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let pdf = renderer.render(&composed.html).await?;

        let object_name = format!("{}.pdf", invoice_uuid);
        let stored_url = store
            .upload(&object_name, &pdf, "application/pdf")
            .await?;

        let invoice = Invoice::create(
            db,
            &CreateInvoice {
                task_id,
                time_taken_seconds: task_time_taken_seconds,
                hourly_rate: composed.params.hourly_rate,
                total_cost: composed.total_cost,
                template_type: composed.template_type.clone(),
                url: stored_url.clone(),
            },
            invoice_uuid,
        )
        .await?;

        // A fresh authorized link is nicer for the recipient, but the stored
        // URL is a workable fallback when re-authorization fails.
        let attachment_url = match store.fresh_download_url(&object_name).await {
            Ok(url) => url,
            Err(err) => {
                error_log.log(
                    "InvoiceDelivery",
                    format!("Download URL refresh failed: {}", err),
                );
                stored_url
            }
        };

        let emailed = Self::email_both_parties(db, mailer, error_log, composed, &attachment_url)
            .await?;
        if emailed {
            Invoice::mark_emailed(db, invoice.id).await?;
            QuotaService::consume_email(db).await?;
        }

        let invoice = Invoice::find_by_id(db, invoice.id)
            .await?
            .ok_or(InvoiceError::NotFound)?;
        Ok(DeliveryOutcome { invoice, emailed })
    }

    async fn email_both_parties<C: ConnectionTrait>(
        db: &C,
        mailer: &dyn MailRelay,
        error_log: &ErrorLogService,
        composed: &ComposedInvoice,
        attachment_url: &str,
    ) -> Result<bool, DeliveryError> {
        if !QuotaService::email_allowed(db).await? {
            error_log.log("InvoiceDelivery", "Email quota exceeded for free tier");
            return Ok(false);
        }

        let params = &composed.params;
        let subject = format!("Invoice for {} - TaskBill", params.task_name);
        let due = params.due_date.as_deref().unwrap_or("on receipt");

        let client_email = OutboundEmail {
            to: params.client_email.clone(),
            subject: subject.clone(),
            body: format!(
                "Dear {},\n\nPlease find attached the invoice for \"{}\" under your \
project \"{}\".\n\nTotal amount: ${:.2}\nDue date: {}\n\nThank you for your \
business.\n\nWarm regards,\nTaskBill",
                params.client_name, params.task_name, params.project_name,
                composed.total_cost, due,
            ),
            attachment_url: attachment_url.to_string(),
        };
        let freelancer_email = OutboundEmail {
            to: params.freelancer_email.clone(),
            subject,
            body: format!(
                "Hi,\n\nYour copy of the invoice for \"{}\" under project \"{}\" is \
attached.\n\nTotal amount: ${:.2}\nDue date: {}\n\nWarm regards,\nTaskBill",
                params.task_name, params.project_name, composed.total_cost, due,
            ),
            attachment_url: attachment_url.to_string(),
        };

        for email in [&client_email, &freelancer_email] {
            if let Err(err) = mailer.send(email).await {
                error_log.log(
                    "InvoiceDelivery",
                    format!("Email sending failed ({}): {}", email.to, err),
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
