//! Order confirmation notifications.
//!
//! Checkout hands a committed order to [`Notifier::dispatch`], which renders
//! the email and PDF invoice on a detached task. Failures are logged and
//! never reach the customer's checkout response.

mod email;
mod invoice;

pub use email::{EmailError, Mailer};
pub use invoice::{InvoiceError, render_invoice};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span};

use drive_core::checkout::{CustomerDetails, OrderPlan, PlannedLine};
use drive_core::discount::AppliedDiscount;
use drive_core::{Cents, OrderId};

use crate::config::{EmailConfig, InvoiceSupplier};

/// Errors from a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("email: {0}")]
    Email(#[from] EmailError),
    #[error("invoice: {0}")]
    Invoice(#[from] InvoiceError),
}

/// Everything the confirmation email and invoice show.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub customer: CustomerDetails,
    pub lines: Vec<PlannedLine>,
    pub subtotal: Cents,
    pub discount: Option<AppliedDiscount>,
    pub total: Cents,
}

impl OrderConfirmation {
    /// Build from a committed order's plan.
    #[must_use]
    pub fn new(order_id: OrderId, customer: CustomerDetails, plan: OrderPlan) -> Self {
        Self {
            order_id,
            placed_at: Utc::now(),
            customer,
            lines: plan.lines,
            subtotal: plan.subtotal,
            discount: plan.discount,
            total: plan.total,
        }
    }

    /// Attachment name of the invoice PDF.
    #[must_use]
    pub fn invoice_filename(&self) -> String {
        format!("invoice-{}.pdf", self.order_id)
    }
}

struct NotifierInner {
    mailer: Mailer,
    supplier: InvoiceSupplier,
}

/// Fire-and-forget order confirmation sender.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    /// Build a notifier from email and invoice configuration.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the sender address or SMTP relay is invalid.
    pub fn new(email: &EmailConfig, supplier: InvoiceSupplier) -> Result<Self, EmailError> {
        Ok(Self {
            inner: Arc::new(NotifierInner {
                mailer: Mailer::new(email)?,
                supplier,
            }),
        })
    }

    /// Send the confirmation on a background task.
    ///
    /// The returned handle may be dropped; the task keeps running.
    pub fn dispatch(&self, confirmation: OrderConfirmation) -> JoinHandle<()> {
        let notifier = self.clone();
        let span = info_span!("order_confirmation", order_id = %confirmation.order_id);
        tokio::spawn(
            async move {
                if let Err(e) = notifier.deliver(&confirmation).await {
                    tracing::error!(error = %e, "Failed to send order confirmation");
                }
            }
            .instrument(span),
        )
    }

    /// Render the invoice and send the confirmation email.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if rendering or delivery fails.
    pub async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), NotificationError> {
        let pdf = render_invoice(confirmation, &self.inner.supplier)?;
        let message = self.inner.mailer.order_confirmation(confirmation, pdf)?;
        self.inner.mailer.send(message).await?;
        Ok(())
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_filename() {
        assert_eq!(fixtures::confirmation().invoice_filename(), "invoice-42.pdf");
    }

    #[tokio::test]
    async fn test_deliver_without_smtp_logs_mock_send() {
        let email = EmailConfig {
            from: "DRIVE Energy <noreply@drive-energy.cz>".into(),
            smtp: None,
        };
        let notifier = Notifier::new(&email, InvoiceSupplier::default()).unwrap();
        notifier.deliver(&fixtures::confirmation()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        // Nothing listens on port 1, so the send fails.
        let email = EmailConfig {
            from: "DRIVE Energy <noreply@drive-energy.cz>".into(),
            smtp: Some(crate::config::SmtpConfig {
                host: "localhost".into(),
                port: 1,
                username: None,
                password: None,
            }),
        };
        let notifier = Notifier::new(&email, InvoiceSupplier::default()).unwrap();
        assert!(notifier.deliver(&fixtures::confirmation()).await.is_err());
        notifier.dispatch(fixtures::confirmation()).await.unwrap();
    }
}
