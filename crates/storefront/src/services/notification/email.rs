//! Confirmation email rendering and delivery.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Without an SMTP relay the message is built as usual and then logged.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Attachment, Mailbox, MultiPart, SinglePart,
        header::{ContentType, ContentTypeErr},
    },
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use drive_core::PaymentMethod;

use super::OrderConfirmation;
use crate::config::EmailConfig;

/// One item row in the email.
struct EmailLine {
    name: String,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

/// Discount row in the email.
struct EmailDiscount {
    code: String,
    percent: u8,
    amount: String,
}

/// HTML template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order_id: String,
    first_name: &'a str,
    items: &'a [EmailLine],
    subtotal: &'a str,
    discount: Option<&'a EmailDiscount>,
    total: &'a str,
    shipping: &'a [String],
    payment: &'a str,
}

/// Plain text template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order_id: String,
    first_name: &'a str,
    items: &'a [EmailLine],
    subtotal: &'a str,
    discount: Option<&'a EmailDiscount>,
    total: &'a str,
    shipping: &'a [String],
    payment: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid attachment content type.
    #[error("Invalid content type: {0}")]
    ContentType(#[from] ContentTypeErr),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Builds and sends transactional email.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidAddress` if the sender is malformed.
    /// Returns `EmailError::Smtp` if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(config.from.clone()))?;

        let transport = match &config.smtp {
            Some(smtp) => {
                let mut builder =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
                        .port(smtp.port);
                if let Some((username, password)) = smtp.credentials() {
                    builder = builder.credentials(Credentials::new(username, password));
                }
                Some(builder.build())
            }
            None => None,
        };

        Ok(Self { transport, from })
    }

    /// Build the confirmation message with the invoice attached.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render or the message is invalid.
    pub fn order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
        invoice_pdf: Vec<u8>,
    ) -> Result<Message, EmailError> {
        let items: Vec<EmailLine> = confirmation
            .lines
            .iter()
            .map(|l| EmailLine {
                name: l.product_name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price.display_czk(),
                line_total: l.line_total.display_czk(),
            })
            .collect();
        let discount = confirmation.discount.as_ref().map(|d| EmailDiscount {
            code: d.code.clone(),
            percent: d.percent,
            amount: d.amount.display_czk(),
        });
        let customer = &confirmation.customer;
        let shipping = vec![
            customer.full_name(),
            customer.address.clone(),
            format!("{} {}", customer.zip_code, customer.city),
        ];
        let subtotal = confirmation.subtotal.display_czk();
        let total = confirmation.total.display_czk();
        let payment = payment_label(customer.payment_method);

        let html = OrderConfirmationHtml {
            order_id: confirmation.order_id.to_string(),
            first_name: &customer.first_name,
            items: &items,
            subtotal: &subtotal,
            discount: discount.as_ref(),
            total: &total,
            shipping: &shipping,
            payment,
        }
        .render()?;
        let text = OrderConfirmationText {
            order_id: confirmation.order_id.to_string(),
            first_name: &customer.first_name,
            items: &items,
            subtotal: &subtotal,
            discount: discount.as_ref(),
            total: &total,
            shipping: &shipping,
            payment,
        }
        .render()?;

        let to = customer
            .email
            .as_str()
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(customer.email.to_string()))?;

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html),
            );
        let attachment = Attachment::new(confirmation.invoice_filename())
            .body(invoice_pdf, ContentType::parse("application/pdf")?);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Potvrzení objednávky #{}", confirmation.order_id))
            .multipart(MultiPart::mixed().multipart(body).singlepart(attachment))?;
        Ok(message)
    }

    /// Deliver a message, or log it when no relay is configured.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Smtp` if the relay rejects the message.
    pub async fn send(&self, message: Message) -> Result<(), EmailError> {
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();

        let Some(transport) = &self.transport else {
            tracing::info!(to = ?to, "SMTP not configured, email not sent");
            return Ok(());
        };

        transport.send(message).await?;
        tracing::info!(to = ?to, "Email sent successfully");
        Ok(())
    }
}

/// Czech label for a payment method.
pub(super) const fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "Platební karta",
        PaymentMethod::BankTransfer => "Bankovní převod",
        PaymentMethod::CashOnDelivery => "Dobírka",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::fixtures;

    fn mailer() -> Mailer {
        Mailer::new(&EmailConfig {
            from: "DRIVE Energy <noreply@drive-energy.cz>".into(),
            smtp: None,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let result = Mailer::new(&EmailConfig {
            from: "not an address".into(),
            smtp: None,
        });
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }

    #[test]
    fn test_confirmation_is_mixed_with_pdf_attachment() {
        let message = mailer()
            .order_confirmation(&fixtures::confirmation(), b"%PDF-1.3".to_vec())
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("invoice-42.pdf"));
        assert_eq!(
            message.envelope().to()[0].to_string(),
            "jana@example.cz"
        );
    }

    #[test]
    fn test_text_body_lists_items_and_totals() {
        let items = vec![EmailLine {
            name: "DRIVE Mango".into(),
            quantity: 2,
            unit_price: "599 Kč".into(),
            line_total: "1198 Kč".into(),
        }];
        let discount = EmailDiscount {
            code: "DRIVE10".into(),
            percent: 10,
            amount: "120 Kč".into(),
        };
        let shipping = vec!["Jana Nováková".to_string()];
        let text = OrderConfirmationText {
            order_id: "42".into(),
            first_name: "Jana",
            items: &items,
            subtotal: "1198 Kč",
            discount: Some(&discount),
            total: "1078 Kč",
            shipping: &shipping,
            payment: payment_label(PaymentMethod::Card),
        }
        .render()
        .unwrap();

        assert!(text.contains("#42"));
        assert!(text.contains("DRIVE Mango"));
        assert!(text.contains("DRIVE10"));
        assert!(text.contains("1078 Kč"));
        assert!(text.contains("Jana Nováková"));
    }

    #[test]
    fn test_html_body_escapes_customer_input() {
        let items = Vec::new();
        let shipping = vec!["<script>".to_string()];
        let html = OrderConfirmationHtml {
            order_id: "1".into(),
            first_name: "<b>",
            items: &items,
            subtotal: "0 Kč",
            discount: None,
            total: "0 Kč",
            shipping: &shipping,
            payment: payment_label(PaymentMethod::CashOnDelivery),
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("Dobírka"));
    }
}
