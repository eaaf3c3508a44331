//! SMTP delivery of transactional order emails.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates; every
//! message goes out as multipart/alternative with a plain-text fallback.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Order, PlacedOrder};

/// One order line as rendered into an email body.
struct ItemView {
    name: String,
    quantity: i32,
    total: String,
}

/// HTML template for the customer order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order_number: &'a str,
    items: &'a [ItemView],
    subtotal: String,
    tax: String,
    shipping: String,
    total: String,
}

/// Plain text template for the customer order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order_number: &'a str,
    items: &'a [ItemView],
    subtotal: String,
    tax: String,
    shipping: String,
    total: String,
}

/// HTML template for a status update email.
#[derive(Template)]
#[template(path = "email/order_status_update.html")]
struct StatusUpdateHtml<'a> {
    order_number: &'a str,
    status: &'a str,
    notes: Option<&'a str>,
    tracking_number: Option<&'a str>,
}

/// Plain text template for a status update email.
#[derive(Template)]
#[template(path = "email/order_status_update.txt")]
struct StatusUpdateText<'a> {
    order_number: &'a str,
    status: &'a str,
    notes: Option<&'a str>,
    tracking_number: Option<&'a str>,
}

/// HTML template for the new-order alert sent to the admin inbox.
#[derive(Template)]
#[template(path = "email/admin_order_alert.html")]
struct AdminOrderAlertHtml<'a> {
    order_number: &'a str,
    customer_name: &'a str,
    total: String,
}

/// Plain text template for the new-order alert.
#[derive(Template)]
#[template(path = "email/admin_order_alert.txt")]
struct AdminOrderAlertText<'a> {
    order_number: &'a str,
    customer_name: &'a str,
    total: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// Delivery seam for order emails. The production implementation is
/// [`SmtpMailer`]; tests substitute a recording stub.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Confirmation email to the customer after placement.
    async fn send_order_confirmation(
        &self,
        to: &str,
        placed: &PlacedOrder,
    ) -> Result<(), EmailError>;

    /// Status change email to the customer.
    async fn send_status_update(
        &self,
        to: &str,
        order: &Order,
        notes: Option<&str>,
    ) -> Result<(), EmailError>;

    /// New-order alert to the store's admin inbox.
    async fn send_admin_order_alert(
        &self,
        to: &str,
        placed: &PlacedOrder,
        customer_name: &str,
    ) -> Result<(), EmailError>;
}

/// Mailer backed by an async SMTP transport.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be constructed.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_order_confirmation(
        &self,
        to: &str,
        placed: &PlacedOrder,
    ) -> Result<(), EmailError> {
        let items: Vec<ItemView> = placed
            .items
            .iter()
            .map(|item| ItemView {
                name: item.product_name.clone(),
                quantity: item.quantity,
                total: item.total_price.to_string(),
            })
            .collect();

        let order = &placed.order;
        let html = OrderConfirmationHtml {
            order_number: &order.order_number,
            items: &items,
            subtotal: order.subtotal.to_string(),
            tax: order.tax_amount.to_string(),
            shipping: order.shipping_amount.to_string(),
            total: order.total_amount.to_string(),
        }
        .render()?;
        let text = OrderConfirmationText {
            order_number: &order.order_number,
            items: &items,
            subtotal: order.subtotal.to_string(),
            tax: order.tax_amount.to_string(),
            shipping: order.shipping_amount.to_string(),
            total: order.total_amount.to_string(),
        }
        .render()?;

        let subject = format!("Order Confirmation - {}", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    async fn send_status_update(
        &self,
        to: &str,
        order: &Order,
        notes: Option<&str>,
    ) -> Result<(), EmailError> {
        let status = order.order_status.as_str();
        let html = StatusUpdateHtml {
            order_number: &order.order_number,
            status,
            notes,
            tracking_number: order.tracking_number.as_deref(),
        }
        .render()?;
        let text = StatusUpdateText {
            order_number: &order.order_number,
            status,
            notes,
            tracking_number: order.tracking_number.as_deref(),
        }
        .render()?;

        let subject = format!("Order Status Update - {}", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    async fn send_admin_order_alert(
        &self,
        to: &str,
        placed: &PlacedOrder,
        customer_name: &str,
    ) -> Result<(), EmailError> {
        let order = &placed.order;
        let html = AdminOrderAlertHtml {
            order_number: &order.order_number,
            customer_name,
            total: order.total_amount.to_string(),
        }
        .render()?;
        let text = AdminOrderAlertText {
            order_number: &order.order_number,
            customer_name,
            total: order.total_amount.to_string(),
        }
        .render()?;

        let subject = format!("New Order Received - {}", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }
}
