//! Escalation fan-out: dial the hotline, notify every trusted contact.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use raksha_core::domain::EscalationMessage;
use raksha_core::ports::{Notifier, NotifyError};

/// Delivery outcome for one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDelivery {
    /// Contact store id.
    pub contact_id: String,
    /// Name shown in the "location sent to…" summary.
    pub display_name: String,
    /// Whether the message was handed to the transport.
    pub delivered: bool,
    /// Failure description when delivery failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one fan-out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// Whether the hotline dial intent was raised.
    pub dialed: bool,
    /// Text delivery is unsupported on this platform. When set, per-contact
    /// outcomes are suppressed in favor of this single aggregate notice.
    pub unsupported: bool,
    /// Per-contact outcomes (empty when `unsupported`).
    pub outcomes: Vec<ContactDelivery>,
}

impl DeliveryReport {
    /// Contacts successfully notified.
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }

    /// Contacts whose delivery failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.delivered).count()
    }
}

/// Dial-and-notify fan-out over the [`Notifier`] port.
#[derive(Clone)]
pub struct NotificationFanout {
    notifier: Arc<dyn Notifier>,
}

impl NotificationFanout {
    /// Create a fan-out over the given notifier.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Dial the hotline and deliver the message to every contact.
    ///
    /// The dial is attempted first and unconditionally — an empty contact
    /// list, send failures, or a missing text transport never block it.
    /// Per-contact sends run concurrently in isolated failure domains: one
    /// contact failing does not abort the rest.
    pub async fn notify(&self, message: &EscalationMessage) -> DeliveryReport {
        let dialed = match self.notifier.dial(&message.dial_target).await {
            Ok(()) => {
                info!(target_number = %message.dial_target, "Hotline dial raised");
                true
            }
            Err(e) => {
                error!(target_number = %message.dial_target, error = %e, "Hotline dial failed");
                false
            }
        };

        if message.contacts.is_empty() {
            return DeliveryReport {
                dialed,
                ..DeliveryReport::default()
            };
        }

        if !self.notifier.can_send_text() {
            warn!(
                contacts = message.contacts.len(),
                "Text delivery unsupported on this platform, skipping contact fan-out"
            );
            return DeliveryReport {
                dialed,
                unsupported: true,
                outcomes: Vec::new(),
            };
        }

        let sends = message.contacts.iter().map(|contact| {
            let notifier = Arc::clone(&self.notifier);
            let body = message.body.clone();
            async move {
                let result = notifier.send_text(&contact.phone_number, &body).await;
                match &result {
                    Ok(()) => {
                        info!(contact = %contact.display_name, "Emergency message delivered");
                    }
                    Err(e) => {
                        warn!(contact = %contact.display_name, error = %e, "Emergency message failed");
                    }
                }
                ContactDelivery {
                    contact_id: contact.id.clone(),
                    display_name: contact.display_name.clone(),
                    delivered: result.is_ok(),
                    error: result.err().map(|e: NotifyError| e.to_string()),
                }
            }
        });

        let outcomes = join_all(sends).await;
        DeliveryReport {
            dialed,
            unsupported: false,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::domain::{EscalationKind, Position, TrustedContact};
    use raksha_core::stubs::StubNotifier;

    fn contacts(n: usize) -> Vec<TrustedContact> {
        (0..n)
            .map(|i| {
                TrustedContact::new(
                    format!("c{i}"),
                    format!("Contact {i}"),
                    &format!("98765432{i:02}"),
                )
                .unwrap()
            })
            .collect()
    }

    fn message(contacts: Vec<TrustedContact>) -> EscalationMessage {
        let pos = Position::new(17.385, 78.4867, 1_000);
        EscalationMessage::compose(EscalationKind::Sos, Some(&pos), contacts, "100", 1_000)
    }

    #[tokio::test]
    async fn empty_contact_list_still_dials() {
        let notifier = Arc::new(StubNotifier::reliable());
        let fanout = NotificationFanout::new(Arc::clone(&notifier) as Arc<dyn Notifier>);

        let report = fanout.notify(&message(vec![])).await;

        assert!(report.dialed);
        assert_eq!(report.delivered_count(), 0);
        assert_eq!(notifier.dialed(), vec!["100".to_string()]);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn one_failing_contact_does_not_abort_the_rest() {
        // Contact #3 of 5 fails; the other four still go out, and we dial.
        let notifier = Arc::new(StubNotifier::failing_for(&["9876543202"]));
        let fanout = NotificationFanout::new(Arc::clone(&notifier) as Arc<dyn Notifier>);

        let report = fanout.notify(&message(contacts(5))).await;

        assert!(report.dialed);
        assert_eq!(report.delivered_count(), 4);
        assert_eq!(report.failed_count(), 1);
        let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.delivered).collect();
        assert_eq!(failed[0].contact_id, "c2");
        assert!(failed[0].error.as_deref().unwrap().contains("scripted failure"));
        assert_eq!(notifier.sent().len(), 4);
    }

    #[tokio::test]
    async fn unsupported_platform_reports_single_aggregate_notice() {
        let notifier = Arc::new(StubNotifier::unsupported());
        let fanout = NotificationFanout::new(Arc::clone(&notifier) as Arc<dyn Notifier>);

        let report = fanout.notify(&message(contacts(3))).await;

        assert!(report.dialed);
        assert!(report.unsupported);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn message_body_reaches_every_contact() {
        let notifier = Arc::new(StubNotifier::reliable());
        let fanout = NotificationFanout::new(Arc::clone(&notifier) as Arc<dyn Notifier>);

        let msg = message(contacts(2));
        fanout.notify(&msg).await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, body)| body == &msg.body));
    }
}
