use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use grobro_db::Database;
use grobro_types::api::SendMessageRequest;
use grobro_types::models::Message;

use crate::convert;
use crate::notify::Email;
use crate::policy::{self, MessageAttempt, PolicyViolation};

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Item does not exist.")]
    NotFound,

    #[error("Recipient does not exist.")]
    RecipientNotFound,

    #[error("Message content cannot be empty.")]
    EmptyContent,

    #[error(transparent)]
    Denied(#[from] PolicyViolation),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A persisted message and the email announcing it to the recipient.
#[derive(Debug)]
pub struct Delivery {
    pub message: Message,
    pub notification: Email,
}

/// Run the messaging policy for `caller` writing to `recipient` about `crop_id`
/// and persist the message when it passes. Nothing is written on rejection.
///
/// Blocking: call from `spawn_blocking`.
pub fn send(
    db: &Database,
    mail_from: &str,
    caller: Uuid,
    recipient: Uuid,
    crop_id: Uuid,
    req: &SendMessageRequest,
) -> Result<Delivery, MessagingError> {
    if req.content.trim().is_empty() {
        return Err(MessagingError::EmptyContent);
    }

    let crop = db
        .get_crop(&crop_id.to_string())?
        .ok_or(MessagingError::NotFound)?;
    let owner_id = convert::parse_id(&crop.owner_id)?;

    let attempt = MessageAttempt {
        caller,
        sender: req.from,
        recipient,
        claimed_seller: req.seller_id,
    };

    let prior_contact = if attempt.is_seller_outreach() {
        db.prior_contact_exists(
            &crop_id.to_string(),
            &recipient.to_string(),
            &req.seller_id.to_string(),
        )?
    } else {
        false
    };

    if let Err(violation) = policy::evaluate(&attempt, owner_id, prior_contact) {
        warn!(
            "Message from {} to {} on crop {} rejected: {:?}",
            req.from, recipient, crop_id, violation
        );
        return Err(violation.into());
    }

    let receiver = db
        .get_user_by_id(&recipient.to_string())?
        .ok_or(MessagingError::RecipientNotFound)?;

    let row = db.insert_message(
        &Uuid::new_v4().to_string(),
        &crop_id.to_string(),
        &req.from.to_string(),
        &recipient.to_string(),
        &req.seller_id.to_string(),
        &req.content,
    )?;
    let message = convert::message(row)?;

    info!("Message {} stored on crop {}", message.id, crop_id);

    let notification = Email {
        from: mail_from.to_string(),
        to: receiver.email,
        subject: format!(
            "Someone is interested in buying your {}!",
            crop.description.to_lowercase()
        ),
        text: req.content.clone(),
    };

    Ok(Delivery {
        message,
        notification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grobro_db::models::NewUser;

    const MAIL_FROM: &str = "GroBro <bot@grobro.test>";

    struct Market {
        db: Database,
        owner: Uuid,
        buyer: Uuid,
        bystander: Uuid,
        crop: Uuid,
    }

    fn seed_user(db: &Database, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(&NewUser {
            id: &id.to_string(),
            username,
            email: &format!("{username}@example.com"),
            password_hash: "hash",
            first_name: username,
            last_name: "Tester",
            city: None,
            state: None,
        })
        .unwrap();
        id
    }

    fn market() -> Market {
        let db = Database::open_in_memory().unwrap();
        let owner = seed_user(&db, "owner");
        let buyer = seed_user(&db, "buyer");
        let bystander = seed_user(&db, "bystander");
        let crop = Uuid::new_v4();
        db.insert_crop(&crop.to_string(), &owner.to_string(), "Apple Bananas", true, "available")
            .unwrap();
        Market {
            db,
            owner,
            buyer,
            bystander,
            crop,
        }
    }

    fn request(from: Uuid, seller_id: Uuid, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            from,
            seller_id,
            content: content.to_string(),
        }
    }

    fn message_count(m: &Market, user: Uuid) -> usize {
        m.db.get_messages_for_user(&user.to_string()).unwrap().len()
    }

    #[test]
    fn buyer_then_seller_conversation() {
        let m = market();

        let first = send(
            &m.db,
            MAIL_FROM,
            m.buyer,
            m.owner,
            m.crop,
            &request(m.buyer, m.owner, "Are these ripe?"),
        )
        .unwrap();
        assert_eq!(first.message.seller_id, m.owner);
        assert_eq!(first.message.from, m.buyer);
        assert_eq!(first.message.to, m.owner);
        assert_eq!(first.notification.to, "owner@example.com");
        assert_eq!(
            first.notification.subject,
            "Someone is interested in buying your apple bananas!"
        );
        assert_eq!(first.notification.text, "Are these ripe?");
        assert_eq!(first.notification.from, MAIL_FROM);

        let reply = send(
            &m.db,
            MAIL_FROM,
            m.owner,
            m.buyer,
            m.crop,
            &request(m.owner, m.owner, "Picked this morning."),
        )
        .unwrap();
        assert_eq!(reply.message.seller_id, m.owner);
        assert_eq!(reply.notification.to, "buyer@example.com");

        let err = send(
            &m.db,
            MAIL_FROM,
            m.owner,
            m.bystander,
            m.crop,
            &request(m.owner, m.owner, "Want some bananas?"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MessagingError::Denied(PolicyViolation::SellerCannotInitiate)
        ));

        assert_eq!(message_count(&m, m.owner), 2);
        assert_eq!(message_count(&m, m.bystander), 0);
    }

    #[test]
    fn missing_crop_is_always_not_found() {
        let m = market();
        let ghost = Uuid::new_v4();
        for _ in 0..3 {
            let err = send(
                &m.db,
                MAIL_FROM,
                m.buyer,
                m.owner,
                ghost,
                &request(m.buyer, m.owner, "hello?"),
            )
            .unwrap_err();
            assert!(matches!(err, MessagingError::NotFound));
        }
    }

    #[test]
    fn rejection_persists_nothing() {
        let m = market();
        let err = send(
            &m.db,
            MAIL_FROM,
            m.buyer,
            m.bystander,
            m.crop,
            &request(m.buyer, m.bystander, "I'm the seller now"),
        )
        .unwrap_err();
        assert!(matches!(err, MessagingError::Denied(PolicyViolation::OwnerMismatch)));
        assert_eq!(message_count(&m, m.buyer), 0);
    }

    #[test]
    fn impersonation_is_rejected() {
        let m = market();
        let err = send(
            &m.db,
            MAIL_FROM,
            m.bystander,
            m.owner,
            m.crop,
            &request(m.buyer, m.owner, "it's me, buyer"),
        )
        .unwrap_err();
        assert!(matches!(err, MessagingError::Denied(PolicyViolation::Impersonation)));
    }

    #[test]
    fn blank_content_is_rejected() {
        let m = market();
        let err = send(
            &m.db,
            MAIL_FROM,
            m.buyer,
            m.owner,
            m.crop,
            &request(m.buyer, m.owner, "   "),
        )
        .unwrap_err();
        assert!(matches!(err, MessagingError::EmptyContent));
    }
}
