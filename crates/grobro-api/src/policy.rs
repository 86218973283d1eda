//! Who may message whom about a crop.
//!
//! Only the crop's seller and an interested buyer may talk about it, and the
//! seller may only answer a buyer who wrote first. The rules are evaluated in
//! order and the first failing rule decides the outcome.

use thiserror::Error;
use uuid::Uuid;

/// The identities involved in one send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageAttempt {
    /// Authenticated user making the request.
    pub caller: Uuid,
    /// The `from` the request claims.
    pub sender: Uuid,
    pub recipient: Uuid,
    /// The `seller_id` the request claims, checked against the crop owner.
    pub claimed_seller: Uuid,
}

impl MessageAttempt {
    /// The seller writing to someone else. Only allowed as a reply, so the
    /// caller must look up whether the recipient wrote first.
    pub fn is_seller_outreach(&self) -> bool {
        self.claimed_seller == self.sender && self.claimed_seller != self.recipient
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Seller is not allowed to initiate contact.")]
    SellerCannotInitiate,

    #[error("You cannot be the recipient of your own message!")]
    SelfMessage,

    #[error("You cannot send a message as someone else!")]
    Impersonation,

    #[error("This crop does not belong to you nor the recipient!")]
    UnrelatedParty,

    #[error("There was an error matching the crop to its owner. Please try again.")]
    OwnerMismatch,
}

/// Decide whether `attempt` may create a message on a crop owned by `owner_id`.
///
/// `prior_contact` is whether the recipient has already written to the
/// claimed seller about this crop. It only matters for seller outreach.
pub fn evaluate(
    attempt: &MessageAttempt,
    owner_id: Uuid,
    prior_contact: bool,
) -> Result<(), PolicyViolation> {
    let MessageAttempt {
        caller,
        sender,
        recipient,
        claimed_seller,
    } = *attempt;

    if attempt.is_seller_outreach() && !prior_contact {
        return Err(PolicyViolation::SellerCannotInitiate);
    }
    if claimed_seller == sender && claimed_seller == recipient {
        return Err(PolicyViolation::SelfMessage);
    }
    if sender != caller {
        return Err(PolicyViolation::Impersonation);
    }
    if claimed_seller != sender && claimed_seller != recipient {
        return Err(PolicyViolation::UnrelatedParty);
    }
    if claimed_seller != owner_id {
        return Err(PolicyViolation::OwnerMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cast {
        owner: Uuid,
        buyer: Uuid,
        bystander: Uuid,
    }

    fn cast() -> Cast {
        Cast {
            owner: Uuid::new_v4(),
            buyer: Uuid::new_v4(),
            bystander: Uuid::new_v4(),
        }
    }

    fn attempt(caller: Uuid, sender: Uuid, recipient: Uuid, claimed_seller: Uuid) -> MessageAttempt {
        MessageAttempt {
            caller,
            sender,
            recipient,
            claimed_seller,
        }
    }

    #[test]
    fn buyer_first_contact_is_allowed() {
        let c = cast();
        let a = attempt(c.buyer, c.buyer, c.owner, c.owner);
        assert!(!a.is_seller_outreach());
        assert_eq!(evaluate(&a, c.owner, false), Ok(()));
    }

    #[test]
    fn seller_reply_depends_on_prior_contact() {
        let c = cast();
        let a = attempt(c.owner, c.owner, c.buyer, c.owner);
        assert!(a.is_seller_outreach());
        assert_eq!(evaluate(&a, c.owner, true), Ok(()));
        assert_eq!(
            evaluate(&a, c.owner, false),
            Err(PolicyViolation::SellerCannotInitiate)
        );
    }

    #[test]
    fn seller_cannot_reach_uninvolved_user() {
        let c = cast();
        let a = attempt(c.owner, c.owner, c.bystander, c.owner);
        assert_eq!(
            evaluate(&a, c.owner, false),
            Err(PolicyViolation::SellerCannotInitiate)
        );
    }

    #[test]
    fn messaging_yourself_is_rejected() {
        let c = cast();
        let a = attempt(c.owner, c.owner, c.owner, c.owner);
        assert_eq!(evaluate(&a, c.owner, false), Err(PolicyViolation::SelfMessage));
        assert_eq!(evaluate(&a, c.owner, true), Err(PolicyViolation::SelfMessage));
    }

    #[test]
    fn sending_as_someone_else_is_rejected() {
        let c = cast();
        let a = attempt(c.bystander, c.buyer, c.owner, c.owner);
        assert_eq!(evaluate(&a, c.owner, false), Err(PolicyViolation::Impersonation));
    }

    #[test]
    fn seller_must_be_a_participant() {
        let c = cast();
        let a = attempt(c.buyer, c.buyer, c.bystander, c.owner);
        assert_eq!(evaluate(&a, c.owner, false), Err(PolicyViolation::UnrelatedParty));
    }

    #[test]
    fn claimed_seller_must_own_the_crop() {
        let c = cast();
        // Buyer names the bystander as seller and writes to them.
        let a = attempt(c.buyer, c.buyer, c.bystander, c.bystander);
        assert_eq!(evaluate(&a, c.owner, false), Err(PolicyViolation::OwnerMismatch));

        // A seller "reply" with prior contact still has to be the real owner.
        let a = attempt(c.bystander, c.bystander, c.buyer, c.bystander);
        assert_eq!(evaluate(&a, c.owner, true), Err(PolicyViolation::OwnerMismatch));
    }

    #[test]
    fn reply_with_prior_contact_still_checks_caller() {
        let c = cast();
        let a = attempt(c.buyer, c.owner, c.buyer, c.owner);
        assert_eq!(evaluate(&a, c.owner, true), Err(PolicyViolation::Impersonation));
    }

    #[test]
    fn owner_mismatch_regardless_of_participants() {
        let c = cast();
        let impostor = Uuid::new_v4();
        let attempts = [
            attempt(c.buyer, c.buyer, impostor, impostor),
            attempt(c.bystander, c.bystander, impostor, impostor),
            attempt(c.owner, c.owner, impostor, impostor),
        ];
        for a in &attempts {
            assert_eq!(evaluate(a, c.owner, false), Err(PolicyViolation::OwnerMismatch));
        }
    }
}
