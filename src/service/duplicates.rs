//! Duplicate suggestions and import-time duplicate checks. Read-only.

use std::collections::HashSet;
use uuid::Uuid;

use super::contacts::NewContact;
use crate::error::{CoreError, CoreResult};
use crate::models::Contact;
use crate::store::ContactRepository;

pub use crate::models::normalize_email;

/// Identity of a phone number: the last 10 digits.
///
/// Numbers without digits fall back to their lowercased text so they still
/// compare equal to themselves.
pub fn normalize_phone(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return number.trim().to_lowercase();
    }
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

pub struct DuplicateDetector<'a, S: ContactRepository> {
    store: &'a S,
}

impl<'a, S: ContactRepository> DuplicateDetector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Active contacts sharing an email with `contact_id`, or carrying the
    /// same name (also swapped). Excludes the contact itself; ids are unique.
    pub fn find_potential_duplicates(
        &self,
        owner_id: Uuid,
        contact_id: Uuid,
    ) -> CoreResult<Vec<Contact>> {
        let contact = self
            .store
            .get_contact(owner_id, contact_id)?
            .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))?;

        let mut seen = HashSet::from([contact_id]);
        let mut matches = Vec::new();

        for email in self.store.emails_for_contact(contact_id)? {
            for other in self.store.find_contacts_by_email(owner_id, &email.address)? {
                if seen.insert(other.id) {
                    matches.push(other);
                }
            }
        }

        for other in
            self.store
                .find_contacts_by_name(owner_id, &contact.first_name, &contact.last_name)?
        {
            if seen.insert(other.id) {
                matches.push(other);
            }
        }

        Ok(matches)
    }

    /// First existing contact the candidate duplicates.
    ///
    /// Any shared email is decisive. Without one, an exact name match must
    /// also share a phone number.
    pub fn find_duplicate(&self, owner_id: Uuid, candidate: &NewContact) -> CoreResult<Option<Contact>> {
        for email in &candidate.emails {
            if email.address.trim().is_empty() {
                continue;
            }
            if let Some(found) = self
                .store
                .find_contacts_by_email(owner_id, &email.address)?
                .into_iter()
                .next()
            {
                return Ok(Some(found));
            }
        }

        let phones: HashSet<String> = candidate
            .phones
            .iter()
            .map(|p| normalize_phone(&p.number))
            .filter(|p| !p.is_empty())
            .collect();
        if phones.is_empty() {
            return Ok(None);
        }

        let first = candidate.first_name.trim();
        let last = candidate.last_name.trim();
        for other in self.store.find_contacts_by_name(owner_id, first, last)? {
            // Swapped-name hits are suggestions only, not import matches
            let exact = other.first_name.eq_ignore_ascii_case(first)
                && other.last_name.eq_ignore_ascii_case(last);
            if !exact {
                continue;
            }
            let shares_phone = self
                .store
                .phones_for_contact(other.id)?
                .iter()
                .any(|p| phones.contains(&normalize_phone(&p.number)));
            if shares_phone {
                return Ok(Some(other));
            }
        }

        Ok(None)
    }
}
