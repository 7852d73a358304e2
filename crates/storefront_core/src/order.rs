//! Basket selection and the contact form that together make up an order.

use std::{collections::BTreeMap, sync::OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Amount, LotId, LotStatus, OrderField},
    protocol::OrderRequest,
};

use crate::lot::LotItem;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

pub type FieldErrors = BTreeMap<OrderField, String>;

/// Which closed lots may be put in the basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Only lots the user holds the winning bid on.
    #[default]
    WonLotsOnly,
    AnyClosed,
}

impl SelectionPolicy {
    pub fn admits(self, lot: &LotItem, now: DateTime<Utc>) -> bool {
        if lot.status_at(now) != LotStatus::Closed {
            return false;
        }
        match self {
            SelectionPolicy::WonLotsOnly => lot.is_my_bid(),
            SelectionPolicy::AnyClosed => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub email: String,
    pub phone: String,
}

impl ContactForm {
    pub fn get(&self, field: OrderField) -> &str {
        match field {
            OrderField::Email => &self.email,
            OrderField::Phone => &self.phone,
        }
    }

    fn set(&mut self, field: OrderField, value: String) {
        match field {
            OrderField::Email => self.email = value,
            OrderField::Phone => self.phone = value,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderAssembler {
    selected: Vec<LotId>,
    contact: ContactForm,
    field_errors: FieldErrors,
}

impl OrderAssembler {
    pub fn selected(&self) -> &[LotId] {
        &self.selected
    }

    pub fn is_selected(&self, id: &LotId) -> bool {
        self.selected.contains(id)
    }

    pub fn select(&mut self, id: LotId) -> bool {
        if self.is_selected(&id) {
            return false;
        }
        self.selected.push(id);
        true
    }

    pub fn deselect(&mut self, id: &LotId) -> bool {
        let before = self.selected.len();
        self.selected.retain(|selected| selected != id);
        before != self.selected.len()
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    /// Drops selected ids rejected by `keep`; returns how many were dropped.
    pub fn retain_selected(&mut self, mut keep: impl FnMut(&LotId) -> bool) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| keep(id));
        before - self.selected.len()
    }

    pub fn contact(&self) -> &ContactForm {
        &self.contact
    }

    pub fn set_field(&mut self, field: OrderField, value: impl Into<String>) {
        self.contact.set(field, value.into());
    }

    pub fn validate(&mut self) -> &FieldErrors {
        self.field_errors = validate_contact(&self.contact);
        &self.field_errors
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty()
    }

    /// Sum of prices of selected lots that are still in `catalog` and closed.
    pub fn total(&self, catalog: &[LotItem], now: DateTime<Utc>) -> Amount {
        catalog
            .iter()
            .filter(|lot| self.is_selected(&lot.id) && lot.status_at(now) == LotStatus::Closed)
            .map(LotItem::price)
            .fold(0, Amount::saturating_add)
    }

    pub fn request(&self) -> OrderRequest {
        OrderRequest {
            items: self.selected.clone(),
            email: self.contact.email.clone(),
            phone: self.contact.phone.clone(),
        }
    }
}

pub fn validate_contact(contact: &ContactForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let email = contact.email.trim();
    if email.is_empty() {
        errors.insert(OrderField::Email, "Enter an email address".to_string());
    } else if !email_regex().is_match(email) {
        errors.insert(OrderField::Email, "Email address is not valid".to_string());
    }

    let phone = contact.phone.trim();
    if phone.is_empty() {
        errors.insert(OrderField::Phone, "Enter a phone number".to_string());
    } else if !is_valid_phone(phone) {
        errors.insert(
            OrderField::Phone,
            format!("Phone number must contain {MIN_PHONE_DIGITS} to {MAX_PHONE_DIGITS} digits"),
        );
    }

    errors
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
#[path = "tests/order_tests.rs"]
mod tests;
