//! Local contact store: an ordered, append-only list of saved peers.
//!
//! Stored as a flat JSON array of `{ "name", "phone" }` in
//! `<data_dir>/stranger_contacts.json`. Every successful `add` re-reads the
//! file, appends, and writes the whole list back.

use crate::core::error::{ChatError, ValidationError};
use crate::core::identity::{Identity, sanitize};
use crate::utils::atomic_write::atomic_write;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug)]
pub struct ContactBook {
    path: PathBuf,
    contacts: Vec<Contact>,
}

impl ContactBook {
    /// Load the list stored at `path`. Missing or broken files yield an
    /// empty book.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let contacts = read_list(&path);
        Self { path, contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, index: usize) -> Option<&Contact> {
        self.contacts.get(index)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Validate and append a contact, persisting the whole list.
    ///
    /// Nothing is written, and the in-memory list is untouched, if
    /// validation or the write fails.
    pub fn add(&mut self, name: &str, phone: &str, local: &Identity) -> Result<Contact, ChatError> {
        let contact = Contact {
            name: name.trim().to_string(),
            phone: sanitize(phone.trim()),
        };

        if contact.name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }
        if contact.phone.is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }
        if contact.phone == local.as_str() {
            return Err(ValidationError::SelfContact.into());
        }

        let mut list = read_list(&self.path);
        list.push(contact.clone());

        if let Err(e) = save_list(&self.path, &list) {
            error!(
                event = "contacts_save_failure",
                path = %self.path.display(),
                error = %e,
                "Failed to persist contacts"
            );
            return Err(ChatError::Storage(e.to_string()));
        }

        info!(
            event = "contact_added",
            name = %contact.name,
            phone = %contact.phone,
            total = list.len(),
            "Contact saved"
        );
        self.contacts = list;
        Ok(contact)
    }
}

fn read_list(path: &Path) -> Vec<Contact> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                event = "contacts_read_failure",
                path = %path.display(),
                error = %e,
                "Failed to read contacts"
            );
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Contact>>(&content) {
        Ok(list) => {
            debug!(event = "contacts_loaded", count = list.len(), "Contacts loaded");
            list
        }
        Err(e) => {
            error!(
                event = "contacts_parse_failure",
                error = %e,
                "Failed to parse contacts, starting fresh"
            );
            Vec::new()
        }
    }
}

fn save_list(path: &Path, list: &[Contact]) -> Result<()> {
    let content = serde_json::to_string(list)?;
    atomic_write(path, content.as_bytes())
}
