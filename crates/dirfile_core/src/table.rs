//! The entry table.

use crate::entry::{Entry, EntryKind, EntryType};
use crate::error::{CoreError, CoreResult};
use crate::fragment::Fragment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Field code of the implicit sample counter.
pub const INDEX_FIELD: &str = "INDEX";

/// Everything a format parser hands to a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Fragments, in index order.
    pub fragments: Vec<Fragment>,
    /// Field definitions.
    pub entries: Vec<Entry>,
    /// Alias code to target code.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Field whose length defines the dirfile's frame count.
    #[serde(default)]
    pub reference_field: Option<String>,
}

impl Metadata {
    /// Metadata with a single fragment whose format file is `format`.
    #[must_use]
    pub fn single_fragment() -> Self {
        Self {
            fragments: vec![Fragment::new(0, "format")],
            ..Self::default()
        }
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Adds an alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }
}

/// Field code to entry map, with alias resolution.
///
/// Entries are shared so the dispatcher can hold one while recursing into
/// the session; literal payload writes go through [`EntryTable::get_mut`].
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    entries: HashMap<String, Arc<Entry>>,
    order: Vec<String>,
    aliases: HashMap<String, String>,
}

impl EntryTable {
    /// Builds and validates a table.
    ///
    /// The implicit INDEX entry is added unless the metadata defines one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` for malformed entries or duplicate codes.
    pub fn build(
        entries: Vec<Entry>,
        aliases: HashMap<String, String>,
        n_fragments: usize,
    ) -> CoreResult<Self> {
        let mut table = Self {
            aliases,
            ..Self::default()
        };

        for entry in entries {
            entry.validate(n_fragments)?;
            if table.entries.contains_key(&entry.code) || table.aliases.contains_key(&entry.code) {
                return Err(CoreError::invalid_entry(&entry.code, "duplicate field code"));
            }
            table.order.push(entry.code.clone());
            table.entries.insert(entry.code.clone(), Arc::new(entry));
        }

        if !table.entries.contains_key(INDEX_FIELD) {
            table
                .entries
                .insert(INDEX_FIELD.to_owned(), Arc::new(Entry::new(INDEX_FIELD, EntryKind::Index)));
        }
        Ok(table)
    }

    /// Resolves `code` through aliases, following at most `max_hops` links.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` if nothing is defined under the final code, or
    /// `RecursionLimit` if the alias chain is longer than `max_hops`.
    pub fn resolve(&self, code: &str, max_hops: usize) -> CoreResult<Arc<Entry>> {
        let mut current = code;
        for _ in 0..=max_hops {
            if let Some(entry) = self.entries.get(current) {
                return Ok(Arc::clone(entry));
            }
            match self.aliases.get(current) {
                Some(target) => current = target,
                None => return Err(CoreError::unknown_field(code)),
            }
        }
        Err(CoreError::recursion_limit(code))
    }

    /// Mutable access to an entry by its canonical code.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Entry> {
        self.entries.get_mut(code).map(Arc::make_mut)
    }

    /// Defined field codes in definition order, excluding INDEX and hidden
    /// entries.
    #[must_use]
    pub fn field_list(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|code| self.entries.get(*code).is_some_and(|e| !e.flags.hidden))
            .map(String::as_str)
            .collect()
    }

    /// Visible field codes of one type, in definition order.
    #[must_use]
    pub fn field_list_by_type(&self, ty: EntryType) -> Vec<&str> {
        self.field_list()
            .into_iter()
            .filter(|code| self.entries.get(*code).is_some_and(|e| e.entry_type() == ty))
            .collect()
    }

    /// First RAW entry in definition order.
    #[must_use]
    pub fn first_raw(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|code| {
                self.entries
                    .get(*code)
                    .is_some_and(|e| e.entry_type() == EntryType::Raw)
            })
            .map(String::as_str)
    }

    /// Number of defined entries, excluding the implicit INDEX.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no entries are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
