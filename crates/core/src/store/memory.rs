// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Volatile store backend.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::{
    capacity_exceeded, merge_patch, not_found, quota_victims, Collection, Document, Filter, Limits,
    Store,
};
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    size: u64,
    doc: Document,
}

/// In-memory [`Store`]. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    limits: Limits,
    next_seq: u64,
    collections: HashMap<Collection, BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(limits: Limits) -> Self {
        MemoryStore {
            limits,
            ..Default::default()
        }
    }

    fn entries(&self, collection: Collection) -> impl Iterator<Item = &Entry> {
        self.collections
            .get(&collection)
            .into_iter()
            .flat_map(|entries| entries.values())
    }

    /// Entries ordered oldest first.
    fn ordered(&self, collection: Collection) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries(collection).collect();
        entries.sort_by(|a, b| a.doc.timestamp.cmp(&b.doc.timestamp).then(a.seq.cmp(&b.seq)));
        entries
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

impl Store for MemoryStore {
    fn limits(&self) -> Limits {
        self.limits
    }

    fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    fn insert(&mut self, collection: Collection, doc: Document) -> Result<String> {
        let exists = self
            .collections
            .get(&collection)
            .is_some_and(|entries| entries.contains_key(&doc.id));
        let size = doc.size();

        let mut victims = Vec::new();
        let mut seq = None;
        match collection {
            Collection::Queue => {
                if exists {
                    seq = self
                        .collections
                        .get(&collection)
                        .and_then(|entries| entries.get(&doc.id))
                        .map(|entry| entry.seq);
                } else if self.count(collection)? >= self.limits.max_queue_size {
                    return Err(capacity_exceeded(collection, self.limits.max_queue_size));
                }
            }
            Collection::Cache => {
                let others = self.ordered(collection);
                victims = quota_victims(
                    others
                        .iter()
                        .filter(|entry| entry.doc.id != doc.id)
                        .map(|entry| (entry.doc.id.as_str(), entry.size)),
                    size,
                    self.limits.storage_quota,
                )?;
            }
            Collection::DeadLetter => {
                if !exists {
                    let excess = (self.count(collection)? + 1)
                        .saturating_sub(self.limits.max_dead_letters);
                    victims = self
                        .ordered(collection)
                        .iter()
                        .take(excess)
                        .map(|entry| entry.doc.id.clone())
                        .collect();
                }
            }
        }

        let seq = match seq {
            Some(seq) => seq,
            None => self.bump_seq(),
        };
        let entries = self.collections.entry(collection).or_default();
        for id in &victims {
            entries.remove(id);
        }
        let id = doc.id.clone();
        entries.insert(id.clone(), Entry { seq, size, doc });
        Ok(id)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        Ok(self
            .collections
            .get(&collection)
            .and_then(|entries| entries.get(id))
            .map(|entry| entry.doc.clone()))
    }

    fn list(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
        Ok(self
            .ordered(collection)
            .into_iter()
            .filter(|entry| filter.matches(&entry.doc))
            .map(|entry| entry.doc.clone())
            .collect())
    }

    fn update(&mut self, collection: Collection, id: &str, patch: &Value) -> Result<Document> {
        let entry = self
            .collections
            .get_mut(&collection)
            .and_then(|entries| entries.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        merge_patch(&mut entry.doc.body, patch);
        entry.size = entry.doc.size();
        Ok(entry.doc.clone())
    }

    fn remove(&mut self, collection: Collection, id: &str) -> Result<bool> {
        Ok(self
            .collections
            .get_mut(&collection)
            .is_some_and(|entries| entries.remove(id).is_some()))
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.collections.get(&collection).map_or(0, BTreeMap::len))
    }

    fn clear(&mut self, collection: Collection, filter: &Filter) -> Result<usize> {
        let Some(entries) = self.collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|_, entry| !filter.matches(&entry.doc));
        Ok(before - entries.len())
    }
}
