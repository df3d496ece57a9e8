use crate::colors::normalize_category;
use crate::models::EmailRecord;
use std::fmt;

/// Stable handle for an email, assigned once at load and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmailId(u64);

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inline status shown in an item's tag area in place of badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagNote {
    NoTags,
    ClassificationFailed,
    NetworkError,
}

impl TagNote {
    pub fn text(self) -> &'static str {
        match self {
            TagNote::NoTags => "No relevant tags found.",
            TagNote::ClassificationFailed => "Classification failed.",
            TagNote::NetworkError => "Network error.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemView {
    pub classifying: bool,
    pub note: Option<TagNote>,
    pub highlighted: bool,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub struct CachedEmail {
    pub id: EmailId,
    pub record: EmailRecord,
    pub view: ItemView,
    generation: u64,
}

/// Proof that a request was issued against a specific state of one email.
/// A completion is only applied while the email exists and no newer
/// request has been issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: EmailId,
    /// Server-side key at the time the request was issued.
    pub position: usize,
    generation: u64,
}

/// Ordered inbox contents. Positions are derived from order, so removing an
/// email shifts every later position without touching any id.
#[derive(Debug, Default)]
pub struct EmailCache {
    entries: Vec<CachedEmail>,
    next_id: u64,
}

impl EmailCache {
    pub fn from_records(records: Vec<EmailRecord>) -> Self {
        let mut cache = Self::default();
        for record in records {
            cache.push(record);
        }
        cache
    }

    pub fn push(&mut self, record: EmailRecord) -> EmailId {
        let id = EmailId(self.next_id);
        self.next_id += 1;
        self.entries.push(CachedEmail {
            id,
            record,
            view: ItemView::default(),
            generation: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedEmail> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CachedEmail> {
        self.entries.iter_mut()
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<EmailId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn position_of(&self, id: EmailId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn id_at(&self, position: usize) -> Option<EmailId> {
        self.entries.get(position).map(|e| e.id)
    }

    pub fn get(&self, id: EmailId) -> Option<&CachedEmail> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EmailId) -> Option<&mut CachedEmail> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Supersedes any request still in flight for `id`.
    pub fn issue_ticket(&mut self, id: EmailId) -> Option<Ticket> {
        let position = self.position_of(id)?;
        let entry = &mut self.entries[position];
        entry.generation += 1;
        Some(Ticket {
            id,
            position,
            generation: entry.generation,
        })
    }

    pub fn redeem(&mut self, ticket: &Ticket) -> Option<&mut CachedEmail> {
        self.get_mut(ticket.id)
            .filter(|e| e.generation == ticket.generation)
    }

    /// Removes the email and returns the position it occupied.
    pub fn remove(&mut self, id: EmailId) -> Option<(usize, CachedEmail)> {
        let position = self.position_of(id)?;
        Some((position, self.entries.remove(position)))
    }

    /// Drops `category` from every email's tags; returns how many emails changed.
    pub fn strip_tag(&mut self, category: &str) -> usize {
        let category = normalize_category(category);
        let mut changed = 0;
        for entry in &mut self.entries {
            let before = entry.record.tags.len();
            entry
                .record
                .tags
                .retain(|t| normalize_category(t) != category);
            if entry.record.tags.len() != before {
                changed += 1;
            }
        }
        changed
    }
}
