use crate::domain::WaitlistEmail;
use mongodb::bson::oid::ObjectId;

/// Identifier assigned by the document store when an entry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(ObjectId);

impl EntryId {
    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for EntryId {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

/// Renders as the 24 characters hex string clients receive as `id`.
impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// A registered email. Created once, never updated.
#[derive(Debug, Clone)]
pub struct WaitlistEntry {
    pub id: EntryId,
    pub email: WaitlistEmail,
}
