use serde::Serialize;

/// Identifier of a style tag registered in a [`TagTable`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct TagId(pub u32);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TagError {
    #[error("Tag already registered: {0}")]
    Duplicate(String),
    #[error("Unknown tag: {0}")]
    Unknown(String),
    #[error("Tag table is full, cannot register: {0}")]
    Full(String),
}

#[derive(Clone, Debug)]
struct TagInfo {
    name: String,
    undoable: bool,
}

/// Registry of the style tags a buffer may carry
///
/// Tags flagged as not undoable (transient highlights, link detection)
/// are applied and removed without being recorded in undo history.
#[derive(Clone, Debug, Default)]
pub struct TagTable {
    tags: Vec<TagInfo>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the usual note formatting tags
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let defaults = [
            ("bold", true),
            ("italic", true),
            ("strikethrough", true),
            ("highlight", true),
            ("monospace", true),
            ("size:small", true),
            ("size:large", true),
            ("size:huge", true),
            ("link:url", false),
            ("find-match", false),
        ];
        for (name, undoable) in defaults {
            table.tags.push(TagInfo {
                name: name.to_string(),
                undoable,
            });
        }
        table
    }

    pub fn register(&mut self, name: &str, undoable: bool) -> Result<TagId, TagError> {
        if self.lookup(name).is_some() {
            return Err(TagError::Duplicate(name.to_string()));
        }
        let id = u32::try_from(self.tags.len()).map_err(|_| TagError::Full(name.to_string()))?;
        self.tags.push(TagInfo {
            name: name.to_string(),
            undoable,
        });
        Ok(TagId(id))
    }

    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.tags
            .iter()
            .position(|info| info.name == name)
            .and_then(|index| u32::try_from(index).ok())
            .map(TagId)
    }

    pub fn name(&self, id: TagId) -> Option<&str> {
        self.tags.get(id.0 as usize).map(|info| info.name.as_str())
    }

    /// Unknown tags are treated as undoable
    pub fn is_undoable(&self, id: TagId) -> bool {
        self.tags
            .get(id.0 as usize)
            .is_none_or(|info| info.undoable)
    }

    pub fn set_undoable(&mut self, name: &str, undoable: bool) -> Result<(), TagError> {
        let info = self
            .tags
            .iter_mut()
            .find(|info| info.name == name)
            .ok_or_else(|| TagError::Unknown(name.to_string()))?;
        info.undoable = undoable;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
