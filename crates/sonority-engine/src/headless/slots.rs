//! Generational slot storage.

use crate::error::{EngineError, EngineResult};

struct Entry<T> {
    generation: u32,
    value: Option<T>,
    /// Generation whose value was reclaimed by stealing.
    stolen: Option<u32>,
}

/// Slots addressed by `(index, generation)`.
///
/// Removing a value bumps the slot generation, so handles to the old
/// value fail lookup instead of reaching whatever reuses the slot.
pub(crate) struct Slots<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Slots<T> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.value = Some(value);
            return (index, entry.generation);
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 1,
            value: Some(value),
            stolen: None,
        });
        (index, 1)
    }

    fn revoked(&self, index: u32, generation: u32) -> EngineError {
        match self.entries.get(index as usize) {
            Some(entry) if entry.stolen == Some(generation) => EngineError::ChannelStolen,
            _ => EngineError::InvalidHandle,
        }
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> EngineResult<&T> {
        match self.entries.get(index as usize) {
            Some(Entry {
                generation: g,
                value: Some(value),
                ..
            }) if *g == generation => Ok(value),
            _ => Err(self.revoked(index, generation)),
        }
    }

    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> EngineResult<&mut T> {
        let err = self.revoked(index, generation);
        match self.entries.get_mut(index as usize) {
            Some(Entry {
                generation: g,
                value: Some(value),
                ..
            }) if *g == generation => Ok(value),
            _ => Err(err),
        }
    }

    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> EngineResult<T> {
        self.get(index, generation)?;
        self.take(index).ok_or(EngineError::InvalidHandle)
    }

    /// Removes the value at `index` and remembers that it was stolen.
    pub(crate) fn steal(&mut self, index: u32) -> Option<T> {
        let generation = self.entries.get(index as usize)?.generation;
        let value = self.take(index)?;
        if let Some(entry) = self.entries.get_mut(index as usize) {
            entry.stolen = Some(generation);
        }
        Some(value)
    }

    fn take(&mut self, index: u32) -> Option<T> {
        let entry = self.entries.get_mut(index as usize)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value.as_ref().map(|v| (i as u32, e.generation, v))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> {
        self.entries.iter_mut().enumerate().filter_map(|(i, e)| {
            let generation = e.generation;
            e.value.as_mut().map(|v| (i as u32, generation, v))
        })
    }

    /// Removes every value `reject` matches, returning them with their ids.
    pub(crate) fn drain_where(&mut self, mut reject: impl FnMut(&T) -> bool) -> Vec<(u32, u32, T)> {
        let doomed: Vec<(u32, u32)> = self
            .iter()
            .filter(|(_, _, v)| reject(v))
            .map(|(i, g, _)| (i, g))
            .collect();
        doomed
            .into_iter()
            .filter_map(|(i, g)| self.take(i).map(|v| (i, g, v)))
            .collect()
    }
}
