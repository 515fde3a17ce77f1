//! FIFO free list for objects that are parked instead of dropped

use std::collections::VecDeque;

/// Hooks run when an object enters or leaves an [`ObjectPool`].
pub trait Poolable {
    fn on_pool(&mut self);
    fn on_depool(&mut self);
}

pub struct ObjectPool<T: Poolable> {
    items: VecDeque<T>,
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T: Poolable> ObjectPool<T> {
    pub fn add(&mut self, mut item: T) {
        item.on_pool();
        self.items.push_back(item);
    }

    /// oldest pooled item, activated
    pub fn get(&mut self) -> Option<T> {
        let mut item = self.items.pop_front()?;
        item.on_depool();
        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
