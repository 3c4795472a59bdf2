use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// A pool of reusable `String` scratch buffers.
///
/// Executors rent binding arenas from here at construction time. The rented
/// buffer returns to the pool when dropped, so unwinding paths return
/// buffers too.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: Mutex<Vec<String>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rents a cleared buffer, allocating a fresh one when the pool is dry.
    pub fn rent(self: &Arc<Self>) -> PooledBuffer {
        let mut buffer = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        buffer.clear();
        PooledBuffer {
            pool: Arc::clone(self),
            buffer,
        }
    }

    fn give_back(&self, buffer: String) {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer);
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A buffer on loan from a [BufferPool]; returns itself on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    pool: Arc<BufferPool>,
    buffer: String,
}

impl Deref for PooledBuffer {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.give_back(mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_return_on_drop() {
        let pool = Arc::new(BufferPool::new());
        {
            let mut buffer = pool.rent();
            buffer.push_str("scratch");
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
        // The returned buffer is handed out cleared.
        assert_eq!(pool.rent().as_str(), "");
    }
}
