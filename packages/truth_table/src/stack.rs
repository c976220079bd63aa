use derive_more::derive::{Display, Error};

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[display("stack underflow")]
    Underflow,
    #[display("stack overflow (capacity {capacity})")]
    Overflow { capacity: usize },
}

/// LIFO stack that reports underflow and overflow instead of returning a
/// placeholder value.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
    limit: Option<usize>,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            limit: None,
        }
    }

    /// A stack that refuses to hold more than `limit` items.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit),
            limit: Some(limit),
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), StackError> {
        if let Some(capacity) = self.limit {
            if self.items.len() >= capacity {
                return Err(StackError::Overflow { capacity });
            }
        }

        self.items.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T, StackError> {
        self.items.pop().ok_or(StackError::Underflow)
    }

    pub fn peek(&self) -> Result<&T, StackError> {
        self.items.last().ok_or(StackError::Underflow)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
