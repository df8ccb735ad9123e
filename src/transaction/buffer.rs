/// Fixed-capacity byte buffer with a write and a read cursor.
///
/// Bytes beyond the capacity are refused; what was stored stays intact.
#[derive(Clone, Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    capacity: usize,
    read_index: usize,
}

impl ByteBuffer {
    pub fn new(capacity: usize) -> Self {
        ByteBuffer {
            data: Vec::with_capacity(capacity),
            capacity,
            read_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Appends `byte`; `false` when the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }

        self.data.push(byte);
        true
    }

    /// Bytes written but not read yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_index
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.read_index).cloned()
    }

    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek();
        if byte.is_some() {
            self.read_index += 1;
        }
        byte
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.read_index = 0;
    }
}
