/// Fixed-capacity ring buffer of prices. Once full, each push overwrites the oldest value.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    values: Vec<f64>,
    // Slot the next push writes to.
    cursor: usize,
    len: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity],
            cursor: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn push(&mut self, value: f64) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        self.values[self.cursor] = value;
        self.cursor = (self.cursor + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// The most recent `n` values, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.capacity();
        let n = n.min(self.len);
        let start = (self.cursor + capacity - n) % capacity.max(1);
        (0..n).map(move |offset| self.values[(start + offset) % capacity])
    }

    /// Mean of the most recent `n` values; `None` until `n` values have been pushed.
    pub fn mean_recent(&self, n: usize) -> Option<f64> {
        if n == 0 || n > self.len {
            return None;
        }
        Some(self.recent(n).sum::<f64>() / n as f64)
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean_recent(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::PriceWindow;

    #[test]
    fn overwrites_oldest_when_full() {
        let mut window = PriceWindow::new(3);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            window.push(value);
        }
        assert!(window.is_full());
        assert_eq!(window.len(), 3);
        assert_eq!(window.recent(3).collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(window.recent(2).collect::<Vec<_>>(), vec![4.0, 5.0]);
        assert_eq!(window.mean(), Some(4.0));
        assert_eq!(window.mean_recent(2), Some(4.5));
    }

    #[test]
    fn mean_requires_enough_values() {
        let mut window = PriceWindow::new(4);
        assert!(window.is_empty());
        assert_eq!(window.mean(), None);
        window.push(2.0);
        assert_eq!(window.mean_recent(2), None);
        assert_eq!(window.mean_recent(1), Some(2.0));
        assert_eq!(window.mean_recent(0), None);
    }

    #[test]
    fn zero_capacity_ignores_pushes() {
        let mut window = PriceWindow::new(0);
        window.push(1.0);
        assert!(window.is_empty());
        assert_eq!(window.recent(1).count(), 0);
    }
}
