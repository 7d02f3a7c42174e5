//! Circular index iteration over the history buffer.

/// Iterator over the buffer slots that became visible since the last update.
///
/// Given the last integrated sequence number, a sample count and the buffer
/// length, yields `(last_sequence + 1 + i) % len` for `i in 0..count`,
/// oldest first. A zero-length buffer yields nothing.
///
/// ```rust
/// use dishwatch_sdk::Window;
///
/// let indices: Vec<usize> = Window::new(1000, 3, 900).collect();
/// assert_eq!(indices, vec![101, 102, 103]);
///
/// // Wraps past the end of the buffer
/// let indices: Vec<usize> = Window::new(8, 3, 10).collect();
/// assert_eq!(indices, vec![9, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Window {
    index: u64,
    remaining: u64,
    len: u64,
}

impl Window {
    pub fn new(last_sequence: u64, count: u64, len: usize) -> Self {
        let len = len as u64;
        if len == 0 {
            return Self {
                index: 0,
                remaining: 0,
                len,
            };
        }

        // Reduce before stepping so sequence values near u64::MAX cannot overflow
        let index = (last_sequence % len + 1) % len;
        Self {
            index,
            remaining: count,
            len,
        }
    }
}

impl Iterator for Window {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        let current = self.index;
        self.index += 1;
        if self.index == self.len {
            self.index = 0;
        }
        self.remaining -= 1;

        Some(current as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Window {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn visits_slots_after_last_sequence() {
        let indices: Vec<usize> = Window::new(1000, 3, 900).collect();
        assert_eq!(indices, vec![101, 102, 103]);
    }

    #[test]
    fn wraps_around_buffer_end() {
        let indices: Vec<usize> = Window::new(898, 4, 900).collect();
        assert_eq!(indices, vec![899, 0, 1, 2]);
    }

    #[test]
    fn full_buffer_visits_every_slot_once() {
        let mut indices: Vec<usize> = Window::new(12_345, 900, 900).collect();
        assert_eq!(indices.first(), Some(&((12_345 + 1) % 900)));
        indices.sort_unstable();
        assert_eq!(indices, (0..900).collect::<Vec<_>>());
    }

    #[test]
    fn zero_length_buffer_yields_nothing() {
        assert_eq!(Window::new(5, 10, 0).count(), 0);
    }

    #[test]
    fn zero_count_yields_nothing() {
        assert_eq!(Window::new(5, 0, 10).count(), 0);
    }

    #[test]
    fn survives_max_sequence() {
        let indices: Vec<usize> = Window::new(u64::MAX, 2, 7).collect();
        let start = ((u64::MAX as u128 + 1) % 7) as usize;
        assert_eq!(indices, vec![start, (start + 1) % 7]);
    }

    #[test]
    fn reports_exact_size() {
        let mut window = Window::new(0, 5, 3);
        assert_eq!(window.len(), 5);
        window.next();
        assert_eq!(window.len(), 4);
    }

    proptest! {
        #[test]
        fn matches_modulo_reference(
            last in any::<u64>(),
            len in 1usize..2_000,
            count in 0u64..4_000,
        ) {
            let indices: Vec<usize> = Window::new(last, count, len).collect();
            prop_assert_eq!(indices.len() as u64, count);

            for (i, idx) in indices.iter().enumerate() {
                let expected = ((last as u128 + 1 + i as u128) % len as u128) as usize;
                prop_assert_eq!(*idx, expected);
            }
        }

        #[test]
        fn capped_window_never_repeats_a_slot(
            last in any::<u64>(),
            len in 1usize..1_000,
            extra in 0usize..1_000,
        ) {
            let count = len.min(extra + 1) as u64;
            let mut indices: Vec<usize> = Window::new(last, count, len).collect();
            indices.sort_unstable();
            indices.dedup();
            prop_assert_eq!(indices.len() as u64, count);
            prop_assert!(indices.iter().all(|idx| *idx < len));
        }
    }
}
