/// Two complete lattice generations with an index flip.
///
/// Exactly one slot is current at any time; the other is only ever handed out for writing
/// through [`split_mut`](Self::split_mut), and becomes current on [`advance`](Self::advance).
#[derive(Debug)]
pub struct GenerationPair<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> GenerationPair<T> {
    pub fn new(a: T, b: T) -> Self {
        GenerationPair { slots: [a, b], current: 0 }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.current]
    }

    /// The live generation for reading and the other one for writing.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn both_mut(&mut self) -> [&mut T; 2] {
        let [a, b] = &mut self.slots;
        [a, b]
    }

    pub fn slot(&self, index: usize) -> &T {
        &self.slots[index]
    }

    /// Makes the freshly written generation current.
    pub fn advance(&mut self) {
        self.current ^= 1;
    }

    pub fn rewind(&mut self) {
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reads_current_writes_other() {
        let mut pair = GenerationPair::new(vec![1], vec![2]);
        {
            let (read, write) = pair.split_mut();
            assert_eq!(read, &vec![1]);
            write[0] = read[0] + 10;
        }
        // writes are invisible until the flip
        assert_eq!(pair.current(), &vec![1]);
        pair.advance();
        assert_eq!(pair.current(), &vec![11]);
        assert_eq!(pair.current_index(), 1);

        let (read, write) = pair.split_mut();
        assert_eq!(read, &vec![11]);
        assert_eq!(write, &mut vec![1]);
    }

    #[test]
    fn rewind_resets_index() {
        let mut pair = GenerationPair::new('a', 'b');
        pair.advance();
        assert_eq!(*pair.current(), 'b');
        pair.rewind();
        assert_eq!(*pair.current(), 'a');
        assert_eq!(*pair.slot(1), 'b');
    }
}
