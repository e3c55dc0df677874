/// Fixed linear memory addressed by byte offsets, the only buffer a module
/// instance exchanges audio through.
///
/// Storage is a boxed slice of `f32` words, so every valid offset is a
/// multiple of four. Accessors return `None` rather than panicking on a bad
/// offset; the process path turns that into a no-op.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    words: Box<[f32]>,
}

const WORD: usize = std::mem::size_of::<f32>();

impl LinearMemory {
    pub fn new(bytes: usize) -> Self {
        Self {
            words: vec![0.0; bytes / WORD].into_boxed_slice(),
        }
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * WORD
    }

    /// Word range covered by `samples` floats starting at byte `offset`.
    #[inline]
    fn words_at(&self, offset: u32, samples: usize) -> Option<std::ops::Range<usize>> {
        let offset = offset as usize;
        if offset % WORD != 0 {
            return None;
        }
        let start = offset / WORD;
        let end = start.checked_add(samples)?;
        (end <= self.words.len()).then_some(start..end)
    }

    #[inline]
    pub fn slice(&self, offset: u32, samples: usize) -> Option<&[f32]> {
        let range = self.words_at(offset, samples)?;
        Some(&self.words[range])
    }

    #[inline]
    pub fn slice_mut(&mut self, offset: u32, samples: usize) -> Option<&mut [f32]> {
        let range = self.words_at(offset, samples)?;
        Some(&mut self.words[range])
    }

    /// Copy `data` into memory at `offset`. Returns false when the region is
    /// invalid, in which case nothing is written.
    #[inline]
    pub fn write(&mut self, offset: u32, data: &[f32]) -> bool {
        match self.slice_mut(offset, data.len()) {
            Some(region) => {
                region.copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Copy from memory at `offset` into `out`. Returns false when the region
    /// is invalid, in which case `out` is left untouched.
    #[inline]
    pub fn read(&self, offset: u32, out: &mut [f32]) -> bool {
        match self.slice(offset, out.len()) {
            Some(region) => {
                out.copy_from_slice(region);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.words.fill(0.0);
    }
}

/// Byte offsets of the four audio regions for one quantum, laid out back to
/// back from the start of memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QuantumLayout {
    pub quantum: usize,
    pub input_left: u32,
    pub input_right: u32,
    pub output_left: u32,
    pub output_right: u32,
}

impl QuantumLayout {
    pub const fn for_quantum(quantum: usize) -> Self {
        let region = (quantum * WORD) as u32;
        Self {
            quantum,
            input_left: 0,
            input_right: region,
            output_left: region * 2,
            output_right: region * 3,
        }
    }

    pub const fn required_bytes(&self) -> usize {
        self.quantum * WORD * 4
    }
}
