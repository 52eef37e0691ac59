use super::{
    CopyOffsets, Format, Operation, MAX_FILL_RUN, MAX_LITERAL_RUN, MAX_LONG_COPY, MAX_MEDIUM_COPY,
    MAX_SHORT_COPY, MAX_SHORT_OFFSET, MIN_FILL_RUN, MIN_MATCH,
};

#[derive(Debug, Clone)]
pub struct Compressor<'a> {
    src: &'a [u8],
    format: Format,

    read_index: usize,
    run: LiteralRun,

    dst: Vec<u8>,
}

/// The literal run currently accepting bytes. Its tag byte is reserved in the
/// output and written once the run is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralRun {
    NoOpenRun,
    OpenRun { start_index: usize, count: u8 },
}

#[derive(Debug, Clone, Copy)]
struct Match {
    count: usize,
    back: usize,
    /// offset as stored by medium and long copies, if it fits in 16 bits
    far_offset: Option<u16>,
}

impl<'a> Compressor<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            format: Format::default(),

            read_index: 0,
            run: LiteralRun::NoOpenRun,

            dst: Vec::with_capacity(src.len() + src.len() / MAX_LITERAL_RUN as usize + 2),
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn compress(mut self) -> Vec<u8> {
        while self.read_index < self.src.len() {
            if let Some(count) = self.find_fill_run() {
                let value = self.src[self.read_index];
                self.emit(Operation::Fill {
                    count: count as u16,
                    value,
                });
                self.read_index += count;
            } else if let Some(found) = self.find_match() {
                self.emit_match(found);
                self.read_index += found.count;
            } else {
                self.push_literal(self.src[self.read_index]);
                self.read_index += 1;
            }
        }

        self.emit(Operation::End);

        log::debug!(
            "compressed {} bytes into {} bytes",
            self.src.len(),
            self.dst.len()
        );

        self.dst
    }

    fn push_literal(&mut self, value: u8) {
        match self.run {
            LiteralRun::OpenRun { start_index, count } if count < MAX_LITERAL_RUN => {
                self.run = LiteralRun::OpenRun {
                    start_index,
                    count: count + 1,
                };
            }
            _ => {
                self.close_run();

                let start_index = self.dst.len();
                self.dst.push(0);
                self.run = LiteralRun::OpenRun {
                    start_index,
                    count: 1,
                };
            }
        }

        self.dst.push(value);
    }

    fn close_run(&mut self) {
        if let LiteralRun::OpenRun { start_index, count } =
            std::mem::replace(&mut self.run, LiteralRun::NoOpenRun)
        {
            self.dst[start_index] = Operation::Literal(count).tag();
        }
    }

    fn emit(&mut self, operation: Operation) {
        self.close_run();
        operation.write(&mut self.dst);
    }

    fn emit_match(&mut self, found: Match) {
        let operation = match found.far_offset {
            _ if found.count <= MAX_SHORT_COPY && found.back <= MAX_SHORT_OFFSET => {
                Operation::ShortCopy {
                    count: found.count as u8,
                    back: found.back as u16,
                }
            }
            Some(offset) if found.count <= MAX_MEDIUM_COPY => Operation::MediumCopy {
                count: found.count as u8,
                offset,
            },
            Some(offset) => Operation::LongCopy {
                count: found.count as u16,
                offset,
            },
            None => unreachable!("matches without a far offset are limited to short copies"),
        };

        self.emit(operation);
    }

    /// Length of the single-byte run at the cursor, if it is long enough for a fill.
    fn find_fill_run(&self) -> Option<usize> {
        let remaining = &self.src[self.read_index..];
        if remaining.len() < MIN_FILL_RUN || remaining[0] != remaining[MIN_FILL_RUN - 1] {
            return None;
        }

        let value = remaining[0];
        let count = remaining
            .iter()
            .take(MAX_FILL_RUN)
            .take_while(|&&b| b == value)
            .count();

        (count >= MIN_FILL_RUN).then_some(count)
    }

    fn far_offset(&self, source: usize) -> Option<u16> {
        let offset = match self.format.copy_offsets {
            CopyOffsets::Absolute => source,
            CopyOffsets::Relative => self.read_index - source,
        };

        u16::try_from(offset).ok()
    }

    /// Longest earlier match for the bytes at the cursor.
    ///
    /// Candidates are tried from nearest to farthest and only a strictly longer
    /// match replaces the current best, so the nearest of equal matches wins.
    /// A match may run into the cursor; the decoder copies forward one byte at
    /// a time so overlapping sources are fine.
    fn find_match(&self) -> Option<Match> {
        let pos = self.read_index;
        let remaining = &self.src[pos..];
        let limit = remaining.len().min(MAX_LONG_COPY);
        if limit < MIN_MATCH {
            return None;
        }

        let mut best: Option<Match> = None;
        for source in (0..pos).rev() {
            let back = pos - source;
            let far_offset = self.far_offset(source);

            let max = match far_offset {
                Some(_) => limit,
                None if back <= MAX_SHORT_OFFSET => limit.min(MAX_SHORT_COPY),
                None if self.format.copy_offsets == CopyOffsets::Relative => break,
                None => continue,
            };

            let best_count = best.map_or(MIN_MATCH - 1, |found| found.count);
            if max <= best_count {
                continue;
            }

            let count = self.src[source..]
                .iter()
                .zip(remaining)
                .take(max)
                .take_while(|(a, b)| a == b)
                .count();

            if count > best_count {
                best = Some(Match {
                    count,
                    back,
                    far_offset,
                });

                if count == limit {
                    break;
                }
            }
        }

        best
    }
}
