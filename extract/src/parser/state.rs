//! Detector parsing mode and its transition function.
//!
//! The detector is either scanning line by line or collecting a block of
//! rows for the grid parser or a condition list. [`ParseMode::transition`]
//! is pure: given the current mode and a classified line event it returns
//! the next mode, any block that must be flushed, and whether the current
//! line still needs scanning.

use form_schema_core::Section;

use super::ast::FieldCandidate;

/// Rows collected for one grid or condition list.
#[derive(Debug, Clone, Default)]
pub struct CollectBlock {
    /// Introductory question text, if one preceded the block.
    pub intro: Option<String>,
    /// Fallback candidate retracted to supply `intro`; re-emitted if the
    /// block cannot be parsed.
    pub intro_candidate: Option<FieldCandidate>,
    /// Position of the category header line, if any.
    pub header: Option<usize>,
    /// Positions of the collected rows.
    pub rows: Vec<usize>,
    /// Section in effect when the block opened.
    pub section: Section,
    blank_run: usize,
    idle_run: usize,
}

impl CollectBlock {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            ..Self::default()
        }
    }

    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = Some(intro.into());
        self
    }

    pub fn with_header(mut self, position: usize) -> Self {
        self.header = Some(position);
        self
    }

    pub fn with_row(mut self, position: usize) -> Self {
        self.rows.push(position);
        self
    }

    /// Header and row positions in document order.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.header.into_iter().chain(self.rows.iter().copied()).collect();
        positions.sort_unstable();
        positions
    }
}

/// Kind of block being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Grid,
    Conditions,
}

/// Detector mode.
#[derive(Debug, Clone, Default)]
pub enum ParseMode {
    #[default]
    Scanning,
    GridCollecting(CollectBlock),
    ConditionCollecting(CollectBlock),
}

/// A line as seen by the mode machine.
#[derive(Debug, Clone)]
pub enum ModeEvent {
    /// A rule opened a block.
    Open(BlockKind, CollectBlock),
    /// A row belonging to the open block, by position.
    Row(usize),
    Blank,
    /// Noise or separator lines, skipped inside a block.
    Noise,
    /// A non-trivial line that is not a row.
    Idle,
    /// A section heading.
    Heading,
    EndOfInput,
}

/// Limits governing when a block ends.
#[derive(Debug, Clone, Copy)]
pub struct CollectLimits {
    pub blank_run: usize,
    pub idle_limit: usize,
    pub max_grid_rows: usize,
}

/// Result of one transition.
#[derive(Debug)]
pub struct Transition {
    pub next: ParseMode,
    pub flushed: Option<(BlockKind, CollectBlock)>,
    /// The line that triggered the transition must be scanned again.
    pub reprocess: bool,
}

impl Transition {
    fn stay(next: ParseMode) -> Self {
        Self {
            next,
            flushed: None,
            reprocess: false,
        }
    }

    fn flush(kind: BlockKind, block: CollectBlock, reprocess: bool) -> Self {
        Self {
            next: ParseMode::Scanning,
            flushed: Some((kind, block)),
            reprocess,
        }
    }
}

impl ParseMode {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning)
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        match self {
            Self::Scanning => None,
            Self::GridCollecting(_) => Some(BlockKind::Grid),
            Self::ConditionCollecting(_) => Some(BlockKind::Conditions),
        }
    }

    fn collecting(kind: BlockKind, block: CollectBlock) -> Self {
        match kind {
            BlockKind::Grid => Self::GridCollecting(block),
            BlockKind::Conditions => Self::ConditionCollecting(block),
        }
    }

    /// Advances the mode machine by one event.
    pub fn transition(self, event: ModeEvent, limits: CollectLimits) -> Transition {
        let (kind, mut block) = match self {
            Self::Scanning => {
                return match event {
                    ModeEvent::Open(kind, block) => Transition::stay(Self::collecting(kind, block)),
                    _ => Transition::stay(Self::Scanning),
                };
            }
            Self::GridCollecting(block) => (BlockKind::Grid, block),
            Self::ConditionCollecting(block) => (BlockKind::Conditions, block),
        };

        match event {
            ModeEvent::Open(next_kind, next_block) => Transition {
                next: Self::collecting(next_kind, next_block),
                flushed: Some((kind, block)),
                reprocess: false,
            },
            ModeEvent::Row(position) => {
                block.rows.push(position);
                block.blank_run = 0;
                block.idle_run = 0;
                if kind == BlockKind::Grid && block.rows.len() >= limits.max_grid_rows {
                    Transition::flush(kind, block, false)
                } else {
                    Transition::stay(Self::collecting(kind, block))
                }
            }
            ModeEvent::Blank => {
                block.blank_run += 1;
                if block.blank_run >= limits.blank_run {
                    Transition::flush(kind, block, false)
                } else {
                    Transition::stay(Self::collecting(kind, block))
                }
            }
            ModeEvent::Noise => Transition::stay(Self::collecting(kind, block)),
            ModeEvent::Idle => {
                block.idle_run += 1;
                if block.idle_run >= limits.idle_limit {
                    Transition::flush(kind, block, true)
                } else {
                    Transition::stay(Self::collecting(kind, block))
                }
            }
            ModeEvent::Heading => Transition::flush(kind, block, true),
            ModeEvent::EndOfInput => Transition::flush(kind, block, false),
        }
    }
}
