//! Opens a grid block when checkbox columns line up across lines.

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::grid;

pub(crate) struct GridTriggerRule;

impl LineRule for GridTriggerRule {
    fn name(&self) -> &'static str {
        "grid_trigger"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        if !ctx.grid_probe {
            return None;
        }
        grid::probe(ctx, line).map(RuleOutcome::StartGrid)
    }
}
