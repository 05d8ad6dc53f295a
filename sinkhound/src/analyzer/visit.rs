//! The per-instruction traversal primitive.

use crate::ir::{Function, Instr};

/// Invokes `visit` on every instruction of every block of `func`, in
/// declaration order, until the blocks are exhausted or `visit` asks to
/// stop by returning `true`. A function with no body is a no-op.
///
/// Returns whether the traversal was stopped early.
pub fn visit_instructions<V>(func: &Function, visit: &mut V) -> bool
where
    V: FnMut(&Instr) -> bool,
{
    let Some(blocks) = &func.blocks else {
        return false;
    };
    for block in blocks {
        for instr in &block.instrs {
            if visit(instr) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::visit_instructions;
    use crate::ir::{Block, Function, Instr, Signature};

    fn func_with(blocks: Option<Vec<Block>>) -> Function {
        Function {
            name: "f".to_owned(),
            package: "p".to_owned(),
            sig: Signature::default(),
            blocks,
        }
    }

    #[test]
    fn external_function_is_noop() {
        let f = func_with(None);
        let mut seen = 0;
        let stopped = visit_instructions(&f, &mut |_| {
            seen += 1;
            false
        });
        assert!(!stopped);
        assert_eq!(seen, 0);
    }

    #[test]
    fn stops_when_visitor_says_so() {
        let f = func_with(Some(vec![Block::new(vec![
            Instr::Opaque,
            Instr::Opaque,
            Instr::Opaque,
        ])]));
        let mut seen = 0;
        let stopped = visit_instructions(&f, &mut |_| {
            seen += 1;
            seen == 2
        });
        assert!(stopped);
        assert_eq!(seen, 2);
    }

    #[test]
    fn walks_blocks_in_order() {
        let f = func_with(Some(vec![
            Block::new(vec![Instr::Opaque]),
            Block::new(vec![Instr::Opaque, Instr::Opaque]),
        ]));
        let mut seen = 0;
        visit_instructions(&f, &mut |_| {
            seen += 1;
            false
        });
        assert_eq!(seen, 3);
    }
}
