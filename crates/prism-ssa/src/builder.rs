use thiserror::Error;

use crate::function::{Function, IfCf, IfPhi, Item, LoopCf, LoopPhi, Param, Region};
use crate::inst::{BinOp, CmpOp, Inst, UnOp};
use crate::types::{ValueId, ValueInfo, ValueType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("else without matching if")]
    ElseWithoutIf,
    #[error("{0} without matching open construct")]
    EndWithoutOpen(&'static str),
    #[error("else emitted twice for the same if")]
    DuplicateElse,
    #[error("function finished with {0} unclosed construct(s)")]
    Unclosed(usize),
}

enum Frame {
    Root(Region),
    If {
        cond: ValueId,
        then_region: Region,
        else_region: Region,
        in_else: bool,
    },
    Loop {
        body: Region,
    },
}

impl Frame {
    fn region_mut(&mut self) -> &mut Region {
        match self {
            Frame::Root(r) => r,
            Frame::If {
                then_region,
                else_region,
                in_else,
                ..
            } => {
                if *in_else {
                    else_region
                } else {
                    then_region
                }
            }
            Frame::Loop { body } => body,
        }
    }
}

/// Programmatic construction of a [`Function`], mirroring the nesting of the
/// structured source: `begin_if`/`begin_else`/`end_if` and
/// `begin_loop`/`end_loop` push and pop construct frames.
///
/// Primarily used by tests; a real front end would emit the same calls while
/// walking its own IR.
pub struct FunctionBuilder {
    name: String,
    params: Vec<Param>,
    values: Vec<ValueInfo>,
    stack: Vec<Frame>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> FunctionBuilder {
        FunctionBuilder {
            name: name.into(),
            params: Vec::new(),
            values: Vec::new(),
            stack: vec![Frame::Root(Region::default())],
        }
    }

    /// Mint a fresh value id with its annotations.
    pub fn value(&mut self, info: ValueInfo) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(info);
        id
    }

    pub fn param(&mut self, name: impl Into<String>, info: ValueInfo) -> ValueId {
        let value = self.value(info);
        self.params.push(Param {
            value,
            name: name.into(),
        });
        value
    }

    pub fn push(&mut self, inst: Inst) {
        self.current().items.push(Item::Inst(inst));
    }

    fn current(&mut self) -> &mut Region {
        self.stack
            .last_mut()
            .expect("builder frame stack is never empty")
            .region_mut()
    }

    // -- conveniences used heavily by tests; divergence of the result is the
    // -- union of the operands', which is what the upstream analysis would
    // -- conclude for pure ALU.

    pub fn const_val(&mut self, ty: ValueType, bits: u64) -> ValueId {
        let dst = self.value(ValueInfo::uniform(ty));
        self.push(Inst::Const { dst, bits });
        dst
    }

    pub fn unary(&mut self, op: UnOp, src: ValueId) -> ValueId {
        let info = ValueInfo {
            range_max: None,
            ..self.values[src.index()]
        };
        let dst = self.value(info);
        self.push(Inst::Unary { dst, op, src });
        dst
    }

    pub fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let divergent = self.values[lhs.index()].divergent || self.values[rhs.index()].divergent;
        let dst = self.value(ValueInfo {
            ty: self.values[lhs.index()].ty,
            divergent,
            range_max: None,
        });
        self.push(Inst::Binary { dst, op, lhs, rhs });
        dst
    }

    pub fn compare(&mut self, op: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let divergent = self.values[lhs.index()].divergent || self.values[rhs.index()].divergent;
        let dst = self.value(ValueInfo {
            ty: ValueType::BOOL,
            divergent,
            range_max: None,
        });
        self.push(Inst::Compare { dst, op, lhs, rhs });
        dst
    }

    // -- structured control flow --

    pub fn begin_if(&mut self, cond: ValueId) {
        self.stack.push(Frame::If {
            cond,
            then_region: Region::default(),
            else_region: Region::default(),
            in_else: false,
        });
    }

    pub fn begin_else(&mut self) -> Result<(), BuildError> {
        match self.stack.last_mut() {
            Some(Frame::If { in_else, .. }) => {
                if *in_else {
                    return Err(BuildError::DuplicateElse);
                }
                *in_else = true;
                Ok(())
            }
            _ => Err(BuildError::ElseWithoutIf),
        }
    }

    pub fn end_if(&mut self, phis: Vec<IfPhi>) -> Result<(), BuildError> {
        match self.stack.pop() {
            Some(Frame::If {
                cond,
                then_region,
                else_region,
                ..
            }) => {
                self.current().items.push(Item::If(IfCf {
                    cond,
                    then_region,
                    else_region,
                    phis,
                }));
                Ok(())
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(BuildError::EndWithoutOpen("end_if"))
            }
            None => Err(BuildError::EndWithoutOpen("end_if")),
        }
    }

    pub fn begin_loop(&mut self) {
        self.stack.push(Frame::Loop {
            body: Region::default(),
        });
    }

    /// Close the innermost loop. `phis` name the loop-carried values; their
    /// `dst` ids must have been minted before `begin_loop` so the body could
    /// reference them.
    pub fn end_loop(&mut self, phis: Vec<LoopPhi>) -> Result<(), BuildError> {
        match self.stack.pop() {
            Some(Frame::Loop { body }) => {
                self.current().items.push(Item::Loop(LoopCf { phis, body }));
                Ok(())
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(BuildError::EndWithoutOpen("end_loop"))
            }
            None => Err(BuildError::EndWithoutOpen("end_loop")),
        }
    }

    pub fn break_(&mut self, cond: Option<ValueId>) {
        self.current().items.push(Item::Break { cond });
    }

    pub fn continue_(&mut self, cond: Option<ValueId>) {
        self.current().items.push(Item::Continue { cond });
    }

    pub fn finish(mut self) -> Result<Function, BuildError> {
        if self.stack.len() != 1 {
            return Err(BuildError::Unclosed(self.stack.len() - 1));
        }
        let body = match self.stack.pop() {
            Some(Frame::Root(r)) => r,
            _ => unreachable!("bottom frame is always the root"),
        };
        Ok(Function::new(self.name, self.params, body, self.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_nested_structure() {
        let mut fb = FunctionBuilder::new("t");
        let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
        let b = fb.param("b", ValueInfo::divergent(ValueType::scalar(32)));
        let c = fb.compare(CmpOp::ULt, a, b);
        fb.begin_if(c);
        let x = fb.binary(BinOp::IAdd, a, b);
        fb.begin_else().unwrap();
        let y = fb.binary(BinOp::ISub, a, b);
        let m = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
        fb.end_if(vec![IfPhi {
            dst: m,
            then_value: x,
            else_value: y,
        }])
        .unwrap();
        let func = fb.finish().unwrap();
        assert_eq!(func.params.len(), 2);
        assert!(func.is_divergent(b));
        assert!(func.is_divergent(m));
        assert_eq!(func.body.items.len(), 2);
    }

    #[test]
    fn rejects_mismatched_ends() {
        let mut fb = FunctionBuilder::new("t");
        assert_eq!(fb.begin_else(), Err(BuildError::ElseWithoutIf));
        fb.begin_loop();
        assert_eq!(fb.end_if(vec![]), Err(BuildError::EndWithoutOpen("end_if")));
        fb.end_loop(vec![]).unwrap();
        let mut fb = FunctionBuilder::new("u");
        fb.begin_if(ValueId(0));
        assert!(matches!(fb.finish(), Err(BuildError::Unclosed(1))));
    }
}
