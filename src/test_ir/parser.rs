//! Test IR parser implementation.

use std::collections::HashMap;

use super::{Block, Function, Operation, TestIR, Value, ValueType, CONST_OPERAND_FLAG};

pub fn parse_ir(text: &str) -> Result<TestIR, String> {
    Parser::new(text).parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    ir: TestIR,

    /// Per-function value names. Operands may reference values defined
    /// later (or the instruction itself); unresolved references are
    /// patched when the function closes.
    values: HashMap<String, u32>,
    value_resolves: Vec<Resolve>,

    /// Interned integer constants, module wide.
    const_map: HashMap<i64, u32>,
}

struct Resolve {
    name: String,
    /// Slot in `value_operands` to patch.
    slot: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            ir: TestIR::new(),
            values: HashMap::new(),
            value_resolves: Vec::new(),
            const_map: HashMap::new(),
        }
    }

    fn parse(mut self) -> Result<TestIR, String> {
        self.skip_whitespace();
        while !self.is_eof() {
            self.parse_function()?;
            self.skip_whitespace();
        }
        Ok(self.ir)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ';' {
                // Comment runs to end of line.
                while let Some(ch) = self.peek() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        if self.try_read(ch) {
            Ok(())
        } else {
            Err(format!(
                "expected '{}' at position {}, found {:?}",
                ch,
                self.pos,
                self.peek()
            ))
        }
    }

    fn parse_ident(&mut self) -> Result<String, String> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.advance(),
            other => {
                return Err(format!(
                    "expected identifier at position {}, found {:?}",
                    self.pos, other
                ))
            }
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn parse_int(&mut self) -> Result<i64, String> {
        self.skip_whitespace();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        let digits_start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == digits_start {
            return Err(format!("expected integer at position {}", start));
        }
        self.text[start..self.pos]
            .parse::<i64>()
            .map_err(|e| format!("bad integer at position {}: {}", start, e))
    }

    fn intern_const(&mut self, value: i64) -> u32 {
        if let Some(&idx) = self.const_map.get(&value) {
            return CONST_OPERAND_FLAG | idx;
        }
        let idx = self.ir.consts.len() as u32;
        self.ir.consts.push(value);
        self.const_map.insert(value, idx);
        CONST_OPERAND_FLAG | idx
    }

    /// Parse one operand (`%name` or integer literal) and push its slot.
    fn parse_operand(&mut self) -> Result<(), String> {
        self.skip_whitespace();
        match self.peek() {
            Some('%') => {
                self.advance();
                let name = self.parse_ident()?;
                let slot_value = match self.values.get(&name) {
                    Some(&idx) => idx,
                    None => {
                        self.value_resolves.push(Resolve {
                            name,
                            slot: self.ir.value_operands.len(),
                        });
                        u32::MAX
                    }
                };
                self.ir.value_operands.push(slot_value);
                Ok(())
            }
            Some(ch) if ch == '-' || ch.is_ascii_digit() => {
                let value = self.parse_int()?;
                let slot_value = self.intern_const(value);
                self.ir.value_operands.push(slot_value);
                Ok(())
            }
            other => Err(format!(
                "expected operand at position {}, found {:?}",
                self.pos, other
            )),
        }
    }

    fn parse_function(&mut self) -> Result<(), String> {
        let name = self.parse_ident()?;
        self.values.clear();
        self.value_resolves.clear();

        self.expect('(')?;
        let arg_begin_idx = self.ir.values.len() as u32;
        if !self.try_read(')') {
            loop {
                self.expect('%')?;
                let arg_name = self.parse_ident()?;
                let idx = self.ir.values.len() as u32;
                if self.values.insert(arg_name.clone(), idx).is_some() {
                    return Err(format!("duplicate argument %{}", arg_name));
                }
                self.ir.values.push(Value {
                    name: arg_name,
                    value_type: ValueType::Arg,
                    op: Operation::None,
                    dims: 0,
                    op_begin_idx: 0,
                    op_end_idx: 0,
                });
                if self.try_read(')') {
                    break;
                }
                self.expect(',')?;
            }
        }
        let arg_end_idx = self.ir.values.len() as u32;

        self.expect('{')?;
        let block_begin_idx = self.ir.blocks.len() as u32;
        loop {
            if self.try_read('}') {
                break;
            }
            if self.is_eof() {
                return Err(format!("unterminated function '{}'", name));
            }
            self.parse_block()?;
        }
        let block_end_idx = self.ir.blocks.len() as u32;

        if block_begin_idx == block_end_idx {
            return Err(format!("function '{}' has no blocks", name));
        }

        // Patch forward and self references now that every name is known.
        for resolve in std::mem::take(&mut self.value_resolves) {
            match self.values.get(&resolve.name) {
                Some(&idx) => self.ir.value_operands[resolve.slot] = idx,
                None => return Err(format!("undefined value %{}", resolve.name)),
            }
        }

        self.ir.functions.push(Function {
            name,
            arg_begin_idx,
            arg_end_idx,
            block_begin_idx,
            block_end_idx,
        });
        Ok(())
    }

    fn parse_block(&mut self) -> Result<(), String> {
        let label = self.parse_ident()?;
        self.expect(':')?;

        let block_idx = self.ir.blocks.len();
        let inst_begin_idx = self.ir.values.len() as u32;
        self.ir.blocks.push(Block {
            name: label,
            inst_begin_idx,
            inst_end_idx: inst_begin_idx,
        });

        loop {
            self.skip_whitespace();
            if self.peek() == Some('%') {
                self.parse_inst()?;
            } else {
                // Next label or closing brace; the caller handles both.
                break;
            }
        }

        self.ir.blocks[block_idx].inst_end_idx = self.ir.values.len() as u32;
        Ok(())
    }

    fn parse_inst(&mut self) -> Result<(), String> {
        self.expect('%')?;
        let name = self.parse_ident()?;
        self.expect('=')?;
        let op_name = self.parse_ident()?;
        let op = Operation::from_str(&op_name)
            .ok_or_else(|| format!("unknown operation '{}'", op_name))?;

        let idx = self.ir.values.len() as u32;
        if self.values.insert(name.clone(), idx).is_some() {
            return Err(format!("redefinition of %{}", name));
        }

        let op_begin_idx = self.ir.value_operands.len() as u32;
        let mut dims = 0u32;

        match op {
            Operation::Alloc => {
                self.parse_operand()?;
            }
            Operation::Read | Operation::Write => {
                // Object, then bracketed index list.
                self.parse_operand()?;
                self.expect('[')?;
                loop {
                    self.parse_operand()?;
                    dims += 1;
                    if self.try_read(']') {
                        break;
                    }
                    self.expect(',')?;
                }
                if op == Operation::Write {
                    self.expect(',')?;
                    self.parse_operand()?;
                }
            }
            Operation::Add | Operation::Sub => {
                self.parse_operand()?;
                self.expect(',')?;
                self.parse_operand()?;
            }
            Operation::None => unreachable!("from_str never yields None"),
        }

        let op_end_idx = self.ir.value_operands.len() as u32;
        self.ir.values.push(Value {
            name,
            value_type: ValueType::Normal,
            op,
            dims,
            op_begin_idx,
            op_end_idx,
        });
        Ok(())
    }
}
