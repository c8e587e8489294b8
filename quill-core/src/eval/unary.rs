use crate::defs::Def;
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::render::ExprModel;
use crate::types::DataType;
use crate::value::{Const, Value};

use super::Evaluator;
use super::binary::settle_literal;

impl Evaluator<'_> {
    /// `- + ~ ! * &` applied to the rest of the chain.
    pub(super) fn unary(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let op = &tokens[0];
        let operand = &tokens[1..];
        m.push_text(op.text.clone());
        let mut value = self.process(operand, m);
        if self.has_error {
            return value;
        }
        let ty = value.ty.resolve_alias();
        let kind = value.ty.kind_text();
        let not_for = |op: &Token| SemanticError::OperatorNotFor {
            operator: op.text.clone(),
            kind: kind.clone(),
        };

        match op.text.as_str() {
            "-" | "+" => {
                let Some(prim) = ty.as_prim().filter(|p| p.is_numeric()) else {
                    self.error(not_for(op), op.span);
                    return value;
                };
                if op.text == "-" {
                    if let Some(c) = value.constant.take() {
                        let (settled, c) = settle_literal(prim, negate(&c));
                        if settled != prim {
                            value.ty = DataType::prim(settled).with_span(value.ty.span);
                        }
                        value.constant = Some(c);
                    }
                }
                value.lvalue = false;
            }
            "~" => {
                let Some(prim) = ty.as_prim().filter(|p| p.is_integer()) else {
                    self.error(not_for(op), op.span);
                    return value;
                };
                value.constant = value.constant.as_ref().map(|c| match c {
                    Const::UInt(v) => Const::UInt(!v).cast_to(prim),
                    other => Const::Int(!other.as_i64()).cast_to(prim),
                });
                value.lvalue = false;
            }
            "!" => {
                if !ty.is_bool() {
                    self.error(not_for(op), op.span);
                    return value;
                }
                value.constant = value.constant.as_ref().map(|c| Const::Bool(!matches!(c, Const::Bool(true))));
                value.lvalue = false;
            }
            "*" => {
                if !ty.is_ptr() {
                    self.error(not_for(op), op.span);
                    return value;
                }
                value.ty = value.ty.unptr();
                value.lvalue = true;
            }
            "&" => {
                if !self.addressable(operand, &value) {
                    self.error(SemanticError::InvalidAddressOf, op.span);
                    return value;
                }
                value.ty.ptr += 1;
                value.lvalue = false;
                value.constant = None;
            }
            _ => {
                self.error(SemanticError::InvalidOperator, op.span);
            }
        }
        value
    }

    /// Only named storage can have its address taken.
    fn addressable(&self, operand: &[Token], value: &Value) -> bool {
        if !value.lvalue || value.is_type || value.ty.is_func() || value.ty.is_enum() {
            return false;
        }
        match operand {
            [tok] if tok.kind == TokenKind::Ident || tok.kind == TokenKind::SelfKw => {
                !matches!(self.lookup(&tok.text), Some(Def::Function(_)) | Some(Def::Enum(_)))
            }
            _ => operand.last().is_some_and(|t| t.kind == TokenKind::Ident || t.kind == TokenKind::RBracket),
        }
    }
}

fn negate(c: &Const) -> Const {
    match c {
        Const::Int(v) => Const::Int(v.wrapping_neg()),
        Const::UInt(v) => Const::UInt(v.wrapping_neg()),
        Const::Float(v) => Const::Float(-v),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::defs::{Defmap, Var};
    use crate::eval::eval_source;
    use crate::span::{FileId, Span};
    use crate::types::{DataType, Prim};
    use crate::value::Const;

    fn keys(defs: &Defmap, src: &str) -> Vec<&'static str> {
        eval_source(defs, src).2.iter().map(|d| d.key()).collect()
    }

    #[test]
    fn folds_constant_operands() {
        let defs = Defmap::new();
        assert_eq!(eval_source(&defs, "-5").1, "i32{-5}");
        assert_eq!(eval_source(&defs, "+5").1, "i32{5}");
        assert_eq!(eval_source(&defs, "~0").1, "i32{-1}");
        assert_eq!(eval_source(&defs, "!true").1, "false");

        let (min, code, _) = eval_source(&defs, "-2147483648");
        assert_eq!(min.constant, Some(Const::Int(i64::from(i32::MIN))));
        assert_eq!(code, "i32{-2147483648}");
    }

    #[test]
    fn operators_check_their_operand() {
        let defs = Defmap::new();
        assert_eq!(keys(&defs, "!1"), vec!["operator_notfor"]);
        assert_eq!(keys(&defs, "-\"a\""), vec!["operator_notfor"]);
        assert_eq!(keys(&defs, "~1.5"), vec!["operator_notfor"]);
        assert_eq!(keys(&defs, "&5"), vec!["invalid_address_of"]);
    }

    #[test]
    fn pointers_take_and_drop_a_level() {
        let span = Span::new(FileId(0), 0, 1);
        let mut defs = Defmap::new();
        defs.push(Var::new("x", DataType::prim(Prim::Int)).with_span(span))
            .push(Var::new("p", DataType::prim(Prim::Int).with_ptr(1)).with_span(span));

        let (addr, code, _) = eval_source(&defs, "&x");
        assert_eq!(code, "&x_0");
        assert_eq!(addr.ty.kind_text(), "*int");
        assert!(!addr.lvalue);

        let (deref, code, _) = eval_source(&defs, "*p");
        assert_eq!(code, "*p_0");
        assert!(deref.ty.is_prim(Prim::Int));
        assert!(deref.lvalue);
        assert_eq!(eval_source(&defs, "-x").1, "-x_0");
        assert_eq!(keys(&defs, "*x"), vec!["operator_notfor"]);
    }
}
