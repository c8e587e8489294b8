//! Type and function-literal syntax.
//!
//! The evaluator re-enters the parser for nested type annotations and
//! anonymous function literals. It only sees the [`SubParser`] trait so
//! the two never depend on each other directly.

use crate::diagnostic::Diagnostic;
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use crate::tokens::{matching_close, range_last, split_parts};
use crate::types::{ArraySize, DataType, FuncSig, Param, Prim, TypeShape};

/// Parsed shape of `(params) ret { body }`.
#[derive(Debug, Clone)]
pub struct AnonFuncSyntax {
    pub params: Vec<Param>,
    pub ret: DataType,
    /// Statement token runs, split on top-level `;`.
    pub body: Vec<Vec<Token>>,
    pub span: Span,
}

pub trait SubParser: Send + Sync {
    /// Parse one type starting at `*index`. On success `*index` points one
    /// past the last consumed token. Identifiers are left unresolved.
    fn data_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic>;

    fn anon_func(&self, tokens: &[Token]) -> Result<AnonFuncSyntax, Diagnostic>;
}

/// Default [`SubParser`] working directly on tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSubParser;

fn syntax_error(span: Span) -> Diagnostic {
    Diagnostic::error(SemanticError::InvalidSyntax, span)
}

fn end_span(tokens: &[Token]) -> Span {
    tokens.last().map(|t| t.span).unwrap_or_default()
}

impl TokenSubParser {
    fn expect(&self, tokens: &[Token], index: &mut usize, kind: TokenKind) -> Result<(), Diagnostic> {
        match tokens.get(*index) {
            Some(tok) if tok.kind == kind => {
                *index += 1;
                Ok(())
            }
            Some(tok) => Err(syntax_error(tok.span)),
            None => Err(syntax_error(end_span(tokens))),
        }
    }

    fn bracket_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic> {
        let open = *index;
        *index += 1;
        let next = tokens.get(*index).ok_or_else(|| syntax_error(tokens[open].span))?;
        match next.kind {
            TokenKind::RBracket => {
                *index += 1;
                let elem = self.data_type(tokens, index)?;
                Ok(DataType::slice_of(elem))
            }
            TokenKind::Operator if next.text == "..." => {
                *index += 1;
                self.expect(tokens, index, TokenKind::RBracket)?;
                let elem = self.data_type(tokens, index)?;
                Ok(DataType::auto_array_of(elem))
            }
            TokenKind::Literal => {
                let n = crate::literal::integer_literal(&next.text)
                    .ok()
                    .and_then(|c| usize::try_from(c.as_i64()).ok().filter(|_| !c.is_negative()))
                    .ok_or_else(|| Diagnostic::error(SemanticError::InvalidExpr, next.span))?;
                *index += 1;
                self.expect(tokens, index, TokenKind::RBracket)?;
                let elem = self.data_type(tokens, index)?;
                Ok(DataType::new(TypeShape::Array {
                    elem: Box::new(elem),
                    size: ArraySize { n, auto: false },
                }))
            }
            _ => {
                let key = self.data_type(tokens, index)?;
                self.expect(tokens, index, TokenKind::Colon)?;
                let value = self.data_type(tokens, index)?;
                self.expect(tokens, index, TokenKind::RBracket)?;
                Ok(DataType::map_of(key, value))
            }
        }
    }

    /// `(params) ret` where `ret` is optional.
    fn func_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic> {
        let close = matching_close(tokens, *index).ok_or_else(|| syntax_error(tokens[*index].span))?;
        let params = self.params(&tokens[*index + 1..close], false)?;
        *index = close + 1;
        let ret = if tokens.get(*index).is_some_and(starts_type) {
            self.return_type(tokens, index)?
        } else {
            DataType::void()
        };
        Ok(DataType::func(FuncSig::new(params, ret)))
    }

    /// A single type, or a parenthesized tuple of types.
    fn return_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic> {
        if tokens[*index].kind != TokenKind::LParen {
            return self.data_type(tokens, index);
        }
        let close = matching_close(tokens, *index).ok_or_else(|| syntax_error(tokens[*index].span))?;
        let mut types = Vec::new();
        for part in split_parts(&tokens[*index + 1..close], TokenKind::Comma) {
            types.push(self.whole_type(part)?);
        }
        *index = close + 1;
        Ok(match types.len() {
            0 => DataType::void(),
            1 => types.remove(0),
            _ => DataType::tuple(types),
        })
    }

    fn whole_type(&self, tokens: &[Token]) -> Result<DataType, Diagnostic> {
        let Some(first) = tokens.first() else {
            return Err(Diagnostic::error(SemanticError::MissingExpr, Span::default()));
        };
        let mut i = 0;
        let ty = self.data_type(tokens, &mut i)?;
        if i != tokens.len() {
            return Err(syntax_error(tokens.get(i).map_or(first.span, |t| t.span)));
        }
        Ok(ty)
    }

    /// Parameter list. Each part is `T`, `name T` or `name ...T`; with
    /// `named` set, every part must carry a name.
    fn params(&self, tokens: &[Token], named: bool) -> Result<Vec<Param>, Diagnostic> {
        let mut params = Vec::new();
        if tokens.is_empty() {
            return Ok(params);
        }
        for part in split_parts(tokens, TokenKind::Comma) {
            let Some(first) = part.first() else {
                return Err(Diagnostic::error(SemanticError::MissingExpr, end_span(tokens)));
            };
            if !named && !part[0].is_operator("...") {
                if let Ok(ty) = self.whole_type(part) {
                    params.push(Param::new(String::new(), ty));
                    continue;
                }
            }
            let (name, rest) = match first.kind {
                TokenKind::Ident if part.len() > 1 => (first.text.clone(), &part[1..]),
                TokenKind::Operator if !named => (String::new(), part),
                _ => return Err(syntax_error(first.span)),
            };
            let (variadic, rest) = match rest.first() {
                Some(tok) if tok.is_operator("...") => (true, &rest[1..]),
                _ => (false, rest),
            };
            let mut param = Param::new(name, self.whole_type(rest)?);
            param.span = first.span;
            param.variadic = variadic;
            params.push(param);
        }
        if let Some(pos) = params.iter().position(|p| p.variadic) {
            if pos + 1 != params.len() {
                return Err(syntax_error(params[pos].span));
            }
        }
        Ok(params)
    }

    /// `a::b::Name[T, U]`
    fn named_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic> {
        let start = &tokens[*index];
        let mut name = start.text.clone();
        *index += 1;
        while tokens.get(*index).is_some_and(|t| t.kind == TokenKind::DoubleColon) {
            match tokens.get(*index + 1) {
                Some(seg) if seg.kind == TokenKind::Ident => {
                    name.push_str("::");
                    name.push_str(&seg.text);
                    *index += 2;
                }
                Some(seg) => return Err(syntax_error(seg.span)),
                None => return Err(syntax_error(tokens[*index].span)),
            }
        }
        let mut generics = Vec::new();
        if tokens.get(*index).is_some_and(|t| t.kind == TokenKind::LBracket) {
            let close = matching_close(tokens, *index).ok_or_else(|| syntax_error(tokens[*index].span))?;
            let inner = &tokens[*index + 1..close];
            if inner.is_empty() {
                return Err(syntax_error(tokens[close].span));
            }
            for part in split_parts(inner, TokenKind::Comma) {
                generics.push(self.whole_type(part)?);
            }
            *index = close + 1;
        }
        Ok(DataType::new(TypeShape::Id { name, generics }).with_span(start.span))
    }
}

fn starts_type(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::DataType | TokenKind::Ident | TokenKind::LBracket | TokenKind::LParen => true,
        TokenKind::Operator => tok.text == "*",
        _ => false,
    }
}

impl SubParser for TokenSubParser {
    fn data_type(&self, tokens: &[Token], index: &mut usize) -> Result<DataType, Diagnostic> {
        let tok = tokens
            .get(*index)
            .ok_or_else(|| Diagnostic::error(SemanticError::MissingExpr, end_span(tokens)))?;
        match tok.kind {
            TokenKind::Operator if tok.text == "*" => {
                *index += 1;
                let inner = self.data_type(tokens, index)?;
                let ptr = inner.ptr + 1;
                Ok(inner.with_ptr(ptr))
            }
            TokenKind::DataType => {
                let prim = Prim::from_name(&tok.text)
                    .ok_or_else(|| Diagnostic::error(SemanticError::InvalidType(tok.text.clone()), tok.span))?;
                *index += 1;
                Ok(DataType::prim(prim).with_span(tok.span))
            }
            TokenKind::LBracket => self.bracket_type(tokens, index),
            TokenKind::LParen => self.func_type(tokens, index),
            TokenKind::Ident => self.named_type(tokens, index),
            _ => Err(Diagnostic::error(SemanticError::InvalidType(tok.text.clone()), tok.span)),
        }
    }

    fn anon_func(&self, tokens: &[Token]) -> Result<AnonFuncSyntax, Diagnostic> {
        let first = tokens
            .first()
            .ok_or_else(|| Diagnostic::error(SemanticError::MissingExpr, Span::default()))?;
        if first.kind != TokenKind::LParen {
            return Err(syntax_error(first.span));
        }
        let close = matching_close(tokens, 0).ok_or_else(|| syntax_error(first.span))?;
        let params = self.params(&tokens[1..close], true)?;

        let (head, block) = range_last(tokens);
        if block.first().is_none_or(|t| t.kind != TokenKind::LBrace) || head.len() <= close {
            return Err(syntax_error(end_span(tokens)));
        }
        let ret_tokens = &head[close + 1..];
        let ret = if ret_tokens.is_empty() {
            DataType::void()
        } else {
            let mut i = 0;
            let ret = self.return_type(ret_tokens, &mut i)?;
            if i != ret_tokens.len() {
                return Err(syntax_error(ret_tokens[i].span));
            }
            ret
        };

        let body = split_parts(&block[1..block.len() - 1], TokenKind::Semi)
            .into_iter()
            .filter(|stmt| !stmt.is_empty())
            .map(<[Token]>::to_vec)
            .collect();
        Ok(AnonFuncSyntax {
            params,
            ret,
            body,
            span: first.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::span::FileId;

    fn parse(src: &str) -> DataType {
        let lexed = lex(FileId(0), src);
        TokenSubParser.whole_type(lexed.significant()).expect("type")
    }

    #[test]
    fn parses_container_types() {
        assert_eq!(parse("*[]int").kind_text(), "*[]int");
        assert_eq!(parse("[5]u8").kind_text(), "[5]u8");
        assert_eq!(parse("[...]str").kind_text(), "[...]str");
        assert_eq!(parse("[str:[]int]").kind_text(), "[str:[]int]");
        assert_eq!(parse("**f64").ptr, 2);
    }

    #[test]
    fn parses_function_types() {
        assert_eq!(parse("(int, ...str) bool").kind_text(), "(int, ...str) bool");
        assert_eq!(parse("(a int, b str)").kind_text(), "(int, str)");
        assert_eq!(parse("() (int, str)").kind_text(), "() (int, str)");
    }

    #[test]
    fn parses_namespaced_generic_names() {
        let t = parse("geo::Point[int, f32]");
        assert_eq!(t.kind_text(), "geo::Point[int,f32]");
    }

    #[test]
    fn anon_func_splits_body_statements() {
        let lexed = lex(FileId(0), "(a int, b int) int { out(a); return a + b }");
        let f = TokenSubParser.anon_func(lexed.significant()).expect("anon func");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].name, "b");
        assert_eq!(f.ret.kind_text(), "int");
        assert_eq!(f.body.len(), 2);
    }

    #[test]
    fn anon_func_params_need_names() {
        let lexed = lex(FileId(0), "(int) {}");
        assert!(TokenSubParser.anon_func(lexed.significant()).is_err());
    }
}
