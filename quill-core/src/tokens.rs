//! Token-run helpers shared by the evaluator and the sub-parser.
//!
//! Everything here works on borrowed slices; nothing allocates tokens.

use crate::diagnostic::Diagnostic;
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};

/// Binary operators that separate processes.
const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>", "==", "!=", "<", "<=", ">", ">=", "&&",
    "||", "=",
];

fn is_binary_operator(tok: &Token) -> bool {
    tok.kind == TokenKind::Operator && BINARY_OPERATORS.contains(&tok.text.as_str())
}

/// Whether `tok` closes an operand, so that a following operator is binary.
fn ends_operand(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Operator => tok.text == "...",
        TokenKind::Dot | TokenKind::DoubleColon | TokenKind::Comma | TokenKind::Colon => false,
        _ => !tok.is_open_brace(),
    }
}

/// Split one expression into processes: operands and the binary operators
/// between them, alternating. Operators at brace depth zero that follow a
/// complete operand are binary; any other operator stays attached to the
/// operand it prefixes.
///
/// A bracket group opened before anything but prefix operators is part of a
/// type (`[]*int{...}`, `[2]*T{...}`) and does not complete the operand.
pub fn split_processes(tokens: &[Token]) -> Result<Vec<&[Token]>, Diagnostic> {
    let mut processes = Vec::new();
    let mut depth = 0usize;
    let mut part_start = 0usize;
    // only prefix operators and type brackets seen in this operand so far
    let mut prefix = true;
    let mut type_bracket = false;
    let mut complete = false;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_open_brace() {
            if depth == 0 {
                type_bracket = prefix && tok.kind == TokenKind::LBracket;
                prefix &= type_bracket;
            }
            depth += 1;
            continue;
        }
        if tok.is_close_brace() {
            depth = depth
                .checked_sub(1)
                .ok_or_else(|| Diagnostic::error(SemanticError::InvalidSyntax, tok.span))?;
            if depth == 0 {
                complete = !type_bracket;
                type_bracket = false;
            }
            continue;
        }
        if depth > 0 {
            continue;
        }
        if complete && is_binary_operator(tok) {
            processes.push(&tokens[part_start..i]);
            processes.push(&tokens[i..=i]);
            part_start = i + 1;
            prefix = true;
            complete = false;
            continue;
        }
        complete = ends_operand(tok);
        if tok.kind != TokenKind::Operator {
            prefix = false;
        }
    }

    if depth != 0 {
        let span = tokens.last().map(|t| t.span).unwrap_or_default();
        return Err(Diagnostic::error(SemanticError::InvalidSyntax, span));
    }
    if part_start < tokens.len() {
        processes.push(&tokens[part_start..]);
    } else if let Some(last) = tokens.last() {
        // trailing binary operator
        return Err(Diagnostic::error(SemanticError::MissingExpr, last.span));
    }
    Ok(processes)
}

/// Whether a process is a lone binary operator.
pub fn is_operator_process(process: &[Token]) -> bool {
    process.len() == 1 && process[0].kind == TokenKind::Operator
}

/// Split at every top-level token of `kind`. Empty parts are kept so the
/// caller can report them.
pub fn split_parts(tokens: &[Token], kind: TokenKind) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_open_brace() {
            depth += 1;
        } else if tok.is_close_brace() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.kind == kind {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Index of the first colon at brace depth zero.
pub fn top_level_colon(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_open_brace() {
            depth += 1;
        } else if tok.is_close_brace() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.kind == TokenKind::Colon {
            return Some(i);
        }
    }
    None
}

/// Split off the trailing balanced brace range. Returns `(before, range)`
/// where `range` includes both braces; `range` is empty when the run does
/// not end in a closing brace or the braces do not balance.
pub fn range_last(tokens: &[Token]) -> (&[Token], &[Token]) {
    let Some(last) = tokens.last() else {
        return (tokens, &[]);
    };
    if !last.is_close_brace() {
        return (tokens, &[]);
    }
    let mut depth = 0usize;
    for i in (0..tokens.len()).rev() {
        let tok = &tokens[i];
        if tok.is_close_brace() {
            depth += 1;
        } else if tok.is_open_brace() {
            depth -= 1;
            if depth == 0 {
                return (&tokens[..i], &tokens[i..]);
            }
        }
    }
    (tokens, &[])
}

/// Index of the brace closing the one opened at `open`.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_open_brace() {
            depth += 1;
        } else if tok.is_close_brace() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Tokens strictly inside a brace range produced by [`range_last`].
pub fn inner(range: &[Token]) -> &[Token] {
    if range.len() < 2 {
        return &[];
    }
    &range[1..range.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::span::FileId;

    fn texts(parts: &[&[Token]]) -> Vec<String> {
        parts
            .iter()
            .map(|p| p.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn splits_binary_operators_at_depth_zero() {
        let lexed = lex(FileId(0), "2 + f(3 * 4) - -x");
        let processes = split_processes(lexed.significant()).expect("split");
        assert_eq!(
            texts(&processes),
            vec!["2", "+", "f ( 3 * 4 )", "-", "- x"]
        );
    }

    #[test]
    fn spread_operand_ends_before_binary_operator() {
        let lexed = lex(FileId(0), "a... + b");
        let processes = split_processes(lexed.significant()).expect("split");
        assert_eq!(texts(&processes), vec!["a ...", "+", "b"]);
    }

    #[test]
    fn type_brackets_keep_pointer_prefix_attached() {
        let lexed = lex(FileId(0), "[]*int{nil} == [2]*int{nil, nil}");
        let processes = split_processes(lexed.significant()).expect("split");
        assert_eq!(
            texts(&processes),
            vec!["[ ] * int { nil }", "==", "[ 2 ] * int { nil , nil }"]
        );

        let lexed = lex(FileId(0), "xs[0] * 2");
        let processes = split_processes(lexed.significant()).expect("split");
        assert_eq!(texts(&processes), vec!["xs [ 0 ]", "*", "2"]);
    }

    #[test]
    fn trailing_operator_is_missing_expression() {
        let lexed = lex(FileId(0), "1 +");
        let err = split_processes(lexed.significant()).expect_err("trailing operator");
        assert_eq!(err.key(), "missing_expr");
    }

    #[test]
    fn range_last_splits_call() {
        let lexed = lex(FileId(0), "f[int](a, (b))");
        let (expr, args) = range_last(lexed.significant());
        assert_eq!(texts(&[expr]), vec!["f [ int ]"]);
        assert_eq!(texts(&[inner(args)]), vec!["a , ( b )"]);
    }

    #[test]
    fn finds_only_top_level_colon() {
        let lexed = lex(FileId(0), "m[a:b] : c");
        assert_eq!(top_level_colon(lexed.significant()), Some(6));
    }

    #[test]
    fn keeps_empty_parts() {
        let lexed = lex(FileId(0), "1,,2");
        let parts = split_parts(lexed.significant(), TokenKind::Comma);
        assert_eq!(parts.len(), 3);
        assert!(parts[1].is_empty());
    }
}
