use crate::{
    expr::{
        BinaryOp,
        Expr,
        LogicalOp,
        UnaryOp,
    },
    lexer::{
        tokenize,
        Token,
    },
    Function,
    TemplateError,
    Value,
};
use std::{
    iter::Peekable,
    str::FromStr as _,
    vec::IntoIter,
};

/// Parse the source of one `${...}` segment.
pub(crate) fn parse_expression(source: &str) -> Result<Expr, TemplateError> {
    let mut parser = Parser {
        tokens: tokenize(source)?.into_iter().peekable(),
    };
    let expr = parser.conditional()?;
    match parser.tokens.next() {
        None => Ok(expr),
        Some(token) => Err(unexpected(Some(token), "end of expression")),
    }
}

/// Recursive descent, one method per precedence level from loosest to tightest:
/// `?:`, `|| ??`, `&&`, equality, comparison, additive, multiplicative, unary.
struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn eat(&mut self, token: &Token) -> bool {
        self.tokens.next_if(|next| next == token).is_some()
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), TemplateError> {
        match self.tokens.next() {
            Some(next) if next == token => Ok(()),
            other => Err(unexpected(other, expected)),
        }
    }

    fn conditional(&mut self) -> Result<Expr, TemplateError> {
        let cond = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.conditional()?;
        self.expect(Token::Colon, "`:`")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn logical_or(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.logical_and()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::OrOr) => LogicalOp::Or,
                Some(Token::QuestionQuestion) => LogicalOp::Coalesce,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.logical_and()?;
            lhs = Expr::Logical(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn logical_and(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::Logical(LogicalOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(Self::comparison, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(Self::additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(Self::multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(Self::unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    /// Left-associative chain of `next (op next)*`.
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, TemplateError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, TemplateError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.tokens.peek().and_then(operator) {
            self.tokens.next();
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, TemplateError> {
        let op = match self.tokens.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.tokens.next();
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        match self.tokens.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::LParen) => {
                let expr = self.conditional()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => self.path_or_call(name),
            other => Err(unexpected(other, "a value")),
        }
    }

    fn path_or_call(&mut self, first: String) -> Result<Expr, TemplateError> {
        let mut path = vec![first];
        while self.eat(&Token::Dot) {
            match self.tokens.next() {
                Some(Token::Ident(segment)) => path.push(segment),
                other => return Err(unexpected(other, "a field name after `.`")),
            }
        }

        if self.eat(&Token::LParen) {
            let name = path.join(".");
            let function = Function::from_str(&name).map_err(|_| TemplateError::UnknownFunction(name))?;
            let args = self.arguments()?;
            function.check_arity(args.len())?;
            return Ok(Expr::Call(function, args));
        }

        if let [keyword] = path.as_slice() {
            let literal = match keyword.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                "null" => Some(Value::Null),
                "undefined" => Some(Value::Undefined),
                "NaN" => Some(Value::Number(f64::NAN)),
                "Infinity" => Some(Value::Number(f64::INFINITY)),
                _ => None,
            };
            if let Some(literal) = literal {
                return Ok(Expr::Literal(literal));
            }
        }

        Ok(Expr::Field(path))
    }

    /// Comma separated arguments after an opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.conditional()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(Token::Comma, "`,` or `)`")?;
        }
    }
}

fn unexpected(found: Option<Token>, expected: &'static str) -> TemplateError {
    TemplateError::UnexpectedToken {
        found: found.map_or_else(|| "end of expression".to_string(), |token| token.to_string()),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field(path: &str) -> Box<Expr> {
        Box::new(Expr::Field(path.split('.').map(str::to_string).collect()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_expression("a + b * 2").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                field("a"),
                Box::new(Expr::Binary(BinaryOp::Mul, field("b"), num(2.0)))
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse_expression("a - b - c").unwrap(),
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(BinaryOp::Sub, field("a"), field("b"))),
                field("c")
            )
        );
    }

    #[test]
    fn calls_with_nested_arguments() {
        assert_eq!(
            parse_expression("Math.round(distanceMeters / 1609.34 * 10) / 10").unwrap(),
            Expr::Binary(
                BinaryOp::Div,
                Box::new(Expr::Call(
                    Function::Round,
                    vec![Expr::Binary(
                        BinaryOp::Mul,
                        Box::new(Expr::Binary(BinaryOp::Div, field("distanceMeters"), num(1609.34))),
                        num(10.0)
                    )]
                )),
                num(10.0)
            )
        );
    }

    #[test]
    fn conditional_is_right_associative() {
        assert_eq!(
            parse_expression("a ? 1 : b ? 2 : 3").unwrap(),
            Expr::Conditional(
                field("a"),
                num(1.0),
                Box::new(Expr::Conditional(field("b"), num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn keywords_are_literals() {
        assert_eq!(parse_expression("undefined").unwrap(), Expr::Literal(Value::Undefined));
        assert_eq!(parse_expression("true").unwrap(), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse_expression("position.null").unwrap(), *field("position.null"));
    }

    #[test]
    fn unary_operators_nest() {
        assert_eq!(
            parse_expression("-!a").unwrap(),
            Expr::Unary(UnaryOp::Neg, Box::new(Expr::Unary(UnaryOp::Not, field("a"))))
        );
    }

    #[test]
    fn rejects_unknown_functions() {
        assert_eq!(
            parse_expression("new Date(dateTime)"),
            Err(TemplateError::UnexpectedToken {
                found: "`Date`".to_string(),
                expected: "end of expression",
            })
        );
        assert_eq!(
            parse_expression("process.exit(1)"),
            Err(TemplateError::UnknownFunction("process.exit".to_string()))
        );
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(
            parse_expression("round(1, 2)"),
            Err(TemplateError::Arity { function: Function::Round, found: 2, .. })
        ));
    }

    #[test]
    fn reports_trailing_and_missing_tokens() {
        assert_eq!(
            parse_expression("(a + 1"),
            Err(TemplateError::UnexpectedToken {
                found: "end of expression".to_string(),
                expected: "`)`",
            })
        );
        assert_eq!(
            parse_expression("a b"),
            Err(TemplateError::UnexpectedToken {
                found: "`b`".to_string(),
                expected: "end of expression",
            })
        );
    }
}
