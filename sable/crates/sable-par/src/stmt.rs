//! Parsing of statements inside a DATA step body.

use sable_lex::Token;

use crate::ast::{
    ArrayDecl, AssignTarget, DataStmt, DoSpec, DoStmt, Expr, IfStmt, InputVar, RetainItem,
};
use crate::{ParseError, ParseResult, Parser};

impl<'a> Parser<'a> {
    /// One statement of a DATA step body. The statement's terminating ';'
    /// is consumed.
    pub(crate) fn parse_data_stmt(&mut self) -> ParseResult<DataStmt> {
        match self.current().clone() {
            Token::Set => {
                self.advance();
                let dataset = self.parse_dataset_ref()?;
                self.expect_semicolon("after SET statement")?;
                Ok(DataStmt::Set(dataset))
            }
            Token::Merge => {
                self.advance();
                let mut datasets = Vec::new();
                while !self.check(&Token::Semicolon) {
                    if self.is_at_end() {
                        return Err(ParseError::Incomplete);
                    }
                    datasets.push(self.parse_dataset_ref()?);
                }
                self.advance(); // ';'
                if datasets.is_empty() {
                    return Err(self.syntax_error("MERGE requires at least one dataset".into()));
                }
                Ok(DataStmt::Merge(datasets))
            }
            Token::By => {
                self.advance();
                let vars = self.parse_name_list()?;
                if vars.is_empty() {
                    return Err(self.syntax_error("BY requires at least one variable".into()));
                }
                Ok(DataStmt::By(vars))
            }
            Token::Input => self.parse_input_stmt(),
            Token::Datalines => {
                self.advance();
                self.expect_semicolon("after DATALINES")?;
                match self.current().clone() {
                    Token::DatalinesContent(text) => {
                        self.advance();
                        Ok(DataStmt::Datalines(text))
                    }
                    Token::Eof => Err(ParseError::Incomplete),
                    other => {
                        Err(self.syntax_error(format!("expected datalines block, found {other}")))
                    }
                }
            }
            Token::Drop => {
                self.advance();
                Ok(DataStmt::Drop(self.parse_name_list()?))
            }
            Token::Keep => {
                self.advance();
                Ok(DataStmt::Keep(self.parse_name_list()?))
            }
            Token::Retain => self.parse_retain_stmt(),
            Token::Array => self.parse_array_stmt(),
            Token::Output => {
                self.advance();
                self.expect_semicolon("after OUTPUT")?;
                Ok(DataStmt::Output)
            }
            Token::If => self.parse_if_stmt(),
            Token::Do => self.parse_do_stmt(),
            Token::Else | Token::ElseIf => {
                Err(self.syntax_error("ELSE without a matching IF".into()))
            }
            Token::End => Err(self.syntax_error("END without a matching DO".into())),
            _ => self.parse_assignment(),
        }
    }

    /// `input name $ age ...;`
    fn parse_input_stmt(&mut self) -> ParseResult<DataStmt> {
        self.advance(); // input
        let mut vars = Vec::new();
        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            let name = self.expect_name("input variable name")?;
            let is_character = self.eat(&Token::Dollar);
            vars.push(InputVar { name, is_character });
        }
        self.advance(); // ';'
        Ok(DataStmt::Input(vars))
    }

    /// `retain total 0 flag 'Y' x;` - names with optional literal initial
    /// values.
    fn parse_retain_stmt(&mut self) -> ParseResult<DataStmt> {
        self.advance(); // retain
        let mut items = Vec::new();
        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            let name = self.expect_name("retained variable name")?;
            let initial = self.parse_retain_initial();
            items.push(RetainItem { name, initial });
        }
        self.advance(); // ';'
        Ok(DataStmt::Retain(items))
    }

    /// An optional literal after a retained name: number, signed number,
    /// string or the missing dot.
    fn parse_retain_initial(&mut self) -> Option<Expr> {
        match self.current().clone() {
            Token::Number(value) => {
                self.advance();
                Some(Expr::Number(value))
            }
            Token::Str(value) => {
                self.advance();
                Some(Expr::Str(value))
            }
            Token::Dot => {
                self.advance();
                Some(Expr::Missing)
            }
            Token::Minus => {
                if let Token::Number(value) = self.peek(1).clone() {
                    self.advance();
                    self.advance();
                    Some(Expr::Number(-value))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// `array name {n} v1 ... vn;`
    fn parse_array_stmt(&mut self) -> ParseResult<DataStmt> {
        self.advance(); // array
        let name = self.expect_name("array name")?;

        let close = match self.current() {
            Token::LBrace => Token::RBrace,
            Token::LBracket => Token::RBracket,
            Token::LParen => Token::RParen,
            Token::Eof => return Err(ParseError::Incomplete),
            other => {
                return Err(
                    self.syntax_error(format!("expected array dimension, found {other}"))
                );
            }
        };
        self.advance(); // opening bracket

        let size = match self.current().clone() {
            Token::Number(value) if value.fract() == 0.0 && value >= 1.0 => {
                self.advance();
                value as usize
            }
            Token::Eof => return Err(ParseError::Incomplete),
            other => {
                return Err(self.syntax_error(format!(
                    "array dimension must be a positive integer, found {other}"
                )));
            }
        };
        self.expect(&close, "to close the array dimension")?;

        let vars = self.parse_name_list()?;
        Ok(DataStmt::Array(ArrayDecl { name, size, vars }))
    }

    /// `if cond then stmt [else if cond then stmt]* [else stmt]`
    ///
    /// Each THEN/ELSE arm is a single statement; a `do; ... end;` group
    /// serves for multi-statement arms.
    fn parse_if_stmt(&mut self) -> ParseResult<DataStmt> {
        self.advance(); // if
        let cond = self.parse_expr()?;
        self.expect(&Token::Then, "after IF condition")?;
        let then_stmt = Box::new(self.parse_data_stmt()?);

        let mut branches = vec![(cond, then_stmt)];
        let mut else_branch = None;
        loop {
            if self.eat(&Token::ElseIf) {
                let cond = self.parse_expr()?;
                self.expect(&Token::Then, "after ELSE IF condition")?;
                let stmt = Box::new(self.parse_data_stmt()?);
                branches.push((cond, stmt));
                continue;
            }
            if self.eat(&Token::Else) {
                else_branch = Some(Box::new(self.parse_data_stmt()?));
            }
            break;
        }

        Ok(DataStmt::If(IfStmt {
            branches,
            else_branch,
        }))
    }

    /// The four DO forms, with their body through to `end;`.
    fn parse_do_stmt(&mut self) -> ParseResult<DataStmt> {
        self.advance(); // do

        let spec = match self.current().clone() {
            Token::Semicolon => {
                self.advance();
                DoSpec::Group
            }
            Token::While => {
                self.advance();
                self.expect(&Token::LParen, "after DO WHILE")?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen, "to close DO WHILE condition")?;
                self.expect_semicolon("after DO WHILE(...)")?;
                DoSpec::While(cond)
            }
            Token::Until => {
                self.advance();
                self.expect(&Token::LParen, "after DO UNTIL")?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen, "to close DO UNTIL condition")?;
                self.expect_semicolon("after DO UNTIL(...)")?;
                DoSpec::Until(cond)
            }
            _ => {
                let var = self.expect_name("DO loop variable")?;
                self.expect(&Token::Eq, "after DO loop variable")?;
                let start = self.parse_expr()?;
                self.expect(&Token::To, "in iterative DO")?;
                let end = self.parse_expr()?;
                let by = if self.eat(&Token::By) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect_semicolon("after DO bounds")?;
                DoSpec::Iterative {
                    var,
                    start,
                    end,
                    by,
                }
            }
        };

        let mut body = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            if self.eat(&Token::End) {
                self.expect_semicolon("after END")?;
                break;
            }
            if self.check(&Token::Run) {
                return Err(self.syntax_error("DO block not closed by END".into()));
            }
            body.push(self.parse_data_stmt()?);
        }

        Ok(DataStmt::Do(DoStmt { spec, body }))
    }

    /// `name = expr;` or `arr[i] = expr;`
    fn parse_assignment(&mut self) -> ParseResult<DataStmt> {
        let Some(name) = self.current().ident_text().map(str::to_string) else {
            return Err(self.syntax_error(format!(
                "unexpected {} in DATA step body",
                self.current()
            )));
        };
        self.advance();

        let target = if self.eat(&Token::LBracket) {
            let index = self.parse_expr()?;
            self.expect(&Token::RBracket, "to close the subscript")?;
            AssignTarget::ArrayElem { array: name, index }
        } else if self.eat(&Token::LBrace) {
            let index = self.parse_expr()?;
            self.expect(&Token::RBrace, "to close the subscript")?;
            AssignTarget::ArrayElem { array: name, index }
        } else {
            AssignTarget::Var(name)
        };

        self.expect(&Token::Eq, "in assignment")?;
        let expr = self.parse_expr()?;
        self.expect_semicolon("after assignment")?;

        Ok(DataStmt::Assign { target, expr })
    }
}
