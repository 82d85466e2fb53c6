//! Parsing of PROC steps: SORT, MEANS, FREQ, PRINT and the SQL
//! sublanguage.
//!
//! Procedure option names (`data=`, `out=`, `obs=`) and the secondary
//! statement words (VAR, TABLES) are not reserved; they are matched at the
//! identifier level, which is the "data= recognition" lookahead the parser
//! advertises.

use sable_lex::Token;

use crate::ast::{
    DatasetRef, Expr, FreqProc, MeansProc, PrintProc, ProcStep, SelectColumns, SelectStmt,
    SortProc, SqlColumnDef, SqlProc, SqlStatement, StatKind, StatementKind, TableRequest,
};
use crate::{ParseError, ParseResult, Parser};

impl<'a> Parser<'a> {
    /// `proc <name> ...; <statements> run;`
    pub(crate) fn parse_proc(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // proc
        let proc = match self.current().clone() {
            Token::Sort => self.parse_proc_sort()?,
            Token::Means => self.parse_proc_means()?,
            Token::Freq => self.parse_proc_freq()?,
            Token::Print => self.parse_proc_print()?,
            Token::Sql => self.parse_proc_sql()?,
            Token::Eof => return Err(ParseError::Incomplete),
            other => {
                return Err(self.syntax_error(format!("unsupported procedure: {other}")));
            }
        };
        Ok(StatementKind::Proc(proc))
    }

    /// `proc sort data= out= nodupkey duplicates; by k1 k2; run;`
    fn parse_proc_sort(&mut self) -> ParseResult<ProcStep> {
        self.advance(); // sort
        let mut data = None;
        let mut out = None;
        let mut nodupkey = false;
        let mut duplicates = false;

        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            if self.eat(&Token::NoDupKey) {
                nodupkey = true;
                continue;
            }
            if self.eat(&Token::Duplicates) {
                duplicates = true;
                continue;
            }
            match self.parse_proc_option()?.as_str() {
                "data" => data = Some(self.parse_dataset_ref()?),
                "out" => out = Some(self.parse_dataset_ref()?),
                other => {
                    return Err(self.syntax_error(format!("unknown PROC SORT option '{other}'")));
                }
            }
        }
        self.advance(); // ';'

        let mut by = Vec::new();
        self.parse_proc_tail(|parser, token| match token {
            Token::By => {
                parser.advance();
                by = parser.parse_name_list()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;

        let data = data
            .ok_or_else(|| self.syntax_error("PROC SORT requires DATA=".into()))?;
        Ok(ProcStep::Sort(SortProc {
            data,
            out,
            by,
            nodupkey,
            duplicates,
        }))
    }

    /// `proc means data= [n mean median std min max] out=; var ...; where ...; run;`
    fn parse_proc_means(&mut self) -> ParseResult<ProcStep> {
        self.advance(); // means
        let mut data = None;
        let mut out = None;
        let mut stats = Vec::new();

        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            let stat = match self.current() {
                Token::N => Some(StatKind::N),
                Token::Mean => Some(StatKind::Mean),
                Token::Median => Some(StatKind::Median),
                Token::Std => Some(StatKind::Std),
                Token::Min => Some(StatKind::Min),
                Token::Max => Some(StatKind::Max),
                _ => None,
            };
            if let Some(stat) = stat {
                self.advance();
                stats.push(stat);
                continue;
            }
            match self.parse_proc_option()?.as_str() {
                "data" => data = Some(self.parse_dataset_ref()?),
                "out" => out = Some(self.parse_dataset_ref()?),
                other => {
                    return Err(
                        self.syntax_error(format!("unknown PROC MEANS option '{other}'"))
                    );
                }
            }
        }
        self.advance(); // ';'

        let mut var_variables = Vec::new();
        let mut where_clause = None;
        self.parse_proc_tail(|parser, token| match token {
            Token::Where => {
                parser.advance();
                where_clause = Some(parser.parse_expr()?);
                parser.expect_semicolon("after WHERE expression")?;
                Ok(true)
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("var") => {
                parser.advance();
                var_variables = parser.parse_name_list()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;

        let data = data
            .ok_or_else(|| self.syntax_error("PROC MEANS requires DATA=".into()))?;
        Ok(ProcStep::Means(MeansProc {
            data,
            out,
            stats,
            var_variables,
            where_clause,
        }))
    }

    /// `proc freq data=; tables a b*c / chisq; run;`
    fn parse_proc_freq(&mut self) -> ParseResult<ProcStep> {
        self.advance(); // freq
        let mut data = None;
        let mut chisq = false;

        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            if self.eat(&Token::Chisq) {
                chisq = true;
                continue;
            }
            match self.parse_proc_option()?.as_str() {
                "data" => data = Some(self.parse_dataset_ref()?),
                other => {
                    return Err(self.syntax_error(format!("unknown PROC FREQ option '{other}'")));
                }
            }
        }
        self.advance(); // ';'

        let mut tables = Vec::new();
        self.parse_proc_tail(|parser, token| match token {
            Token::Ident(word) if word.eq_ignore_ascii_case("tables") => {
                parser.advance();
                while !parser.check(&Token::Semicolon) {
                    if parser.is_at_end() {
                        return Err(ParseError::Incomplete);
                    }
                    // Options after '/': only CHISQ is recognised.
                    if parser.eat(&Token::Slash) {
                        while !parser.check(&Token::Semicolon) {
                            if parser.is_at_end() {
                                return Err(ParseError::Incomplete);
                            }
                            if parser.eat(&Token::Chisq) {
                                chisq = true;
                            } else {
                                let opt = parser.expect_name("TABLES option")?;
                                return Err(parser.syntax_error(format!(
                                    "unknown TABLES option '{opt}'"
                                )));
                            }
                        }
                        continue;
                    }
                    let row = parser.expect_name("table variable")?;
                    let col = if parser.eat(&Token::Star) {
                        Some(parser.expect_name("crossed table variable")?)
                    } else {
                        None
                    };
                    tables.push(TableRequest { row, col });
                }
                parser.advance(); // ';'
                Ok(true)
            }
            _ => Ok(false),
        })?;

        let data = data
            .ok_or_else(|| self.syntax_error("PROC FREQ requires DATA=".into()))?;
        Ok(ProcStep::Freq(FreqProc {
            data,
            tables,
            chisq,
        }))
    }

    /// `proc print data= obs=5 noobs label; var ...; run;`
    fn parse_proc_print(&mut self) -> ParseResult<ProcStep> {
        self.advance(); // print
        let mut data = None;
        let mut obs = None;
        let mut noobs = false;
        let mut label = false;

        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            if self.eat(&Token::Noobs) {
                noobs = true;
                continue;
            }
            if self.eat(&Token::Label) {
                label = true;
                continue;
            }
            match self.parse_proc_option()?.as_str() {
                "data" => data = Some(self.parse_dataset_ref()?),
                "obs" => obs = Some(self.expect_row_count()?),
                other => {
                    return Err(self.syntax_error(format!("unknown PROC PRINT option '{other}'")));
                }
            }
        }
        self.advance(); // ';'

        let mut var_variables = Vec::new();
        self.parse_proc_tail(|parser, token| match token {
            Token::Ident(word) if word.eq_ignore_ascii_case("var") => {
                parser.advance();
                var_variables = parser.parse_name_list()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;

        let data = data
            .ok_or_else(|| self.syntax_error("PROC PRINT requires DATA=".into()))?;
        Ok(ProcStep::Print(PrintProc {
            data,
            obs,
            noobs,
            label,
            var_variables,
        }))
    }

    /// `proc sql; <sql statements> quit;` (`run;` is accepted too).
    fn parse_proc_sql(&mut self) -> ParseResult<ProcStep> {
        self.advance(); // sql
        self.expect_semicolon("after PROC SQL")?;

        let mut statements = Vec::new();
        loop {
            match self.current().clone() {
                Token::Eof => return Err(ParseError::Incomplete),
                Token::Run => {
                    self.advance();
                    self.expect_semicolon("after RUN")?;
                    break;
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("quit") => {
                    self.advance();
                    self.expect_semicolon("after QUIT")?;
                    break;
                }
                _ => statements.push(self.parse_sql_statement()?),
            }
        }

        Ok(ProcStep::Sql(SqlProc { statements }))
    }

    // ========================================================================
    // SQL STATEMENTS
    // ========================================================================

    fn parse_sql_statement(&mut self) -> ParseResult<SqlStatement> {
        match self.current().clone() {
            Token::Select => {
                let query = self.parse_select()?;
                self.expect_semicolon("after SELECT statement")?;
                Ok(SqlStatement::Select(query))
            }
            Token::Create => {
                self.advance();
                self.expect(&Token::Table, "after CREATE")?;
                let table = self.parse_dataset_ref()?;
                if self.eat(&Token::As) {
                    let query = self.parse_select()?;
                    self.expect_semicolon("after CREATE TABLE AS")?;
                    Ok(SqlStatement::CreateTableAs { table, query })
                } else {
                    self.expect(&Token::LParen, "after CREATE TABLE name")?;
                    let mut columns = Vec::new();
                    if !self.check(&Token::RParen) {
                        loop {
                            columns.push(self.parse_sql_column_def()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "to close the column list")?;
                    self.expect_semicolon("after CREATE TABLE")?;
                    Ok(SqlStatement::CreateTable { table, columns })
                }
            }
            Token::Insert => {
                self.advance();
                self.expect_context_word("into", "after INSERT")?;
                let table = self.parse_dataset_ref()?;
                self.expect_context_word("values", "after the table name")?;
                let mut values = vec![self.parse_sql_value_row()?];
                loop {
                    // VALUES (..), (..) and repeated VALUES (..) both work.
                    if self.eat(&Token::Comma) {
                        values.push(self.parse_sql_value_row()?);
                    } else if matches!(self.current(), Token::Ident(w) if w.eq_ignore_ascii_case("values"))
                    {
                        self.advance();
                        values.push(self.parse_sql_value_row()?);
                    } else {
                        break;
                    }
                }
                self.expect_semicolon("after INSERT statement")?;
                Ok(SqlStatement::Insert { table, values })
            }
            Token::Update => {
                self.advance();
                let table = self.parse_dataset_ref()?;
                self.expect_context_word("set", "after the table name")?;
                let mut assignments = Vec::new();
                loop {
                    let column = self.expect_name("column name")?;
                    self.expect(&Token::Eq, "in SET assignment")?;
                    let value = self.parse_expr()?;
                    assignments.push((column, value));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                let where_clause = if self.eat(&Token::Where) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect_semicolon("after UPDATE statement")?;
                Ok(SqlStatement::Update {
                    table,
                    assignments,
                    where_clause,
                })
            }
            Token::Delete => {
                self.advance();
                self.expect(&Token::From, "after DELETE")?;
                let table = self.parse_dataset_ref()?;
                let where_clause = if self.eat(&Token::Where) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect_semicolon("after DELETE statement")?;
                Ok(SqlStatement::Delete {
                    table,
                    where_clause,
                })
            }
            Token::Eof => Err(ParseError::Incomplete),
            other => Err(self.syntax_error(format!("expected SQL statement, found {other}"))),
        }
    }

    /// `select * | col, col from t [, t2] [where] [group by] [having] [order by]`
    fn parse_select(&mut self) -> ParseResult<SelectStmt> {
        self.expect(&Token::Select, "to open the query")?;

        let columns = if self.eat(&Token::Star) {
            SelectColumns::Star
        } else {
            let mut names = vec![self.expect_name("column name")?];
            while self.eat(&Token::Comma) {
                names.push(self.expect_name("column name")?);
            }
            SelectColumns::Names(names)
        };

        self.expect(&Token::From, "in SELECT")?;
        let mut from = vec![self.parse_dataset_ref()?];
        while self.eat(&Token::Comma) {
            from.push(self.parse_dataset_ref()?);
        }

        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat(&Token::Group) {
            self.expect(&Token::By, "after GROUP")?;
            group_by.push(self.expect_name("grouping column")?);
            while self.eat(&Token::Comma) {
                group_by.push(self.expect_name("grouping column")?);
            }
        }

        let having = if self.eat(&Token::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat(&Token::Order) {
            self.expect(&Token::By, "after ORDER")?;
            order_by.push(self.expect_name("ordering column")?);
            while self.eat(&Token::Comma) {
                order_by.push(self.expect_name("ordering column")?);
            }
        }

        Ok(SelectStmt {
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
        })
    }

    /// `name num` or `name char [(len)]`
    fn parse_sql_column_def(&mut self) -> ParseResult<SqlColumnDef> {
        let name = self.expect_name("column name")?;
        let kind = self.expect_name("column type")?;
        let (is_character, supports_length) = match kind.to_ascii_lowercase().as_str() {
            "num" | "numeric" => (false, false),
            "char" | "character" | "varchar" => (true, true),
            other => {
                return Err(self.syntax_error(format!("unknown column type '{other}'")));
            }
        };

        let mut length = None;
        if supports_length && self.eat(&Token::LParen) {
            match self.current().clone() {
                Token::Number(value) if value.fract() == 0.0 && value >= 1.0 => {
                    self.advance();
                    length = Some(value as usize);
                }
                Token::Eof => return Err(ParseError::Incomplete),
                other => {
                    return Err(self.syntax_error(format!(
                        "column length must be a positive integer, found {other}"
                    )));
                }
            }
            self.expect(&Token::RParen, "to close the column length")?;
        }

        Ok(SqlColumnDef {
            name,
            is_character,
            length,
        })
    }

    /// One parenthesised VALUES row.
    fn parse_sql_value_row(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&Token::LParen, "to open the VALUES row")?;
        let mut row = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                row.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "to close the VALUES row")?;
        Ok(row)
    }

    // ========================================================================
    // SHARED PROC MACHINERY
    // ========================================================================

    /// An option assignment head: `name=`. Returns the lowercased name
    /// with the '=' consumed; the caller parses the value.
    fn parse_proc_option(&mut self) -> ParseResult<String> {
        let name = self.expect_name("procedure option")?;
        self.expect(&Token::Eq, "after the option name")?;
        Ok(name.to_ascii_lowercase())
    }

    /// A positive integer option value (OBS=).
    fn expect_row_count(&mut self) -> ParseResult<usize> {
        match self.current().clone() {
            Token::Number(value) if value.fract() == 0.0 && value >= 0.0 => {
                self.advance();
                Ok(value as usize)
            }
            Token::Eof => Err(ParseError::Incomplete),
            other => Err(self.syntax_error(format!(
                "option value must be a non-negative integer, found {other}"
            ))),
        }
    }

    /// Drives the secondary statements of a PROC until `run;`. The
    /// callback returns true when it consumed a statement; anything it
    /// refuses is a syntax error logged with in-step recovery.
    fn parse_proc_tail<F>(&mut self, mut handle: F) -> ParseResult<()>
    where
        F: FnMut(&mut Self, &Token) -> ParseResult<bool>,
    {
        loop {
            match self.current().clone() {
                Token::Eof => return Err(ParseError::Incomplete),
                Token::Run => {
                    self.advance();
                    self.expect_semicolon("after RUN")?;
                    return Ok(());
                }
                token => {
                    if !handle(self, &token)? {
                        return Err(self.syntax_error(format!(
                            "unexpected {token} in PROC step"
                        )));
                    }
                }
            }
        }
    }
}

/// `word` must appear as a contextual identifier (INTO, VALUES, SET).
impl<'a> Parser<'a> {
    fn expect_context_word(&mut self, word: &str, context: &str) -> ParseResult<()> {
        match self.current().clone() {
            Token::Eof => Err(ParseError::Incomplete),
            tok => {
                if tok
                    .ident_text()
                    .map(|t| t.eq_ignore_ascii_case(word))
                    .unwrap_or(false)
                {
                    self.advance();
                    Ok(())
                } else {
                    Err(self.syntax_error(format!(
                        "expected {} {context}, found {tok}",
                        word.to_ascii_uppercase()
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;
    use sable_util::Handler;

    fn parse_proc(source: &str) -> ProcStep {
        let handler = Handler::new();
        let tokens = sable_lex::tokenize(source, &handler);
        let program = Parser::new(source, tokens, &handler).parse();
        assert!(
            !handler.has_errors(),
            "unexpected errors: {:?}",
            handler.diagnostics()
        );
        match program.statements.into_iter().next().map(|s| s.kind) {
            Some(StatementKind::Proc(proc)) => proc,
            other => panic!("expected proc step, got {other:?}"),
        }
    }

    // ========================================================================
    // SORT / MEANS / FREQ / PRINT
    // ========================================================================

    #[test]
    fn test_proc_sort() {
        let ProcStep::Sort(sort) = parse_proc("proc sort data=t out=u nodupkey; by k v; run;")
        else {
            panic!("expected sort");
        };
        assert_eq!(sort.data, DatasetRef::work("t"));
        assert_eq!(sort.out, Some(DatasetRef::work("u")));
        assert!(sort.nodupkey);
        assert!(!sort.duplicates);
        assert_eq!(sort.by, vec!["k".to_string(), "v".to_string()]);
    }

    #[test]
    fn test_proc_means_with_stats_and_where() {
        let ProcStep::Means(means) =
            parse_proc("proc means data=sales.q1 n mean std out=stats; var amount price; where amount > 0; run;")
        else {
            panic!("expected means");
        };
        assert_eq!(means.data, DatasetRef::new(Some("sales".into()), "q1"));
        assert_eq!(means.stats, vec![StatKind::N, StatKind::Mean, StatKind::Std]);
        assert_eq!(
            means.var_variables,
            vec!["amount".to_string(), "price".to_string()]
        );
        assert!(means.where_clause.is_some());
        assert_eq!(means.out, Some(DatasetRef::work("stats")));
    }

    #[test]
    fn test_proc_freq_two_way_chisq() {
        let ProcStep::Freq(freq) = parse_proc("proc freq data=t; tables a b*c / chisq; run;")
        else {
            panic!("expected freq");
        };
        assert_eq!(freq.tables.len(), 2);
        assert_eq!(freq.tables[0], TableRequest { row: "a".into(), col: None });
        assert_eq!(
            freq.tables[1],
            TableRequest {
                row: "b".into(),
                col: Some("c".into())
            }
        );
        assert!(freq.chisq);
    }

    #[test]
    fn test_proc_print_options() {
        let ProcStep::Print(print) =
            parse_proc("proc print data=t obs=5 noobs label; var id total; run;")
        else {
            panic!("expected print");
        };
        assert_eq!(print.obs, Some(5));
        assert!(print.noobs);
        assert!(print.label);
        assert_eq!(
            print.var_variables,
            vec!["id".to_string(), "total".to_string()]
        );
    }

    // ========================================================================
    // SQL
    // ========================================================================

    #[test]
    fn test_sql_select() {
        let ProcStep::Sql(sql) =
            parse_proc("proc sql; select a, b from t where x > 1 order by a; quit;")
        else {
            panic!("expected sql");
        };
        let SqlStatement::Select(query) = &sql.statements[0] else {
            panic!("expected select");
        };
        assert_eq!(
            query.columns,
            SelectColumns::Names(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(query.from, vec![DatasetRef::work("t")]);
        assert!(query.where_clause.is_some());
        assert_eq!(query.order_by, vec!["a".to_string()]);
    }

    #[test]
    fn test_sql_create_table_empty_catalog() {
        let ProcStep::Sql(sql) =
            parse_proc("proc sql; create table u (id num, name char(20)); quit;")
        else {
            panic!("expected sql");
        };
        let SqlStatement::CreateTable { table, columns } = &sql.statements[0] else {
            panic!("expected create table");
        };
        assert_eq!(table, &DatasetRef::work("u"));
        assert_eq!(columns.len(), 2);
        assert!(!columns[0].is_character);
        assert!(columns[1].is_character);
        assert_eq!(columns[1].length, Some(20));
    }

    #[test]
    fn test_sql_create_table_as_select() {
        let ProcStep::Sql(sql) =
            parse_proc("proc sql; create table big as select * from t where x > 10; quit;")
        else {
            panic!("expected sql");
        };
        assert!(matches!(
            &sql.statements[0],
            SqlStatement::CreateTableAs { .. }
        ));
    }

    #[test]
    fn test_sql_insert_update_delete() {
        let ProcStep::Sql(sql) = parse_proc(
            "proc sql; insert into t values (1, 'a'), (2, 'b'); update t set x = x + 1 where x > 0; delete from t where x = 2; quit;",
        ) else {
            panic!("expected sql");
        };
        assert_eq!(sql.statements.len(), 3);
        let SqlStatement::Insert { values, .. } = &sql.statements[0] else {
            panic!("expected insert");
        };
        assert_eq!(values.len(), 2);
        assert!(matches!(&sql.statements[1], SqlStatement::Update { .. }));
        assert!(matches!(&sql.statements[2], SqlStatement::Delete { .. }));
    }

    #[test]
    fn test_sql_group_by_parses_for_later_rejection() {
        // GROUP BY parses; the executor reports it as unsupported.
        let ProcStep::Sql(sql) =
            parse_proc("proc sql; select a from t group by a having a > 1; quit;")
        else {
            panic!("expected sql");
        };
        let SqlStatement::Select(query) = &sql.statements[0] else {
            panic!("expected select");
        };
        assert_eq!(query.group_by, vec!["a".to_string()]);
        assert!(query.having.is_some());
    }
}
