//! Табличный читатель. Файл материализуется целиком: обрезка хвоста и
//! типизация колонок требуют видеть конец таблицы, потоковой обработки нет.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

use crate::config::{CsvOptions, SourceConfig};
use crate::error::{ImportError, Result};
use crate::model::TxnRow;
use crate::normalize::{parse_date, parse_decimal, remap_enum};
use crate::table::{self, Table};
use crate::traits::{BalanceStatement, StatementReader};

/// Сколько текста с начала файла участвует в опознании источника.
const HEAD_PROBE: usize = 1024;

/// Остаток из колонки баланса первой строки таблицы, до skip-фильтра:
/// ожидающие операции остаток не двигают.
struct StatementBalance {
    amount: Decimal,
    currency: Option<String>,
}

pub struct CsvReader {
    options: CsvOptions,
    rows: Vec<TxnRow>,
    statement_balance: Option<StatementBalance>,
}

impl CsvReader {
    pub fn new(options: CsvOptions) -> Self {
        CsvReader {
            options,
            rows: Vec::new(),
            statement_balance: None,
        }
    }

    fn parse_line(&self, line: &str) -> Result<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.options.delimiter)
            .from_reader(line.as_bytes());
        match rdr.records().next() {
            Some(record) => Ok(record?.iter().map(str::to_string).collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Построчный разбор: пустые строки остаются пустыми записями,
    /// по ним обрезается хвост таблицы.
    fn parse_lines(&self, content: &str) -> Result<Vec<Vec<String>>> {
        let mut lines = Vec::new();
        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                lines.push(Vec::new());
            } else {
                lines.push(self.parse_line(line)?);
            }
        }
        Ok(lines)
    }

    fn probe(&self, content: &str) -> Result<bool> {
        if !self.options.header_identifier.is_empty() {
            let re = Regex::new(&self.options.header_identifier)?;
            let head: String = content.chars().take(HEAD_PROBE).collect();
            return Ok(re.is_match(&head));
        }
        let lines = self.parse_lines(content)?;
        let hit = match &self.options.start_sentinel {
            Some(label) => table::locate_sentinel(&lines, label).is_ok(),
            None => table::locate_header(&lines, &self.options.column_labels).is_ok(),
        };
        Ok(hit)
    }

    /// Конвейер в строгом порядке: сырые строки → фиксированные отступы →
    /// поиск таблицы → комментарии → хук источника → переименование →
    /// типизация. Ошибка на любой стадии фатальна для файла.
    pub fn read_str(&mut self, content: &str) -> Result<()> {
        self.rows.clear();
        self.statement_balance = None;

        let mut lines = self.parse_lines(content)?;
        if let Some(raw_transform) = self.options.raw_transform {
            lines = raw_transform(lines);
        }

        let head = self.options.skip_head_rows.min(lines.len());
        lines.drain(..head);
        let tail = self.options.skip_tail_rows.min(lines.len());
        lines.truncate(lines.len() - tail);

        if let Some(label) = &self.options.start_sentinel {
            let start = table::locate_sentinel(&lines, label)?;
            lines.drain(..start);
        }

        // без меток заголовком считается строка сразу за меткой начала
        // таблицы (либо первая строка файла)
        let header_idx = if self.options.column_labels.is_empty() {
            let idx = usize::from(self.options.start_sentinel.is_some());
            if idx >= lines.len() {
                return Err(ImportError::HeaderNotFound {
                    expected: Vec::new(),
                });
            }
            idx
        } else {
            table::locate_header(&lines, &self.options.column_labels)?
        };
        let header = lines[header_idx].clone();
        let body = table::trim_footer(lines.split_off(header_idx + 1));
        let mut table = Table::new(header, body);

        if let Some(marker) = &self.options.skip_comments {
            table = table.drop_comment_rows(marker);
        }
        if self.options.skip_data_rows > 0 {
            table = table.skip_rows(self.options.skip_data_rows);
        }
        if let Some(transform) = self.options.transform {
            table = transform(table);
        }
        table = table.rename(&self.options.header_map).normalize_names()?;

        if self.options.emit_balance {
            self.statement_balance = self.first_row_balance(&table)?;
        }
        self.rows = self.typed_rows(&table)?;
        Ok(())
    }

    fn first_row_balance(&self, table: &Table) -> Result<Option<StatementBalance>> {
        let Some(row) = table.iter_rows().next() else {
            return Ok(None);
        };
        let raw = row.get("balance");
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(StatementBalance {
            amount: parse_decimal(raw, self.options.decimal_separator)?,
            currency: opt(row.get("currency")),
        }))
    }

    fn typed_rows(&self, table: &Table) -> Result<Vec<TxnRow>> {
        if table.column("date").is_none() {
            return Err(ImportError::MissingField("date"));
        }
        if table.column("amount").is_none() {
            return Err(ImportError::MissingField("amount"));
        }

        let sep = self.options.decimal_separator;
        let opt_decimal = |v: &str| -> Result<Option<Decimal>> {
            if v.trim().is_empty() {
                Ok(None)
            } else {
                parse_decimal(v, sep).map(Some)
            }
        };

        let mut rows = Vec::with_capacity(table.rows.len());
        for row in table.iter_rows() {
            let raw_type = row.get("type");
            // skip-список сверяется с сырым кодом, до переименования
            if !raw_type.is_empty()
                && self
                    .options
                    .skip_transaction_types
                    .iter()
                    .any(|t| t == raw_type)
            {
                continue;
            }
            let txn_type = if raw_type.is_empty() {
                None
            } else {
                Some(remap_enum(raw_type, &self.options.transaction_type_map))
            };

            rows.push(TxnRow {
                date: parse_date(row.get("date"), &self.options.date_format)?,
                txn_type,
                payee: row.get("payee").to_string(),
                memo: opt(row.get("memo")),
                amount: parse_decimal(row.get("amount"), sep)?,
                currency: opt(row.get("currency")),
                balance: opt_decimal(row.get("balance"))?,
                checknum: opt(row.get("checknum")),
                foreign_amount: opt_decimal(row.get("foreign_amount"))?,
                foreign_currency: opt(row.get("foreign_currency")),
            });
        }
        Ok(rows)
    }

    pub fn max_transaction_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|row| row.date).max()
    }
}

fn opt(v: &str) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

impl StatementReader for CsvReader {
    fn extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn identify(&mut self, path: &Path, _config: &SourceConfig) -> Result<bool> {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().iter().any(|x| e.eq_ignore_ascii_case(x)));
        if !ext_ok {
            return Ok(false);
        }
        let bytes = fs::read(path)?;
        self.probe(&String::from_utf8_lossy(&bytes))
    }

    fn read(&mut self, path: &Path, _config: &SourceConfig) -> Result<()> {
        let bytes = fs::read(path)?;
        self.read_str(&String::from_utf8_lossy(&bytes))
    }

    fn transactions(&self) -> &[TxnRow] {
        &self.rows
    }

    fn currency(&self) -> Option<&str> {
        // табличные выписки валюту файла не объявляют
        None
    }

    fn balance_statement(&self, config: &SourceConfig) -> Vec<BalanceStatement> {
        if !self.options.emit_balance {
            return Vec::new();
        }
        let Some(date) = self.balance_assertion_date(config) else {
            return Vec::new();
        };
        let Some(stmt) = &self.statement_balance else {
            return Vec::new();
        };
        let Some(currency) = stmt.currency.clone().or_else(|| config.currency.clone()) else {
            return Vec::new();
        };
        vec![BalanceStatement {
            date,
            amount: stmt.amount,
            currency,
        }]
    }

    /// Проверка действует на начало дня, поэтому датируется днём после
    /// последней известной операции.
    fn balance_assertion_date(&self, _config: &SourceConfig) -> Option<NaiveDate> {
        self.max_transaction_date().map(|d| d + Duration::days(1))
    }
}
