//! Читатель OFX/QFX. Формат 1.x — SGML с незакрытыми листовыми тегами,
//! поэтому вместо строгого XML-разбора — щадящее сканирование блоков.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use crate::config::{AccountMatch, BalanceDateStrategy, SourceConfig};
use crate::error::{ImportError, Result};
use crate::model::TxnRow;
use crate::traits::{BalanceStatement, StatementReader};

/// Остаток с датой «по состоянию на», как его сообщил провайдер.
#[derive(Debug, Clone, PartialEq)]
struct ReportedBalance {
    amount: Decimal,
    as_of: Option<NaiveDate>,
}

/// Один счёт из файла; файл может нести несколько выписок.
#[derive(Debug, Clone, Default)]
pub struct OfxAccount {
    pub account_id: String,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    ledger_balance: Option<ReportedBalance>,
    available_balance: Option<ReportedBalance>,
    pub transactions: Vec<TxnRow>,
}

#[derive(Default)]
pub struct OfxReader {
    accounts: Vec<OfxAccount>,
    selected: Option<usize>,
}

impl OfxReader {
    pub fn new() -> Self {
        OfxReader::default()
    }

    pub fn read_str(&mut self, content: &str, config: &SourceConfig) -> Result<()> {
        self.accounts = parse_accounts(content)?;
        self.selected = None;

        let Some(number) = config.account_number.as_deref() else {
            return Err(ImportError::AccountNotMatched("(not configured)".into()));
        };
        self.selected = self
            .accounts
            .iter()
            .position(|acct| match_account(&acct.account_id, number, config.account_match));
        if self.selected.is_none() {
            return Err(ImportError::AccountNotMatched(number.to_string()));
        }
        Ok(())
    }

    fn account(&self) -> Option<&OfxAccount> {
        self.selected.and_then(|i| self.accounts.get(i))
    }

    pub fn max_transaction_date(&self) -> Option<NaiveDate> {
        self.account()?
            .transactions
            .iter()
            .map(|row| row.date)
            .max()
    }

    /// Максимум из даты конца выписки, последней операции и балансовых дат
    /// минус страховой зазор: провайдер мог ещё не провести ожидающие
    /// операции. Без конца выписки и операций даты нет.
    fn smart_date(&self, fudge: i64) -> Option<NaiveDate> {
        let acct = self.account()?;
        let end = acct.end_date;
        let last = self.max_transaction_date();
        if end.is_none() && last.is_none() {
            return None;
        }
        let fudged = |b: &Option<ReportedBalance>| {
            b.as_ref()
                .and_then(|b| b.as_of)
                .map(|d| d - Duration::days(fudge))
        };
        [
            end,
            last,
            fudged(&acct.available_balance),
            fudged(&acct.ledger_balance),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

impl StatementReader for OfxReader {
    fn extensions(&self) -> &'static [&'static str] {
        &["ofx", "qfx"]
    }

    fn identify(&mut self, path: &Path, config: &SourceConfig) -> Result<bool> {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().iter().any(|x| e.eq_ignore_ascii_case(x)));
        if !ext_ok {
            return Ok(false);
        }
        let bytes = fs::read(path)?;
        // провал разбора при пробе — не наш файл, а не авария
        match self.read_str(&String::from_utf8_lossy(&bytes), config) {
            Ok(()) => Ok(true),
            Err(
                ImportError::AccountNotMatched(_)
                | ImportError::Ofx(_)
                | ImportError::MalformedDate(_)
                | ImportError::MalformedAmount(_),
            ) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read(&mut self, path: &Path, config: &SourceConfig) -> Result<()> {
        let bytes = fs::read(path)?;
        self.read_str(&String::from_utf8_lossy(&bytes), config)
    }

    fn transactions(&self) -> &[TxnRow] {
        self.account()
            .map(|acct| acct.transactions.as_slice())
            .unwrap_or(&[])
    }

    fn currency(&self) -> Option<&str> {
        self.account()?.currency.as_deref()
    }

    fn balance_statement(&self, config: &SourceConfig) -> Vec<BalanceStatement> {
        let Some(acct) = self.account() else {
            return Vec::new();
        };
        let Some(ledger) = &acct.ledger_balance else {
            return Vec::new();
        };
        let Some(date) = self.balance_assertion_date(config) else {
            return Vec::new();
        };
        let Some(currency) = acct.currency.clone().or_else(|| config.currency.clone()) else {
            return Vec::new();
        };
        vec![BalanceStatement {
            date,
            amount: ledger.amount,
            currency,
        }]
    }

    fn balance_assertion_date(&self, config: &SourceConfig) -> Option<NaiveDate> {
        let date = match config.balance_date {
            BalanceDateStrategy::Smart => self.smart_date(config.balance_date_fudge)?,
            BalanceDateStrategy::StatementEnd => self.account()?.end_date?,
            BalanceDateStrategy::LastTransaction => self.max_transaction_date()?,
            BalanceDateStrategy::Today => Utc::now().date_naive(),
        };
        // проверка на начало дня: датируем днём после
        Some(date + Duration::days(1))
    }
}

fn match_account(file_account: &str, configured: &str, mode: AccountMatch) -> bool {
    match mode {
        AccountMatch::Exact => file_account == configured,
        AccountMatch::Suffix => file_account.ends_with(configured),
    }
}

/// Урезанные экспорты нередко содержат пустые листовые теги; убираем их
/// до структурного разбора, вложенные — за несколько проходов.
fn remove_empty_leaf_tags(content: &str) -> Result<String> {
    let re = Regex::new(r"<([A-Za-z0-9._]+)\s*/>|<([A-Za-z0-9._]+)>\s*</([A-Za-z0-9._]+)>")?;
    let mut text = content.to_string();
    loop {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;
        for caps in re.captures_iter(&text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let empty_pair = match (caps.get(2), caps.get(3)) {
                (Some(open), Some(close)) => open.as_str().eq_ignore_ascii_case(close.as_str()),
                _ => true, // самозакрытый тег
            };
            if empty_pair {
                out.push_str(&text[last..whole.start()]);
                last = whole.end();
                changed = true;
            }
        }
        out.push_str(&text[last..]);
        if !changed {
            return Ok(out);
        }
        text = out;
    }
}

/// Заголовок OFX 1.x — просто строки до `<OFX>`; разбору подлежит тело.
fn ofx_body(content: &str) -> &str {
    let upper = content.to_ascii_uppercase();
    match upper.find("<OFX>") {
        Some(idx) => &content[idx..],
        None => content,
    }
}

fn extract_blocks<'a>(content: &'a str, tag: &str) -> Vec<&'a str> {
    let upper = content.to_ascii_uppercase();
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let mut blocks = Vec::new();
    let mut from = 0usize;
    while let Some(rel) = upper[from..].find(&open) {
        let start = from + rel + open.len();
        let end = match upper[start..].find(&close) {
            Some(rel) => start + rel,
            // закрывающего нет: до следующего такого же блока или конца
            None => match upper[start..].find(&open) {
                Some(rel) => start + rel,
                None => content.len(),
            },
        };
        blocks.push(&content[start..end]);
        from = end.min(content.len());
        if from >= content.len() {
            break;
        }
    }
    blocks
}

fn extract_block<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    extract_blocks(content, tag).into_iter().next()
}

/// Значение листового тега: текст до следующего `<`. SGML-теги уровня
/// записи не закрываются, поэтому ищем именно так.
fn extract_tag_value<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    let upper = content.to_ascii_uppercase();
    let needle = format!("<{tag}>");
    let start = upper.find(&needle)? + needle.len();
    let rest = &content[start..];
    let end = rest.find('<').unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then_some(value)
}

/// Дата OFX: `YYYYMMDD`, возможно с временем и зоной в хвосте.
fn parse_ofx_date(raw: &str) -> Result<NaiveDate> {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).take(8).collect();
    if digits.len() < 8 {
        return Err(ImportError::MalformedDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(&digits, "%Y%m%d")
        .map_err(|_| ImportError::MalformedDate(raw.to_string()))
}

fn parse_ofx_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str_exact(raw.trim()).map_err(|_| ImportError::MalformedAmount(raw.to_string()))
}

fn parse_balance(block: &str) -> Result<Option<ReportedBalance>> {
    let Some(raw) = extract_tag_value(block, "BALAMT") else {
        return Ok(None);
    };
    let as_of = match extract_tag_value(block, "DTASOF") {
        Some(raw) => Some(parse_ofx_date(raw)?),
        None => None,
    };
    Ok(Some(ReportedBalance {
        amount: parse_ofx_amount(raw)?,
        as_of,
    }))
}

fn parse_statement(block: &str, acct_tag: &str) -> Result<OfxAccount> {
    let acct_block = extract_block(block, acct_tag)
        .ok_or_else(|| ImportError::Ofx(format!("missing <{acct_tag}> block")))?;
    let account_id = extract_tag_value(acct_block, "ACCTID")
        .ok_or_else(|| ImportError::Ofx(format!("missing <ACCTID> within <{acct_tag}>")))?
        .to_string();

    let currency = extract_tag_value(block, "CURDEF").map(|s| s.to_ascii_uppercase());

    let start_date = match extract_tag_value(block, "DTSTART") {
        Some(raw) => Some(parse_ofx_date(raw)?),
        None => None,
    };
    let end_date = match extract_tag_value(block, "DTEND") {
        Some(raw) => Some(parse_ofx_date(raw)?),
        None => None,
    };

    let ledger_balance = match extract_block(block, "LEDGERBAL") {
        Some(b) => parse_balance(b)?,
        None => None,
    };
    let available_balance = match extract_block(block, "AVAILBAL") {
        Some(b) => parse_balance(b)?,
        None => None,
    };

    let mut transactions = Vec::new();
    for txn in extract_blocks(block, "STMTTRN") {
        let date_raw = extract_tag_value(txn, "DTPOSTED")
            .ok_or_else(|| ImportError::Ofx("missing <DTPOSTED> in <STMTTRN>".into()))?;
        let amount_raw = extract_tag_value(txn, "TRNAMT")
            .ok_or_else(|| ImportError::Ofx("missing <TRNAMT> in <STMTTRN>".into()))?;

        let name = extract_tag_value(txn, "NAME").map(str::to_string);
        let memo = extract_tag_value(txn, "MEMO").map(str::to_string);
        // NAME — основное описание, MEMO — необязательное дополнение
        let payee = name.clone().or_else(|| memo.clone()).unwrap_or_default();

        transactions.push(TxnRow {
            date: parse_ofx_date(date_raw)?,
            txn_type: extract_tag_value(txn, "TRNTYPE").map(str::to_string),
            payee,
            memo,
            amount: parse_ofx_amount(amount_raw)?,
            currency: None,
            balance: None,
            checknum: extract_tag_value(txn, "CHECKNUM").map(str::to_string),
            foreign_amount: None,
            foreign_currency: None,
        });
    }

    Ok(OfxAccount {
        account_id,
        currency,
        start_date,
        end_date,
        ledger_balance,
        available_balance,
        transactions,
    })
}

fn parse_accounts(content: &str) -> Result<Vec<OfxAccount>> {
    let sanitized = remove_empty_leaf_tags(content)?;
    let body = ofx_body(&sanitized);

    let mut accounts = Vec::new();
    for (stmt_tag, acct_tag) in [("STMTRS", "BANKACCTFROM"), ("CCSTMTRS", "CCACCTFROM")] {
        for block in extract_blocks(body, stmt_tag) {
            accounts.push(parse_statement(block, acct_tag)?);
        }
    }
    if accounts.is_empty() {
        return Err(ImportError::Ofx("no statement blocks found".into()));
    }
    Ok(accounts)
}
