//! Нормализованный слой: типизированная строка выписки и канонические
//! записи, одинаковые для всех источников.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Типизированная строка источника. Знак суммы фиксирован: положительное
/// значение — приток на основной счёт. Живёт в пределах одного файла.
#[derive(Debug, Clone, PartialEq)]
pub struct TxnRow {
    pub date: NaiveDate,
    pub txn_type: Option<String>,
    pub payee: String,
    pub memo: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    /// Текущий остаток по версии источника.
    pub balance: Option<Decimal>,
    pub checknum: Option<String>,
    pub foreign_amount: Option<Decimal>,
    pub foreign_currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    #[serde(with = "rust_decimal::serde::str")]
    pub number: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Amount {
            number,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

/// Статус записи; конвейер выдаёт только подтверждённые операции.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Cleared,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Cleared => write!(f, "*"),
        }
    }
}

/// Одна нога проводки. `units: None` — сумму выводит сама бухгалтерия.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub units: Option<Amount>,
    pub cost: Option<Amount>,
    pub price: Option<Amount>,
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}", self.account)?;
        if let Some(units) = &self.units {
            write!(f, "  {units}")?;
        }
        if let Some(cost) = &self.cost {
            write!(f, " {{{cost}}}")?;
        }
        if let Some(price) = &self.price {
            write!(f, " @ {price}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub flag: Flag,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
    pub postings: Vec<Posting>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.flag)?;
        if let Some(payee) = &self.payee {
            write!(f, " \"{payee}\"")?;
        }
        write!(f, " \"{}\"", self.narration)?;
        for tag in &self.tags {
            write!(f, " #{tag}")?;
        }
        for link in &self.links {
            write!(f, " ^{link}")?;
        }
        writeln!(f)?;
        for (key, value) in &self.meta {
            writeln!(f, "  {key}: \"{value}\"")?;
        }
        for posting in &self.postings {
            writeln!(f, "{posting}")?;
        }
        Ok(())
    }
}

/// Проверка: остаток счёта равен заявленному на начало указанного дня.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceAssertion {
    pub date: NaiveDate,
    pub account: String,
    pub amount: Amount,
    pub meta: BTreeMap<String, String>,
}

impl fmt::Display for BalanceAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} balance {}  {}",
            self.date.format("%Y-%m-%d"),
            self.account,
            self.amount
        )?;
        for (key, value) in &self.meta {
            writeln!(f, "  {key}: \"{value}\"")?;
        }
        Ok(())
    }
}

/// Каноническая запись, отдаваемая внешнему потребителю бухгалтерии.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Transaction(Transaction),
    Balance(BalanceAssertion),
}

impl Entry {
    pub fn date(&self) -> NaiveDate {
        match self {
            Entry::Transaction(t) => t.date,
            Entry::Balance(b) => b.date,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Transaction(t) => t.fmt(f),
            Entry::Balance(b) => b.fmt(f),
        }
    }
}
