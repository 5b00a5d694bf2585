//! Общий интерфейс читателей выписок. Координатор держит вариант
//! читателя по композиции, без наследования ролей.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::SourceConfig;
use crate::error::Result;
use crate::formats::csv::CsvReader;
use crate::formats::ofx::OfxReader;
use crate::model::TxnRow;

/// Балансовый факт источника, из которого строится балансовая проверка.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceStatement {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
}

/// Набор способностей читателя; канонизатор не различает форматы.
pub trait StatementReader {
    /// Поддерживаемые расширения файлов, без точки.
    fn extensions(&self) -> &'static [&'static str];

    /// Дешёвое опознание: расширение плюс лёгкая структурная проба.
    fn identify(&mut self, path: &Path, config: &SourceConfig) -> Result<bool>;

    /// Полное чтение файла; состояние живёт до следующего чтения.
    fn read(&mut self, path: &Path, config: &SourceConfig) -> Result<()>;

    /// Принятые типизированные строки последнего прочитанного файла.
    fn transactions(&self) -> &[TxnRow];

    /// Валюта файла, если формат её объявляет.
    fn currency(&self) -> Option<&str>;

    fn balance_statement(&self, config: &SourceConfig) -> Vec<BalanceStatement>;

    fn balance_assertion_date(&self, config: &SourceConfig) -> Option<NaiveDate>;
}

/// Варианты читателей: табличный и тегово-структурный.
pub enum Reader {
    Csv(CsvReader),
    Ofx(OfxReader),
}

impl StatementReader for Reader {
    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Reader::Csv(r) => r.extensions(),
            Reader::Ofx(r) => r.extensions(),
        }
    }

    fn identify(&mut self, path: &Path, config: &SourceConfig) -> Result<bool> {
        match self {
            Reader::Csv(r) => r.identify(path, config),
            Reader::Ofx(r) => r.identify(path, config),
        }
    }

    fn read(&mut self, path: &Path, config: &SourceConfig) -> Result<()> {
        match self {
            Reader::Csv(r) => r.read(path, config),
            Reader::Ofx(r) => r.read(path, config),
        }
    }

    fn transactions(&self) -> &[TxnRow] {
        match self {
            Reader::Csv(r) => r.transactions(),
            Reader::Ofx(r) => r.transactions(),
        }
    }

    fn currency(&self) -> Option<&str> {
        match self {
            Reader::Csv(r) => r.currency(),
            Reader::Ofx(r) => r.currency(),
        }
    }

    fn balance_statement(&self, config: &SourceConfig) -> Vec<BalanceStatement> {
        match self {
            Reader::Csv(r) => r.balance_statement(config),
            Reader::Ofx(r) => r.balance_statement(config),
        }
    }

    fn balance_assertion_date(&self, config: &SourceConfig) -> Option<NaiveDate> {
        match self {
            Reader::Csv(r) => r.balance_assertion_date(config),
            Reader::Ofx(r) => r.balance_assertion_date(config),
        }
    }
}
